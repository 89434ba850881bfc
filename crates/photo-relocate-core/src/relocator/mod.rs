pub mod copy;
pub mod failure_log;
pub mod retry;
pub mod wait;

use crate::config::AppConfig;
use crate::error::{Error, RelocationError};
use crate::progress::ProgressReporter;
use crate::storage::{Ledger, LedgerRow};
use failure_log::FailureLog;
use retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use wait::{WaitOutcome, WaitPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelocationMode {
    /// Source survives; permissions and timestamps are carried over.
    #[default]
    Copy,
    /// Source is deleted once the destination is confirmed.
    Move,
}

impl fmt::Display for RelocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelocationMode::Copy => write!(f, "copy"),
            RelocationMode::Move => write!(f, "move"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelocationSummary {
    /// Rows that were already flagged before this run.
    pub already_done: usize,
    pub relocated: usize,
    /// Moves found finished on disk but not yet flagged.
    pub recovered: usize,
    pub failed: usize,
    pub bytes_relocated: u64,
    pub duration: Duration,
}

/// Works through the pending rows of a ledger one file at a time.
pub struct Relocator {
    mode: RelocationMode,
    buffer_size: usize,
    retry: RetryPolicy,
    wait: WaitPolicy,
    failure_log: FailureLog,
}

impl Relocator {
    pub fn new(mode: RelocationMode, failure_log_path: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            buffer_size: 50 * 1024 * 1024,
            retry: RetryPolicy::default(),
            wait: WaitPolicy {
                poll_interval: Duration::from_secs(1),
                timeout: Some(Duration::from_secs(600)),
            },
            failure_log: FailureLog::new(failure_log_path),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.mode, config.failure_log_path())
            .with_buffer_size(config.buffer_size_bytes())
            .with_retry_policy(config.retry_policy())
            .with_wait_policy(config.wait_policy())
    }

    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    pub fn mode(&self) -> RelocationMode {
        self.mode
    }

    pub fn failure_log(&self) -> &FailureLog {
        &self.failure_log
    }

    /// Relocate every pending row of `ledger`, in order.
    ///
    /// A file that still fails after the retry budget is written to the
    /// failure log and left pending; the run moves on to the next row. Only
    /// ledger I/O errors end the run early.
    pub fn run(
        &self,
        ledger: &mut Ledger,
        reporter: &dyn ProgressReporter,
    ) -> Result<RelocationSummary, Error> {
        let start = Instant::now();
        let pending = ledger.pending_ids();
        let mut summary = RelocationSummary {
            already_done: ledger.len() - pending.len(),
            ..Default::default()
        };
        info!(
            "{} of {} files pending ({} mode)",
            pending.len(),
            ledger.len(),
            self.mode
        );
        reporter.on_relocate_start(pending.len());

        for (processed, id) in pending.iter().enumerate() {
            let row = match ledger.row(*id) {
                Some(row) => row.clone(),
                None => continue,
            };
            reporter.on_relocate_file(processed + 1, pending.len(), &row.source_path);

            if self.is_finished_move(&row) {
                info!(
                    "{} already moved to {}, recording completion",
                    row.source_path.display(),
                    row.dest_path.display()
                );
                ledger.mark_complete(*id)?;
                summary.recovered += 1;
                continue;
            }

            let outcome = self.retry.run(
                |_| self.relocate_file(&row.source_path, &row.dest_path),
                |attempt, err| {
                    warn!(
                        "Attempt {}/{}: source file={} failed to {}: {}",
                        attempt,
                        self.retry.max_attempts.max(1),
                        row.source_path.display(),
                        self.mode,
                        err
                    )
                },
            );

            match outcome {
                Ok(bytes) => {
                    ledger.mark_complete(*id)?;
                    summary.relocated += 1;
                    summary.bytes_relocated += bytes;
                    debug!(
                        "{} {} -> {}",
                        self.mode,
                        row.source_path.display(),
                        row.dest_path.display()
                    );
                }
                Err(err) => {
                    error!(
                        "source file={} failed to {}: {}",
                        row.source_path.display(),
                        self.mode,
                        err
                    );
                    if let Err(log_err) = self.failure_log.record(&row.source_path) {
                        error!(
                            "Could not append to failure log {}: {}",
                            self.failure_log.path().display(),
                            log_err
                        );
                    }
                    summary.failed += 1;
                    reporter.on_relocate_failed(&row.source_path);
                }
            }
        }

        ledger.compact()?;
        summary.duration = start.elapsed();
        reporter.on_relocate_complete(
            summary.relocated + summary.recovered,
            summary.failed,
            summary.duration.as_secs_f64(),
        );
        Ok(summary)
    }

    /// One copy-or-move attempt for a single file. Returns the bytes copied.
    pub fn relocate_file(&self, source: &Path, destination: &Path) -> Result<u64, RelocationError> {
        let source_size = match fs::metadata(source) {
            Ok(metadata) => metadata.len(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(RelocationError::SourceMissing(source.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        };

        copy::buffered_copy(source, destination, self.buffer_size)?;
        if self.mode == RelocationMode::Copy {
            copy::copy_metadata(source, destination)?;
        }

        self.confirm_destination(destination, source_size)?;

        if self.mode == RelocationMode::Move {
            fs::remove_file(source)?;
            if wait::wait_for_removal(source, &self.wait)? == WaitOutcome::TimedOut {
                warn!(
                    "{} was removed but is still visible after waiting",
                    source.display()
                );
            }
        }

        Ok(source_size)
    }

    /// Wait for `destination` to reach `expected` bytes.
    fn confirm_destination(&self, destination: &Path, expected: u64) -> Result<(), RelocationError> {
        if wait::wait_for_size(destination, expected, &self.wait)? == WaitOutcome::TimedOut {
            let actual = fs::metadata(destination).map(|m| m.len()).unwrap_or(0);
            return Err(RelocationError::SizeNotConfirmed {
                path: destination.to_path_buf(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// A move interrupted after deleting the source but before the ledger
    /// was updated leaves a complete destination and no source.
    fn is_finished_move(&self, row: &LedgerRow) -> bool {
        if self.mode != RelocationMode::Move {
            return false;
        }
        match fs::symlink_metadata(&row.source_path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            _ => return false,
        }
        fs::metadata(&row.dest_path)
            .map(|m| m.is_file() && m.len() >= row.recorded_bytes())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn quick_relocator(mode: RelocationMode, failure_log: PathBuf) -> Relocator {
        Relocator::new(mode, failure_log)
            .with_buffer_size(8)
            .with_retry_policy(RetryPolicy {
                max_attempts: 2,
                delay: Duration::ZERO,
                ..Default::default()
            })
            .with_wait_policy(WaitPolicy {
                poll_interval: Duration::from_millis(1),
                timeout: Some(Duration::from_millis(20)),
            })
    }

    #[test]
    fn test_short_destination_is_not_confirmed() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("short.jpg");
        fs::write(&destination, b"1234").unwrap();
        let relocator = quick_relocator(RelocationMode::Copy, dir.path().join("failed.log"));

        match relocator.confirm_destination(&destination, 10) {
            Err(RelocationError::SizeNotConfirmed {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 10);
                assert_eq!(actual, 4);
            }
            other => panic!("expected SizeNotConfirmed, got {:?}", other),
        }
        assert!(relocator.confirm_destination(&destination, 4).is_ok());
    }

    #[test]
    fn test_missing_destination_is_not_confirmed() {
        let dir = tempdir().unwrap();
        let relocator = quick_relocator(RelocationMode::Copy, dir.path().join("failed.log"));
        assert!(matches!(
            relocator.confirm_destination(&dir.path().join("absent.jpg"), 1),
            Err(RelocationError::SizeNotConfirmed { actual: 0, .. })
        ));
    }

    #[test]
    fn test_missing_source_is_reported() {
        let dir = tempdir().unwrap();
        let relocator = quick_relocator(RelocationMode::Move, dir.path().join("failed.log"));
        let source = dir.path().join("gone.jpg");
        assert!(matches!(
            relocator.relocate_file(&source, &dir.path().join("out/gone.jpg")),
            Err(RelocationError::SourceMissing(p)) if p == source
        ));
    }

    #[test]
    fn test_move_deletes_source_after_confirmation() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.jpg");
        let destination = dir.path().join("out/in.jpg");
        fs::write(&source, b"twenty bytes of jpeg").unwrap();
        let relocator = quick_relocator(RelocationMode::Move, dir.path().join("failed.log"));

        assert_eq!(relocator.relocate_file(&source, &destination).unwrap(), 20);
        assert!(!source.exists());
        assert_eq!(fs::read(&destination).unwrap(), b"twenty bytes of jpeg");
    }
}
