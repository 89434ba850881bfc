use crate::config::AppConfig;
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::relocator::{RelocationMode, RelocationSummary, Relocator};
use crate::scanner::{self, EligibilityFilter, IndexSummary};
use crate::storage::{Ledger, LedgerSummary};
use std::fs;
use std::io;
use tracing::{debug, info};

pub struct RelocationEngine {
    config: AppConfig,
}

#[derive(Debug)]
pub struct RunResult {
    pub index: Option<IndexSummary>,
    pub relocation: RelocationSummary,
}

impl RelocationEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Override the configured copy/move mode.
    pub fn with_mode(mut self, mode: RelocationMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Rebuild the ledger from the source roots. Previous progress is lost.
    pub fn index(&self, reporter: &dyn ProgressReporter) -> Result<IndexSummary, Error> {
        fs::create_dir_all(&self.config.dest_root)?;
        let filter = EligibilityFilter::new(
            &self.config.excluded_extensions,
            &self.config.ignore_patterns,
        );
        let ledger_path = self.config.ledger_path();
        info!("Indexing source files into {}", ledger_path.display());
        let summary = scanner::build_ledger(
            &self.config.source_roots,
            &self.config.dest_root,
            &ledger_path,
            &filter,
            self.config.on_unreadable_dir,
            reporter,
        )?;
        debug!(
            "Index completed in {:.2}s: {} files, {:.2} MB, {} skipped",
            summary.duration.as_secs_f64(),
            summary.files_indexed,
            summary.total_mb,
            summary.files_skipped,
        );
        Ok(summary)
    }

    /// Relocate every row of the existing ledger that is not done yet.
    pub fn relocate(&self, reporter: &dyn ProgressReporter) -> Result<RelocationSummary, Error> {
        let ledger_path = self.config.ledger_path();
        let mut ledger = Ledger::open(&ledger_path)?;
        let relocator = Relocator::from_config(&self.config);
        info!(
            "Relocating files listed in {} ({})",
            ledger_path.display(),
            relocator.mode()
        );
        relocator.run(&mut ledger, reporter)
    }

    /// Optionally re-index, then relocate.
    pub fn run(&self, do_indexing: bool, reporter: &dyn ProgressReporter) -> Result<RunResult, Error> {
        let index = if do_indexing {
            Some(self.index(reporter)?)
        } else {
            None
        };
        let relocation = self.relocate(reporter)?;
        Ok(RunResult { index, relocation })
    }

    pub fn status(&self) -> Result<LedgerSummary, Error> {
        Ok(Ledger::open(&self.config.ledger_path())?.summary())
    }

    /// Remove the whole destination tree, ledger included.
    pub fn reset_destination(&self) -> Result<(), Error> {
        match fs::remove_dir_all(&self.config.dest_root) {
            Ok(()) => {
                info!("Removed destination {}", self.config.dest_root.display());
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
