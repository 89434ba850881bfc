use super::filter::EligibilityFilter;
use super::walk::walk_source_root;
use super::EnumerationPolicy;
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::storage::{Ledger, LedgerRow};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct IndexSummary {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub dirs_skipped: usize,
    /// Files left out because an earlier file already targets their destination.
    pub collisions: usize,
    pub total_mb: f64,
    pub duration: Duration,
}

/// Rebuild the ledger at `ledger_path` from scratch.
///
/// Every eligible file under each source root (walked in the given order)
/// gets one row pointing at `dest_root/<path relative to its root>` with the
/// relocated flag unset. Any previous ledger and its progress are discarded.
///
/// Only the first file to claim a destination gets a row; later files with
/// the same relative path are logged and left where they are.
pub fn build_ledger(
    source_roots: &[PathBuf],
    dest_root: &Path,
    ledger_path: &Path,
    filter: &EligibilityFilter,
    policy: EnumerationPolicy,
    reporter: &dyn ProgressReporter,
) -> Result<IndexSummary, Error> {
    let start = Instant::now();
    reporter.on_index_start();

    let mut writer = Ledger::create(ledger_path)?;
    let mut summary = IndexSummary::default();
    let mut destinations: HashSet<PathBuf> = HashSet::new();
    let mut collisions = 0;

    for root in source_roots {
        info!("Indexing {}", root.display());
        let stats = walk_source_root(root, filter, policy, Some(dest_root), |file| {
            let dest_path = dest_root.join(&file.relative);
            if !destinations.insert(dest_path.clone()) {
                warn!(
                    "Not indexing {}: {} is already the destination of an earlier file",
                    file.path.display(),
                    dest_path.display()
                );
                collisions += 1;
                return Ok(());
            }

            let row = LedgerRow::pending(file.path, dest_path, file.size);
            summary.total_mb += row.size_mb;
            writer.append_row(&row)?;
            reporter.on_index_progress(writer.rows_written(), &row.source_path.to_string_lossy());
            Ok(())
        })?;
        debug!(
            "{}: {} files indexed, {} skipped, {} unreadable paths",
            root.display(),
            stats.files_found,
            stats.files_skipped,
            stats.dirs_skipped
        );
        summary.files_skipped += stats.files_skipped;
        summary.dirs_skipped += stats.dirs_skipped;
    }
    summary.collisions = collisions;
    summary.files_skipped += collisions;

    summary.files_indexed = writer.finish()?;
    summary.duration = start.elapsed();
    reporter.on_index_complete(summary.files_indexed, summary.duration.as_secs_f64());
    Ok(summary)
}
