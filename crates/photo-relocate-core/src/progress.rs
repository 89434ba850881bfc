use std::path::Path;

/// Trait for reporting indexing and relocation progress.
///
/// The CLI implements it with indicatif progress bars. All methods have
/// default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_index_start(&self) {}
    fn on_index_progress(&self, _files_indexed: usize, _current_path: &str) {}
    fn on_index_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_relocate_start(&self, _pending_rows: usize) {}
    fn on_relocate_file(&self, _processed: usize, _pending_rows: usize, _source: &Path) {}
    fn on_relocate_failed(&self, _source: &Path) {}
    fn on_relocate_complete(&self, _relocated: usize, _failed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
