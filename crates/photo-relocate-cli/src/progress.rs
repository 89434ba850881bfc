use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use photo_relocate_core::ProgressReporter;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Index phase: spinner (total unknown until the walk ends)
/// - Relocate phase: progress bar over the pending rows
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_index_start(&self) {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICK_CHARS);
        pb.set_style(style);
        pb.set_message("Indexing files...");
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_index_progress(&self, files_indexed: usize, _current_path: &str) {
        self.with_bar(|pb| pb.set_message(format!("Indexing... {} files", files_indexed)));
    }

    fn on_index_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Index complete: {} files in {:.2}s",
            "✓".green(),
            total_files,
            duration_secs
        );
    }

    fn on_relocate_start(&self, pending_rows: usize) {
        let pb = ProgressBar::new(pending_rows as u64);
        let style = ProgressStyle::with_template(
            "  {spinner:.cyan} Relocating [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
        .tick_chars(TICK_CHARS);
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_relocate_file(&self, processed: usize, pending_rows: usize, _source: &Path) {
        self.with_bar(|pb| {
            if pb.length() != Some(pending_rows as u64) {
                pb.set_length(pending_rows as u64);
            }
            // Position counts finished rows; `processed` is the one in flight
            pb.set_position(processed.saturating_sub(1) as u64);
        });
    }

    fn on_relocate_failed(&self, source: &Path) {
        self.with_bar(|pb| {
            pb.println(format!("  {} {}", "✗".red(), source.display()));
        });
    }

    fn on_relocate_complete(&self, relocated: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        let mark = if failed == 0 { "✓".green() } else { "!".yellow() };
        eprintln!(
            "  {} Relocation complete: {} files relocated, {} failed in {:.2}s",
            mark, relocated, failed, duration_secs
        );
    }
}
