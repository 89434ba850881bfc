use glob::Pattern;
use std::collections::HashSet;
use std::path::Path;
use tracing::error;

/// Decides which files are tracked in the ledger.
///
/// A file is rejected when its extension (compared case-insensitively) is in
/// the exclusion set, or when its path matches one of the ignore globs.
/// Files without an extension are always eligible unless a glob rejects them.
#[derive(Debug, Clone, Default)]
pub struct EligibilityFilter {
    excluded_extensions: HashSet<String>,
    ignore_patterns: Vec<Pattern>,
}

impl EligibilityFilter {
    pub fn new<S: AsRef<str>>(excluded_extensions: &[S], ignore_globs: &[S]) -> Self {
        let excluded_extensions = excluded_extensions
            .iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob.as_ref()) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob.as_ref(), e);
                    None
                }
            })
            .collect();

        Self {
            excluded_extensions,
            ignore_patterns,
        }
    }

    pub fn is_eligible(&self, path: &Path) -> bool {
        if self.is_ignored(path) {
            return false;
        }
        match path.extension() {
            Some(ext) => !self
                .excluded_extensions
                .contains(&ext.to_string_lossy().to_lowercase()),
            None => true,
        }
    }

    /// True when an ignore glob matches. Also used to prune whole directories.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }
}
