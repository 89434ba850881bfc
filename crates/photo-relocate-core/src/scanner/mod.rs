pub mod filter;
pub mod index;
pub mod walk;

use serde::{Deserialize, Serialize};

pub use filter::EligibilityFilter;
pub use index::{build_ledger, IndexSummary};

/// What to do when a directory below a source root cannot be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumerationPolicy {
    /// Log a warning, leave the subtree out of the ledger and keep going.
    #[default]
    Skip,
    /// Fail the whole indexing pass.
    Abort,
}
