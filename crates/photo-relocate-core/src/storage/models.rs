use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Header line of the ledger CSV, in column order.
pub const LEDGER_HEADERS: [&str; 4] = [
    "Source File Path",
    "Destination File Path",
    "File size (MB)",
    "Is rearranged",
];

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Zero-based position of a data row in the ledger (the header is not counted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relocation flag. Only ever moves from `No` to `Yes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relocated {
    #[default]
    #[serde(alias = "NO", alias = "No")]
    No,
    #[serde(alias = "YES", alias = "Yes")]
    Yes,
}

/// One file discovered during indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(rename = "Source File Path")]
    pub source_path: PathBuf,
    #[serde(rename = "Destination File Path")]
    pub dest_path: PathBuf,
    #[serde(rename = "File size (MB)")]
    pub size_mb: f64,
    #[serde(rename = "Is rearranged")]
    pub relocated: Relocated,
}

impl LedgerRow {
    pub fn pending(source_path: PathBuf, dest_path: PathBuf, size_bytes: u64) -> Self {
        Self {
            source_path,
            dest_path,
            size_mb: size_bytes as f64 / BYTES_PER_MB,
            relocated: Relocated::No,
        }
    }

    pub fn is_relocated(&self) -> bool {
        self.relocated == Relocated::Yes
    }

    /// Source size in bytes as captured at index time.
    pub fn recorded_bytes(&self) -> u64 {
        (self.size_mb * BYTES_PER_MB).round() as u64
    }
}

/// Counts over the merged ledger state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSummary {
    pub total_rows: usize,
    pub relocated_rows: usize,
    pub pending_rows: usize,
    pub pending_mb: f64,
}
