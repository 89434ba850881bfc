pub mod journal;
pub mod ledger;
pub mod models;

pub use journal::CompletionJournal;
pub use ledger::{Ledger, LedgerWriter};
pub use models::{LedgerRow, LedgerSummary, Relocated, RowId, LEDGER_HEADERS};
