pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod relocator;
pub mod scanner;
pub mod storage;

pub use config::AppConfig;
pub use engine::{RelocationEngine, RunResult};
pub use error::{Error, RelocationError};
pub use progress::{ProgressReporter, SilentReporter};
pub use relocator::{RelocationMode, RelocationSummary, Relocator};
pub use scanner::{EligibilityFilter, EnumerationPolicy, IndexSummary};
pub use storage::{Ledger, LedgerRow, LedgerSummary, Relocated, RowId};
