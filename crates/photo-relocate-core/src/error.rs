use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Ledger error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Source root {} is not a readable directory", .0.display())]
    InvalidSourceRoot(PathBuf),

    #[error("Corrupt completion journal {}: line {line}: {content:?}", path.display())]
    Journal {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Failure of a single copy/move attempt. Contained by the relocator and
/// never returned from a run.
#[derive(Error, Debug)]
pub enum RelocationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("destination {} stayed at {actual} bytes, expected at least {expected}", path.display())]
    SizeNotConfirmed {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("source {} does not exist", .0.display())]
    SourceMissing(PathBuf),
}
