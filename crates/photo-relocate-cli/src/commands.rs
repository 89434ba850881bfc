use clap::{Parser, Subcommand, ValueEnum};
use photo_relocate_core::RelocationMode;

#[derive(Debug, Parser)]
#[command(name = "photo-relocate")]
#[command(about = "Resumable relocation of photo backups into a mirrored tree", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk the source roots and rebuild the ledger (discards previous progress)
    Index {
        /// Delete the whole destination tree before indexing
        #[arg(long)]
        reset_destination: bool,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Relocate every pending row of the existing ledger
    Relocate {
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },
    /// Index, then relocate
    Run {
        /// Reuse the existing ledger instead of re-indexing
        #[arg(long)]
        skip_index: bool,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Re-index without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show how many ledger rows are done and pending
    Status,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Copy,
    Move,
}

impl From<ModeArg> for RelocationMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Copy => RelocationMode::Copy,
            ModeArg::Move => RelocationMode::Move,
        }
    }
}
