mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, ModeArg};
use dotenv::dotenv;
use photo_relocate_core::{
    AppConfig, IndexSummary, RelocationEngine, RelocationSummary,
};
use progress::CliReporter;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match photo_relocate_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Index {
            reset_destination,
            yes,
        }) => run_index(config, reset_destination, yes)?,
        Some(Commands::Relocate { mode }) => run_relocate(config, mode)?,
        Some(Commands::Run {
            skip_index,
            mode,
            yes,
        }) => run_all(config, !skip_index, mode, yes)?,
        Some(Commands::Status) => run_status(config)?,
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn engine_for(config: AppConfig, mode: Option<ModeArg>) -> RelocationEngine {
    let engine = RelocationEngine::new(config);
    match mode {
        Some(mode) => engine.with_mode(mode.into()),
        None => engine,
    }
}

fn run_index(config: AppConfig, reset_destination: bool, yes: bool) -> anyhow::Result<()> {
    let engine = RelocationEngine::new(config);

    let prompt = if reset_destination {
        format!(
            "Are you SURE you want to COMPLETELY DELETE {} before indexing?",
            engine.config().dest_root.display()
        )
    } else {
        "Re-indexing discards all relocation progress. Continue?".to_string()
    };
    if !yes && !prompt_confirm(&prompt, Some(false))? {
        process::exit(0);
    }

    if reset_destination {
        engine
            .reset_destination()
            .context("failed to remove destination tree")?;
    }

    let reporter = CliReporter::new();
    let summary = engine.index(&reporter).context("indexing failed")?;
    print_index_summary(&summary);
    Ok(())
}

fn run_relocate(config: AppConfig, mode: Option<ModeArg>) -> anyhow::Result<()> {
    let engine = engine_for(config, mode);
    let reporter = CliReporter::new();
    let summary = engine.relocate(&reporter).context("relocation failed")?;
    print_relocation_summary(&engine, &summary);
    Ok(())
}

fn run_all(
    config: AppConfig,
    do_indexing: bool,
    mode: Option<ModeArg>,
    yes: bool,
) -> anyhow::Result<()> {
    let engine = engine_for(config, mode);
    let ledger_exists = engine.config().ledger_path().exists();
    if must_confirm_reindex(do_indexing, yes, ledger_exists)
        && !prompt_confirm(
            "Re-indexing discards all relocation progress (use --skip-index to resume). Continue?",
            Some(false),
        )?
    {
        process::exit(0);
    }
    let reporter = CliReporter::new();
    let result = engine.run(do_indexing, &reporter)?;
    if let Some(index) = &result.index {
        print_index_summary(index);
    }
    print_relocation_summary(&engine, &result.relocation);
    Ok(())
}

/// Re-indexing over an existing ledger throws its progress away.
fn must_confirm_reindex(do_indexing: bool, yes: bool, ledger_exists: bool) -> bool {
    do_indexing && !yes && ledger_exists
}

fn run_status(config: AppConfig) -> anyhow::Result<()> {
    let engine = RelocationEngine::new(config);
    let summary = engine.status().with_context(|| {
        format!(
            "could not read ledger {}",
            engine.config().ledger_path().display()
        )
    })?;

    info!(
        "{} rows: {} relocated, {} pending ({} MB)",
        summary.total_rows,
        format!("{}", summary.relocated_rows).green(),
        format!("{}", summary.pending_rows).yellow(),
        format!("{:.2}", summary.pending_mb).yellow(),
    );
    Ok(())
}

fn print_index_summary(summary: &IndexSummary) {
    println!();
    info!(
        "Indexed {} files ({} MB) in {}",
        format!("{}", summary.files_indexed).green(),
        format!("{:.2}", summary.total_mb).green(),
        format!("{:.2}s", summary.duration.as_secs_f64()).green(),
    );
    info!(
        "{} files excluded, {} directories skipped",
        format!("{}", summary.files_skipped).cyan(),
        format!("{}", summary.dirs_skipped).cyan(),
    );
    if summary.collisions > 0 {
        info!(
            "{} files left in place because another file already targets their destination",
            format!("{}", summary.collisions).yellow(),
        );
    }
}

fn print_relocation_summary(engine: &RelocationEngine, summary: &RelocationSummary) {
    println!();
    info!(
        "{}: {} relocated, {} recovered, {} already done ({} MB) in {}",
        engine.config().mode,
        format!("{}", summary.relocated).green(),
        format!("{}", summary.recovered).green(),
        summary.already_done,
        format!("{:.2}", summary.bytes_relocated as f64 / 1_000_000.0).green(),
        format!("{:.2}s", summary.duration.as_secs_f64()).green(),
    );
    if summary.failed > 0 {
        info!(
            "{} files failed, see {}",
            format!("{}", summary.failed).red(),
            engine.config().failure_log_path().display(),
        );
    }
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
