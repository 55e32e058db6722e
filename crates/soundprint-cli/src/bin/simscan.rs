//! simscan - Fingerprint every audio file below a directory
//!
//! Usage: simscan <dir> [--skip-duration SECS] [--reset-db] [--silent] [--debug-dump DIR]

use anyhow::{Context, Result};
use clap::Parser;
use soundprint_cli::output::{format_file_report, format_summary};
use soundprint_cli::{build_repository, init_logger, load_settings};
use soundprint_core::{scan_directory, CancelFlag, JsonDumpHook, ScanOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "simscan")]
#[command(about = "Fingerprint a directory of audio files into the store", long_about = None)]
struct Args {
    /// Directory to scan recursively
    dir: PathBuf,

    /// Skip files that are at least this many seconds long
    #[arg(long, value_name = "SECS")]
    skip_duration: Option<u64>,

    /// Drop every stored track before scanning
    #[arg(long)]
    reset_db: bool,

    /// Only print the final summary
    #[arg(long)]
    silent: bool,

    /// Write a JSON dump of every inserted track into this directory
    #[arg(long, value_name = "DIR")]
    debug_dump: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let settings = load_settings(args.config.as_deref())?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    let mut repository = runtime.block_on(build_repository(&settings))?;
    if let Some(dir) = &args.debug_dump {
        repository = repository.with_debug_hook(Arc::new(JsonDumpHook::new(dir)?));
    }

    if args.reset_db {
        runtime
            .block_on(repository.store().reset())
            .context("Failed to reset the store")?;
        println!("Store reset");
    }

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, finishing files in progress");
            on_interrupt.cancel();
        }
    });

    let options = ScanOptions {
        skip_duration: args.skip_duration.map(Duration::from_secs),
        workers: settings.scan.workers,
        failed_log: settings.scan.failed_log.clone(),
    };

    let silent = args.silent;
    let summary = scan_directory(
        &repository,
        &args.dir,
        &options,
        runtime.handle(),
        &cancel,
        &|report| {
            if !silent {
                println!("{}", format_file_report(report));
            }
        },
    )?;

    println!("{}", format_summary(&summary));
    if summary.failed > 0 {
        println!("Failed files are listed in {}", options.failed_log.display());
    }

    Ok(())
}
