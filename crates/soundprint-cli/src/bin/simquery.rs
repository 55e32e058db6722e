//! simquery - Find stored tracks similar to an audio file
//!
//! Usage:
//!   simquery --file <audio> [--threshold-tables N] [--num N] [--optimize] [--search-everything] [--json]
//!   simquery --track-id <id> [...]

use anyhow::Result;
use clap::Parser;
use soundprint_cli::output::{print_json_results, print_results};
use soundprint_cli::{build_repository, init_logger, load_settings};
use soundprint_core::{QueryOptions, QueryOutcome};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "simquery")]
#[command(about = "Query the store for tracks similar to an audio file", long_about = None)]
struct Args {
    /// Audio file to query with
    #[arg(long, conflicts_with = "track_id", required_unless_present = "track_id")]
    file: Option<PathBuf>,

    /// Query with the audio file of an already stored track
    #[arg(long)]
    track_id: Option<i64>,

    /// Minimum number of hash tables a candidate must share with the query
    #[arg(long, default_value_t = 0)]
    threshold_tables: usize,

    /// Number of results to print
    #[arg(short, long, default_value_t = 20)]
    num: usize,

    /// Compare only a few evenly spaced query windows
    #[arg(long)]
    optimize: bool,

    /// Compare against every stored fingerprint, ignoring the hash tables
    #[arg(long)]
    search_everything: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logger(args.verbose);

    let settings = load_settings(args.config.as_deref())?;
    let repository = build_repository(&settings).await?;

    let options = QueryOptions {
        threshold_tables: args.threshold_tables,
        optimize_signature_count: args.optimize,
        search_everything: args.search_everything,
    };

    let (label, outcome) = match (&args.file, args.track_id) {
        (Some(path), _) => (
            path.display().to_string(),
            repository.query_file(path, &options).await,
        ),
        (None, Some(id)) => (
            format!("track {}", id),
            repository.query_track(id, &options).await,
        ),
        (None, None) => anyhow::bail!("either --file or --track-id is required"),
    };

    match outcome {
        Ok(QueryOutcome::NoFile) => {
            println!("No file found: {}", label);
            Ok(ExitCode::from(2))
        }
        Ok(QueryOutcome::NotFound) => {
            println!("No stored {}", label);
            Ok(ExitCode::from(2))
        }
        Ok(QueryOutcome::Matches(results)) if results.is_empty() && !args.json => {
            println!("No matches for {}", label);
            Ok(ExitCode::SUCCESS)
        }
        Ok(QueryOutcome::Matches(results)) => {
            if args.json {
                print_json_results(&label, &results, args.num);
            } else {
                print_results(&results, args.num);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error computing fingerprint for {}: {}", label, e);
            Ok(ExitCode::FAILURE)
        }
    }
}
