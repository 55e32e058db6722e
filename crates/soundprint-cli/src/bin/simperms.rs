//! simperms - Generate the MinHash permutation file
//!
//! Usage: simperms [--output PATH] [--seed N] [--config PATH]

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use soundprint_cli::{init_logger, load_settings};
use soundprint_core::generate_for_config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "simperms")]
#[command(about = "Generate random permutations for locality-sensitive hashing", long_about = None)]
struct Args {
    /// Output file, defaults to the configured permutations path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for reproducible permutations
    #[arg(long)]
    seed: Option<u64>,

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
    let config = settings.creation_config();
    let output = args
        .output
        .unwrap_or_else(|| settings.permutations.path.clone());

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let permutations = generate_for_config(&config, &mut rng)?;
    permutations
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote {} tables of {} keys over [{}, {}) to {}",
        permutations.number_of_tables(),
        permutations.number_of_keys(),
        config.start_index,
        config.end_index,
        output.display()
    );

    Ok(())
}
