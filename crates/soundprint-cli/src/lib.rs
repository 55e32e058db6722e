//! Shared helpers for the soundprint binaries

pub mod output;

use anyhow::{Context, Result};
use soundprint_core::settings::StorageBackend;
use soundprint_core::{open_store, Permutations, Repository, SoundprintSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG: &str = "soundprint.toml";

/// Initialize env_logger from a `-v` count
///
/// Warn by default, Info with `-v`, Debug with `-vv` or more. `RUST_LOG`
/// still applies on top.
pub fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Load settings from `path`, or from `soundprint.toml` if it exists
pub fn load_settings(path: Option<&Path>) -> Result<SoundprintSettings> {
    let fallback = PathBuf::from(DEFAULT_CONFIG);
    let path = match path {
        Some(path) => Some(path),
        None if fallback.is_file() => Some(fallback.as_path()),
        None => None,
    };

    match path {
        Some(path) => log::info!("Loading configuration from {}", path.display()),
        None => log::info!("No configuration file, using defaults"),
    }
    SoundprintSettings::load_or_default(path)
}

/// Open the configured store and build a repository around it
pub async fn build_repository(settings: &SoundprintSettings) -> Result<Repository> {
    let permutations = Permutations::load(&settings.permutations.path).with_context(|| {
        format!(
            "Cannot use permutations from {} (generate them with simperms)",
            settings.permutations.path.display()
        )
    })?;

    if settings.storage.backend == StorageBackend::Memory {
        log::warn!("Using the in-memory store, nothing is kept after this process exits");
    }
    let store = open_store(&settings.storage).await?;

    let repository = Repository::new(
        store,
        Arc::new(permutations),
        settings.creation_config(),
        settings.query_config(),
    )?;
    Ok(repository)
}
