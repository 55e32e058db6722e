//! Settings file for the soundprint tools
//!
//! TOML document selecting the store backend, the permutation artifact
//! and the fingerprinting parameters. Every field has a default, so an
//! empty file is valid.

use crate::config::FingerprintConfig;
use crate::error::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SoundprintSettings {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub permutations: PermutationsConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub fingerprinting: FingerprintConfig,
    #[serde(default)]
    pub querying: QueryingConfig,
}

/// Storage backend configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub postgresql: PostgresqlConfig,
}

/// Storage backend type
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local tables, lost on exit
    Memory,
    #[default]
    Postgresql,
}

/// PostgreSQL backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostgresqlConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for PostgresqlConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    5432
}
fn default_database() -> String {
    "soundprint".to_string()
}
fn default_user() -> String {
    "soundprint_user".to_string()
}
fn default_password() -> String {
    "soundprint_pass".to_string()
}
fn default_max_connections() -> u32 {
    16
}

/// Location of the permutation artifact
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PermutationsConfig {
    #[serde(default = "default_permutations_path")]
    pub path: PathBuf,
}

impl Default for PermutationsConfig {
    fn default() -> Self {
        Self {
            path: default_permutations_path(),
        }
    }
}

fn default_permutations_path() -> PathBuf {
    PathBuf::from("perms.csv")
}

/// Batch scan configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    #[serde(default = "default_failed_log")]
    pub failed_log: PathBuf,
    /// Worker threads, defaults to the number of CPU cores
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            failed_log: default_failed_log(),
            workers: None,
        }
    }
}

fn default_failed_log() -> PathBuf {
    PathBuf::from("failed_files_log.txt")
}

/// Query-side overrides
///
/// Everything that shapes a signature is shared with `[fingerprinting]`,
/// otherwise query buckets could never collide with stored ones.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryingConfig {
    #[serde(default = "default_query_stride")]
    pub stride: usize,
    #[serde(default = "default_optimized_signature_count")]
    pub optimized_signature_count: usize,
}

impl Default for QueryingConfig {
    fn default() -> Self {
        Self {
            stride: default_query_stride(),
            optimized_signature_count: default_optimized_signature_count(),
        }
    }
}

fn default_query_stride() -> usize {
    FingerprintConfig::query().stride
}
fn default_optimized_signature_count() -> usize {
    FingerprintConfig::query().optimized_signature_count
}

impl SoundprintSettings {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: SoundprintSettings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parameters used when creating tracks
    pub fn creation_config(&self) -> FingerprintConfig {
        self.fingerprinting.clone()
    }

    /// Parameters used when querying
    pub fn query_config(&self) -> FingerprintConfig {
        FingerprintConfig {
            stride: self.querying.stride,
            optimized_signature_count: self.querying.optimized_signature_count,
            ..self.fingerprinting.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.creation_config().validate()?;
        self.query_config().validate()
    }
}
