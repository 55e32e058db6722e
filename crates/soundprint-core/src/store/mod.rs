//! Storage backend trait and implementations
//!
//! Abstracts the relational store holding tracks, fingerprints and hash
//! bins. The in-memory backend serves tests and one-shot runs, the
//! PostgreSQL backend a persistent corpus.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::model::{Fingerprint, HashBin, NewTrack, PendingFingerprint, Track};
use crate::settings::{StorageBackend, StorageConfig};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Abstract storage backend trait
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    /// Store a track with its fingerprints and one hash bin per bucket
    ///
    /// Either everything becomes visible or nothing does.
    async fn insert_track(
        &self,
        track: &NewTrack,
        fingerprints: &[PendingFingerprint],
    ) -> Result<Track>;

    async fn track_by_id(&self, id: i64) -> Result<Option<Track>>;

    /// Tracks for the given ids, unknown ids are skipped
    async fn tracks_by_ids(&self, ids: &[i64]) -> Result<Vec<Track>>;

    /// File path of every stored track
    async fn track_file_paths(&self) -> Result<Vec<String>>;

    async fn track_count(&self) -> Result<usize>;

    /// Every hash bin whose bucket value is in `buckets`, in any table
    async fn hash_bins_by_buckets(&self, buckets: &[i64]) -> Result<Vec<HashBin>>;

    async fn fingerprints_by_ids(&self, ids: &[i64]) -> Result<Vec<Fingerprint>>;

    async fn all_fingerprints(&self) -> Result<Vec<Fingerprint>>;

    /// Drop every track, fingerprint and hash bin
    async fn reset(&self) -> Result<()>;
}

/// Build the configured store
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn FingerprintStore>> {
    match config.backend {
        StorageBackend::Memory => {
            log::info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgresql => {
            let store = PostgresStore::new(&config.postgresql).await?;
            log::info!(
                "Using PostgreSQL store at {}:{}/{}",
                config.postgresql.host,
                config.postgresql.port,
                config.postgresql.database
            );
            Ok(Arc::new(store))
        }
    }
}
