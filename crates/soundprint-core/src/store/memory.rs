use super::FingerprintStore;
use crate::model::{Fingerprint, HashBin, NewTrack, PendingFingerprint, Track};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    tracks: BTreeMap<i64, Track>,
    fingerprints: BTreeMap<i64, Fingerprint>,
    hash_bins: Vec<HashBin>,
    /// bucket value -> positions in `hash_bins`
    by_bucket: HashMap<i64, Vec<usize>>,
    next_track_id: i64,
    next_fingerprint_id: i64,
}

/// Store keeping all tables in process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl FingerprintStore for MemoryStore {
    async fn insert_track(
        &self,
        track: &NewTrack,
        fingerprints: &[PendingFingerprint],
    ) -> Result<Track> {
        let mut tables = self.write()?;

        tables.next_track_id += 1;
        let track = track.clone().with_id(tables.next_track_id);
        let total = fingerprints.len() as i32;

        for (order, pending) in fingerprints.iter().enumerate() {
            tables.next_fingerprint_id += 1;
            let fingerprint_id = tables.next_fingerprint_id;

            for (table, &bucket) in pending.buckets.iter().enumerate() {
                let position = tables.hash_bins.len();
                tables.hash_bins.push(HashBin {
                    id: position as i64 + 1,
                    bucket,
                    table: table as i32,
                    track_id: track.id,
                    fingerprint_id,
                });
                tables.by_bucket.entry(bucket).or_default().push(position);
            }

            tables.fingerprints.insert(
                fingerprint_id,
                Fingerprint {
                    id: fingerprint_id,
                    track_id: track.id,
                    song_order: order as i32,
                    total_fingerprints: total,
                    signature: pending.signature.clone(),
                },
            );
        }

        tables.tracks.insert(track.id, track.clone());
        Ok(track)
    }

    async fn track_by_id(&self, id: i64) -> Result<Option<Track>> {
        Ok(self.read()?.tracks.get(&id).cloned())
    }

    async fn tracks_by_ids(&self, ids: &[i64]) -> Result<Vec<Track>> {
        let tables = self.read()?;
        let wanted: HashSet<_> = ids.iter().collect();
        Ok(tables
            .tracks
            .values()
            .filter(|t| wanted.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn track_file_paths(&self) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .tracks
            .values()
            .map(|t| t.file_path.clone())
            .collect())
    }

    async fn track_count(&self) -> Result<usize> {
        Ok(self.read()?.tracks.len())
    }

    async fn hash_bins_by_buckets(&self, buckets: &[i64]) -> Result<Vec<HashBin>> {
        let tables = self.read()?;
        let unique: HashSet<_> = buckets.iter().collect();

        let mut bins = Vec::new();
        for bucket in unique {
            if let Some(positions) = tables.by_bucket.get(bucket) {
                bins.extend(positions.iter().map(|&p| tables.hash_bins[p]));
            }
        }
        Ok(bins)
    }

    async fn fingerprints_by_ids(&self, ids: &[i64]) -> Result<Vec<Fingerprint>> {
        let tables = self.read()?;
        let unique: std::collections::BTreeSet<_> = ids.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| tables.fingerprints.get(id).cloned())
            .collect())
    }

    async fn all_fingerprints(&self) -> Result<Vec<Fingerprint>> {
        Ok(self.read()?.fingerprints.values().cloned().collect())
    }

    async fn reset(&self) -> Result<()> {
        *self.write()? = Tables::default();
        Ok(())
    }
}
