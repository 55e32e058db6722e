use super::FingerprintStore;
use crate::model::{Fingerprint, HashBin, NewTrack, PendingFingerprint, Tags, Track};
use crate::settings::PostgresqlConfig;
use crate::signature::Signature;
use anyhow::{Context, Result};
use async_trait::async_trait;
use soundprint_db::{FingerprintRow, HashBinRow, NewFingerprintRow, NewTrackRow, TrackRow};

/// PostgreSQL-based storage backend
///
/// Every call checks out its own pooled connection.
pub struct PostgresStore {
    pool: deadpool_postgres::Pool,
}

impl PostgresStore {
    /// Connect, verify the connection and make sure the schema exists
    pub async fn new(config: &PostgresqlConfig) -> Result<Self> {
        let pool = soundprint_db::create_pool(
            &config.host,
            config.port,
            &config.database,
            &config.user,
            &config.password,
            config.max_connections,
        )?;

        soundprint_db::check_connection(&pool)
            .await
            .context("PostgreSQL is not reachable")?;
        soundprint_db::create_schema(&pool).await?;

        Ok(Self { pool })
    }
}

fn track_from_row(row: TrackRow) -> Track {
    Track {
        id: row.id,
        album_id: row.album_id,
        artist: row.artist,
        title: row.title,
        duration_ms: row.length_ms,
        file_path: row.filepath,
        tags: Tags::parse(&row.tags),
    }
}

fn fingerprint_from_row(row: FingerprintRow) -> Result<Fingerprint> {
    let signature = Signature::from_bytes(&row.signature)
        .with_context(|| format!("Corrupt signature in fingerprint {}", row.id))?;
    Ok(Fingerprint {
        id: row.id,
        track_id: row.track_id,
        song_order: row.song_order,
        total_fingerprints: row.total_fingerprints,
        signature,
    })
}

fn hash_bin_from_row(row: HashBinRow) -> HashBin {
    HashBin {
        id: row.id,
        bucket: row.hashbin,
        table: row.hashtable,
        track_id: row.track_id,
        fingerprint_id: row.fingerprint_id,
    }
}

#[async_trait]
impl FingerprintStore for PostgresStore {
    async fn insert_track(
        &self,
        track: &NewTrack,
        fingerprints: &[PendingFingerprint],
    ) -> Result<Track> {
        let new_track = NewTrackRow {
            album_id: track.album_id,
            length_ms: track.duration_ms,
            artist: track.artist.clone(),
            title: track.title.clone(),
            filepath: track.file_path.clone(),
            tags: track.tags.serialize(),
        };

        let rows: Vec<NewFingerprintRow> = fingerprints
            .iter()
            .enumerate()
            .map(|(order, fp)| NewFingerprintRow {
                song_order: order as i32,
                signature: fp.signature.to_bytes(),
                hashbins: fp.buckets.clone(),
            })
            .collect();

        let stored =
            soundprint_db::insert_track_with_fingerprints(&self.pool, &new_track, &rows).await?;
        Ok(track.clone().with_id(stored.id))
    }

    async fn track_by_id(&self, id: i64) -> Result<Option<Track>> {
        Ok(soundprint_db::get_track_by_id(&self.pool, id)
            .await?
            .map(track_from_row))
    }

    async fn tracks_by_ids(&self, ids: &[i64]) -> Result<Vec<Track>> {
        Ok(soundprint_db::get_tracks_by_ids(&self.pool, ids)
            .await?
            .into_iter()
            .map(track_from_row)
            .collect())
    }

    async fn track_file_paths(&self) -> Result<Vec<String>> {
        soundprint_db::get_track_filepaths(&self.pool).await
    }

    async fn track_count(&self) -> Result<usize> {
        Ok(soundprint_db::count_tracks(&self.pool).await? as usize)
    }

    async fn hash_bins_by_buckets(&self, buckets: &[i64]) -> Result<Vec<HashBin>> {
        Ok(soundprint_db::get_hashbins_by_buckets(&self.pool, buckets)
            .await?
            .into_iter()
            .map(hash_bin_from_row)
            .collect())
    }

    async fn fingerprints_by_ids(&self, ids: &[i64]) -> Result<Vec<Fingerprint>> {
        soundprint_db::get_fingerprints_by_ids(&self.pool, ids)
            .await?
            .into_iter()
            .map(fingerprint_from_row)
            .collect()
    }

    async fn all_fingerprints(&self) -> Result<Vec<Fingerprint>> {
        soundprint_db::get_all_fingerprints(&self.pool)
            .await?
            .into_iter()
            .map(fingerprint_from_row)
            .collect()
    }

    async fn reset(&self) -> Result<()> {
        soundprint_db::reset_schema(&self.pool).await
    }
}
