use anyhow::{Context, Result};
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use crate::models::*;

const TRACK_COLUMNS: &str = "id, albumid, length_ms, artist, title, filepath, tags";
const FINGERPRINT_COLUMNS: &str = "id, trackid, songorder, totalfingerprints, signature";

fn track_from_row(r: &Row) -> TrackRow {
    TrackRow {
        id: r.get(0),
        album_id: r.get(1),
        length_ms: r.get(2),
        artist: r.get(3),
        title: r.get(4),
        filepath: r.get(5),
        tags: r.get(6),
    }
}

fn fingerprint_from_row(r: &Row) -> FingerprintRow {
    FingerprintRow {
        id: r.get(0),
        track_id: r.get(1),
        song_order: r.get(2),
        total_fingerprints: r.get(3),
        signature: r.get(4),
    }
}

/// Insert a track with all its fingerprints and hash bins
///
/// Runs in a single transaction: either everything is stored or nothing is.
pub async fn insert_track_with_fingerprints(
    pool: &Pool,
    track: &NewTrackRow,
    fingerprints: &[NewFingerprintRow],
) -> Result<TrackRow> {
    let mut client = pool.get().await?;
    let tx = client
        .transaction()
        .await
        .context("Failed to start transaction")?;

    let row = tx
        .query_one(
            "INSERT INTO tracks (albumid, length_ms, artist, title, filepath, tags)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
            &[
                &track.album_id,
                &track.length_ms,
                &track.artist,
                &track.title,
                &track.filepath,
                &track.tags,
            ],
        )
        .await
        .context("Failed to insert track")?;
    let track_id: i64 = row.get(0);

    let insert_fingerprint = tx
        .prepare(
            "INSERT INTO fingerprints (trackid, songorder, totalfingerprints, signature)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .await
        .context("Failed to prepare fingerprint insert")?;

    let total = fingerprints.len() as i32;
    let mut hashbins = Vec::new();

    for fp in fingerprints {
        let row = tx
            .query_one(
                &insert_fingerprint,
                &[&track_id, &fp.song_order, &total, &fp.signature],
            )
            .await
            .context("Failed to insert fingerprint")?;
        let fingerprint_id: i64 = row.get(0);

        for (table, bucket) in fp.hashbins.iter().enumerate() {
            hashbins.push(NewHashBinRow {
                hashbin: *bucket,
                hashtable: table as i32,
                track_id,
                fingerprint_id,
            });
        }
    }

    if !hashbins.is_empty() {
        let json_array =
            serde_json::to_value(&hashbins).context("Failed to serialize hash bins")?;

        tx.execute(
            "INSERT INTO hashbins (hashbin, hashtable, trackid, fingerprintid)
             SELECT
                 (hb->>'hashbin')::BIGINT,
                 (hb->>'hashtable')::INTEGER,
                 (hb->>'track_id')::BIGINT,
                 (hb->>'fingerprint_id')::BIGINT
             FROM jsonb_array_elements($1::jsonb) AS hb",
            &[&json_array],
        )
        .await
        .context("Failed to batch insert hash bins")?;
    }

    tx.commit().await.context("Failed to commit track insert")?;

    log::debug!(
        "Stored track {} with {} fingerprints and {} hash bins",
        track_id,
        fingerprints.len(),
        hashbins.len()
    );

    Ok(TrackRow {
        id: track_id,
        album_id: track.album_id,
        length_ms: track.length_ms,
        artist: track.artist.clone(),
        title: track.title.clone(),
        filepath: track.filepath.clone(),
        tags: track.tags.clone(),
    })
}

/// Get track by ID
pub async fn get_track_by_id(pool: &Pool, id: i64) -> Result<Option<TrackRow>> {
    let client = pool.get().await?;

    let row = client
        .query_opt(
            &format!("SELECT {} FROM tracks WHERE id = $1", TRACK_COLUMNS),
            &[&id],
        )
        .await
        .context("Failed to get track")?;

    Ok(row.as_ref().map(track_from_row))
}

/// Get several tracks at once, unknown ids are skipped
pub async fn get_tracks_by_ids(pool: &Pool, ids: &[i64]) -> Result<Vec<TrackRow>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let client = pool.get().await?;

    let rows = client
        .query(
            &format!(
                "SELECT {} FROM tracks WHERE id = ANY($1) ORDER BY id",
                TRACK_COLUMNS
            ),
            &[&ids],
        )
        .await
        .context("Failed to get tracks")?;

    Ok(rows.iter().map(track_from_row).collect())
}

/// Get the file path of every stored track
pub async fn get_track_filepaths(pool: &Pool) -> Result<Vec<String>> {
    let client = pool.get().await?;

    let rows = client
        .query("SELECT filepath FROM tracks", &[])
        .await
        .context("Failed to get track file paths")?;

    Ok(rows.iter().map(|r| r.get(0)).collect())
}

/// Count stored tracks
pub async fn count_tracks(pool: &Pool) -> Result<i64> {
    let client = pool.get().await?;

    let row = client
        .query_one("SELECT COUNT(*) FROM tracks", &[])
        .await
        .context("Failed to count tracks")?;

    Ok(row.get(0))
}

/// Get all hash bins whose bucket value is one of `buckets`
///
/// Uses the hashbin index.
pub async fn get_hashbins_by_buckets(pool: &Pool, buckets: &[i64]) -> Result<Vec<HashBinRow>> {
    if buckets.is_empty() {
        return Ok(Vec::new());
    }

    let client = pool.get().await?;

    let rows = client
        .query(
            "SELECT id, hashbin, hashtable, trackid, fingerprintid
             FROM hashbins
             WHERE hashbin = ANY($1)",
            &[&buckets],
        )
        .await
        .context("Failed to get hash bins")?;

    Ok(rows
        .iter()
        .map(|r| HashBinRow {
            id: r.get(0),
            hashbin: r.get(1),
            hashtable: r.get(2),
            track_id: r.get(3),
            fingerprint_id: r.get(4),
        })
        .collect())
}

/// Get fingerprints by ID, unknown ids are skipped
pub async fn get_fingerprints_by_ids(pool: &Pool, ids: &[i64]) -> Result<Vec<FingerprintRow>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let client = pool.get().await?;

    let rows = client
        .query(
            &format!(
                "SELECT {} FROM fingerprints WHERE id = ANY($1) ORDER BY id",
                FINGERPRINT_COLUMNS
            ),
            &[&ids],
        )
        .await
        .context("Failed to get fingerprints")?;

    Ok(rows.iter().map(fingerprint_from_row).collect())
}

/// Get every stored fingerprint
pub async fn get_all_fingerprints(pool: &Pool) -> Result<Vec<FingerprintRow>> {
    let client = pool.get().await?;

    let rows = client
        .query(
            &format!(
                "SELECT {} FROM fingerprints ORDER BY trackid, songorder",
                FINGERPRINT_COLUMNS
            ),
            &[],
        )
        .await
        .context("Failed to get all fingerprints")?;

    Ok(rows.iter().map(fingerprint_from_row).collect())
}
