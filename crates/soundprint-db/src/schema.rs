//! Schema management for the tracks, fingerprints and hashbins tables

use anyhow::{Context, Result};
use deadpool_postgres::Pool;

pub(crate) const CREATE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tracks (
    id BIGSERIAL PRIMARY KEY,
    albumid BIGINT NOT NULL DEFAULT 0,
    length_ms BIGINT NOT NULL DEFAULT 0,
    artist TEXT,
    title TEXT NOT NULL,
    filepath TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_tracks_filepath ON tracks (filepath);

CREATE TABLE IF NOT EXISTS fingerprints (
    id BIGSERIAL PRIMARY KEY,
    trackid BIGINT NOT NULL REFERENCES tracks (id) ON DELETE CASCADE,
    songorder INTEGER NOT NULL,
    totalfingerprints INTEGER NOT NULL,
    signature BYTEA NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fingerprints_track ON fingerprints (trackid);

CREATE TABLE IF NOT EXISTS hashbins (
    id BIGSERIAL PRIMARY KEY,
    hashbin BIGINT NOT NULL,
    hashtable INTEGER NOT NULL,
    trackid BIGINT NOT NULL REFERENCES tracks (id) ON DELETE CASCADE,
    fingerprintid BIGINT NOT NULL REFERENCES fingerprints (id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_hashbins_hashbin ON hashbins (hashbin);
";

const DROP_SCHEMA: &str = "
DROP TABLE IF EXISTS hashbins;
DROP TABLE IF EXISTS fingerprints;
DROP TABLE IF EXISTS tracks;
";

/// Create all tables and indexes if they do not exist yet
pub async fn create_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;
    client
        .batch_execute(CREATE_SCHEMA)
        .await
        .context("Failed to create schema")?;
    log::debug!("Schema ready");
    Ok(())
}

/// Drop all tables
pub async fn drop_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;
    client
        .batch_execute(DROP_SCHEMA)
        .await
        .context("Failed to drop schema")?;
    Ok(())
}

/// Drop and recreate all tables, discarding every stored track
pub async fn reset_schema(pool: &Pool) -> Result<()> {
    drop_schema(pool).await?;
    create_schema(pool).await?;
    log::info!("Database reset");
    Ok(())
}
