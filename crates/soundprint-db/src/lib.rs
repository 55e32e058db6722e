//! Soundprint Database Layer
//!
//! PostgreSQL storage for tracks, fingerprints and hash bins

pub mod connection;
pub mod models;
pub mod operations;
pub mod schema;

// Re-export commonly used types
pub use connection::{check_connection, create_pool, DbPool};
pub use models::{FingerprintRow, HashBinRow, NewFingerprintRow, NewTrackRow, TrackRow};
pub use operations::{
    count_tracks, get_all_fingerprints, get_fingerprints_by_ids, get_hashbins_by_buckets,
    get_track_by_id, get_track_filepaths, get_tracks_by_ids, insert_track_with_fingerprints,
};
pub use schema::{create_schema, drop_schema, reset_schema};
