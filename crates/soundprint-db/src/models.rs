use serde::{Deserialize, Serialize};

/// Row of the `tracks` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRow {
    pub id: i64,
    pub album_id: i64,
    pub length_ms: i64,
    pub artist: Option<String>,
    pub title: String,
    pub filepath: String,
    /// `key=value` pairs joined by `;`
    pub tags: String,
}

/// Row of the `fingerprints` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintRow {
    pub id: i64,
    pub track_id: i64,
    pub song_order: i32,
    pub total_fingerprints: i32,
    pub signature: Vec<u8>,
}

/// Row of the `hashbins` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashBinRow {
    pub id: i64,
    pub hashbin: i64,
    pub hashtable: i32,
    pub track_id: i64,
    pub fingerprint_id: i64,
}

/// Input structure for creating a new track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrackRow {
    pub album_id: i64,
    pub length_ms: i64,
    pub artist: Option<String>,
    pub title: String,
    pub filepath: String,
    pub tags: String,
}

/// Input structure for one fingerprint and its hash bins
///
/// Track and fingerprint ids are assigned during the insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFingerprintRow {
    pub song_order: i32,
    pub signature: Vec<u8>,
    /// One bucket per hash table, indexed by table
    pub hashbins: Vec<i64>,
}

/// Hash bin as serialized for the batch insert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct NewHashBinRow {
    pub hashbin: i64,
    pub hashtable: i32,
    pub track_id: i64,
    pub fingerprint_id: i64,
}
