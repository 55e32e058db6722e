//! Track, fingerprint and hash bin value objects

use crate::signature::Signature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form key/value tags of a track
///
/// Persisted as `key=value` pairs joined by `;`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Column form. `;` and `=` inside keys or values are replaced by `,` and `:`.
    pub fn serialize(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", sanitize(k), sanitize(v)))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Inverse of [`Tags::serialize`]; malformed pairs are dropped
    pub fn parse(column: &str) -> Self {
        let mut tags = Self::new();
        for pair in column.split(';') {
            if let Some((k, v)) = pair.split_once('=') {
                if !k.is_empty() {
                    tags.insert(k, v);
                }
            }
        }
        tags
    }
}

fn sanitize(text: &str) -> String {
    text.replace(';', ",").replace('=', ":")
}

/// A stored recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub album_id: i64,
    pub artist: Option<String>,
    pub title: String,
    pub duration_ms: i64,
    pub file_path: String,
    pub tags: Tags,
}

/// Track attributes before the store assigns an id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTrack {
    pub album_id: i64,
    pub artist: Option<String>,
    pub title: String,
    pub duration_ms: i64,
    pub file_path: String,
    pub tags: Tags,
}

impl NewTrack {
    pub fn with_id(self, id: i64) -> Track {
        Track {
            id,
            album_id: self.album_id,
            artist: self.artist,
            title: self.title,
            duration_ms: self.duration_ms,
            file_path: self.file_path,
            tags: self.tags,
        }
    }
}

/// A stored signature of one analysis window
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    pub id: i64,
    pub track_id: i64,
    pub song_order: i32,
    pub total_fingerprints: i32,
    pub signature: Signature,
}

/// One (table, bucket) entry of a stored fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashBin {
    pub id: i64,
    pub bucket: i64,
    pub table: i32,
    pub track_id: i64,
    pub fingerprint_id: i64,
}

/// Fingerprint plus its buckets, awaiting insertion
#[derive(Debug, Clone)]
pub struct PendingFingerprint {
    pub signature: Signature,
    /// One bucket per hash table, indexed by table
    pub buckets: Vec<i64>,
}
