//! Insert and query orchestration
//!
//! Insertion runs the fingerprint pipeline, hashes every signature and
//! hands the track to the store in one call. Querying retrieves candidate
//! fingerprints that share buckets with the query windows, scores them by
//! Jaccard similarity and ranks tracks by their best window.

use crate::audio;
use crate::config::FingerprintConfig;
use crate::encoder::FingerprintPipeline;
use crate::error::{Result, SoundprintError};
use crate::hashing::{hamming_distance, jaccard_similarity, MinHasher};
use crate::model::{Fingerprint, NewTrack, PendingFingerprint, Track};
use crate::permutation::Permutations;
use crate::signature::Signature;
use crate::spectrogram::{pad_for_analysis, Spectrogram};
use crate::store::FingerprintStore;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

#[cfg(test)]
mod tests;

/// Result of a successful insert, including the intermediate data
#[derive(Debug, Clone)]
pub struct InsertReport {
    pub track: Track,
    pub spectrogram: Spectrogram,
    pub signatures: Vec<Signature>,
}

/// Optional side channel invoked after every successful insert
pub trait InsertDebugHook: Send + Sync {
    fn after_insert(&self, report: &InsertReport) -> anyhow::Result<()>;
}

/// Query knobs
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Minimum number of tables a candidate must collide in; 0 and 1 both
    /// accept any shared bucket
    pub threshold_tables: usize,
    /// Compare at most `optimized_signature_count` query windows
    pub optimize_signature_count: bool,
    /// Compare against every stored fingerprint instead of bucket lookups
    pub search_everything: bool,
}

/// One ranked track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub track_id: i64,
    pub title: String,
    pub file_path: String,
    pub duration_ms: i64,
    /// Best Jaccard similarity over all compared window pairs
    pub similarity: f64,
    /// Smallest Hamming distance over all compared window pairs
    pub hamming_distance: usize,
    /// Most tables any compared pair collided in
    pub table_hits: usize,
    /// Distinct stored windows of this track that were compared
    pub matched_windows: usize,
}

/// Outcome of a query started from a file or a stored track
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// The audio file does not exist
    NoFile,
    /// No stored track has the requested id
    NotFound,
    /// Ranked matches, possibly empty
    Matches(Vec<QueryResult>),
}

/// Similarity of one (query window, stored fingerprint) pair
struct PairScore {
    track_id: i64,
    fingerprint_id: i64,
    similarity: f64,
    hamming: usize,
    table_hits: usize,
}

#[derive(Default)]
struct TrackScore {
    similarity: f64,
    hamming: Option<usize>,
    table_hits: usize,
    windows: HashSet<i64>,
}

/// Matching engine over an injected store and permutation set
pub struct Repository {
    store: Arc<dyn FingerprintStore>,
    hasher: MinHasher,
    creation: FingerprintPipeline,
    query: FingerprintPipeline,
    debug_hook: Option<Arc<dyn InsertDebugHook>>,
}

impl Repository {
    /// Build a repository, refusing permutation sets that do not fit
    pub fn new(
        store: Arc<dyn FingerprintStore>,
        permutations: Arc<Permutations>,
        creation: FingerprintConfig,
        query: FingerprintConfig,
    ) -> Result<Self> {
        if creation.signature_len() != query.signature_len() {
            return Err(SoundprintError::config(format!(
                "creation signatures have {} bits, query signatures {}",
                creation.signature_len(),
                query.signature_len()
            )));
        }
        permutations.validate_against(&creation)?;
        permutations.validate_against(&query)?;

        Ok(Self {
            store,
            hasher: MinHasher::new(permutations),
            creation: FingerprintPipeline::new(creation)?,
            query: FingerprintPipeline::new(query)?,
            debug_hook: None,
        })
    }

    pub fn with_debug_hook(mut self, hook: Arc<dyn InsertDebugHook>) -> Self {
        self.debug_hook = Some(hook);
        self
    }

    pub fn store(&self) -> &Arc<dyn FingerprintStore> {
        &self.store
    }

    pub fn creation_config(&self) -> &FingerprintConfig {
        self.creation.config()
    }

    pub fn query_config(&self) -> &FingerprintConfig {
        self.query.config()
    }

    /// Fingerprint `samples` and store them as a new track
    pub async fn insert(&self, track: NewTrack, samples: &[f32]) -> Result<InsertReport> {
        let started = Instant::now();

        let padded = pad_for_analysis(samples, self.creation.config())?;
        let extracted = self.creation.run(&padded)?;

        let pending: Vec<PendingFingerprint> = extracted
            .signatures
            .iter()
            .map(|signature| PendingFingerprint {
                buckets: self.hasher.hash(signature),
                signature: signature.clone(),
            })
            .collect();

        let stored = match self.store.insert_track(&track, &pending).await {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!("Failed to store {}: {:#}", track.file_path, e);
                return Err(SoundprintError::Persistence(e));
            }
        };

        log::info!(
            "Inserted track {} ({}) with {} fingerprints in {:?}",
            stored.id,
            stored.title,
            pending.len(),
            started.elapsed()
        );

        let report = InsertReport {
            track: stored,
            spectrogram: extracted.spectrogram,
            signatures: extracted.signatures,
        };

        if let Some(hook) = &self.debug_hook {
            if let Err(e) = hook.after_insert(&report) {
                log::warn!("Debug hook failed for track {}: {:#}", report.track.id, e);
            }
        }

        Ok(report)
    }

    /// Decode an audio file and insert it, titled after its file stem
    pub async fn insert_file(&self, path: &Path) -> Result<InsertReport> {
        let config = self.creation.config();
        let audio = audio::decode_audio(path, config.sampling_rate, config.seconds_to_analyze)?;

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let track = NewTrack {
            album_id: 0,
            artist: None,
            title,
            duration_ms: audio.duration_ms as i64,
            file_path: path.display().to_string(),
            tags: audio.tags(),
        };

        self.insert(track, &audio.samples).await
    }

    /// Rank stored tracks by similarity to `samples`
    pub async fn query(&self, samples: &[f32], options: &QueryOptions) -> Result<Vec<QueryResult>> {
        let started = Instant::now();
        let config = self.query.config();

        let padded = pad_for_analysis(samples, config)?;
        let mut windows = self.query.run(&padded)?.signatures;
        if options.optimize_signature_count {
            windows = select_evenly(windows, config.optimized_signature_count);
        }

        let query_buckets: Vec<Vec<i64>> = windows.iter().map(|s| self.hasher.hash(s)).collect();

        let pairs = if options.search_everything {
            self.score_everything(&windows, &query_buckets).await?
        } else {
            self.score_candidates(&windows, &query_buckets, options.threshold_tables)
                .await?
        };

        let results = self.rank(pairs).await?;

        log::info!(
            "Query with {} windows returned {} tracks in {:?}",
            windows.len(),
            results.len(),
            started.elapsed()
        );

        Ok(results)
    }

    /// Query with an audio file
    pub async fn query_file(&self, path: &Path, options: &QueryOptions) -> Result<QueryOutcome> {
        if !path.is_file() {
            return Ok(QueryOutcome::NoFile);
        }
        let config = self.query.config();
        let audio = audio::decode_audio(path, config.sampling_rate, config.seconds_to_analyze)?;
        let results = self.query(&audio.samples, options).await?;
        Ok(QueryOutcome::Matches(results))
    }

    /// Query with the audio file of a stored track
    pub async fn query_track(&self, track_id: i64, options: &QueryOptions) -> Result<QueryOutcome> {
        let track = self
            .store
            .track_by_id(track_id)
            .await
            .map_err(SoundprintError::Persistence)?;

        match track {
            Some(track) => self.query_file(Path::new(&track.file_path), options).await,
            None => Ok(QueryOutcome::NotFound),
        }
    }

    /// Bucket lookup, table-hit filter, exact comparison of survivors
    async fn score_candidates(
        &self,
        windows: &[Signature],
        query_buckets: &[Vec<i64>],
        threshold_tables: usize,
    ) -> Result<Vec<PairScore>> {
        let unique: Vec<i64> = query_buckets
            .iter()
            .flatten()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let bins = self
            .store
            .hash_bins_by_buckets(&unique)
            .await
            .map_err(SoundprintError::Persistence)?;

        let mut by_slot: HashMap<(usize, i64), Vec<i64>> = HashMap::new();
        for bin in &bins {
            by_slot
                .entry((bin.table as usize, bin.bucket))
                .or_default()
                .push(bin.fingerprint_id);
        }

        // (query window, fingerprint) -> tables collided in
        let mut hits: HashMap<(usize, i64), usize> = HashMap::new();
        for (window, buckets) in query_buckets.iter().enumerate() {
            for (table, bucket) in buckets.iter().enumerate() {
                if let Some(ids) = by_slot.get(&(table, *bucket)) {
                    for &id in ids {
                        *hits.entry((window, id)).or_default() += 1;
                    }
                }
            }
        }

        let threshold = threshold_tables.max(1);
        hits.retain(|_, count| *count >= threshold);
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = hits
            .keys()
            .map(|&(_, id)| id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let fingerprints: HashMap<i64, Fingerprint> = self
            .store
            .fingerprints_by_ids(&ids)
            .await
            .map_err(SoundprintError::Persistence)?
            .into_iter()
            .map(|fp| (fp.id, fp))
            .collect();

        log::debug!(
            "{} bins for {} buckets, {} candidate pairs over threshold {}",
            bins.len(),
            unique.len(),
            hits.len(),
            threshold
        );

        hits.into_par_iter()
            .filter_map(|((window, id), table_hits)| {
                fingerprints
                    .get(&id)
                    .map(|fp| score_pair(&windows[window], fp, table_hits))
            })
            .collect()
    }

    /// Brute-force comparison of every stored fingerprint with every window
    async fn score_everything(
        &self,
        windows: &[Signature],
        query_buckets: &[Vec<i64>],
    ) -> Result<Vec<PairScore>> {
        let fingerprints = self
            .store
            .all_fingerprints()
            .await
            .map_err(SoundprintError::Persistence)?;

        log::debug!(
            "Comparing {} windows against all {} stored fingerprints",
            windows.len(),
            fingerprints.len()
        );

        fingerprints
            .par_iter()
            .flat_map_iter(|fp| {
                let candidate_buckets = self.hasher.hash(&fp.signature);
                windows.iter().zip(query_buckets).map(move |(window, buckets)| {
                    let table_hits = buckets
                        .iter()
                        .zip(&candidate_buckets)
                        .filter(|(a, b)| a == b)
                        .count();
                    score_pair(window, fp, table_hits)
                })
            })
            .collect()
    }

    /// Aggregate pairs per track and order by similarity, then track id
    async fn rank(&self, pairs: Vec<PairScore>) -> Result<Vec<QueryResult>> {
        let mut per_track: BTreeMap<i64, TrackScore> = BTreeMap::new();
        for pair in pairs {
            let score = per_track.entry(pair.track_id).or_default();
            score.similarity = score.similarity.max(pair.similarity);
            score.hamming = Some(score.hamming.map_or(pair.hamming, |h| h.min(pair.hamming)));
            score.table_hits = score.table_hits.max(pair.table_hits);
            score.windows.insert(pair.fingerprint_id);
        }
        if per_track.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = per_track.keys().copied().collect();
        let tracks = self
            .store
            .tracks_by_ids(&ids)
            .await
            .map_err(SoundprintError::Persistence)?;

        let mut results: Vec<QueryResult> = tracks
            .into_iter()
            .filter_map(|track| {
                per_track.get(&track.id).map(|score| QueryResult {
                    track_id: track.id,
                    title: track.title,
                    file_path: track.file_path,
                    duration_ms: track.duration_ms,
                    similarity: score.similarity,
                    hamming_distance: score.hamming.unwrap_or(0),
                    table_hits: score.table_hits,
                    matched_windows: score.windows.len(),
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(a.track_id.cmp(&b.track_id))
        });
        Ok(results)
    }
}

fn score_pair(window: &Signature, fp: &Fingerprint, table_hits: usize) -> Result<PairScore> {
    Ok(PairScore {
        track_id: fp.track_id,
        fingerprint_id: fp.id,
        similarity: jaccard_similarity(window, &fp.signature)?,
        hamming: hamming_distance(window, &fp.signature)?,
        table_hits,
    })
}

/// Keep at most `limit` items, evenly spread over the input
fn select_evenly<T>(items: Vec<T>, limit: usize) -> Vec<T> {
    let n = items.len();
    if limit == 0 || n <= limit {
        return items;
    }
    let keep: HashSet<usize> = (0..limit).map(|i| i * n / limit).collect();
    items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, item)| item)
        .collect()
}
