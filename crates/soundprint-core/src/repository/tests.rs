//! Tests for insertion and querying

use super::*;
use crate::model::{HashBin, Tags};
use crate::permutation::generate_permutations;
use crate::store::MemoryStore;
use crate::testing::{
    creation_config, memory_repository, noise, query_config, repository_with, write_wav,
};
use anyhow::anyhow;
use approx::assert_relative_eq;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};

fn track(name: &str) -> NewTrack {
    NewTrack {
        title: name.to_string(),
        file_path: format!("/music/{}.wav", name),
        duration_ms: 1000,
        tags: Tags::new(),
        ..Default::default()
    }
}

async fn corpus() -> (Repository, Vec<Vec<f32>>) {
    let repository = memory_repository();
    let clips: Vec<Vec<f32>> = (0..3).map(|i| noise(100 + i, 8000)).collect();
    for (i, clip) in clips.iter().enumerate() {
        repository
            .insert(track(&format!("clip{}", i)), clip)
            .await
            .unwrap();
    }
    (repository, clips)
}

#[tokio::test]
async fn test_insert_report_and_store_contents() {
    let repository = memory_repository();
    let samples = noise(1, 8000);

    let report = repository.insert(track("one"), &samples).await.unwrap();
    assert_eq!(report.track.id, 1);
    assert_eq!(report.track.title, "one");
    assert!(report.spectrogram.num_frames > 0);
    assert!(!report.signatures.is_empty());

    let stored = repository.store().all_fingerprints().await.unwrap();
    assert_eq!(stored.len(), report.signatures.len());
    assert!(stored
        .iter()
        .all(|fp| fp.total_fingerprints as usize == report.signatures.len()));
    assert_eq!(stored[0].signature, report.signatures[0]);
}

#[tokio::test]
async fn test_every_fingerprint_has_one_bin_per_table() {
    let repository = memory_repository();
    let report = repository.insert(track("one"), &noise(2, 8000)).await.unwrap();

    let buckets: Vec<i64> = report
        .signatures
        .iter()
        .flat_map(|s| repository.hasher.hash(s))
        .collect();

    let bins = repository.store().hash_bins_by_buckets(&buckets).await.unwrap();
    let mut per_fingerprint: HashMap<i64, HashSet<i32>> = HashMap::new();
    for bin in bins {
        per_fingerprint
            .entry(bin.fingerprint_id)
            .or_default()
            .insert(bin.table);
    }
    assert_eq!(per_fingerprint.len(), report.signatures.len());
    assert!(per_fingerprint.values().all(|tables| tables.len() == 12));
}

#[tokio::test]
async fn test_query_with_inserted_audio_ranks_it_first() {
    let (repository, clips) = corpus().await;

    let results = repository
        .query(&clips[1], &QueryOptions::default())
        .await
        .unwrap();

    assert!(!results.is_empty());
    let best = &results[0];
    assert_eq!(best.track_id, 2);
    assert_eq!(best.file_path, "/music/clip1.wav");
    assert_relative_eq!(best.similarity, 1.0);
    assert_eq!(best.hamming_distance, 0);
    assert_eq!(best.table_hits, creation_config().number_of_hash_tables);
    assert!(results[1..].iter().all(|r| r.similarity < 1.0));
}

#[tokio::test]
async fn test_results_ordered_by_similarity_then_id() {
    let (repository, clips) = corpus().await;
    let results = repository
        .query(&clips[0], &QueryOptions::default())
        .await
        .unwrap();

    for pair in results.windows(2) {
        assert!(
            pair[0].similarity > pair[1].similarity
                || (pair[0].similarity == pair[1].similarity && pair[0].track_id < pair[1].track_id)
        );
    }
}

#[tokio::test]
async fn test_threshold_is_monotonic() {
    let (repository, clips) = corpus().await;
    let tables = creation_config().number_of_hash_tables;

    let mut previous = usize::MAX;
    let mut previous_windows = usize::MAX;
    for threshold in 0..=tables {
        let options = QueryOptions {
            threshold_tables: threshold,
            ..Default::default()
        };
        let results = repository.query(&clips[2], &options).await.unwrap();
        let windows: usize = results.iter().map(|r| r.matched_windows).sum();

        assert!(results.len() <= previous);
        assert!(windows <= previous_windows);
        // the exact twin collides in every table
        assert_eq!(results[0].track_id, 3);

        previous = results.len();
        previous_windows = windows;
    }
}

#[tokio::test]
async fn test_thresholds_zero_and_one_are_equivalent() {
    let (repository, clips) = corpus().await;
    let zero = repository
        .query(
            &clips[0],
            &QueryOptions {
                threshold_tables: 0,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let one = repository
        .query(
            &clips[0],
            &QueryOptions {
                threshold_tables: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let ids = |r: &[QueryResult]| {
        r.iter()
            .map(|q| (q.track_id, q.matched_windows))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&zero[..]), ids(&one[..]));
}

#[tokio::test]
async fn test_empty_corpus_returns_no_results() {
    let repository = memory_repository();
    let samples = noise(9, 8000);

    assert!(repository
        .query(&samples, &QueryOptions::default())
        .await
        .unwrap()
        .is_empty());

    let everything = QueryOptions {
        search_everything: true,
        ..Default::default()
    };
    assert!(repository.query(&samples, &everything).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_everything_reports_every_track() {
    let (repository, clips) = corpus().await;
    let options = QueryOptions {
        search_everything: true,
        threshold_tables: 12,
        ..Default::default()
    };

    let results = repository.query(&clips[0], &options).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].track_id, 1);
    assert_relative_eq!(results[0].similarity, 1.0);
    assert_eq!(results[0].table_hits, 12);
}

#[tokio::test]
async fn test_optimized_signature_count_still_finds_track() {
    let (repository, clips) = corpus().await;
    let options = QueryOptions {
        optimize_signature_count: true,
        ..Default::default()
    };

    let results = repository.query(&clips[1], &options).await.unwrap();
    assert_eq!(results[0].track_id, 2);
    assert_relative_eq!(results[0].similarity, 1.0);
}

#[tokio::test]
async fn test_short_query_is_padded() {
    let (repository, clips) = corpus().await;
    // shorter than a single analysis window
    let results = repository
        .query(&clips[0][..500], &QueryOptions::default())
        .await;
    assert!(results.is_ok());
}

#[tokio::test]
async fn test_empty_audio_is_rejected() {
    let repository = memory_repository();
    assert!(matches!(
        repository.insert(track("none"), &[]).await,
        Err(SoundprintError::InvalidInput(_))
    ));
    assert!(matches!(
        repository.query(&[], &QueryOptions::default()).await,
        Err(SoundprintError::InvalidInput(_))
    ));
    assert_eq!(repository.store().track_count().await.unwrap(), 0);
}

#[test]
fn test_mismatched_permutations_are_fatal() {
    let mut rng = StdRng::seed_from_u64(5);
    let wrong = generate_permutations(3, 6, 0, 256, &mut rng).unwrap();
    let result = Repository::new(
        Arc::new(MemoryStore::new()),
        Arc::new(wrong),
        creation_config(),
        query_config(),
    );
    assert!(matches!(result, Err(SoundprintError::Configuration(_))));

    let perms = generate_permutations(12, 6, 0, 256, &mut rng).unwrap();
    let wider_query = FingerprintConfig {
        log_bins: 32,
        end_index: 512,
        ..query_config()
    };
    let result = Repository::new(
        Arc::new(MemoryStore::new()),
        Arc::new(perms),
        creation_config(),
        wider_query,
    );
    assert!(matches!(result, Err(SoundprintError::Configuration(_))));
}

#[test]
fn test_select_evenly() {
    let items: Vec<usize> = (0..27).collect();
    assert_eq!(select_evenly(items.clone(), 4), vec![0, 6, 13, 20]);
    assert_eq!(select_evenly(items.clone(), 100).len(), 27);
    assert_eq!(select_evenly(items, 0).len(), 27);
}

/// Store whose every call fails
struct BrokenStore;

#[async_trait]
impl FingerprintStore for BrokenStore {
    async fn insert_track(&self, _: &NewTrack, _: &[PendingFingerprint]) -> anyhow::Result<Track> {
        Err(anyhow!("disk full"))
    }
    async fn track_by_id(&self, _: i64) -> anyhow::Result<Option<Track>> {
        Err(anyhow!("connection refused"))
    }
    async fn tracks_by_ids(&self, _: &[i64]) -> anyhow::Result<Vec<Track>> {
        Err(anyhow!("connection refused"))
    }
    async fn track_file_paths(&self) -> anyhow::Result<Vec<String>> {
        Err(anyhow!("connection refused"))
    }
    async fn track_count(&self) -> anyhow::Result<usize> {
        Err(anyhow!("connection refused"))
    }
    async fn hash_bins_by_buckets(&self, _: &[i64]) -> anyhow::Result<Vec<HashBin>> {
        Err(anyhow!("connection refused"))
    }
    async fn fingerprints_by_ids(&self, _: &[i64]) -> anyhow::Result<Vec<Fingerprint>> {
        Err(anyhow!("connection refused"))
    }
    async fn all_fingerprints(&self) -> anyhow::Result<Vec<Fingerprint>> {
        Err(anyhow!("connection refused"))
    }
    async fn reset(&self) -> anyhow::Result<()> {
        Err(anyhow!("connection refused"))
    }
}

#[tokio::test]
async fn test_persistence_failures_are_reported() {
    let repository = repository_with(Arc::new(BrokenStore));
    let samples = noise(4, 8000);

    let insert = repository.insert(track("x"), &samples).await;
    match insert {
        Err(SoundprintError::Persistence(e)) => assert!(e.to_string().contains("disk full")),
        other => panic!("expected persistence error, got {:?}", other.map(|r| r.track)),
    }

    assert!(matches!(
        repository.query(&samples, &QueryOptions::default()).await,
        Err(SoundprintError::Persistence(_))
    ));
    assert!(matches!(
        repository.query_track(1, &QueryOptions::default()).await,
        Err(SoundprintError::Persistence(_))
    ));
}

struct CountingHook(AtomicUsize);

impl InsertDebugHook for CountingHook {
    fn after_insert(&self, report: &InsertReport) -> anyhow::Result<()> {
        assert!(!report.signatures.is_empty());
        self.0.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("hook failures do not fail the insert"))
    }
}

#[tokio::test]
async fn test_debug_hook_runs_after_insert() {
    let hook = Arc::new(CountingHook(AtomicUsize::new(0)));
    let repository = memory_repository().with_debug_hook(hook.clone());

    repository.insert(track("a"), &noise(6, 8000)).await.unwrap();
    repository.insert(track("b"), &noise(7, 8000)).await.unwrap();
    assert_eq!(hook.0.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_query_by_file_and_track_id() {
    let repository = memory_repository();
    let dir = tempfile::tempdir().unwrap();

    let path = dir.path().join("song.wav");
    write_wav(&path, &noise(8, 8000), 8000);
    let other = dir.path().join("other.wav");
    write_wav(&other, &noise(9, 8000), 8000);

    let song = repository.insert_file(&path).await.unwrap().track;
    repository.insert_file(&other).await.unwrap();
    assert_eq!(song.title, "song");
    assert_eq!(song.duration_ms, 1000);
    assert_eq!(song.tags.get("format"), Some("wav"));

    match repository.query_file(&path, &QueryOptions::default()).await.unwrap() {
        QueryOutcome::Matches(results) => {
            assert_eq!(results[0].track_id, song.id);
            assert_relative_eq!(results[0].similarity, 1.0);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    match repository.query_track(song.id, &QueryOptions::default()).await.unwrap() {
        QueryOutcome::Matches(results) => assert_eq!(results[0].track_id, song.id),
        other => panic!("unexpected outcome {:?}", other),
    }

    assert!(matches!(
        repository.query_track(99, &QueryOptions::default()).await.unwrap(),
        QueryOutcome::NotFound
    ));
    assert!(matches!(
        repository
            .query_file(&dir.path().join("missing.wav"), &QueryOptions::default())
            .await
            .unwrap(),
        QueryOutcome::NoFile
    ));

    let broken = dir.path().join("broken.wav");
    std::fs::write(&broken, b"junk").unwrap();
    assert!(matches!(
        repository.query_file(&broken, &QueryOptions::default()).await,
        Err(SoundprintError::Decode(_))
    ));
}
