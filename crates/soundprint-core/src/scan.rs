//! Batch insertion of a directory tree
//!
//! Files are independent, so they are spread over a rayon pool. Store calls
//! are driven through a tokio runtime handle from the worker threads.

use crate::audio::{header_duration, is_supported};
use crate::error::{Result, SoundprintError};
use crate::repository::Repository;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use walkdir::WalkDir;

/// Scan parameters
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Skip files whose duration is at least this long
    pub skip_duration: Option<Duration>,
    /// Worker threads, defaults to the number of CPU cores
    pub workers: Option<usize>,
    /// Failing paths are written here, one per line
    pub failed_log: PathBuf,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            skip_duration: None,
            workers: None,
            failed_log: PathBuf::from("failed_files_log.txt"),
        }
    }
}

/// Best-effort cancellation, checked before each file
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one file
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Added { track_id: i64, fingerprints: usize },
    Skipped { duration: Duration },
    Failed { reason: String },
}

/// Per-file progress event
#[derive(Debug, Clone)]
pub struct FileReport {
    /// 1-based completion order
    pub index: usize,
    pub total: usize,
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// Totals of one scan
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Supported files found under the directory
    pub found: usize,
    /// Files already present in the store
    pub already_stored: usize,
    pub added: usize,
    pub failed: usize,
    /// Files skipped by the duration filter
    pub skipped: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// All supported audio files below `dir`, sorted
pub fn collect_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SoundprintError::invalid(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

/// Insert every new audio file below `dir`
///
/// Must not be called from inside the runtime behind `handle`.
pub fn scan_directory(
    repository: &Repository,
    dir: &Path,
    options: &ScanOptions,
    handle: &Handle,
    cancel: &CancelFlag,
    on_file: &(dyn Fn(&FileReport) + Sync),
) -> Result<ScanSummary> {
    let started = Instant::now();

    let files = collect_audio_files(dir)?;
    let found = files.len();

    let existing: HashSet<String> = handle
        .block_on(repository.store().track_file_paths())
        .map_err(SoundprintError::Persistence)?
        .into_iter()
        .collect();

    let pending: Vec<PathBuf> = files
        .into_iter()
        .filter(|p| !existing.contains(&p.display().to_string()))
        .collect();
    let already_stored = found - pending.len();
    let total = pending.len();

    log::info!(
        "Found {} audio files in {}, {} already stored",
        found,
        dir.display(),
        already_stored
    );

    let failed_log = Mutex::new(File::create(&options.failed_log)?);

    let workers = options.workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| SoundprintError::config(format!("cannot start worker pool: {}", e)))?;

    let done = AtomicUsize::new(0);
    let added = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);

    pool.install(|| {
        pending.par_iter().for_each(|path| {
            if cancel.is_cancelled() {
                return;
            }

            let outcome = process_file(repository, path, options, handle);
            match &outcome {
                FileOutcome::Added { .. } => {
                    added.fetch_add(1, Ordering::Relaxed);
                }
                FileOutcome::Skipped { .. } => {
                    skipped.fetch_add(1, Ordering::Relaxed);
                }
                FileOutcome::Failed { reason } => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    log::warn!("Failed to add {}: {}", path.display(), reason);
                    record_failure(&failed_log, path);
                }
            }

            let index = done.fetch_add(1, Ordering::Relaxed) + 1;
            on_file(&FileReport {
                index,
                total,
                path: path.clone(),
                outcome,
            });
        });
    });

    let summary = ScanSummary {
        found,
        already_stored,
        added: added.into_inner(),
        failed: failed.into_inner(),
        skipped: skipped.into_inner(),
        cancelled: cancel.is_cancelled(),
        elapsed: started.elapsed(),
    };

    log::info!(
        "Scan finished: {} added, {} failed, {} skipped in {:?}",
        summary.added,
        summary.failed,
        summary.skipped,
        summary.elapsed
    );

    Ok(summary)
}

fn process_file(
    repository: &Repository,
    path: &Path,
    options: &ScanOptions,
    handle: &Handle,
) -> FileOutcome {
    if let Some(limit) = options.skip_duration {
        // unknown or zero durations are never skipped
        if let Some(duration) = header_duration(path) {
            if !duration.is_zero() && duration >= limit {
                return FileOutcome::Skipped { duration };
            }
        }
    }

    match handle.block_on(repository.insert_file(path)) {
        Ok(report) => FileOutcome::Added {
            track_id: report.track.id,
            fingerprints: report.signatures.len(),
        },
        Err(e) => FileOutcome::Failed {
            reason: e.to_string(),
        },
    }
}

fn record_failure(sink: &Mutex<File>, path: &Path) {
    let written = match sink.lock() {
        Ok(mut file) => writeln!(file, "{}", path.display()).and_then(|_| file.flush()),
        Err(_) => return,
    };
    if let Err(e) = written {
        log::warn!("Cannot write failure log: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_repository, noise, write_wav};
    use tokio::runtime::Runtime;

    fn options(dir: &Path) -> ScanOptions {
        ScanOptions {
            skip_duration: None,
            workers: Some(2),
            failed_log: dir.join("failed.txt"),
        }
    }

    #[test]
    fn test_collect_audio_files_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/b/one.wav"), b"").unwrap();
        std::fs::write(dir.path().join("two.FLAC"), b"").unwrap();
        std::fs::write(dir.path().join("cover.jpg"), b"").unwrap();

        let files = collect_audio_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.ends_with("a/b/one.wav")));

        assert!(collect_audio_files(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_scan_adds_new_files_and_logs_failures() {
        let runtime = Runtime::new().unwrap();
        let repository = memory_repository();
        let music = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();

        write_wav(&music.path().join("a.wav"), &noise(1, 8000), 8000);
        write_wav(&music.path().join("b.wav"), &noise(2, 8000), 8000);
        std::fs::write(music.path().join("broken.wav"), b"RIFF garbage").unwrap();

        let reports = Mutex::new(Vec::new());
        let summary = scan_directory(
            &repository,
            music.path(),
            &options(work.path()),
            runtime.handle(),
            &CancelFlag::new(),
            &|report| reports.lock().unwrap().push(report.clone()),
        )
        .unwrap();

        assert_eq!(summary.found, 3);
        assert_eq!(summary.added, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.cancelled);

        let reports = reports.into_inner().unwrap();
        assert_eq!(reports.len(), 3);
        let mut indices: Vec<_> = reports.iter().map(|r| r.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![1, 2, 3]);

        let failures = std::fs::read_to_string(work.path().join("failed.txt")).unwrap();
        assert_eq!(failures.lines().count(), 1);
        assert!(failures.contains("broken.wav"));

        let count = runtime.block_on(repository.store().track_count()).unwrap();
        assert_eq!(count, 2);

        // second pass only retries the broken file
        let again = scan_directory(
            &repository,
            music.path(),
            &options(work.path()),
            runtime.handle(),
            &CancelFlag::new(),
            &|_| {},
        )
        .unwrap();
        assert_eq!(again.already_stored, 2);
        assert_eq!(again.added, 0);
        assert_eq!(again.failed, 1);
    }

    #[test]
    fn test_skip_duration() {
        let runtime = Runtime::new().unwrap();
        let repository = memory_repository();
        let music = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();

        write_wav(&music.path().join("short.wav"), &noise(3, 8000), 8000);
        write_wav(&music.path().join("long.wav"), &noise(4, 24000), 8000);

        let opts = ScanOptions {
            skip_duration: Some(Duration::from_secs(2)),
            ..options(work.path())
        };
        let summary = scan_directory(
            &repository,
            music.path(),
            &opts,
            runtime.handle(),
            &CancelFlag::new(),
            &|_| {},
        )
        .unwrap();

        assert_eq!(summary.added, 1);
        assert_eq!(summary.skipped, 1);
        let paths = runtime.block_on(repository.store().track_file_paths()).unwrap();
        assert!(paths[0].ends_with("short.wav"));
    }

    #[test]
    fn test_cancelled_scan_processes_nothing() {
        let runtime = Runtime::new().unwrap();
        let repository = memory_repository();
        let music = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_wav(&music.path().join("a.wav"), &noise(5, 8000), 8000);

        let cancel = CancelFlag::new();
        cancel.cancel();
        let summary = scan_directory(
            &repository,
            music.path(),
            &options(work.path()),
            runtime.handle(),
            &cancel,
            &|_| {},
        )
        .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.added + summary.failed + summary.skipped, 0);
    }
}
