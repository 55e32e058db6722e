//! JSON dump of inserted tracks for offline inspection

use crate::repository::{InsertDebugHook, InsertReport};
use anyhow::Context;
use soundprint_fp::FingerprintDump;
use std::path::PathBuf;

/// Writes `<dir>/<title>_fingerprints.json` after every insert
pub struct JsonDumpHook {
    dir: PathBuf,
}

impl JsonDumpHook {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create dump directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dump_path(&self, title: &str) -> PathBuf {
        let name: String = title
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{}_fingerprints.json", name))
    }
}

impl InsertDebugHook for JsonDumpHook {
    fn after_insert(&self, report: &InsertReport) -> anyhow::Result<()> {
        let track = &report.track;
        let mut dump = FingerprintDump::new(
            track.id,
            track.title.clone(),
            track.file_path.clone(),
            track.duration_ms,
            report.signatures.first().map(|s| s.len()).unwrap_or(0),
            report.spectrogram.frames.clone(),
        );
        for signature in &report.signatures {
            dump.add_fingerprint(signature.ones().collect());
        }

        let path = self.dump_path(&track.title);
        dump.save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::debug!("Wrote debug dump {}", path.display());
        Ok(())
    }
}
