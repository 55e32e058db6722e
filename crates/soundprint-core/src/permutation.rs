//! Permutation set used by the LSH hasher
//!
//! Generated once, saved as a text artifact and loaded read-only at start-up.

use crate::config::FingerprintConfig;
use crate::error::{Result, SoundprintError};
use rand::Rng;
use soundprint_fp::PermutationFile;
use std::collections::HashSet;
use std::path::Path;

/// Immutable set of per-table key indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutations {
    tables: Vec<Vec<usize>>,
}

impl Permutations {
    /// Wrap raw rows, rejecting empty or inconsistent sets
    pub fn new(tables: Vec<Vec<usize>>) -> Result<Self> {
        let keys = match tables.first() {
            Some(row) if !row.is_empty() => row.len(),
            _ => return Err(SoundprintError::config("permutation set is empty")),
        };

        for (t, row) in tables.iter().enumerate() {
            if row.len() != keys {
                return Err(SoundprintError::config(format!(
                    "permutation table {} has {} keys, expected {}",
                    t,
                    row.len(),
                    keys
                )));
            }
            let distinct: HashSet<_> = row.iter().collect();
            if distinct.len() != row.len() {
                return Err(SoundprintError::config(format!(
                    "permutation table {} repeats an index",
                    t
                )));
            }
        }

        Ok(Self { tables })
    }

    /// Load the permutation artifact; any failure is fatal configuration
    pub fn load(path: &Path) -> Result<Self> {
        let file = PermutationFile::load(path)
            .map_err(|e| SoundprintError::Configuration(format!("{:#}", e)))?;
        let permutations = Self::new(file.rows)?;
        log::info!(
            "Loaded {} permutation tables of {} keys from {}",
            permutations.number_of_tables(),
            permutations.number_of_keys(),
            path.display()
        );
        Ok(permutations)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        PermutationFile::new(self.tables.clone()).save(path)
    }

    pub fn tables(&self) -> &[Vec<usize>] {
        &self.tables
    }

    pub fn number_of_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn number_of_keys(&self) -> usize {
        self.tables[0].len()
    }

    /// Check the set fits a fingerprint configuration before any hashing
    pub fn validate_against(&self, config: &FingerprintConfig) -> Result<()> {
        if self.number_of_tables() != config.number_of_hash_tables {
            return Err(SoundprintError::config(format!(
                "permutation set has {} tables, configuration expects {}",
                self.number_of_tables(),
                config.number_of_hash_tables
            )));
        }
        if self.number_of_keys() != config.number_of_keys {
            return Err(SoundprintError::config(format!(
                "permutation set has {} keys per table, configuration expects {}",
                self.number_of_keys(),
                config.number_of_keys
            )));
        }
        let range = config.start_index..config.end_index;
        if let Some(bad) = self.tables.iter().flatten().find(|&&i| !range.contains(&i)) {
            return Err(SoundprintError::config(format!(
                "permutation index {} outside {}..{}",
                bad, config.start_index, config.end_index
            )));
        }
        Ok(())
    }
}

/// Draw `tables` rows of `keys` distinct indices from `start..end`
///
/// Greedy rejection sampling, independent per table. Rows may share
/// indices with each other but never repeat one internally.
pub fn generate_permutations<R: Rng + ?Sized>(
    tables: usize,
    keys: usize,
    start: usize,
    end: usize,
    rng: &mut R,
) -> Result<Permutations> {
    if tables == 0 || keys == 0 {
        return Err(SoundprintError::config(
            "need at least one table and one key",
        ));
    }
    if start >= end || keys > end - start {
        return Err(SoundprintError::config(format!(
            "cannot draw {} distinct keys from {}..{}",
            keys, start, end
        )));
    }

    let mut rows = Vec::with_capacity(tables);
    for _ in 0..tables {
        let mut seen = HashSet::with_capacity(keys);
        let mut row = Vec::with_capacity(keys);
        while row.len() < keys {
            let index = rng.gen_range(start..end);
            if seen.insert(index) {
                row.push(index);
            }
        }
        rows.push(row);
    }

    Permutations::new(rows)
}

/// Generate a set matching `config`
pub fn generate_for_config<R: Rng + ?Sized>(
    config: &FingerprintConfig,
    rng: &mut R,
) -> Result<Permutations> {
    generate_permutations(
        config.number_of_hash_tables,
        config.number_of_keys,
        config.start_index,
        config.end_index,
        rng,
    )
}
