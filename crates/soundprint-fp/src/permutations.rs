//! Permutation artifact format
//!
//! Plain text, one line per hash table, comma separated indices.
//! A trailing comma is tolerated (the writer always emits one).

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Parse failure inside a permutation artifact
#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("line {line}: invalid index '{token}'")]
    InvalidIndex { line: usize, token: String },

    #[error("line {line}: empty permutation row")]
    EmptyRow { line: usize },

    #[error("permutation file contains no rows")]
    Empty,
}

/// Raw permutation rows as stored on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationFile {
    pub rows: Vec<Vec<usize>>,
}

impl PermutationFile {
    pub fn new(rows: Vec<Vec<usize>>) -> Self {
        Self { rows }
    }

    /// Parse the text representation
    pub fn parse(content: &str) -> std::result::Result<Self, FormatError> {
        let mut rows = Vec::new();

        for (idx, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            let mut row = Vec::new();
            for token in line.split(',') {
                let token = token.trim();
                if token.is_empty() {
                    // trailing comma
                    continue;
                }
                let value = token.parse::<usize>().map_err(|_| FormatError::InvalidIndex {
                    line: idx + 1,
                    token: token.to_string(),
                })?;
                row.push(value);
            }

            if row.is_empty() {
                return Err(FormatError::EmptyRow { line: idx + 1 });
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(FormatError::Empty);
        }

        Ok(Self { rows })
    }

    /// Render the text representation
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            for index in row {
                out.push_str(&index.to_string());
                out.push(',');
            }
            out.push('\n');
        }
        out
    }

    /// Load a permutation artifact from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read permutation file: {}", path.display()))?;
        let file = Self::parse(&content)
            .with_context(|| format!("Corrupt permutation file: {}", path.display()))?;
        Ok(file)
    }

    /// Write the permutation artifact to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create permutation file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(self.render().as_bytes())?;
        writer.flush()?;

        Ok(())
    }
}
