//! Append-only summary storage and the raw payload archive.
//!
//! Summaries are never updated in place: each ingestion appends one entry
//! keyed by its retrieval time, and readers take the newest N.

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{IngestError, Result};
use crate::types::StoredSummary;

pub trait SummaryStore {
    fn append(&mut self, entry: StoredSummary) -> Result<()>;

    /// Up to `n` entries, newest first.
    fn list_recent(&self, n: usize) -> Result<Vec<StoredSummary>>;
}

// Stable sort keeps insertion order among equal timestamps; later appends
// count as newer.
fn newest_first(mut entries: Vec<StoredSummary>, n: usize) -> Vec<StoredSummary> {
    entries.reverse();
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries.truncate(n);
    entries
}

#[derive(Debug, Default, Clone)]
pub struct MemorySummaryStore {
    entries: Vec<StoredSummary>,
}

impl MemorySummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SummaryStore for MemorySummaryStore {
    fn append(&mut self, entry: StoredSummary) -> Result<()> {
        self.entries.push(entry);
        Ok(())
    }

    fn list_recent(&self, n: usize) -> Result<Vec<StoredSummary>> {
        Ok(newest_first(self.entries.clone(), n))
    }
}

/// One JSON object per line: `{"createdAt": ..., "summary": {...}}`.
#[derive(Debug, Clone)]
pub struct JsonlSummaryStore {
    path: PathBuf,
}

impl JsonlSummaryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<StoredSummary>> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(IngestError::read(&self.path)(e)),
        };
        let mut entries = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(IngestError::read(&self.path))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredSummary>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = idx + 1,
                    error = %e,
                    "skipping unreadable summary entry"
                ),
            }
        }
        Ok(entries)
    }
}

impl SummaryStore for JsonlSummaryStore {
    fn append(&mut self, entry: StoredSummary) -> Result<()> {
        // Serialize before touching the file so a failure leaves it untouched.
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(IngestError::write(dir))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(IngestError::write(&self.path))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(IngestError::write(&self.path))?;
        debug!(path = %self.path.display(), created_at = %entry.created_at, "appended summary");
        Ok(())
    }

    fn list_recent(&self, n: usize) -> Result<Vec<StoredSummary>> {
        Ok(newest_first(self.read_all()?, n))
    }
}

/// Keeps the raw bytes of every ingested payload, one file per ingestion.
#[derive(Debug, Clone)]
pub struct RawArchive {
    dir: PathBuf,
}

impl RawArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn write(&self, retrieved_at: DateTime<Utc>, source: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(IngestError::write(&self.dir))?;
        let stem: String = source
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        let name = format!("{}_{}.json", retrieved_at.format("%Y%m%dT%H%M%S%.3fZ"), stem);
        let path = self.dir.join(name);
        fs::write(&path, bytes).map_err(IngestError::write(&path))?;
        debug!(path = %path.display(), bytes = bytes.len(), "archived raw payload");
        Ok(path)
    }
}
