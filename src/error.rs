use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors surfaced while loading, ingesting or storing summaries.
///
/// Field-level problems never show up here: the classifier and aggregator
/// absorb them. Only whole-payload and I/O failures propagate.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Reading a payload, mapping or config file failed.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The payload is not valid JSON or matches neither known shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the summary log, the raw archive or an export failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl IngestError {
    /// `map_err` adapter tagging an I/O failure with the file being read.
    pub fn read(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    /// `map_err` adapter tagging an I/O failure with the file being written.
    pub fn write(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| IngestError::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
