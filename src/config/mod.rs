//! Configuration for the ingestion engine and the CLI.
//!
//! Precedence: CLI flags > config file (JSON) > defaults. Every field has a
//! default, so an absent config file is a valid configuration.

mod defaults;

pub use defaults::*;

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a field qualifies as nationality data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Only names carrying a nationality marker.
    #[default]
    Strict,
    /// Also names with any segment that resolves to a country.
    Lenient,
}

/// Taxonomy of compound field names. The marker lists are block/allow lists,
/// matched case-insensitively as substrings of the field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub region_field: String,
    pub total_field: String,
    pub same_total_field: String,
    pub different_total_field: String,
    pub breakdown_field: String,
    pub separators: Vec<char>,
    pub nationality_markers: Vec<String>,
    pub same_markers: Vec<String>,
    pub different_markers: Vec<String>,
    pub subtotal_markers: Vec<String>,
    pub match_mode: MatchMode,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            region_field: DEFAULT_REGION_FIELD.to_string(),
            total_field: DEFAULT_TOTAL_FIELD.to_string(),
            same_total_field: DEFAULT_SAME_TOTAL_FIELD.to_string(),
            different_total_field: DEFAULT_DIFFERENT_TOTAL_FIELD.to_string(),
            breakdown_field: DEFAULT_BREAKDOWN_FIELD.to_string(),
            separators: DEFAULT_SEPARATORS.to_vec(),
            nationality_markers: owned(DEFAULT_NATIONALITY_MARKERS),
            same_markers: owned(DEFAULT_SAME_MARKERS),
            different_markers: owned(DEFAULT_DIFFERENT_MARKERS),
            subtotal_markers: owned(DEFAULT_SUBTOTAL_MARKERS),
            match_mode: MatchMode::Strict,
        }
    }
}

impl ClassifierConfig {
    /// True when `name` is one of the fixed, non-nationality fields.
    pub fn is_reserved(&self, name: &str) -> bool {
        name == self.region_field
            || name == self.total_field
            || name == self.same_total_field
            || name == self.different_total_field
            || name == self.breakdown_field
    }

    fn validate(&self) -> Result<()> {
        if self.separators.is_empty() {
            return Err(IngestError::Config("separators must not be empty".into()));
        }
        if self.region_field.trim().is_empty() {
            return Err(IngestError::Config("region_field must not be blank".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Optional `{"mappings": {...}}` country mapping document.
    pub mapping_file: Option<PathBuf>,
    /// Append-only JSON-lines summary log.
    pub store_path: PathBuf,
    /// Raw payload archive; `None` disables archiving.
    pub raw_dir: Option<PathBuf>,
    pub trend_points: usize,
    pub classifier: ClassifierConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mapping_file: None,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            raw_dir: Some(PathBuf::from(DEFAULT_RAW_DIR)),
            trend_points: DEFAULT_TREND_POINTS,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from an optional JSON file. No path means defaults; a path that
    /// cannot be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(IngestError::read(path))?;
        let cfg: AppConfig = serde_json::from_str(&text)
            .map_err(|e| IngestError::Config(format!("{}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trend_points == 0 {
            return Err(IngestError::Config("trend_points must be at least 1".into()));
        }
        self.classifier.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"trend_points": 4, "classifier": {{"match_mode": "lenient", "separators": ["_", "-"]}}}}"#
        )
        .unwrap();
        let cfg = AppConfig::load(Some(f.path())).unwrap();
        assert_eq!(cfg.trend_points, 4);
        assert_eq!(cfg.classifier.match_mode, MatchMode::Lenient);
        assert_eq!(cfg.classifier.separators, vec!['_', '-']);
        assert_eq!(cfg.classifier.region_field, "region");
        assert_eq!(cfg.store_path, PathBuf::from(DEFAULT_STORE_PATH));
    }

    #[test]
    fn rejects_invalid_values() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"trend_points": 0}}"#).unwrap();
        assert!(matches!(
            AppConfig::load(Some(f.path())),
            Err(IngestError::Config(_))
        ));

        let mut g = tempfile::NamedTempFile::new().unwrap();
        write!(g, "not json").unwrap();
        assert!(matches!(
            AppConfig::load(Some(g.path())),
            Err(IngestError::Config(_))
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/no/such/config.json"))).unwrap_err();
        assert!(matches!(err, IngestError::Read { .. }));
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }
}
