//! One ingestion: raw payload in, at most one summary appended.
//!
//! A payload that fails to parse abandons the ingestion before anything is
//! archived or appended, so the store only ever holds complete summaries.

use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

use crate::aggregate::Aggregator;
use crate::classify::FieldClassifier;
use crate::config::AppConfig;
use crate::country::CountryResolver;
use crate::error::{IngestError, Result};
use crate::loader::{load_payload, parse_payload};
use crate::store::{RawArchive, SummaryStore};
use crate::types::{Payload, StoredSummary};

#[derive(Debug, Clone)]
pub struct Ingestor {
    aggregator: Aggregator,
    archive: Option<RawArchive>,
}

impl Ingestor {
    pub fn new(aggregator: Aggregator, archive: Option<RawArchive>) -> Self {
        Self { aggregator, archive }
    }

    /// Build the resolver, classifier and archive described by `cfg`.
    pub fn from_config(cfg: &AppConfig) -> Self {
        let resolver = CountryResolver::load(cfg.mapping_file.as_deref());
        let classifier = FieldClassifier::new(cfg.classifier.clone(), resolver);
        Self::new(
            Aggregator::new(classifier),
            cfg.raw_dir.as_ref().map(RawArchive::new),
        )
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn ingest_bytes<S: SummaryStore + ?Sized>(
        &self,
        store: &mut S,
        bytes: &[u8],
        source: &str,
        retrieved_at: DateTime<Utc>,
    ) -> Result<StoredSummary> {
        let region_field = &self.aggregator.classifier().config().region_field;
        let payload = parse_payload(bytes, region_field).map_err(|e| {
            warn!(source, error = %e, "ingestion abandoned");
            e
        })?;
        self.commit(store, &payload, bytes, source, retrieved_at)
    }

    /// Ingest a payload file; the source defaults to the file name.
    pub fn ingest_file<S: SummaryStore + ?Sized>(
        &self,
        store: &mut S,
        path: &Path,
        source: Option<&str>,
        retrieved_at: DateTime<Utc>,
    ) -> Result<StoredSummary> {
        let source = match source {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            _ => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    IngestError::MalformedPayload(format!("no usable name for {}", path.display()))
                })?,
        };
        let region_field = &self.aggregator.classifier().config().region_field;
        let (payload, bytes) = load_payload(path, region_field).map_err(|e| {
            warn!(source = %source, error = %e, "ingestion abandoned");
            e
        })?;
        self.commit(store, &payload, &bytes, &source, retrieved_at)
    }

    fn commit<S: SummaryStore + ?Sized>(
        &self,
        store: &mut S,
        payload: &Payload,
        bytes: &[u8],
        source: &str,
        retrieved_at: DateTime<Utc>,
    ) -> Result<StoredSummary> {
        if let Payload::Regions(records) = payload {
            let classifier = self.aggregator.classifier();
            if !records.iter().any(|r| classifier.carries_nationality_data(r)) {
                info!(source, "payload carries no nationality data");
            }
        }
        let summary = self.aggregator.aggregate_payload(payload, source);

        if let Some(archive) = &self.archive {
            archive.write(retrieved_at, &summary.source, bytes)?;
        }

        let entry = StoredSummary {
            created_at: retrieved_at,
            summary,
        };
        store.append(entry.clone())?;
        info!(
            source = %entry.summary.source,
            shape = payload.kind(),
            records = payload.len(),
            regions = entry.summary.by_region.len(),
            nationalities = entry.summary.nationality_breakdown.len(),
            total = entry.summary.total,
            "ingested payload"
        );
        Ok(entry)
    }
}
