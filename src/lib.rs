//! Aggregation of marriage registration statistics.
//!
//! Raw government JSON (one record per administrative region, with compound
//! field names such as `same_foreign_Japan`) is reduced into a
//! [`NormalizedSummary`]: per-region totals, same/different gender-pairing
//! totals and a per-country nationality breakdown. Summaries are appended to
//! a [`SummaryStore`] and read back through a [`DashboardView`].
//!
//! ```text
//! payload ─► loader ─► Aggregator (FieldClassifier + CountryResolver)
//!                          │
//!                          ▼
//!                 NormalizedSummary ─► SummaryStore ─► DashboardView
//! ```
pub mod aggregate;
pub mod classify;
pub mod config;
pub mod country;
pub mod dashboard;
pub mod error;
pub mod ingest;
pub mod loader;
pub mod output;
pub mod store;
pub mod types;
pub mod util;

pub use aggregate::Aggregator;
pub use classify::{FieldClassifier, FieldMatch, Pairing};
pub use config::{AppConfig, ClassifierConfig, MatchMode};
pub use country::CountryResolver;
pub use dashboard::{DashboardView, NationalitySnapshot, Snapshot, TrendPoint};
pub use error::{IngestError, Result};
pub use ingest::Ingestor;
pub use store::{JsonlSummaryStore, MemorySummaryStore, RawArchive, SummaryStore};
pub use types::{
    NationalityBreakdown, NationalityCounts, NormalizedSummary, Payload, RawRegionRecord,
    RegionTotals, StoredSummary,
};
