//! Dashboard views derived from the most recent stored summaries.
//!
//! The snapshot always comes from the single newest summary; older ones are
//! only used for the trend series and the percent change.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::store::SummaryStore;
use crate::types::{NationalityCounts, RegionTotals, StoredSummary};
use crate::util::round2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub created_at: Option<DateTime<Utc>>,
    pub total: u64,
    pub total_same_gender_pairing: u64,
    pub total_different_gender_pairing: u64,
    pub by_region: Vec<RegionTotals>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NationalitySnapshot {
    /// Country → same + different, in breakdown order.
    pub totals: Vec<(String, u64)>,
    pub breakdown: Vec<(String, NationalityCounts)>,
}

impl NationalitySnapshot {
    pub fn is_empty(&self) -> bool {
        self.breakdown.is_empty()
    }
}

/// Read-only view over summaries ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    entries: Vec<StoredSummary>,
}

impl DashboardView {
    /// `entries` must already be ordered newest first.
    pub fn new(entries: Vec<StoredSummary>) -> Self {
        Self { entries }
    }

    pub fn from_store<S: SummaryStore + ?Sized>(store: &S, n: usize) -> Result<Self> {
        Ok(Self::new(store.list_recent(n)?))
    }

    pub fn latest(&self) -> Option<&StoredSummary> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `n` points in the order supplied; callers re-sort for display.
    pub fn build_trend(&self, n: usize) -> Vec<TrendPoint> {
        self.entries
            .iter()
            .take(n)
            .map(|e| TrendPoint {
                timestamp: e.created_at,
                total: e.summary.total,
            })
            .collect()
    }

    pub fn build_snapshot(&self) -> Snapshot {
        let Some(latest) = self.latest() else {
            return Snapshot::default();
        };
        let s = &latest.summary;
        Snapshot {
            created_at: Some(latest.created_at),
            total: s.total,
            total_same_gender_pairing: s.total_same_gender_pairing,
            total_different_gender_pairing: s.total_different_gender_pairing,
            by_region: s.by_region.clone(),
        }
    }

    /// Newest summary's breakdown verbatim; no fallback to older summaries.
    pub fn build_nationality_snapshot(&self) -> NationalitySnapshot {
        let Some(latest) = self.latest() else {
            return NationalitySnapshot::default();
        };
        let breakdown = &latest.summary.nationality_breakdown;
        NationalitySnapshot {
            totals: breakdown
                .iter()
                .map(|(c, counts)| (c.to_string(), counts.total()))
                .collect(),
            breakdown: breakdown
                .iter()
                .map(|(c, counts)| (c.to_string(), *counts))
                .collect(),
        }
    }

    /// Change of the newest total against the one before, in percent with
    /// two decimals. 0 when there is no previous summary or its total is 0.
    pub fn percent_change(&self) -> f64 {
        let (Some(current), Some(previous)) = (self.entries.first(), self.entries.get(1)) else {
            return 0.0;
        };
        let prev = previous.summary.total;
        if prev == 0 {
            return 0.0;
        }
        let cur = current.summary.total as f64;
        round2((cur - prev as f64) / prev as f64 * 100.0)
    }
}
