use chrono::{DateTime, Utc};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use tabled::Tabled;

use crate::util::count_from_value;

/// One region's full breakdown for one reporting period, as delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRegionRecord(pub Map<String, Value>);

impl RawRegionRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for RawRegionRecord {
    fn from(m: Map<String, Value>) -> Self {
        Self(m)
    }
}

/// Rollup row of the older payload format: one total per area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyAreaRecord {
    pub area: String,
    #[serde(default)]
    pub total: Value,
}

/// Shape of a raw payload, decided once at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Regions(Vec<RawRegionRecord>),
    Legacy(Vec<LegacyAreaRecord>),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Regions(_) => "regions",
            Payload::Legacy(_) => "legacy",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Regions(r) => r.len(),
            Payload::Legacy(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionTotals {
    pub region: String,
    pub total: u64,
    pub same_gender_pairing: u64,
    pub different_gender_pairing: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationalityCounts {
    #[serde(default)]
    pub same: u64,
    #[serde(default)]
    pub different: u64,
}

impl NationalityCounts {
    pub fn total(&self) -> u64 {
        self.same.saturating_add(self.different)
    }
}

/// Canonical country → counts, kept in presentation order (descending by
/// `same + different`, then name). Zero-count entries are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NationalityBreakdown(Vec<(String, NationalityCounts)>);

impl NationalityBreakdown {
    pub fn from_counts(counts: HashMap<String, NationalityCounts>) -> Self {
        Self::from_entries(counts.into_iter().collect())
    }

    fn from_entries(mut entries: Vec<(String, NationalityCounts)>) -> Self {
        entries.retain(|(_, c)| c.total() > 0);
        entries.sort_by(|a, b| match b.1.total().cmp(&a.1.total()) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        Self(entries)
    }

    pub fn get(&self, country: &str) -> Option<&NationalityCounts> {
        self.0.iter().find(|(c, _)| c == country).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NationalityCounts)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for NationalityBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (country, counts) in &self.0 {
            map.serialize_entry(country, counts)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NationalityBreakdown {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BreakdownVisitor;

        impl<'de> Visitor<'de> for BreakdownVisitor {
            type Value = NationalityBreakdown;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of country to {same, different}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, NationalityCounts>()? {
                    entries.push((k, v));
                }
                Ok(NationalityBreakdown::from_entries(entries))
            }
        }

        deserializer.deserialize_map(BreakdownVisitor)
    }
}

/// The aggregation engine's sole output. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSummary {
    pub source: String,
    pub total: u64,
    pub total_different_gender_pairing: u64,
    pub total_same_gender_pairing: u64,
    pub by_region: Vec<RegionTotals>,
    pub nationality_breakdown: NationalityBreakdown,
}

impl NormalizedSummary {
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            total: 0,
            total_different_gender_pairing: 0,
            total_same_gender_pairing: 0,
            by_region: Vec::new(),
            nationality_breakdown: NationalityBreakdown::default(),
        }
    }
}

/// Summary written by the older model: nationality data is a flat array of
/// per-period counts instead of a structured breakdown.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySummary {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub total: Option<Value>,
    pub nationality_breakdown: Vec<Value>,
}

/// Any summary shape found in the store, current model first.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HistoricalSummary {
    Current(NormalizedSummary),
    Legacy(LegacySummary),
}

impl From<HistoricalSummary> for NormalizedSummary {
    fn from(h: HistoricalSummary) -> Self {
        match h {
            HistoricalSummary::Current(s) => s,
            HistoricalSummary::Legacy(l) => {
                let total = match &l.total {
                    Some(v) if !v.is_null() => count_from_value(v),
                    _ => l
                        .nationality_breakdown
                        .iter()
                        .map(count_from_value)
                        .fold(0u64, u64::saturating_add),
                };
                let mut s = NormalizedSummary::empty(l.source.unwrap_or_else(|| "legacy".into()));
                s.total = total;
                s
            }
        }
    }
}

/// A summary together with the time its payload was retrieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSummary {
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "historical_summary")]
    pub summary: NormalizedSummary,
}

fn historical_summary<'de, D: Deserializer<'de>>(d: D) -> Result<NormalizedSummary, D::Error> {
    HistoricalSummary::deserialize(d).map(NormalizedSummary::from)
}

// ----------------------------- Terminal / CSV rows -----------------------------

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
    #[serde(rename = "SameGenderPairing")]
    #[tabled(rename = "SameGenderPairing")]
    pub same: String,
    #[serde(rename = "DifferentGenderPairing")]
    #[tabled(rename = "DifferentGenderPairing")]
    pub different: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct NationalityRow {
    #[serde(rename = "Country")]
    #[tabled(rename = "Country")]
    pub country: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
    #[serde(rename = "Same")]
    #[tabled(rename = "Same")]
    pub same: String,
    #[serde(rename = "Different")]
    #[tabled(rename = "Different")]
    pub different: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendRow {
    #[serde(rename = "RetrievedAt")]
    #[tabled(rename = "RetrievedAt")]
    pub retrieved_at: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn breakdown_serializes_in_presentation_order() {
        let mut counts = HashMap::new();
        counts.insert("Japan".to_string(), NationalityCounts { same: 1, different: 2 });
        counts.insert("Vietnam".to_string(), NationalityCounts { same: 0, different: 9 });
        counts.insert("Ghost".to_string(), NationalityCounts::default());
        let b = NationalityBreakdown::from_counts(counts);
        assert_eq!(b.len(), 2);
        let s = serde_json::to_string(&b).unwrap();
        assert_eq!(
            s,
            r#"{"Vietnam":{"same":0,"different":9},"Japan":{"same":1,"different":2}}"#
        );
    }

    #[test]
    fn legacy_summary_becomes_total_only() {
        let stored: StoredSummary = serde_json::from_value(json!({
            "createdAt": "2024-01-01T00:00:00Z",
            "summary": {"source": "old.json", "nationalityBreakdown": [10, "20", 5]}
        }))
        .unwrap();
        assert_eq!(stored.summary.total, 35);
        assert_eq!(stored.summary.source, "old.json");
        assert!(stored.summary.by_region.is_empty());
        assert!(stored.summary.nationality_breakdown.is_empty());

        let with_total: StoredSummary = serde_json::from_value(json!({
            "createdAt": "2024-01-01T00:00:00Z",
            "summary": {"total": 99, "nationalityBreakdown": [1, 2]}
        }))
        .unwrap();
        assert_eq!(with_total.summary.total, 99);
        assert_eq!(with_total.summary.total_same_gender_pairing, 0);
    }

    #[test]
    fn huge_counts_saturate_instead_of_overflowing() {
        let c = NationalityCounts { same: u64::MAX, different: 1 };
        assert_eq!(c.total(), u64::MAX);

        let stored: StoredSummary = serde_json::from_value(json!({
            "createdAt": "2024-01-01T00:00:00Z",
            "summary": {"nationalityBreakdown": ["18446744073709551615", 7]}
        }))
        .unwrap();
        assert_eq!(stored.summary.total, u64::MAX);
    }

    #[test]
    fn current_summary_round_trips_through_store_shape() {
        let json = json!({
            "createdAt": "2024-02-01T08:30:00Z",
            "summary": {
                "source": "feed",
                "total": 3,
                "totalDifferentGenderPairing": 2,
                "totalSameGenderPairing": 1,
                "byRegion": [{"region": "North", "total": 3, "sameGenderPairing": 1, "differentGenderPairing": 2}],
                "nationalityBreakdown": {"Japan": {"same": 1, "different": 0}}
            }
        });
        let stored: StoredSummary = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(stored.summary.by_region[0].region, "North");
        assert_eq!(serde_json::to_value(&stored).unwrap(), json);
    }
}
