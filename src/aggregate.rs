//! Reduction of raw region records into one [`NormalizedSummary`].
//!
//! Pure computation: no I/O, no clock, no shared mutable state. Aggregating
//! the same payload twice yields identical summaries. Counts saturate at
//! `u64::MAX` instead of wrapping.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::classify::{CountryToken, FieldClassifier, Pairing};
use crate::config::UNKNOWN_REGION;
use crate::types::{
    LegacyAreaRecord, NationalityBreakdown, NationalityCounts, NormalizedSummary, Payload,
    RawRegionRecord, RegionTotals,
};
use crate::util::count_from_value;

const UNSPECIFIED_SOURCE: &str = "unspecified";

fn source_label(source_id: &str) -> String {
    let s = source_id.trim();
    if s.is_empty() {
        UNSPECIFIED_SOURCE.to_string()
    } else {
        s.to_string()
    }
}

fn region_key(value: Option<&Value>) -> String {
    let key = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if key.is_empty() {
        UNKNOWN_REGION.to_string()
    } else {
        key
    }
}

/// Keep the last item per key, in order of first appearance of the key.
fn latest_per_key<'a, T>(items: &'a [T], key: impl Fn(&T) -> String) -> Vec<(String, &'a T)> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<(String, &T)> = Vec::new();
    for item in items {
        let k = key(item);
        match slots.get(&k) {
            Some(&i) => out[i].1 = item,
            None => {
                slots.insert(k.clone(), out.len());
                out.push((k, item));
            }
        }
    }
    out
}

fn sort_regions(rows: &mut [RegionTotals]) {
    rows.sort_by(|a, b| match b.total.cmp(&a.total) {
        Ordering::Equal => a.region.cmp(&b.region),
        other => other,
    });
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    classifier: FieldClassifier,
}

impl Aggregator {
    pub fn new(classifier: FieldClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &FieldClassifier {
        &self.classifier
    }

    pub fn aggregate_payload(&self, payload: &Payload, source_id: &str) -> NormalizedSummary {
        match payload {
            Payload::Regions(records) => self.aggregate(records, source_id),
            Payload::Legacy(records) => self.aggregate_legacy(records, source_id),
        }
    }

    /// One summary from per-region records. The last record per region wins.
    pub fn aggregate(&self, records: &[RawRegionRecord], source_id: &str) -> NormalizedSummary {
        let cfg = self.classifier.config();
        let selected = latest_per_key(records, |r| region_key(r.get(&cfg.region_field)));

        let mut summary = NormalizedSummary::empty(source_label(source_id));
        let mut nationalities: HashMap<String, NationalityCounts> = HashMap::new();

        for (region, record) in &selected {
            let count = |field: &str| record.get(field).map(count_from_value).unwrap_or(0);
            let row = RegionTotals {
                region: region.clone(),
                total: count(&cfg.total_field),
                same_gender_pairing: count(&cfg.same_total_field),
                different_gender_pairing: count(&cfg.different_total_field),
            };
            summary.total = summary.total.saturating_add(row.total);
            summary.total_same_gender_pairing =
                summary.total_same_gender_pairing.saturating_add(row.same_gender_pairing);
            summary.total_different_gender_pairing = summary
                .total_different_gender_pairing
                .saturating_add(row.different_gender_pairing);
            summary.by_region.push(row);

            match record.get(&cfg.breakdown_field) {
                Some(Value::Object(breakdown)) => {
                    self.accumulate_structured(breakdown, &mut nationalities)
                }
                _ => self.accumulate_fields(record, &mut nationalities),
            }
        }

        sort_regions(&mut summary.by_region);
        summary.nationality_breakdown = NationalityBreakdown::from_counts(nationalities);

        debug!(
            source = %summary.source,
            records = records.len(),
            regions = summary.by_region.len(),
            nationalities = summary.nationality_breakdown.len(),
            total = summary.total,
            "aggregated region records"
        );
        summary
    }

    /// Inline scan: every field of the record goes through the classifier.
    fn accumulate_fields(
        &self,
        record: &RawRegionRecord,
        acc: &mut HashMap<String, NationalityCounts>,
    ) {
        for (name, value) in record.fields() {
            let Some(m) = self.classifier.classify(name, value) else {
                continue;
            };
            let entry = acc.entry(m.country).or_default();
            match m.pairing {
                Pairing::Same => entry.same = entry.same.saturating_add(m.value),
                Pairing::Different => entry.different = entry.different.saturating_add(m.value),
            }
        }
    }

    /// Structured path: `{country: {same, different}}` read directly.
    fn accumulate_structured(
        &self,
        breakdown: &Map<String, Value>,
        acc: &mut HashMap<String, NationalityCounts>,
    ) {
        let resolver = self.classifier.resolver();
        for (country, counts) in breakdown {
            let raw = country.trim();
            if raw.is_empty() {
                continue;
            }
            let token = match resolver.try_resolve(raw) {
                Some(label) => CountryToken {
                    raw: raw.to_string(),
                    label,
                    resolved: true,
                },
                None => CountryToken {
                    raw: raw.to_string(),
                    label: raw.to_string(),
                    resolved: false,
                },
            };
            if self.classifier.is_subtotal(&token) {
                continue;
            }
            let Value::Object(counts) = counts else {
                continue;
            };
            let same = counts.get("same").map(count_from_value).unwrap_or(0);
            let different = counts.get("different").map(count_from_value).unwrap_or(0);
            if same == 0 && different == 0 {
                continue;
            }
            let entry = acc.entry(token.label).or_default();
            entry.same = entry.same.saturating_add(same);
            entry.different = entry.different.saturating_add(different);
        }
    }

    /// Older `{area, total}` rollups: totals only, no pairing or nationality detail.
    pub fn aggregate_legacy(&self, records: &[LegacyAreaRecord], source_id: &str) -> NormalizedSummary {
        let selected = latest_per_key(records, |r| {
            let area = r.area.trim();
            if area.is_empty() {
                UNKNOWN_REGION.to_string()
            } else {
                area.to_string()
            }
        });

        let mut summary = NormalizedSummary::empty(source_label(source_id));
        for (area, record) in selected {
            let total = count_from_value(&record.total);
            summary.total = summary.total.saturating_add(total);
            summary.by_region.push(RegionTotals {
                region: area,
                total,
                same_gender_pairing: 0,
                different_gender_pairing: 0,
            });
        }
        sort_regions(&mut summary.by_region);

        debug!(
            source = %summary.source,
            areas = summary.by_region.len(),
            total = summary.total,
            "aggregated legacy area rollups"
        );
        summary
    }
}
