//! Classification of compound field names such as `same_foreign_Japan`.
//!
//! A field name encodes up to three segments (gender pairing, nationality
//! category, country or subtotal marker). The classifier decides whether a
//! field is nationality data and, if so, which country and pairing it counts
//! towards. It never fails: anything ambiguous is simply not a match.

use serde_json::Value;

use crate::config::{ClassifierConfig, MatchMode};
use crate::country::CountryResolver;
use crate::types::RawRegionRecord;
use crate::util::count_from_value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
    Same,
    Different,
}

/// Country token pulled out of a field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryToken {
    /// Segment as written in the field name.
    pub raw: String,
    /// Canonical name, or `raw` when nothing resolved.
    pub label: String,
    pub resolved: bool,
}

/// A field that counts towards one country's same/different tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub country: String,
    pub pairing: Pairing,
    pub value: u64,
}

fn lowered(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect()
}

#[derive(Debug, Clone)]
pub struct FieldClassifier {
    config: ClassifierConfig,
    resolver: CountryResolver,
    nationality_markers: Vec<String>,
    same_markers: Vec<String>,
    different_markers: Vec<String>,
    subtotal_markers: Vec<String>,
}

impl FieldClassifier {
    pub fn new(config: ClassifierConfig, resolver: CountryResolver) -> Self {
        Self {
            nationality_markers: lowered(&config.nationality_markers),
            same_markers: lowered(&config.same_markers),
            different_markers: lowered(&config.different_markers),
            subtotal_markers: lowered(&config.subtotal_markers),
            config,
            resolver,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn resolver(&self) -> &CountryResolver {
        &self.resolver
    }

    fn segments<'n>(&self, name: &'n str) -> Vec<&'n str> {
        name.split(|c: char| self.config.separators.contains(&c))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn contains_any(haystack: &str, markers: &[String]) -> bool {
        let lower = haystack.to_lowercase();
        markers.iter().any(|m| lower.contains(m.as_str()))
    }

    /// Whether `name` is nationality data under `mode`.
    pub fn is_relevant(&self, name: &str, mode: MatchMode) -> bool {
        if Self::contains_any(name, &self.nationality_markers) {
            return true;
        }
        match mode {
            MatchMode::Strict => false,
            MatchMode::Lenient => self
                .segments(name)
                .iter()
                .any(|s| self.resolver.try_resolve(s).is_some()),
        }
    }

    /// Same only when a same-marker is present without a different-marker.
    /// Unmarked names default to different-pairing.
    pub fn pairing(&self, name: &str) -> Pairing {
        let same = Self::contains_any(name, &self.same_markers);
        let different = Self::contains_any(name, &self.different_markers);
        if same && !different {
            Pairing::Same
        } else {
            Pairing::Different
        }
    }

    /// Last segment first, then the first resolving segment left to right,
    /// then the unmodified last segment as a literal label. A last segment
    /// carrying a rollup marker is returned as is, without the scan.
    pub fn extract_country(&self, name: &str) -> Option<CountryToken> {
        let segments = self.segments(name);
        let last = *segments.last()?;
        if let Some(label) = self.resolver.try_resolve(last) {
            return Some(CountryToken {
                raw: last.to_string(),
                label,
                resolved: true,
            });
        }
        if !Self::contains_any(last, &self.subtotal_markers) {
            for seg in &segments {
                if let Some(label) = self.resolver.try_resolve(seg) {
                    return Some(CountryToken {
                        raw: seg.to_string(),
                        label,
                        resolved: true,
                    });
                }
            }
        }
        Some(CountryToken {
            raw: last.to_string(),
            label: last.to_string(),
            resolved: false,
        })
    }

    /// True when either form of the token carries a rollup marker.
    pub fn is_subtotal(&self, token: &CountryToken) -> bool {
        Self::contains_any(&token.raw, &self.subtotal_markers)
            || Self::contains_any(&token.label, &self.subtotal_markers)
    }

    pub fn classify(&self, name: &str, value: &Value) -> Option<FieldMatch> {
        self.classify_with(name, value, self.config.match_mode)
    }

    pub fn classify_with(&self, name: &str, value: &Value, mode: MatchMode) -> Option<FieldMatch> {
        if self.config.is_reserved(name) || !self.is_relevant(name, mode) {
            return None;
        }
        let token = self.extract_country(name)?;
        if self.is_subtotal(&token) {
            return None;
        }
        let value = count_from_value(value);
        if value == 0 {
            return None;
        }
        Some(FieldMatch {
            country: token.label,
            pairing: self.pairing(name),
            value,
        })
    }

    /// Lenient check used to tell whether a record carries nationality data at all.
    pub fn carries_nationality_data(&self, record: &RawRegionRecord) -> bool {
        record
            .fields()
            .any(|(name, value)| self.classify_with(name, value, MatchMode::Lenient).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classifier() -> FieldClassifier {
        FieldClassifier::new(ClassifierConfig::default(), CountryResolver::builtin())
    }

    fn classifier_with(edit: impl FnOnce(&mut ClassifierConfig)) -> FieldClassifier {
        let mut cfg = ClassifierConfig::default();
        edit(&mut cfg);
        FieldClassifier::new(cfg, CountryResolver::builtin())
    }

    #[test]
    fn same_marker_with_country() {
        let c = classifier();
        let m = c.classify("same_foreign_Japan", &json!("5")).unwrap();
        assert_eq!(m.country, "Japan");
        assert_eq!(m.pairing, Pairing::Same);
        assert_eq!(m.value, 5);
    }

    #[test]
    fn different_and_unmarked_default_to_different() {
        let c = classifier();
        assert_eq!(c.pairing("different_foreign_Japan"), Pairing::Different);
        assert_eq!(c.pairing("opposite_foreign_Japan"), Pairing::Different);
        assert_eq!(c.pairing("foreign_Japan"), Pairing::Different);
        assert_eq!(c.pairing("same_or_different_foreign_Japan"), Pairing::Different);
        assert_eq!(c.pairing("不同性別_外國籍_日本"), Pairing::Different);
        assert_eq!(c.pairing("相同性別_外國籍_日本"), Pairing::Same);
    }

    #[test]
    fn chinese_field_names_resolve() {
        let c = classifier();
        let m = c.classify("相同性別_外國籍_日本", &json!(3)).unwrap();
        assert_eq!(m.country, "Japan");
        assert_eq!(m.pairing, Pairing::Same);
    }

    #[test]
    fn scans_segments_when_last_does_not_resolve() {
        let c = classifier();
        let t = c.extract_country("same_foreign_vn_brides").unwrap();
        assert_eq!(t.label, "Vietnam");
        assert!(t.resolved);

        let t = c.extract_country("same_foreign_Atlantis").unwrap();
        assert_eq!(t.label, "Atlantis");
        assert!(!t.resolved);
        let m = c.classify("same_foreign_Atlantis", &json!(2)).unwrap();
        assert_eq!(m.country, "Atlantis");
    }

    #[test]
    fn subtotals_are_discarded() {
        let c = classifier();
        assert!(c.classify("same_foreign_total", &json!(40)).is_none());
        assert!(c.classify("different_foreign_Subtotal", &json!(40)).is_none());
        assert!(c.classify("same_nationality_unregistered", &json!(1)).is_none());
        assert!(c.classify("相同性別_外國籍_合計", &json!(9)).is_none());
    }

    #[test]
    fn subtotal_suffix_is_not_credited_to_an_earlier_segment() {
        let c = classifier();
        let t = c.extract_country("different_domestic_total").unwrap();
        assert_eq!(t.raw, "total");
        assert!(!t.resolved);
        assert!(c.classify("different_domestic_total", &json!(500)).is_none());
        assert!(c.classify("same_foreign_jp_subtotal", &json!(2)).is_none());
        assert!(c.classify("same_mainland_合計", &json!(8)).is_none());
        assert_eq!(c.classify("same_foreign_jp", &json!(2)).unwrap().country, "Japan");
    }

    #[test]
    fn zero_and_malformed_values_are_dropped() {
        let c = classifier();
        assert!(c.classify("same_foreign_Japan", &json!("0")).is_none());
        assert!(c.classify("same_foreign_Japan", &json!(0)).is_none());
        assert!(c.classify("same_foreign_Japan", &json!("abc")).is_none());
        assert!(c.classify("same_foreign_Japan", &json!(null)).is_none());
        assert!(c.classify("same_foreign_Japan", &json!({"n": 1})).is_none());
    }

    #[test]
    fn strict_mode_requires_a_marker() {
        let c = classifier();
        assert!(c.classify("same_Japan", &json!(4)).is_none());
        let m = c.classify_with("same_Japan", &json!(4), MatchMode::Lenient).unwrap();
        assert_eq!(m.country, "Japan");
        assert!(c.classify("same_total", &json!(20)).is_none());
        assert!(c.classify("region", &json!("North")).is_none());
    }

    #[test]
    fn custom_subtotal_markers_replace_the_defaults() {
        let c = classifier_with(|cfg| cfg.subtotal_markers = vec!["ALL".into()]);
        assert!(c.classify("same_foreign_all", &json!(40)).is_none());
        assert!(c.classify("same_foreign_jp_all", &json!(40)).is_none());
        let m = c.classify("same_foreign_total", &json!(40)).unwrap();
        assert_eq!(m.country, "total");
        assert_eq!(c.classify("same_foreign_Japan", &json!(1)).unwrap().country, "Japan");
    }

    #[test]
    fn custom_pairing_markers_change_the_pairing() {
        let c = classifier_with(|cfg| {
            cfg.same_markers = vec!["ss".into()];
            cfg.different_markers = vec!["ds".into()];
        });
        assert_eq!(c.classify("ss_foreign_Japan", &json!(1)).unwrap().pairing, Pairing::Same);
        assert_eq!(c.classify("ds_foreign_Japan", &json!(1)).unwrap().pairing, Pairing::Different);
        assert_eq!(
            c.classify("same_foreign_Japan", &json!(1)).unwrap().pairing,
            Pairing::Different
        );
    }

    #[test]
    fn custom_separators_split_field_names() {
        let default = classifier();
        let m = default.classify("same-foreign-Japan", &json!(1)).unwrap();
        assert_eq!(m.country, "same-foreign-Japan");

        let c = classifier_with(|cfg| cfg.separators = vec!['-']);
        let m = c.classify("same-foreign-Japan", &json!(1)).unwrap();
        assert_eq!(m.country, "Japan");
        assert_eq!(m.pairing, Pairing::Same);
        assert!(c.classify("same-foreign-subtotal", &json!(1)).is_none());
    }

    #[test]
    fn detects_nationality_bearing_records() {
        let c = classifier();
        let with: RawRegionRecord = serde_json::from_value(json!({"region": "A", "same_jp": 1})).unwrap();
        let without: RawRegionRecord =
            serde_json::from_value(json!({"region": "A", "total_all": 10})).unwrap();
        assert!(c.carries_nationality_data(&with));
        assert!(!c.carries_nationality_data(&without));
    }
}
