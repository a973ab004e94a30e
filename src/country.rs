//! Free-text nationality resolution.
//!
//! A [`CountryResolver`] owns an immutable variant → canonical table built once
//! (from a mapping file or the built-in defaults) and shared through `Arc`, so
//! one resolver can be cloned into as many concurrent readers as needed.

use once_cell::sync::Lazy;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

type MappingTable = HashMap<String, String>;

const BUILTIN_MAPPINGS: &[(&str, &[&str])] = &[
    (
        "Taiwan",
        &["tw", "twn", "roc", "republic of china", "台灣", "臺灣", "中華民國", "本國", "本國籍", "domestic"],
    ),
    (
        "Mainland China",
        &["mainland", "china", "prc", "cn", "chn", "中國大陸", "大陸", "大陸地區", "中國"],
    ),
    ("Hong Kong", &["hongkong", "hk", "hkg", "香港"]),
    ("Macau", &["macao", "mo", "mac", "澳門"]),
    ("Philippines", &["philippine", "ph", "phl", "菲律賓"]),
    ("Vietnam", &["viet nam", "vn", "vnm", "越南"]),
    ("Myanmar", &["burma", "mm", "mmr", "緬甸"]),
    ("Thailand", &["th", "tha", "泰國"]),
    ("Japan", &["jp", "jpn", "日本"]),
    (
        "South Korea",
        &["korea", "republic of korea", "kr", "kor", "韓國", "南韓"],
    ),
    (
        "USA",
        &["us", "united states", "united states of america", "america", "美國"],
    ),
    ("Canada", &["ca", "can", "加拿大"]),
    (
        "UK",
        &["united kingdom", "great britain", "britain", "gb", "gbr", "england", "英國"],
    ),
    ("Australia", &["au", "aus", "澳洲", "澳大利亞"]),
    ("New Zealand", &["nz", "nzl", "紐西蘭"]),
];

// Built-in table, shared by every resolver that falls back to defaults.
static BUILTIN_TABLE: Lazy<Arc<MappingTable>> = Lazy::new(|| {
    let mut table = MappingTable::new();
    for (canonical, variants) in BUILTIN_MAPPINGS {
        register(&mut table, canonical, variants.iter().copied());
    }
    Arc::new(table)
});

/// Normalize a token for lookup: trim, lowercase and drop every character
/// that is not a letter, digit or whitespace. Internal whitespace is kept.
pub fn normalize_token(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

// The canonical name is registered before its variants; the first
// registration of a key wins.
fn register<'a>(
    table: &mut MappingTable,
    canonical: &'a str,
    variants: impl Iterator<Item = &'a str>,
) {
    for variant in std::iter::once(canonical).chain(variants) {
        let key = normalize_token(variant);
        if key.is_empty() {
            continue;
        }
        table.entry(key).or_insert_with(|| canonical.to_string());
    }
}

/// On-disk mapping document: `{"mappings": {"Canonical": ["variant", ...]}}`.
///
/// Entries keep file order so that collisions resolve to the canonical name
/// registered first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountryMappingFile {
    #[serde(deserialize_with = "ordered_entries")]
    pub mappings: Vec<(String, Vec<String>)>,
}

fn ordered_entries<'de, D>(deserializer: D) -> Result<Vec<(String, Vec<String>)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, Vec<String>)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of canonical country name to variant list")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((k, v)) = map.next_entry::<String, Vec<String>>()? {
                out.push((k, v));
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}

/// Where a resolver's table came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingSource {
    BuiltIn,
    File(String),
}

#[derive(Debug, Clone)]
pub struct CountryResolver {
    table: Arc<MappingTable>,
    source: MappingSource,
}

impl Default for CountryResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CountryResolver {
    pub fn builtin() -> Self {
        Self {
            table: Arc::clone(&*BUILTIN_TABLE),
            source: MappingSource::BuiltIn,
        }
    }

    /// Build from a parsed mapping document. An empty document yields the
    /// built-in table.
    pub fn from_mappings(doc: &CountryMappingFile, origin: &str) -> Self {
        let mut table = MappingTable::new();
        for (canonical, variants) in &doc.mappings {
            let canonical = canonical.trim();
            if canonical.is_empty() {
                continue;
            }
            register(&mut table, canonical, variants.iter().map(String::as_str));
        }
        if table.is_empty() {
            info!(origin, "country mapping is empty, using built-in defaults");
            return Self::builtin();
        }
        Self {
            table: Arc::new(table),
            source: MappingSource::File(origin.to_string()),
        }
    }

    /// Load the mapping file when one is configured and readable; otherwise
    /// fall back to the built-in table. Never fails.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("no country mapping file configured, using built-in defaults");
            return Self::builtin();
        };
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                info!(path = %path.display(), error = %e, "country mapping file unavailable, using built-in defaults");
                return Self::builtin();
            }
        };
        match serde_json::from_str::<CountryMappingFile>(&text) {
            Ok(doc) => Self::from_mappings(&doc, &path.display().to_string()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed country mapping file, using built-in defaults");
                Self::builtin()
            }
        }
    }

    pub fn source(&self) -> &MappingSource {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Canonical name for `raw`, or `None` when no variant matches.
    pub fn try_resolve(&self, raw: &str) -> Option<String> {
        let key = normalize_token(raw);
        if key.is_empty() {
            return None;
        }
        self.table.get(&key).cloned()
    }

    /// Canonical name for `raw`; unmatched input passes through trimmed.
    pub fn resolve(&self, raw: &str) -> String {
        self.try_resolve(raw).unwrap_or_else(|| raw.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn normalization_strips_punctuation_and_case() {
        assert_eq!(normalize_token("  U.S.A. "), "usa");
        assert_eq!(normalize_token("New  Zealand!"), "new  zealand");
        assert_eq!(normalize_token("Hong-Kong"), "hongkong");
        assert_eq!(normalize_token("日本"), "日本");
    }

    #[test]
    fn builtin_covers_common_variants() {
        let r = CountryResolver::builtin();
        assert_eq!(r.resolve("JPN"), "Japan");
        assert_eq!(r.resolve("日本"), "Japan");
        assert_eq!(r.resolve("u.s."), "USA");
        assert_eq!(r.resolve("Viet Nam"), "Vietnam");
        assert_eq!(r.resolve("大陸地區"), "Mainland China");
        assert_eq!(r.resolve("Macao"), "Macau");
        assert_eq!(r.resolve("new zealand"), "New Zealand");
        assert_eq!(r.resolve("Taiwan"), "Taiwan");
        assert_eq!(*r.source(), MappingSource::BuiltIn);
    }

    #[test]
    fn unmatched_input_passes_through_trimmed() {
        let r = CountryResolver::builtin();
        assert_eq!(r.resolve("  Atlantis "), "Atlantis");
        assert_eq!(r.try_resolve("Atlantis"), None);
        assert_eq!(r.try_resolve("   "), None);
    }

    #[test]
    fn first_registration_wins_on_collision() {
        let doc: CountryMappingFile = serde_json::from_str(
            r#"{"mappings": {"Zeta": ["shared", "z"], "Alpha": ["shared", "a"]}}"#,
        )
        .unwrap();
        let r = CountryResolver::from_mappings(&doc, "inline");
        assert_eq!(r.resolve("SHARED"), "Zeta");
        assert_eq!(r.resolve("a"), "Alpha");
        assert_eq!(r.try_resolve("japan"), None);
    }

    #[test]
    fn missing_or_malformed_file_falls_back() {
        let missing = CountryResolver::load(Some(Path::new("/definitely/not/here.json")));
        assert_eq!(*missing.source(), MappingSource::BuiltIn);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "{{not json").unwrap();
        let r = CountryResolver::load(Some(bad.path()));
        assert_eq!(*r.source(), MappingSource::BuiltIn);

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        write!(empty, r#"{{"mappings": {{}}}}"#).unwrap();
        let r = CountryResolver::load(Some(empty.path()));
        assert_eq!(*r.source(), MappingSource::BuiltIn);
    }

    #[test]
    fn loads_mapping_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"mappings": {{"Indonesia": ["ID", "印尼"]}}}}"#).unwrap();
        let r = CountryResolver::load(Some(f.path()));
        assert!(matches!(r.source(), MappingSource::File(_)));
        assert_eq!(r.resolve("印尼"), "Indonesia");
        assert_eq!(r.resolve("id"), "Indonesia");
    }
}
