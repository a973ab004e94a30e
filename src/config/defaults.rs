//! Default constants for the ingestion engine.

// =============================================================================
// Field taxonomy
// =============================================================================

/// Field carrying the administrative region of a record.
pub const DEFAULT_REGION_FIELD: &str = "region";

/// Region label used when a record has no usable region field.
pub const UNKNOWN_REGION: &str = "unknown";

/// Per-region subtotal fields, read by fixed name.
pub const DEFAULT_TOTAL_FIELD: &str = "total_all";
pub const DEFAULT_SAME_TOTAL_FIELD: &str = "same_total";
pub const DEFAULT_DIFFERENT_TOTAL_FIELD: &str = "different_total";

/// Structured per-record breakdown `{country: {same, different}}`.
pub const DEFAULT_BREAKDOWN_FIELD: &str = "nationalityBreakdown";

/// Characters separating the segments of a compound field name.
pub const DEFAULT_SEPARATORS: &[char] = &['_', '/', '|'];

/// A field is nationality data only if its name carries one of these.
pub const DEFAULT_NATIONALITY_MARKERS: &[&str] = &[
    "foreign",
    "nationality",
    "mainland",
    "domestic",
    "hkmacau",
    "國籍",
    "外籍",
    "外國",
    "大陸",
    "港澳",
];

pub const DEFAULT_SAME_MARKERS: &[&str] = &["same", "相同性別", "同性"];

pub const DEFAULT_DIFFERENT_MARKERS: &[&str] = &["different", "opposite", "不同性別", "異性"];

/// Rollup markers; a country token containing any of these is a subtotal.
pub const DEFAULT_SUBTOTAL_MARKERS: &[&str] = &[
    "total",
    "subtotal",
    "registered",
    "unregistered",
    "合計",
    "小計",
    "總計",
    "登記",
    "未登記",
];

// =============================================================================
// Storage and dashboard
// =============================================================================

pub const DEFAULT_STORE_PATH: &str = "data/summaries.jsonl";

pub const DEFAULT_RAW_DIR: &str = "data/raw";

/// Number of summaries shown in the trend series.
pub const DEFAULT_TREND_POINTS: usize = 12;
