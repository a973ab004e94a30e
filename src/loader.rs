use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{IngestError, Result};
use crate::types::{LegacyAreaRecord, Payload, RawRegionRecord};

const LEGACY_AREA_FIELD: &str = "area";

/// Parse raw payload bytes into one of the known shapes.
///
/// The region-record shape is tried first; the legacy `{area, total}` rollup
/// shape second. Anything else fails the whole payload.
pub fn parse_payload(bytes: &[u8], region_field: &str) -> Result<Payload> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| IngestError::MalformedPayload(format!("invalid json: {}", e)))?;
    let Value::Array(items) = value else {
        return Err(IngestError::MalformedPayload(
            "expected a json array of records".to_string(),
        ));
    };

    if items.iter().all(|item| is_region_record(item, region_field)) {
        let records: Vec<RawRegionRecord> = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(RawRegionRecord(map)),
                _ => None,
            })
            .collect();
        debug!(records = records.len(), "payload parsed as region records");
        return Ok(Payload::Regions(records));
    }

    match serde_json::from_value::<Vec<LegacyAreaRecord>>(Value::Array(items)) {
        Ok(rows) => {
            info!(rows = rows.len(), "payload parsed as legacy area rollups");
            Ok(Payload::Legacy(rows))
        }
        Err(e) => Err(IngestError::MalformedPayload(format!(
            "neither region records nor area rollups: {}",
            e
        ))),
    }
}

// An object is a region record unless it looks like an area rollup
// (carries `area` but not the region field).
fn is_region_record(item: &Value, region_field: &str) -> bool {
    match item {
        Value::Object(map) => {
            map.contains_key(region_field) || !map.contains_key(LEGACY_AREA_FIELD)
        }
        _ => false,
    }
}

/// Read and parse a payload file. The raw bytes are returned alongside so the
/// caller can archive exactly what was ingested.
pub fn load_payload(path: &Path, region_field: &str) -> Result<(Payload, Vec<u8>)> {
    let bytes = std::fs::read(path).map_err(IngestError::read(path))?;
    let payload = parse_payload(&bytes, region_field)?;
    Ok((payload, bytes))
}
