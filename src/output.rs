use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::dashboard::{NationalitySnapshot, Snapshot, TrendPoint};
use crate::error::{IngestError, Result};
use crate::types::{NationalityRow, RegionRow, TrendRow};
use crate::util::format_int;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(IngestError::write(dir))?;
    }
    Ok(())
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let file = std::fs::File::create(path).map_err(IngestError::write(path))?;
    let mut wtr = csv::Writer::from_writer(file);
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(IngestError::write(path))?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(IngestError::write(path))?;
    Ok(())
}

pub fn region_rows(snapshot: &Snapshot) -> Vec<RegionRow> {
    snapshot
        .by_region
        .iter()
        .map(|r| RegionRow {
            region: r.region.clone(),
            total: format_int(r.total),
            same: format_int(r.same_gender_pairing),
            different: format_int(r.different_gender_pairing),
        })
        .collect()
}

pub fn nationality_rows(snapshot: &NationalitySnapshot) -> Vec<NationalityRow> {
    snapshot
        .breakdown
        .iter()
        .map(|(country, c)| NationalityRow {
            country: country.clone(),
            total: format_int(c.total()),
            same: format_int(c.same),
            different: format_int(c.different),
        })
        .collect()
}

/// Trend rows in chronological order, oldest first.
pub fn trend_rows(points: &[TrendPoint]) -> Vec<TrendRow> {
    let mut points = points.to_vec();
    points.sort_by_key(|p| p.timestamp);
    points
        .into_iter()
        .map(|p| TrendRow {
            retrieved_at: p.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            total: format_int(p.total),
        })
        .collect()
}

/// Render up to `max_rows` rows as a markdown table.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_table(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegionTotals;
    use chrono::{TimeZone, Utc};

    #[test]
    fn region_rows_format_thousands() {
        let snap = Snapshot {
            by_region: vec![RegionTotals {
                region: "North".into(),
                total: 12345,
                same_gender_pairing: 345,
                different_gender_pairing: 12000,
            }],
            ..Snapshot::default()
        };
        let rows = region_rows(&snap);
        assert_eq!(rows[0].total, "12,345");
        let table = render_table(&rows, 5);
        assert!(table.contains("| North"));
        assert!(table.contains("12,000"));
    }

    #[test]
    fn trend_rows_are_chronological() {
        let points = vec![
            TrendPoint { timestamp: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(), total: 2 },
            TrendPoint { timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), total: 1 },
        ];
        let rows = trend_rows(&points);
        assert_eq!(rows[0].retrieved_at, "2024-01-01 00:00:00");
        assert_eq!(rows[1].total, "2");
    }

    #[test]
    fn csv_export_has_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("regions.csv");
        let rows = vec![RegionRow {
            region: "North".into(),
            total: "1,000".into(),
            same: "10".into(),
            different: "990".into(),
        }];
        write_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Region,Total,SameGenderPairing,DifferentGenderPairing"));
        assert!(text.contains("North,\"1,000\",10,990"));
    }

    #[test]
    fn export_failures_name_the_target_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let csv_path = blocker.join("regions.csv");
        let err = write_csv::<RegionRow>(&csv_path, &[]).unwrap_err();
        assert!(matches!(&err, IngestError::Write { path, .. } if path == &blocker));
        assert!(err.to_string().starts_with("failed to write"));

        let json_path = dir.path().join("summary.json");
        std::fs::create_dir(&json_path).unwrap();
        let err = write_json(&json_path, &serde_json::json!({"total": 1})).unwrap_err();
        assert!(matches!(&err, IngestError::Write { path, .. } if path == &json_path));
    }

    #[test]
    fn empty_tables_render_placeholder() {
        let rows: Vec<RegionRow> = Vec::new();
        assert_eq!(render_table(&rows, 3), "(no rows)");
    }
}
