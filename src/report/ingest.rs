//! CSV ingest for conversion reports
//!
//! Reads the tabular report into validated [`Record`]s. Column headers are
//! matched by pattern so both the raw pivot export (`求和项:Clicks`) and
//! plain headers (`clicks`) resolve. Recovery rules:
//! - missing/unparseable numeric cell → 0.0
//! - blank platform cell → row skipped
//! - unreadable file → error (the caller shows it and keeps an empty graph)

use crate::types::Record;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::path::Path;

static PLATFORM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(联盟营销平台类型|platform(\s*type)?)$").expect("valid regex"));
static COOP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(合作数量|coop(\s*count)?)$").expect("valid regex"));
static CLICKS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(求和项[:：]\s*)?clicks$").expect("valid regex"));
static ORDERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(求和项[:：]\s*)?orders$").expect("valid regex"));
static SALES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(求和项[:：]\s*)?sales$").expect("valid regex"));

/// Resolved column indices for one report file.
/// Any column may be absent; absent numeric columns yield 0.0 fields and an
/// absent platform column yields zero records (all rows skipped).
#[derive(Debug, Default, Clone, Copy)]
struct ColumnMap {
    platform: Option<usize>,
    coop: Option<usize>,
    clicks: Option<usize>,
    orders: Option<usize>,
    sales: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Self {
        let mut map = ColumnMap::default();
        for (idx, header) in headers.iter().enumerate() {
            let h = header.trim();
            if map.platform.is_none() && PLATFORM_RE.is_match(h) {
                map.platform = Some(idx);
            } else if map.coop.is_none() && COOP_RE.is_match(h) {
                map.coop = Some(idx);
            } else if map.clicks.is_none() && CLICKS_RE.is_match(h) {
                map.clicks = Some(idx);
            } else if map.orders.is_none() && ORDERS_RE.is_match(h) {
                map.orders = Some(idx);
            } else if map.sales.is_none() && SALES_RE.is_match(h) {
                map.sales = Some(idx);
            }
        }
        map
    }
}

/// Read records from a report file on disk.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open report {}", path.display()))?;
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    parse_reader(reader).with_context(|| format!("Failed to parse report {}", path.display()))
}

/// Read records from report text (pipe mode).
pub fn read_records_from_str(text: &str) -> Result<Vec<Record>> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    parse_reader(reader).context("Failed to parse piped report")
}

fn parse_reader<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<Record>> {
    let headers = reader.headers().context("Report has no header row")?;
    let columns = ColumnMap::resolve(headers);

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.context("Malformed report row")?;

        let platform = columns
            .platform
            .and_then(|i| row.get(i))
            .map(str::trim)
            .unwrap_or("");
        if platform.is_empty() {
            continue;
        }

        records.push(Record {
            platform: platform.to_string(),
            coop_count: numeric_field(&row, columns.coop),
            click_count: numeric_field(&row, columns.clicks),
            order_count: numeric_field(&row, columns.orders),
            sales: numeric_field(&row, columns.sales),
        });
    }
    Ok(records)
}

/// Parse a numeric cell, tolerating thousands separators.
/// Missing or unparseable cells count as 0.0 rather than failing the row.
fn numeric_field(row: &csv::StringRecord, idx: Option<usize>) -> f64 {
    idx.and_then(|i| row.get(i))
        .map(|cell| cell.trim().replace(',', ""))
        .and_then(|cell| cell.parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
联盟营销平台类型,合作数量,求和项:Clicks,求和项:Orders,求和项:Sales
联盟客,10,100,5,200.0
红人,3,50,2,80.5
";

    #[test]
    fn test_parses_pivot_export_headers() {
        let records = read_records_from_str(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].platform, "联盟客");
        assert_eq!(records[0].coop_count, 10.0);
        assert_eq!(records[0].click_count, 100.0);
        assert_eq!(records[0].order_count, 5.0);
        assert_eq!(records[0].sales, 200.0);
        assert_eq!(records[1].platform, "红人");
        assert_eq!(records[1].sales, 80.5);
    }

    #[test]
    fn test_plain_english_headers() {
        let csv = "platform,coop,clicks,orders,sales\nDeals网站,4,40,1,9.99\n";
        let records = read_records_from_str(csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].platform, "Deals网站");
        assert_eq!(records[0].sales, 9.99);
    }

    #[test]
    fn test_blank_platform_rows_skipped() {
        let csv = "联盟营销平台类型,合作数量\n,5\n   ,7\n联盟客,3\n";
        let records = read_records_from_str(csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].platform, "联盟客");
    }

    #[test]
    fn test_missing_numeric_cells_default_to_zero() {
        let csv = "联盟营销平台类型,合作数量,求和项:Clicks\n联盟客,abc,\n";
        let records = read_records_from_str(csv).unwrap();
        assert_eq!(records[0].coop_count, 0.0);
        assert_eq!(records[0].click_count, 0.0);
        assert_eq!(records[0].order_count, 0.0);
        assert_eq!(records[0].sales, 0.0);
    }

    #[test]
    fn test_thousands_separators() {
        let csv = "platform,clicks\n联盟客,\"12,340\"\n";
        let records = read_records_from_str(csv).unwrap();
        assert_eq!(records[0].click_count, 12340.0);
    }

    #[test]
    fn test_missing_platform_column_yields_no_records() {
        let csv = "合作数量,求和项:Clicks\n10,100\n";
        let records = read_records_from_str(csv).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let err = read_records(Path::new("/nonexistent/report.csv"));
        assert!(err.is_err());
    }
}
