use tracing::debug;

use crate::error::{Error, Result};

pub const ELAPSED_ALIASES: &[&str] = &["elapsed", "responsetime", "latency"];
pub const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "time_stamp", "time"];
pub const SUCCESS_ALIASES: &[&str] = &["success"];

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: Option<i64>,
    pub elapsed: f64,
    pub success: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub trait RecordReader: Send + Sync {
    fn read(&self, text: &str) -> Result<Table>;
}

/// Quoted-CSV reader backed by the `csv` crate.
#[cfg(feature = "fast-csv")]
pub struct CsvRecordReader;

#[cfg(feature = "fast-csv")]
impl RecordReader for CsvRecordReader {
    fn read(&self, text: &str) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let headers = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            // malformed records are row-level failures and get dropped
            let Ok(record) = record else { continue };
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }
        Ok(Table { headers, rows })
    }
}

/// Plain comma-splitting reader. No quoting support.
pub struct PlainRecordReader;

impl RecordReader for PlainRecordReader {
    fn read(&self, text: &str) -> Result<Table> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let headers = lines
            .next()
            .map(|line| line.split(',').map(|h| h.trim().to_string()).collect())
            .unwrap_or_default();
        let rows = lines
            .map(|line| line.split(',').map(|f| f.trim().to_string()).collect())
            .collect();
        Ok(Table { headers, rows })
    }
}

pub fn default_reader() -> Box<dyn RecordReader> {
    #[cfg(feature = "fast-csv")]
    {
        Box::new(CsvRecordReader)
    }
    #[cfg(not(feature = "fast-csv"))]
    {
        Box::new(PlainRecordReader)
    }
}

fn resolve_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    for alias in aliases {
        if let Some(idx) = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(alias))
        {
            return Some(idx);
        }
    }
    None
}

pub fn parse_samples(text: &str, reader: &dyn RecordReader) -> Result<Vec<Observation>> {
    let table = reader.read(text)?;
    let elapsed_col =
        resolve_column(&table.headers, ELAPSED_ALIASES).ok_or(Error::Schema("elapsed"))?;
    let ts_col = resolve_column(&table.headers, TIMESTAMP_ALIASES);
    let success_col = resolve_column(&table.headers, SUCCESS_ALIASES);

    let mut observations = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let Some(elapsed) = row.get(elapsed_col).and_then(|cell| parse_number(cell)) else {
            continue;
        };
        let timestamp = ts_col
            .and_then(|i| row.get(i))
            .and_then(|cell| parse_number(cell))
            .map(|v| v as i64);
        let success = success_col
            .and_then(|i| row.get(i))
            .map(|cell| parse_success(cell));
        observations.push(Observation {
            timestamp,
            elapsed,
            success,
        });
    }
    let skipped = table.rows.len() - observations.len();
    if skipped > 0 {
        debug!("Skipped {skipped} rows without a parseable elapsed value");
    }
    Ok(observations)
}

fn parse_number(cell: &str) -> Option<f64> {
    let v: f64 = cell.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

fn parse_success(cell: &str) -> bool {
    !matches!(
        cell.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "f"
    )
}
