use crate::models::{OutputPoint, PricePoint};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use log::{info, warn};
use polars::prelude::*;
use std::path::Path;

/// A timestamped scalar that can be read from and written to tabular files.
pub trait SeriesPoint: Copy + Send + Sync {
    /// Column holding the value next to `timestamp`.
    const VALUE_COLUMN: &'static str;

    fn from_parts(timestamp: i64, value: f64) -> Self;
    fn timestamp(&self) -> i64;
    fn value(&self) -> f64;
}

impl SeriesPoint for PricePoint {
    const VALUE_COLUMN: &'static str = "price";

    fn from_parts(timestamp: i64, price: f64) -> Self {
        Self { timestamp, price }
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn value(&self) -> f64 {
        self.price
    }
}

impl SeriesPoint for OutputPoint {
    const VALUE_COLUMN: &'static str = "output";

    fn from_parts(timestamp: i64, output: f64) -> Self {
        Self { timestamp, output }
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn value(&self) -> f64 {
        self.output
    }
}

/// Reads price and PV series from CSV or Parquet files.
pub struct DataLoader {
    strict: bool,
}

impl DataLoader {
    /// In strict mode a malformed row fails the load instead of being skipped.
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn load_prices(&self, path: impl AsRef<Path>) -> Result<Vec<PricePoint>> {
        self.load_points(path.as_ref())
    }

    pub fn load_outputs(&self, path: impl AsRef<Path>) -> Result<Vec<OutputPoint>> {
        self.load_points(path.as_ref())
    }

    /// Dispatch on the file extension.
    pub fn load_points<P: SeriesPoint>(&self, path: &Path) -> Result<Vec<P>> {
        let points = match path.extension().and_then(|e| e.to_str()) {
            Some("parquet") => self.load_parquet(path)?,
            Some("csv") | Some("txt") => self.load_csv(path)?,
            _ => bail!("Unsupported input format: {}", path.display()),
        };
        info!(
            "Loaded {} {} points from {}",
            points.len(),
            P::VALUE_COLUMN,
            path.display()
        );
        Ok(points)
    }

    fn load_csv<P: SeriesPoint>(&self, path: &Path) -> Result<Vec<P>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;

        let headers = reader.headers()?.clone();
        let ts_idx = column_index(&headers, "timestamp", path)?;
        let value_idx = column_index(&headers, P::VALUE_COLUMN, path)?;

        let mut points = Vec::new();
        let mut skipped = 0usize;

        for (line, row) in reader.records().enumerate() {
            let row = row?;
            let parsed = row
                .get(ts_idx)
                .and_then(parse_timestamp)
                .zip(row.get(value_idx).and_then(|v| v.parse::<f64>().ok()))
                .filter(|(_, value)| value.is_finite());

            match parsed {
                Some((timestamp, value)) => points.push(P::from_parts(timestamp, value)),
                None if self.strict => {
                    bail!("{}: malformed row {}: {:?}", path.display(), line + 2, row)
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Skipped {} malformed rows in {}", skipped, path.display());
        }
        Ok(points)
    }

    fn load_parquet<P: SeriesPoint>(&self, path: &Path) -> Result<Vec<P>> {
        let df = LazyFrame::scan_parquet(path, Default::default())?
            .select([
                col("timestamp").cast(DataType::Int64),
                col(P::VALUE_COLUMN).cast(DataType::Float64),
            ])
            .collect()?;

        let timestamps = df.column("timestamp")?.i64()?;
        let values = df.column(P::VALUE_COLUMN)?.f64()?;

        let mut points = Vec::with_capacity(df.height());
        let mut skipped = 0usize;

        for idx in 0..df.height() {
            match (timestamps.get(idx), values.get(idx)) {
                (Some(timestamp), Some(value)) if value.is_finite() => {
                    points.push(P::from_parts(timestamp, value))
                }
                _ if self.strict => bail!("{}: null or non-finite row {}", path.display(), idx),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Skipped {} null rows in {}", skipped, path.display());
        }
        Ok(points)
    }
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Write points as a `timestamp,<value>` CSV.
pub fn write_csv<P: SeriesPoint>(path: impl AsRef<Path>, points: &[P]) -> Result<()> {
    let path = path.as_ref();
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["timestamp", P::VALUE_COLUMN])?;
    for point in points {
        writer.write_record([point.timestamp().to_string(), point.value().to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .with_context(|| format!("{} has no '{}' column", path.display(), name))
}

/// Epoch seconds, RFC 3339, or a naive `YYYY-MM-DD HH:MM[:SS]` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    if let Ok(secs) = raw.parse::<i64>() {
        return Some(secs);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().timestamp())
}
