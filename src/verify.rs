use crate::merge::{find_files, SeriesKind};
use anyhow::{bail, Result};
use capture_engine::data_loader::SeriesPoint;
use capture_engine::{DataLoader, OutputPoint, PricePoint};
use std::collections::BTreeSet;
use std::path::Path;

const HOUR: i64 = 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuality {
    pub records: usize,
    pub duplicates: usize,
    pub gaps: usize,
    pub missing_hours: i64,
    pub misaligned: usize,
    pub sorted: bool,
    pub min_value: f64,
    pub max_value: f64,
}

impl SeriesQuality {
    pub fn issues(&self) -> usize {
        self.duplicates + self.gaps + self.misaligned + usize::from(!self.sorted)
    }
}

/// Duplicate, gap, alignment and ordering checks on one hourly series.
pub fn assess<P: SeriesPoint>(points: &[P]) -> SeriesQuality {
    let unique: BTreeSet<i64> = points.iter().map(|p| p.timestamp()).collect();

    let mut gaps = 0;
    let mut missing_hours = 0;
    for (prev, curr) in unique.iter().zip(unique.iter().skip(1)) {
        let step = curr - prev;
        if step > HOUR {
            gaps += 1;
            missing_hours += step / HOUR - 1;
        }
    }

    SeriesQuality {
        records: points.len(),
        duplicates: points.len() - unique.len(),
        gaps,
        missing_hours,
        misaligned: unique.iter().filter(|ts| ts.rem_euclid(HOUR) != 0).count(),
        sorted: points.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()),
        min_value: points.iter().map(|p| p.value()).fold(f64::INFINITY, f64::min),
        max_value: points.iter().map(|p| p.value()).fold(f64::NEG_INFINITY, f64::max),
    }
}

fn report(quality: &SeriesQuality) {
    if quality.duplicates > 0 {
        println!("    ❌ Found {} duplicate timestamps", quality.duplicates);
    } else {
        println!("    ✅ No duplicates found");
    }

    if quality.gaps > 0 {
        println!(
            "    ⚠️  Found {} gaps ({} missing hours)",
            quality.gaps, quality.missing_hours
        );
    } else {
        println!("    ✅ No gaps in time series");
    }

    if quality.misaligned > 0 {
        println!("    ⚠️  {} timestamps are not on the hour", quality.misaligned);
    }

    if quality.sorted {
        println!("    ✅ Data is properly sorted");
    } else {
        println!("    ⚠️  Data is not sorted by timestamp");
    }

    println!("    📊 Total records: {}", quality.records);
    if quality.records > 0 {
        println!(
            "    📊 Value range: {:.2} .. {:.2}",
            quality.min_value, quality.max_value
        );
    }
}

fn assess_file(loader: &DataLoader, file: &Path, kind: SeriesKind) -> Result<SeriesQuality> {
    Ok(match kind {
        SeriesKind::Price => assess(&loader.load_points::<PricePoint>(file)?),
        SeriesKind::Pv => {
            let points = loader.load_points::<OutputPoint>(file)?;
            let negative = points.iter().filter(|p| p.output < 0.0).count();
            if negative > 0 {
                println!("    ⚠️  {} negative PV output values", negative);
            }
            assess(&points)
        }
    })
}

pub fn run_verify(pattern: &str, kind: SeriesKind) -> Result<()> {
    println!("\n🔍 Input Quality Verification");
    println!("{}", "=".repeat(60));

    let files = find_files(pattern)?;
    if files.is_empty() {
        bail!("No files match '{}'", pattern);
    }

    let loader = DataLoader::default();
    let mut total_issues = 0;

    for file in &files {
        println!("\n  Verifying: {}", file.display());
        match assess_file(&loader, file, kind) {
            Ok(quality) => {
                report(&quality);
                total_issues += quality.issues();
            }
            Err(e) => {
                println!("    ❌ Could not read file: {}", e);
                total_issues += 1;
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    if total_issues == 0 {
        println!("✅ Input verification passed! No issues found.");
    } else {
        println!("⚠️  Input verification found {} issues", total_issues);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(timestamps: &[i64]) -> Vec<PricePoint> {
        timestamps
            .iter()
            .enumerate()
            .map(|(i, &timestamp)| PricePoint {
                timestamp,
                price: i as f64 - 1.0,
            })
            .collect()
    }

    #[test]
    fn test_clean_series() {
        let quality = assess(&prices(&[0, 3600, 7200, 10800]));
        assert_eq!(quality.issues(), 0);
        assert_eq!(quality.min_value, -1.0);
        assert_eq!(quality.max_value, 2.0);
    }

    #[test]
    fn test_detects_problems() {
        // Duplicate 3600, unsorted tail, a 3-hour hole and a half-hour stamp
        let quality = assess(&prices(&[0, 3600, 3600, 18000, 14400, 19800]));
        assert_eq!(quality.duplicates, 1);
        assert!(!quality.sorted);
        assert_eq!(quality.gaps, 1);
        assert_eq!(quality.missing_hours, 2);
        assert_eq!(quality.misaligned, 1);
        assert_eq!(quality.issues(), 4);
    }
}
