use anyhow::{bail, Result};
use capture_engine::data_loader::{write_csv, SeriesPoint};
use capture_engine::DataLoader;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Which of the two engine inputs a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Price,
    Pv,
}

impl SeriesKind {
    pub fn parse(arg: Option<&str>) -> Result<Self> {
        match arg.unwrap_or("price") {
            "price" | "prices" => Ok(Self::Price),
            "pv" | "output" => Ok(Self::Pv),
            other => bail!("Unknown series kind '{}', expected price or pv", other),
        }
    }
}

pub fn find_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob(pattern)?.filter_map(|entry| entry.ok()).collect();
    files.sort();
    Ok(files)
}

pub fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style);
    }
    pb
}

/// Load every file in parallel and merge them into one ascending series.
///
/// Files are applied in path order, so a later file overrides an earlier
/// one on a shared timestamp. Unreadable files are reported and skipped.
pub fn merge_points<P: SeriesPoint>(files: &[PathBuf], loader: &DataLoader) -> Vec<P> {
    let pb = progress_bar(files.len());

    let loaded: Vec<Vec<P>> = files
        .par_iter()
        .filter_map(|file| {
            let points = loader.load_points::<P>(file);
            pb.inc(1);
            match points {
                Ok(points) => Some(points),
                Err(e) => {
                    log::warn!("Failed to load {}: {}", file.display(), e);
                    None
                }
            }
        })
        .collect();

    pb.finish_with_message("Files loaded");

    let mut by_timestamp: BTreeMap<i64, P> = BTreeMap::new();
    for point in loaded.into_iter().flatten() {
        by_timestamp.insert(point.timestamp(), point);
    }
    by_timestamp.into_values().collect()
}

pub fn run_merge(pattern: &str, output: &Path, kind: SeriesKind) -> Result<()> {
    println!("🔗 Merging {:?} files matching {}", kind, pattern);
    println!("{}", "=".repeat(60));

    let files = find_files(pattern)?;
    if files.is_empty() {
        bail!("No files match '{}'", pattern);
    }
    println!("Found {} files", files.len());

    let loader = DataLoader::default();
    let count = match kind {
        SeriesKind::Price => {
            let points = merge_points::<capture_engine::PricePoint>(&files, &loader);
            write_csv(output, &points)?;
            points.len()
        }
        SeriesKind::Pv => {
            let points = merge_points::<capture_engine::OutputPoint>(&files, &loader);
            write_csv(output, &points)?;
            points.len()
        }
    };

    println!("✅ Wrote {} hours to {}", count, output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_engine::PricePoint;

    #[test]
    fn test_later_files_override_earlier() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_2023.csv"), "timestamp,price\n7200,3\n0,1\n3600,2\n").unwrap();
        std::fs::write(dir.path().join("b_2024.csv"), "timestamp,price\n3600,20\n10800,4\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a series").unwrap();

        let pattern = dir.path().join("*.csv");
        let files = find_files(pattern.to_str().unwrap()).unwrap();
        assert_eq!(files.len(), 2);

        let merged: Vec<PricePoint> = merge_points(&files, &DataLoader::default());
        let pairs: Vec<(i64, f64)> = merged.iter().map(|p| (p.timestamp, p.price)).collect();
        assert_eq!(pairs, vec![(0, 1.0), (3600, 20.0), (7200, 3.0), (10800, 4.0)]);
    }

    #[test]
    fn test_series_kind_parse() {
        assert_eq!(SeriesKind::parse(None).unwrap(), SeriesKind::Price);
        assert_eq!(SeriesKind::parse(Some("pv")).unwrap(), SeriesKind::Pv);
        assert!(SeriesKind::parse(Some("wind")).is_err());
    }
}
