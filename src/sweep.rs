use crate::merge::progress_bar;
use anyhow::{anyhow, Result};
use capture_engine::stats::round_to;
use capture_engine::{AlignedRecord, Aligner, BatteryConfig, BatterySimulator, DataLoader};
use chrono_tz::Tz;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

const POWER_FRACTIONS: [f64; 4] = [0.25, 0.5, 0.75, 1.0];
const DURATIONS_HOURS: [f64; 4] = [1.0, 2.0, 4.0, 6.0];
const SWEEP_EFFICIENCY: f64 = 0.85;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub power_mw: f64,
    pub duration_hours: f64,
    pub energy_mwh: f64,
    pub efficiency: f64,
    pub total_uplift: f64,
    pub uplift_percentage: f64,
    pub effective_capture_price: f64,
    pub negative_reduction_pct: f64,
    pub equivalent_cycles: f64,
    pub uplift_per_mw: f64,
}

/// Simulate every power/duration combination over the same aligned records.
pub fn sweep(
    records: &[AlignedRecord],
    powers: &[f64],
    durations: &[f64],
    efficiency: f64,
) -> Result<Vec<SweepRow>> {
    let configs = powers
        .iter()
        .flat_map(|&power| {
            durations
                .iter()
                .map(move |&hours| BatteryConfig::new(power, power * hours, efficiency))
        })
        .map(|config| config.validate().map(|_| config))
        .collect::<capture_engine::Result<Vec<_>>>()?;

    let pb = progress_bar(configs.len());
    let rows = configs
        .par_iter()
        .map(|&config| {
            let result = BatterySimulator::new(config).simulate(records);
            pb.inc(1);
            SweepRow {
                power_mw: config.power_mw,
                duration_hours: config.energy_mwh / config.power_mw,
                energy_mwh: config.energy_mwh,
                efficiency: config.round_trip_efficiency,
                total_uplift: result.total_uplift,
                uplift_percentage: result.uplift_percentage,
                effective_capture_price: result.effective_capture_price,
                negative_reduction_pct: result.negative_reduction_pct,
                equivalent_cycles: result.equivalent_cycles,
                uplift_per_mw: round_to(result.total_uplift / config.power_mw, 2),
            }
        })
        .collect();
    pb.finish_with_message("Sweep complete");

    Ok(rows)
}

pub fn best_row(rows: &[SweepRow]) -> Option<&SweepRow> {
    rows.iter()
        .max_by(|a, b| a.total_uplift.total_cmp(&b.total_uplift))
}

pub fn run_sweep(prices: &Path, pv: &Path, timezone: Option<&str>) -> Result<()> {
    let tz = match timezone {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|e| anyhow!("Unknown timezone '{}': {}", name, e))?,
        None => chrono_tz::Europe::Berlin,
    };

    println!("🔋 Battery sizing sweep ({})", tz);
    println!("{}", "=".repeat(60));

    let loader = DataLoader::default();
    let (prices, outputs) = rayon::join(|| loader.load_prices(prices), || loader.load_outputs(pv));
    let records = Aligner::new(tz).align_checked(&prices?, &outputs?)?;

    let peak = records.iter().map(|r| r.output).fold(0.0, f64::max);
    if peak <= 0.0 {
        println!("⚠️  PV series never produces, nothing to shift");
        return Ok(());
    }
    println!("Aligned {} hours, peak output {:.2} MW", records.len(), peak);

    let powers: Vec<f64> = POWER_FRACTIONS
        .iter()
        .map(|fraction| round_to(peak * fraction, 2))
        .collect();
    let rows = sweep(&records, &powers, &DURATIONS_HOURS, SWEEP_EFFICIENCY)?;

    let output = Path::new("battery_sweep.csv");
    let mut writer = csv::Writer::from_path(output)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    println!("✅ Wrote {} configurations to {}", rows.len(), output.display());

    if let Some(best) = best_row(&rows) {
        println!(
            "🏆 Best: {} MW / {} MWh, uplift {:.2} EUR ({:.1} %), {:.1} cycles",
            best.power_mw,
            best.energy_mwh,
            best.total_uplift,
            best.uplift_percentage,
            best.equivalent_cycles
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> Vec<AlignedRecord> {
        (0..24)
            .map(|hour| {
                let price = match hour {
                    12 => -10.0,
                    19 => 150.0,
                    _ => 40.0,
                };
                let output = if (8..=16).contains(&hour) { 10.0 } else { 0.0 };
                AlignedRecord::new(hour * 3600, price, output, Tz::UTC).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_sweep_covers_every_combination() {
        let rows = sweep(&day(), &[2.0, 5.0], &[1.0, 2.0, 4.0], 0.9).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].power_mw, 2.0);
        assert_eq!(rows[0].energy_mwh, 2.0);
        assert_eq!(rows[5].power_mw, 5.0);
        assert_eq!(rows[5].energy_mwh, 20.0);
        assert!(rows.iter().all(|row| row.total_uplift > 0.0));

        let best = best_row(&rows).unwrap();
        assert!(rows.iter().all(|row| row.total_uplift <= best.total_uplift));
    }

    #[test]
    fn test_sweep_rejects_bad_efficiency() {
        assert!(sweep(&day(), &[1.0], &[2.0], 1.2).is_err());
    }
}
