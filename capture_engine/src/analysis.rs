use crate::aligner::Aligner;
use crate::battery::BatterySimulator;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::kpi::KpiCalculator;
use crate::models::{BatteryResult, KpiResult, OutputPoint, PricePoint, RepresentativeWeeks};
use crate::weeks::WeekSelector;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub price_points: usize,
    pub output_points: usize,
    pub aligned_hours: usize,
    pub first_timestamp: i64,
    pub last_timestamp: i64,
    pub kpi: KpiResult,
    pub battery: Option<BatteryResult>,
    pub weeks: Option<RepresentativeWeeks>,
}

/// Align both series, then run the KPI, battery and week stages side by side.
pub fn run_analysis(
    prices: &[PricePoint],
    outputs: &[OutputPoint],
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    let records = Aligner::new(config.timezone).align_checked(prices, outputs)?;
    info!(
        "Analysing {} aligned hours ({} prices, {} PV points)",
        records.len(),
        prices.len(),
        outputs.len()
    );

    let (kpi, (battery, weeks)) = rayon::join(
        || KpiCalculator::new(config.kpi.clone()).calculate(&records),
        || {
            rayon::join(
                || {
                    config
                        .battery
                        .map(|battery| BatterySimulator::new(battery).simulate(&records))
                },
                || {
                    config
                        .select_weeks
                        .then(|| WeekSelector::new().select(&records))
                        .flatten()
                },
            )
        },
    );

    Ok(AnalysisReport {
        price_points: prices.len(),
        output_points: outputs.len(),
        aligned_hours: records.len(),
        first_timestamp: records[0].timestamp,
        last_timestamp: records[records.len() - 1].timestamp,
        kpi: kpi?,
        battery,
        weeks,
    })
}
