use crate::error::{EngineError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of the operable state-of-charge window, as a fraction of capacity.
pub const SOC_FLOOR_FRACTION: f64 = 0.05;
/// Upper bound of the operable state-of-charge window, as a fraction of capacity.
pub const SOC_CEILING_FRACTION: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: i64, // epoch seconds, hour-aligned UTC
    pub price: f64,     // EUR/MWh
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputPoint {
    pub timestamp: i64,
    pub output: f64, // MW held for the whole hour, so numerically MWh
}

/// One hour for which both a price and a PV output are known.
///
/// `date` and `hour` are expressed in the reference timezone of the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedRecord {
    pub timestamp: i64,
    pub price: f64,
    pub output: f64,
    pub date: NaiveDate,
    pub hour: u32,
}

impl AlignedRecord {
    pub fn new(timestamp: i64, price: f64, output: f64, tz: Tz) -> Result<Self> {
        let local = DateTime::<Utc>::from_timestamp(timestamp, 0)
            .ok_or(EngineError::InvalidTimestamp(timestamp))?
            .with_timezone(&tz);

        Ok(Self {
            timestamp,
            price,
            output,
            date: local.date_naive(),
            hour: local.hour(),
        })
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey::of(self.date)
    }

    /// Zero-based calendar month.
    pub fn month_index(&self) -> usize {
        self.date.month0() as usize
    }

    pub fn revenue(&self) -> f64 {
        self.price * self.output
    }

    pub fn is_producing(&self) -> bool {
        self.output > 0.0
    }

    /// Producing while the spot price is below zero.
    pub fn is_negative_exposure(&self) -> bool {
        self.price < 0.0 && self.output > 0.0
    }
}

/// Calendar month used as the ordered key for every monthly grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryConfig {
    pub power_mw: f64,
    pub energy_mwh: f64,
    pub round_trip_efficiency: f64, // (0, 1]
    #[serde(default = "default_one_cycle_per_day")]
    pub one_cycle_per_day: bool,
}

fn default_one_cycle_per_day() -> bool {
    true
}

impl BatteryConfig {
    pub fn new(power_mw: f64, energy_mwh: f64, round_trip_efficiency: f64) -> Self {
        Self {
            power_mw,
            energy_mwh,
            round_trip_efficiency,
            one_cycle_per_day: true,
        }
    }

    pub fn with_duration(power_mw: f64, duration_hours: f64) -> Self {
        Self::new(power_mw, power_mw * duration_hours, 0.85)
    }

    pub fn one_hour(power_mw: f64) -> Self {
        Self::with_duration(power_mw, 1.0)
    }

    pub fn two_hour(power_mw: f64) -> Self {
        Self::with_duration(power_mw, 2.0)
    }

    pub fn four_hour(power_mw: f64) -> Self {
        Self::with_duration(power_mw, 4.0)
    }

    /// Allow the dispatcher to use every hour of the day instead of one cycle.
    pub fn with_unlimited_cycles(mut self) -> Self {
        self.one_cycle_per_day = false;
        self
    }

    pub fn one_way_efficiency(&self) -> f64 {
        self.round_trip_efficiency.sqrt()
    }

    pub fn soc_floor_mwh(&self) -> f64 {
        self.energy_mwh * SOC_FLOOR_FRACTION
    }

    pub fn soc_ceiling_mwh(&self) -> f64 {
        self.energy_mwh * SOC_CEILING_FRACTION
    }

    pub fn usable_energy_mwh(&self) -> f64 {
        self.soc_ceiling_mwh() - self.soc_floor_mwh()
    }

    /// Number of charge (and discharge) candidate hours considered per day.
    pub fn hours_per_leg(&self) -> usize {
        if self.one_cycle_per_day {
            (self.energy_mwh / self.power_mw).ceil() as usize
        } else {
            24
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.power_mw.is_finite() && self.power_mw > 0.0) {
            return Err(EngineError::InvalidBattery(format!(
                "power must be positive, got {} MW",
                self.power_mw
            )));
        }
        if !(self.energy_mwh.is_finite() && self.energy_mwh > 0.0) {
            return Err(EngineError::InvalidBattery(format!(
                "energy must be positive, got {} MWh",
                self.energy_mwh
            )));
        }
        if !(self.round_trip_efficiency > 0.0 && self.round_trip_efficiency <= 1.0) {
            return Err(EngineError::InvalidBattery(format!(
                "round-trip efficiency must be in (0, 1], got {}",
                self.round_trip_efficiency
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiOptions {
    #[serde(default)]
    pub capacity_mw: f64, // informational only
    #[serde(default)]
    pub floor_price: Option<f64>,
    #[serde(default)]
    pub ppa_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueRisk {
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: MonthKey,
    pub hours: usize,
    pub revenue: f64,
    pub production_mwh: f64,
    pub baseload_price: f64,
    pub capture_price: f64,
    pub capture_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBin {
    pub lower: f64,
    pub upper: f64,
    pub all_hours_pct: f64,
    pub pv_hours_pct: f64,
}

/// Negative-price producing hours by `[month][hour of day]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NegativeHeatmap {
    pub negative: [[u32; 24]; 12],
    pub counts: [[u32; 24]; 12], // producing hours, denominator for rates
    pub max: u32,
}

impl NegativeHeatmap {
    /// Share of producing hours in the cell that saw a negative price, in percent.
    pub fn rate(&self, month: usize, hour: usize) -> f64 {
        let total = self.counts[month][hour];
        if total == 0 {
            0.0
        } else {
            100.0 * self.negative[month][hour] as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResult {
    pub hours: usize,
    pub capacity_mw: f64,

    // Prices
    pub baseload_price: f64,
    pub capture_price: f64,
    pub capture_rate: f64,

    // Volumes and exposure
    pub total_production_mwh: f64,
    pub negative_hours: usize,
    pub negative_mwh: f64,
    pub negative_percentage: f64,

    // Revenue
    pub spot_revenue: f64,
    pub merchant_revenue: f64,
    pub floor_price: Option<f64>,
    pub ppa_price: Option<f64>,
    pub ppa_revenue: Option<f64>,
    pub risk: RevenueRisk,

    pub monthly: Vec<MonthlySummary>,
    pub price_distribution: Vec<PriceBin>,
    pub negative_heatmap: NegativeHeatmap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDispatch {
    pub date: NaiveDate,
    pub uplift: f64,
    pub charged_mwh: f64,
    pub discharged_mwh: f64,
    pub negative_avoided_mwh: f64,
    pub negative_revenue: f64,
    pub soc_min_mwh: f64,
    pub soc_max_mwh: f64,
    pub charge_hours: Vec<u32>,
    pub discharge_hours: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryResult {
    pub config: BatteryConfig,
    pub total_uplift: f64,
    pub total_shifted_mwh: f64,
    pub original_revenue: f64,
    pub original_capture_price: f64,
    pub effective_capture_price: f64,
    pub negative_reduction_pct: f64,
    pub uplift_percentage: f64,
    pub equivalent_cycles: f64,
    pub days: Vec<DailyDispatch>,
}

impl BatteryResult {
    pub fn best_day(&self) -> Option<&DailyDispatch> {
        self.days
            .iter()
            .fold(None, |best: Option<&DailyDispatch>, day| match best {
                Some(b) if b.uplift >= day.uplift => Some(b),
                _ => Some(day),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekWindow {
    pub index: usize,
    pub start: i64,
    pub end: i64,
    pub hours: usize,
    pub volatility: f64,
    pub mean_price: f64,
    pub negative_hours: usize,
    pub capture_ratio: f64,
    pub records: Vec<AlignedRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentativeWeeks {
    pub typical: WeekWindow,
    pub volatile: WeekWindow,
    pub negative: WeekWindow,
    pub windows_considered: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_uses_reference_timezone() {
        // 2024-06-30T23:00:00Z is already July 1st in Berlin
        let record = AlignedRecord::new(1_719_788_400, 10.0, 1.0, chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert_eq!(record.hour, 1);
        assert_eq!(record.month_key().to_string(), "2024-07");
        assert_eq!(record.month_index(), 6);

        let utc = AlignedRecord::new(1_719_788_400, 10.0, 1.0, Tz::UTC).unwrap();
        assert_eq!(utc.date, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert_eq!(utc.hour, 23);
    }

    #[test]
    fn test_battery_presets() {
        let config = BatteryConfig::two_hour(10.0);
        assert_eq!(config.energy_mwh, 20.0);
        assert_eq!(config.hours_per_leg(), 2);
        assert!((config.soc_floor_mwh() - 1.0).abs() < 1e-12);
        assert!((config.soc_ceiling_mwh() - 19.0).abs() < 1e-12);
        assert_eq!(config.with_unlimited_cycles().hours_per_leg(), 24);

        // Fractional durations round up to a whole hour
        assert_eq!(BatteryConfig::new(10.0, 25.0, 0.9).hours_per_leg(), 3);
    }

    #[test]
    fn test_battery_validation() {
        assert!(BatteryConfig::one_hour(5.0).validate().is_ok());
        assert!(BatteryConfig::new(0.0, 10.0, 0.9).validate().is_err());
        assert!(BatteryConfig::new(5.0, -1.0, 0.9).validate().is_err());
        assert!(BatteryConfig::new(5.0, 10.0, 1.2).validate().is_err());
        assert!(BatteryConfig::new(5.0, 10.0, 0.0).validate().is_err());
    }

    #[test]
    fn test_heatmap_rate() {
        let mut heatmap = NegativeHeatmap::default();
        heatmap.negative[4][13] = 3;
        heatmap.counts[4][13] = 12;
        assert_eq!(heatmap.rate(4, 13), 25.0);
        assert_eq!(heatmap.rate(0, 0), 0.0);
    }
}
