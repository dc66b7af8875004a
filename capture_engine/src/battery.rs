use crate::models::{AlignedRecord, BatteryConfig, BatteryResult, DailyDispatch};
use crate::stats::{ratio_or_zero, round_money, round_rate, round_to};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Greedy daily dispatch of a PV-coupled battery.
///
/// Every calendar day is planned on its own: the battery starts at the SOC
/// floor, charges from PV in the cheapest producing hours and sells in the
/// most expensive remaining hours. Nothing carries over to the next day.
pub struct BatterySimulator {
    config: BatteryConfig,
}

/// Unrounded outcome of one simulated day.
#[derive(Debug, Clone)]
struct DayOutcome {
    date: NaiveDate,
    uplift: f64,
    charged: f64,
    discharged: f64,
    negative_avoided: f64,
    negative_revenue: f64,
    soc_min: f64,
    soc_max: f64,
    charge_hours: Vec<u32>,
    discharge_hours: Vec<u32>,
}

impl BatterySimulator {
    pub fn new(config: BatteryConfig) -> Self {
        Self { config }
    }

    /// Simulate the whole series and aggregate the uplift over all days.
    pub fn simulate(&self, records: &[AlignedRecord]) -> BatteryResult {
        let days: Vec<DayOutcome> = self
            .group_by_day(records)
            .into_iter()
            .map(|(date, day)| self.simulate_day(date, &day))
            .collect();

        let original_revenue: f64 = records.iter().map(AlignedRecord::revenue).sum();
        let total_production: f64 = records.iter().map(|r| r.output).sum();
        let negative_production: f64 = records
            .iter()
            .filter(|r| r.is_negative_exposure())
            .map(|r| r.output)
            .sum();

        let total_uplift: f64 = days.iter().map(|d| d.uplift).sum();
        let total_shifted: f64 = days.iter().map(|d| d.discharged).sum();
        let negative_avoided: f64 = days.iter().map(|d| d.negative_avoided).sum();

        debug!(
            "Battery {} MW / {} MWh over {} days: uplift {:.2}, shifted {:.2} MWh",
            self.config.power_mw,
            self.config.energy_mwh,
            days.len(),
            total_uplift,
            total_shifted
        );

        BatteryResult {
            config: self.config,
            total_uplift: round_money(total_uplift),
            total_shifted_mwh: round_money(total_shifted),
            original_revenue: round_money(original_revenue),
            original_capture_price: round_money(ratio_or_zero(original_revenue, total_production)),
            effective_capture_price: round_money(ratio_or_zero(
                original_revenue + total_uplift,
                total_production,
            )),
            // Avoidance is summed per day but divided by whole-series exposure
            negative_reduction_pct: round_rate(ratio_or_zero(
                100.0 * negative_avoided,
                negative_production,
            )),
            uplift_percentage: round_rate(ratio_or_zero(100.0 * total_uplift, original_revenue)),
            equivalent_cycles: round_to(
                ratio_or_zero(total_shifted, self.config.usable_energy_mwh()),
                1,
            ),
            days: days.into_iter().map(DayOutcome::into_dispatch).collect(),
        }
    }

    fn simulate_day(&self, date: NaiveDate, day: &[AlignedRecord]) -> DayOutcome {
        let floor = self.config.soc_floor_mwh();
        let ceiling = self.config.soc_ceiling_mwh();
        let one_way = self.config.one_way_efficiency();
        let hours_per_leg = self.config.hours_per_leg();

        let mut sorted = day.to_vec();
        sorted.sort_by(|a, b| a.price.total_cmp(&b.price));

        // Charging only ever draws from on-site PV
        let charge_slots: Vec<AlignedRecord> = sorted
            .iter()
            .filter(|r| r.is_producing())
            .take(hours_per_leg)
            .copied()
            .collect();
        let discharge_slots: Vec<AlignedRecord> = sorted
            .iter()
            .rev()
            .filter(|r| !charge_slots.iter().any(|c| c.timestamp == r.timestamp))
            .take(hours_per_leg)
            .copied()
            .collect();

        let mut outcome = DayOutcome {
            date,
            uplift: 0.0,
            charged: 0.0,
            discharged: 0.0,
            negative_avoided: 0.0,
            negative_revenue: day
                .iter()
                .filter(|r| r.is_negative_exposure())
                .map(AlignedRecord::revenue)
                .sum(),
            soc_min: floor,
            soc_max: floor,
            charge_hours: Vec::new(),
            discharge_hours: Vec::new(),
        };
        let mut soc = floor;

        for slot in &charge_slots {
            let headroom = ceiling - soc;
            let stored = slot.output.min(self.config.power_mw).min(headroom) * one_way;
            if stored <= 0.0 {
                continue;
            }
            soc += stored;
            // PV withheld from the grid; selling it at a negative price would have cost money
            outcome.uplift -= stored / one_way * slot.price;
            outcome.charged += stored;
            if slot.price < 0.0 {
                outcome.negative_avoided += stored;
            }
            outcome.soc_max = outcome.soc_max.max(soc);
            outcome.charge_hours.push(slot.hour);
        }

        for slot in &discharge_slots {
            let drawn = self.config.power_mw.min(soc - floor);
            if drawn <= 0.0 {
                continue;
            }
            soc -= drawn;
            outcome.uplift += drawn * one_way * slot.price;
            outcome.discharged += drawn;
            outcome.soc_min = outcome.soc_min.min(soc);
            outcome.discharge_hours.push(slot.hour);
        }

        outcome
    }

    /// Group records by local calendar day, keeping days in order.
    fn group_by_day(&self, records: &[AlignedRecord]) -> BTreeMap<NaiveDate, Vec<AlignedRecord>> {
        let mut daily_groups: BTreeMap<NaiveDate, Vec<AlignedRecord>> = BTreeMap::new();
        for record in records {
            daily_groups.entry(record.date).or_default().push(*record);
        }
        daily_groups
    }
}

impl DayOutcome {
    fn into_dispatch(self) -> DailyDispatch {
        DailyDispatch {
            date: self.date,
            uplift: round_money(self.uplift),
            charged_mwh: round_money(self.charged),
            discharged_mwh: round_money(self.discharged),
            negative_avoided_mwh: round_money(self.negative_avoided),
            negative_revenue: round_money(self.negative_revenue),
            soc_min_mwh: round_money(self.soc_min),
            soc_max_mwh: round_money(self.soc_max),
            charge_hours: self.charge_hours,
            discharge_hours: self.discharge_hours,
        }
    }
}
