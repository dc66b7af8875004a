use crate::error::{EngineError, Result};
use crate::models::{
    AlignedRecord, KpiOptions, KpiResult, MonthKey, MonthlySummary, NegativeHeatmap, PriceBin,
    RevenueRisk,
};
use crate::stats::{mean, percentile, ratio_or_zero, round_money, round_rate};
use log::{debug, warn};
use std::collections::BTreeMap;

const PRICE_BIN_WIDTH: f64 = 10.0;
/// Widest contiguous histogram, 20 000 EUR/MWh of span.
pub const MAX_PRICE_BINS: i64 = 2000;

pub struct KpiCalculator {
    options: KpiOptions,
}

/// Running sums for one calendar month.
#[derive(Default)]
struct MonthAccumulator {
    hours: usize,
    price_sum: f64,
    revenue: f64,
    production: f64,
}

impl KpiCalculator {
    pub fn new(options: KpiOptions) -> Self {
        Self { options }
    }

    /// Derive capture, exposure and risk metrics for an aligned series.
    pub fn calculate(&self, records: &[AlignedRecord]) -> Result<KpiResult> {
        if records.is_empty() {
            return Err(EngineError::InsufficientData("no aligned hours to evaluate"));
        }

        let baseload = mean(records.iter().map(|r| r.price));
        let total_production: f64 = records.iter().map(|r| r.output).sum();
        let spot_revenue: f64 = records.iter().map(AlignedRecord::revenue).sum();
        let capture_price = ratio_or_zero(spot_revenue, total_production);
        let capture_rate = ratio_or_zero(100.0 * capture_price, baseload);

        // Negative-price exposure
        let negative: Vec<&AlignedRecord> =
            records.iter().filter(|r| r.is_negative_exposure()).collect();
        let negative_mwh: f64 = negative.iter().map(|r| r.output).sum();
        let negative_percentage = ratio_or_zero(100.0 * negative_mwh, total_production);

        let merchant_revenue: f64 = match self.options.floor_price {
            Some(floor) => records.iter().map(|r| r.price.max(floor) * r.output).sum(),
            None => spot_revenue,
        };
        let ppa_revenue = self.options.ppa_price.map(|ppa| total_production * ppa);

        let monthly = self.monthly_summaries(records);
        let risk = self.revenue_risk(&monthly);

        debug!(
            "KPIs over {} hours: capture {:.2} vs baseload {:.2}, {} negative hours",
            records.len(),
            capture_price,
            baseload,
            negative.len()
        );

        Ok(KpiResult {
            hours: records.len(),
            capacity_mw: self.options.capacity_mw,
            baseload_price: round_money(baseload),
            capture_price: round_money(capture_price),
            capture_rate: round_rate(capture_rate),
            total_production_mwh: round_money(total_production),
            negative_hours: negative.len(),
            negative_mwh: round_money(negative_mwh),
            negative_percentage: round_rate(negative_percentage),
            spot_revenue: round_money(spot_revenue),
            merchant_revenue: round_money(merchant_revenue),
            floor_price: self.options.floor_price,
            ppa_price: self.options.ppa_price,
            ppa_revenue: ppa_revenue.map(round_money),
            risk: RevenueRisk {
                p5: round_money(risk.p5),
                p50: round_money(risk.p50),
                p95: round_money(risk.p95),
            },
            monthly: monthly.into_iter().map(round_monthly).collect(),
            price_distribution: price_distribution(records),
            negative_heatmap: negative_heatmap(records),
        })
    }

    /// Per-month revenue, production and capture trend in chronological order.
    fn monthly_summaries(&self, records: &[AlignedRecord]) -> Vec<MonthlySummary> {
        let mut months: BTreeMap<MonthKey, MonthAccumulator> = BTreeMap::new();
        for record in records {
            let acc = months.entry(record.month_key()).or_default();
            acc.hours += 1;
            acc.price_sum += record.price;
            acc.revenue += record.revenue();
            acc.production += record.output;
        }

        months
            .into_iter()
            .map(|(month, acc)| {
                let baseload = acc.price_sum / acc.hours as f64;
                let capture = ratio_or_zero(acc.revenue, acc.production);
                MonthlySummary {
                    month,
                    hours: acc.hours,
                    revenue: acc.revenue,
                    production_mwh: acc.production,
                    baseload_price: baseload,
                    capture_price: capture,
                    capture_rate: ratio_or_zero(100.0 * capture, baseload),
                }
            })
            .collect()
    }

    fn revenue_risk(&self, monthly: &[MonthlySummary]) -> RevenueRisk {
        let mut revenues: Vec<f64> = monthly.iter().map(|m| m.revenue).collect();
        revenues.sort_by(f64::total_cmp);
        RevenueRisk {
            p5: percentile(&revenues, 5.0),
            p50: percentile(&revenues, 50.0),
            p95: percentile(&revenues, 95.0),
        }
    }
}

fn round_monthly(month: MonthlySummary) -> MonthlySummary {
    MonthlySummary {
        revenue: round_money(month.revenue),
        production_mwh: round_money(month.production_mwh),
        baseload_price: round_money(month.baseload_price),
        capture_price: round_money(month.capture_price),
        capture_rate: round_rate(month.capture_rate),
        ..month
    }
}

/// Share of all hours and of producing hours per 10 EUR/MWh price band.
///
/// Spans wider than [`MAX_PRICE_BINS`] only report occupied bands.
fn price_distribution(records: &[AlignedRecord]) -> Vec<PriceBin> {
    let min = records.iter().map(|r| r.price).fold(f64::INFINITY, f64::min);
    let max = records.iter().map(|r| r.price).fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }

    // Float to int casts saturate, so extreme prices stay in range
    let first = (min / PRICE_BIN_WIDTH).floor() as i64;
    let last = (max / PRICE_BIN_WIDTH).ceil() as i64;
    // A flat price series still gets one band
    let bin_count = last.saturating_sub(first).max(1);
    let last_bin = first.saturating_add(bin_count - 1);

    let mut counts: BTreeMap<i64, (usize, usize)> = BTreeMap::new();
    let mut pv_total = 0usize;
    for record in records {
        let idx = ((record.price / PRICE_BIN_WIDTH).floor() as i64).min(last_bin);
        let entry = counts.entry(idx).or_default();
        entry.0 += 1;
        if record.is_producing() {
            entry.1 += 1;
            pv_total += 1;
        }
    }

    let indices: Vec<i64> = if bin_count <= MAX_PRICE_BINS {
        (first..=last_bin).collect()
    } else {
        warn!(
            "Price span {:.2}..{:.2} needs {} bins, reporting occupied bins only",
            min, max, bin_count
        );
        counts.keys().copied().collect()
    };

    indices
        .into_iter()
        .map(|idx| {
            let (all, pv) = counts.get(&idx).copied().unwrap_or_default();
            let bin_lower = idx as f64 * PRICE_BIN_WIDTH;
            PriceBin {
                lower: bin_lower,
                upper: bin_lower + PRICE_BIN_WIDTH,
                all_hours_pct: round_rate(ratio_or_zero(100.0 * all as f64, records.len() as f64)),
                pv_hours_pct: round_rate(ratio_or_zero(100.0 * pv as f64, pv_total as f64)),
            }
        })
        .collect()
}

fn negative_heatmap(records: &[AlignedRecord]) -> NegativeHeatmap {
    let mut heatmap = NegativeHeatmap::default();
    for record in records.iter().filter(|r| r.is_producing()) {
        let (month, hour) = (record.month_index(), record.hour as usize);
        heatmap.counts[month][hour] += 1;
        if record.price < 0.0 {
            heatmap.negative[month][hour] += 1;
            heatmap.max = heatmap.max.max(heatmap.negative[month][hour]);
        }
    }
    heatmap
}
