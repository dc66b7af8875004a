use capture_engine::models::AlignedRecord;
use capture_engine::{Aligner, BatteryConfig, BatterySimulator, KpiCalculator, KpiOptions, WeekSelector};
use capture_engine::{OutputPoint, PricePoint};
use chrono_tz::Tz;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

// 2024-01-01T00:00:00Z
const START: i64 = 1_704_067_200;
const HOURS: usize = 8784;

fn synthetic_year() -> (Vec<PricePoint>, Vec<OutputPoint>) {
    let prices = (0..HOURS)
        .map(|i| {
            let hour = (i % 24) as f64;
            let day = (i / 24) as f64;
            // Evening peak, midday dip deepening in summer
            let summer = (std::f64::consts::PI * day / 366.0).sin();
            let price = 70.0 + 40.0 * ((hour - 19.0) / 3.0).cos().max(0.0)
                - 90.0 * summer * (-((hour - 13.0) / 2.5).powi(2)).exp();
            PricePoint {
                timestamp: START + i as i64 * 3600,
                price,
            }
        })
        .collect();

    let outputs = (0..HOURS)
        .map(|i| {
            let hour = (i % 24) as f64;
            let day = (i / 24) as f64;
            let daylight = 4.0 + 4.0 * (std::f64::consts::PI * day / 366.0).sin();
            let output = (50.0 * (1.0 - ((hour - 13.0) / daylight).powi(2))).max(0.0);
            OutputPoint {
                timestamp: START + i as i64 * 3600,
                output,
            }
        })
        .collect();

    (prices, outputs)
}

fn aligned_year() -> Vec<AlignedRecord> {
    let (prices, outputs) = synthetic_year();
    Aligner::new(Tz::Europe__Berlin).align(&prices, &outputs)
}

fn benchmark_alignment(c: &mut Criterion) {
    let (prices, outputs) = synthetic_year();
    let aligner = Aligner::new(Tz::Europe__Berlin);

    c.bench_function("align_year", |b| {
        b.iter(|| black_box(aligner.align(&prices, &outputs)));
    });
}

fn benchmark_kpis(c: &mut Criterion) {
    let records = aligned_year();
    let calculator = KpiCalculator::new(KpiOptions {
        capacity_mw: 50.0,
        floor_price: Some(0.0),
        ppa_price: Some(55.0),
    });

    c.bench_function("kpi_year", |b| {
        b.iter(|| black_box(calculator.calculate(&records)));
    });
}

fn benchmark_battery(c: &mut Criterion) {
    let records = aligned_year();

    c.bench_function("battery_2h_year", |b| {
        let simulator = BatterySimulator::new(BatteryConfig::two_hour(20.0));
        b.iter(|| black_box(simulator.simulate(&records)));
    });

    c.bench_function("battery_unlimited_year", |b| {
        let simulator = BatterySimulator::new(BatteryConfig::four_hour(20.0).with_unlimited_cycles());
        b.iter(|| black_box(simulator.simulate(&records)));
    });
}

fn benchmark_weeks(c: &mut Criterion) {
    let records = aligned_year();
    let selector = WeekSelector::new();

    c.bench_function("weeks_year", |b| {
        b.iter(|| black_box(selector.select(&records)));
    });
}

criterion_group!(
    benches,
    benchmark_alignment,
    benchmark_kpis,
    benchmark_battery,
    benchmark_weeks
);
criterion_main!(benches);
