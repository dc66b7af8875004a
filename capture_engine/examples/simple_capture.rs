use capture_engine::{run_analysis, AnalysisConfig, BatteryConfig, KpiOptions, OutputPoint, PricePoint};
use chrono::{DateTime, Duration, Utc};

fn main() {
    // One week in May with a midday price dip below zero
    let start = DateTime::parse_from_rfc3339("2024-05-06T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

    let mut prices = vec![];
    let mut outputs = vec![];

    for hour in 0..24 * 7 {
        let timestamp = (start + Duration::hours(hour)).timestamp();
        let price = match hour % 24 {
            0..=5 => 60.0,   // Night
            11..=14 => -5.0, // Solar noon surplus
            18..=21 => 130.0, // Evening peak
            _ => 75.0,
        };
        let output = match hour % 24 {
            6..=19 => 40.0 * (1.0 - ((hour % 24) as f64 - 13.0).abs() / 7.0),
            _ => 0.0,
        };

        prices.push(PricePoint { timestamp, price });
        outputs.push(OutputPoint { timestamp, output });
    }

    let config = AnalysisConfig {
        timezone: chrono_tz::UTC,
        kpi: KpiOptions {
            capacity_mw: 40.0,
            floor_price: Some(0.0),
            ppa_price: Some(55.0),
        },
        battery: Some(BatteryConfig::two_hour(10.0)),
        select_weeks: true,
    };

    let report = match run_analysis(&prices, &outputs, &config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            return;
        }
    };

    let kpi = &report.kpi;
    println!("Capture Analysis Example");
    println!("========================");
    println!("Hours analysed: {}", report.aligned_hours);
    println!("Baseload price: {:.2} EUR/MWh", kpi.baseload_price);
    println!("Capture price: {:.2} EUR/MWh ({:.1}%)", kpi.capture_price, kpi.capture_rate);
    println!(
        "Negative hours: {} ({:.1}% of production)",
        kpi.negative_hours, kpi.negative_percentage
    );
    println!("Spot revenue: {:.2} EUR", kpi.spot_revenue);
    println!("Floored revenue: {:.2} EUR", kpi.merchant_revenue);
    if let Some(ppa) = kpi.ppa_revenue {
        println!("PPA revenue: {:.2} EUR", ppa);
    }

    if let Some(battery) = &report.battery {
        println!();
        println!("Battery uplift: {:.2} EUR ({:.1}%)", battery.total_uplift, battery.uplift_percentage);
        println!(
            "Capture price with battery: {:.2} EUR/MWh",
            battery.effective_capture_price
        );
        for day in &battery.days {
            println!(
                "  {}: charge {:?} discharge {:?} -> {:.2} EUR",
                day.date, day.charge_hours, day.discharge_hours, day.uplift
            );
        }
    }
}
