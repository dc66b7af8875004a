use anyhow::{anyhow, Result};
use capture_engine::{run_analysis, AnalysisConfig, AnalysisReport, BatteryConfig, DataLoader};
use chrono::DateTime;
use chrono_tz::Tz;
use clap::{Parser, ValueEnum};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "capture_engine")]
#[command(about = "Capture price, negative-price exposure and co-located battery uplift for a PV asset")]
struct Args {
    /// Hourly price series (CSV or Parquet with timestamp,price)
    #[arg(long)]
    prices: PathBuf,

    /// Hourly PV output series (CSV or Parquet with timestamp,output)
    #[arg(long)]
    pv: PathBuf,

    /// JSON scenario file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reference timezone for days, months and hours (IANA name)
    #[arg(long)]
    timezone: Option<String>,

    /// Installed PV capacity in MW
    #[arg(long)]
    capacity_mw: Option<f64>,

    /// Merchant revenue floor in EUR/MWh
    #[arg(long, allow_hyphen_values = true)]
    floor_price: Option<f64>,

    /// Flat PPA price in EUR/MWh
    #[arg(long)]
    ppa_price: Option<f64>,

    /// Battery power in MW (enables the battery simulation)
    #[arg(long)]
    battery_power_mw: Option<f64>,

    /// Battery duration preset
    #[arg(long, value_enum)]
    battery_duration: Option<Duration>,

    /// Battery energy in MWh (overrides the duration preset)
    #[arg(long)]
    battery_energy_mwh: Option<f64>,

    /// Round-trip efficiency (0-1)
    #[arg(short, long)]
    efficiency: Option<f64>,

    /// Let the battery use every hour of the day instead of one cycle
    #[arg(long)]
    unlimited_cycles: bool,

    /// Skip representative-week selection
    #[arg(long)]
    no_weeks: bool,

    /// Fail on malformed input rows instead of skipping them
    #[arg(long)]
    strict: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    output: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum Duration {
    #[value(name = "1h")]
    OneHour,
    #[value(name = "2h")]
    TwoHour,
    #[value(name = "4h")]
    FourHour,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Summary,
}

fn build_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };

    if let Some(name) = &args.timezone {
        config.timezone = name
            .parse::<Tz>()
            .map_err(|e| anyhow!("Unknown timezone '{}': {}", name, e))?;
    }
    if let Some(capacity) = args.capacity_mw {
        config.kpi.capacity_mw = capacity;
    }
    if args.floor_price.is_some() {
        config.kpi.floor_price = args.floor_price;
    }
    if args.ppa_price.is_some() {
        config.kpi.ppa_price = args.ppa_price;
    }
    if args.no_weeks {
        config.select_weeks = false;
    }

    if let Some(power) = args.battery_power_mw {
        let mut battery = match args.battery_duration.unwrap_or(Duration::TwoHour) {
            Duration::OneHour => BatteryConfig::one_hour(power),
            Duration::TwoHour => BatteryConfig::two_hour(power),
            Duration::FourHour => BatteryConfig::four_hour(power),
        };
        if let Some(energy) = args.battery_energy_mwh {
            battery.energy_mwh = energy;
        }
        config.battery = Some(battery);
    }

    if let Some(battery) = config.battery.as_mut() {
        if let Some(efficiency) = args.efficiency {
            battery.round_trip_efficiency = efficiency;
        }
        if args.unlimited_cycles {
            battery.one_cycle_per_day = false;
        }
        battery.validate()?;
    }

    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = build_config(&args)?;

    info!("Starting capture analysis in {}", config.timezone);

    let loader = DataLoader::new(args.strict);
    let prices = loader.load_prices(&args.prices)?;
    let outputs = loader.load_outputs(&args.pv)?;

    let report = run_analysis(&prices, &outputs, &config)?;

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{}", json);
        }
        OutputFormat::Csv => {
            println!("Month,Hours,ProductionMWh,Revenue,Baseload,Capture,CaptureRate");
            for month in &report.kpi.monthly {
                println!(
                    "{},{},{:.2},{:.2},{:.2},{:.2},{:.1}",
                    month.month,
                    month.hours,
                    month.production_mwh,
                    month.revenue,
                    month.baseload_price,
                    month.capture_price,
                    month.capture_rate
                );
            }
        }
        OutputFormat::Summary => print_summary(&report, &config),
    }

    Ok(())
}

fn format_ts(timestamp: i64, tz: Tz) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn print_summary(report: &AnalysisReport, config: &AnalysisConfig) {
    let kpi = &report.kpi;
    let tz = config.timezone;

    println!("Capture Analysis Summary");
    println!("========================");
    println!(
        "Period: {} to {} ({})",
        format_ts(report.first_timestamp, tz),
        format_ts(report.last_timestamp, tz),
        tz
    );
    println!(
        "Hours: {} aligned of {} price / {} PV points",
        report.aligned_hours, report.price_points, report.output_points
    );
    if kpi.capacity_mw > 0.0 {
        println!("Capacity: {} MW", kpi.capacity_mw);
    }
    println!();
    println!("Baseload price:     {:>10.2} EUR/MWh", kpi.baseload_price);
    println!("Capture price:      {:>10.2} EUR/MWh", kpi.capture_price);
    println!("Capture rate:       {:>10.1} %", kpi.capture_rate);
    println!("Production:         {:>10.2} MWh", kpi.total_production_mwh);
    println!(
        "Negative hours:     {:>10} ({:.2} MWh, {:.1} % of production)",
        kpi.negative_hours, kpi.negative_mwh, kpi.negative_percentage
    );
    println!("Spot revenue:       {:>10.2} EUR", kpi.spot_revenue);
    if let Some(floor) = kpi.floor_price {
        println!(
            "Merchant revenue:   {:>10.2} EUR (floor {:.2})",
            kpi.merchant_revenue, floor
        );
    }
    if let (Some(ppa), Some(revenue)) = (kpi.ppa_price, kpi.ppa_revenue) {
        println!("PPA revenue:        {:>10.2} EUR (at {:.2})", revenue, ppa);
    }
    println!(
        "Monthly revenue:    P5 {:.2} / P50 {:.2} / P95 {:.2}",
        kpi.risk.p5, kpi.risk.p50, kpi.risk.p95
    );

    if let Some(battery) = &report.battery {
        println!();
        println!(
            "Battery: {} MW / {} MWh, {:.1}% round trip{}",
            battery.config.power_mw,
            battery.config.energy_mwh,
            battery.config.round_trip_efficiency * 100.0,
            if battery.config.one_cycle_per_day { ", one cycle per day" } else { "" }
        );
        println!("  Uplift:            {:>10.2} EUR ({:.1} %)", battery.total_uplift, battery.uplift_percentage);
        println!("  Shifted energy:    {:>10.2} MWh", battery.total_shifted_mwh);
        println!("  Equivalent cycles: {:>10.1}", battery.equivalent_cycles);
        println!(
            "  Capture price:     {:>10.2} -> {:.2} EUR/MWh",
            battery.original_capture_price, battery.effective_capture_price
        );
        println!("  Negative exposure: {:>10.1} % avoided", battery.negative_reduction_pct);
        if let Some(day) = battery.best_day() {
            println!("  Best day:          {} ({:.2} EUR)", day.date, day.uplift);
        }
    }

    if let Some(weeks) = &report.weeks {
        println!();
        println!("Representative weeks ({} considered):", weeks.windows_considered);
        for (label, week) in [
            ("Typical", &weeks.typical),
            ("Volatile", &weeks.volatile),
            ("Negative", &weeks.negative),
        ] {
            println!(
                "  {:<9} from {}: sigma {:.2}, mean {:.2}, {} negative hours, capture ratio {:.3}",
                label,
                format_ts(week.start, tz),
                week.volatility,
                week.mean_price,
                week.negative_hours,
                week.capture_ratio
            );
        }
    }
}
