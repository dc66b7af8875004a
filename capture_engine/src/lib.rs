pub mod aligner;
pub mod analysis;
pub mod battery;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod kpi;
pub mod models;
pub mod stats;
pub mod weeks;

pub use aligner::Aligner;
pub use analysis::{run_analysis, AnalysisReport};
pub use battery::BatterySimulator;
pub use config::AnalysisConfig;
pub use data_loader::DataLoader;
pub use error::{EngineError, Result};
pub use kpi::KpiCalculator;
pub use models::{
    AlignedRecord, BatteryConfig, BatteryResult, KpiOptions, KpiResult, MonthKey, OutputPoint,
    PricePoint, RepresentativeWeeks,
};
pub use weeks::WeekSelector;
