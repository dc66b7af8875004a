use crate::models::{BatteryConfig, KpiOptions};
use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything one analysis run needs besides the two input series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Zone whose calendar defines days, months and hours of the run.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    #[serde(default)]
    pub kpi: KpiOptions,
    #[serde(default)]
    pub battery: Option<BatteryConfig>,
    #[serde(default = "default_select_weeks")]
    pub select_weeks: bool,
}

fn default_timezone() -> Tz {
    chrono_tz::Europe::Berlin
}

fn default_select_weeks() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            kpi: KpiOptions::default(),
            battery: None,
            select_weeks: default_select_weeks(),
        }
    }
}

impl AnalysisConfig {
    /// Load a JSON scenario file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if let Some(battery) = &config.battery {
            battery.validate()?;
        }
        Ok(config)
    }
}
