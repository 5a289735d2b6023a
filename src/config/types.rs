use serde::{Deserialize, Serialize};

use crate::config::validation::{ValidationError, ValidationUtils, Validator};
use crate::domain_types::frequency::Frequency;
use crate::domain_types::series::{GapPolicy, DEFAULT_MAX_BACKFILL_BARS};

/// 參數允許的最大值（回補根數、指標窗口）
pub const MAX_WINDOW_SIZE: usize = 10_000;

/// 應用程序配置結構
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub log: LogConfig,
    pub series: SeriesConfig,
    pub stochastic: StochasticConfig,
}

impl Validator for ApplicationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        self.log.validate()?;
        self.series.validate()?;
        self.stochastic.validate()?;

        Ok(())
    }
}

/// 日誌配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: default_log_format(),
        }
    }
}

impl Validator for LogConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.level, "log.level")?;
        ValidationUtils::one_of(
            &self.level.to_lowercase().as_str(),
            &["trace", "debug", "info", "warn", "error"],
            "log.level",
        )?;
        ValidationUtils::one_of(
            &self.format.to_lowercase().as_str(),
            &["pretty", "compact"],
            "log.format",
        )?;

        Ok(())
    }
}

/// K 線序列配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub base_interval: Frequency,
    #[serde(default)]
    pub gap_policy: GapPolicy,
    #[serde(default = "default_max_backfill_bars")]
    pub max_backfill_bars: usize,
}

fn default_max_backfill_bars() -> usize {
    DEFAULT_MAX_BACKFILL_BARS
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            base_interval: Frequency::Minute1,
            gap_policy: GapPolicy::default(),
            max_backfill_bars: DEFAULT_MAX_BACKFILL_BARS,
        }
    }
}

impl Validator for SeriesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::in_range(
            self.max_backfill_bars,
            1,
            MAX_WINDOW_SIZE,
            "series.max_backfill_bars",
        )?;

        Ok(())
    }
}

/// 隨機指標配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StochasticConfig {
    pub bar_count: usize,
    pub smoothing_size: usize,
}

impl Default for StochasticConfig {
    fn default() -> Self {
        Self {
            bar_count: 14,
            smoothing_size: 3,
        }
    }
}

impl Validator for StochasticConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::in_range(self.bar_count, 1, MAX_WINDOW_SIZE, "stochastic.bar_count")?;
        ValidationUtils::in_range(
            self.smoothing_size,
            1,
            MAX_WINDOW_SIZE,
            "stochastic.smoothing_size",
        )?;

        Ok(())
    }
}
