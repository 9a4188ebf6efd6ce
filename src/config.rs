use std::str::FromStr;

use crate::error::{AppError, Result};

pub const SOURCE_DB_URL: &str = "sqlite:orders.db";
pub const ANALYTICS_DB_URL: &str = "sqlite:analytics.db";

/// Order status counted by analytics. Every other status is in flight.
pub const SERVED_STATUS: &str = "SERVED";

/// Forecast type written for the daily revenue series.
pub const DAILY_REVENUE_FORECAST: &str = "daily_revenue";

/// Prefix shared by the 24 hourly forecast types (`hourly_00` .. `hourly_23`).
pub const HOURLY_FORECAST_PREFIX: &str = "hourly_";

/// Days ahead covered by progressive daily forecasting.
pub const DAILY_FORECAST_HORIZON_DAYS: u32 = 7;

/// Connections held by each store pool.
pub const POOL_MAX_CONNECTIONS: u32 = 10;

/// Static relative weights of the ensemble members.
pub mod ensemble_weights {
    pub const EXPONENTIAL: f64 = 0.30;
    pub const WEIGHTED_AVERAGE: f64 = 0.25;
    pub const LINEAR: f64 = 0.25;
    pub const POLYNOMIAL: f64 = 0.20;

    /// Linear regression joins the ensemble only with at least this many points.
    pub const LINEAR_MIN_POINTS: usize = 3;
    /// Polynomial regression joins the ensemble only with at least this many points.
    pub const POLYNOMIAL_MIN_POINTS: usize = 5;
}

#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub moving_average_window: usize,
    pub enable_ensemble: bool,
    pub enable_linear_regression: bool,
    pub enable_polynomial_regression: bool,
    /// Level smoothing factor for double exponential smoothing.
    pub alpha: f64,
    /// Trend smoothing factor for double exponential smoothing.
    pub beta: f64,
    /// Season length in days. No current estimator is seasonal; the value is
    /// validated so a seasonal member can be added without a config change.
    pub seasonal_periods: usize,
    pub polynomial_degree: usize,
    pub outlier_detection: bool,
    pub history_days_daily: i64,
    pub history_days_hourly: i64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            moving_average_window: 7,
            enable_ensemble: true,
            enable_linear_regression: true,
            enable_polynomial_regression: true,
            alpha: 0.3,
            beta: 0.1,
            seasonal_periods: 7,
            polynomial_degree: 2,
            outlier_detection: true,
            history_days_daily: 30,
            history_days_hourly: 7,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<()> {
        if self.moving_average_window == 0 {
            return Err(AppError::Config("FORECAST_MOVING_AVERAGE_WINDOW must be >= 1".into()));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(AppError::Config("FORECAST_ALPHA must be in (0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.beta) {
            return Err(AppError::Config("FORECAST_BETA must be in [0, 1]".into()));
        }
        if self.seasonal_periods == 0 {
            return Err(AppError::Config("FORECAST_SEASONAL_PERIODS must be >= 1".into()));
        }
        if self.polynomial_degree == 0 {
            return Err(AppError::Config("FORECAST_POLYNOMIAL_DEGREE must be >= 1".into()));
        }
        if self.history_days_daily < 1 || self.history_days_hourly < 1 {
            return Err(AppError::Config("FORECAST_HISTORY_DAYS_* must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Local time of day in `HH:MM`. Parsed when the scheduler starts.
    pub run_time: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            run_time: "00:00".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    /// Transactional order store (SOURCE_DB_URL). Always opened read-only.
    pub source_db_url: String,
    /// Analytics cache store (ANALYTICS_DB_URL). Created when missing.
    pub analytics_db_url: String,
    pub scheduler: SchedulerConfig,
    pub forecasting: ForecastConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = ForecastConfig::default();
        let forecasting = ForecastConfig {
            moving_average_window: env_parse(
                "FORECAST_MOVING_AVERAGE_WINDOW",
                defaults.moving_average_window,
            )?,
            enable_ensemble: env_parse("FORECAST_ENABLE_ENSEMBLE", defaults.enable_ensemble)?,
            enable_linear_regression: env_parse(
                "FORECAST_ENABLE_LINEAR_REGRESSION",
                defaults.enable_linear_regression,
            )?,
            enable_polynomial_regression: env_parse(
                "FORECAST_ENABLE_POLYNOMIAL_REGRESSION",
                defaults.enable_polynomial_regression,
            )?,
            alpha: env_parse("FORECAST_ALPHA", defaults.alpha)?,
            beta: env_parse("FORECAST_BETA", defaults.beta)?,
            seasonal_periods: env_parse("FORECAST_SEASONAL_PERIODS", defaults.seasonal_periods)?,
            polynomial_degree: env_parse("FORECAST_POLYNOMIAL_DEGREE", defaults.polynomial_degree)?,
            outlier_detection: env_parse("FORECAST_OUTLIER_DETECTION", defaults.outlier_detection)?,
            history_days_daily: env_parse("FORECAST_HISTORY_DAYS_DAILY", defaults.history_days_daily)?,
            history_days_hourly: env_parse(
                "FORECAST_HISTORY_DAYS_HOURLY",
                defaults.history_days_hourly,
            )?,
        };
        forecasting.validate()?;

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: env_parse("API_PORT", 8087u16)?,
            source_db_url: std::env::var("SOURCE_DB_URL")
                .unwrap_or_else(|_| SOURCE_DB_URL.to_string()),
            analytics_db_url: std::env::var("ANALYTICS_DB_URL")
                .unwrap_or_else(|_| ANALYTICS_DB_URL.to_string()),
            scheduler: SchedulerConfig {
                enabled: env_parse("SCHEDULER_ENABLED", true)?,
                run_time: std::env::var("SCHEDULER_RUN_TIME")
                    .unwrap_or_else(|_| "00:00".to_string()),
            },
            forecasting,
        })
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw:?}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ForecastConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_window() {
        let cfg = ForecastConfig {
            moving_average_window: 0,
            ..ForecastConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_alpha_out_of_range() {
        let cfg = ForecastConfig {
            alpha: 1.5,
            ..ForecastConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_parse_falls_back_to_default_when_unset() {
        let v: usize = env_parse("ORDER_ANALYTICS_TEST_UNSET_KEY", 42).unwrap();
        assert_eq!(v, 42);
    }
}
