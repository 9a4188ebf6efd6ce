use chrono::NaiveDate;

use crate::config::{DAILY_REVENUE_FORECAST, HOURLY_FORECAST_PREFIX};

// ---------------------------------------------------------------------------
// Forecast inputs
// ---------------------------------------------------------------------------

/// One day of cached history fed to the daily forecasters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl HistoricalPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Order count observed in one hour of one historical day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourlySample {
    /// Hour of day, 0..=23.
    pub hour: u32,
    pub count: i64,
}

// ---------------------------------------------------------------------------
// Forecast discriminator
// ---------------------------------------------------------------------------

/// Value of `forecast_history.forecast_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastType {
    DailyRevenue,
    /// Order count for one hour of the day, 0..=23.
    Hourly(u32),
}

impl std::fmt::Display for ForecastType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastType::DailyRevenue => write!(f, "{DAILY_REVENUE_FORECAST}"),
            ForecastType::Hourly(hour) => write!(f, "{HOURLY_FORECAST_PREFIX}{hour:02}"),
        }
    }
}
