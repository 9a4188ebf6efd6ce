//! Statistical forecasting over cached aggregates.
//!
//! [`Forecaster`] bundles the configured estimators: daily revenue goes
//! through the ensemble (or exponential smoothing alone), hourly order counts
//! through the per-hour recency-weighted mean with gap interpolation.

pub mod ensemble;
pub mod hourly;
pub mod methods;
pub mod outlier;
mod regression;

use thiserror::Error;
use tracing::error;

use crate::config::{ensemble_weights, ForecastConfig};
use crate::types::{HistoricalPoint, HourlySample};
use ensemble::{EnsembleBreakdown, Method};

/// Internal numeric failures. Never escapes the forecasting entry points.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("insufficient data: need {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("singular system: {0}")]
    Singular(&'static str),

    #[error("non-finite {0}")]
    NonFinite(&'static str),
}

/// Outcome of a single estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Estimate {
    /// Non-negative prediction rounded to cents.
    Value(f64),
    /// Not enough data, or the fit failed. Counts as 0.
    Unavailable,
}

impl Estimate {
    pub fn value(self) -> f64 {
        match self {
            Estimate::Value(v) => v,
            Estimate::Unavailable => 0.0,
        }
    }

    /// The estimate if it is a strictly positive number.
    pub fn positive(self) -> Option<f64> {
        match self {
            Estimate::Value(v) if v > 0.0 => Some(v),
            _ => None,
        }
    }
}

/// Round to two decimal places. The exact binary value decides, and only an
/// exact half rounds to even: `2.675` is stored below the half and gives
/// `2.67`, while `0.125` gives `0.12`.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scaled = value * 100.0;
    // Exact `value * 100 - scaled`.
    let err = value.mul_add(100.0, -scaled);
    let floor = scaled.floor();
    let frac = scaled - floor;
    let rounded = if frac > 0.5 || (frac == 0.5 && err > 0.0) {
        floor + 1.0
    } else if frac < 0.5 || err < 0.0 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    };
    rounded / 100.0
}

#[derive(Debug, Clone)]
pub struct Forecaster {
    cfg: ForecastConfig,
}

impl Forecaster {
    pub fn new(cfg: ForecastConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.cfg
    }

    pub fn exponential_smoothing(&self, points: &[HistoricalPoint]) -> Estimate {
        methods::exponential_smoothing(points, self.cfg.alpha, self.cfg.beta, self.cfg.outlier_detection)
    }

    pub fn weighted_moving_average(&self, points: &[HistoricalPoint]) -> Estimate {
        methods::weighted_moving_average(
            points,
            self.cfg.moving_average_window,
            self.cfg.outlier_detection,
        )
    }

    pub fn linear_regression(&self, points: &[HistoricalPoint], days_ahead: i64) -> Estimate {
        methods::linear_regression(points, days_ahead, self.cfg.outlier_detection)
    }

    pub fn polynomial_regression(&self, points: &[HistoricalPoint], days_ahead: i64) -> Estimate {
        methods::polynomial_regression(
            points,
            days_ahead,
            self.cfg.polynomial_degree,
            self.cfg.outlier_detection,
        )
    }

    /// Run every eligible estimator for the next day and combine them.
    ///
    /// Linear regression needs at least 3 points and polynomial regression at
    /// least 5; either can also be switched off in config. On a combination
    /// failure the exponential smoothing estimate is used alone.
    pub fn ensemble_breakdown(&self, points: &[HistoricalPoint]) -> EnsembleBreakdown {
        let exponential = self.exponential_smoothing(points);

        let mut candidates = vec![
            (Method::ExponentialSmoothing, exponential),
            (Method::WeightedMovingAverage, self.weighted_moving_average(points)),
        ];
        if self.cfg.enable_linear_regression && points.len() >= ensemble_weights::LINEAR_MIN_POINTS {
            candidates.push((Method::LinearRegression, self.linear_regression(points, 1)));
        }
        if self.cfg.enable_polynomial_regression
            && points.len() >= ensemble_weights::POLYNOMIAL_MIN_POINTS
        {
            candidates.push((Method::PolynomialRegression, self.polynomial_regression(points, 1)));
        }

        match ensemble::combine(&candidates) {
            Ok(breakdown) => breakdown,
            Err(e) => {
                error!("Ensemble forecast error: {e}, falling back to exponential smoothing");
                EnsembleBreakdown {
                    contributions: Vec::new(),
                    value: exponential.value(),
                }
            }
        }
    }

    pub fn ensemble(&self, points: &[HistoricalPoint]) -> f64 {
        if points.is_empty() {
            return 0.0;
        }
        self.ensemble_breakdown(points).value
    }

    /// Next-day revenue forecast. 0 for an empty history.
    pub fn daily_forecast(&self, points: &[HistoricalPoint]) -> f64 {
        if points.is_empty() {
            return 0.0;
        }
        if self.cfg.enable_ensemble {
            self.ensemble(points)
        } else {
            self.exponential_smoothing(points).value()
        }
    }

    /// Per-hour order count forecast for the next day, always 24 entries.
    pub fn hourly_forecast(&self, samples: &[HourlySample]) -> Vec<(u32, f64)> {
        hourly::forecast_hours(samples, self.cfg.outlier_detection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> Vec<HistoricalPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| HistoricalPoint::new(start + chrono::Duration::days(i as i64), v))
            .collect()
    }

    #[test]
    fn empty_history_forecasts_exactly_zero() {
        let f = Forecaster::new(ForecastConfig::default());
        assert_eq!(f.daily_forecast(&[]), 0.0);
        assert_eq!(f.ensemble(&[]), 0.0);
    }

    #[test]
    fn short_history_excludes_regressions() {
        let f = Forecaster::new(ForecastConfig::default());
        let b = f.ensemble_breakdown(&series(&[100.0, 110.0]));
        assert!(b
            .contributions
            .iter()
            .all(|c| matches!(c.method, Method::ExponentialSmoothing | Method::WeightedMovingAverage)));
    }

    #[test]
    fn long_history_uses_all_members() {
        let f = Forecaster::new(ForecastConfig::default());
        let b = f.ensemble_breakdown(&series(&[100.0, 104.0, 103.0, 108.0, 110.0, 112.0, 111.0]));
        assert_eq!(b.contributions.len(), 4);
        let sum: f64 = b.contributions.iter().map(|c| c.weight).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(b.value > 0.0);
    }

    #[test]
    fn disabled_regressions_are_skipped() {
        let f = Forecaster::new(ForecastConfig {
            enable_linear_regression: false,
            enable_polynomial_regression: false,
            ..ForecastConfig::default()
        });
        let b = f.ensemble_breakdown(&series(&[100.0, 104.0, 103.0, 108.0, 110.0, 112.0]));
        assert_eq!(b.contributions.len(), 2);
    }

    #[test]
    fn ensemble_disabled_uses_exponential_smoothing() {
        let f = Forecaster::new(ForecastConfig {
            enable_ensemble: false,
            ..ForecastConfig::default()
        });
        assert_eq!(f.daily_forecast(&series(&[100.0, 110.0, 105.0])), 125.05);
    }

    #[test]
    fn all_zero_history_forecasts_zero() {
        let f = Forecaster::new(ForecastConfig::default());
        assert_eq!(f.daily_forecast(&series(&[0.0; 8])), 0.0);
    }

    #[test]
    fn round2_rounds_to_cents() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_000_1), 1.24);
        assert_eq!(round2(-0.0), 0.0);
    }

    #[test]
    fn round2_uses_the_exact_binary_value() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-0.125), -0.12);
        assert_eq!(round2(2.675), 2.67);
        assert_eq!(round2(1.005), 1.0);
        assert_eq!(round2(125.05), 125.05);
    }
}
