//! The four single-series estimators behind the daily forecast.
//!
//! Every estimator sorts its own input by date, runs the outlier filter over
//! the values, and reports an [`Estimate`]. Failures never escape: they are
//! logged here and surface as [`Estimate::Unavailable`].

use tracing::{debug, error};

use super::outlier::replace_outliers;
use super::regression::{fit_line, fit_polynomial};
use super::{round2, Estimate, ForecastError};
use crate::types::HistoricalPoint;

/// Double exponential smoothing (Holt) with a one-step-ahead forecast.
pub fn exponential_smoothing(
    points: &[HistoricalPoint],
    alpha: f64,
    beta: f64,
    outlier_detection: bool,
) -> Estimate {
    absorb(
        "Exponential smoothing",
        try_exponential_smoothing(points, alpha, beta, outlier_detection),
    )
}

fn try_exponential_smoothing(
    points: &[HistoricalPoint],
    alpha: f64,
    beta: f64,
    outlier_detection: bool,
) -> Result<f64, ForecastError> {
    let values = replace_outliers(&sorted_values(points), outlier_detection);

    let (first, rest) = match values.split_first() {
        Some(split) => split,
        None => return Err(ForecastError::InsufficientData { required: 1, actual: 0 }),
    };
    if rest.is_empty() {
        return finite(first.max(0.0), "exponential smoothing level");
    }

    let mut level = *first;
    let mut trend = rest[0] - first;
    for &value in rest {
        let last_level = level;
        level = alpha * value + (1.0 - alpha) * (level + trend);
        trend = beta * (level - last_level) + (1.0 - beta) * trend;
    }

    finite((level + trend).max(0.0), "exponential smoothing level")
}

/// Recency-weighted mean of the last `window` observations.
pub fn weighted_moving_average(
    points: &[HistoricalPoint],
    window: usize,
    outlier_detection: bool,
) -> Estimate {
    absorb(
        "Weighted moving average",
        try_weighted_moving_average(points, window, outlier_detection),
    )
}

fn try_weighted_moving_average(
    points: &[HistoricalPoint],
    window: usize,
    outlier_detection: bool,
) -> Result<f64, ForecastError> {
    let values = sorted_values(points);
    let start = values.len().saturating_sub(window);
    let recent = replace_outliers(&values[start..], outlier_detection);

    match recency_weighted_mean(&recent) {
        Some(avg) => finite(avg.max(0.0), "weighted moving average"),
        None => Err(ForecastError::InsufficientData { required: 1, actual: 0 }),
    }
}

/// Ordinary least squares on (days since first observation, value).
pub fn linear_regression(
    points: &[HistoricalPoint],
    days_ahead: i64,
    outlier_detection: bool,
) -> Estimate {
    absorb(
        "Linear regression",
        try_linear_regression(points, days_ahead, outlier_detection),
    )
}

fn try_linear_regression(
    points: &[HistoricalPoint],
    days_ahead: i64,
    outlier_detection: bool,
) -> Result<f64, ForecastError> {
    if points.len() < 2 {
        return Err(ForecastError::InsufficientData { required: 2, actual: points.len() });
    }

    let (xs, ys, target) = regression_inputs(points, days_ahead, outlier_detection);
    let (intercept, slope) = fit_line(&xs, &ys)?;
    finite((intercept + slope * target).max(0.0), "linear regression prediction")
}

/// Least-squares polynomial of the given degree over day offsets.
pub fn polynomial_regression(
    points: &[HistoricalPoint],
    days_ahead: i64,
    degree: usize,
    outlier_detection: bool,
) -> Estimate {
    absorb(
        "Polynomial regression",
        try_polynomial_regression(points, days_ahead, degree, outlier_detection),
    )
}

fn try_polynomial_regression(
    points: &[HistoricalPoint],
    days_ahead: i64,
    degree: usize,
    outlier_detection: bool,
) -> Result<f64, ForecastError> {
    if points.len() < degree + 1 {
        return Err(ForecastError::InsufficientData {
            required: degree + 1,
            actual: points.len(),
        });
    }

    let (xs, ys, target) = regression_inputs(points, days_ahead, outlier_detection);
    let poly = fit_polynomial(&xs, &ys, degree)?;
    finite(poly.eval(target).max(0.0), "polynomial regression prediction")
}

/// Dot product with weights `exp(linspace(0, 1, n))`, normalised to sum 1,
/// so the last value weighs `e` times the first. `None` for an empty slice.
pub fn recency_weighted_mean(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(values[0]);
    }

    let weights: Vec<f64> = (0..n)
        .map(|i| (i as f64 / (n - 1) as f64).exp())
        .collect();
    let total: f64 = weights.iter().sum();

    Some(
        values
            .iter()
            .zip(&weights)
            .map(|(v, w)| v * w / total)
            .sum(),
    )
}

fn sorted_values(points: &[HistoricalPoint]) -> Vec<f64> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.date);
    sorted.into_iter().map(|p| p.value).collect()
}

/// Day offsets from the first date, filtered values, and the offset of
/// `last_date + days_ahead`.
fn regression_inputs(
    points: &[HistoricalPoint],
    days_ahead: i64,
    outlier_detection: bool,
) -> (Vec<f64>, Vec<f64>, f64) {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.date);

    let first = sorted[0].date;
    let last = sorted[sorted.len() - 1].date;
    let xs: Vec<f64> = sorted
        .iter()
        .map(|p| (p.date - first).num_days() as f64)
        .collect();
    let raw: Vec<f64> = sorted.iter().map(|p| p.value).collect();
    let ys = replace_outliers(&raw, outlier_detection);
    let target = ((last - first).num_days() + days_ahead) as f64;

    (xs, ys, target)
}

fn finite(value: f64, what: &'static str) -> Result<f64, ForecastError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ForecastError::NonFinite(what))
    }
}

fn absorb(method: &'static str, result: Result<f64, ForecastError>) -> Estimate {
    match result {
        Ok(value) => Estimate::Value(round2(value)),
        Err(e @ ForecastError::InsufficientData { .. }) => {
            debug!(method, "{method} skipped: {e}");
            Estimate::Unavailable
        }
        Err(e) => {
            error!(method, "{method} forecast error: {e}");
            Estimate::Unavailable
        }
    }
}
