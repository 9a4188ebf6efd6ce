use serde::Serialize;

use super::{round2, Estimate, ForecastError};
use crate::config::ensemble_weights;

/// Estimators that can take part in the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    ExponentialSmoothing,
    WeightedMovingAverage,
    LinearRegression,
    PolynomialRegression,
}

impl Method {
    pub fn base_weight(self) -> f64 {
        match self {
            Method::ExponentialSmoothing => ensemble_weights::EXPONENTIAL,
            Method::WeightedMovingAverage => ensemble_weights::WEIGHTED_AVERAGE,
            Method::LinearRegression => ensemble_weights::LINEAR,
            Method::PolynomialRegression => ensemble_weights::POLYNOMIAL,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Method::ExponentialSmoothing => "exponential_smoothing",
            Method::WeightedMovingAverage => "weighted_moving_average",
            Method::LinearRegression => "linear_regression",
            Method::PolynomialRegression => "polynomial_regression",
        };
        write!(f, "{s}")
    }
}

/// One member's share of a combined forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contribution {
    pub method: Method,
    /// Renormalised weight actually applied.
    pub weight: f64,
    pub estimate: f64,
}

/// Result of combining the member estimates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleBreakdown {
    pub contributions: Vec<Contribution>,
    pub value: f64,
}

/// Weighted combination of the strictly positive estimates.
///
/// A member whose estimate is unavailable or exactly 0 is dropped and the
/// remaining base weights are rescaled to sum to 1. With no members left the
/// combined value is 0.
pub fn combine(candidates: &[(Method, Estimate)]) -> Result<EnsembleBreakdown, ForecastError> {
    let included: Vec<(Method, f64)> = candidates
        .iter()
        .filter_map(|&(method, est)| est.positive().map(|v| (method, v)))
        .collect();

    if included.is_empty() {
        return Ok(EnsembleBreakdown {
            contributions: Vec::new(),
            value: 0.0,
        });
    }

    let total_weight: f64 = included.iter().map(|(m, _)| m.base_weight()).sum();
    if !(total_weight.is_finite() && total_weight > 0.0) {
        return Err(ForecastError::NonFinite("ensemble weight total"));
    }

    let contributions: Vec<Contribution> = included
        .into_iter()
        .map(|(method, estimate)| Contribution {
            method,
            weight: method.base_weight() / total_weight,
            estimate,
        })
        .collect();

    let value: f64 = contributions.iter().map(|c| c.weight * c.estimate).sum();
    if !value.is_finite() {
        return Err(ForecastError::NonFinite("ensemble value"));
    }

    Ok(EnsembleBreakdown {
        contributions,
        value: round2(value),
    })
}
