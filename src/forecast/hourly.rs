use std::collections::BTreeMap;

use tracing::warn;

use super::methods::recency_weighted_mean;
use super::outlier::replace_outliers;
use super::round2;
use crate::types::HourlySample;

pub const HOURS_PER_DAY: u32 = 24;

/// Collect counts per hour of day, keeping the input order inside each hour.
/// Samples with an hour outside 0..=23 are dropped.
pub fn group_by_hour(samples: &[HourlySample]) -> BTreeMap<u32, Vec<f64>> {
    let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for sample in samples {
        if sample.hour >= HOURS_PER_DAY {
            warn!(hour = sample.hour, "Ignoring hourly sample outside 0..=23");
            continue;
        }
        groups.entry(sample.hour).or_default().push(sample.count as f64);
    }
    groups
}

/// Forecast for every hour of the next day: exactly 24 `(hour, value)` pairs.
///
/// Each hour with data gets the recency-weighted mean of its outlier-filtered
/// counts. Hours without data start at 0 and are then gap-filled by
/// [`interpolate_gaps`].
pub fn forecast_hours(samples: &[HourlySample], outlier_detection: bool) -> Vec<(u32, f64)> {
    let groups = group_by_hour(samples);

    let provisional: Vec<(u32, f64)> = (0..HOURS_PER_DAY)
        .map(|hour| {
            let value = groups
                .get(&hour)
                .map(|counts| replace_outliers(counts, outlier_detection))
                .and_then(|cleaned| recency_weighted_mean(&cleaned))
                .filter(|v| v.is_finite())
                .map(|v| round2(v.max(0.0)))
                .unwrap_or(0.0);
            (hour, value)
        })
        .collect();

    interpolate_gaps(&provisional)
}

/// Replace interior zero hours that have a positive neighbour with the mean
/// of both neighbours. Boundary hours, and zero hours between two zeros, stay 0.
///
/// Neighbours are read from the input, so consecutive gaps do not feed each other.
pub fn interpolate_gaps(forecasts: &[(u32, f64)]) -> Vec<(u32, f64)> {
    let last = forecasts.len().saturating_sub(1);
    forecasts
        .iter()
        .enumerate()
        .map(|(i, &(hour, value))| {
            if value != 0.0 || i == 0 || i == last {
                return (hour, value);
            }
            let prev = forecasts[i - 1].1;
            let next = forecasts[i + 1].1;
            if prev > 0.0 || next > 0.0 {
                (hour, round2((prev + next) / 2.0))
            } else {
                (hour, value)
            }
        })
        .collect()
}
