use tracing::warn;

/// Minimum sample size for quartile estimation.
pub const MIN_SAMPLES: usize = 4;

/// IQR fence multiplier.
const FENCE: f64 = 1.5;

/// Replace values outside `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]` with the sample median.
///
/// Length is preserved. The input is returned unchanged when `enabled` is
/// false, when fewer than [`MIN_SAMPLES`] values are given, or when the sample
/// cannot be summarised (non-finite values).
pub fn replace_outliers(values: &[f64], enabled: bool) -> Vec<f64> {
    if !enabled || values.len() < MIN_SAMPLES {
        return values.to_vec();
    }

    if values.iter().any(|v| !v.is_finite()) {
        warn!(
            samples = values.len(),
            "Outlier removal skipped: non-finite value in sample, returning original data"
        );
        return values.to_vec();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = percentile(&sorted, 25.0);
    let q3 = percentile(&sorted, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - FENCE * iqr;
    let upper = q3 + FENCE * iqr;
    let median = percentile(&sorted, 50.0);

    values
        .iter()
        .map(|&v| if (lower..=upper).contains(&v) { v } else { median })
        .collect()
}

/// Percentile of an ascending sample using linear interpolation between
/// closest ranks (`rank = p/100 · (n − 1)`).
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}
