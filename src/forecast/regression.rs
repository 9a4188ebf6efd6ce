//! Ordinary least-squares fits over (day offset, value) pairs.

use super::ForecastError;

/// Pivots smaller than this are treated as a singular system.
const SINGULAR_EPS: f64 = 1e-10;

/// Straight-line fit. Returns `(intercept, slope)`.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Result<(f64, f64), ForecastError> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return Err(ForecastError::InsufficientData {
            required: 2,
            actual: xs.len().min(ys.len()),
        });
    }

    let n = xs.len() as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_x2: f64 = xs.iter().map(|x| x * x).sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < SINGULAR_EPS {
        return Err(ForecastError::Singular("all observations share one date"));
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Ok((intercept, slope))
}

/// Polynomial fit of the given degree.
///
/// Offsets are scaled into `[-1, 1]` before building the normal equations so
/// higher powers of day counts stay well conditioned.
pub fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> Result<Polynomial, ForecastError> {
    let terms = degree + 1;
    if xs.len() != ys.len() || xs.len() < terms {
        return Err(ForecastError::InsufficientData {
            required: terms,
            actual: xs.len().min(ys.len()),
        });
    }

    let scale = xs.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    let scale = if scale > 0.0 { scale } else { 1.0 };

    // Augmented normal matrix [XᵀX | Xᵀy].
    let mut m = vec![vec![0.0; terms + 1]; terms];
    for (&x, &y) in xs.iter().zip(ys) {
        let x = x / scale;
        let powers: Vec<f64> = (0..2 * terms).map(|p| x.powi(p as i32)).collect();
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().take(terms).enumerate() {
                *cell += powers[i + j];
            }
            row[terms] += y * powers[i];
        }
    }

    let coefficients = solve(m)?;
    Ok(Polynomial {
        coefficients,
        scale,
    })
}

/// Fitted polynomial in scaled offsets.
#[derive(Debug, Clone)]
pub struct Polynomial {
    coefficients: Vec<f64>,
    scale: f64,
}

impl Polynomial {
    pub fn eval(&self, x: f64) -> f64 {
        let x = x / self.scale;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + c)
    }
}

/// Gauss-Jordan elimination with partial pivoting on an augmented matrix.
fn solve(mut m: Vec<Vec<f64>>) -> Result<Vec<f64>, ForecastError> {
    let n = m.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        if m[pivot_row][col].abs() < SINGULAR_EPS {
            return Err(ForecastError::Singular("normal equations have no unique solution"));
        }
        m.swap(col, pivot_row);

        let pivot = m[col][col];
        for cell in m[col].iter_mut() {
            *cell /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = m[row][col];
                if factor != 0.0 {
                    for k in col..=n {
                        let delta = factor * m[col][k];
                        m[row][k] -= delta;
                    }
                }
            }
        }
    }

    let solution: Vec<f64> = m.iter().map(|row| row[n]).collect();
    if solution.iter().any(|c| !c.is_finite()) {
        return Err(ForecastError::NonFinite("polynomial coefficients"));
    }
    Ok(solution)
}
