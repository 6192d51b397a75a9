//! Closed-form statistics shared by the detectors.
//!
//! All functions are pure and return `None` instead of producing NaN when the
//! input is too small or degenerate for the statistic.

/// Tolerance for threshold comparisons on derived ratios.
///
/// Rates computed from decimal inputs (0.10, 0.12, ...) land a few ulps away
/// from the exact threshold; comparisons allow for that.
pub const RATE_EPSILON: f64 = 1e-9;

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// True when every value is bitwise-equal to the first.
///
/// Checked before computing a standard deviation so rounding noise in the mean
/// never turns a flat series into a tiny non-zero spread.
pub fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Least-squares fit of `values` against their index (0, 1, 2, ...).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    /// Fitted value at index 0.
    pub intercept: f64,
    /// Coefficient of determination, clamped to [0, 1].
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, index: usize) -> f64 {
        self.intercept + self.slope * index as f64
    }
}

/// Ordinary least squares over the sequence index.
///
/// Returns `None` for fewer than two points or a series with zero total
/// variance, where R² is undefined.
pub fn linear_regression(values: &[f64]) -> Option<LinearFit> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values)?;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut ss_tot = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        ss_tot += dy * dy;
    }
    if ss_tot == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let ss_res: f64 = values
        .iter()
        .enumerate()
        .map(|(i, &y)| (y - (intercept + slope * i as f64)).powi(2))
        .sum();
    let r_squared = (1.0 - ss_res / ss_tot).clamp(0.0, 1.0);

    let fit = LinearFit {
        slope,
        intercept,
        r_squared,
    };
    (slope.is_finite() && intercept.is_finite() && r_squared.is_finite()).then_some(fit)
}

/// Inclusive percentile rank: share of `population` at or below `value`, 0–100.
///
/// Ties count toward the rank, so the maximum of a population ranks at 100.
pub fn percentile_rank(population: &[f64], value: f64) -> Option<f64> {
    if population.is_empty() {
        return None;
    }
    let at_or_below = population.iter().filter(|&&v| v <= value).count();
    Some(at_or_below as f64 / population.len() as f64 * 100.0)
}
