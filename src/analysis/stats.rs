//! Descriptive statistics over slices of marks.
//!
//! Every function returns `None` when the statistic is not defined for the
//! input (empty data, or a single value for the sample deviation) instead of
//! producing NaN.

use std::cmp::Ordering;

/// Arithmetic mean.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample standard deviation (denominator `n - 1`). Undefined for `n <= 1`.
pub fn sample_std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let m = mean(data)?;
    let sum_sq: f64 = data.iter().map(|x| (x - m) * (x - m)).sum();
    Some((sum_sq / (data.len() - 1) as f64).sqrt())
}

pub fn min(data: &[f64]) -> Option<f64> {
    data.iter().copied().reduce(f64::min)
}

pub fn max(data: &[f64]) -> Option<f64> {
    data.iter().copied().reduce(f64::max)
}

/// The `p`-th quantile of ascending data, interpolating linearly between order
/// statistics at position `h = (n - 1) * p` (the NumPy and pandas default).
fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let h = (n - 1) as f64 * p;
    let lower = h.floor() as usize;
    let frac = h - h.floor();

    if lower + 1 >= n {
        Some(sorted[n - 1])
    } else {
        Some(sorted[lower] + frac * (sorted[lower + 1] - sorted[lower]))
    }
}

/// Interquartile range, `Q3 - Q1`.
pub fn iqr(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Some(quantile_sorted(&sorted, 0.75)? - quantile_sorted(&sorted, 0.25)?)
}
