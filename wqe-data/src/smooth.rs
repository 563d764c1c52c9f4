//! Locally weighted scatterplot smoothing (LOWESS).
//!
//! Cleveland's algorithm: for each x, fit a weighted straight line through
//! the nearest `frac * n` points using tricube distance weights, then repeat
//! with bisquare robustness weights so isolated outliers stop pulling the
//! curve. The fitted curve is evaluated on the input's own x-grid.

use crate::aggregate::SeriesPoint;

/// Fraction of points contributing to each local fit.
pub const SMOOTHING_FRAC: f64 = 0.5;

/// Robustifying passes after the initial fit.
pub const ROBUSTNESS_ITERATIONS: usize = 3;

/// Smooth `(xs, ys)` with the default bandwidth.
///
/// Returns `(x, fitted)` pairs sorted by x, one per input point. Fewer than
/// two points (or mismatched inputs) give an empty result.
pub fn smooth(xs: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
    smooth_with_frac(xs, ys, SMOOTHING_FRAC)
}

pub fn smooth_with_frac(xs: &[f64], ys: &[f64], frac: f64) -> Vec<(f64, f64)> {
    if xs.len() < 2 || xs.len() != ys.len() {
        return Vec::new();
    }
    lowess(xs, ys, frac, ROBUSTNESS_ITERATIONS)
}

/// Smooth a run of series points.
///
/// Buckets are smoothed on their ordinal x-values and each fitted value is
/// attached to the bucket it came from, so timestamps keep their time of
/// day. Output is in bucket order.
pub fn smooth_points(points: &[SeriesPoint], frac: f64) -> Vec<SeriesPoint> {
    let mut sorted: Vec<&SeriesPoint> = points.iter().collect();
    sorted.sort_by(|a, b| a.bucket.ordinal().total_cmp(&b.bucket.ordinal()));
    let xs: Vec<f64> = sorted.iter().map(|p| p.bucket.ordinal()).collect();
    let ys: Vec<f64> = sorted.iter().map(|p| p.value).collect();
    // lowess sorts stably on the same keys, so positions line up
    smooth_with_frac(&xs, &ys, frac)
        .into_iter()
        .zip(sorted)
        .map(|((_, value), p)| SeriesPoint {
            bucket: p.bucket,
            value,
        })
        .collect()
}

pub fn lowess(xs: &[f64], ys: &[f64], frac: f64, iterations: usize) -> Vec<(f64, f64)> {
    let n = xs.len();
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));
    let x: Vec<f64> = order.iter().map(|&i| xs[i]).collect();
    let y: Vec<f64> = order.iter().map(|&i| ys[i]).collect();

    let span = ((frac * n as f64 + 1e-10) as usize).clamp(1, n);
    let mut robustness = vec![1.0; n];
    let mut fitted = vec![0.0; n];
    let mut weights = vec![0.0; n];

    for pass in 0..=iterations {
        let mut left = 0;
        let mut right = span - 1;
        for i in 0..n {
            while right + 1 < n && x[i] - x[left] > x[right + 1] - x[i] {
                left += 1;
                right += 1;
            }
            let h = (x[i] - x[left]).max(x[right] - x[i]);
            fitted[i] = local_fit(&x, &y, &robustness, &mut weights, i, left, h).unwrap_or(y[i]);
        }

        if pass == iterations {
            break;
        }

        let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(yi, fi)| (yi - fi).abs()).collect();
        let scale = residuals.iter().sum::<f64>() / n as f64;
        let cmad = 6.0 * median(&residuals);
        if cmad < 1e-7 * scale {
            break;
        }
        let (c1, c9) = (0.001 * cmad, 0.999 * cmad);
        for (w, &r) in robustness.iter_mut().zip(&residuals) {
            *w = if r <= c1 {
                1.0
            } else if r <= c9 {
                let u = r / cmad;
                (1.0 - u * u).powi(2)
            } else {
                0.0
            };
        }
    }

    x.into_iter().zip(fitted).collect()
}

/// Weighted linear fit at `x[i]` over the neighbourhood starting at `left`.
/// `None` when every weight vanished.
fn local_fit(
    x: &[f64],
    y: &[f64],
    robustness: &[f64],
    weights: &mut [f64],
    i: usize,
    left: usize,
    h: f64,
) -> Option<f64> {
    let n = x.len();
    let xi = x[i];
    let range = x[n - 1] - x[0];
    let (h1, h9) = (0.001 * h, 0.999 * h);

    let mut total = 0.0;
    let mut j = left;
    while j < n {
        weights[j] = 0.0;
        let r = (x[j] - xi).abs();
        if r <= h9 {
            let w = if r <= h1 {
                1.0
            } else {
                let u = r / h;
                (1.0 - u * u * u).powi(3)
            };
            weights[j] = w * robustness[j];
            total += weights[j];
        } else if x[j] > xi {
            break;
        }
        j += 1;
    }
    let window = left..j;
    if total <= 0.0 {
        return None;
    }
    for w in &mut weights[window.clone()] {
        *w /= total;
    }

    if h > 0.0 {
        let mean: f64 = window.clone().map(|k| weights[k] * x[k]).sum();
        let spread: f64 = window.clone().map(|k| weights[k] * (x[k] - mean).powi(2)).sum();
        if spread.sqrt() > 0.001 * range {
            let slope = (xi - mean) / spread;
            for k in window.clone() {
                weights[k] *= slope * (x[k] - mean) + 1.0;
            }
        }
    }

    Some(window.map(|k| weights[k] * y[k]).sum())
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
