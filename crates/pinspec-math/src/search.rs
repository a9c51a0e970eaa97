// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Table Search
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Binary search and piecewise-linear interpolation on sorted tables.

/// Smallest index `i` with `x[i] >= value`, clamped to the last index.
///
/// `x` must be sorted ascending and non-empty.
pub fn find_upper_index(x: &[f64], value: f64) -> usize {
    let i = x.partition_point(|v| *v < value);
    i.min(x.len().saturating_sub(1))
}

/// Index of the interval `[x[i], x[i+1])` containing `value`, or `None`
/// outside `[x[0], x[n-1]]`. The last point maps to the last interval.
pub fn find_interval(x: &[f64], value: f64) -> Option<usize> {
    let n = x.len();
    if n < 2 || !(value >= x[0] && value <= x[n - 1]) {
        return None;
    }
    let i = x.partition_point(|v| *v <= value);
    Some(i.saturating_sub(1).min(n - 2))
}

/// Piecewise-linear interpolation of `y(x)` at `pt`, clamped to the end
/// values. Repeated abscissae resolve to the left value.
pub fn linear_interp(x: &[f64], y: &[f64], pt: f64) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    if pt <= x[0] {
        return y[0];
    }
    if pt >= x[n - 1] {
        return y[n - 1];
    }
    let upper = x[..n].partition_point(|v| *v <= pt);
    let lower = upper - 1;
    let dx = x[upper] - x[lower];
    if dx <= 0.0 {
        return y[lower];
    }
    y[lower] + (pt - x[lower]) * (y[upper] - y[lower]) / dx
}
