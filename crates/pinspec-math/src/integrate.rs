// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Quadrature
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Trapezoidal quadrature and normalized cumulative distributions.

use ndarray::Array1;

/// Trapezoidal integral of `y(x)`.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| (xw[1] - xw[0]) * 0.5 * (yw[0] + yw[1]))
        .sum()
}

/// Running trapezoidal integral; element `i` integrates over `x[0..=i]`.
pub fn cumulative_trapezoid(x: &[f64], y: &[f64]) -> Array1<f64> {
    let n = x.len().min(y.len());
    let mut out = Array1::zeros(n);
    for i in 1..n {
        out[i] = out[i - 1] + (x[i] - x[i - 1]) * 0.5 * (y[i] + y[i - 1]);
    }
    out
}

/// Cumulative trapezoid normalized by its final value.
///
/// Returns `None` when the integral is not strictly positive.
pub fn normalized_cdf(x: &[f64], y: &[f64]) -> Option<Array1<f64>> {
    let mut cdf = cumulative_trapezoid(x, y);
    let total = *cdf.last()?;
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    cdf.mapv_inplace(|v| v / total);
    let last = cdf.len() - 1;
    cdf[last] = 1.0;
    Some(cdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::linspace;

    #[test]
    fn test_trapezoid_exact_for_linear() {
        let x = linspace(0.0, 2.0, 5);
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v).collect();
        let integral = trapezoid(x.as_slice().unwrap(), &y);
        assert!((integral - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_cumulative_trapezoid_monotone() {
        let x = linspace(0.0, std::f64::consts::PI, 200);
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let cdf = cumulative_trapezoid(x.as_slice().unwrap(), &y);
        assert_eq!(cdf[0], 0.0);
        for w in cdf.windows(2) {
            assert!(w[1] >= w[0]);
        }
        assert!((cdf[199] - 2.0).abs() < 1e-3, "∫sin = 2, got {}", cdf[199]);
    }

    #[test]
    fn test_normalized_cdf() {
        let x = [0.0, 1.0, 2.0];
        let y = [1.0, 1.0, 1.0];
        let cdf = normalized_cdf(&x, &y).unwrap();
        assert_eq!(cdf.to_vec(), vec![0.0, 0.5, 1.0]);
        assert!(normalized_cdf(&x, &[0.0, 0.0, 0.0]).is_none());
    }
}
