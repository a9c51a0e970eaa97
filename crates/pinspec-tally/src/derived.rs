// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Derived Tallies
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Arithmetic on tallies with first-order error propagation.
//!
//! Results are `Derived` tallies in the `Undefined` domain holding a
//! single batch whose statistics are set directly.

use crate::tally::{BatchStatistics, Tally};
use ndarray::Array1;
use pinspec_types::error::{require_len, PinSpecError, PinSpecResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Subtract => "-",
            Op::Multiply => "*",
            Op::Divide => "/",
        }
    }

    /// (mean, variance) of `a op b`.
    fn propagate(self, m1: f64, v1: f64, m2: f64, v2: f64) -> (f64, f64) {
        match self {
            Op::Add => (m1 + m2, v1 + v2),
            Op::Subtract => (m1 - m2, v1 + v2),
            Op::Multiply => (m1 * m2, m1 * m1 * v2 + m2 * m2 * v1 + v1 * v2),
            Op::Divide => (
                m1 / m2 + m1 * v2 / m2.powi(3),
                v1 / (m2 * m2) + m1 * m1 * v2 / m2.powi(4),
            ),
        }
    }
}

impl Tally {
    pub fn add(&self, other: &Tally) -> PinSpecResult<Tally> {
        combine(self, other, Op::Add)
    }

    pub fn subtract(&self, other: &Tally) -> PinSpecResult<Tally> {
        combine(self, other, Op::Subtract)
    }

    pub fn multiply(&self, other: &Tally) -> PinSpecResult<Tally> {
        combine(self, other, Op::Multiply)
    }

    pub fn divide(&self, other: &Tally) -> PinSpecResult<Tally> {
        combine(self, other, Op::Divide)
    }

    pub fn add_scalar(&self, a: f64) -> PinSpecResult<Tally> {
        scalar(self, a, Op::Add)
    }

    pub fn subtract_scalar(&self, a: f64) -> PinSpecResult<Tally> {
        scalar(self, a, Op::Subtract)
    }

    pub fn multiply_scalar(&self, a: f64) -> PinSpecResult<Tally> {
        scalar(self, a, Op::Multiply)
    }

    pub fn divide_scalar(&self, a: f64) -> PinSpecResult<Tally> {
        if a == 0.0 {
            return Err(PinSpecError::ConfigError(format!(
                "cannot divide tally {} by zero",
                self.name()
            )));
        }
        scalar(self, a, Op::Divide)
    }

    /// Bin-wise product with `values`; `values.len()` must equal the bin count.
    pub fn multiply_array(&self, values: &[f64]) -> PinSpecResult<Tally> {
        array(self, values, Op::Multiply)
    }

    pub fn divide_array(&self, values: &[f64]) -> PinSpecResult<Tally> {
        array(self, values, Op::Divide)
    }
}

fn combine(a: &Tally, b: &Tally, op: Op) -> PinSpecResult<Tally> {
    let sa = a.statistics()?;
    let sb = b.statistics()?;
    let (na, nb) = (a.num_bins(), b.num_bins());
    if na > 1 && nb > 1 && a.edges() != b.edges() {
        return Err(PinSpecError::ConfigError(format!(
            "cannot combine tallies {} and {} with different bin edges",
            a.name(),
            b.name()
        )));
    }
    // a single-bin operand broadcasts; the result keeps the wider edges
    let shape = if nb > na { b } else { a };
    let n = na.max(nb);
    let pick = |len: usize, i: usize| if len == 1 { 0 } else { i };

    let mut mu = Array1::zeros(n);
    let mut variance = Array1::zeros(n);
    for i in 0..n {
        let (ia, ib) = (pick(na, i), pick(nb, i));
        let (m, v) = op.propagate(sa.mu[ia], sa.variance[ia], sb.mu[ib], sb.variance[ib]);
        mu[i] = m;
        variance[i] = v;
    }
    Ok(derived_like(
        shape,
        format!("{} {} {}", a.name(), op.symbol(), b.name()),
        mu,
        variance,
    ))
}

fn scalar(t: &Tally, a: f64, op: Op) -> PinSpecResult<Tally> {
    let s = t.statistics()?;
    let (mu, variance) = match op {
        Op::Add => (s.mu.mapv(|m| m + a), s.variance.clone()),
        Op::Subtract => (s.mu.mapv(|m| m - a), s.variance.clone()),
        Op::Multiply => (s.mu.mapv(|m| m * a), s.variance.mapv(|v| a * a * v)),
        Op::Divide => (s.mu.mapv(|m| m / a), s.variance.mapv(|v| v / (a * a))),
    };
    Ok(derived_like(t, format!("{} {} {a}", t.name(), op.symbol()), mu, variance))
}

fn array(t: &Tally, values: &[f64], op: Op) -> PinSpecResult<Tally> {
    let s = t.statistics()?;
    require_len(values.len(), t.num_bins(), "tally operand array")?;
    if op == Op::Divide && values.iter().any(|v| *v == 0.0) {
        return Err(PinSpecError::ConfigError(format!(
            "cannot divide tally {} by an array containing zeros",
            t.name()
        )));
    }
    let a = Array1::from(values.to_vec());
    let (mu, variance) = match op {
        Op::Multiply => (&s.mu * &a, &s.variance * &a.mapv(|x| x * x)),
        _ => (&s.mu / &a, &s.variance / &a.mapv(|x| x * x)),
    };
    Ok(derived_like(t, format!("{} {} array", t.name(), op.symbol()), mu, variance))
}

fn derived_like(shape: &Tally, name: String, mu: Array1<f64>, variance: Array1<f64>) -> Tally {
    Tally::derived(
        name,
        shape.spacing(),
        shape.edges().clone(),
        shape.bin_delta(),
        BatchStatistics::from_mean_variance(mu, variance),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::{TallyDomain, TallyType};

    /// Tally whose bins hold the given (mean, variance) pairs from two batches.
    fn with_stats(name: &str, edges: &[f64], stats: &[(f64, f64)]) -> Tally {
        let mut t = Tally::new(name, TallyDomain::Geometry, TallyType::CollisionRate);
        t.set_bin_edges(edges).unwrap();
        t.set_num_batches(2).unwrap();
        for (i, &(m, v)) in stats.iter().enumerate() {
            // two batches m ± d give mean m and variance 2d²
            let d = (v / 2.0).sqrt();
            let e = 0.5 * (edges[i] + edges[i + 1]);
            t.tally_sample(0, e, m + d).unwrap();
            t.tally_sample(1, e, m - d).unwrap();
        }
        t.compute_batch_statistics().unwrap();
        t
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_binary_propagation() {
        let a = with_stats("a", &[0.0, 1.0, 2.0], &[(4.0, 0.5), (2.0, 0.2)]);
        let b = with_stats("b", &[0.0, 1.0, 2.0], &[(2.0, 0.1), (5.0, 0.3)]);

        let sum = a.add(&b).unwrap();
        assert!(close(sum.batch_mu().unwrap()[0], 6.0));
        assert!(close(sum.batch_variance().unwrap()[0], 0.6));

        let diff = a.subtract(&b).unwrap();
        assert!(close(diff.batch_mu().unwrap()[1], -3.0));
        assert!(close(diff.batch_variance().unwrap()[1], 0.5));

        let prod = a.multiply(&b).unwrap();
        assert!(close(prod.batch_mu().unwrap()[0], 8.0));
        assert!(close(prod.batch_variance().unwrap()[0], 16.0 * 0.1 + 4.0 * 0.5 + 0.05));

        let quot = a.divide(&b).unwrap();
        assert!(close(quot.batch_mu().unwrap()[0], 2.0 + 4.0 * 0.1 / 8.0));
        assert!(close(quot.batch_variance().unwrap()[0], 0.5 / 4.0 + 16.0 * 0.1 / 16.0));

        let s = quot.statistics().unwrap();
        assert!(close(s.std_dev[0], s.variance[0].sqrt()));
        assert!(close(s.rel_err[0], s.std_dev[0] / s.mu[0]));
    }

    #[test]
    fn test_negative_difference_keeps_signed_rel_err() {
        let a = with_stats("a", &[0.0, 1.0], &[(2.0, 0.1)]);
        let b = with_stats("b", &[0.0, 1.0], &[(5.0, 0.3)]);
        let diff = a.subtract(&b).unwrap();
        let s = diff.statistics().unwrap();
        assert!(s.mu[0] < 0.0);
        assert!(s.rel_err[0] < 0.0);
        assert!(close(s.rel_err[0], s.std_dev[0] / -3.0));
    }

    #[test]
    fn test_derived_tally_tags() {
        let a = with_stats("a", &[0.0, 1.0], &[(1.0, 0.1)]);
        let d = a.multiply_scalar(3.0).unwrap();
        assert_eq!(d.kind(), TallyType::Derived);
        assert_eq!(d.domain(), TallyDomain::Undefined);
        assert_eq!(d.num_batches(), 1);
        assert!(close(d.batch_mu().unwrap()[0], 3.0));
        assert!(close(d.batch_variance().unwrap()[0], 0.9));
        let mut d = d;
        assert!(d.tally_sample(0, 0.5, 1.0).is_err());
        assert!(d.increment_num_batches(1).is_err());
    }

    #[test]
    fn test_scalar_ops() {
        let a = with_stats("a", &[0.0, 1.0], &[(4.0, 0.8)]);
        let plus = a.add_scalar(1.5).unwrap();
        assert!(close(plus.batch_mu().unwrap()[0], 5.5));
        assert!(close(plus.batch_variance().unwrap()[0], 0.8));
        let minus = a.subtract_scalar(1.0).unwrap();
        assert!(close(minus.batch_mu().unwrap()[0], 3.0));
        let div = a.divide_scalar(2.0).unwrap();
        assert!(close(div.batch_mu().unwrap()[0], 2.0));
        assert!(close(div.batch_variance().unwrap()[0], 0.2));
        assert!(a.divide_scalar(0.0).is_err());
    }

    #[test]
    fn test_array_ops() {
        let a = with_stats("a", &[0.0, 1.0, 2.0], &[(4.0, 0.8), (1.0, 0.2)]);
        let m = a.multiply_array(&[2.0, 10.0]).unwrap();
        assert!(close(m.batch_mu().unwrap()[1], 10.0));
        assert!(close(m.batch_variance().unwrap()[1], 20.0));
        let d = a.divide_array(&[2.0, 0.5]).unwrap();
        assert!(close(d.batch_mu().unwrap()[0], 2.0));
        assert!(close(d.batch_variance().unwrap()[1], 0.8));
        assert!(a.multiply_array(&[1.0]).is_err());
        assert!(a.divide_array(&[1.0, 0.0]).is_err());
    }

    #[test]
    fn test_single_bin_broadcasts() {
        let wide = with_stats("wide", &[0.0, 1.0, 2.0, 3.0], &[(1.0, 0.1), (2.0, 0.1), (3.0, 0.1)]);
        let single = with_stats("single", &[0.0, 10.0], &[(10.0, 0.4)]);
        let sum = single.add(&wide).unwrap();
        assert_eq!(sum.num_bins(), 3);
        assert_eq!(sum.edges(), wide.edges());
        assert!(close(sum.batch_mu().unwrap()[2], 13.0));
        assert!(close(sum.batch_variance().unwrap()[1], 0.5));
    }

    #[test]
    fn test_mismatched_edges_rejected() {
        let a = with_stats("a", &[0.0, 1.0, 2.0], &[(1.0, 0.1), (1.0, 0.1)]);
        let b = with_stats("b", &[0.0, 1.5, 2.0], &[(1.0, 0.1), (1.0, 0.1)]);
        assert!(matches!(a.add(&b), Err(PinSpecError::ConfigError(_))));
    }

    #[test]
    fn test_requires_statistics() {
        let a = with_stats("a", &[0.0, 1.0], &[(1.0, 0.1)]);
        let mut raw = Tally::new("raw", TallyDomain::Geometry, TallyType::Flux);
        raw.set_bin_edges(&[0.0, 1.0]).unwrap();
        assert!(matches!(a.add(&raw), Err(PinSpecError::StatisticsUnavailable(_))));
    }
}
