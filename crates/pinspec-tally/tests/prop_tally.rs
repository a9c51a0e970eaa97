// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Property-Based Tests (proptest) for pinspec-tally
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for pinspec-tally using proptest.
//!
//! Covers: bin lookup, batch statistics, derived-tally propagation.

use pinspec_math::search::find_interval;
use pinspec_tally::tally::{BinSpacing, Tally, TallyDomain, TallyType};
use proptest::prelude::*;

fn binned(start: f64, end: f64, bins: usize, spacing: BinSpacing) -> Tally {
    let mut t = Tally::new("p", TallyDomain::Geometry, TallyType::CollisionRate);
    t.generate_bin_edges(start, end, bins, spacing).unwrap();
    t
}

// ── Bin Lookup ───────────────────────────────────────────────────────

proptest! {
    /// Arithmetic lookup agrees with binary search on the stored edges.
    #[test]
    fn bin_index_agrees_with_search(
        bins in 1usize..500,
        log in any::<bool>(),
        x in -6.0f64..8.0,
    ) {
        let spacing = if log { BinSpacing::Logarithmic } else { BinSpacing::Equal };
        let t = binned(1e-4, 1e7, bins, spacing);
        let sample = 10f64.powf(x);
        let expected = find_interval(t.edges().as_slice().unwrap(), sample);
        prop_assert_eq!(t.bin_index(sample), expected);
    }

    /// Irregular edges: every in-range sample lands in the bin that holds it.
    #[test]
    fn user_edges_contain_sample(
        widths in prop::collection::vec(0.01f64..10.0, 1..50),
        frac in 0.0f64..1.0,
    ) {
        let mut edges = vec![0.0];
        for w in &widths {
            let last = *edges.last().unwrap();
            edges.push(last + w);
        }
        let mut t = Tally::new("u", TallyDomain::Geometry, TallyType::Flux);
        t.set_bin_edges(&edges).unwrap();
        let sample = frac * edges[edges.len() - 1];
        let i = t.bin_index(sample).unwrap();
        prop_assert!(edges[i] <= sample && sample <= edges[i + 1]);
    }
}

// ── Batch Statistics ─────────────────────────────────────────────────

proptest! {
    /// Mean is the batch average and variance is non-negative.
    #[test]
    fn batch_mean_and_variance(values in prop::collection::vec(0.0f64..100.0, 2..40)) {
        let mut t = binned(1.0, 2.0, 1, BinSpacing::Equal);
        t.set_num_batches(values.len()).unwrap();
        for (b, v) in values.iter().enumerate() {
            t.tally_sample(b, 1.5, *v).unwrap();
        }
        t.compute_batch_statistics().unwrap();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let mu = t.batch_mu().unwrap()[0];
        let sv = t.batch_variance().unwrap()[0];
        prop_assert!((mu - mean).abs() < 1e-9 * mean.max(1.0));
        prop_assert!(sv >= 0.0);
        prop_assert!((sv - var).abs() < 1e-6 * var.max(1.0), "{} vs {}", sv, var);
    }

    /// Adding a tally to itself doubles the mean and the variance.
    #[test]
    fn self_sum_doubles(a in 0.1f64..50.0, d in 0.0f64..5.0) {
        let mut t = binned(1.0, 2.0, 1, BinSpacing::Equal);
        t.set_num_batches(2).unwrap();
        t.tally_sample(0, 1.5, a + d).unwrap();
        t.tally_sample(1, 1.5, a - d).unwrap();
        t.compute_batch_statistics().unwrap();
        let sum = t.add(&t).unwrap();
        let mu = t.batch_mu().unwrap()[0];
        let var = t.batch_variance().unwrap()[0];
        prop_assert!((sum.batch_mu().unwrap()[0] - 2.0 * mu).abs() < 1e-9 * mu.max(1.0));
        prop_assert!((sum.batch_variance().unwrap()[0] - 2.0 * var).abs() < 1e-9 * var.max(1.0));
    }
}
