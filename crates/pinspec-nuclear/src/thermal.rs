// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Thermal Scattering
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Free-gas thermal scattering kernel, tabulated as per-pivot CDFs.
//!
//! Energies inside the table are in units of kT. Each pivot is an
//! incident energy E/kT; each column is an outgoing/incident ratio E'/E.

use ndarray::{Array1, Array2, ArrayView1};
use pinspec_math::grid::logspace;
use pinspec_math::integrate::normalized_cdf;
use pinspec_math::search::find_upper_index;
use pinspec_types::config::ThermalScatteringConfig;
use pinspec_types::constants::K_BOLTZMANN_EV;
use pinspec_types::error::{require_positive, PinSpecError, PinSpecResult};
use rand::Rng;
use statrs::function::erf::erf;

/// Kernel value every pivot must fall below at the largest tabulated ratio.
const KERNEL_TOLERANCE: f64 = 0.1;

/// Growth step of the largest ratio while searching for the tail.
const RATIO_STEP: f64 = 0.25;

/// Smallest tabulated outgoing/incident ratio.
const MIN_RATIO: f64 = 1e-5;

/// Hard ceiling on the tail search.
const MAX_RATIO: f64 = 1e3;

/// Target-motion constants of the scattering nucleus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    pub alpha: f64,
    pub eta: f64,
    pub rho: f64,
}

/// Free-gas kernel at incident energy `e_kt` (units of kT) and outgoing
/// ratio `ratio` = E'/E.
pub fn free_gas_kernel(params: KernelParams, e_kt: f64, ratio: f64) -> f64 {
    let KernelParams { alpha, eta, rho } = params;
    let e_prime = e_kt * ratio;
    let a = e_kt.sqrt();
    let b = e_prime.sqrt();
    let c = erf(eta * b - rho * a);
    let d = erf(eta * b + rho * a);
    let e = erf(eta * a - rho * b);
    let f = erf(eta * a + rho * b);
    let g = (e_kt - e_prime).exp();

    let value = if e_prime > e_kt {
        (c - d) + g * (e + f)
    } else {
        (c + d) + g * (e - f)
    };
    value * eta * eta / 2.0 * (1.0 - alpha)
}

#[derive(Debug, Clone)]
pub struct ThermalScatteringTable {
    kt: f64,
    pivots: Array1<f64>,
    ratios: Array1<f64>,
    cdfs: Array2<f64>,
}

impl ThermalScatteringTable {
    pub fn build(
        params: KernelParams,
        temperature_k: f64,
        cfg: &ThermalScatteringConfig,
    ) -> PinSpecResult<Self> {
        require_positive(temperature_k, "temperature_k")?;
        cfg.validate()?;
        let kt = K_BOLTZMANN_EV * temperature_k;
        let pivots = logspace(cfg.pivot_start_ev / kt, cfg.pivot_end_ev / kt, cfg.num_pivots);

        let mut max_ratio = 1.0;
        while pivots
            .iter()
            .any(|&p| free_gas_kernel(params, p, max_ratio) > KERNEL_TOLERANCE)
        {
            max_ratio += RATIO_STEP;
            if max_ratio > MAX_RATIO {
                tracing::warn!(max_ratio, "thermal kernel tail search hit its ceiling");
                break;
            }
        }

        let ratios = logspace(MIN_RATIO, max_ratio, cfg.num_ratio_bins);
        let ratio_slice = ratios.to_vec();
        let mut cdfs = Array2::zeros((cfg.num_pivots, cfg.num_ratio_bins));
        for (i, &pivot) in pivots.iter().enumerate() {
            let density: Vec<f64> = ratio_slice
                .iter()
                .map(|&r| free_gas_kernel(params, pivot, r))
                .collect();
            let cdf = normalized_cdf(&ratio_slice, &density).ok_or_else(|| {
                PinSpecError::DataError(format!(
                    "thermal kernel integrates to zero at pivot E/kT = {pivot}"
                ))
            })?;
            cdfs.row_mut(i).assign(&cdf);
        }

        tracing::debug!(
            kt,
            max_ratio,
            pivots = cfg.num_pivots,
            bins = cfg.num_ratio_bins,
            "built thermal scattering table"
        );
        Ok(ThermalScatteringTable {
            kt,
            pivots,
            ratios,
            cdfs,
        })
    }

    pub fn kt(&self) -> f64 {
        self.kt
    }

    /// Incident-energy pivots in units of kT.
    pub fn pivots(&self) -> &Array1<f64> {
        &self.pivots
    }

    /// Tabulated outgoing/incident ratios.
    pub fn ratios(&self) -> &Array1<f64> {
        &self.ratios
    }

    pub fn cdfs(&self) -> &Array2<f64> {
        &self.cdfs
    }

    pub fn sample<R: Rng + ?Sized>(&self, energy_ev: f64, rng: &mut R) -> f64 {
        let u: f64 = rng.gen();
        self.sample_with_draw(energy_ev, u)
    }

    /// Outgoing energy (eV) for incident `energy_ev` and uniform draw `u`.
    ///
    /// Between two pivots both CDFs are inverted with the same draw and
    /// the outgoing energy is interpolated linearly in E/kT.
    pub fn sample_with_draw(&self, energy_ev: f64, u: f64) -> f64 {
        let x = energy_ev / self.kt;
        let last = self.pivots.len() - 1;

        let e_prime = if x < self.pivots[0] {
            self.ratio_at(0, u) * x
        } else if x > self.pivots[last] {
            self.ratio_at(last, u) * x
        } else {
            let upper = find_upper_index(self.pivots.as_slice().unwrap_or(&[]), x).max(1);
            let lower = upper - 1;
            let lo = self.ratio_at(lower, u) * x;
            let hi = self.ratio_at(upper, u) * x;
            let slope = (hi - lo) / (self.pivots[upper] - self.pivots[lower]);
            lo + slope * (x - self.pivots[lower])
        };
        e_prime * self.kt
    }

    fn ratio_at(&self, pivot: usize, u: f64) -> f64 {
        self.ratios[invert(self.cdfs.row(pivot), u)]
    }
}

fn invert(cdf: ArrayView1<f64>, u: f64) -> usize {
    match cdf.as_slice() {
        Some(s) => find_upper_index(s, u),
        None => find_upper_index(&cdf.to_vec(), u),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hydrogen() -> KernelParams {
        KernelParams {
            alpha: 0.0,
            eta: 1.0,
            rho: 0.0,
        }
    }

    fn params_for(a: f64) -> KernelParams {
        KernelParams {
            alpha: ((a - 1.0) / (a + 1.0)).powi(2),
            eta: (a + 1.0) / (2.0 * a.sqrt()),
            rho: (a - 1.0) / (2.0 * a.sqrt()),
        }
    }

    #[test]
    fn test_hydrogen_kernel_closed_form() {
        // A = 1: kernel reduces to erf(√E') below E and erf(√E)·e^{E-E'} above
        let p = hydrogen();
        let e = 2.0;
        let below = free_gas_kernel(p, e, 0.5);
        assert!((below - erf(1.0)).abs() < 1e-12, "{below}");
        let above = free_gas_kernel(p, e, 2.0);
        let expected = erf(e.sqrt()) * (e - 4.0f64).exp();
        assert!((above - expected).abs() < 1e-12, "{above} vs {expected}");
    }

    #[test]
    fn test_kernel_non_negative() {
        let p = params_for(16.0);
        for &e in &[1e-3, 0.1, 1.0, 10.0, 300.0] {
            for &r in &[1e-4, 0.1, 0.5, 0.99, 1.01, 2.0, 5.0] {
                let v = free_gas_kernel(p, e, r);
                assert!(v >= -1e-9, "kernel({e}, {r}) = {v}");
            }
        }
    }

    #[test]
    fn test_table_cdfs_normalized() {
        let cfg = ThermalScatteringConfig::default();
        let table = ThermalScatteringTable::build(params_for(1.0), 300.0, &cfg).unwrap();
        assert_eq!(table.cdfs().dim(), (15, 1000));
        for row in table.cdfs().rows() {
            assert_eq!(row[0], 0.0);
            assert_eq!(row[999], 1.0);
            for j in 1..row.len() {
                assert!(row[j] >= row[j - 1]);
            }
        }
        assert!(*table.ratios().last().unwrap() >= 1.0);
    }

    #[test]
    fn test_sample_within_table_range() {
        let cfg = ThermalScatteringConfig::default();
        let table = ThermalScatteringTable::build(params_for(2.0), 300.0, &cfg).unwrap();
        let max_ratio = *table.ratios().last().unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        for &e in &[1e-4, 0.0253, 0.5, 3.9] {
            for _ in 0..200 {
                let out = table.sample(e, &mut rng);
                assert!(out > 0.0 && out <= e * max_ratio * (1.0 + 1e-9), "e={e} out={out}");
            }
        }
    }

    #[test]
    fn test_thermal_equilibrium_upscatter() {
        // very cold neutrons in a hydrogen gas at 300 K gain energy on average
        let cfg = ThermalScatteringConfig::default();
        let table = ThermalScatteringTable::build(hydrogen(), 300.0, &cfg).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let e = 1e-3;
        let mean: f64 = (0..2000).map(|_| table.sample(e, &mut rng)).sum::<f64>() / 2000.0;
        assert!(mean > e, "mean outgoing {mean} should exceed incident {e}");
    }

    #[test]
    fn test_draw_monotone_in_u() {
        let cfg = ThermalScatteringConfig::default();
        let table = ThermalScatteringTable::build(params_for(12.0), 600.0, &cfg).unwrap();
        let e = 0.1;
        let mut prev = 0.0;
        for k in 0..=20 {
            let out = table.sample_with_draw(e, k as f64 / 20.0);
            assert!(out >= prev - 1e-15, "u={} out={out} prev={prev}", k as f64 / 20.0);
            prev = out;
        }
    }
}
