// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Fissioner
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Birth energies sampled from the Watt fission spectrum.

use ndarray::Array1;
use pinspec_math::grid::linspace;
use pinspec_math::integrate::normalized_cdf;
use pinspec_math::search::linear_interp;
use pinspec_types::config::FissionerConfig;
use pinspec_types::constants::EV_PER_MEV;
use pinspec_types::error::{PinSpecError, PinSpecResult};
use rand::Rng;

/// Watt spectrum χ(E) = 0.453·e^(−1.036E)·sinh(√(2.29E)), E in MeV.
pub fn watt_spectrum(energy_mev: f64) -> f64 {
    0.453 * (-1.036 * energy_mev).exp() * (2.29 * energy_mev).sqrt().sinh()
}

#[derive(Debug, Clone)]
pub struct Fissioner {
    energies: Array1<f64>,
    cdf: Array1<f64>,
}

impl Fissioner {
    pub fn new(cfg: &FissionerConfig) -> PinSpecResult<Self> {
        cfg.validate()?;
        let energies = linspace(0.0, cfg.e_max_mev, cfg.num_bins);
        let chi = energies.mapv(watt_spectrum);
        let e = energies.to_vec();
        let cdf = normalized_cdf(&e, &chi.to_vec()).ok_or_else(|| {
            PinSpecError::DataError("Watt spectrum integrates to zero".to_string())
        })?;
        tracing::debug!(bins = cfg.num_bins, e_max_mev = cfg.e_max_mev, "built fission spectrum CDF");
        Ok(Fissioner { energies, cdf })
    }

    /// Energy grid of the CDF (MeV).
    pub fn energies(&self) -> &Array1<f64> {
        &self.energies
    }

    pub fn cdf(&self) -> &Array1<f64> {
        &self.cdf
    }

    pub fn num_bins(&self) -> usize {
        self.energies.len()
    }

    /// Inverse-CDF energy (MeV) for uniform draw `u`.
    pub fn energy_for_draw_mev(&self, u: f64) -> f64 {
        linear_interp(
            self.cdf.as_slice().unwrap_or(&[]),
            self.energies.as_slice().unwrap_or(&[]),
            u,
        )
    }

    pub fn emit_energy_mev<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.energy_for_draw_mev(rng.gen())
    }

    /// Birth energy in eV.
    pub fn emit_energy<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.emit_energy_mev(rng) * EV_PER_MEV
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_watt_spectrum_shape() {
        assert_eq!(watt_spectrum(0.0), 0.0);
        // peak sits below 1 MeV
        let peak = (1..2000)
            .map(|i| i as f64 * 0.005)
            .max_by(|a, b| watt_spectrum(*a).total_cmp(&watt_spectrum(*b)))
            .unwrap();
        assert!(peak > 0.5 && peak < 1.0, "peak at {peak}");
    }

    #[test]
    fn test_cdf_normalized_and_monotone() {
        let f = Fissioner::new(&FissionerConfig {
            num_bins: 5000,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(f.cdf()[0], 0.0);
        assert_eq!(f.cdf()[f.num_bins() - 1], 1.0);
        for w in f.cdf().windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn test_mean_birth_energy_near_two_mev() {
        let f = Fissioner::new(&FissionerConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        let n = 100_000;
        let mean = (0..n).map(|_| f.emit_energy(&mut rng)).sum::<f64>() / n as f64;
        assert!(mean > 1.9e6 && mean < 2.1e6, "mean birth energy {mean}");
    }

    #[test]
    fn test_draw_bounds() {
        let f = Fissioner::new(&FissionerConfig {
            num_bins: 1000,
            ..Default::default()
        })
        .unwrap();
        assert!(f.energy_for_draw_mev(0.0) >= 0.0);
        assert!((f.energy_for_draw_mev(1.0) - 20.0).abs() < 1.0);
    }

    #[test]
    fn test_invalid_config() {
        let cfg = FissionerConfig {
            num_bins: 1,
            ..Default::default()
        };
        assert!(Fissioner::new(&cfg).is_err());
    }
}
