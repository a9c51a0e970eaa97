// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Property-Based Tests (proptest) for pinspec-core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for pinspec-core using proptest.
//!
//! Covers: Carlvik parameters, pin-cell volumes.

use pinspec_core::geometry::CarlvikParameters;
use pinspec_core::region::{Region, RegionRole};
use pinspec_nuclear::material::Material;
use proptest::prelude::*;
use std::f64::consts::PI;

// ── Carlvik Approximation ────────────────────────────────────────────

proptest! {
    /// α1, α2 are the roots of the Carlvik quadratic and β matches its
    /// first-moment condition.
    #[test]
    fn carlvik_roots_satisfy_quadratic(dancoff in 0.01f64..0.99, radius in 0.1f64..2.0) {
        let p = CarlvikParameters::new(dancoff, radius).unwrap();
        let a = (1.0 - dancoff) / dancoff;
        prop_assert!(p.alpha1 > 0.0 && p.alpha2 > p.alpha1);
        prop_assert!((p.alpha1 + p.alpha2 - (5.0 * a + 6.0) / (a + 1.0)).abs() < 1e-9);
        prop_assert!((p.alpha1 * p.alpha2 - 6.0 * a / (a + 1.0)).abs() < 1e-9);
        let lhs = p.alpha1 + p.beta * (p.alpha2 - p.alpha1);
        prop_assert!((lhs - (4.0 * a + 6.0) / (a + 1.0)).abs() < 1e-9);
        prop_assert!((p.sigma_e * 2.0 * radius - 1.0).abs() < 1e-12);
    }

    /// P_ff stays a probability for any fuel cross section.
    #[test]
    fn fuel_fuel_probability_bounded(dancoff in 0.01f64..0.99, log_sigma in -5.0f64..5.0) {
        let p = CarlvikParameters::new(dancoff, 0.5).unwrap();
        let pff = p.fuel_fuel_probability(10f64.powf(log_sigma));
        prop_assert!((0.0..=1.0).contains(&pff), "P_ff = {}", pff);
    }
}

// ── Pin-Cell Volumes ─────────────────────────────────────────────────

proptest! {
    /// Fuel and moderator tile the square cell exactly.
    #[test]
    fn pin_cell_volumes_tile_the_cell(radius in 0.1f64..0.6, gap in 0.01f64..1.0) {
        let pitch = 2.0 * radius + gap;
        let mut fuel = Region::new("fuel", RegionRole::EquivalenceFuel, Material::new("f"));
        let mut moderator =
            Region::new("moderator", RegionRole::EquivalenceModerator, Material::new("m"));
        for r in [&mut fuel, &mut moderator] {
            r.set_pitch(pitch).unwrap();
            r.set_fuel_radius(radius).unwrap();
        }
        prop_assert!((fuel.volume() - PI * radius * radius).abs() < 1e-12);
        prop_assert!((fuel.volume() + moderator.volume() - pitch * pitch).abs() < 1e-9);
    }
}
