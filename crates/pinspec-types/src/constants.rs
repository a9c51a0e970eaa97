// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Boltzmann constant (eV/K)
pub const K_BOLTZMANN_EV: f64 = 8.617332e-5;

/// Avogadro's number scaled for number densities in atoms/(barn·cm).
pub const AVOGADRO_BARN_CM: f64 = 0.6023;

/// Atoms/cc to atoms/(barn·cm).
pub const BARN_CM_PER_CC: f64 = 1e-24;

/// Neutron rest mass (eV/c²)
pub const NEUTRON_MASS_EV: f64 = 939_565_378.0;

/// Speed of light (m/s)
pub const LIGHT_SPEED: f64 = 299_792_458.0;

/// Centimetres to metres.
pub const CM_TO_M: f64 = 1e-2;

/// MeV to eV.
pub const EV_PER_MEV: f64 = 1e6;

/// Largest mass number accepted in isotope names.
pub const MAX_MASS_NUMBER: u32 = 300;

/// Drift tolerated on the last bin of a cumulative-fraction draw.
pub const SAMPLING_TOLERANCE: f64 = 1e-5;

/// Energy offset placed either side of a multigroup edge (eV).
pub const MULTIGROUP_EDGE_OFFSET: f64 = 1e-5;
