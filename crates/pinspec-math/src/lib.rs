//! Numerical primitives for the pin-cell spectral simulator.

pub mod grid;
pub mod integrate;
pub mod search;
