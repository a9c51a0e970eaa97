// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Energy Grids
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Uniform energy grids with O(1) index lookup.
//!
//! A grid is uniform in its *key*: the energy itself for equal spacing,
//! log10 of the energy for logarithmic spacing.

use ndarray::Array1;
use pinspec_types::config::{CrossSectionGridConfig, GridSpacing};
use pinspec_types::error::{PinSpecError, PinSpecResult};

/// `n` points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Array1<f64> {
    let mut points = Array1::linspace(start, end, n);
    if n > 1 {
        points[n - 1] = end;
    }
    points
}

/// `n` log-spaced points from `start` to `end` inclusive (both > 0).
pub fn logspace(start: f64, end: f64, n: usize) -> Array1<f64> {
    let mut points = Array1::logspace(10.0, start.log10(), end.log10(), n);
    // pin the endpoints so callers see the exact bounds they asked for
    if n > 0 {
        points[0] = start;
        points[n - 1] = end;
    }
    points
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformGrid {
    start: f64,
    end: f64,
    num_points: usize,
    spacing: GridSpacing,
    key_start: f64,
    delta: f64,
}

impl UniformGrid {
    pub fn new(start: f64, end: f64, num_points: usize, spacing: GridSpacing) -> PinSpecResult<Self> {
        if num_points < 2 {
            return Err(PinSpecError::ConfigError(format!(
                "uniform grid needs at least 2 points, got {num_points}"
            )));
        }
        if !start.is_finite() || !end.is_finite() || end <= start || start < 0.0 {
            return Err(PinSpecError::ConfigError(format!(
                "uniform grid bounds must satisfy 0 <= start < end, got [{start}, {end}]"
            )));
        }
        if spacing == GridSpacing::Logarithmic && start <= 0.0 {
            return Err(PinSpecError::ConfigError(format!(
                "logarithmic grid must start above zero, got {start}"
            )));
        }
        let key_start = key(spacing, start);
        let key_end = key(spacing, end);
        let delta = (key_end - key_start) / (num_points - 1) as f64;
        Ok(UniformGrid {
            start,
            end,
            num_points,
            spacing,
            key_start,
            delta,
        })
    }

    pub fn from_config(cfg: &CrossSectionGridConfig) -> PinSpecResult<Self> {
        Self::new(cfg.start_energy_ev, cfg.end_energy_ev, cfg.num_points, cfg.spacing)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    pub fn spacing(&self) -> GridSpacing {
        self.spacing
    }

    /// Step between neighbouring points, in key units.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn key(&self, energy: f64) -> f64 {
        key(self.spacing, energy)
    }

    pub fn points(&self) -> Array1<f64> {
        match self.spacing {
            GridSpacing::Equal => linspace(self.start, self.end, self.num_points),
            GridSpacing::Logarithmic => logspace(self.start, self.end, self.num_points),
        }
    }

    /// `clamp(floor((key(e) - key(start)) / delta), 0, n - 1)`.
    pub fn index(&self, energy: f64) -> usize {
        let raw = ((self.key(energy) - self.key_start) / self.delta).floor();
        // NaN and -inf saturate to 0 through the cast
        (raw as isize).clamp(0, self.num_points as isize - 1) as usize
    }

    /// Lower point of the interval containing `energy` and the fractional
    /// position inside it, both clamped to the grid.
    pub fn interval(&self, energy: f64) -> (usize, f64) {
        let lower = self.index(energy).min(self.num_points - 2);
        let key_lower = self.key_start + lower as f64 * self.delta;
        let t = ((self.key(energy) - key_lower) / self.delta).clamp(0.0, 1.0);
        (lower, if t.is_nan() { 0.0 } else { t })
    }

    /// Linear interpolation (in key) of values tabulated on this grid.
    pub fn interpolate(&self, values: &[f64], energy: f64) -> f64 {
        if energy >= self.end {
            return values[self.num_points - 1];
        }
        let (i, t) = self.interval(energy);
        values[i] + t * (values[i + 1] - values[i])
    }
}

fn key(spacing: GridSpacing, energy: f64) -> f64 {
    match spacing {
        GridSpacing::Equal => energy,
        GridSpacing::Logarithmic => energy.log10(),
    }
}
