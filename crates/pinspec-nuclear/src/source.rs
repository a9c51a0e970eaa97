// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Cross-Section Sources
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Pointwise cross-section curves and the lookup the isotopes load from.

use crate::isotope::Reaction;
use pinspec_math::search::linear_interp;
use pinspec_types::constants::MULTIGROUP_EDGE_OFFSET;
use pinspec_types::error::{PinSpecError, PinSpecResult};
use std::collections::HashMap;

/// Parallel (energy, cross-section) arrays as supplied by a data source.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSectionCurve {
    energies: Vec<f64>,
    values: Vec<f64>,
}

impl CrossSectionCurve {
    /// Validates equal lengths, non-negative non-decreasing energies and
    /// non-negative cross sections.
    pub fn new(energies: Vec<f64>, values: Vec<f64>) -> PinSpecResult<Self> {
        if energies.len() != values.len() {
            return Err(PinSpecError::DataError(format!(
                "cross-section curve has {} energies but {} values",
                energies.len(),
                values.len()
            )));
        }
        if energies.is_empty() {
            return Err(PinSpecError::DataError(
                "cross-section curve is empty".to_string(),
            ));
        }
        for (i, &e) in energies.iter().enumerate() {
            if !e.is_finite() || e < 0.0 {
                return Err(PinSpecError::DataError(format!(
                    "cross-section energy[{i}] = {e} must be finite and >= 0"
                )));
            }
            if i > 0 && e < energies[i - 1] {
                return Err(PinSpecError::DataError(format!(
                    "cross-section energies decrease at index {i}: {} > {e}",
                    energies[i - 1]
                )));
            }
        }
        if let Some((i, v)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(PinSpecError::DataError(format!(
                "cross-section value[{i}] = {v} must be finite and >= 0"
            )));
        }
        Ok(CrossSectionCurve { energies, values })
    }

    /// Step function over `edges.len() - 1` groups.
    ///
    /// Interior edges are split into two points offset by 1e-5 eV so the
    /// curve jumps between neighbouring group values.
    pub fn multigroup(edges: &[f64], group_values: &[f64]) -> PinSpecResult<Self> {
        let groups = group_values.len();
        if groups == 0 || edges.len() != groups + 1 {
            return Err(PinSpecError::DataError(format!(
                "multigroup data needs N+1 edges for N groups, got {} edges and {groups} groups",
                edges.len()
            )));
        }
        let mut energies = Vec::with_capacity(2 * groups);
        let mut values = Vec::with_capacity(2 * groups);
        for g in 0..groups {
            let lo = if g == 0 {
                edges[0]
            } else {
                edges[g] + MULTIGROUP_EDGE_OFFSET
            };
            let hi = if g + 1 == groups {
                edges[groups]
            } else {
                edges[g + 1] - MULTIGROUP_EDGE_OFFSET
            };
            energies.push(lo);
            energies.push(hi);
            values.push(group_values[g]);
            values.push(group_values[g]);
        }
        Self::new(energies, values)
    }

    /// Flat curve spanning `[start, end]`.
    pub fn constant(start: f64, end: f64, value: f64) -> PinSpecResult<Self> {
        Self::new(vec![start, end], vec![value, value])
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Linear interpolation, clamped to the end values.
    pub fn value_at(&self, energy: f64) -> f64 {
        linear_interp(&self.energies, &self.values, energy)
    }

    pub fn has_positive_values(&self) -> bool {
        self.values.iter().any(|v| *v > 0.0)
    }
}

/// Lookup from (isotope name, reaction) to pointwise data.
pub trait CrossSectionSource {
    fn cross_section(&self, isotope: &str, reaction: Reaction) -> Option<CrossSectionCurve>;
}

/// In-memory cross-section library.
#[derive(Debug, Clone, Default)]
pub struct TabulatedCrossSections {
    curves: HashMap<(String, Reaction), CrossSectionCurve>,
}

impl TabulatedCrossSections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        isotope: &str,
        reaction: Reaction,
        energies: Vec<f64>,
        values: Vec<f64>,
    ) -> PinSpecResult<()> {
        if !reaction.is_loadable() {
            return Err(PinSpecError::DataError(format!(
                "{reaction:?} is derived and cannot be supplied directly"
            )));
        }
        let curve = CrossSectionCurve::new(energies, values)?;
        self.curves.insert((isotope.to_string(), reaction), curve);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

impl CrossSectionSource for TabulatedCrossSections {
    fn cross_section(&self, isotope: &str, reaction: Reaction) -> Option<CrossSectionCurve> {
        self.curves.get(&(isotope.to_string(), reaction)).cloned()
    }
}
