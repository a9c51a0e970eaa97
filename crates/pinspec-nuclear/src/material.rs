// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Material
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Isotope mixtures: number densities, macroscopic cross sections and
//! collision dispatch to the nuclide that was hit.

use crate::isotope::{CollisionType, Isotope, Reaction};
use crate::neutron::Neutron;
use pinspec_types::constants::{AVOGADRO_BARN_CM, BARN_CM_PER_CC, SAMPLING_TOLERANCE};
use pinspec_types::error::{require_non_negative, require_positive, PinSpecError, PinSpecResult};
use pinspec_types::handle::{IsotopeId, MaterialId};
use rand::Rng;
use rand_distr::{Distribution, Exp};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DensityUnit {
    /// Mass density, g/cm³.
    GramPerCc,
    /// Number density, atoms/cm³.
    AtomPerCc,
    /// Number density, atoms/(barn·cm).
    AtomPerBarnCm,
}

impl FromStr for DensityUnit {
    type Err = PinSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "g/cc" => Ok(DensityUnit::GramPerCc),
            "at/cc" => Ok(DensityUnit::AtomPerCc),
            "at/barncm" => Ok(DensityUnit::AtomPerBarnCm),
            other => Err(PinSpecError::ConfigError(format!(
                "unsupported density unit {other:?}; expected g/cc, at/cc or at/barncm"
            ))),
        }
    }
}

/// One nuclide of a mixture.
#[derive(Debug, Clone)]
pub struct MaterialComponent {
    /// Atoms of this isotope per formula unit.
    pub ratio: f64,
    /// atoms/(barn·cm)
    pub number_density: f64,
    pub isotope: Isotope,
}

#[derive(Debug, Clone)]
pub struct Material {
    id: MaterialId,
    name: String,
    density: f64,
    density_unit: DensityUnit,
    mass_density: f64,
    number_density: f64,
    atomic_mass: f64,
    components: Vec<MaterialComponent>,
    buckling_squared: f64,
    volume: f64,
}

impl Material {
    pub fn new(name: &str) -> Self {
        Material {
            id: MaterialId::fresh(),
            name: name.to_string(),
            density: 0.0,
            density_unit: DensityUnit::GramPerCc,
            mass_density: 0.0,
            number_density: 0.0,
            atomic_mass: 0.0,
            components: Vec::new(),
            buckling_squared: 0.0,
            volume: 0.0,
        }
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_density(&mut self, value: f64, unit: DensityUnit) -> PinSpecResult<()> {
        self.density = require_positive(value, &format!("density of {}", self.name))?;
        self.density_unit = unit;
        self.recompute_densities();
        Ok(())
    }

    /// Mass density, g/cm³.
    pub fn mass_density(&self) -> f64 {
        self.mass_density
    }

    /// Number density, atoms/(barn·cm).
    pub fn number_density(&self) -> f64 {
        self.number_density
    }

    pub fn density_unit(&self) -> DensityUnit {
        self.density_unit
    }

    /// Σ ratio·A over every component.
    pub fn atomic_mass(&self) -> f64 {
        self.atomic_mass
    }

    /// Add `isotope` with `atomic_ratio` atoms per formula unit, replacing any
    /// isotope of the same name in place.
    pub fn add_isotope(&mut self, isotope: Isotope, atomic_ratio: f64) -> PinSpecResult<()> {
        require_positive(atomic_ratio, &format!("atomic ratio of {}", isotope.name()))?;
        if self.density <= 0.0 {
            return Err(PinSpecError::ConfigError(format!(
                "cannot add {} to {}: density must be set to a positive value first",
                isotope.name(),
                self.name
            )));
        }
        let component = MaterialComponent {
            ratio: atomic_ratio,
            number_density: 0.0,
            isotope,
        };
        match self
            .components
            .iter()
            .position(|c| c.isotope.name() == component.isotope.name())
        {
            Some(i) => self.components[i] = component,
            None => self.components.push(component),
        }
        self.recompute_densities();
        tracing::debug!(
            material = %self.name,
            isotopes = self.components.len(),
            number_density = self.number_density,
            "added isotope"
        );
        Ok(())
    }

    fn recompute_densities(&mut self) {
        self.atomic_mass = self
            .components
            .iter()
            .map(|c| c.ratio * c.isotope.mass_number() as f64)
            .sum();
        if self.atomic_mass <= 0.0 {
            return;
        }
        match self.density_unit {
            DensityUnit::GramPerCc => {
                self.mass_density = self.density;
                self.number_density = self.density * AVOGADRO_BARN_CM / self.atomic_mass;
            }
            DensityUnit::AtomPerCc | DensityUnit::AtomPerBarnCm => {
                self.number_density = if self.density_unit == DensityUnit::AtomPerCc {
                    self.density * BARN_CM_PER_CC
                } else {
                    self.density
                };
                self.mass_density = self.number_density * self.atomic_mass / AVOGADRO_BARN_CM;
            }
        }
        let n = self.number_density;
        for c in &mut self.components {
            c.number_density = c.ratio * n;
        }
    }

    pub fn components(&self) -> &[MaterialComponent] {
        &self.components
    }

    pub fn isotopes(&self) -> impl Iterator<Item = &Isotope> {
        self.components.iter().map(|c| &c.isotope)
    }

    pub fn num_isotopes(&self) -> usize {
        self.components.len()
    }

    pub fn contains_isotope(&self, id: IsotopeId) -> bool {
        self.components.iter().any(|c| c.isotope.id() == id)
    }

    pub fn isotope(&self, id: IsotopeId) -> Option<&Isotope> {
        self.isotopes().find(|iso| iso.id() == id)
    }

    pub fn isotope_by_name(&self, name: &str) -> Option<&Isotope> {
        self.isotopes().find(|iso| iso.name() == name)
    }

    pub fn isotope_number_density(&self, id: IsotopeId) -> Option<f64> {
        self.components
            .iter()
            .find(|c| c.isotope.id() == id)
            .map(|c| c.number_density)
    }

    /// Macroscopic cross section Σ N_i σ_i (1/cm).
    pub fn macro_xs(&self, reaction: Reaction, energy: f64) -> PinSpecResult<f64> {
        let mut sum = 0.0;
        for c in &self.components {
            sum += c.number_density * c.isotope.xs(reaction, energy)?;
        }
        Ok(sum)
    }

    pub fn total_macro_xs(&self, energy: f64) -> PinSpecResult<f64> {
        self.macro_xs(Reaction::Total, energy)
    }

    pub fn transport_macro_xs(&self, energy: f64) -> PinSpecResult<f64> {
        self.macro_xs(Reaction::Transport, energy)
    }

    pub fn sample_isotope<R: Rng + ?Sized>(&self, energy: f64, rng: &mut R) -> PinSpecResult<&Isotope> {
        let u: f64 = rng.gen();
        let total = self.total_macro_xs(energy)?;
        self.isotope_for_draw(energy, total, u)
    }

    /// Isotope selected by draw `u` from each one's share of `total`, in
    /// insertion order.
    pub fn isotope_for_draw(&self, energy: f64, total: f64, u: f64) -> PinSpecResult<&Isotope> {
        if total <= 0.0 {
            return Err(PinSpecError::SamplingFailure {
                context: format!("isotope of {} at {energy} eV (zero total xs)", self.name),
                draw: u,
                cumulative: 0.0,
            });
        }
        let mut cumulative = 0.0;
        let mut last = None;
        for c in &self.components {
            let share = c.number_density * c.isotope.total_xs(energy)? / total;
            if share <= 0.0 {
                continue;
            }
            cumulative += share;
            last = Some(&c.isotope);
            if u <= cumulative {
                return Ok(&c.isotope);
            }
        }
        match last {
            Some(iso) if u - cumulative <= SAMPLING_TOLERANCE => Ok(iso),
            _ => Err(PinSpecError::SamplingFailure {
                context: format!("isotope of {} at {energy} eV", self.name),
                draw: u,
                cumulative,
            }),
        }
    }

    /// Record Σt and this material on the neutron, then collide it with a
    /// sampled isotope.
    pub fn collide_neutron<R: Rng + ?Sized>(
        &self,
        neutron: &mut Neutron,
        rng: &mut R,
    ) -> PinSpecResult<CollisionType> {
        let total = self.total_macro_xs(neutron.energy)?;
        neutron.total_xs = total;
        neutron.material = Some(self.id);
        let u: f64 = rng.gen();
        let isotope = self.isotope_for_draw(neutron.energy, total, u)?;
        isotope.collide_neutron(neutron, rng)
    }

    /// Exponential free path (cm) with rate Σt(E).
    pub fn sample_distance_traveled<R: Rng + ?Sized>(
        &self,
        energy: f64,
        rng: &mut R,
    ) -> PinSpecResult<f64> {
        let total = self.total_macro_xs(energy)?;
        let exp = Exp::new(total).map_err(|e| {
            PinSpecError::DataError(format!(
                "free path in {} at {energy} eV with total xs {total}: {e}",
                self.name
            ))
        })?;
        Ok(exp.sample(rng))
    }

    pub fn buckling_squared(&self) -> f64 {
        self.buckling_squared
    }

    pub fn set_buckling_squared(&mut self, b2: f64) -> PinSpecResult<()> {
        self.buckling_squared = require_non_negative(b2, "buckling_squared")?;
        Ok(())
    }

    /// Summed volume of every region filled with this material (cm³).
    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinspec_types::config::{CrossSectionGridConfig, ThermalScatteringConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flat(name: &str, elastic: f64, capture: f64) -> Isotope {
        let grid = CrossSectionGridConfig {
            num_points: 500,
            ..Default::default()
        };
        let thermal = ThermalScatteringConfig {
            enabled: false,
            ..Default::default()
        };
        let mut iso = Isotope::with_config(name, &grid, &thermal).unwrap();
        iso.set_elastic_xs(vec![1e-5, 2e7], vec![elastic; 2]).unwrap();
        iso.set_capture_xs(vec![1e-5, 2e7], vec![capture; 2]).unwrap();
        iso
    }

    fn water() -> Material {
        let mut m = Material::new("water");
        m.set_density(1.0, DensityUnit::GramPerCc).unwrap();
        m.add_isotope(flat("H-1", 20.0, 0.3), 2.0).unwrap();
        m.add_isotope(flat("O-16", 4.0, 0.0), 1.0).unwrap();
        m
    }

    #[test]
    fn test_density_unit_parsing() {
        assert_eq!("g/cc".parse::<DensityUnit>().unwrap(), DensityUnit::GramPerCc);
        assert_eq!("at/cc".parse::<DensityUnit>().unwrap(), DensityUnit::AtomPerCc);
        assert_eq!("at/barncm".parse::<DensityUnit>().unwrap(), DensityUnit::AtomPerBarnCm);
        assert!("kg/m3".parse::<DensityUnit>().is_err());
    }

    #[test]
    fn test_water_number_densities() {
        let m = water();
        assert!((m.atomic_mass() - 18.0).abs() < 1e-12);
        let n = 0.6023 / 18.0;
        assert!((m.number_density() - n).abs() < 1e-12);
        assert!((m.components()[0].number_density - 2.0 * n).abs() < 1e-12);
        assert!((m.components()[1].number_density - n).abs() < 1e-12);
    }

    #[test]
    fn test_atoms_per_cc_is_scaled_to_barn_cm() {
        let mut m = Material::new("gas");
        m.set_density(2.0e22, DensityUnit::AtomPerCc).unwrap();
        m.add_isotope(flat("He-4", 1.0, 0.0), 1.0).unwrap();
        assert!((m.number_density() - 0.02).abs() < 1e-12);
        assert!((m.mass_density() - 0.02 * 4.0 / 0.6023).abs() < 1e-12);
    }

    #[test]
    fn test_add_isotope_requires_density() {
        let mut m = Material::new("empty");
        assert!(m.add_isotope(flat("H-1", 1.0, 0.0), 1.0).is_err());
    }

    #[test]
    fn test_add_isotope_replaces_same_name() {
        let mut m = water();
        m.add_isotope(flat("H-1", 30.0, 0.3), 2.0).unwrap();
        assert_eq!(m.num_isotopes(), 2);
        assert_eq!(m.components()[0].isotope.name(), "H-1");
        assert!((m.components()[0].isotope.elastic_xs(1.0).unwrap() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_macro_xs_is_density_weighted_sum() {
        let m = water();
        let n = m.number_density();
        let expected = 2.0 * n * 20.3 + n * 4.0;
        assert!((m.total_macro_xs(1.0).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_isotope_selection_by_share() {
        let m = water();
        let total = m.total_macro_xs(1.0).unwrap();
        let h_share = 2.0 * 20.3 / (2.0 * 20.3 + 4.0);
        let h = m.components()[0].isotope.id();
        let o = m.components()[1].isotope.id();
        assert_eq!(m.isotope_for_draw(1.0, total, h_share - 1e-6).unwrap().id(), h);
        assert_eq!(m.isotope_for_draw(1.0, total, h_share + 1e-6).unwrap().id(), o);
        assert_eq!(m.isotope_for_draw(1.0, total, 1.0 + 1e-6).unwrap().id(), o);
        assert!(m.isotope_for_draw(1.0, total, 1.01).is_err());
    }

    #[test]
    fn test_collide_records_material_and_total_xs() {
        let m = water();
        let mut rng = StdRng::seed_from_u64(11);
        let mut n = Neutron::new(0);
        n.rebirth(1e5, pinspec_types::handle::RegionId::fresh());
        m.collide_neutron(&mut n, &mut rng).unwrap();
        assert_eq!(n.material, Some(m.id()));
        assert!((n.total_xs - m.total_macro_xs(1e5).unwrap()).abs() < 1e-12);
        assert!(m.contains_isotope(n.isotope.unwrap()));
    }

    #[test]
    fn test_distance_traveled_mean() {
        let m = water();
        let mut rng = StdRng::seed_from_u64(23);
        let draws = 200_000;
        let mean: f64 = (0..draws)
            .map(|_| m.sample_distance_traveled(1.0, &mut rng).unwrap())
            .sum::<f64>()
            / draws as f64;
        let mfp = 1.0 / m.total_macro_xs(1.0).unwrap();
        assert!((mean - mfp).abs() < 0.01 * mfp, "mean {mean} vs mfp {mfp}");
    }
}
