// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Region
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! A material-filled volume playing one structural role in the pin cell.

use pinspec_nuclear::isotope::CollisionType;
use pinspec_nuclear::material::Material;
use pinspec_nuclear::neutron::Neutron;
use pinspec_types::error::{require_positive, PinSpecError, PinSpecResult};
use pinspec_types::handle::RegionId;
use rand::Rng;
use std::f64::consts::PI;
use std::fmt;

/// Structural role of a region inside the geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionRole {
    Infinite,
    EquivalenceFuel,
    EquivalenceModerator,
    Heterogeneous,
}

impl RegionRole {
    pub fn is_equivalence(self) -> bool {
        matches!(self, RegionRole::EquivalenceFuel | RegionRole::EquivalenceModerator)
    }
}

impl fmt::Display for RegionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RegionRole::Infinite => "INFINITE",
            RegionRole::EquivalenceFuel => "FUEL",
            RegionRole::EquivalenceModerator => "MODERATOR",
            RegionRole::Heterogeneous => "HETEROGENEOUS",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct Region {
    id: RegionId,
    name: String,
    role: RegionRole,
    material: Material,
    /// cm³ (cm² per unit height for pin-cell roles)
    volume: f64,
    fuel_radius: Option<f64>,
    pitch: Option<f64>,
}

impl Region {
    pub fn new(name: &str, role: RegionRole, material: Material) -> Self {
        Region {
            id: RegionId::fresh(),
            name: name.to_string(),
            role,
            material,
            volume: 1.0,
            fuel_radius: None,
            pitch: None,
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> RegionRole {
        self.role
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f64) -> PinSpecResult<()> {
        self.volume = require_positive(volume, &format!("volume of region {}", self.name))?;
        Ok(())
    }

    pub fn fuel_radius(&self) -> Option<f64> {
        self.fuel_radius
    }

    pub fn pitch(&self) -> Option<f64> {
        self.pitch
    }

    /// Fuel pin radius (cm). Only equivalence regions carry pin dimensions.
    pub fn set_fuel_radius(&mut self, radius: f64) -> PinSpecResult<()> {
        self.ensure_equivalence("fuel radius")?;
        self.fuel_radius = Some(require_positive(
            radius,
            &format!("fuel radius of region {}", self.name),
        )?);
        self.update_volume()
    }

    /// Square lattice pitch (cm).
    pub fn set_pitch(&mut self, pitch: f64) -> PinSpecResult<()> {
        self.ensure_equivalence("pitch")?;
        self.pitch = Some(require_positive(pitch, &format!("pitch of region {}", self.name))?);
        self.update_volume()
    }

    fn ensure_equivalence(&self, what: &str) -> PinSpecResult<()> {
        if !self.role.is_equivalence() {
            return Err(PinSpecError::ConfigError(format!(
                "cannot set the {what} of {} region {}",
                self.role, self.name
            )));
        }
        Ok(())
    }

    /// πr² for fuel, p² − πr² for moderator, once both dimensions are known.
    fn update_volume(&mut self) -> PinSpecResult<()> {
        let (Some(r), Some(p)) = (self.fuel_radius, self.pitch) else {
            return Ok(());
        };
        let pin = PI * r * r;
        let volume = match self.role {
            RegionRole::EquivalenceFuel => pin,
            _ => p * p - pin,
        };
        if volume <= 0.0 {
            return Err(PinSpecError::ConfigError(format!(
                "region {}: pitch {p} cm is too small for fuel radius {r} cm",
                self.name
            )));
        }
        self.volume = volume;
        Ok(())
    }

    /// Collide `neutron` inside this region.
    pub fn collide_neutron<R: Rng + ?Sized>(
        &self,
        neutron: &mut Neutron,
        rng: &mut R,
    ) -> PinSpecResult<CollisionType> {
        neutron.region = Some(self.id);
        self.material.collide_neutron(neutron, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinspec_nuclear::isotope::Isotope;
    use pinspec_nuclear::material::DensityUnit;
    use pinspec_types::config::{CrossSectionGridConfig, ThermalScatteringConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn absorber() -> Material {
        let grid = CrossSectionGridConfig {
            num_points: 100,
            ..Default::default()
        };
        let thermal = ThermalScatteringConfig {
            enabled: false,
            ..Default::default()
        };
        let mut iso = Isotope::with_config("B-10", &grid, &thermal).unwrap();
        iso.set_elastic_xs(vec![1e-5, 2e7], vec![0.0, 0.0]).unwrap();
        iso.set_capture_xs(vec![1e-5, 2e7], vec![5.0, 5.0]).unwrap();
        let mut m = Material::new("boron");
        m.set_density(0.2, DensityUnit::AtomPerBarnCm).unwrap();
        m.add_isotope(iso, 1.0).unwrap();
        m
    }

    #[test]
    fn test_default_volume() {
        let r = Region::new("pool", RegionRole::Infinite, absorber());
        assert_eq!(r.volume(), 1.0);
        assert!(r.fuel_radius().is_none());
    }

    #[test]
    fn test_pin_cell_volumes() {
        let mut fuel = Region::new("fuel", RegionRole::EquivalenceFuel, absorber());
        let mut moderator = Region::new("water", RegionRole::EquivalenceModerator, absorber());
        for r in [&mut fuel, &mut moderator] {
            r.set_fuel_radius(0.4096).unwrap();
            assert_eq!(r.volume(), 1.0, "volume waits for the pitch");
            r.set_pitch(1.26).unwrap();
        }
        let pin = PI * 0.4096 * 0.4096;
        assert!((fuel.volume() - pin).abs() < 1e-12);
        assert!((moderator.volume() - (1.26 * 1.26 - pin)).abs() < 1e-12);
    }

    #[test]
    fn test_pitch_smaller_than_pin_rejected() {
        let mut r = Region::new("water", RegionRole::EquivalenceModerator, absorber());
        r.set_fuel_radius(1.0).unwrap();
        assert!(matches!(r.set_pitch(1.5), Err(PinSpecError::ConfigError(_))));
    }

    #[test]
    fn test_infinite_region_has_no_pin_dimensions() {
        let mut r = Region::new("pool", RegionRole::Infinite, absorber());
        assert!(r.set_fuel_radius(0.4).is_err());
        assert!(r.set_pitch(1.2).is_err());
    }

    #[test]
    fn test_collision_records_region() {
        let r = Region::new("pool", RegionRole::Infinite, absorber());
        let mut rng = StdRng::seed_from_u64(3);
        let mut n = Neutron::new(0);
        n.rebirth(1e6, RegionId::fresh());
        let kind = r.collide_neutron(&mut n, &mut rng).unwrap();
        assert_eq!(kind, CollisionType::Capture);
        assert_eq!(n.region, Some(r.id()));
        assert_eq!(n.material, Some(r.material().id()));
        assert!(!n.alive);
    }
}
