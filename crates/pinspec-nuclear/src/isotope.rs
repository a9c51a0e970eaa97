// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Isotope
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Microscopic cross sections and collision physics of a single nuclide.
//!
//! Source curves are resampled once onto a uniform (linear or log) grid so
//! every lookup in the transport loop is an O(1) index computation.

use crate::neutron::Neutron;
use crate::source::{CrossSectionCurve, CrossSectionSource};
use crate::thermal::{KernelParams, ThermalScatteringTable};
use ndarray::Array1;
use pinspec_math::grid::UniformGrid;
use pinspec_types::config::{CrossSectionGridConfig, GridSpacing, ThermalScatteringConfig};
use pinspec_types::constants::{MAX_MASS_NUMBER, SAMPLING_TOLERANCE};
use pinspec_types::error::{require_positive, PinSpecError, PinSpecResult};
use pinspec_types::handle::IsotopeId;
use rand::Rng;

/// Reaction channels with a cross-section curve.
///
/// `Absorption`, `Total` and `Transport` are derived from the loaded ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reaction {
    Elastic,
    Capture,
    Fission,
    Absorption,
    Total,
    Transport,
}

impl Reaction {
    /// Whether data for this channel can be supplied directly.
    pub fn is_loadable(self) -> bool {
        matches!(self, Reaction::Elastic | Reaction::Capture | Reaction::Fission)
    }
}

/// Outcome of a sampled collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionType {
    Elastic,
    Capture,
    Fission,
}

impl CollisionType {
    pub fn is_absorbing(self) -> bool {
        !matches!(self, CollisionType::Elastic)
    }
}

#[derive(Debug, Clone)]
pub struct Isotope {
    id: IsotopeId,
    name: String,
    mass_number: u32,
    alpha: f64,
    eta: f64,
    rho: f64,
    mu_avg: f64,
    temperature_k: f64,
    fissionable: bool,
    elastic_data: Option<CrossSectionCurve>,
    capture_data: Option<CrossSectionCurve>,
    fission_data: Option<CrossSectionCurve>,
    grid: UniformGrid,
    elastic: Array1<f64>,
    capture: Array1<f64>,
    fission: Array1<f64>,
    absorption: Array1<f64>,
    total: Array1<f64>,
    thermal_cfg: ThermalScatteringConfig,
    thermal: Option<ThermalScatteringTable>,
    use_thermal: bool,
}

/// Parse the mass number from names of the form `"U-238"`.
pub fn parse_mass_number(name: &str) -> PinSpecResult<u32> {
    let digits = name
        .rsplit_once('-')
        .map(|(_, a)| a)
        .ok_or_else(|| {
            PinSpecError::ConfigError(format!(
                "isotope name {name:?} must have the form <symbol>-<mass number>"
            ))
        })?;
    let a: u32 = digits.trim().parse().map_err(|_| {
        PinSpecError::ConfigError(format!(
            "isotope name {name:?} has non-numeric mass number {digits:?}"
        ))
    })?;
    if a == 0 || a > MAX_MASS_NUMBER {
        return Err(PinSpecError::ConfigError(format!(
            "mass number {a} of {name:?} must lie in 1..={MAX_MASS_NUMBER}"
        )));
    }
    Ok(a)
}

impl Isotope {
    /// Isotope on the default log grid with thermal scattering at 300 K.
    pub fn new(name: &str) -> PinSpecResult<Self> {
        Self::with_config(
            name,
            &CrossSectionGridConfig::default(),
            &ThermalScatteringConfig::default(),
        )
    }

    pub fn with_config(
        name: &str,
        grid_cfg: &CrossSectionGridConfig,
        thermal_cfg: &ThermalScatteringConfig,
    ) -> PinSpecResult<Self> {
        let mass_number = parse_mass_number(name)?;
        let a = mass_number as f64;
        let grid = UniformGrid::from_config(grid_cfg)?;
        thermal_cfg.validate()?;

        let mut iso = Isotope {
            id: IsotopeId::fresh(),
            name: name.to_string(),
            mass_number,
            alpha: ((a - 1.0) / (a + 1.0)).powi(2),
            eta: (a + 1.0) / (2.0 * a.sqrt()),
            rho: (a - 1.0) / (2.0 * a.sqrt()),
            mu_avg: 2.0 / (3.0 * a),
            temperature_k: thermal_cfg.temperature_k,
            fissionable: false,
            elastic_data: None,
            capture_data: None,
            fission_data: None,
            grid,
            elastic: Array1::zeros(0),
            capture: Array1::zeros(0),
            fission: Array1::zeros(0),
            absorption: Array1::zeros(0),
            total: Array1::zeros(0),
            thermal_cfg: thermal_cfg.clone(),
            thermal: None,
            use_thermal: thermal_cfg.enabled,
        };
        if iso.use_thermal {
            iso.rebuild_thermal_table()?;
        }
        Ok(iso)
    }

    /// Copy with a fresh handle, for use in a second material.
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = IsotopeId::fresh();
        copy
    }

    pub fn id(&self) -> IsotopeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mass_number(&self) -> u32 {
        self.mass_number
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn eta(&self) -> f64 {
        self.eta
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Average scattering cosine in the lab frame, 2/(3A).
    pub fn mu_avg(&self) -> f64 {
        self.mu_avg
    }

    pub fn temperature(&self) -> f64 {
        self.temperature_k
    }

    pub fn is_fissionable(&self) -> bool {
        self.fissionable
    }

    pub fn grid(&self) -> &UniformGrid {
        &self.grid
    }

    /// Elastic and capture data are present.
    pub fn is_loaded(&self) -> bool {
        self.elastic_data.is_some() && self.capture_data.is_some()
    }

    pub fn uses_thermal_scattering(&self) -> bool {
        self.use_thermal
    }

    pub fn thermal_table(&self) -> Option<&ThermalScatteringTable> {
        self.thermal.as_ref()
    }

    pub fn thermal_cutoff(&self) -> f64 {
        self.thermal_cfg.cutoff_ev
    }

    // ── Loading ──────────────────────────────────────────────────────

    pub fn set_elastic_xs(&mut self, energies: Vec<f64>, xs: Vec<f64>) -> PinSpecResult<()> {
        self.elastic_data = Some(CrossSectionCurve::new(energies, xs)?);
        self.rebuild_tables();
        Ok(())
    }

    pub fn set_capture_xs(&mut self, energies: Vec<f64>, xs: Vec<f64>) -> PinSpecResult<()> {
        self.capture_data = Some(CrossSectionCurve::new(energies, xs)?);
        self.rebuild_tables();
        Ok(())
    }

    /// Nonzero fission data marks the isotope fissionable.
    pub fn set_fission_xs(&mut self, energies: Vec<f64>, xs: Vec<f64>) -> PinSpecResult<()> {
        self.store_fission(CrossSectionCurve::new(energies, xs)?);
        self.rebuild_tables();
        Ok(())
    }

    pub fn set_multigroup_elastic_xs(&mut self, edges: &[f64], xs: &[f64]) -> PinSpecResult<()> {
        self.elastic_data = Some(CrossSectionCurve::multigroup(edges, xs)?);
        self.rebuild_tables();
        Ok(())
    }

    pub fn set_multigroup_capture_xs(&mut self, edges: &[f64], xs: &[f64]) -> PinSpecResult<()> {
        self.capture_data = Some(CrossSectionCurve::multigroup(edges, xs)?);
        self.rebuild_tables();
        Ok(())
    }

    pub fn set_multigroup_fission_xs(&mut self, edges: &[f64], xs: &[f64]) -> PinSpecResult<()> {
        self.store_fission(CrossSectionCurve::multigroup(edges, xs)?);
        self.rebuild_tables();
        Ok(())
    }

    /// Load elastic, capture and (optionally) fission data by name.
    pub fn load_from(&mut self, source: &dyn CrossSectionSource) -> PinSpecResult<()> {
        let elastic = source
            .cross_section(&self.name, Reaction::Elastic)
            .ok_or_else(|| missing(&self.name, Reaction::Elastic))?;
        let capture = source
            .cross_section(&self.name, Reaction::Capture)
            .ok_or_else(|| missing(&self.name, Reaction::Capture))?;
        self.elastic_data = Some(elastic);
        self.capture_data = Some(capture);
        if let Some(fission) = source.cross_section(&self.name, Reaction::Fission) {
            self.store_fission(fission);
        }
        self.rebuild_tables();
        tracing::debug!(
            isotope = %self.name,
            fissionable = self.fissionable,
            "loaded cross sections"
        );
        Ok(())
    }

    fn store_fission(&mut self, curve: CrossSectionCurve) {
        self.fissionable = curve.has_positive_values();
        self.fission_data = Some(curve);
    }

    /// Resample every loaded curve onto `num_points` grid points.
    pub fn rescale_cross_sections(
        &mut self,
        start: f64,
        end: f64,
        num_points: usize,
        spacing: GridSpacing,
    ) -> PinSpecResult<()> {
        self.grid = UniformGrid::new(start, end, num_points, spacing)?;
        self.rebuild_tables();
        Ok(())
    }

    fn rebuild_tables(&mut self) {
        let points = self.grid.points();
        let resample = |curve: &Option<CrossSectionCurve>| match curve {
            Some(c) => points.mapv(|e| c.value_at(e)),
            None => Array1::zeros(points.len()),
        };
        self.elastic = resample(&self.elastic_data);
        self.capture = resample(&self.capture_data);
        self.fission = resample(&self.fission_data);
        self.absorption = if self.fissionable {
            &self.capture + &self.fission
        } else {
            self.capture.clone()
        };
        self.total = &self.absorption + &self.elastic;
    }

    // ── Lookups ──────────────────────────────────────────────────────

    fn ensure_loaded(&self) -> PinSpecResult<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(PinSpecError::DataError(format!(
                "cross sections for {} were looked up before elastic and capture data were loaded",
                self.name
            )))
        }
    }

    /// Microscopic cross section (barn) at `energy` (eV).
    pub fn xs(&self, reaction: Reaction, energy: f64) -> PinSpecResult<f64> {
        self.ensure_loaded()?;
        let value = match reaction {
            Reaction::Elastic => self.grid.interpolate(self.elastic.as_slice().unwrap_or(&[]), energy),
            Reaction::Capture => self.grid.interpolate(self.capture.as_slice().unwrap_or(&[]), energy),
            Reaction::Fission => self.grid.interpolate(self.fission.as_slice().unwrap_or(&[]), energy),
            Reaction::Absorption => {
                self.grid
                    .interpolate(self.absorption.as_slice().unwrap_or(&[]), energy)
            }
            Reaction::Total => self.grid.interpolate(self.total.as_slice().unwrap_or(&[]), energy),
            Reaction::Transport => {
                self.xs(Reaction::Total, energy)? - self.mu_avg * self.xs(Reaction::Elastic, energy)?
            }
        };
        Ok(value)
    }

    /// Microscopic cross section at grid point `index`.
    pub fn xs_at_index(&self, reaction: Reaction, index: usize) -> PinSpecResult<f64> {
        self.ensure_loaded()?;
        if index >= self.grid.len() {
            return Err(PinSpecError::IndexOutOfRange {
                what: format!("{} cross-section grid", self.name),
                index,
                len: self.grid.len(),
            });
        }
        Ok(match reaction {
            Reaction::Elastic => self.elastic[index],
            Reaction::Capture => self.capture[index],
            Reaction::Fission => self.fission[index],
            Reaction::Absorption => self.absorption[index],
            Reaction::Total => self.total[index],
            Reaction::Transport => self.total[index] - self.mu_avg * self.elastic[index],
        })
    }

    pub fn elastic_xs(&self, energy: f64) -> PinSpecResult<f64> {
        self.xs(Reaction::Elastic, energy)
    }

    pub fn capture_xs(&self, energy: f64) -> PinSpecResult<f64> {
        self.xs(Reaction::Capture, energy)
    }

    pub fn fission_xs(&self, energy: f64) -> PinSpecResult<f64> {
        self.xs(Reaction::Fission, energy)
    }

    pub fn absorption_xs(&self, energy: f64) -> PinSpecResult<f64> {
        self.xs(Reaction::Absorption, energy)
    }

    pub fn total_xs(&self, energy: f64) -> PinSpecResult<f64> {
        self.xs(Reaction::Total, energy)
    }

    pub fn transport_xs(&self, energy: f64) -> PinSpecResult<f64> {
        self.xs(Reaction::Transport, energy)
    }

    // ── Collision physics ────────────────────────────────────────────

    pub fn sample_collision_type<R: Rng + ?Sized>(
        &self,
        energy: f64,
        rng: &mut R,
    ) -> PinSpecResult<CollisionType> {
        let u: f64 = rng.gen();
        self.collision_type_for_draw(energy, u)
    }

    /// Reaction selected by draw `u`, walking elastic, capture, fission.
    pub fn collision_type_for_draw(&self, energy: f64, u: f64) -> PinSpecResult<CollisionType> {
        let total = self.total_xs(energy)?;
        if total <= 0.0 {
            return Err(PinSpecError::SamplingFailure {
                context: format!("{} collision type at {energy} eV (zero total xs)", self.name),
                draw: u,
                cumulative: 0.0,
            });
        }
        let mut channels = [
            (CollisionType::Elastic, self.elastic_xs(energy)?),
            (CollisionType::Capture, self.capture_xs(energy)?),
            (CollisionType::Fission, 0.0),
        ];
        if self.fissionable {
            channels[2].1 = self.fission_xs(energy)?;
        }

        let mut cumulative = 0.0;
        let mut last = None;
        for (kind, xs) in channels.iter().filter(|(_, xs)| *xs > 0.0) {
            cumulative += xs / total;
            last = Some(*kind);
            if u <= cumulative {
                return Ok(*kind);
            }
        }
        match last {
            Some(kind) if u - cumulative <= SAMPLING_TOLERANCE => Ok(kind),
            _ => Err(PinSpecError::SamplingFailure {
                context: format!("{} collision type at {energy} eV", self.name),
                draw: u,
                cumulative,
            }),
        }
    }

    /// Outgoing energy of an elastic scatter for draw `u`.
    pub fn scatter_energy(&self, energy: f64, u: f64) -> f64 {
        match &self.thermal {
            Some(table) if self.use_thermal && energy <= self.thermal_cfg.cutoff_ev => {
                table.sample_with_draw(energy, u)
            }
            _ => energy * (self.alpha + (1.0 - self.alpha) * u),
        }
    }

    /// Sample the outgoing energy from the free-gas table.
    pub fn thermal_scattering_energy<R: Rng + ?Sized>(
        &self,
        energy: f64,
        rng: &mut R,
    ) -> PinSpecResult<f64> {
        let table = self.thermal.as_ref().ok_or_else(|| {
            PinSpecError::DataError(format!(
                "thermal scattering table for {} has not been built",
                self.name
            ))
        })?;
        Ok(table.sample(energy, rng))
    }

    /// Sample a reaction, kill the neutron on absorption and update its
    /// energy. The energy is updated for absorbing reactions too.
    pub fn collide_neutron<R: Rng + ?Sized>(
        &self,
        neutron: &mut Neutron,
        rng: &mut R,
    ) -> PinSpecResult<CollisionType> {
        neutron.old_energy = neutron.energy;
        let kind = self.sample_collision_type(neutron.energy, rng)?;
        if kind.is_absorbing() {
            neutron.alive = false;
        }
        let u: f64 = rng.gen();
        neutron.energy = self.scatter_energy(neutron.energy, u);
        neutron.isotope = Some(self.id);
        neutron.collision = Some(kind);
        Ok(kind)
    }

    // ── Thermal controls ─────────────────────────────────────────────

    pub fn set_temperature(&mut self, temperature_k: f64) -> PinSpecResult<()> {
        self.temperature_k = require_positive(temperature_k, "temperature_k")?;
        if self.use_thermal {
            self.rebuild_thermal_table()?;
        }
        Ok(())
    }

    pub fn set_thermal_scattering(&mut self, enabled: bool) -> PinSpecResult<()> {
        self.use_thermal = enabled;
        if enabled && self.thermal.is_none() {
            self.rebuild_thermal_table()?;
        }
        Ok(())
    }

    fn rebuild_thermal_table(&mut self) -> PinSpecResult<()> {
        let params = KernelParams {
            alpha: self.alpha,
            eta: self.eta,
            rho: self.rho,
        };
        self.thermal = Some(ThermalScatteringTable::build(
            params,
            self.temperature_k,
            &self.thermal_cfg,
        )?);
        Ok(())
    }
}

fn missing(name: &str, reaction: Reaction) -> PinSpecError {
    PinSpecError::DataError(format!("no {reaction:?} cross section available for {name}"))
}
