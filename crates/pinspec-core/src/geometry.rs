// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Geometry & Monte Carlo Kernel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Spatial models and the batched slowing-down kernel.
//!
//! Histories are born from the fission spectrum and collide until
//! absorbed. In the infinite homogeneous model every collision happens in
//! one region. In the two-region equivalence model fuel and moderator are
//! coupled through Carlvik's two-term rational approximation of the
//! first-flight collision probabilities.
//!
//! Batches run in parallel on a rayon pool. Each batch owns its random
//! stream and its score rows, so results do not depend on thread count.

use crate::region::{Region, RegionRole};
use ndarray::Array1;
use pinspec_math::grid::UniformGrid;
use pinspec_nuclear::fissioner::Fissioner;
use pinspec_nuclear::neutron::Neutron;
use pinspec_tally::bank::{BatchScores, DomainVolumes, TallyBank};
use pinspec_types::config::{SimulationConfig, SpatialModel};
use pinspec_types::error::{require_non_negative, PinSpecError, PinSpecResult};
use pinspec_types::handle::{MaterialId, RegionId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Carlvik two-term rational approximation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarlvikParameters {
    pub dancoff: f64,
    /// Escape cross section 1/(2r), 1/cm.
    pub sigma_e: f64,
    pub alpha1: f64,
    pub alpha2: f64,
    pub beta: f64,
}

impl CarlvikParameters {
    pub fn new(dancoff: f64, fuel_radius: f64) -> PinSpecResult<Self> {
        if !(dancoff > 0.0 && dancoff <= 1.0) {
            return Err(PinSpecError::ConfigError(format!(
                "Dancoff factor must lie in (0, 1], got {dancoff}"
            )));
        }
        if !(fuel_radius.is_finite() && fuel_radius > 0.0) {
            return Err(PinSpecError::ConfigError(format!(
                "fuel radius must be finite and > 0, got {fuel_radius}"
            )));
        }
        let a = (1.0 - dancoff) / dancoff;
        let root = (a * a + 36.0 * a + 36.0).sqrt();
        let alpha1 = ((5.0 * a + 6.0) - root) / (2.0 * (a + 1.0));
        let alpha2 = ((5.0 * a + 6.0) + root) / (2.0 * (a + 1.0));
        let beta = ((4.0 * a + 6.0) / (a + 1.0) - alpha1) / (alpha2 - alpha1);
        Ok(CarlvikParameters {
            dancoff,
            sigma_e: 1.0 / (2.0 * fuel_radius),
            alpha1,
            alpha2,
            beta,
        })
    }

    fn is_usable(&self) -> bool {
        self.sigma_e > 0.0 && self.alpha1 > 0.0 && self.alpha2 > 0.0 && self.beta > 0.0
    }

    /// P_ff for a fuel macroscopic total cross section `sigma_fuel`.
    pub fn fuel_fuel_probability(&self, sigma_fuel: f64) -> f64 {
        self.beta * sigma_fuel / (self.alpha1 * self.sigma_e + sigma_fuel)
            + (1.0 - self.beta) * sigma_fuel / (self.alpha2 * self.sigma_e + sigma_fuel)
    }
}

/// Σf·Vf / (Σm·Vm) tabulated on the cross-section grid.
#[derive(Debug, Clone)]
struct ModFuelRatios {
    grid: UniformGrid,
    ratios: Array1<f64>,
}

/// Outcome of one simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub batches: usize,
    pub histories: u64,
    pub wall_time: Duration,
}

impl RunSummary {
    pub fn histories_per_second(&self) -> f64 {
        let secs = self.wall_time.as_secs_f64();
        if secs > 0.0 {
            self.histories as f64 / secs
        } else {
            0.0
        }
    }
}

/// Seed of the random stream owned by `batch`.
pub fn batch_seed(seed: u64, batch: usize) -> u64 {
    seed ^ (batch as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[derive(Debug, Clone)]
pub struct Geometry {
    config: SimulationConfig,
    fissioner: Fissioner,
    infinite: Option<Region>,
    fuel: Option<Region>,
    moderator: Option<Region>,
    heterogeneous: Vec<Region>,
    carlvik: Option<CarlvikParameters>,
    mod_fuel_ratios: Option<ModFuelRatios>,
}

impl Geometry {
    pub fn new(config: SimulationConfig) -> PinSpecResult<Self> {
        config.validate()?;
        let fissioner = Fissioner::new(&config.fissioner)?;
        Ok(Geometry {
            config,
            fissioner,
            infinite: None,
            fuel: None,
            moderator: None,
            heterogeneous: Vec::new(),
            carlvik: None,
            mod_fuel_ratios: None,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn fissioner(&self) -> &Fissioner {
        &self.fissioner
    }

    pub fn spatial_model(&self) -> SpatialModel {
        self.config.spatial_model
    }

    /// Switch the spatial model; refused when a region of an incompatible
    /// role is already present.
    pub fn set_spatial_model(&mut self, model: SpatialModel) -> PinSpecResult<()> {
        let conflict = match model {
            SpatialModel::InfiniteHomogeneous => self
                .fuel
                .as_ref()
                .or(self.moderator.as_ref())
                .or(self.heterogeneous.first()),
            SpatialModel::HomogeneousEquivalence => {
                self.infinite.as_ref().or(self.heterogeneous.first())
            }
            SpatialModel::Heterogeneous => self.infinite.as_ref(),
        };
        if let Some(region) = conflict {
            return Err(PinSpecError::ConfigError(format!(
                "cannot set the spatial model to {model:?} since the geometry contains {} region {}",
                region.role(),
                region.name()
            )));
        }
        self.config.spatial_model = model;
        Ok(())
    }

    pub fn set_neutrons_per_batch(&mut self, neutrons: usize) -> PinSpecResult<()> {
        if neutrons == 0 {
            return Err(PinSpecError::ConfigError(
                "neutrons_per_batch must be > 0".to_string(),
            ));
        }
        self.config.neutrons_per_batch = neutrons;
        Ok(())
    }

    pub fn set_num_batches(&mut self, batches: usize) -> PinSpecResult<()> {
        if batches == 0 {
            return Err(PinSpecError::ConfigError("num_batches must be > 0".to_string()));
        }
        self.config.num_batches = batches;
        Ok(())
    }

    /// 0 defers to the rayon default.
    pub fn set_num_threads(&mut self, threads: usize) {
        self.config.num_threads = threads;
    }

    pub fn buckling_squared(&self) -> f64 {
        self.config.buckling_squared
    }

    pub fn set_buckling_squared(&mut self, b2: f64) -> PinSpecResult<()> {
        self.config.buckling_squared = require_non_negative(b2, "buckling_squared")?;
        Ok(())
    }

    // ── Regions ──────────────────────────────────────────────────────

    /// Insert `region`, enforcing one region per structural role and the
    /// roles allowed by the spatial model.
    pub fn add_region(&mut self, region: Region) -> PinSpecResult<RegionId> {
        let model = self.config.spatial_model;
        let role_fits = match region.role() {
            RegionRole::Infinite => model == SpatialModel::InfiniteHomogeneous,
            RegionRole::EquivalenceFuel | RegionRole::EquivalenceModerator => {
                model != SpatialModel::InfiniteHomogeneous
            }
            RegionRole::Heterogeneous => model == SpatialModel::Heterogeneous,
        };
        if !role_fits {
            return Err(PinSpecError::ConfigError(format!(
                "unable to add {} region {} to a {model:?} geometry",
                region.role(),
                region.name()
            )));
        }
        let blocker = match region.role() {
            RegionRole::Infinite => self
                .infinite
                .as_ref()
                .or(self.fuel.as_ref())
                .or(self.moderator.as_ref()),
            RegionRole::EquivalenceFuel => self.infinite.as_ref().or(self.fuel.as_ref()),
            RegionRole::EquivalenceModerator => {
                self.infinite.as_ref().or(self.moderator.as_ref())
            }
            RegionRole::Heterogeneous => self.infinite.as_ref(),
        };
        if let Some(existing) = blocker {
            return Err(PinSpecError::ConfigError(format!(
                "unable to add {} region {} since the geometry already contains {} region {}",
                region.role(),
                region.name(),
                existing.role(),
                existing.name()
            )));
        }

        let id = region.id();
        tracing::debug!(region = region.name(), role = %region.role(), volume = region.volume(), "added region");
        match region.role() {
            RegionRole::Infinite => self.infinite = Some(region),
            RegionRole::EquivalenceFuel => self.fuel = Some(region),
            RegionRole::EquivalenceModerator => self.moderator = Some(region),
            RegionRole::Heterogeneous => self.heterogeneous.push(region),
        }
        self.sync_material_volumes();
        Ok(id)
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.infinite
            .iter()
            .chain(self.fuel.iter())
            .chain(self.moderator.iter())
            .chain(self.heterogeneous.iter())
    }

    fn regions_mut(&mut self) -> impl Iterator<Item = &mut Region> {
        self.infinite
            .iter_mut()
            .chain(self.fuel.iter_mut())
            .chain(self.moderator.iter_mut())
            .chain(self.heterogeneous.iter_mut())
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions().find(|r| r.id() == id)
    }

    /// Mutable access for late changes to pin dimensions or volume.
    /// Material volumes and equivalence tables are refreshed before a run.
    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.mod_fuel_ratios = None;
        self.regions_mut().find(|r| r.id() == id)
    }

    pub fn infinite_region(&self) -> Option<&Region> {
        self.infinite.as_ref()
    }

    pub fn fuel_region(&self) -> Option<&Region> {
        self.fuel.as_ref()
    }

    pub fn moderator_region(&self) -> Option<&Region> {
        self.moderator.as_ref()
    }

    pub fn num_regions(&self) -> usize {
        self.regions().count()
    }

    /// Total volume of every region (cm³).
    pub fn volume(&self) -> f64 {
        self.regions().map(Region::volume).sum()
    }

    /// Each material's volume becomes the summed volume of the regions it
    /// fills.
    fn sync_material_volumes(&mut self) {
        let mut totals: HashMap<MaterialId, f64> = HashMap::new();
        for r in self.regions() {
            *totals.entry(r.material().id()).or_insert(0.0) += r.volume();
        }
        for r in self.regions_mut() {
            let v = totals.get(&r.material().id()).copied().unwrap_or(0.0);
            r.material_mut().set_volume(v);
        }
    }

    pub fn domain_volumes(&self) -> DomainVolumes {
        let mut volumes = DomainVolumes {
            geometry: self.volume(),
            ..Default::default()
        };
        for r in self.regions() {
            volumes.regions.insert(r.id(), r.volume());
            *volumes.materials.entry(r.material().id()).or_insert(0.0) += r.volume();
        }
        volumes
    }

    // ── Equivalence coupling ─────────────────────────────────────────

    /// Derive the Carlvik parameters from the Dancoff factor and the fuel
    /// region's radius.
    pub fn set_dancoff_factor(&mut self, dancoff: f64) -> PinSpecResult<()> {
        let fuel = self.fuel.as_ref().ok_or_else(|| {
            PinSpecError::ConfigError(
                "set the FUEL region before the Dancoff factor".to_string(),
            )
        })?;
        let radius = fuel.fuel_radius().ok_or_else(|| {
            PinSpecError::ConfigError(format!(
                "region {} does not know the fuel radius",
                fuel.name()
            ))
        })?;
        let params = CarlvikParameters::new(dancoff, radius)?;
        tracing::debug!(
            dancoff,
            sigma_e = params.sigma_e,
            alpha1 = params.alpha1,
            alpha2 = params.alpha2,
            beta = params.beta,
            "Carlvik parameters"
        );
        self.carlvik = Some(params);
        Ok(())
    }

    pub fn carlvik(&self) -> Option<&CarlvikParameters> {
        self.carlvik.as_ref()
    }

    fn equivalence_pair(&self) -> PinSpecResult<(&Region, &Region, &CarlvikParameters)> {
        let (Some(fuel), Some(moderator)) = (self.fuel.as_ref(), self.moderator.as_ref()) else {
            return Err(PinSpecError::ConfigError(
                "an equivalence geometry needs both a FUEL and a MODERATOR region".to_string(),
            ));
        };
        let params = self.carlvik.as_ref().filter(|p| p.is_usable()).ok_or_else(|| {
            PinSpecError::ConfigError(
                "beta, sigma_e, alpha1 and alpha2 must be positive; set a Dancoff factor".to_string(),
            )
        })?;
        for r in [fuel, moderator] {
            if r.fuel_radius().is_none() {
                return Err(PinSpecError::ConfigError(format!(
                    "region {} does not know the fuel radius",
                    r.name()
                )));
            }
            if r.pitch().is_none() {
                return Err(PinSpecError::ConfigError(format!(
                    "region {} does not know the pin pitch",
                    r.name()
                )));
            }
        }
        Ok((fuel, moderator, params))
    }

    /// Tabulate Σf(E)·Vf / (Σm(E)·Vm) on the cross-section grid.
    pub fn initialize_mod_fuel_ratios(&mut self) -> PinSpecResult<()> {
        let (fuel, moderator, _) = self.equivalence_pair()?;
        let grid = UniformGrid::from_config(&self.config.cross_section_grid)?;
        let (vf, vm) = (fuel.volume(), moderator.volume());
        let ratios = grid
            .points()
            .iter()
            .map(|&e| {
                let sigma_m = moderator.material().total_macro_xs(e)?;
                if sigma_m <= 0.0 {
                    return Err(PinSpecError::DataError(format!(
                        "moderator {} has no total cross section at {e} eV",
                        moderator.material().name()
                    )));
                }
                Ok(fuel.material().total_macro_xs(e)? * vf / (sigma_m * vm))
            })
            .collect::<PinSpecResult<Vec<f64>>>()?;
        self.mod_fuel_ratios = Some(ModFuelRatios {
            grid,
            ratios: Array1::from(ratios),
        });
        Ok(())
    }

    /// Probability that a neutron leaving a fuel collision at `energy`
    /// collides next in the fuel.
    pub fn fuel_fuel_collision_prob(&self, energy: f64) -> PinSpecResult<f64> {
        let (fuel, _, params) = self.equivalence_pair()?;
        let sigma_fuel = fuel.material().total_macro_xs(energy)?;
        Ok(params.fuel_fuel_probability(sigma_fuel))
    }

    /// Probability that a neutron leaving a moderator collision at `energy`
    /// collides next in the fuel.
    pub fn moderator_fuel_collision_prob(&self, energy: f64) -> PinSpecResult<f64> {
        let p_ff = self.fuel_fuel_collision_prob(energy)?;
        self.moderator_fuel_from(p_ff, energy)
    }

    fn moderator_fuel_from(&self, p_ff: f64, energy: f64) -> PinSpecResult<f64> {
        let table = self.mod_fuel_ratios.as_ref().ok_or_else(|| {
            PinSpecError::ConfigError(
                "moderator-to-fuel ratios have not been initialized".to_string(),
            )
        })?;
        let ratios = table.ratios.as_slice().unwrap_or(&[]);
        Ok((1.0 - p_ff) * table.grid.interpolate(ratios, energy))
    }

    // ── Kernel ───────────────────────────────────────────────────────

    fn prepare_run(&mut self) -> PinSpecResult<()> {
        if self.num_regions() == 0 {
            return Err(PinSpecError::ConfigError(
                "unable to run since the geometry does not contain any regions".to_string(),
            ));
        }
        let b2 = self.config.buckling_squared;
        for r in self.regions_mut() {
            r.material_mut().set_buckling_squared(b2)?;
        }
        self.sync_material_volumes();
        match self.config.spatial_model {
            SpatialModel::InfiniteHomogeneous => {
                if self.infinite.is_none() {
                    return Err(PinSpecError::ConfigError(
                        "an infinite homogeneous geometry needs an INFINITE region".to_string(),
                    ));
                }
            }
            SpatialModel::HomogeneousEquivalence => self.initialize_mod_fuel_ratios()?,
            SpatialModel::Heterogeneous => {
                return Err(PinSpecError::ConfigError(
                    "heterogeneous ray-traced geometries cannot be simulated yet".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// Run batches in blocks of `num_batches` until every precision
    /// trigger in `bank` is met.
    pub fn run(&mut self, bank: &mut TallyBank) -> PinSpecResult<RunSummary> {
        self.prepare_run()?;
        let this: &Geometry = self;
        let npb = this.config.neutrons_per_batch;
        let block = this.config.num_batches;
        let volumes = this.domain_volumes();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(this.config.num_threads)
            .build()
            .map_err(|e| PinSpecError::ConfigError(format!("thread pool: {e}")))?;

        tracing::info!(
            neutrons_per_batch = npb,
            batches = block,
            threads = pool.current_num_threads(),
            model = ?this.config.spatial_model,
            "Beginning PINSPEC Monte Carlo simulation"
        );
        let timer = Instant::now();
        bank.initialize_batch_tallies(block)?;
        let (mut start, mut end) = (0, block);
        loop {
            let shared: &TallyBank = bank;
            let scores = pool.install(|| {
                (start..end)
                    .into_par_iter()
                    .map(|batch| this.run_batch(batch, shared))
                    .collect::<PinSpecResult<Vec<BatchScores>>>()
            })?;
            for s in scores {
                bank.merge_batch_scores(s)?;
            }
            bank.compute_scaled_batch_statistics(npb, &volumes)?;
            if !bank.is_precision_triggered() {
                break;
            }
            bank.increment_num_batches(block)?;
            start = end;
            end += block;
        }

        let summary = RunSummary {
            batches: end,
            histories: (end * npb) as u64,
            wall_time: timer.elapsed(),
        };
        tracing::info!(
            batches = summary.batches,
            histories = summary.histories,
            "PINSPEC simulated {:.0} neutrons / sec in {:.3} sec",
            summary.histories_per_second(),
            summary.wall_time.as_secs_f64()
        );
        Ok(summary)
    }

    /// Write the batch statistics of every tally in `bank` under the
    /// configured output directory.
    pub fn output_batch_statistics(&self, bank: &TallyBank) -> PinSpecResult<Vec<PathBuf>> {
        bank.output_batch_statistics(Path::new(&self.config.output_directory))
    }

    /// All histories of one batch, scored into batch-local rows.
    fn run_batch(&self, batch: usize, bank: &TallyBank) -> PinSpecResult<BatchScores> {
        tracing::debug!(batch, "running batch");
        let mut rng = StdRng::seed_from_u64(batch_seed(self.config.seed, batch));
        let mut scores = bank.new_batch_scores(batch);
        let mut neutron = Neutron::new(batch);
        match self.config.spatial_model {
            SpatialModel::InfiniteHomogeneous => {
                let region = self.infinite.as_ref().ok_or_else(|| {
                    PinSpecError::ConfigError("missing INFINITE region".to_string())
                })?;
                for _ in 0..self.config.neutrons_per_batch {
                    neutron.rebirth(self.fissioner.emit_energy(&mut rng), region.id());
                    while neutron.alive {
                        region.collide_neutron(&mut neutron, &mut rng)?;
                        bank.score(&mut scores, &neutron, region.material())?;
                    }
                }
            }
            SpatialModel::HomogeneousEquivalence => {
                let (fuel, moderator, params) = self.equivalence_pair()?;
                for _ in 0..self.config.neutrons_per_batch {
                    neutron.rebirth(self.fissioner.emit_energy(&mut rng), fuel.id());
                    let mut in_fuel = true;
                    while neutron.alive {
                        let sigma_fuel = fuel.material().total_macro_xs(neutron.energy)?;
                        let p_ff = params.fuel_fuel_probability(sigma_fuel);
                        let u: f64 = rng.gen();
                        in_fuel = if in_fuel {
                            u <= p_ff
                        } else {
                            u < self.moderator_fuel_from(p_ff, neutron.energy)?
                        };
                        let region = if in_fuel { fuel } else { moderator };
                        region.collide_neutron(&mut neutron, &mut rng)?;
                        bank.score(&mut scores, &neutron, region.material())?;
                    }
                }
            }
            SpatialModel::Heterogeneous => {
                return Err(PinSpecError::ConfigError(
                    "heterogeneous ray-traced geometries cannot be simulated yet".to_string(),
                ))
            }
        }
        Ok(scores)
    }
}
