// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{require_non_negative, require_positive, PinSpecError, PinSpecResult};
use serde::{Deserialize, Serialize};

/// Spacing of a uniform energy grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSpacing {
    Equal,
    Logarithmic,
}

/// Spatial abstraction driven by the simulation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialModel {
    InfiniteHomogeneous,
    HomogeneousEquivalence,
    Heterogeneous,
}

/// Top-level run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_neutrons_per_batch")]
    pub neutrons_per_batch: usize,
    /// Batches launched per block; the run extends one block at a time.
    #[serde(default = "default_num_batches")]
    pub num_batches: usize,
    /// Worker threads. 0 defers to the rayon default.
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub buckling_squared: f64,
    #[serde(default = "default_spatial_model")]
    pub spatial_model: SpatialModel,
    #[serde(default = "default_output_directory")]
    pub output_directory: String,
    #[serde(default)]
    pub cross_section_grid: CrossSectionGridConfig,
    #[serde(default)]
    pub thermal_scattering: ThermalScatteringConfig,
    #[serde(default)]
    pub fissioner: FissionerConfig,
}

/// Grid every isotope is resampled onto after loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossSectionGridConfig {
    #[serde(default = "default_grid_start")]
    pub start_energy_ev: f64,
    #[serde(default = "default_grid_end")]
    pub end_energy_ev: f64,
    #[serde(default = "default_grid_points")]
    pub num_points: usize,
    #[serde(default = "default_grid_spacing")]
    pub spacing: GridSpacing,
}

/// Free-gas thermal scattering table parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalScatteringConfig {
    #[serde(default = "default_thermal_enabled")]
    pub enabled: bool,
    /// Below this energy the tabulated kernel replaces the asymptotic law (eV).
    #[serde(default = "default_thermal_cutoff")]
    pub cutoff_ev: f64,
    #[serde(default = "default_temperature")]
    pub temperature_k: f64,
    /// Lowest incident-energy pivot (eV).
    #[serde(default = "default_pivot_start")]
    pub pivot_start_ev: f64,
    /// Highest incident-energy pivot (eV).
    #[serde(default = "default_pivot_end")]
    pub pivot_end_ev: f64,
    #[serde(default = "default_num_pivots")]
    pub num_pivots: usize,
    #[serde(default = "default_num_ratio_bins")]
    pub num_ratio_bins: usize,
}

/// Watt fission-spectrum CDF parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FissionerConfig {
    #[serde(default = "default_fissioner_bins")]
    pub num_bins: usize,
    #[serde(default = "default_fissioner_emax")]
    pub e_max_mev: f64,
}

fn default_neutrons_per_batch() -> usize {
    10_000
}
fn default_num_batches() -> usize {
    10
}
fn default_num_threads() -> usize {
    1
}
fn default_seed() -> u64 {
    1
}
fn default_spatial_model() -> SpatialModel {
    SpatialModel::InfiniteHomogeneous
}
fn default_output_directory() -> String {
    "pinspec-output".to_string()
}
fn default_grid_start() -> f64 {
    1e-5
}
fn default_grid_end() -> f64 {
    2e7
}
fn default_grid_points() -> usize {
    100_000
}
fn default_grid_spacing() -> GridSpacing {
    GridSpacing::Logarithmic
}
fn default_thermal_enabled() -> bool {
    true
}
fn default_thermal_cutoff() -> f64 {
    4.0
}
fn default_temperature() -> f64 {
    300.0
}
fn default_pivot_start() -> f64 {
    1e-6
}
fn default_pivot_end() -> f64 {
    15.0
}
fn default_num_pivots() -> usize {
    15
}
fn default_num_ratio_bins() -> usize {
    1000
}
fn default_fissioner_bins() -> usize {
    100_000
}
fn default_fissioner_emax() -> f64 {
    20.0
}

impl Default for CrossSectionGridConfig {
    fn default() -> Self {
        CrossSectionGridConfig {
            start_energy_ev: default_grid_start(),
            end_energy_ev: default_grid_end(),
            num_points: default_grid_points(),
            spacing: default_grid_spacing(),
        }
    }
}

impl Default for ThermalScatteringConfig {
    fn default() -> Self {
        ThermalScatteringConfig {
            enabled: default_thermal_enabled(),
            cutoff_ev: default_thermal_cutoff(),
            temperature_k: default_temperature(),
            pivot_start_ev: default_pivot_start(),
            pivot_end_ev: default_pivot_end(),
            num_pivots: default_num_pivots(),
            num_ratio_bins: default_num_ratio_bins(),
        }
    }
}

impl Default for FissionerConfig {
    fn default() -> Self {
        FissionerConfig {
            num_bins: default_fissioner_bins(),
            e_max_mev: default_fissioner_emax(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            neutrons_per_batch: default_neutrons_per_batch(),
            num_batches: default_num_batches(),
            num_threads: default_num_threads(),
            seed: default_seed(),
            buckling_squared: 0.0,
            spatial_model: default_spatial_model(),
            output_directory: default_output_directory(),
            cross_section_grid: CrossSectionGridConfig::default(),
            thermal_scattering: ThermalScatteringConfig::default(),
            fissioner: FissionerConfig::default(),
        }
    }
}

impl CrossSectionGridConfig {
    pub fn validate(&self) -> PinSpecResult<()> {
        require_non_negative(self.start_energy_ev, "cross_section_grid.start_energy_ev")?;
        if !self.end_energy_ev.is_finite() || self.end_energy_ev <= self.start_energy_ev {
            return Err(PinSpecError::ConfigError(format!(
                "cross_section_grid.end_energy_ev must exceed start: {} <= {}",
                self.end_energy_ev, self.start_energy_ev
            )));
        }
        if self.spacing == GridSpacing::Logarithmic && self.start_energy_ev <= 0.0 {
            return Err(PinSpecError::ConfigError(
                "logarithmic cross_section_grid requires start_energy_ev > 0".to_string(),
            ));
        }
        if self.num_points < 2 {
            return Err(PinSpecError::ConfigError(format!(
                "cross_section_grid.num_points must be >= 2, got {}",
                self.num_points
            )));
        }
        Ok(())
    }
}

impl ThermalScatteringConfig {
    pub fn validate(&self) -> PinSpecResult<()> {
        require_positive(self.cutoff_ev, "thermal_scattering.cutoff_ev")?;
        require_positive(self.temperature_k, "thermal_scattering.temperature_k")?;
        require_positive(self.pivot_start_ev, "thermal_scattering.pivot_start_ev")?;
        if self.pivot_end_ev <= self.pivot_start_ev {
            return Err(PinSpecError::ConfigError(format!(
                "thermal_scattering pivots must increase: {} <= {}",
                self.pivot_end_ev, self.pivot_start_ev
            )));
        }
        if self.num_pivots < 2 || self.num_ratio_bins < 2 {
            return Err(PinSpecError::ConfigError(format!(
                "thermal_scattering needs >= 2 pivots and bins, got {} and {}",
                self.num_pivots, self.num_ratio_bins
            )));
        }
        Ok(())
    }
}

impl FissionerConfig {
    pub fn validate(&self) -> PinSpecResult<()> {
        require_positive(self.e_max_mev, "fissioner.e_max_mev")?;
        if self.num_bins < 2 {
            return Err(PinSpecError::ConfigError(format!(
                "fissioner.num_bins must be >= 2, got {}",
                self.num_bins
            )));
        }
        Ok(())
    }
}

impl SimulationConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &str) -> PinSpecResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> PinSpecResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> PinSpecResult<()> {
        if self.neutrons_per_batch == 0 {
            return Err(PinSpecError::ConfigError(
                "neutrons_per_batch must be > 0".to_string(),
            ));
        }
        if self.num_batches == 0 {
            return Err(PinSpecError::ConfigError(
                "num_batches must be > 0".to_string(),
            ));
        }
        require_non_negative(self.buckling_squared, "buckling_squared")?;
        self.cross_section_grid.validate()?;
        self.thermal_scattering.validate()?;
        self.fissioner.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let cfg = SimulationConfig::default();
        assert_eq!(cfg.neutrons_per_batch, 10_000);
        assert_eq!(cfg.num_batches, 10);
        assert_eq!(cfg.num_threads, 1);
        assert_eq!(cfg.buckling_squared, 0.0);
        assert_eq!(cfg.cross_section_grid.num_points, 100_000);
        assert_eq!(cfg.cross_section_grid.spacing, GridSpacing::Logarithmic);
        assert!((cfg.thermal_scattering.cutoff_ev - 4.0).abs() < 1e-12);
        assert_eq!(cfg.thermal_scattering.num_pivots, 15);
        assert_eq!(cfg.thermal_scattering.num_ratio_bins, 1000);
        assert_eq!(cfg.fissioner.num_bins, 100_000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let cfg: SimulationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.neutrons_per_batch, 10_000);
        assert_eq!(cfg.spatial_model, SpatialModel::InfiniteHomogeneous);
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{
            "neutrons_per_batch": 500,
            "spatial_model": "homogeneous_equivalence",
            "cross_section_grid": { "num_points": 2000, "spacing": "equal" }
        }"#;
        let cfg: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.neutrons_per_batch, 500);
        assert_eq!(cfg.spatial_model, SpatialModel::HomogeneousEquivalence);
        assert_eq!(cfg.cross_section_grid.num_points, 2000);
        assert_eq!(cfg.cross_section_grid.spacing, GridSpacing::Equal);
        assert!((cfg.cross_section_grid.end_energy_ev - 2e7).abs() < 1e-3);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut cfg = SimulationConfig::default();
        cfg.seed = 77;
        cfg.buckling_squared = 1e-3;
        let json = cfg.to_json().unwrap();
        let back: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seed, 77);
        assert!((back.buckling_squared - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn test_from_file_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "pinspec_config_{}.json",
            std::process::id()
        ));
        let cfg = SimulationConfig::default();
        std::fs::write(&path, cfg.to_json().unwrap()).unwrap();
        let loaded = SimulationConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.num_batches, cfg.num_batches);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = SimulationConfig::default();
        cfg.neutrons_per_batch = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = SimulationConfig::default();
        cfg.cross_section_grid.start_energy_ev = 0.0;
        assert!(cfg.validate().is_err(), "log grid must start above zero");

        let mut cfg = SimulationConfig::default();
        cfg.thermal_scattering.pivot_end_ev = 1e-7;
        assert!(cfg.validate().is_err());

        let mut cfg = SimulationConfig::default();
        cfg.buckling_squared = -1.0;
        assert!(cfg.validate().is_err());
    }
}
