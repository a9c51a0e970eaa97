//! Transient state of one neutron history.

use crate::isotope::CollisionType;
use pinspec_types::handle::{IsotopeId, MaterialId, RegionId};

#[derive(Debug, Clone, PartialEq)]
pub struct Neutron {
    pub batch: usize,
    /// Current energy (eV).
    pub energy: f64,
    /// Energy entering the most recent collision (eV).
    pub old_energy: f64,
    pub alive: bool,
    /// Macroscopic total cross section of the material at the most recent
    /// collision, evaluated at `old_energy` (1/cm).
    pub total_xs: f64,
    pub region: Option<RegionId>,
    pub material: Option<MaterialId>,
    pub isotope: Option<IsotopeId>,
    pub collision: Option<CollisionType>,
    /// Position and direction, tracked only by ray-traced geometries.
    pub position: [f64; 3],
    pub direction: [f64; 3],
}

impl Neutron {
    pub fn new(batch: usize) -> Self {
        Neutron {
            batch,
            energy: 0.0,
            old_energy: 0.0,
            alive: false,
            total_xs: 0.0,
            region: None,
            material: None,
            isotope: None,
            collision: None,
            position: [0.0; 3],
            direction: [1.0, 0.0, 0.0],
        }
    }

    /// Start a fresh history at `energy` in `region`, reusing this value.
    pub fn rebirth(&mut self, energy: f64, region: RegionId) {
        self.energy = energy;
        self.old_energy = energy;
        self.alive = true;
        self.total_xs = 0.0;
        self.region = Some(region);
        self.material = None;
        self.isotope = None;
        self.collision = None;
        self.position = [0.0; 3];
        self.direction = [1.0, 0.0, 0.0];
    }
}
