// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Tally Bank
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Run-owned registry routing each collision to the tallies that want it.

use crate::tally::{Tally, TallyDomain, TallyType};
use ndarray::Array1;
use pinspec_nuclear::material::Material;
use pinspec_nuclear::neutron::Neutron;
use pinspec_types::error::{PinSpecError, PinSpecResult};
use pinspec_types::handle::{IsotopeId, MaterialId, RegionId, TallyId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where a tally is registered; collisions outside the scope skip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TallyScope {
    Geometry,
    Region(RegionId),
    Material(MaterialId),
    Isotope(IsotopeId),
}

/// Volumes used to normalize non-isotope tallies (cm³).
#[derive(Debug, Clone, Default)]
pub struct DomainVolumes {
    pub geometry: f64,
    pub regions: HashMap<RegionId, f64>,
    pub materials: HashMap<MaterialId, f64>,
}

/// Batch-local score rows, one per registered tally, filled by one worker.
#[derive(Debug, Clone)]
pub struct BatchScores {
    batch: usize,
    rows: Vec<Array1<f64>>,
}

impl BatchScores {
    pub fn batch(&self) -> usize {
        self.batch
    }
}

#[derive(Debug, Default)]
pub struct TallyBank {
    /// Registration order.
    tallies: Vec<Tally>,
    /// Registration scope of each tally, parallel to `tallies`.
    registered: Vec<TallyScope>,
    scopes: HashMap<TallyScope, Vec<usize>>,
}

impl TallyBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    pub fn tallies(&self) -> &[Tally] {
        &self.tallies
    }

    pub fn get(&self, id: TallyId) -> Option<&Tally> {
        self.tallies.iter().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: TallyId) -> Option<&mut Tally> {
        self.tallies.iter_mut().find(|t| t.id() == id)
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Register a tally in the scope of its own domain.
    pub fn register(&mut self, tally: Tally) -> PinSpecResult<TallyId> {
        let scope = match tally.domain() {
            TallyDomain::Geometry => TallyScope::Geometry,
            TallyDomain::Region(id) => TallyScope::Region(id),
            TallyDomain::Material(id) => TallyScope::Material(id),
            TallyDomain::Isotope(id) => {
                check_isotope_type(&tally)?;
                TallyScope::Isotope(id)
            }
            TallyDomain::Undefined => return Err(derived_rejected(&tally)),
        };
        Ok(self.insert(tally, scope))
    }

    /// Register a tally so it only scores collisions inside `region`,
    /// which is filled with `material`.
    pub fn register_for_region(
        &mut self,
        tally: Tally,
        region: RegionId,
        material: &Material,
    ) -> PinSpecResult<TallyId> {
        match tally.domain() {
            TallyDomain::Geometry => {
                return Err(rejected(&tally, "for a region since it is a GEOMETRY tally"))
            }
            TallyDomain::Region(id) if id != region => {
                return Err(rejected(
                    &tally,
                    &format!("in {region} since it is a REGION tally for {id}"),
                ))
            }
            TallyDomain::Material(id) if id != material.id() => {
                return Err(rejected(
                    &tally,
                    &format!(
                        "in {region} with material {} since it is a MATERIAL tally for {id}",
                        material.name()
                    ),
                ))
            }
            TallyDomain::Isotope(id) => {
                check_isotope_type(&tally)?;
                check_contains(&tally, id, material)?;
            }
            TallyDomain::Undefined => return Err(derived_rejected(&tally)),
            _ => {}
        }
        Ok(self.insert(tally, TallyScope::Region(region)))
    }

    /// Register a tally so it only scores collisions inside `material`.
    pub fn register_for_material(&mut self, tally: Tally, material: &Material) -> PinSpecResult<TallyId> {
        match tally.domain() {
            TallyDomain::Geometry => {
                return Err(rejected(&tally, "for a material since it is a GEOMETRY tally"))
            }
            TallyDomain::Region(_) => {
                return Err(rejected(&tally, "for a material since it is a REGION tally"))
            }
            TallyDomain::Material(id) if id != material.id() => {
                return Err(rejected(
                    &tally,
                    &format!(
                        "in material {} since it is a MATERIAL tally for {id}",
                        material.name()
                    ),
                ))
            }
            TallyDomain::Isotope(id) => {
                check_isotope_type(&tally)?;
                check_contains(&tally, id, material)?;
            }
            TallyDomain::Undefined => return Err(derived_rejected(&tally)),
            _ => {}
        }
        Ok(self.insert(tally, TallyScope::Material(material.id())))
    }

    /// Register a tally against one isotope.
    pub fn register_for_isotope(&mut self, tally: Tally, isotope: IsotopeId) -> PinSpecResult<TallyId> {
        match tally.domain() {
            TallyDomain::Isotope(id) if id == isotope => check_isotope_type(&tally)?,
            TallyDomain::Isotope(id) => {
                return Err(rejected(
                    &tally,
                    &format!("in {isotope} since it is an ISOTOPE tally for {id}"),
                ))
            }
            TallyDomain::Undefined => return Err(derived_rejected(&tally)),
            other => {
                return Err(rejected(
                    &tally,
                    &format!("for an isotope since it is a {other} tally"),
                ))
            }
        }
        Ok(self.insert(tally, TallyScope::Isotope(isotope)))
    }

    fn insert(&mut self, tally: Tally, scope: TallyScope) -> TallyId {
        let id = tally.id();
        tracing::debug!(tally = %tally.name(), ?scope, "Registered tally");
        self.scopes.entry(scope).or_default().push(self.tallies.len());
        self.tallies.push(tally);
        self.registered.push(scope);
        id
    }

    pub fn deregister(&mut self, id: TallyId) -> Option<Tally> {
        let index = self.tallies.iter().position(|t| t.id() == id)?;
        let removed = self.tallies.remove(index);
        self.registered.remove(index);
        for slots in self.scopes.values_mut() {
            slots.retain(|&s| s != index);
            for s in slots.iter_mut() {
                if *s > index {
                    *s -= 1;
                }
            }
        }
        self.scopes.retain(|_, slots| !slots.is_empty());
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.tallies.clear();
        self.registered.clear();
        self.scopes.clear();
    }

    // ── Scoring ──────────────────────────────────────────────────────

    /// Indices of every tally that scores the collision on `neutron`.
    fn dispatch<'a>(&'a self, neutron: &'a Neutron) -> impl Iterator<Item = usize> + 'a {
        let scopes = [
            Some(TallyScope::Geometry),
            neutron.region.map(TallyScope::Region),
            neutron.material.map(TallyScope::Material),
            neutron.isotope.map(TallyScope::Isotope),
        ];
        scopes
            .into_iter()
            .flatten()
            .filter_map(move |scope| self.scopes.get(&scope))
            .flat_map(|slots| slots.iter().copied())
            .filter(move |&i| self.tallies[i].domain().contains(neutron))
    }

    /// Score the collision on `neutron` straight into the accumulators.
    pub fn tally(&mut self, neutron: &Neutron, material: &Material) -> PinSpecResult<()> {
        let hits: Vec<usize> = self.dispatch(neutron).collect();
        for i in hits {
            self.tallies[i].tally(neutron, material)?;
        }
        Ok(())
    }

    /// Zeroed score rows for `batch`.
    pub fn new_batch_scores(&self, batch: usize) -> BatchScores {
        BatchScores {
            batch,
            rows: self
                .tallies
                .iter()
                .map(|t| Array1::zeros(t.num_bins()))
                .collect(),
        }
    }

    /// Score the collision on `neutron` into a batch-local buffer.
    pub fn score(&self, scores: &mut BatchScores, neutron: &Neutron, material: &Material) -> PinSpecResult<()> {
        if scores.rows.len() != self.tallies.len() {
            return Err(stale_scores(scores.rows.len(), self.tallies.len()));
        }
        for i in self.dispatch(neutron) {
            let row = scores.rows[i].as_slice_mut().ok_or_else(|| {
                PinSpecError::DataError("batch score row is not contiguous".to_string())
            })?;
            self.tallies[i].score_into(row, neutron, material)?;
        }
        Ok(())
    }

    /// Add a finished batch-local buffer into its batch row.
    pub fn merge_batch_scores(&mut self, scores: BatchScores) -> PinSpecResult<()> {
        if scores.rows.len() != self.tallies.len() {
            return Err(stale_scores(scores.rows.len(), self.tallies.len()));
        }
        for (tally, row) in self.tallies.iter_mut().zip(scores.rows.iter()) {
            tally.add_batch_row(scores.batch, row.as_slice().unwrap_or(&[]))?;
        }
        Ok(())
    }

    // ── Run control ──────────────────────────────────────────────────

    pub fn initialize_batch_tallies(&mut self, num_batches: usize) -> PinSpecResult<()> {
        for t in &mut self.tallies {
            t.set_num_batches(num_batches)?;
        }
        Ok(())
    }

    pub fn increment_num_batches(&mut self, extra: usize) -> PinSpecResult<()> {
        for t in &mut self.tallies {
            t.increment_num_batches(extra)?;
        }
        Ok(())
    }

    /// Batch statistics per tally, normalized by histories per batch and,
    /// except for isotope-scope and intercollision-time tallies, by the
    /// volume of the scope the tally was registered in.
    pub fn compute_scaled_batch_statistics(
        &mut self,
        neutrons_per_batch: usize,
        volumes: &DomainVolumes,
    ) -> PinSpecResult<()> {
        let npb = neutrons_per_batch as f64;
        for (t, scope) in self.tallies.iter_mut().zip(self.registered.iter()) {
            let volume = if t.kind() == TallyType::IntercollisionTime {
                1.0
            } else {
                match *scope {
                    TallyScope::Geometry => volumes.geometry,
                    TallyScope::Region(id) => volume_of(&volumes.regions, id, t.name())?,
                    TallyScope::Material(id) => volume_of(&volumes.materials, id, t.name())?,
                    TallyScope::Isotope(_) => 1.0,
                }
            };
            t.compute_scaled_batch_statistics(npb * volume)?;
        }
        Ok(())
    }

    /// True while any tally's precision trigger is unmet.
    pub fn is_precision_triggered(&mut self) -> bool {
        // evaluate every trigger so met ones are cleared in the same pass
        self.tallies
            .iter_mut()
            .fold(false, |any, t| t.is_precision_triggered() || any)
    }

    /// Write one report per tally under `dir/tally-statistics/`.
    pub fn output_batch_statistics(&self, dir: &Path) -> PinSpecResult<Vec<PathBuf>> {
        let out_dir = dir.join("tally-statistics");
        std::fs::create_dir_all(&out_dir)?;
        let mut written = Vec::with_capacity(self.tallies.len());
        for (k, t) in self.tallies.iter().enumerate() {
            let path = out_dir.join(report_file_name(t.name(), k));
            t.output_batch_statistics(&path)?;
            written.push(path);
        }
        tracing::info!(dir = %out_dir.display(), files = written.len(), "wrote tally statistics");
        Ok(written)
    }
}

/// `<lowercased name with dashes>.data`, or `tally-<k>.data` when unnamed.
pub fn report_file_name(name: &str, k: usize) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        format!("tally-{k}.data")
    } else {
        format!("{}.data", trimmed.to_lowercase().replace(' ', "-"))
    }
}

fn volume_of<K: std::hash::Hash + Eq + std::fmt::Display>(
    volumes: &HashMap<K, f64>,
    key: K,
    tally: &str,
) -> PinSpecResult<f64> {
    match volumes.get(&key) {
        Some(&v) if v > 0.0 => Ok(v),
        _ => Err(PinSpecError::ConfigError(format!(
            "no positive volume known for {key} scored by tally {tally}"
        ))),
    }
}

fn stale_scores(rows: usize, tallies: usize) -> PinSpecError {
    PinSpecError::ConfigError(format!(
        "batch scores hold {rows} tallies but the bank has {tallies}"
    ))
}

fn check_isotope_type(tally: &Tally) -> PinSpecResult<()> {
    if tally.kind().allowed_for_isotope() {
        Ok(())
    } else {
        Err(rejected(
            tally,
            &format!("in an isotope since it is a {:?} tally", tally.kind()),
        ))
    }
}

fn check_contains(tally: &Tally, isotope: IsotopeId, material: &Material) -> PinSpecResult<()> {
    if material.contains_isotope(isotope) {
        Ok(())
    } else {
        Err(rejected(
            tally,
            &format!(
                "since it is an ISOTOPE tally for {isotope} which is not contained in material {}",
                material.name()
            ),
        ))
    }
}

fn rejected(tally: &Tally, reason: &str) -> PinSpecError {
    PinSpecError::ConfigError(format!(
        "the tally bank is unable to register tally {} {reason}",
        tally.name()
    ))
}

fn derived_rejected(tally: &Tally) -> PinSpecError {
    PinSpecError::ConfigError(format!(
        "unable to register DERIVED tally {} with the tally bank",
        tally.name()
    ))
}
