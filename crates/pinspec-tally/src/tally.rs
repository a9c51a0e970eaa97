// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Tally
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Energy-binned batch tallies and their batch statistics.
//!
//! A tally accumulates weights into a (batch × bin) table. Statistics
//! are recomputed from the whole table every time they are requested.

use ndarray::{Array1, Array2};
use pinspec_math::grid::{linspace, logspace};
use pinspec_math::search::find_interval;
use pinspec_nuclear::isotope::Reaction;
use pinspec_nuclear::material::Material;
use pinspec_nuclear::neutron::Neutron;
use pinspec_types::constants::{CM_TO_M, LIGHT_SPEED, NEUTRON_MASS_EV};
use pinspec_types::diagnostics::{report, Severity};
use pinspec_types::error::{require_len, require_positive, PinSpecError, PinSpecResult};
use pinspec_types::handle::{IsotopeId, MaterialId, RegionId, TallyId};
use std::fmt;
use std::path::Path;

/// Quantity a tally scores per collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TallyType {
    Flux,
    LeakageRate,
    CollisionRate,
    IntercollisionTime,
    ElasticRate,
    AbsorptionRate,
    CaptureRate,
    FissionRate,
    TransportRate,
    DiffusionRate,
    Derived,
}

impl TallyType {
    /// Whether this quantity is meaningful for a single isotope.
    pub fn allowed_for_isotope(self) -> bool {
        !matches!(
            self,
            TallyType::Flux | TallyType::LeakageRate | TallyType::IntercollisionTime
        )
    }

    fn report_label(self) -> &'static str {
        match self {
            TallyType::CollisionRate => "COLLISION_RATE Rate",
            TallyType::Flux => "Flux",
            TallyType::ElasticRate => "ELASTIC_RATE Scattering Reaction Rate",
            TallyType::AbsorptionRate => "ABSORPTION_RATE Reaction Rate",
            TallyType::CaptureRate => "CAPTURE_RATE Reaction Rate",
            TallyType::FissionRate => "FISSION_RATE Reaction Rate",
            TallyType::TransportRate => "TRANSPORT_RATE Reaction Rate",
            TallyType::DiffusionRate => "DIFFUSION_RATE Reaction Rate",
            TallyType::LeakageRate => "LEAKAGE_RATE Rate",
            TallyType::IntercollisionTime => "INTERCOLLISION_TIME",
            TallyType::Derived => "DERIVED",
        }
    }
}

/// What part of the system a tally scores over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TallyDomain {
    Geometry,
    Region(RegionId),
    Material(MaterialId),
    Isotope(IsotopeId),
    /// Derived tallies only.
    Undefined,
}

impl TallyDomain {
    /// Whether a collision described by `neutron` lies inside this domain.
    pub fn contains(&self, neutron: &Neutron) -> bool {
        match *self {
            TallyDomain::Geometry => true,
            TallyDomain::Region(id) => neutron.region == Some(id),
            TallyDomain::Material(id) => neutron.material == Some(id),
            TallyDomain::Isotope(id) => neutron.isotope == Some(id),
            TallyDomain::Undefined => false,
        }
    }
}

impl fmt::Display for TallyDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TallyDomain::Geometry => write!(f, "Geometry"),
            TallyDomain::Region(_) => write!(f, "Region"),
            TallyDomain::Material(_) => write!(f, "Material"),
            TallyDomain::Isotope(_) => write!(f, "Isotope"),
            TallyDomain::Undefined => write!(f, "Undefined"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinSpacing {
    Equal,
    Logarithmic,
    /// Caller-supplied edges.
    Other,
}

/// Statistic a precision trigger watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerType {
    None,
    Variance,
    StdDev,
    RelativeError,
}

/// Per-bin statistics over all accumulated batches.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatistics {
    pub mu: Array1<f64>,
    pub variance: Array1<f64>,
    pub std_dev: Array1<f64>,
    pub rel_err: Array1<f64>,
}

impl BatchStatistics {
    /// Statistics from means and variances; std-dev and rel-err follow.
    pub fn from_mean_variance(mu: Array1<f64>, variance: Array1<f64>) -> Self {
        let std_dev = variance.mapv(|v| v.max(0.0).sqrt());
        let rel_err = relative_error(&mu, &std_dev);
        BatchStatistics {
            mu,
            variance,
            std_dev,
            rel_err,
        }
    }
}

/// `std/mu`, with zero where the mean vanishes.
pub(crate) fn relative_error(mu: &Array1<f64>, std_dev: &Array1<f64>) -> Array1<f64> {
    let mut rel = Array1::zeros(mu.len());
    for ((r, &m), &s) in rel.iter_mut().zip(mu.iter()).zip(std_dev.iter()) {
        *r = if m == 0.0 { 0.0 } else { s / m };
    }
    rel
}

#[derive(Debug, Clone)]
pub struct Tally {
    id: TallyId,
    name: String,
    domain: TallyDomain,
    kind: TallyType,
    spacing: BinSpacing,
    edges: Array1<f64>,
    centers: Array1<f64>,
    delta: f64,
    accum: Array2<f64>,
    stats: Option<BatchStatistics>,
    trigger: TriggerType,
    trigger_precision: f64,
    edges_locked: bool,
}

impl Tally {
    pub fn new(name: &str, domain: TallyDomain, kind: TallyType) -> Self {
        Tally {
            id: TallyId::fresh(),
            name: name.to_string(),
            domain,
            kind,
            spacing: BinSpacing::Other,
            edges: Array1::zeros(0),
            centers: Array1::zeros(0),
            delta: 0.0,
            accum: Array2::zeros((0, 0)),
            stats: None,
            trigger: TriggerType::None,
            trigger_precision: 0.0,
            edges_locked: false,
        }
    }

    /// Derived result of a tally combination; one batch, stats already set.
    pub(crate) fn derived(
        name: String,
        spacing: BinSpacing,
        edges: Array1<f64>,
        delta: f64,
        stats: BatchStatistics,
    ) -> Self {
        let centers = midpoints(&edges);
        let bins = centers.len();
        Tally {
            id: TallyId::fresh(),
            name,
            domain: TallyDomain::Undefined,
            kind: TallyType::Derived,
            spacing,
            edges,
            centers,
            delta,
            accum: Array2::zeros((1, bins)),
            stats: Some(stats),
            trigger: TriggerType::None,
            trigger_precision: 0.0,
            edges_locked: true,
        }
    }

    pub fn id(&self) -> TallyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> TallyDomain {
        self.domain
    }

    pub fn kind(&self) -> TallyType {
        self.kind
    }

    pub fn spacing(&self) -> BinSpacing {
        self.spacing
    }

    /// Bin width: in eV for equal bins, in decades for log bins.
    pub fn bin_delta(&self) -> f64 {
        self.delta
    }

    pub fn num_bins(&self) -> usize {
        self.centers.len()
    }

    pub fn num_batches(&self) -> usize {
        self.accum.nrows()
    }

    pub fn edges(&self) -> &Array1<f64> {
        &self.edges
    }

    pub fn centers(&self) -> &Array1<f64> {
        &self.centers
    }

    /// Raw (batch × bin) accumulator.
    pub fn batch_tallies(&self) -> &Array2<f64> {
        &self.accum
    }

    // ── Bins ─────────────────────────────────────────────────────────

    pub fn generate_bin_edges(
        &mut self,
        start: f64,
        end: f64,
        num_bins: usize,
        spacing: BinSpacing,
    ) -> PinSpecResult<()> {
        self.ensure_edges_mutable()?;
        if num_bins == 0 {
            return Err(PinSpecError::ConfigError(format!(
                "tally {} needs at least one bin",
                self.name
            )));
        }
        if start == end {
            return Err(PinSpecError::ConfigError(format!(
                "unable to create bins for tally {} between identical start and end points: {start}",
                self.name
            )));
        }
        if !(start.is_finite() && end.is_finite()) || end < start {
            return Err(PinSpecError::ConfigError(format!(
                "tally {} bin range [{start}, {end}] must be finite and increasing",
                self.name
            )));
        }
        let (edges, delta) = match spacing {
            BinSpacing::Equal => (
                linspace(start, end, num_bins + 1),
                (end - start) / num_bins as f64,
            ),
            BinSpacing::Logarithmic => {
                require_positive(start, "logarithmic tally bin start")?;
                (
                    logspace(start, end, num_bins + 1),
                    (end.log10() - start.log10()) / num_bins as f64,
                )
            }
            BinSpacing::Other => {
                return Err(PinSpecError::ConfigError(format!(
                    "tally {}: user-defined bins are set with set_bin_edges",
                    self.name
                )))
            }
        };
        self.install_edges(edges, spacing, delta);
        Ok(())
    }

    /// User-defined edges; must be strictly increasing with at least two.
    pub fn set_bin_edges(&mut self, edges: &[f64]) -> PinSpecResult<()> {
        self.ensure_edges_mutable()?;
        if edges.len() < 2 {
            return Err(PinSpecError::ConfigError(format!(
                "tally {} needs at least two bin edges, got {}",
                self.name,
                edges.len()
            )));
        }
        if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PinSpecError::ConfigError(format!(
                "tally {} bin edges must be finite and strictly increasing",
                self.name
            )));
        }
        self.install_edges(Array1::from(edges.to_vec()), BinSpacing::Other, 0.0);
        Ok(())
    }

    fn ensure_edges_mutable(&self) -> PinSpecResult<()> {
        if self.edges_locked {
            return Err(PinSpecError::ConfigError(format!(
                "bin edges of tally {} cannot change after scoring has started",
                self.name
            )));
        }
        Ok(())
    }

    fn install_edges(&mut self, edges: Array1<f64>, spacing: BinSpacing, delta: f64) {
        self.centers = midpoints(&edges);
        self.edges = edges;
        self.spacing = spacing;
        self.delta = delta;
        self.accum = Array2::zeros((1, self.centers.len()));
        self.stats = None;
    }

    /// Bin containing `sample`, or `None` outside the edges.
    ///
    /// Bins are `[e_i, e_{i+1})` except the last, which also holds its
    /// upper edge.
    pub fn bin_index(&self, sample: f64) -> Option<usize> {
        let n = self.num_bins();
        if n == 0 || !(sample >= self.edges[0] && sample <= self.edges[n]) {
            return None;
        }
        if sample == self.edges[n] {
            return Some(n - 1);
        }
        let raw = match self.spacing {
            BinSpacing::Equal => (sample - self.edges[0]) / self.delta,
            BinSpacing::Logarithmic => (sample.log10() - self.edges[0].log10()) / self.delta,
            BinSpacing::Other => return find_interval(self.edges.as_slice()?, sample),
        };
        let mut i = (raw.floor().max(0.0) as usize).min(n - 1);
        // arithmetic can land one bin off next to an edge
        while i > 0 && sample < self.edges[i] {
            i -= 1;
        }
        while i + 1 < n && sample >= self.edges[i + 1] {
            i += 1;
        }
        Some(i)
    }

    // ── Batches ──────────────────────────────────────────────────────

    /// Reset the accumulator to `num_batches` zeroed rows.
    pub fn set_num_batches(&mut self, num_batches: usize) -> PinSpecResult<()> {
        self.ensure_not_derived("batches cannot be reset")?;
        self.accum = Array2::zeros((num_batches, self.num_bins()));
        self.stats = None;
        Ok(())
    }

    /// Append `extra` zeroed rows, keeping every accumulated batch.
    pub fn increment_num_batches(&mut self, extra: usize) -> PinSpecResult<()> {
        self.ensure_not_derived("batches cannot be extended")?;
        let (rows, cols) = self.accum.dim();
        let mut grown = Array2::zeros((rows + extra, cols));
        grown.slice_mut(ndarray::s![..rows, ..]).assign(&self.accum);
        self.accum = grown;
        self.stats = None;
        Ok(())
    }

    fn ensure_not_derived(&self, what: &str) -> PinSpecResult<()> {
        if self.kind == TallyType::Derived {
            return Err(PinSpecError::ConfigError(format!(
                "derived tally {}: {what}",
                self.name
            )));
        }
        Ok(())
    }

    // ── Scoring ──────────────────────────────────────────────────────

    /// Weight scored for the collision recorded on `neutron`.
    ///
    /// Cross sections are evaluated at the pre-collision energy: macroscopic
    /// for geometry, region and material tallies, microscopic for isotope
    /// tallies. Σt is always the colliding material's macroscopic total.
    pub fn weight(&self, neutron: &Neutron, material: &Material) -> PinSpecResult<f64> {
        let energy = neutron.old_energy;
        let sigma_t = neutron.total_xs;
        let xs = |reaction: Reaction| -> PinSpecResult<f64> {
            match self.domain {
                TallyDomain::Isotope(id) => material
                    .isotope(id)
                    .ok_or_else(|| {
                        PinSpecError::DataError(format!(
                            "tally {}: {id} is not part of material {}",
                            self.name,
                            material.name()
                        ))
                    })?
                    .xs(reaction, energy),
                _ => material.macro_xs(reaction, energy),
            }
        };
        let weight = match self.kind {
            TallyType::CollisionRate => 1.0,
            TallyType::Flux => 1.0 / sigma_t,
            TallyType::ElasticRate => xs(Reaction::Elastic)? / sigma_t,
            TallyType::AbsorptionRate => xs(Reaction::Absorption)? / sigma_t,
            TallyType::CaptureRate => xs(Reaction::Capture)? / sigma_t,
            TallyType::FissionRate => xs(Reaction::Fission)? / sigma_t,
            TallyType::TransportRate => xs(Reaction::Transport)? / sigma_t,
            TallyType::DiffusionRate => 1.0 / (3.0 * xs(Reaction::Transport)?) / sigma_t,
            TallyType::LeakageRate => {
                material.buckling_squared() / (3.0 * xs(Reaction::Transport)? * sigma_t)
            }
            TallyType::IntercollisionTime => {
                let speed = LIGHT_SPEED * (2.0 * energy / NEUTRON_MASS_EV).sqrt();
                (1.0 / sigma_t * CM_TO_M) / speed
            }
            TallyType::Derived => {
                return Err(PinSpecError::ConfigError(format!(
                    "derived tally {} cannot score collisions",
                    self.name
                )))
            }
        };
        Ok(weight)
    }

    /// Add `weight` at `sample` into `batch`; out-of-range samples are dropped.
    pub fn tally_sample(&mut self, batch: usize, sample: f64, weight: f64) -> PinSpecResult<()> {
        self.ensure_not_derived("cannot be tallied with raw events")?;
        self.ensure_bins()?;
        if batch >= self.num_batches() {
            return Err(PinSpecError::IndexOutOfRange {
                what: format!("batches of tally {}", self.name),
                index: batch,
                len: self.num_batches(),
            });
        }
        self.edges_locked = true;
        if let Some(bin) = self.bin_index(sample) {
            self.accum[[batch, bin]] += weight;
        }
        Ok(())
    }

    /// Score the collision recorded on `neutron` into its batch.
    pub fn tally(&mut self, neutron: &Neutron, material: &Material) -> PinSpecResult<()> {
        let weight = self.weight(neutron, material)?;
        self.tally_sample(neutron.batch, neutron.old_energy, weight)
    }

    /// Score into a batch-local row buffer instead of the accumulator.
    pub fn score_into(
        &self,
        row: &mut [f64],
        neutron: &Neutron,
        material: &Material,
    ) -> PinSpecResult<()> {
        self.ensure_not_derived("cannot be tallied with raw events")?;
        require_len(row.len(), self.num_bins(), "batch score row")?;
        if let Some(bin) = self.bin_index(neutron.old_energy) {
            row[bin] += self.weight(neutron, material)?;
        }
        Ok(())
    }

    /// Add a batch-local row buffer into `batch`.
    pub fn add_batch_row(&mut self, batch: usize, row: &[f64]) -> PinSpecResult<()> {
        self.ensure_not_derived("cannot be tallied with raw events")?;
        require_len(row.len(), self.num_bins(), "batch score row")?;
        if batch >= self.num_batches() {
            return Err(PinSpecError::IndexOutOfRange {
                what: format!("batches of tally {}", self.name),
                index: batch,
                len: self.num_batches(),
            });
        }
        self.edges_locked = true;
        for (cell, v) in self.accum.row_mut(batch).iter_mut().zip(row) {
            *cell += v;
        }
        Ok(())
    }

    fn ensure_bins(&self) -> PinSpecResult<()> {
        if self.num_bins() == 0 {
            return Err(PinSpecError::ConfigError(format!(
                "bins of tally {} have not been created",
                self.name
            )));
        }
        Ok(())
    }

    // ── Statistics ───────────────────────────────────────────────────

    pub fn compute_batch_statistics(&mut self) -> PinSpecResult<()> {
        self.compute_scaled_batch_statistics(1.0)
    }

    /// Mean, variance, std-dev and relative error per bin over every batch,
    /// with each batch value divided by `scale`.
    pub fn compute_scaled_batch_statistics(&mut self, scale: f64) -> PinSpecResult<()> {
        require_positive(scale, "tally scale factor")?;
        if self.kind == TallyType::Derived {
            return Ok(());
        }
        self.ensure_bins()?;
        let b = self.num_batches();
        if b == 0 {
            return Err(PinSpecError::ConfigError(format!(
                "cannot compute statistics for tally {} before batches are created",
                self.name
            )));
        }
        let bf = b as f64;
        let n = self.num_bins();
        let mut mu = Array1::zeros(n);
        let mut variance = Array1::zeros(n);
        for (i, column) in self.accum.columns().into_iter().enumerate() {
            let (s1, s2) = column.iter().fold((0.0, 0.0), |(s1, s2), &x| {
                let x = x / scale;
                (s1 + x, s2 + x * x)
            });
            let mean = s1 / bf;
            mu[i] = mean;
            variance[i] = if b > 1 {
                ((s2 / bf - mean * mean) * bf / (bf - 1.0)).max(0.0)
            } else {
                0.0
            };
        }
        self.stats = Some(BatchStatistics::from_mean_variance(mu, variance));
        Ok(())
    }

    pub fn has_statistics(&self) -> bool {
        self.stats.is_some()
    }

    pub fn statistics(&self) -> PinSpecResult<&BatchStatistics> {
        self.stats
            .as_ref()
            .ok_or_else(|| PinSpecError::StatisticsUnavailable(self.name.clone()))
    }

    pub fn batch_mu(&self) -> PinSpecResult<&Array1<f64>> {
        Ok(&self.statistics()?.mu)
    }

    pub fn batch_variance(&self) -> PinSpecResult<&Array1<f64>> {
        Ok(&self.statistics()?.variance)
    }

    pub fn batch_std_dev(&self) -> PinSpecResult<&Array1<f64>> {
        Ok(&self.statistics()?.std_dev)
    }

    pub fn batch_rel_err(&self) -> PinSpecResult<&Array1<f64>> {
        Ok(&self.statistics()?.rel_err)
    }

    pub fn retrieve_edges(&self, out: &mut [f64]) -> PinSpecResult<()> {
        require_len(out.len(), self.edges.len(), "tally edge buffer")?;
        copy_into(out, &self.edges);
        Ok(())
    }

    pub fn retrieve_centers(&self, out: &mut [f64]) -> PinSpecResult<()> {
        require_len(out.len(), self.num_bins(), "tally center buffer")?;
        copy_into(out, &self.centers);
        Ok(())
    }

    pub fn retrieve_mu(&self, out: &mut [f64]) -> PinSpecResult<()> {
        let mu = self.batch_mu()?;
        require_len(out.len(), mu.len(), "tally mean buffer")?;
        copy_into(out, mu);
        Ok(())
    }

    pub fn retrieve_variance(&self, out: &mut [f64]) -> PinSpecResult<()> {
        let v = self.batch_variance()?;
        require_len(out.len(), v.len(), "tally variance buffer")?;
        copy_into(out, v);
        Ok(())
    }

    pub fn retrieve_std_dev(&self, out: &mut [f64]) -> PinSpecResult<()> {
        let s = self.batch_std_dev()?;
        require_len(out.len(), s.len(), "tally std-dev buffer")?;
        copy_into(out, s);
        Ok(())
    }

    pub fn retrieve_rel_err(&self, out: &mut [f64]) -> PinSpecResult<()> {
        let r = self.batch_rel_err()?;
        require_len(out.len(), r.len(), "tally rel-err buffer")?;
        copy_into(out, r);
        Ok(())
    }

    pub fn max_tally(&self) -> PinSpecResult<f64> {
        Ok(self.batch_mu()?.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
    }

    pub fn min_tally(&self) -> PinSpecResult<f64> {
        Ok(self.batch_mu()?.iter().cloned().fold(f64::INFINITY, f64::min))
    }

    /// Rescale so the bin means sum to one. Relative errors are unchanged.
    pub fn normalize_batch_mu(&mut self) -> PinSpecResult<()> {
        let name = self.name.clone();
        let stats = self
            .stats
            .as_mut()
            .ok_or(PinSpecError::StatisticsUnavailable(name))?;
        let total: f64 = stats.mu.sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(PinSpecError::DataError(format!(
                "cannot normalize tally {} whose means sum to {total}",
                self.name
            )));
        }
        stats.mu /= total;
        stats.variance /= total * total;
        stats.std_dev /= total;
        Ok(())
    }

    // ── Precision trigger ────────────────────────────────────────────

    pub fn set_precision_trigger(&mut self, trigger: TriggerType, precision: f64) -> PinSpecResult<()> {
        if trigger != TriggerType::None {
            require_positive(precision, "trigger precision")?;
        }
        self.trigger = trigger;
        self.trigger_precision = precision;
        Ok(())
    }

    pub fn trigger_type(&self) -> TriggerType {
        self.trigger
    }

    pub fn trigger_precision(&self) -> f64 {
        self.trigger_precision
    }

    /// Whether this tally still needs more batches.
    ///
    /// The watched statistic is the maximum over bins. Once it falls below
    /// the threshold the trigger is cleared.
    pub fn is_precision_triggered(&mut self) -> bool {
        let stats = match (&self.trigger, &self.stats) {
            (TriggerType::None, _) => return false,
            (_, None) => return true,
            (_, Some(stats)) => stats,
        };
        let (label, values) = match self.trigger {
            TriggerType::Variance => ("variance", &stats.variance),
            TriggerType::StdDev => ("std. dev.", &stats.std_dev),
            _ => ("rel. err.", &stats.rel_err),
        };
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if max < self.trigger_precision {
            tracing::debug!(tally = %self.name, statistic = label, max, "precision trigger met");
            self.trigger = TriggerType::None;
            false
        } else {
            tracing::info!(
                "Tally {} triggered ({label} < {:.1E}) with max {label} = {max:.1E}",
                self.name,
                self.trigger_precision
            );
            true
        }
    }

    // ── Output ───────────────────────────────────────────────────────

    /// Plain-text batch statistics report.
    pub fn render_report(&self) -> PinSpecResult<String> {
        let stats = self.statistics()?;
        let mut out = String::new();
        out.push_str("Batch-based tally statistics for PINSPEC\n");
        out.push_str(&format!("Tally name: {}\n", self.name));
        out.push_str(&format!("Tally type: {}\n", self.kind.report_label()));
        out.push_str(&format!("Tally Domain: {}\n", self.domain));
        match self.spacing {
            BinSpacing::Equal => {
                out.push_str(&format!("Equally spaced bins with width = {:.6}\n", self.delta))
            }
            BinSpacing::Logarithmic => out.push_str(&format!(
                "Logarithmically spaced bins with width = {:.6}\n",
                self.delta
            )),
            BinSpacing::Other => out.push_str("User-defined bins\n"),
        }
        out.push_str(&format!(
            "# batches: {}\t, # bins: {}\n",
            self.num_batches(),
            self.num_bins()
        ));
        out.push_str("Bin center, Mu, Variance, Std Dev, Rel Err\n");
        for i in 0..self.num_bins() {
            out.push_str(&format!(
                "{:.10}, {:.10}, {:.10}, {:.10}, {:.10}\n",
                self.centers[i], stats.mu[i], stats.variance[i], stats.std_dev[i], stats.rel_err[i]
            ));
        }
        Ok(out)
    }

    pub fn output_batch_statistics(&self, path: &Path) -> PinSpecResult<()> {
        let text = self.render_report()?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Table rows `[ lo - hi eV ]:  mu [var std rel]`, one per bin.
    pub fn format_tallies(&self, uncertainties: bool) -> PinSpecResult<Vec<String>> {
        let stats = self.statistics()?;
        let mut title = format!("{}Energy Band{}   Mu   ", " ".repeat(7), " ".repeat(9));
        if uncertainties {
            title.push_str("  Variance  Std. Dev. Rel. Err.");
        }
        let mut lines = vec![title];
        for i in 0..self.num_bins() {
            let mut entry = format!(
                "[ {} - {} eV ]:  {}",
                format_bound(self.edges[i]),
                format_bound(self.edges[i + 1]),
                format_mu(stats.mu[i])
            );
            if uncertainties {
                entry.push_str(&format!(
                    "  {:8.2E}  {:8.2E}  {:8.2E}",
                    stats.variance[i], stats.std_dev[i], stats.rel_err[i]
                ));
            }
            lines.push(entry);
        }
        Ok(lines)
    }

    pub fn print_tallies(&self, uncertainties: bool) -> PinSpecResult<()> {
        report(
            Severity::Result,
            &format!("Batch Statistics for Tally {}", self.name),
        )?;
        for line in self.format_tallies(uncertainties)? {
            report(Severity::Result, &line)?;
        }
        Ok(())
    }
}

fn midpoints(edges: &Array1<f64>) -> Array1<f64> {
    if edges.len() < 2 {
        return Array1::zeros(0);
    }
    Array1::from_iter(edges.windows(2).into_iter().map(|w| 0.5 * (w[0] + w[1])))
}

fn copy_into(out: &mut [f64], src: &Array1<f64>) {
    for (o, s) in out.iter_mut().zip(src.iter()) {
        *o = *s;
    }
}

fn format_bound(edge: f64) -> String {
    if edge == 0.0 || (1e-2..1e4).contains(&edge) {
        format!("{edge:7.2}")
    } else {
        format!("{edge:7.1E}")
    }
}

fn format_mu(mu: f64) -> String {
    if mu < 1e-2 || mu >= 1e6 {
        format!("{mu:8.2E}")
    } else if mu < 10.0 {
        format!("{mu:8.6}")
    } else if mu < 1e2 {
        format!("{mu:8.5}")
    } else if mu < 1e3 {
        format!("{mu:8.4}")
    } else if mu < 1e4 {
        format!("{mu:8.3}")
    } else {
        format!("{mu:8.2}")
    }
}
