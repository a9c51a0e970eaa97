// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Kernel Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, Criterion};
use pinspec_core::geometry::Geometry;
use pinspec_core::region::{Region, RegionRole};
use pinspec_nuclear::isotope::Isotope;
use pinspec_nuclear::material::{DensityUnit, Material};
use pinspec_tally::bank::TallyBank;
use pinspec_tally::tally::{BinSpacing, Tally, TallyDomain, TallyType};
use pinspec_types::config::{
    CrossSectionGridConfig, FissionerConfig, SimulationConfig, SpatialModel,
    ThermalScatteringConfig,
};
use std::hint::black_box;

fn small_run_config(threads: usize) -> SimulationConfig {
    SimulationConfig {
        neutrons_per_batch: 500,
        num_batches: 4,
        num_threads: threads,
        spatial_model: SpatialModel::InfiniteHomogeneous,
        cross_section_grid: CrossSectionGridConfig {
            num_points: 2000,
            ..Default::default()
        },
        thermal_scattering: ThermalScatteringConfig {
            enabled: false,
            ..Default::default()
        },
        fissioner: FissionerConfig {
            num_bins: 10_000,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn moderator(cfg: &SimulationConfig) -> Material {
    let mut h = Isotope::with_config("H-1", &cfg.cross_section_grid, &cfg.thermal_scattering)
        .expect("H-1");
    h.set_elastic_xs(vec![1e-5, 1.0, 2e7], vec![30.0, 20.0, 1.0]).expect("elastic");
    h.set_capture_xs(vec![1e-5, 2e7], vec![3.0, 1e-4]).expect("capture");
    let mut m = Material::new("hydrogen");
    m.set_density(0.1, DensityUnit::AtomPerBarnCm).expect("density");
    m.add_isotope(h, 1.0).expect("H");
    m
}

fn bench_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel");
    group.sample_size(10);

    for threads in [1, 4] {
        let cfg = small_run_config(threads);
        let material = moderator(&cfg);
        let mut geometry = Geometry::new(cfg).expect("geometry");
        geometry
            .add_region(Region::new("pool", RegionRole::Infinite, material))
            .expect("region");

        group.bench_function(format!("infinite_2000_histories_{threads}t"), |b| {
            b.iter(|| {
                let mut bank = TallyBank::new();
                let mut flux = Tally::new("flux", TallyDomain::Geometry, TallyType::Flux);
                flux.generate_bin_edges(1e-3, 2e7, 100, BinSpacing::Logarithmic)
                    .expect("edges");
                bank.register(flux).expect("register");
                black_box(geometry.run(&mut bank).expect("run"))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kernel);
criterion_main!(benches);
