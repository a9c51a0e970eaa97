// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Collision Physics Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, Criterion};
use pinspec_nuclear::fissioner::Fissioner;
use pinspec_nuclear::isotope::Isotope;
use pinspec_nuclear::material::{DensityUnit, Material};
use pinspec_nuclear::neutron::Neutron;
use pinspec_types::config::FissionerConfig;
use pinspec_types::handle::RegionId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;

fn water() -> Material {
    let mut h = Isotope::new("H-1").expect("H-1");
    h.set_elastic_xs(vec![1e-5, 1.0, 2e7], vec![30.0, 20.0, 1.0]).expect("elastic");
    h.set_capture_xs(vec![1e-5, 2e7], vec![3.0, 1e-4]).expect("capture");
    let mut o = Isotope::new("O-16").expect("O-16");
    o.set_elastic_xs(vec![1e-5, 2e7], vec![4.0, 1.0]).expect("elastic");
    o.set_capture_xs(vec![1e-5, 2e7], vec![1e-4, 1e-4]).expect("capture");
    let mut m = Material::new("water");
    m.set_density(1.0, DensityUnit::GramPerCc).expect("density");
    m.add_isotope(h, 2.0).expect("H");
    m.add_isotope(o, 1.0).expect("O");
    m
}

fn bench_collisions(c: &mut Criterion) {
    let mut group = c.benchmark_group("collisions");
    let material = water();
    let fissioner = Fissioner::new(&FissionerConfig::default()).expect("fissioner");
    let region = RegionId::fresh();
    let mut rng = StdRng::seed_from_u64(7);

    group.bench_function("slow_down_one_history", |b| {
        let mut neutron = Neutron::new(0);
        b.iter(|| {
            neutron.rebirth(fissioner.emit_energy(&mut rng), region);
            let mut collisions = 0u32;
            while neutron.alive && collisions < 10_000 {
                material
                    .collide_neutron(&mut neutron, &mut rng)
                    .expect("collision");
                collisions += 1;
            }
            black_box(collisions)
        })
    });

    group.bench_function("emit_energy", |b| {
        b.iter(|| black_box(fissioner.emit_energy(&mut rng)))
    });

    group.finish();
}

criterion_group!(benches, bench_collisions);
criterion_main!(benches);
