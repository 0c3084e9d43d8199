use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flexure_struct::selection::{build_table, ChainSelection};
use flexure_struct::superposition::{kabsch_points, superpose_tables};
use flexure_struct::types::{Chain, Point3D, Residue, Structure};

/// CA trace in a rough alpha-helix geometry: ~1.5 Å rise, 100 degree turn.
fn helix(n_residues: usize) -> Vec<Point3D> {
    (0..n_residues)
        .map(|i| {
            let angle = (i as f64) * 100.0_f64.to_radians();
            Point3D {
                x: 2.3 * angle.cos(),
                y: 2.3 * angle.sin(),
                z: i as f64 * 1.5,
            }
        })
        .collect()
}

/// Slightly perturbed copy, deterministic.
fn perturbed(points: &[Point3D]) -> Vec<Point3D> {
    let mut state: u64 = 42;
    points
        .iter()
        .map(|p| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let noise = (state >> 33) as f64 / (u32::MAX as f64) * 0.5;
            Point3D {
                x: p.x + noise,
                y: p.y - noise * 0.5,
                z: p.z + noise * 0.3,
            }
        })
        .collect()
}

fn structure(id: &str, coords: &[Point3D]) -> Structure {
    let residues = coords
        .iter()
        .enumerate()
        .map(|(i, p)| Residue::from_ca("ALA", i as i32 + 1, *p))
        .collect();
    Structure::new(id, vec![Chain::new('A', residues)])
}

fn bench_kabsch(c: &mut Criterion) {
    let mut group = c.benchmark_group("kabsch");

    let points_a = helix(1000);
    let points_b = perturbed(&points_a);

    group.bench_function("1k_ca_atoms", |b| {
        b.iter(|| kabsch_points(black_box(&points_a), black_box(&points_b)))
    });

    group.finish();
}

fn bench_superpose_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("superpose_tables");

    let coords = helix(500);
    let reference = build_table(&structure("REF", &coords), &ChainSelection::All).unwrap();
    let mobile = build_table(&structure("MOB", &perturbed(&coords)), &ChainSelection::All).unwrap();

    group.bench_function("500_residues", |b| {
        b.iter(|| superpose_tables(black_box(&reference), black_box(&mobile)))
    });

    group.finish();
}

criterion_group!(benches, bench_kabsch, bench_superpose_tables);
criterion_main!(benches);
