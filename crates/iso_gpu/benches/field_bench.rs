//! Scalar field generation throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use iso_gpu::{GridSize, ScalarField, SphereShape};

fn bench_sphere_field(c: &mut Criterion) {
  let mut group = c.benchmark_group("scalar_field");

  for size in [32, 64, 128] {
    let grid = GridSize::cube(size).unwrap();
    let shape = SphereShape::new(size as f32 * 0.4);
    group.bench_with_input(BenchmarkId::new("sphere", size), &grid, |b, &grid| {
      b.iter(|| black_box(ScalarField::generate(grid, &shape)));
    });
  }

  group.finish();
}

fn bench_homogeneity_scan(c: &mut Criterion) {
  let grid = GridSize::cube(64).unwrap();
  let field = ScalarField::generate(grid, &SphereShape::new(20.0));

  c.bench_function("scalar_field::is_homogeneous (64³)", |b| {
    b.iter(|| black_box(field.is_homogeneous(black_box(0.0))));
  });
}

criterion_group!(benches, bench_sphere_field, bench_homogeneity_scan);
criterion_main!(benches);
