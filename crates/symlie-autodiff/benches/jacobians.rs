//! Benchmarks for tangent-space jacobians
//!
//! Run with: cargo bench -p symlie-autodiff

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use symlie_autodiff::{jacobian, Linearization};
use symlie_core::ops::LieGroupOps;
use symlie_geo::{Matrix, Pose3};

fn benchmark_point_transform_jacobian(c: &mut Criterion) {
    let mut group = c.benchmark_group("jacobian");

    for &points in &[1usize, 4, 16] {
        let pose = Pose3::symbolic("T");
        let landmarks: Vec<Matrix> = (0..points)
            .map(|i| Matrix::symbolic(&format!("p{i}_"), 3, 1))
            .collect();
        let outputs: Vec<_> = landmarks
            .iter()
            .flat_map(|p| pose.transform_point(p).unwrap().entries())
            .collect();
        group.bench_with_input(BenchmarkId::new("pose3_points", points), &points, |b, _| {
            let inputs: [&dyn LieGroupOps; 1] = [&pose];
            b.iter(|| jacobian(black_box(&outputs), &inputs).unwrap());
        });
    }

    group.finish();
}

fn benchmark_linearization(c: &mut Criterion) {
    let pose = Pose3::symbolic("T");
    let point = Matrix::symbolic("p", 3, 1);
    let residual = pose.transform_point(&point).unwrap();
    c.bench_function("linearize_pose3_point", |b| {
        b.iter(|| Linearization::new(black_box(&residual), &[&pose, &point]).unwrap());
    });
}

criterion_group!(benches, benchmark_point_transform_jacobian, benchmark_linearization);
criterion_main!(benches);
