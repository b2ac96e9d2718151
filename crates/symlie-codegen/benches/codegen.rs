//! Benchmarks for rendering generated functions
//!
//! Run with: cargo bench -p symlie-codegen

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use symlie_codegen::{Codegen, CodegenConfig, CppConfig, PythonConfig, RustConfig};
use symlie_geo::{Matrix, Pose3};
use symlie_values::Values;

fn point_residual(points: usize, config: CodegenConfig) -> Codegen {
    let pose = Pose3::symbolic("T");
    let mut inputs = Values::new();
    inputs.insert("pose", pose.clone()).unwrap();
    let mut outputs = Values::new();
    for i in 0..points {
        let point = Matrix::symbolic(&format!("p{i}_"), 3, 1);
        outputs
            .insert(&format!("res{i}"), pose.transform_point(&point).unwrap())
            .unwrap();
        inputs.insert(&format!("point{i}"), point).unwrap();
    }
    Codegen::new("point_residual", inputs, outputs, config).unwrap()
}

fn benchmark_render_with_jacobians(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_with_jacobians");

    let configs: [(&str, CodegenConfig); 3] = [
        ("cpp", CppConfig::default().into()),
        ("python", PythonConfig::default().into()),
        ("rust", RustConfig::default().into()),
    ];
    for (language, config) in configs {
        for &points in &[1usize, 4] {
            let codegen = point_residual(points, config.clone())
                .with_jacobians(&["pose"], true)
                .unwrap();
            group.bench_with_input(BenchmarkId::new(language, points), &points, |b, _| {
                b.iter(|| black_box(&codegen).render(None).unwrap());
            });
        }
    }

    group.finish();
}

fn benchmark_jacobian_augmentation(c: &mut Criterion) {
    let codegen = point_residual(4, CppConfig::default().into());
    c.bench_function("with_jacobians_pose3_4_points", |b| {
        b.iter(|| black_box(&codegen).with_jacobians(&[], true).unwrap());
    });
}

criterion_group!(benches, benchmark_render_with_jacobians, benchmark_jacobian_augmentation);
criterion_main!(benches);
