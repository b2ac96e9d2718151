//! Benchmarks for expression construction, differentiation and CSE
//!
//! Run with: cargo bench -p symlie-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use symlie_core::cse::cse;
use symlie_core::Expr;

/// Nested trigonometric chain sharing its subterms across outputs.
fn chain(depth: usize) -> Vec<Expr> {
    let x = Expr::symbol("x");
    let y = Expr::symbol("y");
    let mut term = &x * &y;
    let mut outputs = Vec::with_capacity(depth);
    for i in 0..depth {
        term = (term.sin() + &x).cos() * (i as f64 + 1.0);
        outputs.push(&term * &y);
    }
    outputs
}

fn benchmark_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    for &depth in &[8usize, 32, 128] {
        group.bench_with_input(BenchmarkId::new("chain", depth), &depth, |b, &depth| {
            b.iter(|| chain(black_box(depth)));
        });
    }
    group.finish();
}

fn benchmark_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");
    let x = Expr::symbol("x");
    for &depth in &[8usize, 32] {
        let outputs = chain(depth);
        group.bench_with_input(BenchmarkId::new("chain", depth), &depth, |b, _| {
            b.iter(|| {
                for output in &outputs {
                    black_box(output.diff(&x).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn benchmark_cse(c: &mut Criterion) {
    let mut group = c.benchmark_group("cse");
    for &depth in &[8usize, 32, 128] {
        let outputs = chain(depth);
        group.bench_with_input(BenchmarkId::new("chain", depth), &depth, |b, _| {
            b.iter(|| cse(black_box(&outputs)));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_construction, benchmark_diff, benchmark_cse);
criterion_main!(benches);
