use std::hint::black_box;

use chrono::NaiveDate;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BenchmarkId;
use criterion::Criterion;
use ndarray::Array2;
use tangency_rs::quant::market::Panel;
use tangency_rs::quant::market::ReturnTable;
use tangency_rs::quant::portfolio::optimize_tangency;
use tangency_rs::quant::portfolio::SolverConfig;
use tangency_rs::quant::risk::decompose;
use tangency_rs::quant::PERIODS_PER_YEAR;

const ASSETS: usize = 6;

/// Deterministic daily log returns with distinct drift and cycle per asset.
fn returns(days: usize) -> ReturnTable {
  let values = Array2::from_shape_fn((days, ASSETS), |(t, j)| {
    let phase = 0.37 * t as f64 * (j + 1) as f64 + j as f64;
    0.015 * phase.sin() + 0.004 * (1.3 * t as f64).cos() + 0.0004 * j as f64
  });
  let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
  Panel::new(
    start.iter_days().take(days).collect(),
    (0..ASSETS).map(|j| format!("A{j}")).collect(),
    values,
  )
  .unwrap()
}

fn bench_tangency(c: &mut Criterion) {
  let mut group = c.benchmark_group("Tangency");
  let config = SolverConfig::default();

  for days in [90, 365, 1460] {
    let table = returns(days);
    group.bench_with_input(BenchmarkId::new("optimize", days), &table, |b, table| {
      b.iter(|| black_box(optimize_tangency(table, 0.031, PERIODS_PER_YEAR, &config).unwrap()));
    });
  }

  group.finish();
}

fn bench_decomposition(c: &mut Criterion) {
  let table = returns(365);
  c.bench_function("decompose_365", |b| {
    b.iter(|| black_box(decompose(&table, "A0", 0.031, PERIODS_PER_YEAR).unwrap()));
  });
}

criterion_group!(benches, bench_tangency, bench_decomposition);
criterion_main!(benches);
