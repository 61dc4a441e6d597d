//! Benchmarks for minuit_optimiser.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use minuit_optimiser::diagnostics::NullSink;
use minuit_optimiser::{minimize, Algorithm, Hesse, MinimizerConfig, Minos, Strategy, UserParameterState};

fn rosenbrock(p: &[f64]) -> f64 {
    (1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2)
}

/// Diagonal quadratic `sum (i + 1) x_i^2` in `n` parameters.
fn quadratic(p: &[f64]) -> f64 {
    p.iter()
        .enumerate()
        .map(|(i, x)| (i + 1) as f64 * x * x)
        .sum()
}

fn start(n: usize, value: f64) -> UserParameterState {
    let mut st = UserParameterState::new();
    for i in 0..n {
        st.add(&format!("p{i}"), value, 0.1).unwrap();
    }
    st
}

fn benchmark_rosenbrock(c: &mut Criterion) {
    let mut st = UserParameterState::new();
    st.add("x", -1.2, 0.1).unwrap().add("y", 1.0, 0.1).unwrap();
    let config = MinimizerConfig::default().with_max_calls(5000);

    let mut group = c.benchmark_group("rosenbrock");
    for algorithm in [Algorithm::Migrad, Algorithm::Simplex, Algorithm::Combined] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{algorithm:?}")),
            &algorithm,
            |b, &algorithm| {
                b.iter(|| {
                    minimize(
                        &rosenbrock,
                        black_box(&st),
                        Strategy::medium(),
                        &config,
                        algorithm,
                        &NullSink,
                    )
                })
            },
        );
    }
    group.finish();
}

fn benchmark_migrad_dimension(c: &mut Criterion) {
    let mut group = c.benchmark_group("migrad_quadratic");

    for n in [2, 5, 10, 20] {
        let st = start(n, 1.0);
        group.bench_with_input(BenchmarkId::from_parameter(n), &st, |b, st| {
            b.iter(|| {
                minimize(
                    &quadratic,
                    black_box(st),
                    Strategy::medium(),
                    &MinimizerConfig::default(),
                    Algorithm::Migrad,
                    &NullSink,
                )
            })
        });
    }

    group.finish();
}

fn benchmark_hesse(c: &mut Criterion) {
    let mut group = c.benchmark_group("hesse");

    for n in [2, 5, 10] {
        let st = start(n, 0.5);
        let hesse = Hesse::new(Strategy::medium());
        group.bench_with_input(BenchmarkId::from_parameter(n), &st, |b, st| {
            b.iter(|| hesse.calculate_state(&quadratic, black_box(st), 1.0, 0, &NullSink))
        });
    }

    group.finish();
}

fn benchmark_minos(c: &mut Criterion) {
    let st = start(3, 1.0);
    let min = minimize(
        &quadratic,
        &st,
        Strategy::medium(),
        &MinimizerConfig::default(),
        Algorithm::Migrad,
        &NullSink,
    );
    let minos = Minos::new(&quadratic, &min, Strategy::medium()).with_sink(&NullSink);

    c.bench_function("minos_quadratic_3", |b| {
        b.iter(|| minos.minos(black_box(1), 1.0))
    });
}

criterion_group!(
    benches,
    benchmark_rosenbrock,
    benchmark_migrad_dimension,
    benchmark_hesse,
    benchmark_minos
);
criterion_main!(benches);
