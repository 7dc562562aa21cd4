use criterion::{criterion_group, criterion_main, Criterion};

use unweighted::callbacks::SinkCallback;
use unweighted::config::VegasParameters;
use unweighted::core::*;
use unweighted::generation::{warmup, Grid, UnweightedGenerator};
use unweighted::integrators::{plain, vegas};

use rand_pcg::Pcg64;

/// A Gaussian bump in three dimensions.
struct MyIntegrand;

impl Integrand<f64> for MyIntegrand {
    fn call(&self, x: &[f64]) -> std::result::Result<f64, IntegrandError> {
        let r2: f64 = x.iter().map(|x| (x - 0.5).powi(2)).sum();
        Ok((-r2 / 0.02).exp())
    }

    fn dim(&self) -> usize {
        3
    }
}

fn benchmark_plain() {
    // initialize the random number generator
    let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);

    let _ = plain::integrate(&MyIntegrand, &rng, &SinkCallback {}, 1, &[1000, 1000]);
}

fn benchmark_vegas() {
    let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
    let parameters = VegasParameters {
        warmup_calls: 1000,
        max_iterations: 3,
        ..VegasParameters::default()
    };

    if let Ok(mut vegas) = vegas::Vegas::<f64>::new(3, &parameters) {
        let _ = vegas.integrate(&MyIntegrand, &rng, &SinkCallback {}, 5000);
    }
}

fn benchmark_warmup(grid: &mut Grid<f64>) {
    let mut rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);

    let _ = warmup(grid, &MyIntegrand, &mut rng, 100);
}

fn criterion_integration_benchmark(c: &mut Criterion) {
    c.bench_function("plain gaussian", |b| b.iter(benchmark_plain));
    c.bench_function("vegas gaussian", |b| b.iter(benchmark_vegas));
}

fn criterion_generation_benchmark(c: &mut Criterion) {
    let mut grid = Grid::new(3, 3).unwrap();
    c.bench_function("warm-up 27 cells", |b| b.iter(|| benchmark_warmup(&mut grid)));

    let mut rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
    warmup(&mut grid, &MyIntegrand, &mut rng, 100).unwrap();
    let mut generator = UnweightedGenerator::new(3, None);

    c.bench_function("unweighted event", |b| {
        b.iter(|| generator.next(&MyIntegrand, &mut grid, &mut rng))
    });
}

criterion_group!(
    benches,
    criterion_integration_benchmark,
    criterion_generation_benchmark
);
criterion_main!(benches);
