use unweighted::callbacks::{FileWriterCallback, SimpleCumulativeCallback};
use unweighted::config::{IntegrationParameters, IntegratorType, RunParameters};
use unweighted::core::*;
use unweighted::integrators::{self, plain};
use unweighted::Run;

use assert_approx_eq::assert_approx_eq;
use rand_pcg::Pcg64;
use std::fs::read_to_string;
use tempfile::NamedTempFile;

// |2x - 1|, integrating to 1/2
struct Abs;

impl Integrand<f64> for Abs {
    fn call(&self, x: &[f64]) -> std::result::Result<f64, IntegrandError> {
        Ok((2.0 * x[0] - 1.0).abs())
    }

    fn dim(&self) -> usize {
        1
    }
}

// a product of sines, integrating to (2/pi)^3
struct Sines;

impl Integrand<f64> for Sines {
    fn call(&self, x: &[f64]) -> std::result::Result<f64, IntegrandError> {
        Ok(x.iter()
            .map(|x| (std::f64::consts::PI * x).sin())
            .product())
    }

    fn dim(&self) -> usize {
        3
    }
}

#[test]
fn both_integrators_find_known_integral() {
    let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
    let exact = (2.0 / std::f64::consts::PI).powi(3);

    for &integrator in &[IntegratorType::Plain, IntegratorType::Vegas] {
        let parameters = IntegrationParameters {
            calls: 50_000,
            iterations: 4,
            n_cores: 2,
            integrator,
            ..IntegrationParameters::default()
        };

        let (result, _) =
            integrators::integrate(&Sines, &rng, &parameters, &SimpleCumulativeCallback {})
                .unwrap();

        assert!(
            (result.value - exact).abs() < 5.0 * result.error,
            "{:?}: {} +- {}",
            integrator,
            result.value,
            result.error
        );
    }
}

#[test]
fn run_writes_checkpoints() {
    let file = NamedTempFile::new().unwrap();
    let parameters = RunParameters::from_json(
        r#"{ "integration": { "calls": 2000, "iterations": 3, "n_cores": 2 } }"#,
    )
    .unwrap();
    let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);

    let mut run = Run::<f64, _, _>::new(Abs, parameters, rng).unwrap();
    let result = run
        .compute_integral_with(&FileWriterCallback::new(file.path()))
        .unwrap();

    let written: Vec<plain::PlainCheckpoint<Pcg64, f64>> =
        serde_json::from_str(&read_to_string(file.path()).unwrap()).unwrap();

    assert_eq!(written.len(), 3);
    assert_eq!(run.checkpoints().len(), 3);
    assert_approx_eq!(plain::combine(&written).value, result.value, 1e-15);
}
