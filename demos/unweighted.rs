use unweighted::callbacks::SimpleCallback;
use unweighted::config::IntegratorType;
use unweighted::core::*;
use unweighted::{Run, RunParameters};

use rand_pcg::Pcg64;
use std::env;
use std::path::Path;

/// A two-dimensional weight function with a ridge along the diagonal.
struct Ridge;

impl Integrand<f64> for Ridge {
    fn call(&self, x: &[f64]) -> std::result::Result<f64, IntegrandError> {
        let d = x[0] - x[1];
        Ok((-d * d / 0.01).exp() * (1.0 + x[0]))
    }

    fn dim(&self) -> usize {
        2
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // parameters may be given as a JSON file
    let mut parameters = match env::args().nth(1) {
        Some(path) => RunParameters::load(Path::new(&path))?,
        None => RunParameters::default(),
    };
    parameters.integration.integrator = IntegratorType::Vegas;
    parameters.generation.bins_per_axis = 8;
    parameters.generation.print_every = 2_000;

    let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
    let mut run = Run::new(Ridge, parameters, rng)?;

    run.compute_integral_with(&SimpleCallback {})?;

    // project the events onto the distance from the diagonal
    let mut histogram = [0_usize; 20];
    run.generate(10_000, |event, _| {
        let d = (event.point[0] - event.point[1] + 1.0) / 2.0;
        histogram[((d * 20.0) as usize).min(19)] += 1;
    })?;

    let stats = run.stats();
    println!(
        "{} events in {:.3} s",
        stats.events,
        stats.time.as_secs_f64()
    );

    for (bin, count) in histogram.iter().enumerate() {
        println!("{:5.2} {}", -1.0 + 0.1 * bin as f64, "#".repeat(count / 50));
    }

    Ok(())
}
