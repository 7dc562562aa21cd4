use unweighted::callbacks::SimpleCumulativeCallback;
use unweighted::core::*;
use unweighted::integrators::plain::*;

use rand_pcg::Pcg64;

struct MyIntegrand;

/// Integrating the function x^2 from x=1 to x=3, which gives 26/3. The unit interval is mapped
/// onto [1, 3) with the Jacobian 2.
impl Integrand<f64> for MyIntegrand {
    fn call(&self, x: &[f64]) -> std::result::Result<f64, IntegrandError> {
        let y = 2.0 * x[0] + 1.0;
        Ok(2.0 * y.powi(2))
    }

    /// The dimension of the integrand.
    ///
    /// This method is called by the integrator to decide how many random numbers to generate.
    fn dim(&self) -> usize {
        1
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // Initialize the random number generator.
    let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);

    let results_per_iteration = integrate(
        &MyIntegrand,
        &rng,
        &SimpleCumulativeCallback {},
        4,
        &[100_000, 100_000, 100_000, 100_000],
    )?;

    let final_result = combine(&results_per_iteration);

    println!(
        "\n{} +- {} (chi2/dof = {})",
        final_result.value, final_result.error, final_result.chi2_dof
    );

    Ok(())
}
