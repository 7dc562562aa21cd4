//! Integrators computing the cross section.
pub mod plain;
pub mod vegas;

use crate::callbacks::Callback;
use crate::config::{IntegrationParameters, IntegratorType};
use crate::core::estimators::{IntegrationResult, IterationEstimators};
use crate::core::{Checkpoint, Integrand, Result};

use num_traits::{Float, FromPrimitive};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::Serialize;

/// Integrates `integrand` with the algorithm selected in `parameters`, starting from the random
/// number generator `rng`. Returns the combined result together with the checkpoint of every
/// iteration that entered it.
pub fn integrate<T, R, I>(
    integrand: &I,
    rng: &R,
    parameters: &IntegrationParameters,
    callback: &impl Callback<T, R, IterationEstimators<T>>,
) -> Result<(
    IntegrationResult<T>,
    Vec<Checkpoint<R, IterationEstimators<T>>>,
)>
where
    I: Integrand<T>,
    T: Float + FromPrimitive + Send + Sync,
    R: Clone + Rng + Send + Sync + Serialize,
    Standard: Distribution<T>,
{
    parameters.validate()?;

    match parameters.integrator {
        IntegratorType::Plain => {
            let iterations = vec![parameters.calls; parameters.iterations];
            let checkpoints =
                plain::integrate(integrand, rng, callback, parameters.n_cores, &iterations)?;

            Ok((plain::combine(&checkpoints), checkpoints))
        }
        IntegratorType::Vegas => {
            let mut vegas = vegas::Vegas::new(integrand.dim(), &parameters.vegas)?;
            let checkpoints = vegas.integrate(integrand, rng, callback, parameters.calls)?;

            Ok((vegas::combine(&checkpoints), checkpoints))
        }
    }
}
