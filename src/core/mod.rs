//! The core module
pub mod error;
pub mod estimators;

pub use crate::core::error::{Error, IntegrandError, Result};

use serde::{Deserialize, Serialize};

/// Integrand trait
///
/// The integrand is the weight function of the process: it maps a point of the unit hypercube
/// $[0,1)^d$ onto a non-negative weight. Weights smaller than or equal to zero mark points outside
/// of the physical region; they are never emitted as events.
pub trait Integrand<T: Copy>: Send + Sync {
    /// Evaluate the weight at the phase space point `x`, which has `dim()` coordinates.
    fn call(&self, x: &[T]) -> std::result::Result<T, IntegrandError>;

    /// The dimension of the integrand.
    fn dim(&self) -> usize;

    /// One-time preparation, run exactly once before the first evaluation of a run (e.g. fixing
    /// particle identities or the kinematics mode).
    fn prepare(&mut self) -> std::result::Result<(), IntegrandError> {
        Ok(())
    }
}

/// Evaluates `integrand` at `x`, lifting its failure into the crate error.
pub(crate) fn evaluate<T, I>(integrand: &I, x: &[T]) -> Result<T>
where
    T: Copy,
    I: Integrand<T> + ?Sized,
{
    integrand.call(x).map_err(Error::Integrand)
}

/// A checkpoint saves the state of the integrator after an iteration.
/// Checkpoints can be used to restart or resume iterations.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Checkpoint<R, E> {
    rng_before: R,
    rng_after: R,
    estimators: E,
}

impl<R, E> Checkpoint<R, E> {
    /// Constructor
    pub(crate) fn new(rng_before: R, rng_after: R, estimators: E) -> Self {
        Self {
            rng_before,
            rng_after,
            estimators,
        }
    }

    /// Returns the random number generator before generation of this checkpoint.
    pub fn rng_before(&self) -> &R {
        &self.rng_before
    }

    /// Returns the random number generator after generation of this checkpoint
    pub fn rng_after(&self) -> &R {
        &self.rng_after
    }

    /// Returns the estimators of this checkpoint.
    pub fn estimators(&self) -> &E {
        &self.estimators
    }

    /// Destructure the checkpoint and return its components.
    pub fn destructure(self) -> (R, R, E) {
        (self.rng_before, self.rng_after, self.estimators)
    }
}

/// Compute the number of calls on a given core, given the total number of cores
/// `n_cores`, the index `core` (zero-based) of the current thread as well as the
/// total number of calls `total_calls` to perform combined on all cores.
pub(crate) fn compute_calls_for_core(core: usize, n_cores: usize, total_calls: usize) -> usize {
    debug_assert!(core < n_cores);
    let calls_per_core = (total_calls + n_cores - 1) / n_cores;

    // the last cores may be left with fewer calls, or none at all
    total_calls
        .saturating_sub(core * calls_per_core)
        .min(calls_per_core)
}
