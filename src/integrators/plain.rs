//! Plain integrator
use crate::callbacks::Callback;
use crate::core::estimators::*;
use crate::core::*;

use num_traits::{Float, FromPrimitive};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::Serialize;

use crossbeam as cb;

/// Checkpoint type produced by the plain integrator.
pub type PlainCheckpoint<R, T> = Checkpoint<R, IterationEstimators<T>>;

/// Perform part of the integration of a given integration on a specific `core`.
fn perform_iteration_contribution_from_core<T, R, I>(
    integrand: &I,
    mut rng: R,
    calls: usize,
    core: usize,
    n_cores: usize,
) -> Result<IterationEstimators<T>>
where
    I: Integrand<T>,
    T: Float + FromPrimitive + Send + Sync,
    R: Rng,
    Standard: Distribution<T>,
{
    let calls_per_core = compute_calls_for_core(0, n_cores, calls);

    // determine how many calls to the random number generator to skip
    let skip = calls_per_core * core * integrand.dim();

    for _ in 0..skip {
        let _ = rng.gen::<T>();
    }

    // in the last iteration, not all calls might be needed
    let actual_calls = compute_calls_for_core(core, n_cores, calls);

    // create a buffer for the sampled random variables such that
    // we do not need to allocate vectors in every call
    let mut x = vec![T::zero(); integrand.dim()];
    let mut estimators = IterationEstimators::default();

    for _ in 0..actual_calls {
        x.iter_mut().for_each(|v| *v = rng.gen());
        estimators.update(evaluate(integrand, &x)?);
    }

    Ok(estimators)
}

/// Perform a single iteration of integrating the `integrand` on `n_cores` cores using `calls` samples.
fn integrate_iteration<T, R, I>(
    integrand: &I,
    rng: &R,
    n_cores: usize,
    calls: usize,
) -> Result<PlainCheckpoint<R, T>>
where
    I: Integrand<T>,
    T: Float + FromPrimitive + Send + Sync,
    R: Clone + Rng + Send + Sync,
    Standard: Distribution<T>,
{
    let mut rng_global = rng.clone();

    // distribute the workload evenly across the cores
    let collect_results = cb::thread::scope(|s| {
        let mut handles = Vec::with_capacity(n_cores);

        for core in 0..n_cores {
            // Needs to be defined before spawning the thread
            let rng_local = rng_global.clone();

            handles.push(s.spawn(move |_| {
                perform_iteration_contribution_from_core(integrand, rng_local, calls, core, n_cores)
            }));
        }

        // wait for the threads to finish
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            })
            .collect::<Vec<_>>()
    })
    .unwrap_or_else(|payload| std::panic::resume_unwind(payload));

    // accumulate the intermediate results
    let accumulate = collect_results
        .into_iter()
        .try_fold(IterationEstimators::<T>::default(), |acc, r| {
            r.map(|e| acc + e)
        })?;

    // return the updated rng
    for _ in 0..calls * integrand.dim() {
        let _ = rng_global.gen::<T>();
    }

    Ok(Checkpoint::new(rng.clone(), rng_global, accumulate))
}

/// Integrate the `integrand` using `n_cores` cores.
///
/// The random number generator in its initial state is provided in `rng`
/// together with a `callback` function that reports estimates after each
/// iteration.
/// The number of calls of the integrand per iteration is stored in the slice
/// `iterations`. The results do not depend on `n_cores`.
pub fn integrate<T, R, I>(
    integrand: &I,
    rng: &R,
    callback: &impl Callback<T, R, IterationEstimators<T>>,
    n_cores: usize,
    iterations: &[usize],
) -> Result<Vec<PlainCheckpoint<R, T>>>
where
    I: Integrand<T>,
    T: Float + FromPrimitive + Send + Sync,
    R: Clone + Rng + Send + Sync + Serialize,
    Standard: Distribution<T>,
{
    if n_cores == 0 {
        return Err(Error::configuration("at least one core is needed"));
    }

    // storage for the results of each iteration
    let mut checkpoints = Vec::with_capacity(iterations.len());

    let mut rng_global = rng.clone();

    // Integration iterations are treated sequentially
    for calls in iterations {
        let checkpoint = integrate_iteration(integrand, &rng_global, n_cores, *calls)?;
        // synchronize the random number generation
        rng_global = checkpoint.rng_after().clone();

        checkpoints.push(checkpoint);
        callback.print(&checkpoints)?;
    }

    Ok(checkpoints)
}

/// Continue an integration from the last of the given `checkpoints`, performing the additional
/// `iterations`. The returned vector contains the old checkpoints followed by the new ones.
pub fn resume_integration_from_checkpoints<T, R, I>(
    integrand: &I,
    mut checkpoints: Vec<PlainCheckpoint<R, T>>,
    callback: &impl Callback<T, R, IterationEstimators<T>>,
    n_cores: usize,
    iterations: &[usize],
) -> Result<Vec<PlainCheckpoint<R, T>>>
where
    I: Integrand<T>,
    T: Float + FromPrimitive + Send + Sync,
    R: Clone + Rng + Send + Sync + Serialize,
    Standard: Distribution<T>,
{
    if checkpoints.is_empty() {
        return Err(Error::configuration("no checkpoint to resume from"));
    }

    for calls in iterations {
        let rng_before = checkpoints[checkpoints.len() - 1].rng_after().clone();
        let checkpoint = integrate_iteration(integrand, &rng_before, n_cores, *calls)?;

        checkpoints.push(checkpoint);
        callback.print(&checkpoints)?;
    }

    Ok(checkpoints)
}

/// Combine all iterations into a single estimate by pooling their calls.
pub fn combine<R, T>(checkpoints: &[PlainCheckpoint<R, T>]) -> IntegrationResult<T>
where
    T: Float + FromPrimitive,
{
    let pooled = checkpoints
        .iter()
        .map(|c| c.estimators().clone())
        .fold(IterationEstimators::default(), |acc, e| acc + e);
    let per_iteration = checkpoints
        .iter()
        .map(|c| c.estimators().mean_var())
        .collect::<Vec<_>>();

    IntegrationResult {
        value: pooled.mean(),
        error: pooled.std(),
        chi2_dof: IntegrationResult::weighted_average(&per_iteration).chi2_dof,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{FileWriterCallback, SinkCallback};
    use crate::integrators::plain;
    use rand::Rng;
    use rand_pcg::Pcg64;
    use serde::Serialize;
    use std::fs::read_to_string;
    use tempfile::NamedTempFile;

    use assert_approx_eq::assert_approx_eq;

    fn assert_eq_rng<R>(lhs: &R, rhs: &R)
    where
        R: Rng + Serialize,
    {
        assert_eq!(
            serde_json::to_string(lhs).unwrap(),
            serde_json::to_string(rhs).unwrap()
        );
    }

    // the integral of |2x - 1| over [0, 1) is 1/2
    struct MyIntegrand {}

    impl Integrand<f64> for MyIntegrand {
        fn call(&self, x: &[f64]) -> std::result::Result<f64, IntegrandError> {
            Ok((2.0 * x[0] - 1.0).abs())
        }

        fn dim(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_plain_iteration() {
        let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);

        let chkpt = plain::integrate(&MyIntegrand {}, &rng, &SinkCallback {}, 1, &[10_000]).unwrap();

        assert_eq!(chkpt[0].estimators().calls(), 10_000);
        assert_eq!(chkpt[0].estimators().non_finite_calls(), 0);
        assert_eq_rng(chkpt[0].rng_before(), &rng);

        // every call draws one random number
        let mut rng_after = rng.clone();
        for _ in 0..10_000 {
            let _: f64 = rng_after.gen();
        }
        assert_eq_rng(chkpt[0].rng_after(), &rng_after);

        let estimators = chkpt[0].estimators();
        assert!((estimators.mean() - 0.5).abs() < 5.0 * estimators.std());
    }

    #[test]
    fn test_result_independent_of_cores() {
        let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);

        let single = plain::integrate(&MyIntegrand {}, &rng, &SinkCallback {}, 1, &[1_000]).unwrap();
        let multi = plain::integrate(&MyIntegrand {}, &rng, &SinkCallback {}, 3, &[1_000]).unwrap();

        assert_eq!(single[0].estimators().calls(), multi[0].estimators().calls());
        assert_approx_eq!(
            single[0].estimators().mean(),
            multi[0].estimators().mean(),
            1e-14
        );
        assert_eq_rng(single[0].rng_after(), multi[0].rng_after());
    }

    #[test]
    fn test_resume_from_checkpoint() {
        let callback = SinkCallback {};
        let iterations = vec![1000, 1000, 1000, 1000];
        let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);

        let result_4_it = plain::integrate(&MyIntegrand {}, &rng, &callback, 1, &iterations).unwrap();

        // resume after the second iteration
        let resumed = plain::resume_integration_from_checkpoints(
            &MyIntegrand {},
            result_4_it[..2].to_vec(),
            &callback,
            1,
            &iterations[2..4],
        )
        .unwrap();

        assert_eq!(resumed.len(), 4);
        assert_eq_rng(result_4_it[3].rng_after(), resumed[3].rng_after());
        assert_eq!(
            result_4_it[3].estimators().mean(),
            resumed[3].estimators().mean()
        );
        assert_eq!(
            result_4_it[3].estimators().var(),
            resumed[3].estimators().var()
        );
    }

    #[test]
    fn test_resume_without_checkpoint() {
        let result = plain::resume_integration_from_checkpoints(
            &MyIntegrand {},
            Vec::<PlainCheckpoint<Pcg64, f64>>::new(),
            &SinkCallback {},
            1,
            &[10],
        );

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_write_checkpoint_to_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path();
        let iterations = vec![1000, 100];
        let callback = FileWriterCallback::new(path);
        let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);

        let original = plain::integrate(&MyIntegrand {}, &rng, &callback, 1, &iterations).unwrap();

        let chkpt_file = read_to_string(&path).expect("Unable to read checkpoint file");
        let chkpts: Vec<PlainCheckpoint<Pcg64, f64>> =
            serde_json::from_str(&chkpt_file).expect("Unable to deserialize checkpoint from json.");

        assert_eq!(original.len(), chkpts.len());

        for (read, written) in chkpts.iter().zip(original.iter()) {
            assert_eq!(read.estimators(), written.estimators());
            assert_eq_rng(read.rng_after(), written.rng_after());
        }

        // checkpoints read back from the file resume the integration
        let resumed = plain::resume_integration_from_checkpoints(
            &MyIntegrand {},
            chkpts[..1].to_vec(),
            &SinkCallback {},
            1,
            &iterations[1..],
        )
        .unwrap();

        assert_eq!(resumed[1].estimators(), original[1].estimators());
        assert_eq_rng(resumed[1].rng_after(), original[1].rng_after());
    }

    #[test]
    fn test_combine() {
        let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
        let chkpts =
            plain::integrate(&MyIntegrand {}, &rng, &SinkCallback {}, 2, &[5_000, 5_000]).unwrap();

        let result = plain::combine(&chkpts);
        let first = chkpts[0].estimators().mean();
        let second = chkpts[1].estimators().mean();

        // equal numbers of calls: the pooled mean is the plain average
        assert_approx_eq!(result.value, 0.5 * (first + second), 1e-14);
        assert!(result.error < chkpts[0].estimators().std());
        assert!((result.value - 0.5).abs() < 5.0 * result.error);
    }

    #[test]
    fn test_zero_cores() {
        let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
        let result = plain::integrate(&MyIntegrand {}, &rng, &SinkCallback {}, 0, &[10]);

        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
