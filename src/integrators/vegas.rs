//! VEGAS integrator: importance sampling with one adaptive grid per axis.
//!
//! Every iteration samples the integrand through the current grids and accumulates, per axis and
//! per bin, the squared Jacobian-weighted values. The grids are then refined so that all bins
//! carry the same share of that quantity. A first warm-up iteration only shapes the grids; the
//! following iterations are combined with inverse-variance weights until their $\chi^2$ per degree
//! of freedom is compatible with one.
use crate::callbacks::Callback;
use crate::config::VegasParameters;
use crate::core::estimators::*;
use crate::core::*;

use num_traits::{Float, FromPrimitive};
use rand::distributions::{Distribution, Standard};
use rand::Rng;

/// Checkpoint type produced by the VEGAS integrator.
pub type VegasCheckpoint<R, T> = Checkpoint<R, IterationEstimators<T>>;

/// The adaptive grid of a single axis.
#[derive(Debug, Clone)]
pub struct AxisGrid<T> {
    /// The bin edges, `bins + 1` of them, from zero to one.
    edges: Vec<T>,
    /// Accumulated importance of every bin during the current iteration.
    importance: Vec<T>,
    alpha: T,
}

impl<T: Float + FromPrimitive> AxisGrid<T> {
    /// Creates a uniform grid with `bins` bins and damping exponent `alpha`.
    pub fn new(bins: usize, alpha: T) -> Self {
        let n = to_float::<T>(bins);
        Self {
            edges: (0..=bins).map(|i| to_float::<T>(i) / n).collect(),
            importance: vec![T::zero(); bins],
            alpha,
        }
    }

    /// Returns the number of bins.
    pub fn bins(&self) -> usize {
        self.importance.len()
    }

    /// Returns the bin edges.
    pub fn edges(&self) -> &[T] {
        &self.edges
    }

    /// Maps the uniform number `y` onto the grid. Returns the bin, the mapped coordinate and the
    /// Jacobian of the mapping.
    pub fn map(&self, y: T) -> (usize, T, T) {
        let bins = self.bins();
        let n = to_float::<T>(bins);
        let scaled = y * n;
        let bin = scaled.floor().to_usize().unwrap_or(0).min(bins - 1);
        let frac = scaled - to_float::<T>(bin);

        let width = self.edges[bin + 1] - self.edges[bin];

        (bin, self.edges[bin] + frac * width, width * n)
    }

    fn accumulate(&mut self, bin: usize, value: T) {
        self.importance[bin] = self.importance[bin] + value;
    }

    /// Moves the bin edges so that every bin receives the same share of the smoothed and damped
    /// importance accumulated since the last refinement, then clears the importance.
    pub fn refine(&mut self) {
        let bins = self.bins();
        let d = std::mem::replace(&mut self.importance, vec![T::zero(); bins]);

        if bins < 2 {
            return;
        }

        let eight = to_float::<T>(8);
        let mut smoothed = d.clone();
        smoothed[0] = (to_float::<T>(7) * d[0] + d[1]) / eight;
        smoothed[bins - 1] = (d[bins - 2] + to_float::<T>(7) * d[bins - 1]) / eight;
        for i in 1..bins - 1 {
            smoothed[i] = (d[i - 1] + to_float::<T>(6) * d[i] + d[i + 1]) / eight;
        }

        let total = smoothed.iter().fold(T::zero(), |acc, &v| acc + v);
        if total <= T::zero() || !total.is_finite() {
            return;
        }
        let average = total / to_float::<T>(bins);

        let weights = smoothed
            .iter()
            .map(|&s| {
                if s <= T::zero() {
                    return T::zero();
                }
                let r = s / average;
                let w = ((r - T::one()) / r.ln()).powf(self.alpha);
                if w.is_finite() {
                    w
                } else {
                    T::one()
                }
            })
            .collect::<Vec<_>>();

        let total_weight = weights.iter().fold(T::zero(), |acc, &v| acc + v);
        if total_weight <= T::zero() {
            return;
        }
        let per_bin = total_weight / to_float::<T>(bins);

        let mut new_edges = self.edges.clone();
        let mut accumulated = T::zero();
        let mut old = 0;

        for (i, edge) in new_edges.iter_mut().enumerate().take(bins).skip(1) {
            let target = per_bin * to_float::<T>(i);
            while old < bins - 1 && accumulated + weights[old] < target {
                accumulated = accumulated + weights[old];
                old += 1;
            }
            let frac = if weights[old] > T::zero() {
                ((target - accumulated) / weights[old])
                    .max(T::zero())
                    .min(T::one())
            } else {
                T::zero()
            };
            *edge = self.edges[old] + frac * (self.edges[old + 1] - self.edges[old]);
        }

        self.edges = new_edges;
    }
}

fn to_float<T: FromPrimitive + Float>(n: usize) -> T {
    T::from_usize(n).unwrap_or_else(T::nan)
}

/// The VEGAS integrator state: the per-axis grids and the steering parameters.
#[derive(Debug, Clone)]
pub struct Vegas<T> {
    grids: Vec<AxisGrid<T>>,
    parameters: VegasParameters,
}

impl<T> Vegas<T>
where
    T: Float + FromPrimitive,
    Standard: Distribution<T>,
{
    /// Creates uniform grids for an integrand with `dim` dimensions.
    pub fn new(dim: usize, parameters: &VegasParameters) -> Result<Self> {
        if dim == 0 {
            return Err(Error::configuration("the integrand has no dimensions"));
        }
        parameters.validate()?;

        let alpha = T::from_f64(parameters.alpha)
            .ok_or_else(|| Error::configuration("alpha is not representable"))?;

        Ok(Self {
            grids: (0..dim)
                .map(|_| AxisGrid::new(parameters.bins, alpha))
                .collect(),
            parameters: parameters.clone(),
        })
    }

    /// Returns the grid of every axis.
    pub fn grids(&self) -> &[AxisGrid<T>] {
        &self.grids
    }

    /// Runs one iteration of `calls` evaluations starting from `rng`, then refines the grids.
    fn iteration<R, I>(&mut self, integrand: &I, rng: &R, calls: usize) -> Result<VegasCheckpoint<R, T>>
    where
        R: Clone + Rng,
        I: Integrand<T>,
    {
        let mut rng_after = rng.clone();
        let mut estimators = IterationEstimators::default();
        let mut x = vec![T::zero(); self.grids.len()];
        let mut bins = vec![0; self.grids.len()];

        for _ in 0..calls {
            let mut jacobian = T::one();
            for (axis, grid) in self.grids.iter().enumerate() {
                let (bin, coordinate, jac) = grid.map(rng_after.gen());
                bins[axis] = bin;
                x[axis] = coordinate;
                jacobian = jacobian * jac;
            }

            let value = evaluate(integrand, &x)? * jacobian;
            estimators.update(value);

            if value.is_finite() {
                let squared = value * value;
                for (grid, &bin) in self.grids.iter_mut().zip(bins.iter()) {
                    grid.accumulate(bin, squared);
                }
            }
        }

        self.grids.iter_mut().for_each(AxisGrid::refine);

        Ok(Checkpoint::new(rng.clone(), rng_after, estimators))
    }

    /// Integrates `integrand` with `calls` evaluations per iteration.
    ///
    /// Returns the checkpoints of the iterations entering the result (the warm-up iteration is not
    /// part of them); the last checkpoint holds the final state of the random number generator.
    pub fn integrate<R, I>(
        &mut self,
        integrand: &I,
        rng: &R,
        callback: &impl Callback<T, R, IterationEstimators<T>>,
        calls: usize,
    ) -> Result<Vec<VegasCheckpoint<R, T>>>
    where
        R: Clone + Rng,
        I: Integrand<T>,
    {
        if integrand.dim() != self.grids.len() {
            return Err(Error::configuration(format!(
                "integrand has {} dimensions, the grid {}",
                integrand.dim(),
                self.grids.len()
            )));
        }

        let warmup = self.iteration(integrand, rng, self.parameters.warmup_calls)?;
        tracing::info!(calls = self.parameters.warmup_calls, "finished the VEGAS warm-up");

        let iteration_calls = (calls / 5).max(2);
        let chi2_tolerance = self.parameters.chi2_cut - 1.0;
        let mut rng_global = warmup.rng_after().clone();
        let mut checkpoints = Vec::with_capacity(self.parameters.max_iterations);

        while checkpoints.len() < self.parameters.max_iterations {
            let checkpoint = self.iteration(integrand, &rng_global, iteration_calls)?;
            rng_global = checkpoint.rng_after().clone();
            checkpoints.push(checkpoint);
            callback.print(&checkpoints)?;

            let result = combine(&checkpoints);
            tracing::debug!(
                iteration = checkpoints.len(),
                chi2_dof = result.chi2_dof.to_f64().unwrap_or(f64::NAN),
                "VEGAS iteration finished"
            );

            let chi2 = result.chi2_dof.to_f64().unwrap_or(f64::NAN);
            if checkpoints.len() > 1 && (chi2 - 1.0).abs() <= chi2_tolerance {
                break;
            }
        }

        Ok(checkpoints)
    }
}

/// Combine the iterations with inverse-variance weights.
pub fn combine<R, T>(checkpoints: &[VegasCheckpoint<R, T>]) -> IntegrationResult<T>
where
    T: Float + FromPrimitive,
{
    IntegrationResult::weighted_average(
        &checkpoints
            .iter()
            .map(|c| c.estimators().mean_var())
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::SinkCallback;
    use rand_pcg::Pcg64;

    // exp(-x^2 - y^2) over [-1, 1]^2, mapped onto the unit square
    struct GaussianIntegrand;

    impl Integrand<f64> for GaussianIntegrand {
        fn call(&self, x: &[f64]) -> std::result::Result<f64, IntegrandError> {
            let u = 2.0 * x[0] - 1.0;
            let v = 2.0 * x[1] - 1.0;
            Ok(4.0 * (-u * u - v * v).exp())
        }

        fn dim(&self) -> usize {
            2
        }
    }

    const GAUSSIAN_INTEGRAL: f64 = 2.230985;

    // a narrow peak at 0.3 in one dimension, normalised to one
    struct PeakIntegrand;

    impl Integrand<f64> for PeakIntegrand {
        fn call(&self, x: &[f64]) -> std::result::Result<f64, IntegrandError> {
            let width: f64 = 0.05;
            let norm = 1.0 / (width * (2.0 * std::f64::consts::PI).sqrt());
            Ok(norm * (-(x[0] - 0.3).powi(2) / (2.0 * width * width)).exp())
        }

        fn dim(&self) -> usize {
            1
        }
    }

    fn parameters() -> VegasParameters {
        VegasParameters {
            bins: 50,
            alpha: 1.5,
            warmup_calls: 10_000,
            chi2_cut: 1.5,
            max_iterations: 10,
        }
    }

    #[test]
    fn test_axis_grid_starts_uniform() {
        let grid = AxisGrid::<f64>::new(4, 1.5);

        assert_eq!(grid.edges(), &[0.0, 0.25, 0.5, 0.75, 1.0]);

        let (bin, x, jacobian) = grid.map(0.6);
        assert_eq!(bin, 2);
        assert!((x - 0.6).abs() < 1e-15);
        assert!((jacobian - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_refine_concentrates_bins() {
        let mut grid = AxisGrid::<f64>::new(10, 1.0);
        grid.accumulate(0, 100.0);
        for bin in 1..10 {
            grid.accumulate(bin, 1.0);
        }
        grid.refine();

        let edges = grid.edges();
        assert_eq!(edges[0], 0.0);
        assert_eq!(edges[10], 1.0);
        // edges stay ordered and the first bin got narrower
        assert!(edges.windows(2).all(|w| w[0] <= w[1]));
        assert!(edges[1] < 0.1);
    }

    #[test]
    fn test_refine_without_importance_keeps_grid() {
        let mut grid = AxisGrid::<f64>::new(5, 1.5);
        let before = grid.edges().to_vec();
        grid.refine();

        assert_eq!(grid.edges(), before.as_slice());
    }

    #[test]
    fn test_integrate_gaussian() {
        let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
        let mut vegas = Vegas::new(2, &parameters()).unwrap();
        let chkpts = vegas
            .integrate(&GaussianIntegrand, &rng, &SinkCallback {}, 100_000)
            .unwrap();
        let result = combine(&chkpts);

        assert!(!chkpts.is_empty());
        assert!(
            (result.value - GAUSSIAN_INTEGRAL).abs() < 5.0 * result.error + 1e-4,
            "{} +- {}",
            result.value,
            result.error
        );
    }

    #[test]
    fn test_integrate_peak() {
        let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
        let mut vegas = Vegas::new(1, &parameters()).unwrap();
        let chkpts = vegas
            .integrate(&PeakIntegrand, &rng, &SinkCallback {}, 50_000)
            .unwrap();
        let result = combine(&chkpts);

        assert!((result.value - 1.0).abs() < 0.01, "{}", result.value);
        // the adapted grid is finer around the peak than far away from it
        let edges = vegas.grids()[0].edges();
        let widths = edges.windows(2).map(|w| w[1] - w[0]).collect::<Vec<_>>();
        let peak_bin = edges.iter().position(|&e| e > 0.3).unwrap() - 1;
        assert!(widths[peak_bin] < widths[widths.len() - 1]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
        let mut vegas = Vegas::<f64>::new(3, &parameters()).unwrap();
        let result = vegas.integrate(&GaussianIntegrand, &rng, &SinkCallback {}, 1_000);

        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
