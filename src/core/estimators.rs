//! This module contains everything related to estimators.
use num_traits::{Float, FromPrimitive};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Basic estimators, like the mean, variance, and the standard deviation.
pub trait BasicEstimators<T: Float> {
    /// Returns the mean value.
    fn mean(&self) -> T;

    /// Returns the variance of the mean, $V$.
    fn var(&self) -> T;

    /// Returns the standard deviation, $\sigma = \sqrt{V}$.
    fn std(&self) -> T {
        self.var().sqrt()
    }
}

/// More estimators.
pub trait Estimators<T: Float>: BasicEstimators<T> {
    /// Returns the number of times $N$, the integrand has been called.
    fn calls(&self) -> usize;

    /// Returns the number of times, $N_\mathrm{nf}$, the integrand has been called
    /// and its return value was non-finite.
    fn non_finite_calls(&self) -> usize;

    /// Returns the number of times, $N_\mathrm{nz}$, the integrand has been called
    /// and its return value was non-zero.
    fn non_zero_calls(&self) -> usize;
}

/// Everything that can be updated call by call.
pub trait Updateable<T> {
    /// Update the estimators with the (already Jacobian-weighted) `value` of one call.
    fn update(&mut self, value: T);
}

/// A struct implementing the `BasicEstimator<T>` trait.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct MeanVar<T> {
    mean: T,
    var: T,
}

impl<T: std::ops::Add<Output = T>> Add for MeanVar<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            mean: self.mean + other.mean,
            var: self.var + other.var,
        }
    }
}

impl<T: std::ops::Add<Output = T> + AddAssign> AddAssign for MeanVar<T> {
    fn add_assign(&mut self, other: Self) {
        self.mean += other.mean;
        self.var += other.var;
    }
}

impl<T> MeanVar<T> {
    /// Constructor.
    pub const fn new(mean: T, var: T) -> Self {
        Self { mean, var }
    }
}

impl<T: Float> BasicEstimators<T> for MeanVar<T> {
    fn mean(&self) -> T {
        self.mean
    }

    fn var(&self) -> T {
        self.var
    }
}

/// Sums collected during one integration iteration.
///
/// Non-finite values are counted but not summed, so a single `nan` in an extreme corner of the
/// integration domain does not destroy the estimate.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IterationEstimators<T> {
    sum: T,
    sumsq: T,
    calls: usize,
    non_finite_calls: usize,
    non_zero_calls: usize,
}

impl<T: Float> Default for IterationEstimators<T> {
    fn default() -> Self {
        Self {
            sum: T::zero(),
            sumsq: T::zero(),
            calls: 0,
            non_finite_calls: 0,
            non_zero_calls: 0,
        }
    }
}

impl<T: Float> Add for IterationEstimators<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            sumsq: self.sumsq + other.sumsq,
            calls: self.calls + other.calls,
            non_finite_calls: self.non_finite_calls + other.non_finite_calls,
            non_zero_calls: self.non_zero_calls + other.non_zero_calls,
        }
    }
}

impl<T: Float> Updateable<T> for IterationEstimators<T> {
    fn update(&mut self, value: T) {
        self.calls += 1;

        if value != T::zero() {
            self.non_zero_calls += 1;

            if value.is_finite() {
                self.sum = self.sum + value;
                self.sumsq = self.sumsq + value * value;
            } else {
                self.non_finite_calls += 1;
            }
        }
    }
}

impl<T> IterationEstimators<T>
where
    T: Float + FromPrimitive,
{
    fn calls_as_float(&self) -> T {
        T::from_usize(self.calls).unwrap_or_else(T::nan)
    }

    /// Returns the estimate as a `MeanVar`.
    pub fn mean_var(&self) -> MeanVar<T> {
        MeanVar::new(self.mean(), self.var())
    }
}

impl<T> BasicEstimators<T> for IterationEstimators<T>
where
    T: Float + FromPrimitive,
{
    fn mean(&self) -> T {
        self.sum / self.calls_as_float()
    }

    fn var(&self) -> T {
        let calls = self.calls_as_float();
        (self.sumsq - self.sum * self.sum / calls) / calls / (calls - T::one())
    }
}

impl<T> Estimators<T> for IterationEstimators<T>
where
    T: Float + FromPrimitive,
{
    fn calls(&self) -> usize {
        self.calls
    }

    fn non_finite_calls(&self) -> usize {
        self.non_finite_calls
    }

    fn non_zero_calls(&self) -> usize {
        self.non_zero_calls
    }
}

/// Final estimate of an integral.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct IntegrationResult<T> {
    /// The estimated value of the integral.
    pub value: T,
    /// The estimated absolute error (one standard deviation).
    pub error: T,
    /// The $\chi^2$ per degree of freedom of the combined iterations, zero if only one iteration
    /// entered the result.
    pub chi2_dof: T,
}

impl<T: Float + FromPrimitive> IntegrationResult<T> {
    /// Combines iteration estimates with inverse-variance weights. Iterations with a vanishing
    /// variance carry no information about the error and are skipped.
    pub fn weighted_average(iterations: &[MeanVar<T>]) -> Self {
        let (weighted_sum, total_weight) = iterations
            .iter()
            .filter(|mv| mv.var() > T::zero())
            .fold((T::zero(), T::zero()), |(sum, total), mv| {
                let weight = mv.var().recip();
                (sum + mv.mean() * weight, total + weight)
            });

        if total_weight == T::zero() {
            return Self {
                value: iterations.last().map_or_else(T::zero, |mv| mv.mean()),
                error: T::zero(),
                chi2_dof: T::zero(),
            };
        }

        let value = weighted_sum / total_weight;
        let error = total_weight.recip().sqrt();

        let (chi2, used) = iterations
            .iter()
            .filter(|mv| mv.var() > T::zero())
            .fold((T::zero(), 0_usize), |(chi2, used), mv| {
                (chi2 + (mv.mean() - value).powi(2) / mv.var(), used + 1)
            });

        let chi2_dof = if used > 1 {
            chi2 / T::from_usize(used - 1).unwrap_or_else(T::one)
        } else {
            T::zero()
        };

        Self {
            value,
            error,
            chi2_dof,
        }
    }
}
