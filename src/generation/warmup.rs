//! Exploration of the integrand before the generation starts.
use super::grid::Grid;
use crate::core::*;

use num_traits::{Float, FromPrimitive};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Statistics collected while warming up a grid.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct WarmupSummary<T> {
    /// Average function value over all cells.
    pub average: T,
    /// Average squared function value.
    pub average_squared: T,
    /// Standard deviation of the function values over the whole hypercube.
    pub sigma: T,
    /// Square root of the average per-cell variance.
    pub average_sigma: T,
    /// Largest function value found.
    pub max_value: T,
    /// Average cell ceiling divided by the average function value.
    pub average_inefficiency: T,
    /// Global ceiling divided by the average function value.
    pub overall_inefficiency: T,
}

/// Resets `grid` and samples `points_per_cell` points in every cell, raising the cell ceilings
/// to the largest weight found. Afterwards the grid is prepared for the generation.
///
/// Warming up twice with identically seeded generators gives identical grids.
pub fn warmup<T, R, I>(
    grid: &mut Grid<T>,
    integrand: &I,
    rng: &mut R,
    points_per_cell: usize,
) -> Result<WarmupSummary<T>>
where
    T: Display + Float + FromPrimitive,
    R: Rng,
    I: Integrand<T> + ?Sized,
    Standard: Distribution<T>,
{
    if points_per_cell == 0 {
        return Err(Error::configuration("the number of points per cell must be positive"));
    }
    if integrand.dim() != grid.dim() {
        return Err(Error::configuration(format!(
            "integrand has {} dimensions, the grid {}",
            integrand.dim(),
            grid.dim()
        )));
    }

    tracing::info!(
        cells = grid.size(),
        points_per_cell,
        "preparing the grid for the generation of unweighted events"
    );

    grid.reset();

    let inv_points = as_float::<T>(points_per_cell).recip();
    let mut point = vec![T::zero(); grid.dim()];
    let mut sum = T::zero();
    let mut sum2 = T::zero();
    let mut sum2p = T::zero();

    for cell in 0..grid.size() {
        let mut fsum = T::zero();
        let mut fsum2 = T::zero();

        for _ in 0..points_per_cell {
            grid.shoot(rng, cell, &mut point);
            let weight = evaluate(integrand, &point)?;
            grid.set_value(cell, weight);

            if weight.is_finite() {
                fsum = fsum + weight;
                fsum2 = fsum2 + weight * weight;
            }
        }

        let av = fsum * inv_points;
        let av2 = fsum2 * inv_points;
        let sig2 = av2 - av * av;
        sum = sum + av;
        sum2 = sum2 + av2;
        sum2p = sum2p + sig2;

        let fmax = grid.max_value(cell);
        let eff = if fmax != T::zero() { av / fmax } else { T::zero() };
        tracing::trace!(
            "cell {} with n-vector {:?}: av = {}, sig = {}, fmax = {}, eff = {}",
            cell,
            grid.coordinates(cell),
            av,
            sig2.max(T::zero()).sqrt(),
            fmax,
            eff
        );
    }

    let inv_cells = as_float::<T>(grid.size()).recip();
    let average = sum * inv_cells;
    let average_squared = sum2 * inv_cells;
    let mean_cell_max = (0..grid.size())
        .map(|cell| grid.max_value(cell))
        .fold(T::zero(), |acc, v| acc + v)
        * inv_cells;

    let summary = WarmupSummary {
        average,
        average_squared,
        sigma: (average_squared - average * average).max(T::zero()).sqrt(),
        average_sigma: (sum2p * inv_cells).max(T::zero()).sqrt(),
        max_value: grid.global_max(),
        average_inefficiency: mean_cell_max / average,
        overall_inefficiency: grid.global_max() / average,
    };

    tracing::debug!(
        "average function value = {}, average squared function value = {}, overall standard \
         deviation = {}, average standard deviation = {}, maximum function value = {}, average \
         inefficiency = {}, overall inefficiency = {}",
        summary.average,
        summary.average_squared,
        summary.sigma,
        summary.average_sigma,
        summary.max_value,
        summary.average_inefficiency,
        summary.overall_inefficiency
    );

    grid.set_prepared(true);
    tracing::info!("finished the grid preparation");

    Ok(summary)
}

fn as_float<T: Float + FromPrimitive>(n: usize) -> T {
    T::from_usize(n).unwrap_or_else(T::nan)
}
