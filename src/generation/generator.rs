//! Hit-or-miss generation of unweighted events on a warmed-up [`Grid`].
//!
//! A cell is chosen uniformly and accepted with probability `max_value(cell) / global_max()`;
//! a point drawn in the cell is then accepted with probability `weight / global_max()`. Whenever
//! an accepted weight exceeds the ceiling of its cell, the ceiling is raised and the events the
//! cell has been under-sampled by are made up for in a correction cycle, which runs before any
//! new cell is selected.
use super::grid::Grid;
use crate::core::*;

use num_traits::{Float, FromPrimitive};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// An unweighted event: a point of the unit hypercube and its weight.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Event<T> {
    /// The phase space point.
    pub point: Vec<T>,
    /// The weight of the integrand at `point`, always strictly positive.
    pub weight: T,
}

/// State of a cell whose ceiling was raised and that still owes events.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingCorrection<T> {
    /// The cell being corrected.
    pub cell: usize,
    /// Expected number of events the cell still owes.
    pub counter: T,
    /// Number of weights above the ceiling found during the correction, negated.
    pub counter2: T,
    /// The ceiling of the cell before it was raised.
    pub old_max: T,
    /// By how much the ceiling was raised.
    pub max_diff: T,
    /// Largest weight above the ceiling found during the correction.
    pub secondary_max: T,
}

/// Outcome of a single correction step.
#[derive(Clone, Debug, PartialEq)]
pub enum CorrectionStep<T> {
    /// A point of the corrected cell was accepted.
    Accepted(Event<T>),
    /// Nothing accepted, the correction goes on.
    Rejected,
    /// The correction is done; normal selection takes over.
    Exhausted,
}

/// Generator of unweighted events.
///
/// The generator owns the correction state only; the grid is passed into every call so that it
/// can be inspected between events.
#[derive(Clone, Debug)]
pub struct UnweightedGenerator<T> {
    pending: Option<PendingCorrection<T>>,
    point: Vec<T>,
    max_trials: Option<usize>,
}

impl<T> UnweightedGenerator<T>
where
    T: Display + Float + FromPrimitive,
    Standard: Distribution<T>,
{
    /// Creates a generator for integrands with `dim` dimensions. If `max_trials` is given, a
    /// call to [`next`](Self::next) fails after that many integrand evaluations without an
    /// accepted event.
    pub fn new(dim: usize, max_trials: Option<usize>) -> Self {
        Self {
            pending: None,
            point: vec![T::zero(); dim],
            max_trials,
        }
    }

    /// The correction currently in progress, if any.
    pub fn pending(&self) -> Option<&PendingCorrection<T>> {
        self.pending.as_ref()
    }

    /// Discards a pending correction.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Generates the next unweighted event.
    pub fn next<R, I>(&mut self, integrand: &I, grid: &mut Grid<T>, rng: &mut R) -> Result<Event<T>>
    where
        R: Rng,
        I: Integrand<T> + ?Sized,
    {
        if !grid.is_prepared() {
            return Err(Error::GridNotPrepared);
        }
        if grid.dim() != self.point.len() {
            return Err(Error::configuration(format!(
                "generator has {} dimensions, the grid {}",
                self.point.len(),
                grid.dim()
            )));
        }

        let mut trials = 0;

        while self.pending.is_some() {
            match self.correction_cycle(integrand, grid, rng, &mut trials)? {
                CorrectionStep::Accepted(event) => return Ok(event),
                CorrectionStep::Rejected => self.check_trials(trials)?,
                CorrectionStep::Exhausted => break,
            }
        }

        loop {
            let (cell, y) = select_cell(grid, rng);

            grid.shoot(rng, cell, &mut self.point);
            let weight = evaluate(integrand, &self.point)?;
            trials += 1;

            // non-physical points, non-finite weights and misses are retried silently
            if !is_physical(weight) || weight < y {
                self.check_trials(trials)?;
                continue;
            }

            self.maintain_ceiling(grid, cell, weight);

            return Ok(Event {
                point: self.point.clone(),
                weight,
            });
        }
    }

    /// Performs a single step of the pending correction. Returns
    /// [`CorrectionStep::Exhausted`] if no correction is pending.
    pub fn correction_cycle<R, I>(
        &mut self,
        integrand: &I,
        grid: &mut Grid<T>,
        rng: &mut R,
        trials: &mut usize,
    ) -> Result<CorrectionStep<T>>
    where
        R: Rng,
        I: Integrand<T> + ?Sized,
    {
        let pending = match self.pending.as_mut() {
            Some(pending) => pending,
            None => return Ok(CorrectionStep::Exhausted),
        };
        let cell = pending.cell;

        tracing::trace!(cell, counter = %pending.counter, "correction step");

        if pending.counter >= T::one() {
            pending.counter = pending.counter - T::one();
        }

        if rng.gen::<T>() < pending.counter {
            pending.counter = -T::one();

            grid.shoot(rng, cell, &mut self.point);
            let weight = evaluate(integrand, &self.point)?;
            *trials += 1;

            if !is_physical(weight) {
                return Ok(CorrectionStep::Rejected);
            }

            // the ceiling was exceeded again during the correction
            if weight > grid.max_value(cell) {
                pending.secondary_max = pending.secondary_max.max(weight);
                pending.counter2 = pending.counter2 - T::one();
                pending.counter = pending.counter + T::one();
            }

            let threshold = pending.old_max + rng.gen::<T>() * pending.max_diff;

            if weight >= threshold {
                return Ok(CorrectionStep::Accepted(Event {
                    point: self.point.clone(),
                    weight,
                }));
            }

            return Ok(CorrectionStep::Rejected);
        }

        if pending.secondary_max > grid.max_value(cell) {
            let candidate = pending.secondary_max;
            let (old_max, max_diff, counter) = raise_ceiling(grid, cell, candidate);

            pending.old_max = old_max;
            pending.max_diff = max_diff;
            pending.counter = counter - pending.counter2;
            pending.secondary_max = T::zero();
            pending.counter2 = T::zero();

            tracing::debug!(
                cell,
                ceiling = %candidate,
                counter = %pending.counter,
                "correction re-armed"
            );

            return Ok(CorrectionStep::Rejected);
        }

        self.pending = None;

        Ok(CorrectionStep::Exhausted)
    }

    fn maintain_ceiling(&mut self, grid: &mut Grid<T>, cell: usize, weight: T) {
        if weight <= grid.max_value(cell) {
            return;
        }

        let (old_max, max_diff, counter) = raise_ceiling(grid, cell, weight);
        let counter = counter - T::one();

        tracing::debug!(cell, ceiling = %weight, counter = %counter, "correction armed");

        self.pending = Some(PendingCorrection {
            cell,
            counter,
            counter2: T::zero(),
            old_max,
            max_diff,
            secondary_max: T::zero(),
        });
    }

    fn check_trials(&self, trials: usize) -> Result<()> {
        match self.max_trials {
            Some(max_trials) if trials >= max_trials => Err(Error::TooManyTrials(trials)),
            _ => Ok(()),
        }
    }
}

/// Only finite, strictly positive weights can become events.
fn is_physical<T: Float>(weight: T) -> bool {
    weight.is_finite() && weight > T::zero()
}

/// Selects a cell with probability proportional to its ceiling. Returns the cell and the
/// hit-or-miss threshold drawn below its ceiling.
fn select_cell<T, R>(grid: &mut Grid<T>, rng: &mut R) -> (usize, T)
where
    T: Float + FromPrimitive,
    R: Rng,
    Standard: Distribution<T>,
{
    loop {
        let cell = rng.gen_range(0, grid.size());
        grid.increment(cell);
        let y = rng.gen::<T>() * grid.global_max();

        if y <= grid.max_value(cell) {
            return (cell, y);
        }
    }
}

/// Raises the ceiling of `cell` to `weight`. Returns the old ceiling, the difference and the
/// number of events the cell was under-sampled by, measured against the raised global ceiling.
fn raise_ceiling<T>(grid: &mut Grid<T>, cell: usize, weight: T) -> (T, T, T)
where
    T: Float + FromPrimitive,
{
    let old_max = grid.max_value(cell);
    grid.set_value(cell, weight);

    let max_diff = weight - old_max;
    let hits = T::from_usize(grid.hits(cell).saturating_sub(1)).unwrap_or_else(T::nan);
    let counter = hits * max_diff / grid.global_max();

    (old_max, max_diff, counter)
}
