//! A generation run: cross-section integration followed by unweighted event generation.
use crate::callbacks::{Callback, SimpleCallback};
use crate::config::RunParameters;
use crate::core::estimators::{IntegrationResult, IterationEstimators};
use crate::core::*;
use crate::generation::{warmup, Event, Grid, UnweightedGenerator};
use crate::integrators;

use num_traits::{Float, FromPrimitive};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::{Duration, Instant};

/// Counters of the event generation.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct GenerationStats {
    /// Number of events generated.
    pub events: usize,
    /// Wall-clock time spent on warming up and generating.
    pub time: Duration,
}

/// Owns everything a generation session needs: the integrand, the random number generator, the
/// grid and the pending grid correction.
///
/// The integrand is prepared before its first evaluation, the cross section is computed before
/// the first event and the grid is warmed up when needed, so that calling
/// [`generate_one`](Run::generate_one) right after [`new`](Run::new) is fine.
pub struct Run<T, R, I> {
    integrand: I,
    parameters: RunParameters,
    rng: R,
    grid: Grid<T>,
    generator: UnweightedGenerator<T>,
    first_run: bool,
    integral: Option<IntegrationResult<T>>,
    checkpoints: Vec<Checkpoint<R, IterationEstimators<T>>>,
    stats: GenerationStats,
}

impl<T, R, I> Run<T, R, I>
where
    T: Display + Float + FromPrimitive + Send + Sync,
    R: Clone + Rng + Send + Sync + Serialize,
    I: Integrand<T>,
    Standard: Distribution<T>,
{
    /// Configures a run of `integrand`. The generation grid is laid out immediately; nothing is
    /// evaluated yet.
    pub fn new(integrand: I, parameters: RunParameters, rng: R) -> Result<Self> {
        parameters.validate()?;

        let dim = integrand.dim();
        let grid = Grid::new(dim, parameters.generation.bins_per_axis)?;
        let generator = UnweightedGenerator::new(dim, parameters.generation.max_trials);

        Ok(Self {
            integrand,
            parameters,
            rng,
            grid,
            generator,
            first_run: true,
            integral: None,
            checkpoints: Vec::new(),
            stats: GenerationStats::default(),
        })
    }

    fn prepare(&mut self) -> Result<()> {
        if self.first_run {
            self.integrand.prepare().map_err(Error::Integrand)?;
            self.first_run = false;
            tracing::debug!(dim = self.integrand.dim(), "integrand prepared");
        }

        Ok(())
    }

    /// Computes the cross section, logging every iteration.
    pub fn compute_integral(&mut self) -> Result<IntegrationResult<T>> {
        self.compute_integral_with(&SimpleCallback {})
    }

    /// Computes the cross section, reporting every iteration to `callback`. The generation grid
    /// is left untouched.
    pub fn compute_integral_with(
        &mut self,
        callback: &impl Callback<T, R, IterationEstimators<T>>,
    ) -> Result<IntegrationResult<T>> {
        self.prepare()?;

        tracing::info!(
            integrator = ?self.parameters.integration.integrator,
            calls = self.parameters.integration.calls,
            "computing the cross section"
        );

        let (result, checkpoints) = integrators::integrate(
            &self.integrand,
            &self.rng,
            &self.parameters.integration,
            callback,
        )?;

        // continue with the random numbers after the integration
        if let Some(last) = checkpoints.last() {
            self.rng = last.rng_after().clone();
        }

        tracing::info!(
            "cross section = {} \u{b1} {} (chi2/dof = {})",
            result.value,
            result.error,
            result.chi2_dof
        );

        self.integral = Some(result);
        self.checkpoints = checkpoints;

        Ok(result)
    }

    /// Generates a single unweighted event, computing the cross section and warming up the grid
    /// first if that has not happened yet.
    pub fn generate_one(&mut self) -> Result<Event<T>> {
        if self.integral.is_none() {
            self.compute_integral()?;
        }

        let start = Instant::now();

        if !self.grid.is_prepared() {
            self.prepare()?;
            warmup(
                &mut self.grid,
                &self.integrand,
                &mut self.rng,
                self.parameters.generation.points_per_cell,
            )?;
        }

        let event = self
            .generator
            .next(&self.integrand, &mut self.grid, &mut self.rng);
        self.stats.time += start.elapsed();
        let event = event?;

        self.stats.events += 1;

        let print_every = self.parameters.generation.print_every;
        if print_every != 0 && self.stats.events % print_every == 0 {
            tracing::info!(
                events = self.stats.events,
                seconds = self.stats.time.as_secs_f64(),
                "generated events"
            );
        }

        Ok(event)
    }

    /// Generates events until the run holds `num_events` of them, or the configured maximum number
    /// if `num_events` is zero, and hands each new one to `callback` together with its index in
    /// the run.
    pub fn generate(
        &mut self,
        num_events: usize,
        mut callback: impl FnMut(&Event<T>, usize),
    ) -> Result<()> {
        let num_events = if num_events == 0 {
            self.parameters.generation.max_events
        } else {
            num_events
        };

        tracing::info!(num_events, "starting the event generation");

        while self.stats.events < num_events {
            let event = self.generate_one()?;
            callback(&event, self.stats.events - 1);
        }

        tracing::info!(
            events = self.stats.events,
            seconds = self.stats.time.as_secs_f64(),
            "event generation finished"
        );

        Ok(())
    }

    /// Returns the number of generated events and the time spent on them.
    pub fn stats(&self) -> GenerationStats {
        self.stats
    }

    /// The cross section, if it was computed.
    pub fn integral(&self) -> Option<IntegrationResult<T>> {
        self.integral
    }

    /// The generation grid.
    pub fn grid(&self) -> &Grid<T> {
        &self.grid
    }

    /// The checkpoints of the cross-section integration.
    pub fn checkpoints(&self) -> &[Checkpoint<R, IterationEstimators<T>>] {
        &self.checkpoints
    }

    /// The parameters of the run.
    pub fn parameters(&self) -> &RunParameters {
        &self.parameters
    }

    /// The integrand.
    pub fn integrand(&self) -> &I {
        &self.integrand
    }
}
