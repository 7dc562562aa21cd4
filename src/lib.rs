#![warn(clippy::all, clippy::cargo, clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

//! The crate `unweighted` computes the cross section of a process, given as a non-negative weight
//! function over the unit hypercube, and generates statistically *unweighted* events from it:
//! points distributed according to the weight function, each of which counts the same.
//!
//! # Features
//!
//! - **Generic numeric type**. The numeric type is a generic parameter, so that everything works
//! with `f32`, `f64`, or a custom numeric type that implements the `Float` trait from the
//! `num-traits` crate.
//! - **Generic random number generator**. Every random number generator that implements the `Rng`
//! trait from the `rand` crate can be used. Results only depend on the generator and its seed.
//! - **Two integrators**. The cross section is computed either with PLAIN Monte Carlo, which can
//! be distributed over several cores without changing the result, or with VEGAS.
//! - **Checkpoints**. Every integration iteration produces a checkpoint that can be written to
//! disk and used to resume the integration.
//! - **Self-correcting generation**. Events are generated by hit-or-miss on a grid of cells whose
//! ceilings are found in a warm-up. Ceilings that turn out to be too low are raised during the
//! generation and the events missed because of them are made up for immediately.
//!
//! # How do I get started?
//!
//! Implement [`Integrand`] for your weight function, choose the [`RunParameters`] and create a
//! [`Run`]:
//!
//! ```
//! use rand_pcg::Pcg64;
//! use unweighted::{Integrand, IntegrandError, Run, RunParameters};
//!
//! struct Linear;
//!
//! impl Integrand<f64> for Linear {
//!     fn call(&self, x: &[f64]) -> Result<f64, IntegrandError> {
//!         Ok(x[0])
//!     }
//!
//!     fn dim(&self) -> usize {
//!         1
//!     }
//! }
//!
//! let mut parameters = RunParameters::default();
//! parameters.integration.calls = 10_000;
//! parameters.integration.iterations = 2;
//!
//! let rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
//! let mut run = Run::new(Linear, parameters, rng).unwrap();
//!
//! let mut sum = 0.0;
//! run.generate(1000, |event, _| sum += event.point[0]).unwrap();
//!
//! assert!(run.integral().is_some());
//! assert_eq!(run.stats().events, 1000);
//! ```
//!
//! # What is ...?
//!
//! Given the weight function $f$ over the $d$-dimensional unit hypercube, the *cross section* is
//!
//! $$ \sigma = \prod_{i=1}^d \int_0^1 \mathrm{d} x_i f(x_1, x_2, \ldots, x_d) $$
//!
//! and we use the following terms:
//!
//! - the number of *calls* is the number of times the integrand is evaluated. We assume that this
//! is the expensive operation,
//! - a *cell* is one of the $m^d$ equal-volume boxes of the generation grid, where $m$ is the
//! number of bins per axis,
//! - the *ceiling* of a cell is the largest weight seen in it so far,
//! - the *inefficiency* is the ratio of a ceiling to the average weight; it is the average number
//! of integrand evaluations needed per event,
//! - a *correction* makes up for the events a cell was under-sampled by before its ceiling was
//! raised.

pub mod callbacks;
pub mod config;
pub mod core;
pub mod generation;
pub mod integrators;
pub mod run;

pub use crate::config::RunParameters;
pub use crate::core::*;
pub use crate::generation::Event;
pub use crate::run::{GenerationStats, Run};
