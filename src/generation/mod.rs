//! Generation of unweighted events.
//!
//! The unit hypercube is divided into a [`Grid`] of equal cells. A [warm-up](warmup::warmup)
//! samples every cell to find the largest weight in it, after which the
//! [`UnweightedGenerator`] produces events by hit-or-miss against these ceilings.
pub mod generator;
pub mod grid;
pub mod warmup;

pub use generator::{CorrectionStep, Event, PendingCorrection, UnweightedGenerator};
pub use grid::Grid;
pub use warmup::{warmup, WarmupSummary};
