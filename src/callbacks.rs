//! Implementation of different callback functions.
use crate::core::estimators::Estimators;
use crate::core::{Checkpoint, Result};
use num_traits::{Float, FromPrimitive};
use serde::Serialize;
use std::fmt::Display;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Trait for implementing callbacks for iterative MC algorithms
pub trait Callback<T, R, E> {
    /// This method is called after each successfully finished iteration and may report
    /// information about it. An error aborts the integration.
    fn print(&self, chkpts: &[Checkpoint<R, E>]) -> Result<()>;
}

/// A callback function that does nothing
pub struct SinkCallback {}

impl<T, R, E> Callback<T, R, E> for SinkCallback {
    fn print(&self, _: &[Checkpoint<R, E>]) -> Result<()> {
        Ok(())
    }
}

/// A callback function that logs the result of each individual iteration
pub struct SimpleCallback {}

impl<T, R, E> Callback<T, R, E> for SimpleCallback
where
    T: Display + Float + FromPrimitive,
    E: Estimators<T>,
{
    fn print(&self, chkpts: &[Checkpoint<R, E>]) -> Result<()> {
        if let Some(chkpt) = chkpts.last() {
            let estimators = chkpt.estimators();
            tracing::info!(
                "iteration {}: N={} E={} \u{b1} {}",
                chkpts.len() - 1,
                estimators.calls(),
                estimators.mean(),
                estimators.std()
            );
        }

        Ok(())
    }
}

/// Simple cumulative callback that shows the result of the individual integration
/// together with the cumulative result combining it with the previous iterations.
pub struct SimpleCumulativeCallback {}

impl<T, R, E> Callback<T, R, E> for SimpleCumulativeCallback
where
    T: Display + Float + FromPrimitive,
    E: Clone + Estimators<T> + Default + std::ops::Add<Output = E>,
{
    fn print(&self, chkpts: &[Checkpoint<R, E>]) -> Result<()> {
        let iteration = chkpts.len();

        if iteration == 0 {
            return Ok(());
        }

        let last = chkpts[iteration - 1].estimators();

        let cumulative = chkpts
            .iter()
            .map(|c| c.estimators())
            .fold(E::default(), |acc, e| acc + e.clone());

        tracing::info!(
            "[iteration {}: N={} E={} \u{b1} {}] [cumulative: N={} E={} \u{b1} {}]",
            iteration - 1,
            last.calls(),
            last.mean(),
            last.std(),
            cumulative.calls(),
            cumulative.mean(),
            cumulative.std()
        );

        Ok(())
    }
}

/// Writes all checkpoints produced so far to a JSON file after every iteration, so that an
/// interrupted integration can be resumed from the file.
pub struct FileWriterCallback {
    path: PathBuf,
}

impl FileWriterCallback {
    /// Create a callback writing to `path`. The file is overwritten after each iteration.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl<T, R, E> Callback<T, R, E> for FileWriterCallback
where
    R: Serialize,
    E: Serialize,
{
    fn print(&self, chkpts: &[Checkpoint<R, E>]) -> Result<()> {
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(writer, chkpts)?;
        tracing::debug!(path = %self.path.display(), checkpoints = chkpts.len(), "checkpoints written");

        Ok(())
    }
}
