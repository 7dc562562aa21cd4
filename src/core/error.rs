//! Error type shared by the integrators, the generator and the run orchestration.

use thiserror::Error;

/// Error an [`Integrand`](crate::core::Integrand) may report from `call` or `prepare`.
pub type IntegrandError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while integrating or generating events.
#[derive(Debug, Error)]
pub enum Error {
    /// The run was configured with parameters that cannot work, e.g. zero dimensions or zero bins
    /// per axis.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Events were requested from a grid that has not been warmed up yet.
    #[error("the generation grid has not been prepared")]
    GridNotPrepared,

    /// The integrand was evaluated the given number of times without accepting a point.
    #[error("no event accepted after {0} integrand evaluations")]
    TooManyTrials(usize),

    /// The integrand itself failed. This is never masked by the generator.
    #[error("integrand evaluation failed")]
    Integrand(#[source] IntegrandError),

    /// Reading or writing a parameter or checkpoint file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A parameter or checkpoint file could not be (de)serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
