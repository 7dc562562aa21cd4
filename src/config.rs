//! Run parameters.
//!
//! All parameters can be given as JSON; missing fields take their default values:
//!
//! ```
//! use unweighted::config::{IntegratorType, RunParameters};
//!
//! let parameters = RunParameters::from_json(
//!     r#"{ "integration": { "calls": 5000, "integrator": "Vegas" },
//!          "generation": { "bins_per_axis": 4 } }"#,
//! )
//! .unwrap();
//!
//! assert_eq!(parameters.integration.calls, 5000);
//! assert_eq!(parameters.integration.integrator, IntegratorType::Vegas);
//! assert_eq!(parameters.integration.iterations, 10);
//! assert_eq!(parameters.generation.bins_per_axis, 4);
//! assert_eq!(parameters.generation.points_per_cell, 100);
//! ```
use crate::core::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// The algorithm computing the cross section.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum IntegratorType {
    /// Plain Monte Carlo, parallelised over `n_cores` threads.
    Plain,
    /// Importance sampling with adaptive per-axis grids.
    Vegas,
}

impl Default for IntegratorType {
    fn default() -> Self {
        Self::Plain
    }
}

/// Steering of the VEGAS integrator.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct VegasParameters {
    /// Number of bins of every axis grid.
    pub bins: usize,
    /// Damping exponent of the grid refinement.
    pub alpha: f64,
    /// Evaluations of the warm-up iteration, which only adapts the grid.
    pub warmup_calls: usize,
    /// Iterations stop once $|\chi^2/\mathrm{dof} - 1|$ is at most `chi2_cut - 1`.
    pub chi2_cut: f64,
    /// Upper bound on the number of iterations entering the result.
    pub max_iterations: usize,
}

impl Default for VegasParameters {
    fn default() -> Self {
        Self {
            bins: 50,
            alpha: 1.5,
            warmup_calls: 25_000,
            chi2_cut: 1.5,
            max_iterations: 10,
        }
    }
}

impl VegasParameters {
    /// Checks that the parameters describe a runnable VEGAS integration.
    pub fn validate(&self) -> Result<()> {
        if self.bins < 2 {
            return Err(Error::configuration("VEGAS needs at least two bins per axis"));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(Error::configuration(format!(
                "the VEGAS damping exponent must be positive, got {}",
                self.alpha
            )));
        }
        if !(self.chi2_cut.is_finite() && self.chi2_cut >= 1.0) {
            return Err(Error::configuration(format!(
                "the chi2 cut must be at least one, got {}",
                self.chi2_cut
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::configuration("VEGAS needs at least one iteration"));
        }

        Ok(())
    }
}

/// Parameters of the cross-section integration.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct IntegrationParameters {
    /// Integrand evaluations per iteration.
    pub calls: usize,
    /// Number of iterations of the plain integrator.
    pub iterations: usize,
    /// Threads used by the plain integrator.
    pub n_cores: usize,
    /// The algorithm used.
    pub integrator: IntegratorType,
    /// Only read when `integrator` is [`IntegratorType::Vegas`].
    pub vegas: VegasParameters,
}

impl Default for IntegrationParameters {
    fn default() -> Self {
        Self {
            calls: 100_000,
            iterations: 10,
            n_cores: 1,
            integrator: IntegratorType::default(),
            vegas: VegasParameters::default(),
        }
    }
}

impl IntegrationParameters {
    /// Checks the parameters of the selected integrator.
    pub fn validate(&self) -> Result<()> {
        if self.calls == 0 {
            return Err(Error::configuration("the number of calls must be positive"));
        }
        if self.iterations == 0 {
            return Err(Error::configuration("the number of iterations must be positive"));
        }
        if self.n_cores == 0 {
            return Err(Error::configuration("at least one core is needed"));
        }

        match self.integrator {
            IntegratorType::Plain => Ok(()),
            IntegratorType::Vegas => self.vegas.validate(),
        }
    }
}

/// Parameters of the hypercube grid and the event generation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct GenerationParameters {
    /// Number of bins along every axis; the grid has `bins_per_axis^dim` cells.
    pub bins_per_axis: usize,
    /// Warm-up samples drawn in every cell.
    pub points_per_cell: usize,
    /// Events generated by `Run::generate` when no number is requested.
    pub max_events: usize,
    /// Progress is logged every `print_every` events, never if zero.
    pub print_every: usize,
    /// Upper bound on the integrand evaluations spent on a single event.
    pub max_trials: Option<usize>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            bins_per_axis: 3,
            points_per_cell: 100,
            max_events: 100_000,
            print_every: 10_000,
            max_trials: None,
        }
    }
}

impl GenerationParameters {
    /// Checks that the grid can be built and warmed up.
    pub fn validate(&self) -> Result<()> {
        if self.bins_per_axis == 0 {
            return Err(Error::configuration("the number of bins per axis must be positive"));
        }
        if self.points_per_cell == 0 {
            return Err(Error::configuration("the number of points per cell must be positive"));
        }
        if self.max_trials == Some(0) {
            return Err(Error::configuration("a trial bound of zero never yields an event"));
        }

        Ok(())
    }
}

/// All parameters of a [`Run`](crate::run::Run).
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RunParameters {
    /// Cross-section integration.
    pub integration: IntegrationParameters,
    /// Grid warm-up and event generation.
    pub generation: GenerationParameters,
}

impl RunParameters {
    /// Validates both parameter groups.
    pub fn validate(&self) -> Result<()> {
        self.integration.validate()?;
        self.generation.validate()
    }

    /// Parses and validates parameters given as JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let parameters: Self = serde_json::from_str(json)?;
        parameters.validate()?;

        Ok(parameters)
    }

    /// Reads and validates parameters from the JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let parameters: Self = serde_json::from_reader(reader)?;
        parameters.validate()?;
        tracing::debug!(path = %path.display(), "loaded run parameters");

        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let parameters = RunParameters::default();

        assert_eq!(parameters.integration.calls, 100_000);
        assert_eq!(parameters.integration.iterations, 10);
        assert_eq!(parameters.integration.n_cores, 1);
        assert_eq!(parameters.integration.integrator, IntegratorType::Plain);
        assert_eq!(parameters.integration.vegas.bins, 50);
        assert_eq!(parameters.integration.vegas.warmup_calls, 25_000);
        assert_eq!(parameters.generation.bins_per_axis, 3);
        assert_eq!(parameters.generation.max_events, 100_000);
        assert_eq!(parameters.generation.print_every, 10_000);
        assert_eq!(parameters.generation.max_trials, None);
        assert!(parameters.validate().is_ok());
    }

    #[test]
    fn test_empty_json_gives_defaults() {
        assert_eq!(RunParameters::from_json("{}").unwrap(), RunParameters::default());
    }

    #[test]
    fn test_invalid_values() {
        for json in &[
            r#"{ "generation": { "bins_per_axis": 0 } }"#,
            r#"{ "generation": { "points_per_cell": 0 } }"#,
            r#"{ "generation": { "max_trials": 0 } }"#,
            r#"{ "integration": { "calls": 0 } }"#,
            r#"{ "integration": { "n_cores": 0 } }"#,
            r#"{ "integration": { "integrator": "Vegas", "vegas": { "chi2_cut": 0.5 } } }"#,
        ] {
            assert!(
                matches!(RunParameters::from_json(json), Err(Error::Configuration(_))),
                "{}",
                json
            );
        }
    }

    #[test]
    fn test_vegas_parameters_ignored_for_plain() {
        let parameters =
            RunParameters::from_json(r#"{ "integration": { "vegas": { "bins": 0 } } }"#);

        assert!(parameters.is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            RunParameters::from_json(r#"{ "integration": { "calls": "many" } }"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "generation": {{ "max_trials": 1000 }} }}"#).unwrap();

        let parameters = RunParameters::load(file.path()).unwrap();
        assert_eq!(parameters.generation.max_trials, Some(1000));
    }

    #[test]
    fn test_load_missing_file() {
        let result = RunParameters::load(Path::new("/nonexistent/run.json"));

        assert!(matches!(result, Err(Error::Io(_))));
    }
}
