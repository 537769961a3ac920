use super::{simulate, MandelbrotParams};
use crate::experiment::{ArtifactRecord, ExperimentRecord};
use crate::runner::Experiment;
use crate::{Backend, Error, Result};

/// The Mandelbrot simulation as a recordable experiment.
///
/// Produces one `[num_points, num_points]` artifact keyed
/// [`OUTPUT_KEY`](Self::OUTPUT_KEY).
#[derive(Debug, Clone, PartialEq)]
pub struct MandelbrotExperiment {
    params: MandelbrotParams,
}

impl MandelbrotExperiment {
    /// Experiment name stored in records.
    pub const NAME: &'static str = "mandelbrot";

    /// Key of the score grid artifact.
    pub const OUTPUT_KEY: &'static str = "mandelbrot";

    /// Create an experiment from validated parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the parameters are invalid.
    pub fn new(params: MandelbrotParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Rebuild the experiment that produced `record`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the record is not a Mandelbrot record or its
    /// stored parameters are unusable.
    pub fn from_record(record: &ExperimentRecord) -> Result<Self> {
        if record.name() != Self::NAME {
            return Err(Error::InvalidInput(format!(
                "record {} is a '{}' experiment, not '{}'",
                record.record_id(),
                record.name(),
                Self::NAME
            )));
        }
        let params: MandelbrotParams = serde_json::from_value(record.parameters().clone())
            .map_err(|e| {
                Error::InvalidInput(format!(
                    "record {} has malformed parameters: {e}",
                    record.record_id()
                ))
            })?;
        Self::new(params)
    }

    /// Simulation parameters.
    #[must_use]
    pub const fn params(&self) -> &MandelbrotParams {
        &self.params
    }
}

impl Experiment for MandelbrotExperiment {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.params)?)
    }

    fn execute(&self, backend: Backend) -> Result<Vec<ArtifactRecord>> {
        let grid = simulate(&self.params, backend)?;
        tracing::info!(
            points = self.params.total_points(),
            stable = grid.stable_count(),
            "Mandelbrot grid evaluated"
        );
        Ok(vec![grid.into_artifact(Self::OUTPUT_KEY)?])
    }
}
