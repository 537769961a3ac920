//! Experiment Record - root entity persisted in a results container

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ArtifactRecord, Provenance, RunRecord, RunStatus};
use crate::{Error, Result};

/// Experiment Record represents one executed computational experiment.
///
/// This is the root entity of the schema: it owns the input parameters, the
/// output artifacts, the run lifecycle and the provenance captured when the
/// run finished. Records have no setters; once built they are immutable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRecord {
    record_id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    parameters: serde_json::Value,
    outputs: Vec<ArtifactRecord>,
    run: RunRecord,
    provenance: Provenance,
    #[serde(default)]
    annotations: BTreeMap<String, serde_json::Value>,
}

impl ExperimentRecord {
    /// Create a builder for a new record with a fresh identifier.
    ///
    /// # Arguments
    ///
    /// * `name` - Human-readable name for the experiment
    /// * `parameters` - Input parameters, already serialized to JSON
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        parameters: serde_json::Value,
    ) -> ExperimentRecordBuilder {
        ExperimentRecordBuilder::new(name, parameters)
    }

    /// Get the record ID.
    #[must_use]
    pub const fn record_id(&self) -> Uuid {
        self.record_id
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the input parameters.
    #[must_use]
    pub const fn parameters(&self) -> &serde_json::Value {
        &self.parameters
    }

    /// Get all output artifacts.
    #[must_use]
    pub fn outputs(&self) -> &[ArtifactRecord] {
        &self.outputs
    }

    /// Get an output artifact by key.
    #[must_use]
    pub fn output(&self, key: &str) -> Option<&ArtifactRecord> {
        self.outputs.iter().find(|a| a.key() == key)
    }

    /// Get the run lifecycle record.
    #[must_use]
    pub const fn run(&self) -> &RunRecord {
        &self.run
    }

    /// Get the provenance metadata.
    #[must_use]
    pub const fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Get all annotations.
    #[must_use]
    pub const fn annotations(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.annotations
    }

    /// Get a single annotation.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&serde_json::Value> {
        self.annotations.get(key)
    }
}

/// Builder for `ExperimentRecord`.
#[derive(Debug)]
pub struct ExperimentRecordBuilder {
    record_id: Uuid,
    name: String,
    created_at: Option<DateTime<Utc>>,
    parameters: serde_json::Value,
    outputs: Vec<ArtifactRecord>,
    run: RunRecord,
    provenance: Option<Provenance>,
    annotations: BTreeMap<String, serde_json::Value>,
}

impl ExperimentRecordBuilder {
    /// Create a new builder with required fields and a fresh v4 identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            name: name.into(),
            created_at: None,
            parameters,
            outputs: Vec::new(),
            run: RunRecord::new(),
            provenance: None,
            annotations: BTreeMap::new(),
        }
    }

    /// Override the record identifier (import and testing only).
    #[must_use]
    pub const fn record_id(mut self, record_id: Uuid) -> Self {
        self.record_id = record_id;
        self
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Add an output artifact.
    #[must_use]
    pub fn output(mut self, artifact: ArtifactRecord) -> Self {
        self.outputs.push(artifact);
        self
    }

    /// Add several output artifacts.
    #[must_use]
    pub fn outputs(mut self, artifacts: impl IntoIterator<Item = ArtifactRecord>) -> Self {
        self.outputs.extend(artifacts);
        self
    }

    /// Set the run lifecycle record.
    #[must_use]
    pub fn run(mut self, run: RunRecord) -> Self {
        self.run = run;
        self
    }

    /// Set the provenance metadata.
    #[must_use]
    pub fn provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Attach a free-form annotation.
    #[must_use]
    pub fn annotation(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.annotations.insert(key.into(), value);
        self
    }

    /// Build the `ExperimentRecord`.
    ///
    /// Provenance is captured now if none was supplied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the run did not complete successfully or if
    /// two outputs share the same key.
    pub fn build(self) -> Result<ExperimentRecord> {
        if self.run.status() != RunStatus::Success {
            return Err(Error::InvalidInput(format!(
                "only successful runs can be recorded (status: {:?})",
                self.run.status()
            )));
        }

        for (ix, artifact) in self.outputs.iter().enumerate() {
            if self.outputs[..ix].iter().any(|a| a.key() == artifact.key()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate output key '{}'",
                    artifact.key()
                )));
            }
        }

        Ok(ExperimentRecord {
            record_id: self.record_id,
            name: self.name,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            parameters: self.parameters,
            outputs: self.outputs,
            run: self.run,
            provenance: self.provenance.unwrap_or_else(Provenance::capture),
            annotations: self.annotations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished_run() -> RunRecord {
        let mut run = RunRecord::new();
        run.start();
        run.complete(RunStatus::Success);
        run
    }

    #[test]
    fn test_experiment_record_builder() {
        let params = serde_json::json!({"num_points": 4});
        let record = ExperimentRecord::builder("mandelbrot", params.clone())
            .run(finished_run())
            .output(ArtifactRecord::vector("scores", vec![1.0, 2.0]).unwrap())
            .annotation("note", serde_json::json!("first try"))
            .build()
            .unwrap();

        assert_eq!(record.name(), "mandelbrot");
        assert_eq!(record.parameters(), &params);
        assert_eq!(record.outputs().len(), 1);
        assert!(record.output("scores").is_some());
        assert!(record.output("missing").is_none());
        assert_eq!(record.annotation("note"), Some(&serde_json::json!("first try")));
    }

    #[test]
    fn test_builder_assigns_distinct_ids() {
        let a = ExperimentRecord::builder("x", serde_json::Value::Null)
            .run(finished_run())
            .build()
            .unwrap();
        let b = ExperimentRecord::builder("x", serde_json::Value::Null)
            .run(finished_run())
            .build()
            .unwrap();
        assert_ne!(a.record_id(), b.record_id());
    }

    #[test]
    fn test_builder_rejects_unfinished_run() {
        let result = ExperimentRecord::builder("x", serde_json::Value::Null).build();
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_builder_rejects_duplicate_output_keys() {
        let result = ExperimentRecord::builder("x", serde_json::Value::Null)
            .run(finished_run())
            .output(ArtifactRecord::vector("a", vec![1.0]).unwrap())
            .output(ArtifactRecord::vector("a", vec![2.0]).unwrap())
            .build();
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
