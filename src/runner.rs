//! Experiment runner
//!
//! Executes an [`Experiment`], captures provenance the moment it finishes,
//! and hands the complete record to a [`RecordStore`] in a single insert.
//! A failed computation writes nothing; a failed insert leaves the store
//! as it was.

use std::collections::BTreeMap;
use std::path::PathBuf;

use uuid::Uuid;

use crate::experiment::{
    file_hash, ArtifactRecord, ExperimentRecord, Provenance, RecordStore, RunRecord, RunStatus,
};
use crate::{Backend, Error, Result};

/// A deterministic computation whose result can be recorded.
pub trait Experiment {
    /// Experiment name stored in the record (e.g. `mandelbrot`).
    fn name(&self) -> &str;

    /// Input parameters as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters cannot be serialized.
    fn parameters(&self) -> Result<serde_json::Value>;

    /// Run the computation and return its outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the computation fails.
    fn execute(&self, backend: Backend) -> Result<Vec<ArtifactRecord>>;
}

/// Runs experiments and persists their records.
#[derive(Debug, Clone)]
pub struct ExperimentRunner {
    backend: Backend,
    annotations: BTreeMap<String, serde_json::Value>,
    checksum_files: Vec<PathBuf>,
    tool_versions: BTreeMap<String, String>,
}

impl ExperimentRunner {
    /// Create a new runner builder
    #[must_use]
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::default()
    }

    /// Compute backend used for execution.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// Execute `experiment` and build its record without storing it.
    ///
    /// # Errors
    ///
    /// Returns an error if a checksum file cannot be read, the parameters
    /// cannot be serialized, or the computation fails.
    pub fn execute<E: Experiment + ?Sized>(&self, experiment: &E) -> Result<ExperimentRecord> {
        let span = tracing::info_span!("experiment", name = experiment.name());
        let _enter = span.enter();

        let parameters = experiment.parameters()?;

        // Hash inputs up front so an unreadable file fails before the computation
        let mut file_checksums = BTreeMap::new();
        for path in &self.checksum_files {
            file_checksums.insert(path.display().to_string(), file_hash(path)?);
        }

        let mut run = RunRecord::new();
        run.start();
        tracing::debug!(backend = ?self.backend, "running experiment");

        let outputs = match experiment.execute(self.backend) {
            Ok(outputs) => outputs,
            Err(e) => {
                run.complete(RunStatus::Failed);
                tracing::warn!(error = %e, "experiment failed, nothing recorded");
                return Err(e);
            }
        };
        run.complete(RunStatus::Success);

        let mut provenance = Provenance::capture();
        provenance.file_checksums = file_checksums;
        for (tool, version) in &self.tool_versions {
            provenance = provenance.with_tool_version(tool.clone(), version.clone());
        }

        let mut builder = ExperimentRecord::builder(experiment.name(), parameters)
            .run(run)
            .outputs(outputs)
            .provenance(provenance);
        for (key, value) in &self.annotations {
            builder = builder.annotation(key.clone(), value.clone());
        }
        let record = builder.build()?;

        tracing::debug!(
            record_id = %record.record_id(),
            outputs = record.outputs().len(),
            elapsed_ms = record.run().duration().map(|d| d.num_milliseconds()),
            "experiment finished"
        );
        Ok(record)
    }

    /// Execute `experiment` and persist its record into `store`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute); additionally returns the store's
    /// error if the record cannot be persisted.
    pub fn run<E, S>(&self, experiment: &E, store: &mut S) -> Result<Uuid>
    where
        E: Experiment + ?Sized,
        S: RecordStore + ?Sized,
    {
        let record = self.execute(experiment)?;
        store.insert(record)
    }
}

impl Default for ExperimentRunner {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            annotations: BTreeMap::new(),
            checksum_files: Vec::new(),
            tool_versions: BTreeMap::new(),
        }
    }
}

/// Runner builder
#[derive(Debug, Default)]
pub struct RunnerBuilder {
    backend: Backend,
    annotations: BTreeMap<String, serde_json::Value>,
    checksum_files: Vec<PathBuf>,
    tool_versions: BTreeMap<String, String>,
}

impl RunnerBuilder {
    /// Set compute backend
    #[must_use]
    pub const fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Attach an annotation to every record produced by this runner
    #[must_use]
    pub fn annotation(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.annotations.insert(key.into(), value);
        self
    }

    /// Record the checksum of `path` in every record's provenance
    #[must_use]
    pub fn checksum_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.checksum_files.push(path.into());
        self
    }

    /// Record an extra tool version in every record's provenance
    #[must_use]
    pub fn tool_version(mut self, tool: impl Into<String>, version: impl Into<String>) -> Self {
        self.tool_versions.insert(tool.into(), version.into());
        self
    }

    /// Build the runner
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a parallel backend asks for zero workers
    pub fn build(self) -> Result<ExperimentRunner> {
        if let Backend::Parallel { workers: Some(0) } = self.backend {
            return Err(Error::InvalidInput(
                "parallel backend needs at least one worker".to_string(),
            ));
        }

        Ok(ExperimentRunner {
            backend: self.backend,
            annotations: self.annotations,
            checksum_files: self.checksum_files,
            tool_versions: self.tool_versions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::MemoryStore;

    struct Squares {
        n: usize,
    }

    impl Experiment for Squares {
        fn name(&self) -> &str {
            "squares"
        }

        fn parameters(&self) -> Result<serde_json::Value> {
            Ok(serde_json::json!({ "n": self.n }))
        }

        #[allow(clippy::cast_precision_loss)]
        fn execute(&self, _backend: Backend) -> Result<Vec<ArtifactRecord>> {
            let values = (0..self.n).map(|i| (i * i) as f64).collect();
            Ok(vec![ArtifactRecord::vector("squares", values)?])
        }
    }

    struct Broken;

    impl Experiment for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn parameters(&self) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }

        fn execute(&self, _backend: Backend) -> Result<Vec<ArtifactRecord>> {
            Err(Error::ExperimentFailed("diverged".to_string()))
        }
    }

    #[test]
    fn test_run_persists_record() {
        let runner = ExperimentRunner::builder()
            .backend(Backend::Sequential)
            .annotation("purpose", serde_json::json!("unit test"))
            .tool_version("analysis", "0.3.1")
            .build()
            .unwrap();
        let mut store = MemoryStore::new();

        let id = runner.run(&Squares { n: 4 }, &mut store).unwrap();
        let record = store.get(id).unwrap();

        assert_eq!(record.name(), "squares");
        assert_eq!(record.parameters(), &serde_json::json!({"n": 4}));
        assert_eq!(record.output("squares").unwrap().values(), &[0.0, 1.0, 4.0, 9.0]);
        assert_eq!(record.run().status(), RunStatus::Success);
        assert!(record.run().ended_at().unwrap() <= record.provenance().captured_at);
        assert_eq!(record.provenance().tool_versions["analysis"], "0.3.1");
        assert_eq!(record.annotation("purpose"), Some(&serde_json::json!("unit test")));
    }

    #[test]
    fn test_failed_experiment_writes_nothing() {
        let runner = ExperimentRunner::default();
        let mut store = MemoryStore::new();

        let result = runner.run(&Broken, &mut store);
        assert!(matches!(result, Err(Error::ExperimentFailed(_))));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_missing_checksum_file_fails_before_running() {
        let runner = ExperimentRunner::builder()
            .checksum_file("/nonexistent/experiment-definition.toml")
            .build()
            .unwrap();
        let mut store = MemoryStore::new();

        let result = runner.run(&Squares { n: 2 }, &mut store);
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_builder_rejects_zero_workers() {
        let result = ExperimentRunner::builder()
            .backend(Backend::Parallel { workers: Some(0) })
            .build();
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
