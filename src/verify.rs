//! Verification of stored experiment records
//!
//! Two levels:
//! - [`verify_checksums`]: every stored artifact still matches its content hash
//! - [`reproduce`]: re-run the experiment and compare outputs bit-for-bit

use serde::Serialize;
use uuid::Uuid;

use crate::experiment::{ArtifactRecord, ExperimentRecord};
use crate::runner::Experiment;
use crate::{Backend, Error, Result};

/// Outcome of re-computing one artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reproduction {
    /// Shape and every value match exactly.
    Identical,
    /// The re-run produced an artifact with a different shape.
    ShapeMismatch {
        /// Shape stored in the record
        stored: Vec<usize>,
        /// Shape produced by the re-run
        recomputed: Vec<usize>,
    },
    /// Same shape, but the stored and recomputed value counts differ.
    LengthMismatch {
        /// Number of stored values
        stored: usize,
        /// Number of recomputed values
        recomputed: usize,
    },
    /// Same shape, differing values.
    ValueMismatch {
        /// Number of differing elements
        differing: usize,
        /// Largest absolute difference
        max_abs_diff: f64,
    },
    /// The re-run did not produce this artifact.
    Missing,
}

/// Verification result for one stored artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactCheck {
    /// Artifact key
    pub key: String,
    /// Content hash still matches the stored values
    pub checksum_ok: bool,
    /// Re-computation outcome, when reproduction was requested
    pub reproduction: Option<Reproduction>,
}

impl ArtifactCheck {
    /// Whether this artifact passed every requested check.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checksum_ok
            && self
                .reproduction
                .as_ref()
                .map_or(true, |r| *r == Reproduction::Identical)
    }
}

/// Verification report for one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    /// Verified record
    pub record_id: Uuid,
    /// Per-artifact results, in record order
    pub artifacts: Vec<ArtifactCheck>,
    /// Keys produced by a re-run that the record does not contain
    pub unexpected_outputs: Vec<String>,
}

impl VerificationReport {
    /// Whether every check passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.unexpected_outputs.is_empty() && self.artifacts.iter().all(ArtifactCheck::passed)
    }

    /// Whether the report includes a re-computation.
    #[must_use]
    pub fn reproduced(&self) -> bool {
        self.artifacts.iter().any(|a| a.reproduction.is_some())
    }
}

/// Check every stored artifact against its content hash.
#[must_use]
pub fn verify_checksums(record: &ExperimentRecord) -> VerificationReport {
    let artifacts = record
        .outputs()
        .iter()
        .map(|artifact| ArtifactCheck {
            key: artifact.key().to_string(),
            checksum_ok: artifact.verify_checksum(),
            reproduction: None,
        })
        .collect();

    let report = VerificationReport {
        record_id: record.record_id(),
        artifacts,
        unexpected_outputs: Vec::new(),
    };
    log_report(&report);
    report
}

/// Re-run `experiment` and compare its outputs with those stored in `record`.
///
/// # Errors
///
/// Returns `InvalidInput` if `experiment` does not match the record's name
/// and parameters, or the experiment's own error if the re-run fails.
pub fn reproduce<E: Experiment + ?Sized>(
    record: &ExperimentRecord,
    experiment: &E,
    backend: Backend,
) -> Result<VerificationReport> {
    if experiment.name() != record.name() {
        return Err(Error::InvalidInput(format!(
            "cannot reproduce a '{}' record with a '{}' experiment",
            record.name(),
            experiment.name()
        )));
    }
    if &experiment.parameters()? != record.parameters() {
        return Err(Error::InvalidInput(format!(
            "experiment parameters differ from those stored in record {}",
            record.record_id()
        )));
    }

    tracing::debug!(record_id = %record.record_id(), "re-running experiment");
    let recomputed = experiment.execute(backend)?;

    let artifacts = record
        .outputs()
        .iter()
        .map(|stored| {
            let reproduction = recomputed
                .iter()
                .find(|fresh| fresh.key() == stored.key())
                .map_or(Reproduction::Missing, |fresh| compare(stored, fresh));
            ArtifactCheck {
                key: stored.key().to_string(),
                checksum_ok: stored.verify_checksum(),
                reproduction: Some(reproduction),
            }
        })
        .collect();

    let unexpected_outputs = recomputed
        .iter()
        .filter(|fresh| record.output(fresh.key()).is_none())
        .map(|fresh| fresh.key().to_string())
        .collect();

    let report = VerificationReport {
        record_id: record.record_id(),
        artifacts,
        unexpected_outputs,
    };
    log_report(&report);
    Ok(report)
}

fn compare(stored: &ArtifactRecord, fresh: &ArtifactRecord) -> Reproduction {
    if stored.shape() != fresh.shape() {
        return Reproduction::ShapeMismatch {
            stored: stored.shape().to_vec(),
            recomputed: fresh.shape().to_vec(),
        };
    }
    if stored.values().len() != fresh.values().len() {
        return Reproduction::LengthMismatch {
            stored: stored.values().len(),
            recomputed: fresh.values().len(),
        };
    }

    let mut differing = 0;
    let mut max_abs_diff = 0.0_f64;
    for (a, b) in stored.values().iter().zip(fresh.values()) {
        if a.to_bits() != b.to_bits() {
            differing += 1;
            max_abs_diff = max_abs_diff.max((a - b).abs());
        }
    }

    if differing == 0 {
        Reproduction::Identical
    } else {
        Reproduction::ValueMismatch {
            differing,
            max_abs_diff,
        }
    }
}

fn log_report(report: &VerificationReport) {
    if report.passed() {
        tracing::info!(
            record_id = %report.record_id,
            artifacts = report.artifacts.len(),
            reproduced = report.reproduced(),
            "record verified"
        );
    } else {
        for check in report.artifacts.iter().filter(|c| !c.passed()) {
            tracing::warn!(
                record_id = %report.record_id,
                artifact = %check.key,
                checksum_ok = check.checksum_ok,
                reproduction = ?check.reproduction,
                "artifact failed verification"
            );
        }
        for key in &report.unexpected_outputs {
            tracing::warn!(record_id = %report.record_id, artifact = %key, "unexpected output on re-run");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{RunRecord, RunStatus};

    struct Fixed(Vec<f64>);

    impl Experiment for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn parameters(&self) -> Result<serde_json::Value> {
            Ok(serde_json::json!({}))
        }

        fn execute(&self, _backend: Backend) -> Result<Vec<ArtifactRecord>> {
            Ok(vec![ArtifactRecord::vector("v", self.0.clone())?])
        }
    }

    fn record_with(values: Vec<f64>) -> ExperimentRecord {
        let mut run = RunRecord::new();
        run.start();
        run.complete(RunStatus::Success);
        ExperimentRecord::builder("fixed", serde_json::json!({}))
            .run(run)
            .output(ArtifactRecord::vector("v", values).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_checksums_pass() {
        let report = verify_checksums(&record_with(vec![1.0, 2.0]));
        assert!(report.passed());
        assert!(!report.reproduced());
    }

    #[test]
    fn test_reproduce_identical() {
        let record = record_with(vec![1.0, 2.0]);
        let report = reproduce(&record, &Fixed(vec![1.0, 2.0]), Backend::Sequential).unwrap();
        assert!(report.passed());
        assert!(report.reproduced());
    }

    #[test]
    fn test_reproduce_value_mismatch() {
        let record = record_with(vec![1.0, 2.0]);
        let report = reproduce(&record, &Fixed(vec![1.0, 2.5]), Backend::Sequential).unwrap();
        assert!(!report.passed());
        assert_eq!(
            report.artifacts[0].reproduction,
            Some(Reproduction::ValueMismatch {
                differing: 1,
                max_abs_diff: 0.5
            })
        );
    }

    #[test]
    fn test_reproduce_shape_mismatch() {
        let record = record_with(vec![1.0, 2.0]);
        let report = reproduce(&record, &Fixed(vec![1.0]), Backend::Sequential).unwrap();
        assert!(matches!(
            report.artifacts[0].reproduction,
            Some(Reproduction::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_reproduce_truncated_values() {
        // A stored artifact edited on disk: shape intact, one value removed
        let mut json = serde_json::to_value(record_with(vec![1.0, 2.0, 3.0])).unwrap();
        json["outputs"][0]["values"] = serde_json::json!([1.0, 2.0]);
        let record: ExperimentRecord = serde_json::from_value(json).unwrap();

        let report = reproduce(&record, &Fixed(vec![1.0, 2.0, 3.0]), Backend::Sequential).unwrap();
        assert!(!report.passed());
        assert!(!report.artifacts[0].checksum_ok);
        assert_eq!(
            report.artifacts[0].reproduction,
            Some(Reproduction::LengthMismatch {
                stored: 2,
                recomputed: 3
            })
        );
    }

    #[test]
    fn test_reproduce_rejects_different_parameters() {
        struct Other;
        impl Experiment for Other {
            fn name(&self) -> &str {
                "fixed"
            }
            fn parameters(&self) -> Result<serde_json::Value> {
                Ok(serde_json::json!({"seed": 7}))
            }
            fn execute(&self, _backend: Backend) -> Result<Vec<ArtifactRecord>> {
                Ok(Vec::new())
            }
        }

        let record = record_with(vec![1.0]);
        let result = reproduce(&record, &Other, Backend::Sequential);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
