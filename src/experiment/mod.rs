//! Experiment Record Schema
//!
//! This module provides the data structures for reproducible experiment
//! records: what was computed, from which inputs, and in which environment.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──┬── RunRecord (1)        [lifecycle + end time]
//!                        ├── Provenance (1)       [versions, host, checksums]
//!                        ├──< ArtifactRecord (N)  [numeric outputs, CAS]
//!                        └──< annotations (N)     [free-form JSON]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use repro_store::experiment::{
//!     ArtifactRecord, ExperimentRecord, MemoryStore, RecordStore, RunRecord, RunStatus,
//! };
//!
//! let mut run = RunRecord::new();
//! run.start();
//! let scores = ArtifactRecord::vector("scores", vec![0.5, 1.0])?;
//! run.complete(RunStatus::Success);
//!
//! let record = ExperimentRecord::builder("demo", serde_json::json!({"n": 2}))
//!     .run(run)
//!     .output(scores)
//!     .build()?;
//!
//! let mut store = MemoryStore::new();
//! let id = store.insert(record)?;
//! assert_eq!(store.get(id)?.outputs().len(), 1);
//! # Ok::<(), repro_store::Error>(())
//! ```

mod artifact_record;
mod experiment_record;
mod provenance;
mod run_record;
mod store;

pub use artifact_record::ArtifactRecord;
pub use experiment_record::{ExperimentRecord, ExperimentRecordBuilder};
pub use provenance::{file_hash, PlatformInfo, Provenance};
pub use run_record::{RunRecord, RunStatus};
pub use store::{MemoryStore, RecordStore};
