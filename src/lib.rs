//! # repro-store: Reproducible Experiment Records
//!
//! **Version**: 0.1.0
//!
//! repro-store runs a deterministic computation, persists its inputs,
//! outputs and provenance as an immutable experiment record inside a
//! results container on disk, and reloads the record later to inspect or
//! re-verify it.
//!
//! ## Design Principles
//!
//! - **Immutability**: records are written once, never updated in place
//! - **Atomicity**: a record is either fully persisted or not at all
//! - **Auditability**: re-running identical inputs creates a new record
//! - **Verifiability**: outputs carry content hashes and can be recomputed
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use repro_store::container::ResultsContainer;
//! use repro_store::experiment::RecordStore;
//! use repro_store::mandelbrot::{MandelbrotExperiment, MandelbrotParams};
//! use repro_store::runner::ExperimentRunner;
//! use repro_store::verify;
//!
//! let mut container = ResultsContainer::open_or_create("mandelbrot.json")?;
//! let experiment = MandelbrotExperiment::new(MandelbrotParams::new(-2.0, 1.0, -1.5, 1.5, 64))?;
//!
//! let runner = ExperimentRunner::builder().build()?;
//! let record_id = runner.run(&experiment, &mut container)?;
//!
//! let record = container.get(record_id)?;
//! assert!(verify::verify_checksums(&record).passed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod container;
pub mod error;
pub mod experiment;
pub mod mandelbrot;
pub mod runner;
pub mod verify;

pub use error::{Error, Result};

/// Compute backend for experiment execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Evaluate on the calling thread
    Sequential,
    /// Evaluate on a rayon pool (`None` uses the global pool)
    Parallel {
        /// Worker thread count
        workers: Option<usize>,
    },
}

impl Default for Backend {
    fn default() -> Self {
        Self::Parallel { workers: None }
    }
}
