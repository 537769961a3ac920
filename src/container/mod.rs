//! Results container - file-backed record store
//!
//! **Append-Only Write Pattern**:
//! - Records are added, never updated or removed in place
//! - Every insert rewrites the whole document into a temporary file in the
//!   same directory, syncs it, and renames it over the container
//! - A reader therefore sees either the old or the new document, never a
//!   partially written record
//!
//! Deleting a container (or a record) is done by removing the file.

mod format;

pub use format::{SchemaVersion, FORMAT_TAG, SCHEMA_VERSION};

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::experiment::{ExperimentRecord, RecordStore, RunStatus};
use crate::{Error, Result};
use format::ContainerDocument;

/// One line of a container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    /// Record identifier
    pub record_id: Uuid,
    /// Experiment name
    pub name: String,
    /// Record creation timestamp
    pub created_at: DateTime<Utc>,
    /// Final run status
    pub status: RunStatus,
    /// Number of output artifacts
    pub outputs: usize,
}

impl From<&ExperimentRecord> for RecordSummary {
    fn from(record: &ExperimentRecord) -> Self {
        Self {
            record_id: record.record_id(),
            name: record.name().to_string(),
            created_at: record.created_at(),
            status: record.run().status(),
            outputs: record.outputs().len(),
        }
    }
}

/// Handle to a results container on disk.
///
/// The handle holds only the path; every operation reads the current file,
/// so several handles to the same container stay consistent as long as
/// writes are sequential.
///
/// # Example
///
/// ```rust,no_run
/// use repro_store::container::ResultsContainer;
/// use repro_store::experiment::RecordStore;
///
/// let container = ResultsContainer::open_or_create("results.json")?;
/// for summary in container.summaries()? {
///     println!("{} {}", summary.record_id, summary.name);
/// }
/// # Ok::<(), repro_store::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ResultsContainer {
    path: PathBuf,
}

impl ResultsContainer {
    /// Create a new, empty container.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a file is already present at `path`, or
    /// `StorageError` if the file cannot be written.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            return Err(Error::AlreadyExists(path.display().to_string()));
        }

        let container = Self { path };
        container.write_document(&ContainerDocument::empty(), false)?;
        tracing::debug!(path = %container.path.display(), "created results container");
        Ok(container)
    }

    /// Open an existing container, validating its format.
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no file at `path`, `Format` if the file is not
    /// a readable results container.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let container = Self {
            path: path.as_ref().to_path_buf(),
        };
        let doc = container.load()?;
        tracing::debug!(
            path = %container.path.display(),
            records = doc.records.len(),
            schema_version = %doc.schema_version,
            "opened results container"
        );
        Ok(container)
    }

    /// Open the container at `path`, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create) and [`open`](Self::open).
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Path of the container file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Timestamp at which the container was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be read.
    pub fn created_at(&self) -> Result<DateTime<Utc>> {
        Ok(self.load()?.created_at)
    }

    /// Schema version of the document on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be read.
    pub fn schema_version(&self) -> Result<SchemaVersion> {
        Ok(self.load()?.schema_version)
    }

    /// All records, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be read.
    pub fn records(&self) -> Result<Vec<ExperimentRecord>> {
        Ok(self.load()?.records)
    }

    /// Summaries of all records, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be read.
    pub fn summaries(&self) -> Result<Vec<RecordSummary>> {
        Ok(self
            .load()?
            .records
            .iter()
            .map(RecordSummary::from)
            .collect())
    }

    /// Find records whose id starts with `prefix` (as printed by `list`).
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing matches, `InvalidInput` when the prefix is
    /// ambiguous.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<Uuid> {
        let prefix = prefix.to_ascii_lowercase();
        let matches: Vec<Uuid> = self
            .load()?
            .records
            .iter()
            .map(ExperimentRecord::record_id)
            .filter(|id| id.to_string().starts_with(&prefix))
            .collect();

        match matches.as_slice() {
            [] => Err(Error::NotFound(format!("record {prefix}"))),
            [id] => Ok(*id),
            _ => Err(Error::InvalidInput(format!(
                "record id prefix '{prefix}' matches {} records",
                matches.len()
            ))),
        }
    }

    fn load(&self) -> Result<ContainerDocument> {
        let bytes = fs::read(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                Error::NotFound(format!("results container {}", self.path.display()))
            }
            _ => Error::Io(e),
        })?;
        ContainerDocument::decode(&bytes, &self.path)
    }

    /// Write `doc` via temp file + rename. With `overwrite == false` the
    /// rename refuses to replace an existing file.
    fn write_document(&self, doc: &ContainerDocument, overwrite: bool) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let bytes = doc.encode()?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
            Error::StorageError(format!(
                "Failed to create temporary file in {}: {e}",
                dir.display()
            ))
        })?;
        if overwrite {
            // The rename ignores the target's mode, so honour it here
            let permissions = fs::metadata(&self.path)?.permissions();
            if permissions.readonly() {
                return Err(Error::StorageError(format!(
                    "{} is read-only",
                    self.path.display()
                )));
            }
            tmp.as_file().set_permissions(permissions).map_err(|e| {
                Error::StorageError(format!(
                    "Failed to set permissions for {}: {e}",
                    self.path.display()
                ))
            })?;
        }
        tmp.write_all(&bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| {
                Error::StorageError(format!("Failed to write {}: {e}", self.path.display()))
            })?;

        // On failure the PersistError drops the temp file, which deletes it
        let persisted = if overwrite {
            tmp.persist(&self.path)
        } else {
            tmp.persist_noclobber(&self.path)
        };
        persisted.map_err(|e| match e.error.kind() {
            ErrorKind::AlreadyExists => Error::AlreadyExists(self.path.display().to_string()),
            _ => Error::StorageError(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e.error
            )),
        })?;
        Ok(())
    }
}

impl RecordStore for ResultsContainer {
    fn insert(&mut self, record: ExperimentRecord) -> Result<Uuid> {
        let mut doc = self.load()?;
        if !doc.schema_version.is_writable() {
            return Err(Error::Format(format!(
                "{}: schema version {} is newer than {SCHEMA_VERSION}; \
                 refusing to rewrite it",
                self.path.display(),
                doc.schema_version
            )));
        }
        let record_id = record.record_id();
        if doc.records.iter().any(|r| r.record_id() == record_id) {
            return Err(Error::DuplicateRecord(record_id.to_string()));
        }

        doc.records.push(record);
        self.write_document(&doc, true)?;

        tracing::info!(
            record_id = %record_id,
            path = %self.path.display(),
            records = doc.records.len(),
            "persisted experiment record"
        );
        Ok(record_id)
    }

    fn get(&self, record_id: Uuid) -> Result<ExperimentRecord> {
        self.load()?
            .records
            .into_iter()
            .find(|r| r.record_id() == record_id)
            .ok_or_else(|| Error::NotFound(format!("record {record_id}")))
    }

    fn ids(&self) -> Result<Vec<Uuid>> {
        Ok(self
            .load()?
            .records
            .iter()
            .map(ExperimentRecord::record_id)
            .collect())
    }
}
