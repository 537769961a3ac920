//! On-disk layout of a results container
//!
//! A container is one JSON document:
//!
//! ```text
//! {
//!   "format": "repro-container",
//!   "schema_version": { "major": 1, "minor": 0, "patch": 0 },
//!   "created_at": "2026-10-19T12:00:00Z",
//!   "records": [ <ExperimentRecord>, ... ]
//! }
//! ```
//!
//! Readers accept any document with the same `format` tag and major version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::experiment::ExperimentRecord;
use crate::{Error, Result};

/// Tag identifying a results container document.
pub const FORMAT_TAG: &str = "repro-container";

/// Schema version written by this build.
pub const SCHEMA_VERSION: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Semantic version describing the container schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Incremented for breaking changes.
    pub major: u32,
    /// Incremented for additive changes.
    pub minor: u32,
    /// Incremented for fixes that do not change the layout.
    pub patch: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether a document at `self` can be read by this build.
    #[must_use]
    pub const fn is_readable(self) -> bool {
        self.major == SCHEMA_VERSION.major
    }

    /// Whether this build may rewrite a document at `self` without dropping
    /// fields added by a newer minor version.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        self.is_readable() && self.minor <= SCHEMA_VERSION.minor
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Only the fields needed to decide whether a file is ours.
#[derive(Deserialize)]
struct Header {
    format: Option<String>,
    schema_version: Option<SchemaVersion>,
}

/// Full container document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ContainerDocument {
    pub(crate) format: String,
    pub(crate) schema_version: SchemaVersion,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) records: Vec<ExperimentRecord>,
}

impl ContainerDocument {
    /// Empty document stamped with the current time.
    pub(crate) fn empty() -> Self {
        Self {
            format: FORMAT_TAG.to_string(),
            schema_version: SCHEMA_VERSION,
            created_at: Utc::now(),
            records: Vec::new(),
        }
    }

    /// Decode and validate a document read from `path`.
    pub(crate) fn decode(bytes: &[u8], path: &Path) -> Result<Self> {
        let header: Header = serde_json::from_slice(bytes).map_err(|e| {
            Error::Format(format!("{} is not a results container: {e}", path.display()))
        })?;

        match header.format.as_deref() {
            Some(FORMAT_TAG) => {}
            Some(other) => {
                return Err(Error::Format(format!(
                    "{}: unexpected format tag '{other}', expected '{FORMAT_TAG}'",
                    path.display()
                )))
            }
            None => {
                return Err(Error::Format(format!(
                    "{}: missing format tag",
                    path.display()
                )))
            }
        }

        let version = header.schema_version.ok_or_else(|| {
            Error::Format(format!("{}: missing schema version", path.display()))
        })?;
        if !version.is_readable() {
            return Err(Error::Format(format!(
                "{}: schema version {version} cannot be read (this build reads {}.x)",
                path.display(),
                SCHEMA_VERSION.major
            )));
        }

        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode the document as pretty-printed JSON.
    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<ContainerDocument> {
        ContainerDocument::decode(json.as_bytes(), Path::new("test.json"))
    }

    #[test]
    fn test_empty_document_round_trip() {
        let doc = ContainerDocument::empty();
        let bytes = doc.encode().unwrap();
        let decoded = ContainerDocument::decode(&bytes, Path::new("x")).unwrap();
        assert_eq!(decoded.format, FORMAT_TAG);
        assert_eq!(decoded.schema_version, SCHEMA_VERSION);
        assert_eq!(decoded.created_at, doc.created_at);
        assert!(decoded.records.is_empty());
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(matches!(decode("not json"), Err(Error::Format(_))));
    }

    #[test]
    fn test_rejects_foreign_tag() {
        let json = r#"{"format": "something-else", "schema_version": {"major":1,"minor":0,"patch":0}}"#;
        assert!(matches!(decode(json), Err(Error::Format(_))));
    }

    #[test]
    fn test_rejects_missing_tag() {
        assert!(matches!(decode("{}"), Err(Error::Format(_))));
    }

    #[test]
    fn test_rejects_future_major_version() {
        let json = r#"{"format": "repro-container", "schema_version": {"major":2,"minor":0,"patch":0},
                      "created_at": "2026-01-01T00:00:00Z", "records": []}"#;
        let err = decode(json).unwrap_err();
        assert!(format!("{err}").contains("2.0.0"));
    }

    #[test]
    fn test_accepts_newer_minor_version() {
        let json = r#"{"format": "repro-container", "schema_version": {"major":1,"minor":7,"patch":2},
                      "created_at": "2026-01-01T00:00:00Z", "records": []}"#;
        let doc = decode(json).unwrap();
        assert_eq!(doc.schema_version, SchemaVersion::new(1, 7, 2));
    }

    #[test]
    fn test_newer_minor_is_read_only() {
        assert!(SCHEMA_VERSION.is_writable());
        assert!(SchemaVersion::new(1, 0, 9).is_writable());
        assert!(SchemaVersion::new(1, 7, 2).is_readable());
        assert!(!SchemaVersion::new(1, 7, 2).is_writable());
        assert!(!SchemaVersion::new(2, 0, 0).is_writable());
    }
}
