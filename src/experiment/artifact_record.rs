//! Artifact Record - content-addressed numeric output of a run

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Artifact Record represents one numeric array produced by a run.
///
/// Values are stored row-major according to `shape`. The `cas_hash`
/// identifies the artifact content and is checked on verification.
///
/// ## CAS Hash Format
///
/// The `cas_hash` follows the format: `algorithm:hex_digest`, computed over
/// the little-endian bytes of every shape dimension (as `u64`) followed by
/// every value (as `f64`).
///
/// Example:
/// - `sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactRecord {
    key: String,
    shape: Vec<usize>,
    values: Vec<f64>,
    cas_hash: String,
    size_bytes: u64,
}

impl ArtifactRecord {
    /// Create a new artifact record, computing its content hash.
    ///
    /// # Arguments
    ///
    /// * `key` - Artifact name/key (e.g., "mandelbrot")
    /// * `shape` - Row-major dimensions of the array
    /// * `values` - Flattened array values
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the product of `shape` does not match
    /// `values.len()`, or if any value is not finite.
    pub fn new(key: impl Into<String>, shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        let key = key.into();
        let expected = shape
            .iter()
            .try_fold(1_usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| {
                Error::InvalidInput(format!("artifact '{key}': shape {shape:?} is too large"))
            })?;
        if expected != values.len() {
            return Err(Error::InvalidInput(format!(
                "artifact '{key}': shape {shape:?} holds {expected} values, got {}",
                values.len()
            )));
        }
        // The container is JSON, which has no encoding for NaN or infinities
        if let Some(ix) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "artifact '{key}': value at index {ix} is not finite"
            )));
        }

        let cas_hash = content_hash(&shape, &values);
        let size_bytes = (values.len() * std::mem::size_of::<f64>()) as u64;

        Ok(Self {
            key,
            shape,
            values,
            cas_hash,
            size_bytes,
        })
    }

    /// Create a one-dimensional artifact.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any value is not finite.
    pub fn vector(key: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let shape = vec![values.len()];
        Self::new(key, shape, values)
    }

    /// Get the artifact key/name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the row-major shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the flattened values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the content-addressable hash.
    #[must_use]
    pub fn cas_hash(&self) -> &str {
        &self.cas_hash
    }

    /// Get the payload size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Element at a two-dimensional `(row, col)` index, if the artifact is 2-D.
    #[must_use]
    pub fn get2(&self, row: usize, col: usize) -> Option<f64> {
        match self.shape.as_slice() {
            [rows, cols] if row < *rows && col < *cols => self.values.get(row * cols + col).copied(),
            _ => None,
        }
    }

    /// Recompute the content hash and compare it with the stored one.
    #[must_use]
    pub fn verify_checksum(&self) -> bool {
        content_hash(&self.shape, &self.values) == self.cas_hash
    }
}

fn content_hash(shape: &[usize], values: &[f64]) -> String {
    let mut hasher = Sha256::new();
    for dim in shape {
        hasher.update((*dim as u64).to_le_bytes());
    }
    for value in values {
        hasher.update(value.to_le_bytes());
    }
    format!("sha256:{:x}", hasher.finalize())
}
