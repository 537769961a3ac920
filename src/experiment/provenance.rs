//! Provenance metadata captured alongside every experiment record.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Host and platform description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// Operating system (`linux`, `macos`, `windows`, ...).
    pub os: String,
    /// CPU architecture (`x86_64`, `aarch64`, ...).
    pub arch: String,
    /// OS family (`unix` or `windows`).
    pub family: String,
    /// Host name from the OS, then `HOSTNAME` / `COMPUTERNAME`, else `unknown`.
    pub hostname: String,
    /// Logical CPUs available to the process.
    pub cpu_count: usize,
}

impl PlatformInfo {
    /// Describe the current host.
    #[must_use]
    pub fn current() -> Self {
        let hostname = Some(gethostname::gethostname().to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .or_else(|| {
                ["HOSTNAME", "COMPUTERNAME"]
                    .iter()
                    .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
            })
            .unwrap_or_else(|| "unknown".to_string());
        let cpu_count = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);

        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            family: std::env::consts::FAMILY.to_string(),
            hostname,
            cpu_count,
        }
    }
}

/// Provenance information attached to every experiment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// UTC instant at which provenance was captured.
    pub captured_at: DateTime<Utc>,
    /// Same instant in the host's local time zone (RFC 3339 with offset).
    pub local_time: String,
    /// Version map for all tools involved in the run.
    pub tool_versions: BTreeMap<String, String>,
    /// Host description.
    pub platform: PlatformInfo,
    /// Arguments of the process that produced the record.
    pub command_line: Vec<String>,
    /// `path -> sha256:<hex>` for files that defined the experiment.
    #[serde(default)]
    pub file_checksums: BTreeMap<String, String>,
}

impl Provenance {
    /// Capture provenance for the current process.
    #[must_use]
    pub fn capture() -> Self {
        let now = Utc::now();
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );

        Self {
            captured_at: now,
            local_time: now.with_timezone(&Local).to_rfc3339(),
            tool_versions,
            platform: PlatformInfo::current(),
            command_line: command_line(std::env::args_os()),
            file_checksums: BTreeMap::new(),
        }
    }

    /// Record the version of an additional tool.
    #[must_use]
    pub fn with_tool_version(mut self, tool: impl Into<String>, version: impl Into<String>) -> Self {
        self.tool_versions.insert(tool.into(), version.into());
        self
    }

    /// Hash `path` and record its checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn with_file_checksum(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let hash = file_hash(path)?;
        self.file_checksums.insert(path.display().to_string(), hash);
        Ok(self)
    }
}

/// Process arguments as text; bytes that are not valid UTF-8 become U+FFFD.
fn command_line(args: impl IntoIterator<Item = OsString>) -> Vec<String> {
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

/// Compute `sha256:<hex>` over the contents of a file.
///
/// # Errors
///
/// Returns `NotFound` if the file does not exist, or `Io` on read failure.
pub fn file_hash(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(format!("file {}", path.display())),
        _ => Error::Io(e),
    })?;

    let mut hasher = Sha256::new();
    io::copy(&mut BufReader::new(file), &mut hasher)?;
    Ok(format!("sha256:{:x}", hasher.finalize()))
}
