//! Core types for batteries-scan

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::NamedTempFile;

/// A resolved pointer to one downloadable distribution archive
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionReference {
    /// Package identifier the distribution belongs to
    pub package: String,
    /// Direct download URL of the archive
    pub url: String,
    /// Release version string (may be empty)
    pub version: String,
}

/// Final outcome of scanning one package
///
/// Created once, atomically, when a package finishes processing; owned by
/// the [`ResultStore`](crate::store::ResultStore) afterwards and never
/// mutated. `imports` and `errors` are multisets: module name (or error
/// message) to occurrence count across the package's source files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// URL of the distribution that was scanned
    pub url: String,
    /// Version of the distribution that was scanned
    pub version: String,
    /// Deprecated module name → number of files importing it
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub imports: BTreeMap<String, u64>,
    /// Analysis error message → number of files producing it
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, u64>,
}

impl ScanOutcome {
    /// Record one import finding for `module`
    pub fn record_import(&mut self, module: &str) {
        *self.imports.entry(module.to_string()).or_insert(0) += 1;
    }

    /// Record one soft analysis failure with message `message`
    pub fn record_error(&mut self, message: &str) {
        *self.errors.entry(message.to_string()).or_insert(0) += 1;
    }
}

/// One source file extracted from a distribution archive
///
/// The backing file is a [`NamedTempFile`], so the artifact is removed
/// from disk when this value is dropped — on every exit path, including
/// early termination after a downstream failure.
#[derive(Debug)]
pub struct SourceArtifact {
    /// Path of the member inside the archive
    pub relative_path: String,
    file: NamedTempFile,
}

impl SourceArtifact {
    /// Wrap an extracted temp file together with its archive-relative path
    pub fn new(relative_path: String, file: NamedTempFile) -> Self {
        Self {
            relative_path,
            file,
        }
    }

    /// Filesystem path of the temporary artifact
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Events emitted by the scan coordinator
///
/// Broadcast to subscribers for observability; delivery is lossy (slow
/// subscribers miss events) and never affects the scan itself.
#[derive(Clone, Debug)]
pub enum Event {
    /// A package completed processing and its outcome was stored
    Scanned {
        /// Package identifier
        package: String,
        /// Number of distinct deprecated modules found
        imports: usize,
        /// Number of distinct analysis error messages recorded
        errors: usize,
    },
    /// A package was skipped because the store already holds an outcome
    Skipped {
        /// Package identifier
        package: String,
    },
    /// A package aborted before its outcome could be stored
    Failed {
        /// Package identifier
        package: String,
        /// Human-readable failure cause
        reason: String,
    },
    /// The periodic snapshot task persisted the store
    Checkpointed {
        /// Number of packages in the persisted state
        packages: usize,
    },
}
