//! Error types for batteries-scan
//!
//! A single crate-wide error enum following the taxonomy of the scan
//! pipeline: transient network failures and unsupported formats abort the
//! current package only, while checkpoint failures are fatal to the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for batteries-scan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for batteries-scan
///
/// Per-package variants (`UnsupportedFormat`, `NoDistribution`,
/// `DownloadStatus`, `AnalyzerStatus`, `Network`) abort only the package
/// being processed; `Checkpoint` aborts the whole run.
#[derive(Debug, Error)]
pub enum Error {
    /// Archive filename suffix is not one of the recognized formats
    /// (.whl, .tar.gz, .egg, .zip)
    #[error("unsupported archive format: {filename}")]
    UnsupportedFormat {
        /// The filename whose suffix was not recognized
        filename: String,
    },

    /// Archive could not be read (corruption, truncation, bad compression)
    #[error("extraction of {filename} failed: {reason}")]
    ExtractionFailed {
        /// The archive filename that failed to extract
        filename: String,
        /// The underlying failure
        reason: String,
    },

    /// Metadata resolver found no release with an eligible source archive
    #[error("no source distribution found for package {package}")]
    NoDistribution {
        /// The package that has no eligible distribution
        package: String,
    },

    /// Distribution download returned a non-success HTTP status
    #[error("download of {url} failed with status {status}")]
    DownloadStatus {
        /// The distribution URL that was requested
        url: String,
        /// The HTTP status code received
        status: u16,
    },

    /// Analysis service returned a non-success HTTP status
    #[error("analysis of {path} failed with status {status}")]
    AnalyzerStatus {
        /// Path of the artifact submitted for analysis
        path: PathBuf,
        /// The HTTP status code received
        status: u16,
    },

    /// Network or transport error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Checkpoint persistence failed — fatal, accumulated progress would
    /// otherwise be silently lost
    #[error("checkpoint write to {path} failed: {reason}")]
    Checkpoint {
        /// The checkpoint path that could not be written
        path: PathBuf,
        /// The underlying failure
        reason: String,
    },

    /// Work queue closed before all package identifiers were submitted
    #[error("scan queue closed unexpectedly")]
    QueueClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short phase label for per-package failure log lines
    pub fn phase(&self) -> &'static str {
        match self {
            Error::UnsupportedFormat { .. } => "unpack",
            Error::ExtractionFailed { .. } => "unpack",
            Error::NoDistribution { .. } => "resolve",
            Error::DownloadStatus { .. } => "download",
            Error::AnalyzerStatus { .. } => "analyze",
            Error::Network(_) => "network",
            Error::Checkpoint { .. } => "checkpoint",
            Error::QueueClosed => "queue",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialize",
            Error::Other(_) => "other",
        }
    }
}
