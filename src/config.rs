//! Configuration types for batteries-scan

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the scan pipeline
///
/// All fields have sensible defaults; a `Config::default()` scanner talks
/// to the public PyPI JSON API and a local analysis service on port 4000.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Number of concurrent scan workers (default: 10)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Seconds between periodic result snapshots (default: 60)
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,

    /// Path of the persisted scan state (default: "results.json")
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,

    /// Endpoint of the import-analysis service (default: "http://127.0.0.1:4000")
    #[serde(default = "default_analyzer_url")]
    pub analyzer_url: String,

    /// Base URL of the package metadata API (default: "https://pypi.org")
    #[serde(default = "default_metadata_base_url")]
    pub metadata_base_url: String,

    /// Directory for temporary source artifacts (default: the system
    /// temp directory)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Timeout for each HTTP request in seconds (default: 30)
    ///
    /// Applied to metadata lookups, distribution downloads, and analysis
    /// calls alike, so a single unresponsive host cannot stall a worker
    /// indefinitely.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Config {
    /// Snapshot interval as a [`Duration`]
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    /// HTTP request timeout as a [`Duration`]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
            results_path: default_results_path(),
            analyzer_url: default_analyzer_url(),
            metadata_base_url: default_metadata_base_url(),
            temp_dir: None,
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_worker_count() -> usize {
    10
}

fn default_snapshot_interval_secs() -> u64 {
    60
}

fn default_results_path() -> PathBuf {
    PathBuf::from("results.json")
}

fn default_analyzer_url() -> String {
    "http://127.0.0.1:4000".to_string()
}

fn default_metadata_base_url() -> String {
    "https://pypi.org".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}
