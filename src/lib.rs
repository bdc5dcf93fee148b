//! # batteries-scan
//!
//! Resumable concurrent scanner that inventories which deprecated
//! standard-library modules ("dead batteries", PEP 594) published PyPI
//! packages still import.
//!
//! ## Design Philosophy
//!
//! batteries-scan is designed to be:
//! - **Resumable** - progress checkpoints to disk; a restarted run skips
//!   every package already scanned
//! - **Isolated** - one broken package never aborts the pool
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Pluggable** - import analysis and metadata resolution are traits,
//!   so the coordinator is agnostic to how either is performed
//!
//! ## Quick Start
//!
//! ```no_run
//! use batteries_scan::{Config, Scanner, load_package_universe};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         worker_count: 10,
//!         ..Default::default()
//!     };
//!
//!     let scanner = Scanner::with_defaults(config)?;
//!     let universe = load_package_universe("python3-packages.json".as_ref()).await?;
//!     let summary = scanner.run(universe).await?;
//!
//!     println!(
//!         "scanned {} packages ({} skipped, {} failed)",
//!         summary.scanned, summary.skipped, summary.failed
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Import analysis capability (HTTP service client and in-process scanner)
pub mod analyzer;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Distribution filename parsing
pub mod filename;
/// Package metadata resolution and universe loading
pub mod resolver;
/// Scan coordinator and worker pool
pub mod scanner;
/// Concurrent result store with snapshot/restore
pub mod store;
/// Python-3 support classification
pub mod support;
/// Core types and events
pub mod types;
/// Archive unpacking
pub mod unpack;

// Re-export commonly used types
pub use analyzer::{AnalysisReport, HttpAnalyzer, ImportAnalyzer, RegexAnalyzer};
pub use config::Config;
pub use error::{Error, Result};
pub use filename::{parse, ArchiveFormat};
pub use resolver::{load_package_universe, MetadataResolver, PyPiResolver};
pub use scanner::{ScanSummary, Scanner};
pub use store::ResultStore;
pub use support::{PythonSupport, SupportTable};
pub use types::{DistributionReference, Event, ScanOutcome, SourceArtifact};
pub use unpack::{unpack_source_files, unpack_source_files_in};
