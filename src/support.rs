//! Python-3 support classification
//!
//! Decides whether a package supports Python 3 from its trove classifiers
//! and per-file interpreter tags. The tag table is a static data asset
//! (`assets/python-tags.json`), so adding a newly observed tag is a data
//! change, not a code change. Unrecognized tags are logged and counted for
//! later table refinement, never fatal.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde::Deserialize;
use tracing::warn;

use crate::error::Result;
use crate::resolver::PackageMetadata;

/// Embedded tag classification table
const TAG_TABLE: &str = include_str!("../assets/python-tags.json");

/// Classifier prefix declaring Python 3 support
const PY3_CLASSIFIER_PREFIX: &str = "Programming Language :: Python :: 3";

/// Which interpreter line a release tag targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PythonSupport {
    /// Python 2 only
    Py2,
    /// Python 3
    Py3,
    /// Either interpreter line
    Either,
    /// Tag carries no interpreter information
    Unknown,
}

/// Lookup table from interpreter tag to classification
pub struct SupportTable {
    tags: HashMap<String, PythonSupport>,
    unrecognized: Mutex<BTreeMap<String, u64>>,
}

impl SupportTable {
    /// Load the embedded classification table
    pub fn load() -> Result<Self> {
        let tags: HashMap<String, PythonSupport> = serde_json::from_str(TAG_TABLE)?;
        Ok(Self {
            tags,
            unrecognized: Mutex::new(BTreeMap::new()),
        })
    }

    /// Classify one interpreter tag
    ///
    /// Tags containing `/` are malformed upload artifacts and classify as
    /// [`PythonSupport::Unknown`]. Tags absent from the table are logged,
    /// counted, and also classify as unknown.
    pub fn classify(&self, tag: &str) -> PythonSupport {
        if tag.contains('/') {
            return PythonSupport::Unknown;
        }
        match self.tags.get(tag) {
            Some(support) => *support,
            None => {
                warn!(tag, "unknown interpreter tag");
                if let Ok(mut unrecognized) = self.unrecognized.lock() {
                    *unrecognized.entry(tag.to_string()).or_insert(0) += 1;
                }
                PythonSupport::Unknown
            }
        }
    }

    /// Whether package metadata declares Python 3 support
    ///
    /// True when a `Programming Language :: Python :: 3` classifier is
    /// present, or when any release file's interpreter tag classifies as
    /// Python 3 or either.
    pub fn supports_python3(&self, metadata: &PackageMetadata) -> bool {
        if metadata
            .info
            .classifiers
            .iter()
            .any(|c| c.starts_with(PY3_CLASSIFIER_PREFIX))
        {
            return true;
        }

        for files in metadata.releases.values() {
            for file in files {
                match self.classify(&file.python_version) {
                    PythonSupport::Py3 | PythonSupport::Either => return true,
                    PythonSupport::Py2 | PythonSupport::Unknown => {}
                }
            }
        }
        false
    }

    /// Tags seen so far that the table does not cover, with counts
    ///
    /// Input for refining the data asset.
    pub fn unrecognized_tags(&self) -> BTreeMap<String, u64> {
        self.unrecognized
            .lock()
            .map(|tags| tags.clone())
            .unwrap_or_default()
    }
}
