//! Package metadata resolution
//!
//! Resolves a package identifier to its newest downloadable source
//! distribution via the PyPI JSON API, and loads the package universe
//! (a JSON array of package identifiers) that feeds the scan.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::filename::ArchiveFormat;
use crate::types::DistributionReference;

/// Capability that resolves a package identifier to a distribution URL
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolve the latest source distribution of `package`
    ///
    /// "Latest" is the file with the most recent upload time among all
    /// releases whose filename matches a recognized archive format.
    ///
    /// # Errors
    ///
    /// [`Error::NoDistribution`] when no release carries an eligible
    /// archive; transport and non-success failures propagate as-is.
    async fn latest_source(&self, package: &str) -> Result<DistributionReference>;
}

/// Top-level package descriptor of the PyPI JSON API
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PackageMetadata {
    /// Static package information
    #[serde(default)]
    pub info: PackageInfo,
    /// Version string → files published for that release
    #[serde(default)]
    pub releases: BTreeMap<String, Vec<ReleaseFile>>,
}

/// Static package information
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PackageInfo {
    /// Trove classifiers declared by the package
    #[serde(default)]
    pub classifiers: Vec<String>,
}

/// One published file within a release
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReleaseFile {
    /// Direct download URL
    #[serde(default)]
    pub url: String,
    /// Published filename; falls back to the URL tail when absent
    #[serde(default)]
    pub filename: Option<String>,
    /// Upload timestamp (naive, as PyPI serves it)
    #[serde(default)]
    pub upload_time: Option<NaiveDateTime>,
    /// Interpreter tag declared for this file (e.g. "py3", "cp27")
    #[serde(default)]
    pub python_version: String,
}

impl ReleaseFile {
    /// Filename used for format detection
    pub fn effective_filename(&self) -> &str {
        match &self.filename {
            Some(name) => name,
            None => self.url.rsplit('/').next().unwrap_or(&self.url),
        }
    }
}

impl PackageMetadata {
    /// Pick the newest file whose filename matches a recognized format
    pub fn latest_source_file(&self) -> Option<(&str, &ReleaseFile)> {
        let mut best: Option<(&str, &ReleaseFile)> = None;
        for (version, files) in &self.releases {
            for file in files {
                if ArchiveFormat::detect(file.effective_filename()).is_none() {
                    continue;
                }
                let newer = match best {
                    Some((_, current)) => file.upload_time > current.upload_time,
                    None => true,
                };
                if newer {
                    best = Some((version, file));
                }
            }
        }
        best
    }
}

/// Resolver backed by the PyPI JSON API (`{base}/pypi/{package}/json`)
pub struct PyPiResolver {
    client: reqwest::Client,
    base_url: String,
}

impl PyPiResolver {
    /// Create a resolver against the API at `base_url`
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch the full metadata descriptor for `package`
    pub async fn fetch_metadata(&self, package: &str) -> Result<PackageMetadata> {
        let url = format!("{}/pypi/{}/json", self.base_url, package);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::DownloadStatus {
                url,
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetadataResolver for PyPiResolver {
    async fn latest_source(&self, package: &str) -> Result<DistributionReference> {
        let metadata = self.fetch_metadata(package).await?;
        let (version, file) =
            metadata
                .latest_source_file()
                .ok_or_else(|| Error::NoDistribution {
                    package: package.to_string(),
                })?;
        Ok(DistributionReference {
            package: package.to_string(),
            url: file.url.clone(),
            version: version.to_string(),
        })
    }
}

/// Load the package universe: a JSON array of package identifiers
pub async fn load_package_universe(path: &Path) -> Result<Vec<String>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn metadata_body() -> serde_json::Value {
        serde_json::json!({
            "info": { "classifiers": ["Programming Language :: Python :: 3"] },
            "releases": {
                "0.9.0": [
                    {
                        "url": "https://files.example/demo-0.9.0.tar.gz",
                        "filename": "demo-0.9.0.tar.gz",
                        "upload_time": "2018-03-01T10:00:00",
                        "python_version": "source",
                    },
                ],
                "1.0.0": [
                    {
                        // Not a recognized archive format — must be skipped
                        "url": "https://files.example/demo-1.0.0.exe",
                        "filename": "demo-1.0.0.exe",
                        "upload_time": "2019-06-01T10:00:00",
                        "python_version": "py3",
                    },
                    {
                        "url": "https://files.example/demo-1.0.0.zip",
                        "filename": "demo-1.0.0.zip",
                        "upload_time": "2019-05-01T10:00:00",
                        "python_version": "source",
                    },
                ],
            },
        })
    }

    #[test]
    fn picks_newest_eligible_file() {
        let metadata: PackageMetadata = serde_json::from_value(metadata_body()).unwrap();
        let (version, file) = metadata.latest_source_file().unwrap();
        assert_eq!(version, "1.0.0");
        assert_eq!(file.effective_filename(), "demo-1.0.0.zip");
    }

    #[test]
    fn falls_back_to_url_tail_for_filename() {
        let file = ReleaseFile {
            url: "https://files.example/path/demo-1.0.tar.gz".to_string(),
            ..Default::default()
        };
        assert_eq!(file.effective_filename(), "demo-1.0.tar.gz");
    }

    #[tokio::test]
    async fn resolves_latest_source_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pypi/demo/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_body()))
            .mount(&server)
            .await;

        let resolver = PyPiResolver::new(reqwest::Client::new(), server.uri());
        let reference = resolver.latest_source("demo").await.unwrap();
        assert_eq!(reference.package, "demo");
        assert_eq!(reference.version, "1.0.0");
        assert_eq!(reference.url, "https://files.example/demo-1.0.0.zip");
    }

    #[tokio::test]
    async fn no_eligible_file_is_no_distribution() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pypi/empty/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "info": { "classifiers": [] },
                "releases": {
                    "1.0": [{
                        "url": "https://files.example/empty-1.0.exe",
                        "filename": "empty-1.0.exe",
                        "upload_time": "2019-01-01T00:00:00",
                    }],
                },
            })))
            .mount(&server)
            .await;

        let resolver = PyPiResolver::new(reqwest::Client::new(), server.uri());
        let err = resolver.latest_source("empty").await.unwrap_err();
        assert!(matches!(err, Error::NoDistribution { .. }));
    }

    #[tokio::test]
    async fn metadata_fetch_failure_propagates_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolver = PyPiResolver::new(reqwest::Client::new(), server.uri());
        let err = resolver.latest_source("missing").await.unwrap_err();
        assert!(matches!(err, Error::DownloadStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn loads_package_universe_from_json_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"["alpha", "beta", "gamma"]"#).unwrap();
        file.flush().unwrap();

        let universe = load_package_universe(file.path()).await.unwrap();
        assert_eq!(universe, vec!["alpha", "beta", "gamma"]);
    }
}
