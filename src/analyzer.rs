//! Import analysis capability
//!
//! One trait, two implementations: [`HttpAnalyzer`] talks to an external
//! analysis service over a small JSON request/response protocol, and
//! [`RegexAnalyzer`] performs a best-effort in-process scan. The scan
//! coordinator is agnostic to which one it drives.
//!
//! A transport failure or non-success status is a hard failure of the
//! client call itself and propagates to the caller; a populated `error`
//! field in an otherwise successful response is a soft parse failure that
//! the caller records and moves past.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Standard-library modules scheduled for removal (PEP 594)
const DEPRECATED_MODULES: &[&str] = &[
    "aifc",
    "asynchat",
    "asyncore",
    "audioop",
    "binhex",
    "cgi",
    "cgitb",
    "chunk",
    "crypt",
    "formatter",
    "fpectl",
    "imghdr",
    "imp",
    "macpath",
    "msilib",
    "nis",
    "nntplib",
    "ossaudiodev",
    "parser",
    "pipes",
    "smtpd",
    "sndhdr",
    "spwd",
    "sunau",
    "uu",
    "xdrlib",
];

/// Result of analyzing one source file
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AnalysisReport {
    /// Deprecated modules the file imports
    #[serde(default)]
    pub imports: Vec<String>,
    /// Soft parse failure message; empty string means the file parsed cleanly
    #[serde(default)]
    pub error: String,
}

/// Wire request of the analysis service protocol
#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    path: &'a str,
}

/// Capability that determines which deprecated modules a source file imports
#[async_trait]
pub trait ImportAnalyzer: Send + Sync {
    /// Analyze the source file at `path`
    ///
    /// # Errors
    ///
    /// Returns an error when the analysis could not be performed at all
    /// (transport failure, non-success response, unreadable file). A file
    /// that was analyzed but failed to parse is a success carrying a
    /// non-empty [`AnalysisReport::error`].
    async fn analyze(&self, path: &Path) -> Result<AnalysisReport>;
}

/// Client for a networked import-analysis service
///
/// Sends `{"path": "..."}` and expects `{"imports": [...], "error": "..."}`
/// back; any non-2xx status is a hard failure.
pub struct HttpAnalyzer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalyzer {
    /// Create a client for the service at `endpoint`
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ImportAnalyzer for HttpAnalyzer {
    async fn analyze(&self, path: &Path) -> Result<AnalysisReport> {
        let path_str = path.to_string_lossy();
        let request = AnalyzeRequest { path: &path_str };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::AnalyzerStatus {
                path: path.to_path_buf(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}

/// In-process fallback analyzer
///
/// Scans `import x` and `from x import y` lines with compiled regexes.
/// Cruder than a real parser (no AST, no syntax validation), but needs no
/// external service.
pub struct RegexAnalyzer {
    import_line: Regex,
    from_line: Regex,
    deprecated: HashSet<&'static str>,
}

impl RegexAnalyzer {
    /// Build the analyzer with its compiled line patterns
    pub fn new() -> Result<Self> {
        let import_line = Regex::new(r"^\s*import\s+([A-Za-z_][A-Za-z0-9_]*)")
            .map_err(|e| Error::Other(format!("invalid import pattern: {}", e)))?;
        let from_line = Regex::new(r"^\s*from\s+([A-Za-z_][A-Za-z0-9_]*)\s+import\b")
            .map_err(|e| Error::Other(format!("invalid from-import pattern: {}", e)))?;
        Ok(Self {
            import_line,
            from_line,
            deprecated: DEPRECATED_MODULES.iter().copied().collect(),
        })
    }

    fn scan(&self, source: &str) -> Vec<String> {
        let mut found: HashSet<&str> = HashSet::new();
        for line in source.lines() {
            for pattern in [&self.import_line, &self.from_line] {
                if let Some(captures) = pattern.captures(line) {
                    if let Some(module) = captures.get(1) {
                        if self.deprecated.contains(module.as_str()) {
                            found.insert(module.as_str());
                        }
                    }
                }
            }
        }
        let mut imports: Vec<String> = found.into_iter().map(String::from).collect();
        imports.sort_unstable();
        imports
    }
}

#[async_trait]
impl ImportAnalyzer for RegexAnalyzer {
    async fn analyze(&self, path: &Path) -> Result<AnalysisReport> {
        let bytes = tokio::fs::read(path).await?;
        let source = match String::from_utf8(bytes) {
            Ok(source) => source,
            Err(_) => {
                // Mirror the service's soft failure for undecodable files
                return Ok(AnalysisReport {
                    imports: Vec::new(),
                    error: "unicode-decode-error".to_string(),
                });
            }
        };
        Ok(AnalysisReport {
            imports: self.scan(&source),
            error: String::new(),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_artifact(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    // ── HTTP analyzer ───────────────────────────────────────────────────

    #[tokio::test]
    async fn http_analyzer_returns_imports() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "imports": ["aifc", "imp"],
                "error": "",
            })))
            .mount(&server)
            .await;

        let analyzer = HttpAnalyzer::new(reqwest::Client::new(), server.uri());
        let artifact = write_artifact(b"import aifc\n");
        let report = analyzer.analyze(artifact.path()).await.unwrap();
        assert_eq!(report.imports, vec!["aifc", "imp"]);
        assert!(report.error.is_empty());
    }

    #[tokio::test]
    async fn http_analyzer_surfaces_soft_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "imports": [],
                "error": "syntax-error",
            })))
            .mount(&server)
            .await;

        let analyzer = HttpAnalyzer::new(reqwest::Client::new(), server.uri());
        let artifact = write_artifact(b"def broken(:\n");
        let report = analyzer.analyze(artifact.path()).await.unwrap();
        assert!(report.imports.is_empty());
        assert_eq!(report.error, "syntax-error");
    }

    #[tokio::test]
    async fn http_analyzer_missing_error_field_is_clean() {
        // The service omits "error" entirely on clean parses
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "imports": ["uu"] })),
            )
            .mount(&server)
            .await;

        let analyzer = HttpAnalyzer::new(reqwest::Client::new(), server.uri());
        let artifact = write_artifact(b"import uu\n");
        let report = analyzer.analyze(artifact.path()).await.unwrap();
        assert_eq!(report.imports, vec!["uu"]);
        assert!(report.error.is_empty());
    }

    #[tokio::test]
    async fn http_analyzer_non_success_is_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let analyzer = HttpAnalyzer::new(reqwest::Client::new(), server.uri());
        let artifact = write_artifact(b"import aifc\n");
        let err = analyzer.analyze(artifact.path()).await.unwrap_err();
        assert!(matches!(err, Error::AnalyzerStatus { status: 500, .. }));
    }

    // ── In-process analyzer ─────────────────────────────────────────────

    #[tokio::test]
    async fn regex_analyzer_finds_deprecated_imports() {
        let analyzer = RegexAnalyzer::new().unwrap();
        let artifact = write_artifact(
            b"import aifc\nimport json\nfrom imp import reload\nimport aifc\n",
        );
        let report = analyzer.analyze(artifact.path()).await.unwrap();
        assert_eq!(report.imports, vec!["aifc", "imp"]);
        assert!(report.error.is_empty());
    }

    #[tokio::test]
    async fn regex_analyzer_ignores_non_deprecated() {
        let analyzer = RegexAnalyzer::new().unwrap();
        let artifact = write_artifact(b"import os\nfrom json import loads\n");
        let report = analyzer.analyze(artifact.path()).await.unwrap();
        assert!(report.imports.is_empty());
    }

    #[tokio::test]
    async fn regex_analyzer_reports_undecodable_file_softly() {
        let analyzer = RegexAnalyzer::new().unwrap();
        let artifact = write_artifact(&[0xff, 0xfe, 0x00, 0x9f]);
        let report = analyzer.analyze(artifact.path()).await.unwrap();
        assert!(report.imports.is_empty());
        assert_eq!(report.error, "unicode-decode-error");
    }
}
