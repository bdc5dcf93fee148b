//! Archive unpacking
//!
//! Turns raw distribution archive bytes into temporary on-disk artifacts,
//! one per embedded `.py` member. Wheels, eggs, and plain zips are all
//! physically zip archives; source tarballs are gzip-compressed tar.
//! Artifacts are [`SourceArtifact`]s backed by delete-on-drop temp files,
//! so every exit path — including a downstream failure after partial
//! consumption — releases whatever was extracted.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};
use crate::filename::ArchiveFormat;
use crate::types::SourceArtifact;

/// Suffix of members subject to import analysis
const SOURCE_SUFFIX: &str = ".py";

/// Unpack `bytes` according to the container format implied by `filename`,
/// returning the embedded source files as temporary artifacts
///
/// Members whose name does not end in `.py` are skipped. An unrecognized
/// filename suffix fails with [`Error::UnsupportedFormat`] and yields
/// nothing.
pub fn unpack_source_files(bytes: &[u8], filename: &str) -> Result<Vec<SourceArtifact>> {
    unpack_source_files_in(bytes, filename, None)
}

/// Like [`unpack_source_files`], but places the temporary artifacts under
/// `temp_dir` instead of the system temp directory
pub fn unpack_source_files_in(
    bytes: &[u8],
    filename: &str,
    temp_dir: Option<&Path>,
) -> Result<Vec<SourceArtifact>> {
    let format = ArchiveFormat::detect(filename).ok_or_else(|| Error::UnsupportedFormat {
        filename: filename.to_string(),
    })?;

    let artifacts = match format {
        ArchiveFormat::TarGz => unpack_tar_gz(bytes, filename, temp_dir)?,
        ArchiveFormat::Wheel | ArchiveFormat::Egg | ArchiveFormat::Zip => {
            unpack_zip(bytes, filename, temp_dir)?
        }
    };

    debug!(
        archive = filename,
        source_files = artifacts.len(),
        "unpacked archive"
    );
    Ok(artifacts)
}

/// Copy one archive member into a fresh temporary artifact
fn copy_member<R: Read>(
    relative_path: &str,
    reader: &mut R,
    temp_dir: Option<&Path>,
) -> Result<SourceArtifact> {
    let mut file = match temp_dir {
        Some(dir) => NamedTempFile::new_in(dir)?,
        None => NamedTempFile::new()?,
    };
    std::io::copy(reader, &mut file)?;
    file.flush()?;
    Ok(SourceArtifact::new(relative_path.to_string(), file))
}

fn unpack_tar_gz(
    bytes: &[u8],
    filename: &str,
    temp_dir: Option<&Path>,
) -> Result<Vec<SourceArtifact>> {
    let decoder = GzDecoder::new(Cursor::new(bytes));
    let mut archive = tar::Archive::new(decoder);

    let entries = archive.entries().map_err(|e| Error::ExtractionFailed {
        filename: filename.to_string(),
        reason: format!("failed to read tar archive: {}", e),
    })?;

    let mut artifacts = Vec::new();
    for entry in entries {
        let mut entry = entry.map_err(|e| Error::ExtractionFailed {
            filename: filename.to_string(),
            reason: format!("failed to read tar entry: {}", e),
        })?;

        let path = entry
            .path()
            .map_err(|e| Error::ExtractionFailed {
                filename: filename.to_string(),
                reason: format!("invalid tar entry path: {}", e),
            })?
            .to_string_lossy()
            .into_owned();

        if !path.ends_with(SOURCE_SUFFIX) {
            continue;
        }
        artifacts.push(copy_member(&path, &mut entry, temp_dir)?);
    }
    Ok(artifacts)
}

fn unpack_zip(
    bytes: &[u8],
    filename: &str,
    temp_dir: Option<&Path>,
) -> Result<Vec<SourceArtifact>> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| Error::ExtractionFailed {
            filename: filename.to_string(),
            reason: format!("failed to read zip archive: {}", e),
        })?;

    let mut artifacts = Vec::new();
    for i in 0..archive.len() {
        let mut member = archive.by_index(i).map_err(|e| Error::ExtractionFailed {
            filename: filename.to_string(),
            reason: format!("failed to read zip entry: {}", e),
        })?;

        if member.is_dir() || !member.name().ends_with(SOURCE_SUFFIX) {
            continue;
        }
        let path = member.name().to_string();
        artifacts.push(copy_member(&path, &mut member, temp_dir)?);
    }
    Ok(artifacts)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    /// Build an in-memory tar.gz with the given (name, contents) entries
    fn build_tar_gz(entries: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, contents) in entries {
            let data = contents.as_bytes();
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, *name, data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    /// Build an in-memory zip with the given (name, contents) entries
    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default();
        for (name, contents) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const ENTRIES: &[(&str, &str)] = &[
        ("pkg/module.py", "import aifc\n"),
        ("pkg/other.py", "import json\n"),
        ("pkg/README.txt", "not source\n"),
    ];

    #[test]
    fn tar_gz_yields_only_source_members() {
        let bytes = build_tar_gz(ENTRIES);
        let artifacts = unpack_source_files(&bytes, "pkg-1.0.tar.gz").unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].relative_path, "pkg/module.py");
        assert_eq!(artifacts[1].relative_path, "pkg/other.py");
    }

    #[test]
    fn zip_yields_only_source_members() {
        let bytes = build_zip(ENTRIES);
        let artifacts = unpack_source_files(&bytes, "pkg-1.0.zip").unwrap();
        assert_eq!(artifacts.len(), 2);
    }

    #[test]
    fn wheel_and_egg_dispatch_to_zip() {
        let bytes = build_zip(ENTRIES);
        assert_eq!(
            unpack_source_files(&bytes, "pkg-1.0-py3-none-any.whl")
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            unpack_source_files(&bytes, "pkg-1.0-py2.7.egg").unwrap().len(),
            2
        );
    }

    #[test]
    fn artifact_contents_match_member() {
        let bytes = build_tar_gz(ENTRIES);
        let artifacts = unpack_source_files(&bytes, "pkg-1.0.tar.gz").unwrap();
        let contents = std::fs::read_to_string(artifacts[0].path()).unwrap();
        assert_eq!(contents, "import aifc\n");
    }

    #[test]
    fn unrecognized_suffix_yields_nothing() {
        let bytes = build_tar_gz(ENTRIES);
        let err = unpack_source_files(&bytes, "pkg-1.0.tar.bz2").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn artifacts_are_deleted_on_drop() {
        let bytes = build_zip(ENTRIES);
        let artifacts = unpack_source_files(&bytes, "pkg-1.0.zip").unwrap();
        let paths: Vec<_> = artifacts.iter().map(|a| a.path().to_path_buf()).collect();
        for path in &paths {
            assert!(path.exists());
        }
        drop(artifacts);
        for path in &paths {
            assert!(!path.exists(), "artifact {} should be removed", path.display());
        }
    }

    #[test]
    fn artifacts_land_in_the_configured_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_tar_gz(ENTRIES);
        let artifacts =
            unpack_source_files_in(&bytes, "pkg-1.0.tar.gz", Some(dir.path())).unwrap();
        assert_eq!(artifacts.len(), 2);
        for artifact in &artifacts {
            assert!(artifact.path().starts_with(dir.path()));
        }
    }

    #[test]
    fn corrupt_archive_is_extraction_failure() {
        let err = unpack_source_files(b"not a zip at all", "pkg-1.0.zip").unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed { .. }));
    }
}
