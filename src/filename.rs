//! Distribution filename parsing
//!
//! Decomposes an archive filename like `zymbit-trequests-0.9.5.tar.gz`
//! into a package name and version. Version detection is an inherently
//! ambiguous heuristic; the fixtures in the test module are the contract.

use crate::error::{Error, Result};

/// Platform suffix some legacy sdists carry between version and extension
const LINUX_PLATFORM_SUFFIX: &str = ".linux-x86_64";

/// The four recognized distribution container formats
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Binary wheel (`.whl`) — physically a zip archive
    Wheel,
    /// Source tarball (`.tar.gz`)
    TarGz,
    /// Legacy egg (`.egg`) — physically a zip archive
    Egg,
    /// Plain zip (`.zip`)
    Zip,
}

impl ArchiveFormat {
    /// Detect the container format from a filename suffix
    pub fn detect(filename: &str) -> Option<Self> {
        if filename.ends_with(".whl") {
            Some(ArchiveFormat::Wheel)
        } else if filename.ends_with(".tar.gz") {
            Some(ArchiveFormat::TarGz)
        } else if filename.ends_with(".egg") {
            Some(ArchiveFormat::Egg)
        } else if filename.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }
}

/// Strip the container-specific suffix, leaving `name-version` material
///
/// Wheels drop their trailing interpreter/ABI/platform tags, eggs drop the
/// trailing interpreter tag, tarballs and zips drop the literal extension.
pub fn trim_format(filename: &str) -> Result<String> {
    let format = ArchiveFormat::detect(filename).ok_or_else(|| Error::UnsupportedFormat {
        filename: filename.to_string(),
    })?;

    let trimmed = match format {
        ArchiveFormat::Wheel => drop_trailing_components(filename, 3),
        ArchiveFormat::TarGz => filename.trim_end_matches(".tar.gz").to_string(),
        ArchiveFormat::Egg => drop_trailing_components(filename, 1),
        ArchiveFormat::Zip => filename.trim_end_matches(".zip").to_string(),
    };
    Ok(trimmed)
}

/// Drop the last `n` hyphen-separated components (tag components carry the
/// extension, so no separate suffix strip is needed)
fn drop_trailing_components(filename: &str, n: usize) -> String {
    let parts: Vec<&str> = filename.split('-').collect();
    let keep = parts.len().saturating_sub(n);
    if keep == 0 {
        return filename.to_string();
    }
    parts[..keep].join("-")
}

/// Split trimmed `name-version` material into package name and version
///
/// Scans hyphen-separated tokens left to right, starting at index 1 (the
/// version can never be the first token); the first token containing a
/// digit marks the version boundary. A trailing literal `dev` token with
/// no boundary found is treated as the version. Otherwise the whole input
/// is the package name with an empty version.
pub fn split_name_version(input: &str) -> (String, String) {
    let parts: Vec<&str> = input.split('-').collect();

    let mut package = String::new();
    let mut version = String::new();

    if parts.len() == 1 {
        package = input.to_string();
    } else {
        for (i, part) in parts.iter().enumerate() {
            if i == 0 {
                continue;
            }
            if part.chars().any(|c| c.is_ascii_digit()) {
                package = parts[..i].join("-");
                version = parts[i..].join("-");
                break;
            }
        }

        if package.is_empty() && parts[parts.len() - 1] == "dev" {
            package = parts[..parts.len() - 1].join("-");
            version = "dev".to_string();
        }

        if package.is_empty() {
            package = parts.join("-");
        }
    }

    (normalize_name(&package), version)
}

/// Underscores and spaces are equivalent to hyphens in package names
fn normalize_name(name: &str) -> String {
    name.replace(['_', ' '], "-")
}

/// Parse a distribution archive filename into `(package, version)`
///
/// Fails with [`Error::UnsupportedFormat`] when the suffix is not one of
/// the four recognized container formats. Version may be empty.
pub fn parse(filename: &str) -> Result<(String, String)> {
    let trimmed = trim_format(filename)?;
    // Legacy sdists embed a platform suffix between version and extension
    let trimmed = trimmed.replace(LINUX_PLATFORM_SUFFIX, "");
    Ok(split_name_version(&trimmed))
}
