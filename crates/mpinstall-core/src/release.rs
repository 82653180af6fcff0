//! Release listing parsing and latest-version selection.
//!
//! A release listing is an HTML directory index. Two layouts are
//! understood:
//!
//! - **Folder** listings, where each release lives in its own directory
//!   (`<a href="2.9.3/">`). The archive URL is `<base><ver>/<archive>`.
//! - **Flat** listings, where archives sit next to each other
//!   (`<a href="MacPorts-2.9.3.tar.bz2">`). The archive URL is
//!   `<base><archive>`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{ReleaseError, Result};
use crate::version::Version;

/// Archive file name prefix used by the upstream project.
pub const ARCHIVE_PREFIX: &str = "MacPorts-";

/// Archive file name suffix (bzip2-compressed tarball).
pub const ARCHIVE_SUFFIX: &str = ".tar.bz2";

/// Suffix of the checksum file published next to each archive.
pub const CHECKSUM_SUFFIX: &str = ".chk.txt";

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href\s*=\s*"([^"]+)""#).expect("valid href regex"));

static ARCHIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^MacPorts-(\d+(?:\.\d+)*)\.tar\.bz2$").expect("valid archive regex")
});

/// How a release was discovered in the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseLayout {
    /// One directory per release.
    Folder,
    /// Archives listed directly.
    Flat,
}

/// A downloadable release.
#[derive(Debug, Clone, Serialize)]
pub struct Release {
    pub version: Version,
    pub archive_name: String,
    pub url: String,
    pub layout: ReleaseLayout,
}

impl Release {
    /// Builds the release entry for `version` under `base_url`.
    pub fn new(base_url: &str, version: Version, layout: ReleaseLayout) -> Self {
        let base = normalize_base_url(base_url);
        let archive_name = format!("{ARCHIVE_PREFIX}{version}{ARCHIVE_SUFFIX}");
        let url = match layout {
            ReleaseLayout::Folder => format!("{base}{version}/{archive_name}"),
            ReleaseLayout::Flat => format!("{base}{archive_name}"),
        };
        Self {
            version,
            archive_name,
            url,
            layout,
        }
    }

    /// Name of the directory the archive extracts into (`MacPorts-2.9.3`).
    pub fn source_dir_name(&self) -> &str {
        self.archive_name
            .strip_suffix(ARCHIVE_SUFFIX)
            .unwrap_or(&self.archive_name)
    }

    /// URL of the checksum file published alongside the archive.
    pub fn checksum_url(&self) -> String {
        let stem = self.url.strip_suffix(ARCHIVE_SUFFIX).unwrap_or(&self.url);
        format!("{stem}{CHECKSUM_SUFFIX}")
    }
}

/// Ensures the base URL ends with exactly one `/`.
pub fn normalize_base_url(base_url: &str) -> String {
    format!("{}/", base_url.trim().trim_end_matches('/'))
}

/// Extracts every release referenced by the listing.
///
/// The result is sorted ascending by version and contains each version at
/// most once (the first occurrence in the document wins). Unparseable links
/// are ignored.
pub fn parse_listing(base_url: &str, html: &str) -> Vec<Release> {
    let mut seen = HashSet::new();
    let mut releases = Vec::new();

    for cap in HREF_RE.captures_iter(html) {
        let Some((version, layout)) = classify_href(&cap[1]) else {
            continue;
        };
        if seen.insert(version_key(&version)) {
            releases.push(Release::new(base_url, version, layout));
        }
    }

    releases.sort_by(|a, b| a.version.cmp(&b.version));
    releases
}

/// Dedup key treating `1.2` and `1.2.0` as the same release.
fn version_key(version: &Version) -> Vec<u64> {
    let parts = version.parts();
    let len = parts.iter().rposition(|&p| p != 0).map_or(0, |i| i + 1);
    parts[..len].to_vec()
}

/// Smallest number of dotted components a release version carries.
/// Bare integers (`2024/`, pagination `3/`) are not releases.
const MIN_VERSION_PARTS: usize = 2;

fn release_version(text: &str) -> Option<Version> {
    text.parse::<Version>()
        .ok()
        .filter(|v| v.parts().len() >= MIN_VERSION_PARTS)
}

fn classify_href(href: &str) -> Option<(Version, ReleaseLayout)> {
    let target = href.split(&['?', '#'][..]).next().unwrap_or_default();

    if let Some(dir) = target.strip_suffix('/') {
        let segment = dir.rsplit('/').next().unwrap_or_default();
        return release_version(segment).map(|v| (v, ReleaseLayout::Folder));
    }

    let file = target.rsplit('/').next().unwrap_or_default();
    let cap = ARCHIVE_RE.captures(file)?;
    release_version(&cap[1]).map(|v| (v, ReleaseLayout::Flat))
}

/// Returns the highest release.
///
/// # Errors
///
/// Returns [`ReleaseError::NotFound`] if `releases` is empty.
pub fn select_latest(url: &str, releases: &[Release]) -> Result<Release> {
    releases
        .iter()
        .max_by(|a, b| a.version.cmp(&b.version))
        .cloned()
        .ok_or_else(|| ReleaseError::not_found(url))
}
