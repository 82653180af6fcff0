//! Release discovery over HTTP.

use mpinstall_core::error::{ReleaseError, Result};
use mpinstall_core::release::{self, Release};
use tracing::{debug, info, warn};

use crate::http::Fetcher;

/// Fetches the listing at `base_url` and returns every release it names,
/// sorted ascending by version.
///
/// # Errors
///
/// Returns [`ReleaseError::Network`] if the listing cannot be retrieved.
pub fn fetch_releases(fetcher: &dyn Fetcher, base_url: &str) -> Result<Vec<Release>> {
    let url = release::normalize_base_url(base_url);
    info!(url = %url, "fetching release listing");
    let html = fetcher
        .get_text(&url)
        .map_err(|e| ReleaseError::network(&url, e))?;
    let releases = release::parse_listing(&url, &html);
    debug!(count = releases.len(), "parsed release listing");
    Ok(releases)
}

/// Fetches the listing at `base_url` and returns the newest release.
///
/// # Errors
///
/// Returns [`ReleaseError::Network`] if the listing cannot be retrieved and
/// [`ReleaseError::NotFound`] if it names no release.
pub fn latest_release(fetcher: &dyn Fetcher, base_url: &str) -> Result<Release> {
    let releases = fetch_releases(fetcher, base_url)?;
    let latest = release::select_latest(&release::normalize_base_url(base_url), &releases)?;
    info!(version = %latest.version, url = %latest.url, "selected latest release");
    Ok(latest)
}

/// Looks up the archive size of each release with a HEAD request.
///
/// A failed lookup is logged and reported as `None`.
pub fn release_sizes(fetcher: &dyn Fetcher, releases: &[Release]) -> Vec<Option<u64>> {
    releases
        .iter()
        .map(|r| match fetcher.content_length(&r.url) {
            Ok(size) => size,
            Err(e) => {
                warn!(url = %r.url, error = %e, "could not determine archive size");
                None
            }
        })
        .collect()
}
