//! `mpinstall releases` -- list the releases at the listing URL.

use anyhow::{Context, Result};
use mpinstall_config::settings::Settings;
use mpinstall_core::error::ReleaseError;
use mpinstall_core::release::Release;
use mpinstall_net::discovery::{fetch_releases, release_sizes};
use mpinstall_net::http::HttpFetcher;
use serde::Serialize;

use crate::context::RuntimeContext;
use crate::output::{format_size, output_json, output_table};

#[derive(Debug, Serialize)]
struct ReleaseRow<'a> {
    #[serde(flatten)]
    release: &'a Release,
    size: Option<u64>,
    latest: bool,
}

/// Execute the `mpinstall releases` command.
pub fn run(ctx: &RuntimeContext, settings: &Settings) -> Result<()> {
    let fetcher = HttpFetcher::new(settings.http_timeout());
    let releases = fetch_releases(&fetcher, &settings.url)
        .with_context(|| format!("failed to list releases at {}", settings.url))?;
    if releases.is_empty() {
        return Err(ReleaseError::not_found(&settings.url).into());
    }

    let sizes = release_sizes(&fetcher, &releases);
    let rows = rows(&releases, &sizes);

    if ctx.json {
        output_json(&rows)?;
    } else {
        output_table(&["VERSION", "SIZE", "URL"], &table(&rows));
    }
    Ok(())
}

fn rows<'a>(releases: &'a [Release], sizes: &[Option<u64>]) -> Vec<ReleaseRow<'a>> {
    let last = releases.len().saturating_sub(1);
    releases
        .iter()
        .zip(sizes)
        .enumerate()
        .map(|(i, (release, size))| ReleaseRow {
            release,
            size: *size,
            latest: i == last,
        })
        .collect()
}

fn table(rows: &[ReleaseRow<'_>]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            let mut version = row.release.version.to_string();
            if row.latest {
                version.push_str(" (latest)");
            }
            vec![
                version,
                row.size.map(format_size).unwrap_or_else(|| "-".to_string()),
                row.release.url.clone(),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpinstall_core::release::ReleaseLayout;
    use pretty_assertions::assert_eq;

    const BASE: &str = "https://distfiles.macports.org/MacPorts/";

    #[test]
    fn marks_last_release_as_latest() {
        let releases = vec![
            Release::new(BASE, "2.9.3".parse().unwrap(), ReleaseLayout::Folder),
            Release::new(BASE, "2.10.0".parse().unwrap(), ReleaseLayout::Folder),
        ];
        let rows = rows(&releases, &[Some(2048), None]);
        assert_eq!(
            table(&rows),
            vec![
                vec![
                    "2.9.3".to_string(),
                    "2.0 KB".to_string(),
                    format!("{BASE}2.9.3/MacPorts-2.9.3.tar.bz2"),
                ],
                vec![
                    "2.10.0 (latest)".to_string(),
                    "-".to_string(),
                    format!("{BASE}2.10.0/MacPorts-2.10.0.tar.bz2"),
                ],
            ]
        );
    }
}
