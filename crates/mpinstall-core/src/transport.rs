//! Ports-tree synchronization transport.
//!
//! The installed package manager syncs its ports tree over rsync (port 873)
//! by default. When a probe shows that port is unreachable, the
//! `sources.conf` file is rewritten to fetch the tree over HTTP instead.
//!
//! [`render_sources_conf`] is a pure function of the file content and the
//! [`TransportChoice`]: it first undoes any earlier rewrite and then applies
//! the requested one, so rendering is idempotent and the two transports are
//! never active at the same time.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default rsync source line target.
pub const DEFAULT_RSYNC_SOURCE: &str = "rsync://rsync.macports.org/macports/release/tarballs/ports.tar";

/// Default HTTP source line target.
pub const DEFAULT_HTTP_SOURCE: &str = "http://distfiles.macports.org/ports.tar.gz";

/// Host probed to decide whether rsync is usable.
pub const DEFAULT_PROBE_HOST: &str = "rsync.macports.org";

/// The rsync port.
pub const RSYNC_PORT: u16 = 873;

/// Marker prepended to rsync lines disabled by the HTTP rewrite.
const DISABLED_PREFIX: &str = "##";

/// Suffix marking the default source in `sources.conf`.
const DEFAULT_TAG: &str = "[default]";

/// Result of a single port probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// A TCP connection was established.
    Reachable,
    /// The connection was actively refused or failed.
    Refused,
    /// The connection attempt did not complete within the timeout.
    TimedOut,
    /// The host name could not be resolved.
    Unresolved,
}

impl ProbeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reachable => "reachable",
            Self::Refused => "refused",
            Self::TimedOut => "timed out",
            Self::Unresolved => "unresolved",
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synchronization transport written into `sources.conf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// rsync over port 873.
    Rsync,
    /// HTTP over port 80.
    Http,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsync => "rsync",
            Self::Http => "http",
        }
    }

    /// The port the transport uses.
    pub fn port(&self) -> u16 {
        match self {
            Self::Rsync => RSYNC_PORT,
            Self::Http => 80,
        }
    }

    /// The `port` subcommand that refreshes the ports tree over this transport.
    ///
    /// `selfupdate` requires rsync; `sync` honors `sources.conf`.
    pub fn sync_subcommand(&self) -> &'static str {
        match self {
            Self::Rsync => "selfupdate",
            Self::Http => "sync",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transport decision for one run, together with the probe result that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransportChoice {
    pub transport: Transport,
    pub outcome: ProbeOutcome,
}

impl TransportChoice {
    /// Rsync when the probe reached the port, HTTP for every other outcome.
    pub fn from_outcome(outcome: ProbeOutcome) -> Self {
        let transport = if outcome.is_reachable() {
            Transport::Rsync
        } else {
            Transport::Http
        };
        Self { transport, outcome }
    }
}

/// Source URLs used when rendering `sources.conf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrls {
    pub rsync: String,
    pub http: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            rsync: DEFAULT_RSYNC_SOURCE.to_string(),
            http: DEFAULT_HTTP_SOURCE.to_string(),
        }
    }
}

impl SourceUrls {
    fn http_line(&self) -> String {
        format!("{} {DEFAULT_TAG}", self.http)
    }

    fn rsync_line(&self) -> String {
        format!("{} {DEFAULT_TAG}", self.rsync)
    }
}

fn is_rsync_line(line: &str) -> bool {
    line.starts_with("rsync:")
}

/// Rewrites `sources.conf` content for the chosen transport.
pub fn render_sources_conf(content: &str, transport: Transport, urls: &SourceUrls) -> String {
    let http_line = urls.http_line();

    // Undo any earlier rewrite.
    let baseline: Vec<String> = content
        .lines()
        .filter(|line| line.trim_end() != http_line)
        .map(|line| match line.strip_prefix(DISABLED_PREFIX) {
            Some(rest) if is_rsync_line(rest) => rest.to_string(),
            _ => line.to_string(),
        })
        .collect();

    let mut out: Vec<String> = Vec::with_capacity(baseline.len() + 1);
    match transport {
        Transport::Rsync => {
            out.extend(baseline.iter().cloned());
            if !baseline.iter().any(|l| is_rsync_line(l)) {
                out.push(urls.rsync_line());
            }
        }
        Transport::Http => {
            let mut inserted = false;
            for line in &baseline {
                if is_rsync_line(line) {
                    if !inserted {
                        out.push(http_line.clone());
                        inserted = true;
                    }
                    out.push(format!("{DISABLED_PREFIX}{line}"));
                } else {
                    out.push(line.clone());
                }
            }
            if !inserted {
                out.push(http_line);
            }
        }
    }

    let mut rendered = out.join("\n");
    rendered.push('\n');
    rendered
}

/// Returns the transport currently active in `sources.conf` content.
///
/// `None` means neither (or both) kinds of source line are active.
pub fn active_transport(content: &str, urls: &SourceUrls) -> Option<Transport> {
    let http_line = urls.http_line();
    let has_http = content.lines().any(|l| l.trim_end() == http_line);
    let has_rsync = content.lines().any(is_rsync_line);
    match (has_rsync, has_http) {
        (true, false) => Some(Transport::Rsync),
        (false, true) => Some(Transport::Http),
        _ => None,
    }
}

/// Path of the backup kept next to `sources.conf`.
pub fn backup_path(conf: &Path) -> PathBuf {
    let mut name = conf.as_os_str().to_os_string();
    name.push(".orig");
    PathBuf::from(name)
}

/// Outcome of [`apply_transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The file already selected the transport.
    Unchanged,
    /// The file was rewritten.
    Rewritten,
}

/// Reads `conf` and returns the content it needs for `transport`, or
/// `None` when the file already selects it.
pub fn pending_update(
    conf: &Path,
    transport: Transport,
    urls: &SourceUrls,
) -> io::Result<Option<String>> {
    let content = fs::read_to_string(conf)?;
    let rendered = render_sources_conf(&content, transport, urls);
    Ok((rendered != content).then_some(rendered))
}

/// Rewrites the `sources.conf` file at `conf` for `transport`.
///
/// A `.orig` backup is written before the first modification and never
/// overwritten afterwards.
pub fn apply_transport(
    conf: &Path,
    transport: Transport,
    urls: &SourceUrls,
) -> io::Result<ApplyOutcome> {
    let Some(rendered) = pending_update(conf, transport, urls)? else {
        return Ok(ApplyOutcome::Unchanged);
    };

    let backup = backup_path(conf);
    if !backup.exists() {
        fs::copy(conf, &backup)?;
    }
    fs::write(conf, rendered)?;
    Ok(ApplyOutcome::Rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STOCK: &str = "\
# MacPorts system-wide configuration file for ports tree sources.
#
rsync://rsync.macports.org/macports/release/tarballs/ports.tar [default]
file:///Users/me/ports
";

    fn urls() -> SourceUrls {
        SourceUrls::default()
    }

    #[test]
    fn every_outcome_selects_exactly_one_transport() {
        let cases = [
            (ProbeOutcome::Reachable, Transport::Rsync),
            (ProbeOutcome::Refused, Transport::Http),
            (ProbeOutcome::TimedOut, Transport::Http),
            (ProbeOutcome::Unresolved, Transport::Http),
        ];
        for (outcome, expected) in cases {
            let choice = TransportChoice::from_outcome(outcome);
            assert_eq!(choice.transport, expected);
            let rendered = render_sources_conf(STOCK, choice.transport, &urls());
            assert_eq!(
                active_transport(&rendered, &urls()),
                Some(expected),
                "outcome {outcome}"
            );
        }
    }

    #[test]
    fn http_rewrite() {
        let rendered = render_sources_conf(STOCK, Transport::Http, &urls());
        assert_eq!(
            rendered,
            "\
# MacPorts system-wide configuration file for ports tree sources.
#
http://distfiles.macports.org/ports.tar.gz [default]
##rsync://rsync.macports.org/macports/release/tarballs/ports.tar [default]
file:///Users/me/ports
"
        );
    }

    #[test]
    fn rsync_render_of_stock_file_is_noop() {
        assert_eq!(render_sources_conf(STOCK, Transport::Rsync, &urls()), STOCK);
    }

    #[test]
    fn http_render_is_idempotent() {
        let once = render_sources_conf(STOCK, Transport::Http, &urls());
        let twice = render_sources_conf(&once, Transport::Http, &urls());
        assert_eq!(once, twice);
    }

    #[test]
    fn rsync_render_restores_http_rewrite() {
        let http = render_sources_conf(STOCK, Transport::Http, &urls());
        assert_eq!(render_sources_conf(&http, Transport::Rsync, &urls()), STOCK);
    }

    #[test]
    fn multiple_rsync_lines_get_one_http_line() {
        let conf = "rsync://a/ports.tar [default]\nrsync://b/ports.tar\n";
        let rendered = render_sources_conf(conf, Transport::Http, &urls());
        assert_eq!(
            rendered,
            "http://distfiles.macports.org/ports.tar.gz [default]\n##rsync://a/ports.tar [default]\n##rsync://b/ports.tar\n"
        );
    }

    #[test]
    fn missing_source_lines_are_appended() {
        let conf = "# empty\n";
        assert_eq!(
            render_sources_conf(conf, Transport::Http, &urls()),
            "# empty\nhttp://distfiles.macports.org/ports.tar.gz [default]\n"
        );
        assert_eq!(
            render_sources_conf(conf, Transport::Rsync, &urls()),
            "# empty\nrsync://rsync.macports.org/macports/release/tarballs/ports.tar [default]\n"
        );
    }

    #[test]
    fn apply_keeps_first_backup() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("sources.conf");
        fs::write(&conf, STOCK).unwrap();

        let outcome = apply_transport(&conf, Transport::Http, &urls()).unwrap();
        assert_eq!(outcome, ApplyOutcome::Rewritten);
        assert_eq!(fs::read_to_string(backup_path(&conf)).unwrap(), STOCK);
        let first = fs::read_to_string(&conf).unwrap();

        // Second run with the same probe outcome: same file, no rewrite.
        let outcome = apply_transport(&conf, Transport::Http, &urls()).unwrap();
        assert_eq!(outcome, ApplyOutcome::Unchanged);
        assert_eq!(fs::read_to_string(&conf).unwrap(), first);

        // Switching back leaves the original backup untouched.
        apply_transport(&conf, Transport::Rsync, &urls()).unwrap();
        assert_eq!(fs::read_to_string(&conf).unwrap(), STOCK);
        assert_eq!(fs::read_to_string(backup_path(&conf)).unwrap(), STOCK);
    }

    #[test]
    fn pending_update_only_when_content_changes() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("sources.conf");
        fs::write(&conf, STOCK).unwrap();

        assert_eq!(pending_update(&conf, Transport::Rsync, &urls()).unwrap(), None);
        let update = pending_update(&conf, Transport::Http, &urls()).unwrap().unwrap();
        assert_eq!(update, render_sources_conf(STOCK, Transport::Http, &urls()));
        // Nothing is written.
        assert_eq!(fs::read_to_string(&conf).unwrap(), STOCK);
        assert!(!backup_path(&conf).exists());
    }

    #[test]
    fn sync_subcommands() {
        assert_eq!(Transport::Rsync.sync_subcommand(), "selfupdate");
        assert_eq!(Transport::Http.sync_subcommand(), "sync");
        assert_eq!(Transport::Rsync.port(), 873);
        assert_eq!(Transport::Http.port(), 80);
    }
}
