//! `mpinstall version` -- version, platform and the built-in defaults.

use anyhow::Result;
use mpinstall_config::settings::Settings;
use serde::Serialize;

use crate::context::RuntimeContext;
use crate::output::output_json;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build identifier. Can be overridden via environment variable at build time.
const BUILD: &str = {
    match option_env!("MPINSTALL_BUILD") {
        Some(b) => b,
        None => "dev",
    }
};

/// What `mpinstall version` reports.
#[derive(Debug, Serialize)]
struct VersionInfo {
    version: &'static str,
    build: &'static str,
    os: &'static str,
    arch: &'static str,
    /// Release listing used when no `--url` or settings file says otherwise.
    default_url: String,
    /// `host:port` checked to decide between rsync and HTTP.
    probe_target: String,
    rsync_source: String,
    http_source: String,
}

impl VersionInfo {
    fn current() -> Self {
        let defaults = Settings::default();
        Self {
            version: VERSION,
            build: BUILD,
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            default_url: defaults.url,
            probe_target: format!("{}:{}", defaults.probe_host, defaults.probe_port),
            rsync_source: defaults.rsync_source,
            http_source: defaults.http_source,
        }
    }

    fn text(&self) -> String {
        format!(
            "mpinstall version {} ({}) {}/{}\n\
             listing:  {}\n\
             probe:    {}\n\
             sources:  {} | {}",
            self.version,
            self.build,
            self.os,
            self.arch,
            self.default_url,
            self.probe_target,
            self.rsync_source,
            self.http_source,
        )
    }
}

/// Execute the `mpinstall version` command.
pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let info = VersionInfo::current();
    if ctx.json {
        output_json(&info)?;
    } else {
        println!("{}", info.text());
    }
    Ok(())
}
