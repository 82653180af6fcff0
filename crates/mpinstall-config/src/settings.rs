//! Settings types and layered loading.
//!
//! The main entry point is [`load_settings`], which merges every source
//! into one immutable [`Settings`] value for the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use mpinstall_core::checksum::is_sha256_hex;
use mpinstall_core::transport::{
    DEFAULT_HTTP_SOURCE, DEFAULT_PROBE_HOST, DEFAULT_RSYNC_SOURCE, RSYNC_PORT, SourceUrls,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::{absolutize, find_settings_file, is_yaml};

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "MPINSTALL_";

/// Default release listing.
pub const DEFAULT_URL: &str = "https://distfiles.macports.org/MacPorts/";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A settings source could not be read or did not match the schema.
    #[error("failed to load settings: {0}")]
    Extract(#[from] figment::Error),

    /// An explicitly requested settings file does not exist.
    #[error("settings file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A setting had an invalid value.
    #[error("invalid value for setting '{key}': {reason}")]
    InvalidValue {
        /// The offending setting.
        key: String,
        /// Why the value is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for settings operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything one run needs to know. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where archives are downloaded and sources built.
    pub build_dir: PathBuf,

    /// Installation prefix.
    pub release_dir: PathBuf,

    /// Release listing base URL.
    pub url: String,

    /// Copy log output into a timestamped log file.
    pub tee: bool,

    /// Host probed for rsync reachability.
    pub probe_host: String,

    /// Port probed for rsync reachability.
    pub probe_port: u16,

    /// Probe connect timeout in seconds.
    pub probe_timeout_secs: u64,

    /// rsync source written into `sources.conf` when none is present.
    pub rsync_source: String,

    /// HTTP source written into `sources.conf` when rsync is blocked.
    pub http_source: String,

    /// HTTP request timeout in seconds.
    pub http_timeout_secs: u64,

    /// Run `make install` and the ports sync through `sudo`.
    pub sudo: bool,

    /// Parallel jobs passed to `make -j`.
    pub jobs: Option<u32>,

    /// Verify the archive's SHA-256 before extracting it.
    pub verify_checksum: bool,

    /// Expected archive SHA-256; overrides the published checksum.
    pub sha256: Option<String>,

    /// Refresh the ports tree once installation finishes.
    pub sync: bool,

    /// Extra arguments appended to `./configure`.
    pub configure_args: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from("bld"),
            release_dir: PathBuf::from("rel"),
            url: DEFAULT_URL.to_string(),
            tee: false,
            probe_host: DEFAULT_PROBE_HOST.to_string(),
            probe_port: RSYNC_PORT,
            probe_timeout_secs: 5,
            rsync_source: DEFAULT_RSYNC_SOURCE.to_string(),
            http_source: DEFAULT_HTTP_SOURCE.to_string(),
            http_timeout_secs: 300,
            sudo: false,
            jobs: None,
            verify_checksum: true,
            sha256: None,
            sync: true,
            configure_args: Vec::new(),
        }
    }
}

impl Settings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn source_urls(&self) -> SourceUrls {
        SourceUrls {
            rsync: self.rsync_source.clone(),
            http: self.http_source.clone(),
        }
    }

    /// Path of the installed package manager's `sources.conf`.
    pub fn sources_conf(&self) -> PathBuf {
        self.release_dir.join("etc").join("macports").join("sources.conf")
    }

    /// Path of the installed `port` binary.
    pub fn port_binary(&self) -> PathBuf {
        self.release_dir.join("bin").join("port")
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(invalid("url", "must not be empty"));
        }
        if self.probe_host.trim().is_empty() {
            return Err(invalid("probe_host", "must not be empty"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(invalid("probe_timeout_secs", "must be at least 1"));
        }
        if self.http_timeout_secs == 0 {
            return Err(invalid("http_timeout_secs", "must be at least 1"));
        }
        if self.jobs == Some(0) {
            return Err(invalid("jobs", "must be at least 1"));
        }
        if let Some(digest) = &self.sha256 {
            if !is_sha256_hex(digest) {
                return Err(invalid("sha256", "expected 64 hexadecimal characters"));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Command-line overrides
// ---------------------------------------------------------------------------

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sudo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_checksum: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_timeout_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Builds the figment for the given sources without extracting it.
///
/// `settings_file` is used as-is; pass `None` to skip the file layer.
pub fn figment(settings_file: Option<&Path>, overrides: &Overrides) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Settings::default()));

    if let Some(path) = settings_file {
        figment = if is_yaml(path) {
            figment.merge(Yaml::file(path))
        } else {
            figment.merge(Toml::file(path))
        };
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::defaults(overrides))
}

/// Loads settings for a run started in `cwd`.
///
/// When `settings_file` is `None`, `mpinstall.toml` / `mpinstall.yaml` in
/// `cwd` is used if present. Directories are returned absolute.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if an explicit settings file is
/// missing, [`ConfigError::Extract`] if a source is malformed, and
/// [`ConfigError::InvalidValue`] if a value fails validation.
pub fn load_settings(
    settings_file: Option<&Path>,
    overrides: &Overrides,
    cwd: &Path,
) -> Result<Settings> {
    let file = match settings_file {
        Some(path) => {
            let path = absolutize(path, cwd);
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path));
            }
            Some(path)
        }
        None => find_settings_file(cwd),
    };

    let mut settings: Settings = figment(file.as_deref(), overrides).extract()?;
    settings.validate()?;
    settings.build_dir = absolutize(&settings.build_dir, cwd);
    settings.release_dir = absolutize(&settings.release_dir, cwd);
    Ok(settings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
