//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds the global flags every handler needs and
//! knows how to turn them, plus any per-command flags, into resolved
//! [`Settings`].

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use mpinstall_config::settings::{Overrides, Settings, load_settings};

use crate::cli::{GlobalArgs, InstallArgs, ProbeArgs};

/// Runtime context passed to every command handler.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Global flags as parsed.
    pub global: GlobalArgs,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,
}

impl RuntimeContext {
    pub fn from_global_args(global: &GlobalArgs) -> Self {
        Self {
            global: global.clone(),
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
        }
    }

    /// Command-line values that override the settings file and environment.
    pub fn overrides(&self, install: Option<&InstallArgs>, probe: Option<&ProbeArgs>) -> Overrides {
        let mut overrides = Overrides {
            build_dir: self.global.blddir.clone(),
            release_dir: self.global.reldir.clone(),
            url: self.global.url.clone(),
            tee: self.global.tee.then_some(true),
            ..Overrides::default()
        };

        if let Some(args) = install {
            overrides.sudo = args.sudo.then_some(true);
            overrides.jobs = args.jobs;
            overrides.sha256 = args.sha256.clone();
            overrides.verify_checksum = args.no_verify.then_some(false);
            overrides.sync = args.no_sync.then_some(false);
        }

        let probe = probe.or(install.map(|a| &a.probe));
        if let Some(args) = probe {
            overrides.probe_timeout_secs = args.probe_timeout;
        }
        overrides
    }

    /// Loads settings relative to the current directory.
    pub fn load_settings(&self, overrides: &Overrides) -> Result<Settings> {
        let cwd = current_dir()?;
        load_settings(self.global.config.as_deref(), overrides, &cwd)
            .context("failed to load settings")
    }
}

pub fn current_dir() -> Result<PathBuf> {
    env::current_dir().context("cannot determine the working directory")
}
