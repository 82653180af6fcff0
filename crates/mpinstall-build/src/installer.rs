//! Top-level install sequence.

use mpinstall_config::settings::Settings;
use mpinstall_core::release::Release;
use mpinstall_core::transport::{Transport, TransportChoice};
use mpinstall_net::discovery;
use mpinstall_net::http::Fetcher;
use mpinstall_net::probe::PortProbe;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::command::CommandRunner;
use crate::error::Result;
use crate::lock::BuildLock;
use crate::pipeline::StepRecord;
use crate::plan;
use crate::preflight;
use crate::step::StepContext;

/// What a successful install did.
#[derive(Debug, Clone, Serialize)]
pub struct InstallSummary {
    pub release: Release,
    pub choice: TransportChoice,
    pub steps: Vec<StepRecord>,
    /// The command the operator runs to refresh the ports tree later.
    pub sync_command: String,
}

/// Probes the rsync port and decides the transport.
pub fn choose_transport(settings: &Settings, probe: &dyn PortProbe) -> TransportChoice {
    let outcome = probe.probe(&settings.probe_host, settings.probe_port, settings.probe_timeout());
    let choice = TransportChoice::from_outcome(outcome);
    match choice.transport {
        Transport::Rsync => info!(
            host = %settings.probe_host,
            port = settings.probe_port,
            "rsync port reachable; using rsync"
        ),
        Transport::Http => warn!(
            host = %settings.probe_host,
            port = settings.probe_port,
            %outcome,
            "rsync port not reachable; falling back to HTTP sync"
        ),
    }
    choice
}

/// Runs the whole install: lock, toolchain check, release lookup, probe,
/// then the build plan.
///
/// # Errors
///
/// Returns the first error encountered. Work already done (downloads,
/// extracted sources, installed files) is left in place.
pub fn install(
    settings: &Settings,
    fetcher: &dyn Fetcher,
    probe: &dyn PortProbe,
    runner: &dyn CommandRunner,
) -> Result<InstallSummary> {
    let _lock = BuildLock::acquire(&settings.build_dir)?;
    info!(
        build_dir = %settings.build_dir.display(),
        release_dir = %settings.release_dir.display(),
        "starting install"
    );

    preflight::check_toolchain(runner)?;

    let release = discovery::latest_release(fetcher, &settings.url)?;
    info!(version = %release.version, url = %release.url, "selected release");

    let choice = choose_transport(settings, probe);

    let report =
        plan::install_plan(settings, &release, choice).run(&StepContext { fetcher, runner });
    if let Some(err) = report.error {
        if !report.not_run.is_empty() {
            error!(steps = ?report.not_run, "remaining steps not run");
        }
        return Err(err);
    }

    let sync_command = plan::sync_command(settings, choice).to_string();
    info!(version = %release.version, "install complete");
    Ok(InstallSummary {
        release,
        choice,
        steps: report.records,
        sync_command,
    })
}
