//! `mpinstall probe` -- report rsync reachability and the transport it implies.

use anyhow::Result;
use mpinstall_build::installer::choose_transport;
use mpinstall_config::settings::Settings;
use mpinstall_core::transport::{Transport, TransportChoice};
use mpinstall_net::probe::TcpProbe;
use mpinstall_ui::styles::{Mark, render_marked};
use serde::Serialize;

use crate::context::RuntimeContext;
use crate::output::output_json;

#[derive(Serialize)]
struct ProbeReport<'a> {
    host: &'a str,
    port: u16,
    timeout_secs: u64,
    #[serde(flatten)]
    choice: TransportChoice,
    sync_subcommand: &'static str,
}

/// Execute the `mpinstall probe` command.
///
/// An unreachable port is a result, not an error, so this always succeeds.
pub fn run(ctx: &RuntimeContext, settings: &Settings) -> Result<()> {
    let choice = choose_transport(settings, &TcpProbe);

    if ctx.json {
        output_json(&ProbeReport {
            host: &settings.probe_host,
            port: settings.probe_port,
            timeout_secs: settings.probe_timeout_secs,
            choice,
            sync_subcommand: choice.transport.sync_subcommand(),
        })?;
    } else {
        println!("{}", describe(settings, choice));
    }
    Ok(())
}

fn describe(settings: &Settings, choice: TransportChoice) -> String {
    let target = format!("{}:{}", settings.probe_host, settings.probe_port);
    match choice.transport {
        Transport::Rsync => render_marked(
            Mark::Pass,
            &format!("{target} {}", choice.outcome),
            Some("rsync sync (port selfupdate)"),
        ),
        Transport::Http => render_marked(
            Mark::Warn,
            &format!("{target} {}", choice.outcome),
            Some("HTTP fallback (port sync)"),
        ),
    }
}
