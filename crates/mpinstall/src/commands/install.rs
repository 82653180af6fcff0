//! `mpinstall install` -- the full download, build and install sequence.

use anyhow::{Context, Result};
use mpinstall_build::command::SystemRunner;
use mpinstall_build::installer::{self, InstallSummary};
use mpinstall_build::pipeline::StepState;
use mpinstall_config::settings::Settings;
use mpinstall_core::transport::Transport;
use mpinstall_net::http::HttpFetcher;
use mpinstall_net::probe::TcpProbe;
use mpinstall_ui::styles::{Mark, render_bold, render_marked};

use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `mpinstall install` command.
pub fn run(ctx: &RuntimeContext, settings: &Settings) -> Result<()> {
    let fetcher = HttpFetcher::new(settings.http_timeout());
    let summary = installer::install(settings, &fetcher, &TcpProbe, &SystemRunner)
        .with_context(|| format!("install into {} failed", settings.release_dir.display()))?;

    if ctx.json {
        return output_json(&summary);
    }

    if !ctx.quiet {
        let release = format!("MacPorts {}", summary.release.version);
        println!("{}", render_marked(Mark::Info, &release, Some(&summary.release.url)));
        for record in &summary.steps {
            let line = match &record.state {
                StepState::Done => render_marked(Mark::Pass, &record.name, None),
                StepState::Skipped(reason) => render_marked(Mark::Skip, &record.name, Some(reason)),
                StepState::Failed(reason) => render_marked(Mark::Fail, &record.name, Some(reason)),
            };
            println!("{line}");
        }
    }
    print!("{}", done_message(settings, &summary));
    Ok(())
}

/// Instructions printed after a successful install.
fn done_message(settings: &Settings, summary: &InstallSummary) -> String {
    let rel = settings.release_dir.display();
    let bld = settings.build_dir.display();
    let mut msg = format!(
        "
{} has been installed in
{rel}.

To use it, add these lines to your ~/.bashrc (or equivalent):

   export MP_PATH=\"{rel}\"
   export PATH=\"${{MP_PATH}}/bin:${{PATH}}\"
   export MANPATH=\"${{MP_PATH}}/share/man:${{MANPATH}}\"

Then open a new shell and check that the port command works:

   $ port list

Update the ports tree with:

   $ {sync}
",
        render_bold(&format!("MacPorts {}", summary.release.version)),
        sync = summary.sync_command,
    );

    if summary.choice.transport == Transport::Http {
        msg.push_str(&format!(
            "
The rsync check of {}:{} returned \"{}\", so the installation syncs over HTTP.
Use \"sync\" instead of \"selfupdate\"; to allow \"selfupdate\", open
port 873 for rsync on your firewall.
",
            settings.probe_host, settings.probe_port, summary.choice.outcome
        ));
    }

    msg.push_str(&format!(
        "
To remove the build data now that it is no longer needed:

   $ rm -rf {bld}

To delete the installation, remove the build and release areas and the
MP_PATH lines from ~/.bashrc:

   $ rm -rf {rel} {bld}

"
    ));
    msg
}
