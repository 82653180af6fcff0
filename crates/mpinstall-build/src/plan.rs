//! The install sequence.

use std::path::PathBuf;

use mpinstall_config::settings::Settings;
use mpinstall_core::release::Release;
use mpinstall_core::transport::TransportChoice;

use crate::command::CommandSpec;
use crate::pipeline::Pipeline;
use crate::step::{ChecksumPolicy, FetchArchive, RunCommand, SelectTransport};

/// Where the rewritten `sources.conf` waits before `sudo install` moves it.
const STAGED_SOURCES_CONF: &str = "sources.conf.new";

/// Paths derived from the settings and the chosen release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub archive: PathBuf,
    pub source_dir: PathBuf,
}

impl Layout {
    pub fn new(settings: &Settings, release: &Release) -> Self {
        Self {
            archive: settings.build_dir.join(&release.archive_name),
            source_dir: settings.build_dir.join(release.source_dir_name()),
        }
    }
}

fn checksum_policy(settings: &Settings, release: &Release) -> ChecksumPolicy {
    if !settings.verify_checksum {
        return ChecksumPolicy::Skip;
    }
    match &settings.sha256 {
        Some(digest) => ChecksumPolicy::Pinned(digest.clone()),
        None => ChecksumPolicy::Published {
            url: release.checksum_url(),
            file_name: release.archive_name.clone(),
        },
    }
}

/// The `configure` invocation for the release directory.
pub fn configure_command(settings: &Settings, layout: &Layout) -> CommandSpec {
    let prefix = settings.release_dir.display().to_string();
    CommandSpec::new(layout.source_dir.join("configure").display().to_string())
        .arg(format!("--prefix={prefix}"))
        .arg(format!("--with-applications-dir={prefix}/Applications"))
        .args(settings.configure_args.iter().cloned())
        .current_dir(&layout.source_dir)
}

/// The post-install sync for the chosen transport.
pub fn sync_command(settings: &Settings, choice: TransportChoice) -> CommandSpec {
    CommandSpec::new(settings.port_binary().display().to_string())
        .arg("-v")
        .arg(choice.transport.sync_subcommand())
        .with_sudo(settings.sudo)
}

/// Builds the ordered steps that install `release`.
///
/// The transport decision is made before the plan is built and only
/// affects the last two steps.
pub fn install_plan(
    settings: &Settings,
    release: &Release,
    choice: TransportChoice,
) -> Pipeline<'static> {
    let layout = Layout::new(settings, release);

    let mut make = CommandSpec::new("make").current_dir(&layout.source_dir);
    if let Some(jobs) = settings.jobs {
        make = make.arg(format!("-j{jobs}"));
    }

    let mut plan = Pipeline::new()
        .with(FetchArchive {
            url: release.url.clone(),
            dest: layout.archive.clone(),
            checksum: checksum_policy(settings, release),
        })
        .with(
            RunCommand::new(
                "extract",
                CommandSpec::new("tar")
                    .arg("-xjf")
                    .arg(layout.archive.display().to_string())
                    .arg("-C")
                    .arg(settings.build_dir.display().to_string()),
            )
            .unless_exists(&layout.source_dir),
        )
        .with(RunCommand::new("configure", configure_command(settings, &layout)))
        .with(RunCommand::new("build", make))
        .with(RunCommand::new(
            "install",
            CommandSpec::new("make")
                .arg("install")
                .current_dir(&layout.source_dir)
                .with_sudo(settings.sudo),
        ))
        .with(SelectTransport {
            conf: settings.sources_conf(),
            choice,
            urls: settings.source_urls(),
            sudo: settings.sudo,
            staging: settings.build_dir.join(STAGED_SOURCES_CONF),
        });

    if settings.sync {
        plan.push(RunCommand::new("sync", sync_command(settings, choice)));
    }
    plan
}
