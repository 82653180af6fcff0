//! Clap CLI definitions for the `mpinstall` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

const EXAMPLES: &str = "\
Examples:
  # Build and install under the current directory (./bld, ./rel)
  $ mpinstall

  # Build and install in specific directories
  $ mpinstall -b /tmp/macports -r /opt/macports

  # Same, capturing everything in mpinstall-<YYYYmmddHHMM>.log
  $ mpinstall --tee -b /tmp/macports -r /opt/macports --sudo

  # Show what is available
  $ mpinstall releases";

/// mpinstall -- build and install MacPorts from source.
///
/// Downloads the latest MacPorts release, builds it into a private prefix,
/// and configures it for rsync or, when port 873 is blocked, HTTP syncing.
#[derive(Parser, Debug)]
#[command(
    name = "mpinstall",
    about = "Build and install MacPorts from source",
    long_about = "Downloads the latest MacPorts release, builds it into a private prefix, \
                  and configures it for rsync or, when port 873 is blocked, HTTP syncing.",
    version,
    propagate_version = true,
    after_help = EXAMPLES
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Build directory (default: ./bld).
    #[arg(short = 'b', long, global = true, value_name = "DIR")]
    pub blddir: Option<PathBuf>,

    /// Release directory the installation goes into (default: ./rel).
    #[arg(short = 'r', long, global = true, value_name = "DIR")]
    pub reldir: Option<PathBuf>,

    /// Release listing URL.
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Also write log output to mpinstall-<YYYYmmddHHMM>.log.
    #[arg(short = 't', long, global = true)]
    pub tee: bool,

    /// Settings file (TOML or YAML; default: ./mpinstall.toml if present).
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output (warnings and errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download, build and install the latest release (default).
    Install(InstallArgs),

    /// List the releases available at the listing URL.
    Releases,

    /// Check whether the rsync port is reachable.
    Probe(ProbeArgs),

    /// Generate shell completions.
    Completion(CompletionArgs),

    /// Print version information.
    Version,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Install(InstallArgs::default())
    }
}

/// Arguments for `mpinstall install`.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Run `make install` and the sync through sudo.
    #[arg(long)]
    pub sudo: bool,

    /// Parallel make jobs.
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<u32>,

    /// Expected SHA-256 of the release archive.
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Do not verify the archive checksum.
    #[arg(long, conflicts_with = "sha256")]
    pub no_verify: bool,

    /// Skip the ports tree sync after installing.
    #[arg(long)]
    pub no_sync: bool,

    #[command(flatten)]
    pub probe: ProbeArgs,
}

/// Arguments shared by `install` and `probe`.
#[derive(Args, Debug, Clone, Default)]
pub struct ProbeArgs {
    /// Seconds to wait for the rsync port before falling back to HTTP.
    #[arg(long, value_name = "SECS")]
    pub probe_timeout: Option<u64>,
}

/// Arguments for `mpinstall completion`.
#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

/// Completion subcommands.
#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    /// Generate Bash completions.
    Bash,
    /// Generate Zsh completions.
    Zsh,
    /// Generate Fish completions.
    Fish,
    /// Generate PowerShell completions.
    Powershell,
}
