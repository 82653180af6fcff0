//! `mpinstall` -- build and install MacPorts from source.
//!
//! Parses CLI arguments with clap, resolves settings and logging, and
//! dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod logging;
mod output;

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use mpinstall_config::settings::{Overrides, Settings};
use tracing::{info, warn};

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Exit status after Ctrl+C, as a shell reports SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

fn main() {
    // First Ctrl+C: report and exit. Second: exit without logging.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(EXIT_INTERRUPTED);
        }
        warn!("interrupted; the build directory may be partially populated");
        std::process::exit(EXIT_INTERRUPTED);
    });

    let cli = Cli::parse();
    let ctx = RuntimeContext::from_global_args(&cli.global);

    let result = match cli.command.unwrap_or_default() {
        Commands::Version => commands::version::run(&ctx),
        Commands::Completion(args) => commands::completion::run(&ctx, &args),
        Commands::Install(args) => prepare(&ctx, ctx.overrides(Some(&args), None))
            .and_then(|settings| commands::install::run(&ctx, &settings)),
        Commands::Releases => prepare(&ctx, ctx.overrides(None, None))
            .and_then(|settings| commands::releases::run(&ctx, &settings)),
        Commands::Probe(args) => prepare(&ctx, ctx.overrides(None, Some(&args)))
            .and_then(|settings| commands::probe::run(&ctx, &settings)),
    };

    // Handle errors: print message and exit with code 1
    if let Err(e) = result {
        if ctx.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

/// Loads settings and starts logging for commands that do real work.
fn prepare(ctx: &RuntimeContext, overrides: Overrides) -> Result<Settings> {
    let settings = ctx.load_settings(&overrides)?;
    let tee_dir = if settings.tee {
        Some(context::current_dir()?)
    } else {
        None
    };
    if let Some(path) = logging::init(ctx.verbose, ctx.quiet, tee_dir.as_deref())? {
        info!("logging to {}", path.display());
    }
    Ok(settings)
}
