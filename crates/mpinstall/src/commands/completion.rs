//! `mpinstall completion` -- generate shell completions.

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use mpinstall_ui::terminal::is_tty;

use crate::cli::{Cli, CompletionArgs, CompletionCommands};
use crate::context::RuntimeContext;

fn shell(command: &CompletionCommands) -> Shell {
    match command {
        CompletionCommands::Bash => Shell::Bash,
        CompletionCommands::Zsh => Shell::Zsh,
        CompletionCommands::Fish => Shell::Fish,
        CompletionCommands::Powershell => Shell::PowerShell,
    }
}

/// Where the generated script is usually saved.
fn install_hint(shell: Shell) -> &'static str {
    match shell {
        Shell::Bash => {
            "mpinstall completion bash > ~/.local/share/bash-completion/completions/mpinstall"
        }
        Shell::Zsh => "mpinstall completion zsh > \"${fpath[1]}/_mpinstall\"",
        Shell::Fish => "mpinstall completion fish > ~/.config/fish/completions/mpinstall.fish",
        _ => "mpinstall completion powershell >> $PROFILE",
    }
}

/// Execute the `mpinstall completion` command.
///
/// When stdout is a terminal the script is being read rather than saved,
/// so a note on where to put it goes to stderr.
pub fn run(ctx: &RuntimeContext, args: &CompletionArgs) -> Result<()> {
    let shell = shell(&args.command);
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "mpinstall", &mut std::io::stdout());

    if is_tty() && !ctx.quiet {
        eprintln!("\n# To install: {}", install_hint(shell));
    }
    Ok(())
}
