//! External command execution.
//!
//! Provides a thin wrapper around `std::process::Command` so that the rest
//! of the build code deals only in [`CommandSpec`] values. The child's
//! stdout and stderr share one pipe, so output arrives interleaved exactly
//! as the program wrote it, and each line is handed to the caller as it is
//! produced (long `make` runs stay visible).

use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{error, info};

use crate::error::{BuildError, Result};

// ---------------------------------------------------------------------------
// Command description
// ---------------------------------------------------------------------------

/// A program invocation: program, arguments, working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Runs the command through `sudo` when `enabled` is set.
    pub fn with_sudo(self, enabled: bool) -> Self {
        if !enabled {
            return self;
        }
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            cwd: self.cwd,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// Single-quotes `s` for display when it contains shell-special characters.
fn quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Captured, merged stdout/stderr of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: String,
}

/// Starts external programs on behalf of the build steps.
pub trait CommandRunner {
    /// Runs `spec` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Spawn`] if the program cannot be started and
    /// [`BuildError::ProcessFailure`] if it exits unsuccessfully.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs real processes and forwards their output to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        run_command(spec, &mut |line| info!(target: "mpinstall::output", "{line}"))
    }
}

/// Runs `spec`, calling `on_line` for every line of merged output.
pub fn run_command(spec: &CommandSpec, on_line: &mut dyn FnMut(&str)) -> Result<CommandOutput> {
    info!(command = %spec, "running command");

    let (reader, writer) = io::pipe().map_err(|e| BuildError::io("creating output pipe", e))?;
    let stderr_writer = writer
        .try_clone()
        .map_err(|e| BuildError::io("creating output pipe", e))?;

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(stderr_writer);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }

    let mut child = command.spawn().map_err(|source| BuildError::Spawn {
        command: spec.to_string(),
        source,
    })?;
    // The parent's copies of the write ends live in `command`; they must be
    // closed or the reader never sees EOF.
    drop(command);

    let mut output = String::new();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| BuildError::io(format!("reading output of '{spec}'"), e))?;
        if n == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(&['\n', '\r'][..]);
        on_line(line);
        output.push_str(line);
        output.push('\n');
    }

    let status = child
        .wait()
        .map_err(|e| BuildError::io(format!("waiting for '{spec}'"), e))?;
    if !status.success() {
        error!(command = %spec, code = ?status.code(), "command failed");
        return Err(BuildError::ProcessFailure {
            command: spec.to_string(),
            code: status.code(),
        });
    }

    Ok(CommandOutput { output })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
