//! Build error types.

use std::path::PathBuf;

use mpinstall_core::error::ReleaseError;
use mpinstall_net::error::NetError;

/// Errors that abort the install sequence.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// An external program could not be started.
    #[error("failed to start '{command}': {source}")]
    Spawn {
        /// The command line that was attempted.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An external program exited unsuccessfully.
    #[error("'{command}' failed with {}", exit_description(.code))]
    ProcessFailure {
        /// The command line that failed.
        command: String,
        /// The exit code, or `None` if the process was killed by a signal.
        code: Option<i32>,
    },

    /// A local filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The archive download failed.
    #[error(transparent)]
    Network(#[from] NetError),

    /// Locating the release failed.
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// The downloaded archive does not match the expected digest.
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .file.display())]
    ChecksumMismatch {
        /// The archive that failed; it is deleted so a re-run downloads it again.
        file: PathBuf,
        /// The expected SHA-256.
        expected: String,
        /// The SHA-256 of the file on disk.
        actual: String,
    },

    /// Another run holds the build directory lock.
    #[error("build directory {} is in use by another mpinstall run", .0.display())]
    Locked(PathBuf),

    /// A required build tool is missing.
    #[error("toolchain check failed: {0}")]
    Toolchain(String),
}

fn exit_description(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exit status {code}"),
        None => "a signal".to_string(),
    }
}

/// Convenience alias used throughout the build crate.
pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// Creates a [`BuildError::Io`] with the given context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns `true` if this is a [`BuildError::ProcessFailure`].
    pub fn is_process_failure(&self) -> bool {
        matches!(self, Self::ProcessFailure { .. })
    }
}
