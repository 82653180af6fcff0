//! Exclusive lock on the build directory.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::{BuildError, Result};

/// Name of the lock file created inside the build directory.
pub const LOCK_FILE_NAME: &str = ".mpinstall.lock";

/// Held for the duration of a run; released on drop.
#[derive(Debug)]
pub struct BuildLock {
    file: File,
    path: PathBuf,
}

impl BuildLock {
    /// Takes the lock on `build_dir` without waiting, creating the directory
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Locked`] if another process holds the lock.
    pub fn acquire(build_dir: &Path) -> Result<Self> {
        fs::create_dir_all(build_dir)
            .map_err(|e| BuildError::io(format!("creating {}", build_dir.display()), e))?;

        let path = build_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| BuildError::io(format!("opening {}", path.display()), e))?;

        if let Err(e) = FileExt::try_lock_exclusive(&file) {
            if e.kind() == fs2::lock_contended_error().kind() {
                return Err(BuildError::Locked(build_dir.to_path_buf()));
            }
            return Err(BuildError::io(format!("locking {}", path.display()), e));
        }

        debug!(path = %path.display(), "build directory locked");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
