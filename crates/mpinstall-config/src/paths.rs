//! Path helpers for settings discovery and resolution.

use std::path::{Component, Path, PathBuf};

/// Settings file names looked up in the working directory, in order.
pub const SETTINGS_FILE_NAMES: &[&str] = &["mpinstall.toml", "mpinstall.yaml", "mpinstall.yml"];

/// Returns the first settings file present in `dir`, if any.
pub fn find_settings_file(dir: &Path) -> Option<PathBuf> {
    SETTINGS_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Returns `true` if `path` should be read with the YAML provider.
pub fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

/// Makes `path` absolute against `base` and removes `.` and `..`
/// components lexically. The filesystem is not consulted, so the path need
/// not exist yet.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
