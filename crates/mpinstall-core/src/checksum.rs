//! SHA-256 helpers for downloaded archives.
//!
//! Upstream publishes a `.chk.txt` file next to each archive. Both the BSD
//! (`SHA256 (file) = hex`) and GNU (`hex  file`) line formats are accepted.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Incremental SHA-256 over a byte stream, rendered as lowercase hex.
#[derive(Default)]
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn finish(self) -> String {
        format!("{:x}", self.inner.finalize())
    }
}

/// Hashes the file at `path`.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finish())
}

/// Returns `true` if `s` looks like a SHA-256 hex digest.
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Finds the SHA-256 digest recorded for `file_name` in a checksum file.
///
/// The digest is returned lowercased.
pub fn find_sha256(checksums: &str, file_name: &str) -> Option<String> {
    checksums.lines().find_map(|line| {
        let line = line.trim();

        // BSD: SHA256 (MacPorts-2.9.3.tar.bz2) = <hex>
        if let Some(rest) = line.strip_prefix("SHA256 (") {
            let (name, digest) = rest.split_once(") = ")?;
            let digest = digest.trim();
            return (name == file_name && is_sha256_hex(digest)).then(|| digest.to_lowercase());
        }

        // GNU: <hex>  MacPorts-2.9.3.tar.bz2 (binary mode marks the name with '*')
        let (digest, name) = line.split_once(char::is_whitespace)?;
        let name = name.trim_start().trim_start_matches('*');
        (name == file_name && is_sha256_hex(digest)).then(|| digest.to_lowercase())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hashes_empty_input() {
        assert_eq!(Sha256Hasher::new().finish(), EMPTY_SHA256);
    }

    #[test]
    fn hashes_file_in_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn bsd_format() {
        let text = format!(
            "RMD160 (MacPorts-2.9.3.tar.bz2) = 0123\nSHA256 (MacPorts-2.9.3.tar.bz2) = {}\n",
            EMPTY_SHA256.to_uppercase()
        );
        assert_eq!(
            find_sha256(&text, "MacPorts-2.9.3.tar.bz2").as_deref(),
            Some(EMPTY_SHA256)
        );
        assert_eq!(find_sha256(&text, "MacPorts-2.9.3.tar.gz"), None);
    }

    #[test]
    fn gnu_format() {
        let text = format!("{EMPTY_SHA256}  MacPorts-2.9.3.tar.bz2\n{EMPTY_SHA256} *other.pkg\n");
        assert_eq!(
            find_sha256(&text, "MacPorts-2.9.3.tar.bz2").as_deref(),
            Some(EMPTY_SHA256)
        );
        assert_eq!(find_sha256(&text, "other.pkg").as_deref(), Some(EMPTY_SHA256));
    }

    #[test]
    fn rejects_short_digests() {
        assert_eq!(find_sha256("abcd  MacPorts-2.9.3.tar.bz2", "MacPorts-2.9.3.tar.bz2"), None);
        assert!(!is_sha256_hex("xyz"));
        assert!(is_sha256_hex(EMPTY_SHA256));
    }
}
