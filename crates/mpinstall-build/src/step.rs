//! Build steps.
//!
//! Each step does one thing (one download, one external command, one file
//! rewrite) and reports whether it ran or had nothing to do.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use mpinstall_core::checksum::{find_sha256, sha256_file};
use mpinstall_core::transport::{self, ApplyOutcome, SourceUrls, TransportChoice};
use mpinstall_net::http::Fetcher;
use tracing::{debug, info, warn};

use crate::command::{CommandRunner, CommandSpec};
use crate::error::{BuildError, Result};

/// Everything a step may use while running.
pub struct StepContext<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub runner: &'a dyn CommandRunner,
}

/// What a successful step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The step performed its work.
    Done,
    /// The step had nothing to do; the reason is reported to the operator.
    Skipped(String),
}

/// One named unit of the install sequence.
pub trait Step {
    fn name(&self) -> &str;

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepStatus>;
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// How the downloaded archive is verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumPolicy {
    /// No verification.
    Skip,
    /// Compare against a digest given by the operator.
    Pinned(String),
    /// Look the digest up in the checksum file published next to the archive.
    Published { url: String, file_name: String },
}

/// Downloads the release archive into the build directory.
pub struct FetchArchive {
    pub url: String,
    pub dest: PathBuf,
    pub checksum: ChecksumPolicy,
}

impl FetchArchive {
    fn partial_path(&self) -> PathBuf {
        let mut name = self.dest.as_os_str().to_os_string();
        name.push(".part");
        PathBuf::from(name)
    }

    /// Streams the archive into the `.part` file and returns its path.
    fn download(&self, fetcher: &dyn Fetcher) -> Result<PathBuf> {
        let total = match fetcher.content_length(&self.url) {
            Ok(total) => total,
            Err(e) => {
                warn!(url = %self.url, error = %e, "could not determine archive size");
                None
            }
        };
        info!(url = %self.url, bytes = ?total, "downloading archive");

        let partial = self.partial_path();
        let file = File::create(&partial)
            .map_err(|e| BuildError::io(format!("creating {}", partial.display()), e))?;
        let mut writer = ProgressWriter::new(BufWriter::new(file), total);
        let written = fetcher.download(&self.url, &mut writer)?;
        writer
            .flush()
            .map_err(|e| BuildError::io(format!("writing {}", partial.display()), e))?;
        drop(writer);

        info!(bytes = written, path = %partial.display(), "download complete");
        Ok(partial)
    }

    fn expected_digest(&self, fetcher: &dyn Fetcher) -> Result<Option<String>> {
        match &self.checksum {
            ChecksumPolicy::Skip => Ok(None),
            ChecksumPolicy::Pinned(digest) => Ok(Some(digest.to_lowercase())),
            ChecksumPolicy::Published { url, file_name } => match fetcher.get_text(url) {
                Ok(text) => {
                    let digest = find_sha256(&text, file_name);
                    if digest.is_none() {
                        warn!(
                            url = %url,
                            file = %file_name,
                            "checksum file has no SHA-256 entry; skipping verification"
                        );
                    }
                    Ok(digest)
                }
                Err(e) if e.is_not_found() => {
                    warn!(url = %url, "no published checksum; skipping verification");
                    Ok(None)
                }
                Err(e) => {
                    warn!(
                        url = %url,
                        error = %e,
                        "checksum file unavailable; skipping verification"
                    );
                    Ok(None)
                }
            },
        }
    }

    /// Checks `file` against the expected digest. A file that does not
    /// match is deleted so the next run downloads it again.
    fn verify(&self, fetcher: &dyn Fetcher, file: &Path) -> Result<()> {
        let Some(expected) = self.expected_digest(fetcher)? else {
            return Ok(());
        };
        let actual = sha256_file(file)
            .map_err(|e| BuildError::io(format!("hashing {}", file.display()), e))?;
        if actual != expected {
            if let Err(e) = fs::remove_file(file) {
                warn!(path = %file.display(), error = %e, "could not remove corrupt archive");
            }
            return Err(BuildError::ChecksumMismatch {
                file: self.dest.clone(),
                expected,
                actual,
            });
        }
        info!(sha256 = %actual, "archive checksum verified");
        Ok(())
    }
}

impl Step for FetchArchive {
    fn name(&self) -> &str {
        "fetch"
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepStatus> {
        if self.dest.is_file() {
            info!(path = %self.dest.display(), "archive already downloaded");
            self.verify(ctx.fetcher, &self.dest)?;
            return Ok(StepStatus::Skipped(format!(
                "{} already downloaded",
                self.dest.display()
            )));
        }

        let partial = self.download(ctx.fetcher)?;
        self.verify(ctx.fetcher, &partial)?;
        fs::rename(&partial, &self.dest)
            .map_err(|e| BuildError::io(format!("moving archive to {}", self.dest.display()), e))?;
        Ok(StepStatus::Done)
    }
}

/// Logs download progress in 10% increments.
struct ProgressWriter<W> {
    inner: W,
    total: Option<u64>,
    written: u64,
    next_report: u64,
}

impl<W: Write> ProgressWriter<W> {
    fn new(inner: W, total: Option<u64>) -> Self {
        Self {
            inner,
            total,
            written: 0,
            next_report: 10,
        }
    }
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        if let Some(total) = self.total.filter(|t| *t > 0) {
            let percent = self.written.saturating_mul(100) / total;
            if percent >= self.next_report {
                info!(
                    "downloaded {} of {} bytes ({}%)",
                    self.written,
                    total,
                    percent.min(100)
                );
                self.next_report = (percent / 10 + 1) * 10;
            }
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// External commands
// ---------------------------------------------------------------------------

/// Runs one external command.
pub struct RunCommand {
    pub name: String,
    pub spec: CommandSpec,
    /// Skip the command when this path already exists.
    pub unless_exists: Option<PathBuf>,
}

impl RunCommand {
    pub fn new(name: impl Into<String>, spec: CommandSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            unless_exists: None,
        }
    }

    pub fn unless_exists(mut self, path: impl Into<PathBuf>) -> Self {
        self.unless_exists = Some(path.into());
        self
    }
}

impl Step for RunCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepStatus> {
        if let Some(path) = self.unless_exists.as_ref().filter(|p| p.exists()) {
            info!(step = %self.name, path = %path.display(), "already present");
            return Ok(StepStatus::Skipped(format!("{} exists", path.display())));
        }
        ctx.runner.run(&self.spec)?;
        Ok(StepStatus::Done)
    }
}

// ---------------------------------------------------------------------------
// Transport selection
// ---------------------------------------------------------------------------

/// Writes the chosen transport into the installed `sources.conf`.
///
/// With `sudo` set the file belongs to root after `make install`, so the
/// new content is staged in a file the user owns and moved into place with
/// `sudo cp` and `sudo install`.
pub struct SelectTransport {
    pub conf: PathBuf,
    pub choice: TransportChoice,
    pub urls: SourceUrls,
    pub sudo: bool,
    /// Scratch file for the privileged path.
    pub staging: PathBuf,
}

impl SelectTransport {
    fn unchanged(&self) -> StepStatus {
        StepStatus::Skipped(format!("sources.conf already uses {}", self.choice.transport))
    }

    fn updated(&self) -> StepStatus {
        info!(
            conf = %self.conf.display(),
            transport = %self.choice.transport,
            "sources.conf updated"
        );
        StepStatus::Done
    }

    fn run_privileged(&self, runner: &dyn CommandRunner) -> Result<StepStatus> {
        let update = transport::pending_update(&self.conf, self.choice.transport, &self.urls)
            .map_err(|e| BuildError::io(format!("reading {}", self.conf.display()), e))?;
        let Some(rendered) = update else {
            return Ok(self.unchanged());
        };

        fs::write(&self.staging, rendered)
            .map_err(|e| BuildError::io(format!("writing {}", self.staging.display()), e))?;

        let conf = self.conf.display().to_string();
        let backup = transport::backup_path(&self.conf);
        let mut result = Ok(());
        if !backup.exists() {
            let copy = CommandSpec::new("cp")
                .arg("-p")
                .arg(&conf)
                .arg(backup.display().to_string())
                .with_sudo(true);
            result = runner.run(&copy).map(drop);
        }
        if result.is_ok() {
            let install = CommandSpec::new("install")
                .args(["-m", "0644"])
                .arg(self.staging.display().to_string())
                .arg(&conf)
                .with_sudo(true);
            result = runner.run(&install).map(drop);
        }

        if let Err(e) = fs::remove_file(&self.staging) {
            debug!(path = %self.staging.display(), error = %e, "staged sources.conf not removed");
        }
        result.map(|()| self.updated())
    }
}

impl Step for SelectTransport {
    fn name(&self) -> &str {
        "transport"
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepStatus> {
        if self.sudo {
            return self.run_privileged(ctx.runner);
        }
        let outcome = transport::apply_transport(&self.conf, self.choice.transport, &self.urls)
            .map_err(|e| BuildError::io(format!("updating {}", self.conf.display()), e))?;
        match outcome {
            ApplyOutcome::Rewritten => Ok(self.updated()),
            ApplyOutcome::Unchanged => Ok(self.unchanged()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use mpinstall_core::checksum::Sha256Hasher;
    use mpinstall_core::transport::{ProbeOutcome, Transport};
    use mpinstall_net::error::NetError;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};

    const ARCHIVE: &[u8] = b"not really a tarball";
    const STOCK_CONF: &str =
        "rsync://rsync.macports.org/macports/release/tarballs/ports.tar [default]\n";

    /// How the fake mirror answers the checksum file request.
    enum Checksums {
        Published(String),
        Missing,
        Offline,
    }

    struct FakeFetcher {
        checksums: Checksums,
        body: Cell<&'static [u8]>,
        downloads: RefCell<usize>,
    }

    impl Fetcher for FakeFetcher {
        fn get_text(&self, url: &str) -> mpinstall_net::error::Result<String> {
            match &self.checksums {
                Checksums::Published(text) => Ok(text.clone()),
                Checksums::Missing => Err(NetError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
                Checksums::Offline => Err(NetError::Transport {
                    url: url.to_string(),
                    reason: "dns error: no such host".to_string(),
                }),
            }
        }

        fn content_length(&self, _url: &str) -> mpinstall_net::error::Result<Option<u64>> {
            Ok(Some(self.body.get().len() as u64))
        }

        fn download(&self, _url: &str, dest: &mut dyn Write) -> mpinstall_net::error::Result<u64> {
            *self.downloads.borrow_mut() += 1;
            let body = self.body.get();
            dest.write_all(body).unwrap();
            Ok(body.len() as u64)
        }
    }

    struct NoCommands;

    impl CommandRunner for NoCommands {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
            panic!("unexpected command {spec}");
        }
    }

    /// Records commands and carries out `sudo cp` / `sudo install` as the
    /// current user.
    #[derive(Default)]
    struct SudoShell {
        commands: RefCell<Vec<String>>,
    }

    impl CommandRunner for SudoShell {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
            self.commands.borrow_mut().push(spec.to_string());
            assert_eq!(spec.program, "sudo");
            let n = spec.args.len();
            fs::copy(&spec.args[n - 2], &spec.args[n - 1]).unwrap();
            Ok(CommandOutput::default())
        }
    }

    fn archive_digest() -> String {
        let mut h = Sha256Hasher::new();
        h.update(ARCHIVE);
        h.finish()
    }

    fn fetcher(checksums: Checksums) -> FakeFetcher {
        FakeFetcher {
            checksums,
            body: Cell::new(ARCHIVE),
            downloads: RefCell::new(0),
        }
    }

    fn fetch_step(dir: &Path, checksum: ChecksumPolicy) -> FetchArchive {
        FetchArchive {
            url: "http://mirror/MacPorts-2.9.3.tar.bz2".to_string(),
            dest: dir.join("MacPorts-2.9.3.tar.bz2"),
            checksum,
        }
    }

    fn published() -> ChecksumPolicy {
        ChecksumPolicy::Published {
            url: "http://mirror/MacPorts-2.9.3.chk.txt".to_string(),
            file_name: "MacPorts-2.9.3.tar.bz2".to_string(),
        }
    }

    #[test]
    fn fetch_downloads_then_skips() {
        let dir = tempfile::tempdir().unwrap();
        let step = fetch_step(dir.path(), ChecksumPolicy::Pinned(archive_digest().to_uppercase()));
        let f = fetcher(Checksums::Missing);
        let ctx = StepContext {
            fetcher: &f,
            runner: &NoCommands,
        };

        assert_eq!(step.run(&ctx).unwrap(), StepStatus::Done);
        assert_eq!(fs::read(&step.dest).unwrap(), ARCHIVE);
        assert!(!step.partial_path().exists());

        assert!(matches!(step.run(&ctx).unwrap(), StepStatus::Skipped(_)));
        assert_eq!(*f.downloads.borrow(), 1);
    }

    #[test]
    fn published_checksum_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let wrong = "0".repeat(64);
        let step = fetch_step(dir.path(), published());
        let f = fetcher(Checksums::Published(format!(
            "SHA256 (MacPorts-2.9.3.tar.bz2) = {wrong}\n"
        )));
        let ctx = StepContext {
            fetcher: &f,
            runner: &NoCommands,
        };
        let err = step.run(&ctx).unwrap_err();
        assert!(matches!(err, BuildError::ChecksumMismatch { .. }), "got {err:?}");
    }

    #[test]
    fn corrupt_download_is_fetched_again_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let step = fetch_step(dir.path(), ChecksumPolicy::Pinned(archive_digest()));
        let f = fetcher(Checksums::Missing);
        f.body.set(b"truncated");
        let ctx = StepContext {
            fetcher: &f,
            runner: &NoCommands,
        };

        let err = step.run(&ctx).unwrap_err();
        assert!(matches!(err, BuildError::ChecksumMismatch { .. }), "got {err:?}");
        assert!(!step.dest.exists());
        assert!(!step.partial_path().exists());

        f.body.set(ARCHIVE);
        assert_eq!(step.run(&ctx).unwrap(), StepStatus::Done);
        assert_eq!(fs::read(&step.dest).unwrap(), ARCHIVE);
        assert_eq!(*f.downloads.borrow(), 2);
    }

    #[test]
    fn corrupt_existing_archive_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let step = fetch_step(dir.path(), ChecksumPolicy::Pinned(archive_digest()));
        fs::write(&step.dest, b"left over from an old run").unwrap();
        let f = fetcher(Checksums::Missing);
        let ctx = StepContext {
            fetcher: &f,
            runner: &NoCommands,
        };

        assert!(step.run(&ctx).is_err());
        assert!(!step.dest.exists());
        assert_eq!(step.run(&ctx).unwrap(), StepStatus::Done);
    }

    #[test]
    fn missing_published_checksum_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let step = fetch_step(dir.path(), published());
        let f = fetcher(Checksums::Missing);
        let ctx = StepContext {
            fetcher: &f,
            runner: &NoCommands,
        };
        assert_eq!(step.run(&ctx).unwrap(), StepStatus::Done);
    }

    #[test]
    fn unreachable_checksum_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let step = fetch_step(dir.path(), published());
        let f = fetcher(Checksums::Offline);
        let ctx = StepContext {
            fetcher: &f,
            runner: &NoCommands,
        };
        assert_eq!(step.run(&ctx).unwrap(), StepStatus::Done);
        assert!(step.dest.is_file());
    }

    #[test]
    fn run_command_skips_when_path_exists() {
        let dir = tempfile::tempdir().unwrap();
        let step = RunCommand::new("extract", CommandSpec::new("tar")).unless_exists(dir.path());
        let f = fetcher(Checksums::Missing);
        let ctx = StepContext {
            fetcher: &f,
            runner: &NoCommands,
        };
        assert!(matches!(step.run(&ctx).unwrap(), StepStatus::Skipped(_)));
    }

    fn select_http(dir: &Path, sudo: bool) -> SelectTransport {
        let conf = dir.join("sources.conf");
        fs::write(&conf, STOCK_CONF).unwrap();
        SelectTransport {
            conf,
            choice: TransportChoice::from_outcome(ProbeOutcome::Refused),
            urls: SourceUrls::default(),
            sudo,
            staging: dir.join("sources.conf.new"),
        }
    }

    #[test]
    fn select_transport_rewrites_once() {
        let dir = tempfile::tempdir().unwrap();
        let step = select_http(dir.path(), false);
        assert_eq!(step.choice.transport, Transport::Http);
        let f = fetcher(Checksums::Missing);
        let ctx = StepContext {
            fetcher: &f,
            runner: &NoCommands,
        };
        assert_eq!(step.run(&ctx).unwrap(), StepStatus::Done);
        assert!(matches!(step.run(&ctx).unwrap(), StepStatus::Skipped(_)));
    }

    #[test]
    fn select_transport_with_sudo_copies_through_runner() {
        let dir = tempfile::tempdir().unwrap();
        let step = select_http(dir.path(), true);
        let conf = step.conf.display().to_string();
        let staging = step.staging.display().to_string();
        let shell = SudoShell::default();
        let f = fetcher(Checksums::Missing);
        let ctx = StepContext {
            fetcher: &f,
            runner: &shell,
        };

        assert_eq!(step.run(&ctx).unwrap(), StepStatus::Done);
        assert_eq!(
            *shell.commands.borrow(),
            vec![
                format!("sudo cp -p {conf} {conf}.orig"),
                format!("sudo install -m 0644 {staging} {conf}"),
            ]
        );
        assert!(!step.staging.exists());
        assert_eq!(
            fs::read_to_string(&step.conf).unwrap(),
            render_http(STOCK_CONF)
        );
        assert_eq!(
            fs::read_to_string(transport::backup_path(&step.conf)).unwrap(),
            STOCK_CONF
        );

        // Already rewritten: no further commands.
        assert!(matches!(step.run(&ctx).unwrap(), StepStatus::Skipped(_)));
        assert_eq!(shell.commands.borrow().len(), 2);
    }

    fn render_http(content: &str) -> String {
        transport::render_sources_conf(content, Transport::Http, &SourceUrls::default())
    }

    #[test]
    fn progress_writer_counts_bytes() {
        let mut sink = Vec::new();
        let mut w = ProgressWriter::new(&mut sink, Some(4));
        w.write_all(b"ab").unwrap();
        w.write_all(b"cd").unwrap();
        assert_eq!(w.written, 4);
        assert_eq!(w.next_report, 110);
        drop(w);
        assert_eq!(sink, b"abcd");
    }
}
