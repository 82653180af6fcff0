//! Network access for mpinstall.
//!
//! Everything that leaves the machine goes through one of two seams:
//!
//! - [`http::Fetcher`] for the release listing, archive and checksum
//!   downloads ([`http::HttpFetcher`] is the ureq-backed implementation).
//! - [`probe::PortProbe`] for the rsync reachability check
//!   ([`probe::TcpProbe`] performs a real connect-with-timeout).
//!
//! Command code depends on the traits so tests can substitute fakes.

pub mod discovery;
pub mod error;
pub mod http;
pub mod probe;
