//! Core types for the mpinstall tool.
//!
//! This crate holds the domain model shared by every other crate: dotted
//! release versions, the scraped release listing, the rsync/HTTP transport
//! decision and the `sources.conf` rewrite that follows from it, and
//! archive checksum helpers. Nothing in here touches the network.

pub mod checksum;
pub mod error;
pub mod release;
pub mod transport;
pub mod version;
