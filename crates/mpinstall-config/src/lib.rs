//! Configuration management for mpinstall.
//!
//! Settings are layered with figment: built-in defaults, then an optional
//! TOML or YAML settings file, then `MPINSTALL_*` environment variables,
//! then command-line flags. Directory settings are resolved to absolute
//! paths once loading is done.

pub mod paths;
pub mod settings;
