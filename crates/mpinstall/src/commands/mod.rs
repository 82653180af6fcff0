//! Command handlers, one module per subcommand.

pub mod completion;
pub mod install;
pub mod probe;
pub mod releases;
pub mod version;
