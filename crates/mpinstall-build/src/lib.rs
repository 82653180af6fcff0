//! Build-from-source pipeline for mpinstall.
//!
//! The install is an ordered list of named [`step::Step`]s executed by
//! [`pipeline::Pipeline`], which stops at the first failure. External
//! programs are started through the [`command::CommandRunner`] seam so the
//! sequence can be exercised without a toolchain.
//!
//! [`installer::install`] ties everything together: lock the build
//! directory, check the toolchain, pick the latest release, probe the rsync
//! port, and run the plan from [`plan::install_plan`].

pub mod command;
pub mod error;
pub mod installer;
pub mod lock;
pub mod pipeline;
pub mod plan;
pub mod preflight;
pub mod step;
