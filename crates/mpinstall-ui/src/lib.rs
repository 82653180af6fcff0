//! Terminal styling for mpinstall output.
//!
//! Color is applied only when the terminal supports it, so everything here
//! degrades to plain text in pipes and log files.

pub mod styles;
pub mod terminal;
