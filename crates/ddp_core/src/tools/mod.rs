//! External tool discovery.
//!
//! The encoder drives closed-source binaries it cannot bundle, so every
//! run starts by locating them. Missing required tools abort the run
//! before anything touches the filesystem.

mod locator;
mod version;

pub use locator::{required_tools, BinaryLocator, LocateError, Tool, ToolPaths};
pub use version::{check_dee_version, detect_dee_version, VersionCheck};
