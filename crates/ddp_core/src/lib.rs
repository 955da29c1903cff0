//! Encode TrueHD Atmos, `.atmos` mezzanines and ADM BWF into Dolby Digital
//! Plus Atmos by driving truehdd, sox, dee and the 7.1 layout fixer.
//!
//! Flags, the progress bar and signal handling live in the CLI crate.

pub mod atmos;
pub mod config;
pub mod inspect;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod process;
pub mod progress;
pub mod resolve;
pub mod tools;
pub mod workspace;
pub mod xml;
