//! Atmos mezzanine handling.
//!
//! A mezzanine is a `.atmos` YAML master file plus its `.atmos.audio` and
//! `.atmos.metadata` siblings. Only the YAML master is ever read or
//! edited; the binary siblings are moved around untouched.

mod conform;
mod mezzanine;

pub use conform::{
    conform_bed_layout, read_metadata, relink_siblings, summarize, MezzanineSummary,
};
pub use mezzanine::MezzanineSet;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors reading or rewriting a mezzanine.
#[derive(Error, Debug)]
pub enum AtmosError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid Atmos metadata in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
