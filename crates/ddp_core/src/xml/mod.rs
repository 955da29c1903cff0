//! DEE job description generation.
//!
//! Job files are built as a small element tree and rendered with a fixed
//! layout, so the same run configuration always produces the same bytes.

mod element;
mod job;

pub use element::{escape_xml, Element};
pub use job::{build_job, render_job, write_job, JobSpec};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    /// Rendered document failed to parse back.
    #[error("Generated job XML is malformed: {0}")]
    Malformed(String),

    #[error("{variant} has no data rate")]
    MissingDataRate { variant: crate::models::OutputVariant },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
