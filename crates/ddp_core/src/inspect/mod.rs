//! Stream inspection.
//!
//! Reads the properties of an input before anything is decoded: whether
//! Atmos metadata is present, the dialogue level, presentations and the
//! sample rate. TrueHD streams are queried with `truehdd info`; mezzanines
//! and ADM waves are read directly.

mod adm;
mod mezzanine;
mod truehd;

pub use adm::{scan_adm, AdmScan};
pub use mezzanine::inspect_mezzanine;
pub use truehd::{parse_truehdd_info, query_truehd};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::atmos::AtmosError;
use crate::models::{InputKind, StreamInfo};
use crate::tools::{Tool, ToolPaths};

/// Why an input cannot be encoded.
#[derive(Error, Debug)]
pub enum InspectError {
    /// The info tool exited non-zero. Its diagnostics are kept verbatim.
    #[error("{} could not read {}:\n{diagnostics}", .tool.label(), .path.display())]
    ProbeFailed {
        tool: Tool,
        path: PathBuf,
        exit_code: Option<i32>,
        diagnostics: String,
    },

    #[error("Failed to run {}: {message}", .tool.label())]
    Spawn { tool: Tool, message: String },

    #[error("No {} located for inspection", .0.label())]
    ToolUnavailable(Tool),

    #[error("No recognizable audio stream in {}", .path.display())]
    NoAudio { path: PathBuf },

    #[error("Incomplete Atmos mezzanine, missing: {}", join_paths(.missing))]
    IncompleteMezzanine { missing: Vec<PathBuf> },

    #[error(transparent)]
    InvalidMetadata(#[from] AtmosError),

    #[error("{} is not an ADM BWF file: {reason}", .path.display())]
    NotAdm { path: PathBuf, reason: String },

    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Inspect `path` according to its input kind.
pub fn inspect_input(
    kind: InputKind,
    path: &Path,
    tools: &ToolPaths,
) -> Result<StreamInfo, InspectError> {
    tracing::debug!("Inspecting {} input {}", kind, path.display());

    let info = match kind {
        InputKind::TrueHd => {
            let truehdd = tools
                .get(Tool::Truehdd)
                .ok_or(InspectError::ToolUnavailable(Tool::Truehdd))?;
            query_truehd(truehdd, path)?
        }
        InputKind::AtmosMezzanine => inspect_mezzanine(path)?,
        InputKind::Adm => {
            let scan = scan_adm(path)?;
            StreamInfo {
                atmos_present: true,
                sample_rate: Some(scan.sample_rate),
                channel_layout: Some(format!("{} channels", scan.channels)),
                ..StreamInfo::default()
            }
        }
    };

    tracing::info!(
        "Stream: atmos={} dialogue_level={:?} presentations={} sample_rate={:?}",
        info.atmos_present,
        info.dialogue_level,
        info.presentation_count,
        info.sample_rate
    );
    Ok(info)
}
