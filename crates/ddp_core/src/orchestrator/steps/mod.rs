//! Pipeline step implementations.
//!
//! Each step drives one external tool and records what it produced in the
//! run state.

mod decode;
mod encode;
mod layout_fix;
mod resample;

pub use decode::{AdmConvertStep, DecodeStep, ImportStep};
pub use encode::EncodeStep;
pub use layout_fix::LayoutFixStep;
pub use resample::ResampleStep;

use std::fs;
use std::path::Path;

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::types::Context;
use crate::tools::Tool;

/// Located path of `tool`, or a precondition failure.
fn tool_path(ctx: &Context, tool: Tool) -> StepResult<&Path> {
    ctx.tools.get(tool).ok_or_else(|| {
        StepError::not_ready(format!(
            "{} ({}) was not located",
            tool.description(),
            tool.label()
        ))
    })
}

/// Check that a tool produced a non-empty file.
fn require_output(path: &Path) -> StepResult<u64> {
    let metadata =
        fs::metadata(path).map_err(|_| StepError::missing_file(path))?;
    if metadata.len() == 0 {
        return Err(StepError::bad_output(format!(
            "{} is empty (0 bytes)",
            path.display()
        )));
    }
    Ok(metadata.len())
}

fn format_size(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    if bytes as f64 >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_output_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        assert!(matches!(
            require_output(&path),
            Err(StepError::MissingFile(_))
        ));

        fs::write(&path, b"").unwrap();
        assert!(matches!(
            require_output(&path),
            Err(StepError::BadOutput(_))
        ));

        fs::write(&path, b"ec3").unwrap();
        assert_eq!(require_output(&path).unwrap(), 3);
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }
}
