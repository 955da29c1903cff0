//! Run failures and the process exit codes they map to.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::inspect::InspectError;
use crate::models::{OutputVariant, Stage};
use crate::resolve::ResolveError;
use crate::tools::LocateError;
use crate::xml::XmlError;

/// Exit code for a missing external tool.
pub const EXIT_MISSING_BINARY: i32 = 127;
/// Exit code for a run stopped by an interrupt.
pub const EXIT_CANCELLED: i32 = 130;
/// Exit code for every other fatal condition.
pub const EXIT_FAILURE: i32 = 1;

/// Top-level error for one encode run. Every variant is fatal.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required external tool could not be found.
    #[error("Missing binary: {0}")]
    MissingBinary(#[from] LocateError),

    /// The input holds no usable audio, or no Atmos where Atmos is required.
    #[error("Unsupported stream: {message}")]
    UnsupportedStream { message: String },

    /// A data rate outside the legal set for its variant.
    #[error("Invalid bitrate {bitrate} kbps for {variant} (allowed: {allowed})")]
    InvalidBitrate {
        variant: OutputVariant,
        bitrate: u32,
        allowed: String,
    },

    /// Any other option or input validation failure.
    #[error("Job '{job_name}' failed validation: {message}")]
    ValidationFailed { job_name: String, message: String },

    /// An external stage failed.
    #[error("Job '{job_name}' failed at stage {stage}: {source}")]
    StageFailed {
        job_name: String,
        stage: Stage,
        #[source]
        source: StepError,
    },

    /// A final output could not be moved into place.
    #[error("Job '{job_name}' could not move {} to {}: {source}", .from.display(), .to.display())]
    ArtifactMoveFailed {
        job_name: String,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The run was interrupted.
    #[error("Job '{job_name}' was cancelled")]
    Cancelled { job_name: String },

    /// Failed to set up the run (output dir, workspace, log file).
    #[error("Job '{job_name}' setup failed: {message}")]
    SetupFailed { job_name: String, message: String },
}

impl PipelineError {
    pub fn stage_failed(job_name: impl Into<String>, stage: Stage, source: StepError) -> Self {
        Self::StageFailed {
            job_name: job_name.into(),
            stage,
            source,
        }
    }

    pub fn validation_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    pub fn setup_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(job_name: impl Into<String>) -> Self {
        Self::Cancelled {
            job_name: job_name.into(),
        }
    }

    pub fn unsupported_stream(message: impl Into<String>) -> Self {
        Self::UnsupportedStream {
            message: message.into(),
        }
    }

    /// Stage that failed, for stage failures.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Exit code of the failed external tool, if a tool exited non-zero.
    pub fn tool_exit_code(&self) -> Option<i32> {
        match self {
            PipelineError::StageFailed {
                source: StepError::ToolFailed { exit_code, .. },
                ..
            } => Some(*exit_code),
            _ => None,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::MissingBinary(_) => EXIT_MISSING_BINARY,
            PipelineError::Cancelled { .. } => EXIT_CANCELLED,
            _ => EXIT_FAILURE,
        }
    }
}

impl From<InspectError> for PipelineError {
    fn from(err: InspectError) -> Self {
        PipelineError::UnsupportedStream {
            message: err.to_string(),
        }
    }
}

impl From<ResolveError> for PipelineError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidBitrate { variant, bitrate } => PipelineError::InvalidBitrate {
                variant,
                bitrate,
                allowed: join_rates(variant.allowed_bitrates()),
            },
            ResolveError::AtmosRequired { .. } => PipelineError::UnsupportedStream {
                message: err.to_string(),
            },
            other => PipelineError::validation_failed("options", other.to_string()),
        }
    }
}

fn join_rates(rates: &[u32]) -> String {
    rates
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why a single step failed.
#[derive(Error, Debug)]
pub enum StepError {
    /// The tool exited non-zero. `tail` is the end of its output.
    #[error("{tool} exited with code {exit_code}:\n{tail}")]
    ToolFailed {
        tool: String,
        exit_code: i32,
        tail: String,
    },

    #[error("Missing file: {}", .0.display())]
    MissingFile(PathBuf),

    /// An earlier step did not leave what this one needs.
    #[error("Not ready: {0}")]
    NotReady(String),

    /// The tool succeeded but its output is unusable.
    #[error("Bad output: {0}")]
    BadOutput(String),

    #[error("Atmos metadata: {0}")]
    Metadata(String),

    #[error(transparent)]
    JobFile(#[from] XmlError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Interrupted while a tool was running.
    #[error("Cancelled")]
    Cancelled,
}

impl StepError {
    pub fn tool_failed(tool: impl Into<String>, exit_code: i32, tail: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            exit_code,
            tail: tail.into(),
        }
    }

    pub fn missing_file(path: impl Into<PathBuf>) -> Self {
        Self::MissingFile(path.into())
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::NotReady(message.into())
    }

    pub fn bad_output(message: impl Into<String>) -> Self {
        Self::BadOutput(message.into())
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type StepResult<T> = Result<T, StepError>;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;

    #[test]
    fn tool_failure_shows_output_tail() {
        let msg = StepError::tool_failed("dee", 2, "ERROR: Invalid data_rate").to_string();
        assert!(msg.starts_with("dee exited with code 2"));
        assert!(msg.ends_with("ERROR: Invalid data_rate"));
    }

    #[test]
    fn stage_failure_names_stage_and_exit_code() {
        let step_err = StepError::tool_failed("eac3_7.1_atmos_fix", 3, "bad frame");
        let err = PipelineError::stage_failed("movie", Stage::LayoutFix, step_err);

        assert!(err.to_string().contains("layout fix"));
        assert_eq!(err.stage(), Some(Stage::LayoutFix));
        assert_eq!(err.tool_exit_code(), Some(3));
        assert_eq!(err.exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn exit_codes_follow_taxonomy() {
        let missing = PipelineError::from(LocateError::not_found(Tool::Dee, "dee", "binaries"));
        assert_eq!(missing.exit_code(), EXIT_MISSING_BINARY);
        assert_eq!(PipelineError::cancelled("movie").exit_code(), EXIT_CANCELLED);
        assert_eq!(
            PipelineError::unsupported_stream("no audio").exit_code(),
            EXIT_FAILURE
        );
    }

    #[test]
    fn invalid_bitrate_lists_allowed_set() {
        let err = PipelineError::from(ResolveError::InvalidBitrate {
            variant: OutputVariant::Atmos71,
            bitrate: 1000,
        });
        let msg = err.to_string();
        assert!(msg.contains("1000"));
        assert!(msg.contains("1152, 1280, 1536, 1664"));
    }
}
