//! Core types for the encode pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{StepError, StepResult};
use super::pipeline::CancelHandle;
use crate::atmos::MezzanineSet;
use crate::logging::JobLogger;
use crate::models::{OutputVariant, RunConfig};
use crate::process::{run_streaming, ToolCommand};
use crate::progress::{NullProgress, ProgressParser, ProgressReporter, ProgressSink};
use crate::tools::ToolPaths;
use crate::workspace::{Artifact, ArtifactKind};

/// Read-only context passed to pipeline steps.
///
/// Mutable results go in `RunState`.
pub struct Context {
    /// Immutable run configuration.
    pub config: RunConfig,
    /// Resolved tool paths.
    pub tools: ToolPaths,
    /// Job name (input base name).
    pub job_name: String,
    /// Isolated per-run workspace directory.
    pub work_dir: PathBuf,
    pub logger: Arc<JobLogger>,
    pub cancel: CancelHandle,
    progress: Arc<dyn ProgressSink>,
    pretty_commands: bool,
}

impl Context {
    pub fn new(
        config: RunConfig,
        tools: ToolPaths,
        work_dir: PathBuf,
        logger: Arc<JobLogger>,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            job_name: config.base_name.clone(),
            config,
            tools,
            work_dir,
            logger,
            cancel,
            progress: Arc::new(NullProgress),
            pretty_commands: false,
        }
    }

    /// Set where tool progress is rendered.
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Log commands one argument per line.
    pub fn with_pretty_commands(mut self, pretty: bool) -> Self {
        self.pretty_commands = pretty;
        self
    }

    /// Path of a file inside the workspace.
    pub fn work_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.work_dir.join(file_name)
    }

    /// Run an external tool, streaming its output into a progress reporter.
    ///
    /// Returns the first dialnorm value the parser picked up, if any.
    pub fn run_tool(
        &self,
        command: &ToolCommand,
        label: &str,
        parser: Box<dyn ProgressParser>,
    ) -> StepResult<Option<i32>> {
        if self.pretty_commands {
            self.logger.command_pretty(&command.tokens());
        } else {
            self.logger.command(&command.display());
        }
        self.logger.clear_tail();
        self.logger.reset_progress();

        let mut reporter = ProgressReporter::new(label, parser, self.progress.as_ref())
            .with_logger(&self.logger)
            .with_forced_dialnorm(Some(self.config.dialogue_level));

        let result = run_streaming(command, &self.cancel, |line, stream| {
            self.logger.output_line(line, stream.is_stderr());
            reporter.feed(line);
        });

        match result {
            Ok(_) => Ok(reporter.finish()),
            Err(e) => {
                reporter.abandon();
                if !matches!(e, StepError::Cancelled) {
                    self.logger.show_tail(command.tool_name());
                }
                Err(e)
            }
        }
    }
}

/// Outcome of a step execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    Skipped(String),
}

/// Pipeline run state.
///
/// Transitions only move forward; a run never re-enters an earlier phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Pending,
    Decoding,
    Resampling,
    Encoding(OutputVariant),
    LayoutFixing,
    Cleanup,
    Done,
    Failed,
}

impl RunPhase {
    fn rank(&self) -> u8 {
        match self {
            RunPhase::Pending => 0,
            RunPhase::Decoding => 1,
            RunPhase::Resampling => 2,
            RunPhase::Encoding(variant) => {
                3 + match variant {
                    OutputVariant::Atmos51 => 0,
                    OutputVariant::Atmos71 => 1,
                    OutputVariant::PlainDdp => 2,
                    OutputVariant::TrueHdAtmos => 3,
                }
            }
            RunPhase::LayoutFixing => 7,
            RunPhase::Cleanup => 8,
            RunPhase::Done => 9,
            RunPhase::Failed => 10,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Pending => write!(f, "pending"),
            RunPhase::Decoding => write!(f, "decoding"),
            RunPhase::Resampling => write!(f, "resampling"),
            RunPhase::Encoding(variant) => write!(f, "encoding {}", variant),
            RunPhase::LayoutFixing => write!(f, "layout fixing"),
            RunPhase::Cleanup => write!(f, "cleanup"),
            RunPhase::Done => write!(f, "done"),
            RunPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Mutable run state that accumulates results from pipeline steps.
///
/// Steps add their own section and never overwrite another step's output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub started_at: Option<String>,
    pub phase: RunPhase,
    /// Phases entered, in order.
    pub history: Vec<RunPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode: Option<DecodeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resample: Option<ResampleOutput>,
    pub encodes: Vec<EncodeOutput>,
    /// Files created in the workspace.
    pub artifacts: Vec<Artifact>,
}

impl RunState {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Move to the next phase.
    pub fn advance(&mut self, next: RunPhase) -> StepResult<()> {
        if self.phase.is_terminal() {
            return Err(StepError::not_ready(format!(
                "run already {}, cannot enter {}",
                self.phase, next
            )));
        }
        if next != RunPhase::Failed && next.rank() <= self.phase.rank() {
            return Err(StepError::not_ready(format!(
                "cannot go from {} back to {}",
                self.phase, next
            )));
        }
        self.phase = next;
        self.history.push(next);
        Ok(())
    }

    /// Mark the run failed. No-op once terminal.
    pub fn fail(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = RunPhase::Failed;
            self.history.push(RunPhase::Failed);
        }
    }

    /// Record a file created in the workspace.
    pub fn track(&mut self, path: impl Into<PathBuf>, kind: ArtifactKind) {
        let path = path.into();
        if !self.artifacts.iter().any(|a| a.path == path) {
            self.artifacts.push(Artifact::new(path, kind));
        }
    }

    pub fn mezzanine(&self) -> Option<&MezzanineSet> {
        self.decode.as_ref().and_then(|d| d.mezzanine.as_ref())
    }

    /// PCM to encode: the resampled file if there is one, else the decode.
    pub fn pcm_source(&self) -> Option<&Path> {
        if let Some(ref resample) = self.resample {
            return Some(&resample.path);
        }
        self.decode.as_ref().and_then(|d| d.pcm.as_deref())
    }

    pub fn encode_for(&self, variant: OutputVariant) -> Option<&EncodeOutput> {
        self.encodes.iter().find(|e| e.variant == variant)
    }

    pub fn encode_for_mut(&mut self, variant: OutputVariant) -> Option<&mut EncodeOutput> {
        self.encodes.iter_mut().find(|e| e.variant == variant)
    }
}

/// Output from the Decode stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodeOutput {
    /// Atmos mezzanine triplet, for Atmos paths.
    pub mezzanine: Option<MezzanineSet>,
    /// Decoded PCM, for the plain DDP path.
    pub pcm: Option<PathBuf>,
    /// Whether the bed configuration was rewritten.
    pub conformed: bool,
}

/// Output from the Resample stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResampleOutput {
    pub path: PathBuf,
    pub from_rate: u32,
    pub to_rate: u32,
}

/// Output of one Encode stage, plus its layout fix if applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeOutput {
    pub variant: OutputVariant,
    /// Job description passed to the encoding engine.
    pub job_file: PathBuf,
    /// File written by the encoding engine.
    pub encoded: PathBuf,
    /// Layout-fixed file, 7.1 only.
    pub layout_fixed: Option<PathBuf>,
    /// Dialnorm measured by the engine.
    pub measured_dialnorm: Option<i32>,
}

impl EncodeOutput {
    /// File to publish as the final output.
    pub fn final_file(&self) -> &Path {
        self.layout_fixed.as_deref().unwrap_or(&self.encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_move_forward() {
        let mut state = RunState::new("abc123");
        state.advance(RunPhase::Decoding).unwrap();
        state
            .advance(RunPhase::Encoding(OutputVariant::Atmos51))
            .unwrap();
        state
            .advance(RunPhase::Encoding(OutputVariant::Atmos71))
            .unwrap();
        assert!(state.advance(RunPhase::Decoding).is_err());
        assert!(state
            .advance(RunPhase::Encoding(OutputVariant::Atmos51))
            .is_err());
        state.advance(RunPhase::LayoutFixing).unwrap();
        state.advance(RunPhase::Cleanup).unwrap();
        state.advance(RunPhase::Done).unwrap();

        assert!(state.advance(RunPhase::Failed).is_err());
        assert_eq!(state.history.len(), 6);
    }

    #[test]
    fn fail_is_terminal() {
        let mut state = RunState::new("abc123");
        state.advance(RunPhase::Decoding).unwrap();
        state.fail();
        assert_eq!(state.phase, RunPhase::Failed);
        assert!(state.advance(RunPhase::Cleanup).is_err());

        state.fail();
        assert_eq!(state.history, vec![RunPhase::Decoding, RunPhase::Failed]);
    }

    #[test]
    fn pcm_source_prefers_resampled() {
        let mut state = RunState::new("abc123");
        state.decode = Some(DecodeOutput {
            pcm: Some(PathBuf::from("/ws/abc123.w64")),
            ..Default::default()
        });
        assert_eq!(state.pcm_source(), Some(Path::new("/ws/abc123.w64")));

        state.resample = Some(ResampleOutput {
            path: PathBuf::from("/ws/abc123_48k.w64"),
            from_rate: 96_000,
            to_rate: 48_000,
        });
        assert_eq!(state.pcm_source(), Some(Path::new("/ws/abc123_48k.w64")));
    }

    #[test]
    fn tracking_is_deduplicated() {
        let mut state = RunState::new("abc123");
        state.track("/ws/a.xml", ArtifactKind::JobFile);
        state.track("/ws/a.xml", ArtifactKind::JobFile);
        assert_eq!(state.artifacts.len(), 1);
    }

    #[test]
    fn final_file_prefers_layout_fix() {
        let mut output = EncodeOutput {
            variant: OutputVariant::Atmos71,
            job_file: PathBuf::from("/ws/job.xml"),
            encoded: PathBuf::from("/ws/x_atmos_7_1.mp4"),
            layout_fixed: None,
            measured_dialnorm: None,
        };
        assert_eq!(output.final_file(), Path::new("/ws/x_atmos_7_1.mp4"));
        output.layout_fixed = Some(PathBuf::from("/ws/x_atmos_7_1_fix.mp4"));
        assert_eq!(output.final_file(), Path::new("/ws/x_atmos_7_1_fix.mp4"));
    }
}
