//! Resample step - brings decoded PCM to 48 kHz with sox.

use super::{require_output, tool_path};
use crate::models::{Stage, TARGET_SAMPLE_RATE};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, ResampleOutput, RunPhase, RunState, StepOutcome};
use crate::process::ToolCommand;
use crate::progress::parser_for;
use crate::tools::Tool;
use crate::workspace::ArtifactKind;

/// Resamples the decoded PCM when the source is not 48 kHz.
pub struct ResampleStep;

impl ResampleStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ResampleStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ResampleStep {
    fn name(&self) -> &str {
        "Resample"
    }

    fn stage(&self) -> Stage {
        Stage::Resample
    }

    fn phase(&self) -> RunPhase {
        RunPhase::Resampling
    }

    fn description(&self) -> &str {
        "Resample PCM to 48 kHz"
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        tool_path(ctx, Tool::Resampler)?;
        let pcm = state
            .decode
            .as_ref()
            .and_then(|d| d.pcm.as_deref())
            .ok_or_else(|| StepError::not_ready("no decoded PCM to resample"))?;
        require_output(pcm).map(|_| ())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let Some(from_rate) = ctx.config.resample_from else {
            return Ok(StepOutcome::Skipped("source is already 48 kHz".to_string()));
        };

        let source = state
            .decode
            .as_ref()
            .and_then(|d| d.pcm.clone())
            .ok_or_else(|| StepError::not_ready("no decoded PCM to resample"))?;
        let target = ctx.work_path(format!("{}_48k.w64", ctx.config.run_id));

        let sox = tool_path(ctx, Tool::Resampler)?;
        let cmd = ToolCommand::new(Tool::Resampler.label(), sox)
            .arg("-S")
            .arg(&source)
            .arg(&target)
            .args(["rate", "-v"])
            .arg(TARGET_SAMPLE_RATE.to_string())
            .current_dir(&ctx.work_dir);

        ctx.logger.info(&format!(
            "Resampling {} Hz -> {} Hz",
            from_rate, TARGET_SAMPLE_RATE
        ));
        ctx.run_tool(&cmd, "Resampling", parser_for(Tool::Resampler))?;

        state.track(&target, ArtifactKind::Resampled);
        state.resample = Some(ResampleOutput {
            path: target,
            from_rate,
            to_rate: TARGET_SAMPLE_RATE,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let output = state
            .resample
            .as_ref()
            .ok_or_else(|| StepError::bad_output("no resampled PCM recorded"))?;
        require_output(&output.path).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::testing::test_context;
    use crate::orchestrator::types::DecodeOutput;
    use tempfile::tempdir;

    #[test]
    fn skipped_without_rate_mismatch() {
        let dir = tempdir().unwrap();
        let ctx = test_context(dir.path());
        let mut state = RunState::new("x");
        state.decode = Some(DecodeOutput {
            pcm: Some(ctx.work_path("x.w64")),
            ..Default::default()
        });

        let outcome = ResampleStep::new().execute(&ctx, &mut state).unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped(_)));
        assert!(state.resample.is_none());
    }

    #[test]
    fn requires_sox() {
        let dir = tempdir().unwrap();
        let ctx = test_context(dir.path());
        let err = ResampleStep::new()
            .validate_input(&ctx, &RunState::new("x"))
            .unwrap_err();
        assert!(err.to_string().contains("sox"));
    }
}
