//! Layout fix step - corrects the channel layout flag of 7.1 encodes.

use super::{require_output, tool_path};
use crate::models::{OutputVariant, Stage};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunPhase, RunState, StepOutcome};
use crate::process::ToolCommand;
use crate::progress::parser_for;
use crate::tools::Tool;
use crate::workspace::ArtifactKind;

/// Runs eac3_7.1_atmos_fix on the Atmos 7.1 encode.
pub struct LayoutFixStep {
    variant: OutputVariant,
}

impl LayoutFixStep {
    pub fn new() -> Self {
        Self {
            variant: OutputVariant::Atmos71,
        }
    }
}

impl Default for LayoutFixStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for LayoutFixStep {
    fn name(&self) -> &str {
        "Layout fix"
    }

    fn stage(&self) -> Stage {
        Stage::LayoutFix
    }

    fn phase(&self) -> RunPhase {
        RunPhase::LayoutFixing
    }

    fn description(&self) -> &str {
        "Fix 7.1 channel layout"
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        tool_path(ctx, Tool::LayoutFix)?;
        let encoded = state.encode_for(self.variant).ok_or_else(|| {
            StepError::not_ready(format!("{} was not encoded", self.variant))
        })?;
        require_output(&encoded.encoded).map(|_| ())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let fixed = ctx.work_path(ctx.config.fixed_file_name(self.variant));
        let encoded = state
            .encode_for(self.variant)
            .map(|e| e.encoded.clone())
            .ok_or_else(|| StepError::not_ready("no 7.1 encode recorded"))?;

        let fixer = tool_path(ctx, Tool::LayoutFix)?;
        let cmd = ToolCommand::new(Tool::LayoutFix.label(), fixer)
            .arg("-i")
            .arg(&encoded)
            .arg("-o")
            .arg(&fixed)
            .current_dir(&ctx.work_dir);
        ctx.run_tool(&cmd, "Fixing layout", parser_for(Tool::LayoutFix))?;

        state.track(&fixed, ArtifactKind::Final);
        if let Some(output) = state.encode_for_mut(self.variant) {
            output.layout_fixed = Some(fixed);
        }
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let fixed = state
            .encode_for(self.variant)
            .and_then(|e| e.layout_fixed.as_deref())
            .ok_or_else(|| StepError::bad_output("no layout-fixed file recorded"))?;
        require_output(fixed).map(|_| ())
    }
}
