//! Encode step - writes a job description and runs DEE on it.

use std::path::PathBuf;

use super::{format_size, require_output, tool_path};
use crate::models::{OutputVariant, Stage};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, EncodeOutput, RunPhase, RunState, StepOutcome};
use crate::process::ToolCommand;
use crate::progress::parser_for;
use crate::tools::Tool;
use crate::workspace::ArtifactKind;
use crate::xml::{write_job, JobSpec};

/// Encodes one output variant.
pub struct EncodeStep {
    variant: OutputVariant,
    name: String,
    description: String,
}

impl EncodeStep {
    pub fn new(variant: OutputVariant) -> Self {
        Self {
            variant,
            name: format!("Encode {}", variant),
            description: format!("Encode {}", variant),
        }
    }

    pub fn variant(&self) -> OutputVariant {
        self.variant
    }

    /// Source the engine reads for this variant.
    fn source(&self, state: &RunState) -> StepResult<PathBuf> {
        let source = match self.variant {
            OutputVariant::PlainDdp => state.pcm_source().map(|p| p.to_path_buf()),
            _ => state.mezzanine().map(|m| m.atmos.clone()),
        };
        source.ok_or_else(|| {
            StepError::not_ready(format!("no decoded source for {}", self.variant))
        })
    }
}

impl PipelineStep for EncodeStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn stage(&self) -> Stage {
        Stage::Encode(self.variant)
    }

    fn phase(&self) -> RunPhase {
        RunPhase::Encoding(self.variant)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        tool_path(ctx, Tool::Dee)?;
        let source = self.source(state)?;
        if !source.is_file() {
            return Err(StepError::missing_file(source));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let config = &ctx.config;
        let source = self.source(state)?;

        let spec = JobSpec::for_variant(config, self.variant, &source, &ctx.work_dir);
        let job_file = ctx.work_path(config.job_file_name(self.variant));
        write_job(&spec, &job_file)?;
        state.track(&job_file, ArtifactKind::JobFile);
        ctx.logger.info(&format!(
            "Job description written: {}",
            config.job_file_name(self.variant)
        ));

        if let Some(rate) = spec.data_rate {
            ctx.logger.info(&format!("Data rate: {} kbps", rate));
        }
        ctx.logger
            .info(&format!("Dialogue level: {} dB", config.dialogue_level));

        let dee = tool_path(ctx, Tool::Dee)?;
        let cmd = ToolCommand::new(Tool::Dee.label(), dee)
            .arg("-x")
            .arg(&job_file)
            .current_dir(&ctx.work_dir);
        let measured = ctx.run_tool(&cmd, &format!("Encoding {}", self.variant), parser_for(Tool::Dee))?;

        if let Some(dialnorm) = measured {
            ctx.logger
                .debug(&format!("Measured dialnorm: {} dB", dialnorm));
        }

        let kind = if self.variant.needs_layout_fix() {
            ArtifactKind::Encoded
        } else {
            ArtifactKind::Final
        };
        state.track(&spec.output, kind);
        state.encodes.push(EncodeOutput {
            variant: self.variant,
            job_file,
            encoded: spec.output,
            layout_fixed: None,
            measured_dialnorm: measured,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        let output = state
            .encode_for(self.variant)
            .ok_or_else(|| StepError::bad_output(format!("no {} output recorded", self.variant)))?;
        let size = require_output(&output.encoded)?;
        ctx.logger.info(&format!(
            "Encoded {}: {}",
            self.variant,
            format_size(size)
        ));
        Ok(())
    }
}
