//! Decode steps: everything that turns the input into an encoder source.
//!
//! TrueHD input is decoded by truehdd, either to an Atmos mezzanine or to
//! PCM for the plain DDP fallback. Existing mezzanines are copied in and
//! ADM waves converted, so every Atmos path ends with the same
//! `<id>.atmos` triplet in the workspace.

use super::{format_size, require_output, tool_path};
use crate::atmos::{conform_bed_layout, relink_siblings, MezzanineSet};
use crate::models::Stage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, DecodeOutput, RunPhase, RunState, StepOutcome};
use crate::process::ToolCommand;
use crate::progress::parser_for;
use crate::tools::Tool;
use crate::workspace::ArtifactKind;

fn require_input(ctx: &Context) -> StepResult<()> {
    if !ctx.config.input.is_file() {
        return Err(StepError::missing_file(&ctx.config.input));
    }
    Ok(())
}

fn track_mezzanine(state: &mut RunState, set: &MezzanineSet) {
    for file in set.files() {
        state.track(file, ArtifactKind::Mezzanine);
    }
}

/// Make the master name its own siblings after a copy or rename.
fn relink_master(ctx: &Context, set: &MezzanineSet) -> StepResult<()> {
    let relinked =
        relink_siblings(&set.atmos).map_err(|e| StepError::Metadata(e.to_string()))?;
    if relinked {
        ctx.logger.debug(&format!(
            "Pointed {} at {} and {}",
            set.atmos.display(),
            set.audio.display(),
            set.metadata.display()
        ));
    }
    Ok(())
}

fn validate_mezzanine(state: &RunState) -> StepResult<()> {
    let set = state
        .mezzanine()
        .ok_or_else(|| StepError::bad_output("no Atmos mezzanine recorded"))?;
    if let Some(missing) = set.missing().first() {
        return Err(StepError::missing_file(missing));
    }
    Ok(())
}

/// Decodes a TrueHD stream with truehdd.
pub struct DecodeStep;

impl DecodeStep {
    pub fn new() -> Self {
        Self
    }

    fn build_command(&self, ctx: &Context) -> StepResult<ToolCommand> {
        let config = &ctx.config;
        let truehdd = tool_path(ctx, Tool::Truehdd)?;

        let mut cmd = ToolCommand::new(Tool::Truehdd.label(), truehdd)
            .args(["decode", "--loglevel", "off", "--progress"])
            .arg(&config.input)
            .arg("--output-path")
            .arg(ctx.work_path(&config.run_id))
            .current_dir(&ctx.work_dir);

        if config.decodes_to_mezzanine() {
            if config.bed_conform {
                cmd = cmd.arg("--bed-conform");
            }
            cmd = cmd.args(["--warp-mode", config.warp_mode.as_str()]);
        } else {
            cmd = cmd.args(["--format", "w64"]);
        }

        Ok(cmd.opt_arg("--presentation", config.presentation.map(|p| p.to_string())))
    }

    /// Find the decoded triplet and name it after the run id.
    fn collect_mezzanine(&self, ctx: &Context) -> StepResult<MezzanineSet> {
        let expected = MezzanineSet::in_dir(&ctx.work_dir, &ctx.config.run_id);
        if expected.is_complete() {
            return Ok(expected);
        }

        let found = MezzanineSet::find_in(&ctx.work_dir)
            .map_err(|e| StepError::io("scanning decoder output", e))?
            .ok_or_else(|| StepError::bad_output("truehdd produced no .atmos file"))?;
        ctx.logger.debug(&format!(
            "Renaming {} to {}",
            found.atmos.display(),
            expected.atmos.display()
        ));
        found
            .rename_to(&ctx.work_dir, &ctx.config.run_id)
            .map_err(|e| StepError::io("renaming Atmos files", e))
    }
}

impl Default for DecodeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for DecodeStep {
    fn name(&self) -> &str {
        "Decode"
    }

    fn stage(&self) -> Stage {
        Stage::Decode
    }

    fn phase(&self) -> RunPhase {
        RunPhase::Decoding
    }

    fn description(&self) -> &str {
        "Decode TrueHD stream"
    }

    fn validate_input(&self, ctx: &Context, _state: &RunState) -> StepResult<()> {
        require_input(ctx)?;
        tool_path(ctx, Tool::Truehdd).map(|_| ())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let config = &ctx.config;
        let cmd = self.build_command(ctx)?;

        if let Some(presentation) = config.presentation {
            ctx.logger
                .info(&format!("Decoding presentation {}", presentation));
        }
        ctx.run_tool(&cmd, "Decoding", parser_for(Tool::Truehdd))?;

        if !config.decodes_to_mezzanine() {
            let pcm = ctx.work_path(format!("{}.w64", config.run_id));
            state.track(&pcm, ArtifactKind::Pcm);
            state.decode = Some(DecodeOutput {
                pcm: Some(pcm),
                ..Default::default()
            });
            return Ok(StepOutcome::Success);
        }

        let set = self.collect_mezzanine(ctx)?;
        track_mezzanine(state, &set);
        relink_master(ctx, &set)?;

        let conformed = conform_bed_layout(&set.atmos, config.warp_mode)
            .map_err(|e| StepError::Metadata(e.to_string()))?;
        if conformed {
            ctx.logger.success("Bed layout conformed to LFE-only bed");
        } else {
            ctx.logger.info("No changes were made to the Atmos file");
        }

        state.decode = Some(DecodeOutput {
            mezzanine: Some(set),
            pcm: None,
            conformed,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        if ctx.config.decodes_to_mezzanine() {
            return validate_mezzanine(state);
        }
        let pcm = state
            .decode
            .as_ref()
            .and_then(|d| d.pcm.as_deref())
            .ok_or_else(|| StepError::bad_output("no PCM recorded"))?;
        let size = require_output(pcm)?;
        ctx.logger
            .info(&format!("Decoded PCM: {}", format_size(size)));
        Ok(())
    }
}

/// Copies an existing `.atmos` triplet into the workspace.
pub struct ImportStep;

impl ImportStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImportStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ImportStep {
    fn name(&self) -> &str {
        "Import"
    }

    fn stage(&self) -> Stage {
        Stage::Decode
    }

    fn phase(&self) -> RunPhase {
        RunPhase::Decoding
    }

    fn description(&self) -> &str {
        "Import Atmos mezzanine"
    }

    fn validate_input(&self, ctx: &Context, _state: &RunState) -> StepResult<()> {
        let source = MezzanineSet::from_atmos(&ctx.config.input);
        match source.missing().first() {
            Some(missing) => Err(StepError::missing_file(missing)),
            None => Ok(()),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let source = MezzanineSet::from_atmos(&ctx.config.input);
        let set = source
            .copy_to(&ctx.work_dir, &ctx.config.run_id)
            .map_err(|e| StepError::io("copying Atmos mezzanine", e))?;
        track_mezzanine(state, &set);
        relink_master(ctx, &set)?;
        ctx.logger
            .info(&format!("Imported {}", ctx.config.input.display()));

        state.decode = Some(DecodeOutput {
            mezzanine: Some(set),
            ..Default::default()
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        validate_mezzanine(state)
    }
}

/// Converts an ADM BWF file to an Atmos mezzanine.
pub struct AdmConvertStep;

impl AdmConvertStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AdmConvertStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for AdmConvertStep {
    fn name(&self) -> &str {
        "Convert"
    }

    fn stage(&self) -> Stage {
        Stage::Decode
    }

    fn phase(&self) -> RunPhase {
        RunPhase::Decoding
    }

    fn description(&self) -> &str {
        "Convert ADM BWF to Atmos mezzanine"
    }

    fn validate_input(&self, ctx: &Context, _state: &RunState) -> StepResult<()> {
        require_input(ctx)?;
        tool_path(ctx, Tool::AdmConverter).map(|_| ())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let converter = tool_path(ctx, Tool::AdmConverter)?;
        let set = MezzanineSet::in_dir(&ctx.work_dir, &ctx.config.run_id);

        let cmd = ToolCommand::new(Tool::AdmConverter.label(), converter)
            .arg("-i")
            .arg(&ctx.config.input)
            .arg("-o")
            .arg(&set.atmos)
            .args(["-f", "atmos"])
            .current_dir(&ctx.work_dir);
        ctx.run_tool(&cmd, "Converting", parser_for(Tool::AdmConverter))?;

        track_mezzanine(state, &set);
        state.decode = Some(DecodeOutput {
            mezzanine: Some(set),
            ..Default::default()
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        validate_mezzanine(state)
    }
}
