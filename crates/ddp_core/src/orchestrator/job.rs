//! One end-to-end encode run.
//!
//! Everything that can fail without side effects (option validation, tool
//! discovery, inspection, resolution) happens before the output folder,
//! log file or workspace exist. Once the workspace exists it is removed on
//! every exit path.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use super::errors::{PipelineError, PipelineResult};
use super::pipeline::CancelHandle;
use super::types::{Context, RunPhase, RunState};
use super::create_pipeline;
use crate::config::Settings;
use crate::inspect::inspect_input;
use crate::logging::{ConsoleCallback, JobLogger};
use crate::models::{EncodeOptions, OutputVariant, RunConfig};
use crate::progress::{NullProgress, ProgressSink};
use crate::resolve::{classify_input, resolve, validate_options};
use crate::tools::{
    check_dee_version, detect_dee_version, required_tools, BinaryLocator, Tool, ToolPaths,
};
use crate::workspace::{move_artifact, Workspace};

/// Console callback shared across the runs of a batch.
pub type SharedConsole = Arc<dyn Fn(&str) + Send + Sync>;

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_name: String,
    pub input: PathBuf,
    pub run_id: String,
    pub dialogue_level: i32,
    pub outputs: Vec<OutputReport>,
    pub phases: Vec<RunPhase>,
    pub log_file: PathBuf,
}

/// One published output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputReport {
    pub variant: OutputVariant,
    pub path: PathBuf,
    pub measured_dialnorm: Option<i32>,
}

/// Encode run for one input.
pub struct EncodeJob {
    options: EncodeOptions,
    settings: Settings,
    cancel: CancelHandle,
    progress: Arc<dyn ProgressSink>,
    console: Option<SharedConsole>,
}

impl EncodeJob {
    pub fn new(options: EncodeOptions, settings: Settings) -> Self {
        Self {
            options,
            settings,
            cancel: CancelHandle::new(),
            progress: Arc::new(NullProgress),
            console: None,
        }
    }

    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Mirror run log messages to a console.
    pub fn with_console(mut self, console: SharedConsole) -> Self {
        self.console = Some(console);
        self
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Run the encode.
    pub fn run(&self) -> PipelineResult<JobReport> {
        let job_name = self.options.base_name();

        validate_options(&self.options)?;
        let kind = classify_input(&self.options.input)?;
        tracing::info!("Input: {} ({})", self.options.input.display(), kind);

        let locator = BinaryLocator::from_settings(&self.settings.tools);
        let mut tools =
            locator.locate_all(&required_tools(kind, &self.options.requested_variants()))?;
        self.check_dee(&tools);

        if self.cancel.is_cancelled() {
            return Err(PipelineError::cancelled(&job_name));
        }

        let stream = inspect_input(kind, &self.options.input, &tools)?;
        let config = resolve(&self.options, &stream, kind)?;
        if config.resample_from.is_some() {
            tools.insert(Tool::Resampler, locator.locate(Tool::Resampler)?);
        }

        fs::create_dir_all(&config.output_dir).map_err(|e| {
            PipelineError::setup_failed(
                &job_name,
                format!("cannot create {}: {}", config.output_dir.display(), e),
            )
        })?;

        let logger = JobLogger::new(
            &job_name,
            &self.settings.paths.logs_folder,
            self.settings.logging.log_config(),
            self.console_callback(),
        )
        .map_err(|e| PipelineError::setup_failed(&job_name, format!("cannot open log: {}", e)))?;
        let logger = Arc::new(logger);

        let workspace = match Workspace::create(&config.output_dir, &config.run_id) {
            Ok(ws) => ws,
            Err(e) => {
                logger.error(&format!("Cannot create workspace: {}", e));
                return Err(PipelineError::setup_failed(
                    &job_name,
                    format!("cannot create workspace: {}", e),
                ));
            }
        };

        log_run_summary(&logger, &config);

        let ctx = Context::new(
            config.clone(),
            tools,
            workspace.path().to_path_buf(),
            Arc::clone(&logger),
            self.cancel.clone(),
        )
        .with_progress_sink(Arc::clone(&self.progress))
        .with_pretty_commands(self.settings.logging.show_commands_pretty);

        let mut state = RunState::new(&config.run_id);
        let result = self.execute(&ctx, &mut state);

        if let Err(e) = workspace.cleanup(&state.artifacts) {
            logger.warn(&format!(
                "Failed to remove workspace {}: {}",
                workspace.path().display(),
                e
            ));
        }

        match result {
            Ok(outputs) => {
                let _ = state.advance(RunPhase::Done);
                logger.success(&format!("{} finished", job_name));
                let report = JobReport {
                    job_name,
                    input: config.input.clone(),
                    run_id: config.run_id.clone(),
                    dialogue_level: config.dialogue_level,
                    outputs,
                    phases: state.history.clone(),
                    log_file: logger.log_path().to_path_buf(),
                };
                logger.close();
                Ok(report)
            }
            Err(e) => {
                state.fail();
                logger.error(&e.to_string());
                logger.close();
                Err(e)
            }
        }
    }

    /// Run the pipeline and publish the finals.
    fn execute(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<Vec<OutputReport>> {
        let pipeline = create_pipeline(&ctx.config, self.cancel.clone());
        let summary = pipeline.run(ctx, state)?;
        ctx.logger.debug(&format!(
            "{} steps completed, {} skipped",
            summary.completed.len(),
            summary.skipped.len()
        ));

        if self.cancel.is_cancelled() {
            return Err(PipelineError::cancelled(&ctx.job_name));
        }

        state
            .advance(RunPhase::Cleanup)
            .map_err(|e| PipelineError::setup_failed(&ctx.job_name, e.to_string()))?;
        ctx.logger.phase("Publish outputs");
        publish(ctx, state)
    }

    fn check_dee(&self, tools: &ToolPaths) {
        let Some(dee) = tools.get(Tool::Dee) else {
            return;
        };
        let found = detect_dee_version(dee);
        let check = check_dee_version(
            found.as_deref(),
            &self.settings.tools.recommended_dee_version,
        );
        match check.warning() {
            Some(warning) => tracing::warn!("{}", warning),
            None => tracing::info!("DEE version {}", found.unwrap_or_default()),
        }
    }

    fn console_callback(&self) -> Option<ConsoleCallback> {
        self.console.as_ref().map(|console| {
            let console = Arc::clone(console);
            Box::new(move |line: &str| console(line)) as ConsoleCallback
        })
    }
}

/// Move every variant's final file to its output name.
fn publish(ctx: &Context, state: &RunState) -> PipelineResult<Vec<OutputReport>> {
    let mut outputs = Vec::new();
    for &variant in &ctx.config.variants {
        let encode = state.encode_for(variant).ok_or_else(|| {
            PipelineError::validation_failed(&ctx.job_name, format!("{} was not encoded", variant))
        })?;
        let from = encode.final_file().to_path_buf();
        let to = ctx.config.output_path(variant);

        move_artifact(&from, &to).map_err(|source| PipelineError::ArtifactMoveFailed {
            job_name: ctx.job_name.clone(),
            from: from.clone(),
            to: to.clone(),
            source,
        })?;
        ctx.logger.success(&format!("Saved: {}", to.display()));

        outputs.push(OutputReport {
            variant,
            path: to,
            measured_dialnorm: encode.measured_dialnorm,
        });
    }
    Ok(outputs)
}

fn log_run_summary(logger: &JobLogger, config: &RunConfig) {
    logger.section("Run settings");
    logger.info(&format!("Run ID: {}", config.run_id));
    logger.info(&format!("Input: {}", config.input.display()));
    for variant in &config.variants {
        match config.bitrate_for(*variant) {
            Some(rate) => logger.info(&format!("{:<22} → {} kbps", variant.to_string(), rate)),
            None => logger.info(&format!("{:<22} → lossless", variant.to_string())),
        }
    }
    logger.info(&format!("Dialogue level: {} dB", config.dialogue_level));
    logger.info(&format!("Dialogue intelligence: {}", config.dialogue_intelligence));
    logger.info(&format!("DRC profile: {}", config.drc));
    if let Some(presentation) = config.presentation {
        logger.info(&format!("Last presentation: {}", presentation));
    }
    if config.decodes_to_mezzanine() {
        logger.info(&format!("Warp mode: {}", config.warp_mode));
    }
    if let Some(rate) = config.resample_from {
        logger.info(&format!("Source sample rate: {} Hz", rate));
    }
}
