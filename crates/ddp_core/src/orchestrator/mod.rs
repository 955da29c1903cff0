//! Pipeline orchestrator for coordinating encode runs.
//!
//! This module provides the infrastructure for running the multi-step
//! encode pipeline. Each run consists of a sequence of steps that
//! validate, execute, and record their results.
//!
//! # Architecture
//!
//! ```text
//! EncodeJob
//!     ├── validate options, locate tools, inspect, resolve
//!     ├── Pipeline
//!     │     ├── Step: Decode | Import | Convert
//!     │     ├── Step: Resample (PCM at another rate only)
//!     │     ├── Step: Encode (one per variant)
//!     │     └── Step: Layout fix (Atmos 7.1 only)
//!     └── publish finals, clean up the workspace
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ddp_core::config::Settings;
//! use ddp_core::models::EncodeOptions;
//! use ddp_core::orchestrator::EncodeJob;
//!
//! let settings = Settings::default();
//! let options = EncodeOptions::from_settings(&settings.encode, "movie.thd", "ddp_encode");
//! let report = EncodeJob::new(options, settings).run()?;
//! println!("Wrote {:?}", report.outputs);
//! # Ok::<(), ddp_core::orchestrator::PipelineError>(())
//! ```

mod batch;
mod errors;
mod job;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use batch::{collect_inputs, BatchItem, BatchReport, BatchRunner};
pub use errors::{
    PipelineError, PipelineResult, StepError, StepResult, EXIT_CANCELLED, EXIT_FAILURE,
    EXIT_MISSING_BINARY,
};
pub use job::{EncodeJob, JobReport, OutputReport, SharedConsole};
pub use pipeline::{CancelHandle, Pipeline, RunSummary};
pub use step::PipelineStep;
pub use steps::{AdmConvertStep, DecodeStep, EncodeStep, ImportStep, LayoutFixStep, ResampleStep};
pub use types::{
    Context, DecodeOutput, EncodeOutput, ResampleOutput, RunPhase, RunState, StepOutcome,
};

use crate::models::{InputKind, RunConfig};

/// Build the pipeline for a resolved run.
///
/// 1. Decode (TrueHD), Import (mezzanine) or Convert (ADM)
/// 2. Resample, when the PCM path needs 48 kHz
/// 3. Encode, once per variant in order
/// 4. Layout fix, when Atmos 7.1 is produced
pub fn create_pipeline(config: &RunConfig, cancel: CancelHandle) -> Pipeline {
    let mut pipeline = Pipeline::with_cancel_handle(cancel);

    match config.input_kind {
        InputKind::TrueHd => pipeline.add_step(DecodeStep::new()),
        InputKind::AtmosMezzanine => pipeline.add_step(ImportStep::new()),
        InputKind::Adm => pipeline.add_step(AdmConvertStep::new()),
    };

    if config.resample_from.is_some() {
        pipeline.add_step(ResampleStep::new());
    }

    for variant in &config.variants {
        pipeline.add_step(EncodeStep::new(*variant));
    }

    if config.variants.iter().any(|v| v.needs_layout_fix()) {
        pipeline.add_step(LayoutFixStep::new());
    }

    pipeline
}
