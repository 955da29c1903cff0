//! Sequential step runner and the cancel flag shared with running tools.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::{PipelineError, PipelineResult, StepError};
use super::step::PipelineStep;
use super::types::{Context, RunState, StepOutcome};

/// Ordered steps of one encode run.
///
/// The first failing step ends the run and leaves `state` in `Failed`.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
    cancel: CancelHandle,
}

/// Which steps ran and which decided they had nothing to do.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub completed: Vec<String>,
    /// Step name and reason.
    pub skipped: Vec<(String, String)>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_cancel_handle(CancelHandle::new())
    }

    /// Pipeline stopped by `cancel`, usually the one the signal handler holds.
    pub fn with_cancel_handle(cancel: CancelHandle) -> Self {
        Self {
            steps: Vec::new(),
            cancel,
        }
    }

    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn then<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<RunSummary> {
        let mut summary = RunSummary::default();

        for step in &self.steps {
            if self.cancel.is_cancelled() {
                ctx.logger
                    .warn(&format!("Interrupted before {}", step.name()));
                state.fail();
                return Err(PipelineError::cancelled(&ctx.job_name));
            }

            match self.run_step(step.as_ref(), ctx, state) {
                Ok(StepOutcome::Success) => {
                    ctx.logger.success(step.description());
                    summary.completed.push(step.name().to_string());
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    ctx.logger.info(&format!("Skipped: {}", reason));
                    summary.skipped.push((step.name().to_string(), reason));
                }
                Err(StepError::Cancelled) => {
                    ctx.logger
                        .warn(&format!("Interrupted during {}", step.name()));
                    state.fail();
                    return Err(PipelineError::cancelled(&ctx.job_name));
                }
                Err(e) => {
                    ctx.logger
                        .error(&format!("{} failed: {}", step.name(), e));
                    state.fail();
                    return Err(PipelineError::stage_failed(&ctx.job_name, step.stage(), e));
                }
            }
        }

        Ok(summary)
    }

    fn run_step(
        &self,
        step: &dyn PipelineStep,
        ctx: &Context,
        state: &mut RunState,
    ) -> Result<StepOutcome, StepError> {
        state.advance(step.phase())?;
        ctx.logger.phase(step.description());

        step.validate_input(ctx, state)?;
        let outcome = step.execute(ctx, state)?;
        if outcome == StepOutcome::Success {
            step.validate_output(ctx, state)?;
        }
        Ok(outcome)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable interrupt flag. Checked between steps and polled while an
/// external tool runs, which is then killed.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CancelHandle({})", self.is_cancelled())
    }
}
