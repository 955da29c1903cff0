//! One unit of work in an encode run: decode, convert, resample, encode or
//! fix the layout.

use super::errors::StepResult;
use super::types::{Context, RunPhase, RunState, StepOutcome};
use crate::models::Stage;

/// A step checks its inputs, runs its tool, then checks what it produced.
///
/// `validate_output` is skipped when `execute` reports
/// [`StepOutcome::Skipped`].
pub trait PipelineStep: Send + Sync {
    fn name(&self) -> &str;

    /// Blamed in the error when this step fails.
    fn stage(&self) -> Stage;

    /// Entered before `validate_input`. Phases only move forward.
    fn phase(&self) -> RunPhase;

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()>;

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome>;

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()>;

    /// Heading written to the run log. Defaults to `name`.
    fn description(&self) -> &str {
        self.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixLayout;

    impl PipelineStep for FixLayout {
        fn name(&self) -> &str {
            "LayoutFix"
        }

        fn stage(&self) -> Stage {
            Stage::LayoutFix
        }

        fn phase(&self) -> RunPhase {
            RunPhase::LayoutFixing
        }

        fn validate_input(&self, _ctx: &Context, _state: &RunState) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut RunState) -> StepResult<StepOutcome> {
            Ok(StepOutcome::Success)
        }

        fn validate_output(&self, _ctx: &Context, _state: &RunState) -> StepResult<()> {
            Ok(())
        }
    }

    #[test]
    fn description_falls_back_to_name() {
        let steps: Vec<Box<dyn PipelineStep>> = vec![Box::new(FixLayout)];

        assert_eq!(steps[0].description(), "LayoutFix");
        assert_eq!(steps[0].stage(), Stage::LayoutFix);
    }
}
