//! The unit of work in a build pipeline.

use async_trait::async_trait;

use crate::context::BuildContext;
use crate::error::Result;

/// Outcome of a step that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Continue,
    /// Stop the pipeline without an error of this step's own
    Halt,
}

/// A pipeline stage with a forward action and a best-effort teardown.
///
/// `run` returning `Err` records the error on the context and halts the
/// pipeline. `cleanup` is called exactly once for every step whose `run` was
/// called, in reverse order, after the pipeline stops for any reason. A
/// cleanup error is logged and does not stop the remaining cleanups.
#[async_trait]
pub trait Step: Send {
    fn name(&self) -> &'static str;

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<StepAction>;

    async fn cleanup(&mut self, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }
}
