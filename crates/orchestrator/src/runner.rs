//! Sequential step execution with reverse-order unwind.

use events::Event;
use tracing::{debug, error, info, warn};

use crate::context::BuildContext;
use crate::error::BuildError;
use crate::step::{Step, StepAction};

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Stopped at the named step, or before it when cancelled
    Halted { step: &'static str },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Runs steps strictly in order against one [`BuildContext`].
pub struct StepRunner {
    steps: Vec<Box<dyn Step>>,
}

impl StepRunner {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step until one fails or halts, then clean up every started
    /// step, most recent first. Errors are left on the context.
    pub async fn run(&mut self, ctx: &mut BuildContext) -> RunOutcome {
        let mut started = 0;
        let mut outcome = RunOutcome::Completed;

        for step in self.steps.iter_mut() {
            let name = step.name();

            if ctx.is_cancelled() {
                info!(step = name, "Build cancelled before step");
                ctx.record_error(BuildError::Cancelled);
                outcome = RunOutcome::Halted { step: name };
                break;
            }

            debug!(step = name, "Running step");
            ctx.ui().emit(Event::StepStarted {
                step: name.to_string(),
            });
            started += 1;

            let halted = match step.run(ctx).await {
                Ok(StepAction::Continue) => false,
                Ok(StepAction::Halt) => {
                    if !ctx.has_error() {
                        ctx.record_error(BuildError::Halted(name.to_string()));
                    }
                    true
                }
                Err(e) => {
                    let e = BuildError::in_step(name, e);
                    error!(step = name, error = %e, "Step failed");
                    ctx.ui().error(e.to_string());
                    ctx.record_error(e);
                    true
                }
            };

            ctx.ui().emit(Event::StepFinished {
                step: name.to_string(),
                halted,
            });

            if halted {
                outcome = RunOutcome::Halted { step: name };
                break;
            }
        }

        for step in self.steps[..started].iter_mut().rev() {
            let name = step.name();
            debug!(step = name, "Cleaning up step");
            if let Err(e) = step.cleanup(ctx).await {
                warn!(step = name, error = %e, "Cleanup failed");
                ctx.ui().emit(Event::CleanupFailed {
                    step: name.to_string(),
                    error: e.to_string(),
                });
            }
        }

        outcome
    }
}
