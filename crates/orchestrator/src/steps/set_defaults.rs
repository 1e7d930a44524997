use async_trait::async_trait;
use tracing::debug;

use crate::context::BuildContext;
use crate::error::Result;
use crate::step::{Step, StepAction};

/// Carries the base image's `CMD` and `ENTRYPOINT` into the commit unless
/// the configured changes already set them.
#[derive(Debug, Default)]
pub struct SetDefaultsStep;

#[async_trait]
impl Step for SetDefaultsStep {
    fn name(&self) -> &'static str {
        "set_defaults"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<StepAction> {
        let driver = ctx.driver();
        let image = ctx.config().image.clone();

        for instruction in ["CMD", "ENTRYPOINT"] {
            if ctx.config().has_change(instruction) {
                debug!(instruction, "Configured change wins over image default");
                continue;
            }

            let value = match instruction {
                "CMD" => driver.cmd(&image).await?,
                _ => driver.entrypoint(&image).await?,
            };
            if value.is_empty() {
                continue;
            }

            let change = format!("{} {}", instruction, serde_json::to_string(&value)?);
            debug!(change = %change, "Adding image default");
            ctx.push_change(change);
        }

        Ok(StepAction::Continue)
    }
}
