use async_trait::async_trait;

use crate::context::BuildContext;
use crate::error::Result;
use crate::generated::IMAGE_SHA256;
use crate::step::{Step, StepAction};

/// Publishes the committed image's digest.
#[derive(Debug, Default)]
pub struct SetGeneratedDataStep;

#[async_trait]
impl Step for SetGeneratedDataStep {
    fn name(&self) -> &'static str {
        "set_generated_data"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<StepAction> {
        let digest = ctx.image_id()?.to_string();
        ctx.generated_mut().put(IMAGE_SHA256, digest);
        Ok(StepAction::Continue)
    }
}
