use async_trait::async_trait;

use crate::context::BuildContext;
use crate::error::Result;
use crate::step::{Step, StepAction};

#[derive(Debug, Default)]
pub struct CommitStep;

#[async_trait]
impl Step for CommitStep {
    fn name(&self) -> &'static str {
        "commit"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<StepAction> {
        let id = ctx.container_id()?.to_string();
        let config = ctx.config();

        ctx.ui().say("Committing the container");
        let image_id = ctx
            .driver()
            .commit(&id, &config.author, &config.changes, &config.message)
            .await?;

        ctx.ui().message(format!("Image ID: {}", image_id));
        ctx.set_image_id(image_id);
        Ok(StepAction::Continue)
    }
}
