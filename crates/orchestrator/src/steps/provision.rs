use async_trait::async_trait;

use crate::context::BuildContext;
use crate::error::Result;
use crate::hooks::HookEvent;
use crate::step::{Step, StepAction};

/// Fires the provisioning hook for one event.
#[derive(Debug)]
pub struct ProvisionStep {
    event: HookEvent,
}

impl ProvisionStep {
    pub fn new(event: HookEvent) -> Self {
        Self { event }
    }
}

#[async_trait]
impl Step for ProvisionStep {
    fn name(&self) -> &'static str {
        match self.event {
            HookEvent::Provision => "provision",
            HookEvent::PostFinalize => "provision_post_finalize",
        }
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<StepAction> {
        ctx.ui().say(format!("Running {} hook", self.event));
        let communicator = ctx.communicator();
        ctx.hook()
            .run(
                self.event,
                ctx.ui(),
                communicator.as_deref(),
                ctx.generated(),
            )
            .await?;
        Ok(StepAction::Continue)
    }
}
