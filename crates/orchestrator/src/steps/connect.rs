use async_trait::async_trait;
use podbake_core::CommunicatorKind;
use tracing::info;

use crate::communicator::ConnectTarget;
use crate::context::BuildContext;
use crate::error::Result;
use crate::step::{Step, StepAction};

/// Looks up the container address and opens a communicator to it.
#[derive(Debug, Default)]
pub struct ConnectStep;

#[async_trait]
impl Step for ConnectStep {
    fn name(&self) -> &'static str {
        "connect"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<StepAction> {
        if ctx.config().communicator == CommunicatorKind::None {
            info!("Communicator disabled, not connecting");
            return Ok(StepAction::Continue);
        }

        let id = ctx.container_id()?.to_string();
        let ip = ctx.driver().ip_address(&id).await?;
        ctx.set_container_ip(ip.clone());
        ctx.check_cancelled()?;

        ctx.ui().say("Using podman communicator to connect");
        let connection = {
            let target = ConnectTarget {
                container_id: &id,
                ip_address: &ip,
                temp_dir: ctx.temp_dir(),
                container_dir: &ctx.config().container_dir,
            };
            ctx.connector().connect(&target).await?
        };

        ctx.set_communicator(connection.communicator);
        ctx.add_temp_keys(connection.temp_keys);
        Ok(StepAction::Continue)
    }

    async fn cleanup(&mut self, ctx: &mut BuildContext) -> Result<()> {
        ctx.clear_communicator();
        Ok(())
    }
}
