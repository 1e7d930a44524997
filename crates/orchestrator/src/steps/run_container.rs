use async_trait::async_trait;
use runtime::ContainerSpec;
use tracing::info;

use crate::context::BuildContext;
use crate::error::Result;
use crate::step::{Step, StepAction};

/// Starts the build container. Its cleanup kills and removes it.
#[derive(Debug, Default)]
pub struct RunContainerStep {
    container_id: Option<String>,
}

#[async_trait]
impl Step for RunContainerStep {
    fn name(&self) -> &'static str {
        "run_container"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<StepAction> {
        let config = ctx.config();
        let mut spec = ContainerSpec::from_config(config);
        if let Some(dir) = ctx.temp_dir() {
            spec = spec.with_volume(dir.display().to_string(), config.container_dir.clone());
        }

        ctx.ui().say("Starting podman container...");
        let id = ctx.driver().start_container(&spec).await?;
        ctx.ui().message(format!("Container ID: {}", id));
        info!(container_id = %id, "Container started");

        self.container_id = Some(id.clone());
        ctx.set_container_id(id);
        Ok(StepAction::Continue)
    }

    async fn cleanup(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let Some(id) = self.container_id.take() else {
            return Ok(());
        };

        ctx.ui().say(format!("Killing the container: {}", id));
        ctx.driver().kill_container(&id).await?;
        Ok(())
    }
}
