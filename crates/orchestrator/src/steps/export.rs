use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::step::{Step, StepAction};

/// Streams the container filesystem to the configured tarball.
#[derive(Debug, Default)]
pub struct ExportStep {
    /// Set while the file may be incomplete
    partial: Option<PathBuf>,
}

#[async_trait]
impl Step for ExportStep {
    fn name(&self) -> &'static str {
        "export"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<StepAction> {
        let id = ctx.container_id()?.to_string();
        let path = ctx
            .config()
            .export_target()
            .cloned()
            .ok_or(BuildError::MissingState("export_path"))?;

        ctx.ui().say(format!(
            "Exporting the container as a tar file to {}",
            path.display()
        ));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&path).await?;
        self.partial = Some(path.clone());

        ctx.driver().export(&id, &mut file).await?;
        file.sync_all().await?;

        self.partial = None;
        info!(container_id = %id, path = %path.display(), "Container exported");
        ctx.set_export_path(path);
        Ok(StepAction::Continue)
    }

    async fn cleanup(&mut self, _ctx: &mut BuildContext) -> Result<()> {
        if let Some(path) = self.partial.take() {
            warn!(path = %path.display(), "Removing incomplete export");
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }
}
