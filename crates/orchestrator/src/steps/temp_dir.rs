use async_trait::async_trait;
use tempfile::TempDir;
use tracing::debug;

use crate::context::BuildContext;
use crate::error::Result;
use crate::step::{Step, StepAction};

/// Creates the host directory shared with the container.
#[derive(Debug, Default)]
pub struct TempDirStep {
    dir: Option<TempDir>,
}

#[async_trait]
impl Step for TempDirStep {
    fn name(&self) -> &'static str {
        "temp_dir"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<StepAction> {
        ctx.ui().say("Creating a temporary directory for sharing data...");

        let dir = tempfile::Builder::new().prefix("podbake-").tempdir()?;
        debug!(path = %dir.path().display(), "Created temp dir");

        ctx.set_temp_dir(dir.path().to_path_buf());
        self.dir = Some(dir);
        Ok(StepAction::Continue)
    }

    async fn cleanup(&mut self, _ctx: &mut BuildContext) -> Result<()> {
        if let Some(dir) = self.dir.take() {
            debug!(path = %dir.path().display(), "Removing temp dir");
            dir.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BuildEnv;
    use events::Ui;
    use podbake_core::BuildConfig;
    use runtime::FakeDriver;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_dir_lives_until_cleanup() {
        let env = BuildEnv::new(Arc::new(FakeDriver::new()), Ui::default());
        let mut ctx = BuildContext::new(BuildConfig::new("base:1.0"), env);
        let mut step = TempDirStep::default();

        step.run(&mut ctx).await.unwrap();
        let path = ctx.temp_dir().unwrap().to_path_buf();
        assert!(path.is_dir());

        step.cleanup(&mut ctx).await.unwrap();
        assert!(!path.exists());
    }
}
