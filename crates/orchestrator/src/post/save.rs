use async_trait::async_trait;
use events::Ui;
use runtime::Driver;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::artifact::Artifact;
use crate::error::{BuildError, Result};
use crate::post::PostProcessor;

/// Writes a committed image archive to a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePostProcessor {
    pub path: PathBuf,
}

#[async_trait]
impl PostProcessor for SavePostProcessor {
    fn name(&self) -> &'static str {
        "save"
    }

    async fn process(&self, artifact: Artifact, driver: &dyn Driver, ui: &Ui) -> Result<Artifact> {
        let image_id = artifact
            .image_id()
            .ok_or_else(|| BuildError::unsupported(self.name(), "no image to save"))?;

        ui.message(format!("Saving image {} to {}", image_id, self.path.display()));
        let mut file = tokio::fs::File::create(&self.path).await?;
        if let Err(e) = driver.save_image(image_id, &mut file).await {
            drop(file);
            let _ = tokio::fs::remove_file(&self.path).await;
            return Err(e.into());
        }
        file.sync_all().await?;

        info!(image_id = %image_id, path = %self.path.display(), "Image saved");
        Ok(artifact)
    }
}
