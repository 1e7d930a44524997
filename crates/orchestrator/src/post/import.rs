use async_trait::async_trait;
use events::Ui;
use runtime::Driver;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::artifact::{Artifact, Outcome};
use crate::error::{BuildError, Result};
use crate::generated::IMAGE_SHA256;
use crate::post::PostProcessor;

/// Turns an exported tarball into an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportPostProcessor {
    pub repository: String,
    pub changes: Vec<String>,
}

#[async_trait]
impl PostProcessor for ImportPostProcessor {
    fn name(&self) -> &'static str {
        "import"
    }

    async fn process(&self, artifact: Artifact, driver: &dyn Driver, ui: &Ui) -> Result<Artifact> {
        let Outcome::Exported { path } = &artifact.outcome else {
            return Err(BuildError::unsupported(
                self.name(),
                format!("expected an exported file, got {}", artifact),
            ));
        };

        ui.message(format!("Importing image: {}", path.display()));
        let image_id = driver.import(path, &self.changes, &self.repository).await?;
        let digest = driver.sha256(&image_id).await?;
        info!(image_id = %image_id, digest = %digest, "Imported image");
        ui.message(format!("Imported ID: {}", image_id));

        let mut data = artifact.generated_data.clone();
        data.put(IMAGE_SHA256, digest);
        Ok(Artifact::new(Outcome::Committed { image_id }, data))
    }
}
