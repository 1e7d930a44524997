use async_trait::async_trait;
use events::Ui;
use runtime::Driver;
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::error::{BuildError, Result};
use crate::post::PostProcessor;

/// Tags a committed image as `repository:tag` for each tag, or as
/// `repository` when no tags are given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagPostProcessor {
    pub repository: String,
    pub tags: Vec<String>,
    pub force: bool,
}

impl TagPostProcessor {
    pub fn targets(&self) -> Vec<String> {
        if self.tags.is_empty() {
            return vec![self.repository.clone()];
        }
        self.tags
            .iter()
            .map(|tag| format!("{}:{}", self.repository, tag))
            .collect()
    }
}

#[async_trait]
impl PostProcessor for TagPostProcessor {
    fn name(&self) -> &'static str {
        "tag"
    }

    async fn process(&self, artifact: Artifact, driver: &dyn Driver, ui: &Ui) -> Result<Artifact> {
        let image_id = artifact
            .image_id()
            .ok_or_else(|| BuildError::unsupported(self.name(), "no image to tag"))?;

        for target in self.targets() {
            ui.message(format!("Tagging image: {}", image_id));
            ui.message(format!("Repository: {}", target));
            driver.tag_image(image_id, &target, self.force).await?;
        }
        Ok(artifact)
    }
}
