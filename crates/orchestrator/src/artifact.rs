//! What a successful build produced.

use runtime::Driver;
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::info;

use crate::error::Result;
use crate::generated::GeneratedData;

pub const BUILDER_ID: &str = "podman.builder";

/// State key under which [`Artifact::state`] exposes the generated data.
pub const GENERATED_DATA_STATE: &str = "generated_data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The container was removed; nothing was kept
    Discarded { container_id: String },
    Committed { image_id: String },
    Exported { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub builder_id: &'static str,
    pub outcome: Outcome,
    pub generated_data: GeneratedData,
}

impl Artifact {
    pub fn new(outcome: Outcome, generated_data: GeneratedData) -> Self {
        Self {
            builder_id: BUILDER_ID,
            outcome,
            generated_data,
        }
    }

    pub fn id(&self) -> String {
        match &self.outcome {
            Outcome::Discarded { container_id } => container_id.clone(),
            Outcome::Committed { image_id } => image_id.clone(),
            Outcome::Exported { path } => path.display().to_string(),
        }
    }

    /// Files on the host that belong to this artifact
    pub fn files(&self) -> Vec<PathBuf> {
        match &self.outcome {
            Outcome::Exported { path } => vec![path.clone()],
            _ => Vec::new(),
        }
    }

    pub fn image_id(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Committed { image_id } => Some(image_id),
            _ => None,
        }
    }

    pub fn generated_data(&self) -> &GeneratedData {
        &self.generated_data
    }

    /// Named state for downstream consumers. Only the generated data is
    /// published.
    pub fn state(&self, key: &str) -> Option<serde_json::Value> {
        match key {
            GENERATED_DATA_STATE => serde_json::to_value(&self.generated_data).ok(),
            _ => None,
        }
    }

    /// Remove what the build left behind.
    pub async fn destroy(&self, driver: &dyn Driver) -> Result<()> {
        match &self.outcome {
            Outcome::Discarded { .. } => Ok(()),
            Outcome::Committed { image_id } => {
                info!(image_id = %image_id, "Deleting image");
                driver.delete_image(image_id).await?;
                Ok(())
            }
            Outcome::Exported { path } => {
                info!(path = %path.display(), "Removing exported file");
                match tokio::fs::remove_file(path).await {
                    Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
                    _ => Ok(()),
                }
            }
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Discarded { container_id } => {
                write!(f, "Discarded container: {}", container_id)
            }
            Outcome::Committed { image_id } => write!(f, "Committed image: {}", image_id),
            Outcome::Exported { path } => write!(f, "Exported file: {}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generated::IMAGE_SHA256;
    use runtime::FakeDriver;

    fn committed() -> Artifact {
        let mut data = GeneratedData::new();
        data.put(IMAGE_SHA256, "sha256:abc");
        Artifact::new(
            Outcome::Committed {
                image_id: "sha256:abc".to_string(),
            },
            data,
        )
    }

    #[test]
    fn test_committed_surface() {
        let artifact = committed();
        assert_eq!(artifact.builder_id, BUILDER_ID);
        assert_eq!(artifact.id(), "sha256:abc");
        assert_eq!(artifact.image_id(), Some("sha256:abc"));
        assert!(artifact.files().is_empty());
        assert_eq!(
            artifact.state(GENERATED_DATA_STATE),
            Some(serde_json::json!({ "ImageSha256": "sha256:abc" }))
        );
        assert_eq!(artifact.state("unknown"), None);
        assert_eq!(artifact.to_string(), "Committed image: sha256:abc");
    }

    #[test]
    fn test_exported_has_no_image() {
        let artifact = Artifact::new(
            Outcome::Exported {
                path: PathBuf::from("/tmp/out.tar"),
            },
            GeneratedData::new(),
        );
        assert_eq!(artifact.image_id(), None);
        assert_eq!(artifact.files(), vec![PathBuf::from("/tmp/out.tar")]);
    }

    #[tokio::test]
    async fn test_destroy_committed_deletes_image() {
        let driver = FakeDriver::new();
        committed().destroy(&driver).await.unwrap();
        assert_eq!(driver.ops(), vec!["delete_image"]);
    }

    #[tokio::test]
    async fn test_destroy_exported_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tar");
        std::fs::write(&path, b"tar").unwrap();

        let artifact = Artifact::new(Outcome::Exported { path: path.clone() }, GeneratedData::new());
        artifact.destroy(&FakeDriver::new()).await.unwrap();
        assert!(!path.exists());
    }
}
