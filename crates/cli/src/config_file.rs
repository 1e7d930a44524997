//! The TOML file `podbake build` and `podbake validate` read.

use anyhow::{Context, Result};
use orchestrator::post::{
    ImportPostProcessor, PostProcessor, PushPostProcessor, SavePostProcessor, TagPostProcessor,
};
use orchestrator::ShellProvisioner;
use podbake_core::BuildConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub build: BuildConfig,
    #[serde(default)]
    pub provision: ShellProvisioner,
    #[serde(default)]
    pub post: PostConfig,
    /// Runtime executable; `podman` on `PATH` when unset
    #[serde(default)]
    pub runtime_binary: Option<PathBuf>,
}

/// Post-processors, applied in the order import, tag, push, save.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostConfig {
    pub import: Option<ImportPostProcessor>,
    pub tag: Option<TagPostProcessor>,
    pub push: Option<PushPostProcessor>,
    pub save: Option<SavePostProcessor>,
}

impl PostConfig {
    pub fn processors(&self) -> Vec<Box<dyn PostProcessor>> {
        let mut processors: Vec<Box<dyn PostProcessor>> = Vec::new();
        if let Some(import) = &self.import {
            processors.push(Box::new(import.clone()));
        }
        if let Some(tag) = &self.tag {
            processors.push(Box::new(tag.clone()));
        }
        if let Some(push) = &self.push {
            processors.push(Box::new(push.clone()));
        }
        if let Some(save) = &self.save {
            processors.push(Box::new(save.clone()));
        }
        processors
    }
}

impl FileConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid config file")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to load {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podbake_core::{FinalizeMode, SystemdMode};

    #[test]
    fn test_parse_full_file() {
        let config = FileConfig::parse(
            r#"
            [build]
            image = "docker.io/library/alpine:3.19"
            commit = true
            changes = ["CMD /run.sh"]
            systemd = "always"
            cap_add = ["SYS_ADMIN"]

            [build.volumes]
            "/srv/cache" = "/cache"

            [provision]
            provision = ["apk add --no-cache curl"]
            post_finalize = ["rm -rf /var/cache/apk/*"]

            [post.tag]
            repository = "localhost/alpine-curl"
            tags = ["1.0", "latest"]
            "#,
        )
        .unwrap();

        assert_eq!(config.build.finalize_mode().unwrap(), FinalizeMode::Commit);
        assert_eq!(config.build.systemd, SystemdMode::Always);
        assert!(config.build.pull);
        assert_eq!(config.build.volumes["/srv/cache"], "/cache");
        assert_eq!(config.provision.provision, vec!["apk add --no-cache curl"]);
        assert_eq!(config.post.tag.as_ref().unwrap().tags, vec!["1.0", "latest"]);

        let names: Vec<_> = config.post.processors().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["tag"]);
    }

    #[test]
    fn test_export_with_minimal_file() {
        let config = FileConfig::parse(
            r#"
            [build]
            image = "base:1.0"
            pull = false
            export_path = "/tmp/out.tar"
            "#,
        )
        .unwrap();
        assert!(!config.build.pull);
        assert!(config.provision.provision.is_empty());
        assert!(config.post.processors().is_empty());
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(FileConfig::parse("[build]\nimage = \"a\"\n[bogus]\n").is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/podbake.toml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
