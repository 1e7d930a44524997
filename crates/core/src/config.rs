use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::template::{self, TemplateData};

/// Directory inside the container where the build's temp dir is mounted.
pub const DEFAULT_CONTAINER_DIR: &str = "/packer-files";

/// Value for podman's `--systemd` switch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SystemdMode {
    #[default]
    True,
    False,
    Always,
}

impl SystemdMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => "true",
            Self::False => "false",
            Self::Always => "always",
        }
    }
}

impl fmt::Display for SystemdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the build talks to the running container.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommunicatorKind {
    /// `podman exec` into the container
    #[default]
    Podman,
    /// No connection; provisioning is skipped
    None,
}

/// How a build ends once provisioning is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeMode {
    Discard,
    Commit,
    Export(PathBuf),
}

impl FinalizeMode {
    /// Select the finalization branch, discard taking precedence over commit
    /// and commit over export.
    pub fn from_config(config: &BuildConfig) -> Result<Self> {
        if config.discard {
            Ok(Self::Discard)
        } else if config.commit {
            Ok(Self::Commit)
        } else if let Some(path) = config.export_target() {
            Ok(Self::Export(path.clone()))
        } else {
            Err(ConfigError::NoFinalization)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discard => "discard",
            Self::Commit => "commit",
            Self::Export(_) => "export",
        }
    }
}

/// Build parameters. Immutable once validated, except for `changes`, which
/// the default-attribute step may extend.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildConfig {
    /// Base image reference
    pub image: String,
    /// Pull the base image before starting the container
    pub pull: bool,

    pub login: bool,
    pub login_server: String,
    pub login_username: String,
    #[serde(skip_serializing)]
    pub login_password: String,

    /// Remove the container without producing an image
    pub discard: bool,
    /// Commit the container to an image
    pub commit: bool,
    /// Export the container filesystem to this tarball
    pub export_path: Option<PathBuf>,

    pub author: String,
    /// Dockerfile-style directives applied on commit (`CMD ...`, `ENV ...`)
    pub changes: Vec<String>,
    pub message: String,

    pub device: Vec<String>,
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub privileged: bool,
    pub systemd: SystemdMode,
    pub tmpfs: Vec<String>,
    /// Host path to container path
    pub volumes: BTreeMap<String, String>,
    /// Trailing `podman run` tokens; may reference `{{ .Image }}`
    pub run_command: Vec<String>,
    pub container_dir: String,

    pub communicator: CommunicatorKind,
}

/// Stand-in for a secret in debug output. Empty stays empty so a missing
/// password is still visible.
pub fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfig")
            .field("image", &self.image)
            .field("pull", &self.pull)
            .field("login", &self.login)
            .field("login_server", &self.login_server)
            .field("login_username", &self.login_username)
            .field("login_password", &redacted(&self.login_password))
            .field("discard", &self.discard)
            .field("commit", &self.commit)
            .field("export_path", &self.export_path)
            .field("author", &self.author)
            .field("changes", &self.changes)
            .field("message", &self.message)
            .field("device", &self.device)
            .field("cap_add", &self.cap_add)
            .field("cap_drop", &self.cap_drop)
            .field("privileged", &self.privileged)
            .field("systemd", &self.systemd)
            .field("tmpfs", &self.tmpfs)
            .field("volumes", &self.volumes)
            .field("run_command", &self.run_command)
            .field("container_dir", &self.container_dir)
            .field("communicator", &self.communicator)
            .finish()
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            image: String::new(),
            pull: true,
            login: false,
            login_server: String::new(),
            login_username: String::new(),
            login_password: String::new(),
            discard: false,
            commit: false,
            export_path: None,
            author: String::new(),
            changes: Vec::new(),
            message: String::new(),
            device: Vec::new(),
            cap_add: Vec::new(),
            cap_drop: Vec::new(),
            privileged: false,
            systemd: SystemdMode::default(),
            tmpfs: Vec::new(),
            volumes: BTreeMap::new(),
            run_command: default_run_command(),
            container_dir: DEFAULT_CONTAINER_DIR.to_string(),
            communicator: CommunicatorKind::default(),
        }
    }
}

fn default_run_command() -> Vec<String> {
    ["-d", "-i", "-t", "--entrypoint=/bin/sh", "--", "{{ .Image }}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl BuildConfig {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Export destination, ignoring an empty path.
    pub fn export_target(&self) -> Option<&PathBuf> {
        self.export_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn finalize_mode(&self) -> Result<FinalizeMode> {
        FinalizeMode::from_config(self)
    }

    pub fn template_data(&self) -> TemplateData {
        TemplateData::new(self.image.clone())
    }

    /// Whether a change directive with the given instruction (e.g. `CMD`)
    /// is already present.
    pub fn has_change(&self, instruction: &str) -> bool {
        self.changes.iter().any(|change| {
            change
                .split_whitespace()
                .next()
                .is_some_and(|word| word.eq_ignore_ascii_case(instruction))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(ConfigError::MissingField("image"));
        }

        let selected: Vec<&str> = [
            ("discard", self.discard),
            ("commit", self.commit),
            ("export_path", self.export_target().is_some()),
        ]
        .iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| *name)
        .collect();

        match selected.len() {
            0 => return Err(ConfigError::NoFinalization),
            1 => {}
            _ => return Err(ConfigError::ConflictingFinalization(selected.join(", "))),
        }

        if self.login && self.login_server.trim().is_empty() {
            return Err(ConfigError::MissingField("login_server"));
        }

        if self.container_dir.trim().is_empty() {
            return Err(ConfigError::MissingField("container_dir"));
        }

        for (host, guest) in &self.volumes {
            if host.is_empty() || guest.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "volume mapping {:?} -> {:?} has an empty side",
                    host, guest
                )));
            }
        }

        template::render_all(&self.run_command, &self.template_data())?;

        Ok(())
    }
}
