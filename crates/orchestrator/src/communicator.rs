//! Connecting to the build container and running commands in it.

use async_trait::async_trait;
use events::Ui;
use runtime::{args, Process};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{BuildError, Result};

/// A live channel into the build container.
#[async_trait]
pub trait Communicator: Send + Sync {
    /// Run a shell command, streaming its output to `ui`
    async fn exec(&self, command: &str, ui: &Ui) -> Result<()>;

    /// Copy a host file or directory into the container
    async fn upload(&self, local: &Path, remote: &str) -> Result<()>;
}

/// What a [`Connector`] needs to know about the container.
#[derive(Debug, Clone)]
pub struct ConnectTarget<'a> {
    pub container_id: &'a str,
    pub ip_address: &'a str,
    pub temp_dir: Option<&'a Path>,
    pub container_dir: &'a str,
}

pub struct Connection {
    pub communicator: Arc<dyn Communicator>,
    /// Secret files created to establish the connection; removed once
    /// provisioning is done
    pub temp_keys: Vec<PathBuf>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &ConnectTarget<'_>) -> Result<Connection>;
}

/// Connects through the runtime itself: `exec` for commands and `cp` for
/// uploads. Creates no temporary keys.
#[derive(Debug, Clone)]
pub struct ExecConnector {
    binary: PathBuf,
}

impl ExecConnector {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for ExecConnector {
    fn default() -> Self {
        Self::new(runtime::podman::DEFAULT_BINARY)
    }
}

#[async_trait]
impl Connector for ExecConnector {
    async fn connect(&self, target: &ConnectTarget<'_>) -> Result<Connection> {
        info!(
            container_id = %target.container_id,
            ip = %target.ip_address,
            "Connecting with exec communicator"
        );
        Ok(Connection {
            communicator: Arc::new(ExecCommunicator {
                process: Process::new(self.binary.clone()),
                container_id: target.container_id.to_string(),
            }),
            temp_keys: Vec::new(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExecCommunicator {
    process: Process,
    container_id: String,
}

impl ExecCommunicator {
    pub fn container_id(&self) -> &str {
        &self.container_id
    }
}

#[async_trait]
impl Communicator for ExecCommunicator {
    async fn exec(&self, command: &str, ui: &Ui) -> Result<()> {
        debug!(container_id = %self.container_id, command = %command, "Executing");
        self.process
            .stream(
                "executing command",
                &args::exec_args(&self.container_id, command),
                None,
                ui,
            )
            .await
            .map_err(|e| BuildError::Communicator(e.to_string()))
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        debug!(container_id = %self.container_id, local = %local.display(), remote, "Uploading");
        self.process
            .capture(
                "uploading",
                &args::copy_args(&local.to_string_lossy(), &self.container_id, remote),
            )
            .await
            .map_err(|e| BuildError::Communicator(e.to_string()))?;
        Ok(())
    }
}
