//! Provisioning hooks fired by the build.

use async_trait::async_trait;
use events::Ui;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::communicator::Communicator;
use crate::error::{BuildError, Result};
use crate::generated::GeneratedData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// After the container is connected, before finalization
    Provision,
    /// After finalization, while the container is still running
    PostFinalize,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::PostFinalize => "post_finalize",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Hook: Send + Sync {
    /// `communicator` is `None` when the build was configured without one.
    async fn run(
        &self,
        event: HookEvent,
        ui: &Ui,
        communicator: Option<&dyn Communicator>,
        data: &GeneratedData,
    ) -> Result<()>;
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

#[async_trait]
impl Hook for NoopHook {
    async fn run(
        &self,
        _event: HookEvent,
        _ui: &Ui,
        _communicator: Option<&dyn Communicator>,
        _data: &GeneratedData,
    ) -> Result<()> {
        Ok(())
    }
}

/// Runs inline shell commands in the container for each event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellProvisioner {
    pub provision: Vec<String>,
    pub post_finalize: Vec<String>,
}

impl ShellProvisioner {
    pub fn commands(&self, event: HookEvent) -> &[String] {
        match event {
            HookEvent::Provision => &self.provision,
            HookEvent::PostFinalize => &self.post_finalize,
        }
    }
}

#[async_trait]
impl Hook for ShellProvisioner {
    async fn run(
        &self,
        event: HookEvent,
        ui: &Ui,
        communicator: Option<&dyn Communicator>,
        _data: &GeneratedData,
    ) -> Result<()> {
        let commands = self.commands(event);
        if commands.is_empty() {
            return Ok(());
        }

        let Some(comm) = communicator else {
            ui.message(format!(
                "No communicator; skipping {} {} command(s)",
                commands.len(),
                event
            ));
            return Ok(());
        };

        for command in commands {
            ui.say(format!("Provisioning with shell: {}", command));
            info!(event = %event, command = %command, "Running shell command");
            comm.exec(command, ui)
                .await
                .map_err(|e| BuildError::hook(event, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        commands: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Communicator for Recorder {
        async fn exec(&self, command: &str, _ui: &Ui) -> Result<()> {
            self.commands.lock().unwrap().push(command.to_string());
            if self.fail {
                return Err(BuildError::Communicator("exit status 1".to_string()));
            }
            Ok(())
        }

        async fn upload(&self, _local: &Path, _remote: &str) -> Result<()> {
            Ok(())
        }
    }

    fn provisioner() -> ShellProvisioner {
        ShellProvisioner {
            provision: vec!["apk add curl".to_string(), "touch /ready".to_string()],
            post_finalize: vec!["echo done".to_string()],
        }
    }

    #[tokio::test]
    async fn test_runs_commands_for_event() {
        let comm = Recorder::default();
        provisioner()
            .run(
                HookEvent::Provision,
                &Ui::default(),
                Some(&comm),
                &GeneratedData::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            *comm.commands.lock().unwrap(),
            vec!["apk add curl", "touch /ready"]
        );
    }

    #[tokio::test]
    async fn test_failure_names_event() {
        let comm = Recorder {
            fail: true,
            ..Default::default()
        };
        let err = provisioner()
            .run(
                HookEvent::PostFinalize,
                &Ui::default(),
                Some(&comm),
                &GeneratedData::new(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Hook post_finalize failed"));
    }

    #[tokio::test]
    async fn test_without_communicator_is_noop() {
        provisioner()
            .run(
                HookEvent::Provision,
                &Ui::default(),
                None,
                &GeneratedData::new(),
            )
            .await
            .unwrap();
    }
}
