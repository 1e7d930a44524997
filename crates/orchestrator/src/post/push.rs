use async_trait::async_trait;
use events::Ui;
use runtime::Driver;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::artifact::Artifact;
use crate::error::{BuildError, Result};
use crate::post::PostProcessor;

/// Pushes image names to a registry, optionally inside a login session.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushPostProcessor {
    pub login: bool,
    pub login_server: String,
    pub login_username: String,
    #[serde(skip_serializing)]
    pub login_password: String,
    /// Names to push; the artifact id when empty
    pub names: Vec<String>,
}

impl fmt::Debug for PushPostProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushPostProcessor")
            .field("login", &self.login)
            .field("login_server", &self.login_server)
            .field("login_username", &self.login_username)
            .field("login_password", &podbake_core::redacted(&self.login_password))
            .field("names", &self.names)
            .finish()
    }
}

impl PushPostProcessor {
    async fn push_all(&self, names: &[String], driver: &dyn Driver, ui: &Ui) -> Result<()> {
        for name in names {
            ui.message(format!("Pushing: {}", name));
            driver.push(name).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PostProcessor for PushPostProcessor {
    fn name(&self) -> &'static str {
        "push"
    }

    async fn process(&self, artifact: Artifact, driver: &dyn Driver, ui: &Ui) -> Result<Artifact> {
        let names = if self.names.is_empty() {
            let id = artifact
                .image_id()
                .ok_or_else(|| BuildError::unsupported(self.name(), "no image to push"))?;
            vec![id.to_string()]
        } else {
            self.names.clone()
        };

        if !self.login {
            self.push_all(&names, driver, ui).await?;
            return Ok(artifact);
        }

        ui.message("Logging in...");
        let session = driver
            .login(
                &self.login_server,
                &self.login_username,
                &self.login_password,
            )
            .await?;

        let pushed = self.push_all(&names, driver, ui).await;

        ui.message("Logging out...");
        if let Err(e) = driver.logout(session).await {
            warn!(error = %e, "Logout failed");
            pushed?;
            return Err(e.into());
        }

        pushed.map(|()| artifact)
    }
}
