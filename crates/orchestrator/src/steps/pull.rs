use async_trait::async_trait;
use tracing::{debug, warn};

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::step::{Step, StepAction};

/// Pulls the base image, inside a registry session when `login` is set.
#[derive(Debug, Default)]
pub struct PullStep;

#[async_trait]
impl Step for PullStep {
    fn name(&self) -> &'static str {
        "pull"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<StepAction> {
        let config = ctx.config();
        if !config.pull {
            debug!("Pull disabled, won't podman pull");
            return Ok(StepAction::Continue);
        }

        let ui = ctx.ui();
        let driver = ctx.driver();
        ui.say(format!("Pulling Podman image: {}", config.image));

        let session = if config.login {
            ui.message("Logging in...");
            Some(
                driver
                    .login(
                        &config.login_server,
                        &config.login_username,
                        &config.login_password,
                    )
                    .await?,
            )
        } else {
            None
        };

        let pulled = match ctx.check_cancelled() {
            Ok(()) => driver.pull(&config.image).await.map_err(BuildError::from),
            Err(e) => Err(e),
        };

        // The session is always closed; a pull error takes precedence
        if let Some(session) = session {
            ui.message("Logging out...");
            if let Err(e) = driver.logout(session).await {
                warn!(error = %e, "Logout failed");
                if pulled.is_ok() {
                    return Err(e.into());
                }
            }
        }

        pulled.map(|()| StepAction::Continue)
    }
}
