use async_trait::async_trait;
use std::io::ErrorKind;
use tracing::{debug, warn};

use crate::context::BuildContext;
use crate::error::Result;
use crate::step::{Step, StepAction};

/// Deletes key files created while connecting. Failures are only logged.
#[derive(Debug, Default)]
pub struct CleanupTempKeysStep;

#[async_trait]
impl Step for CleanupTempKeysStep {
    fn name(&self) -> &'static str {
        "cleanup_temp_keys"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<StepAction> {
        let keys = ctx.take_temp_keys();
        if keys.is_empty() {
            return Ok(StepAction::Continue);
        }

        ctx.ui().say("Deleting temporary keys...");
        for key in keys {
            match tokio::fs::remove_file(&key).await {
                Ok(()) => debug!(path = %key.display(), "Removed temp key"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %key.display(), error = %e, "Failed to remove temp key");
                    ctx.ui()
                        .error(format!("Error removing {}: {}", key.display(), e));
                }
            }
        }
        Ok(StepAction::Continue)
    }
}
