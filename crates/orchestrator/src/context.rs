//! Typed state shared by the steps of one build.

use events::Ui;
use podbake_core::BuildConfig;
use runtime::Driver;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::communicator::{Communicator, Connector, ExecConnector};
use crate::error::{BuildError, Result};
use crate::generated::GeneratedData;
use crate::hooks::{Hook, NoopHook};

/// Collaborators handed to a build before its first step runs.
#[derive(Clone)]
pub struct BuildEnv {
    pub driver: Arc<dyn Driver>,
    pub ui: Ui,
    pub hook: Arc<dyn Hook>,
    pub connector: Arc<dyn Connector>,
    pub cancel: CancellationToken,
}

impl BuildEnv {
    /// Environment with no provisioning and the exec connector.
    pub fn new(driver: Arc<dyn Driver>, ui: Ui) -> Self {
        Self {
            driver,
            ui,
            hook: Arc::new(NoopHook),
            connector: Arc::new(ExecConnector::default()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// State of one build.
///
/// Each value is written by the step that produces it. Accessors for values
/// that may not exist yet return [`BuildError::MissingState`] instead of a
/// default; `try_*` variants are for cleanup code that must tolerate absence.
pub struct BuildContext {
    config: BuildConfig,
    env: BuildEnv,

    temp_dir: Option<PathBuf>,
    container_id: Option<String>,
    container_ip: Option<String>,
    communicator: Option<Arc<dyn Communicator>>,
    temp_keys: Vec<PathBuf>,
    image_id: Option<String>,
    export_path: Option<PathBuf>,
    generated: GeneratedData,

    error: Option<BuildError>,
}

impl BuildContext {
    pub fn new(config: BuildConfig, env: BuildEnv) -> Self {
        Self {
            config,
            env,
            temp_dir: None,
            container_id: None,
            container_ip: None,
            communicator: None,
            temp_keys: Vec::new(),
            image_id: None,
            export_path: None,
            generated: GeneratedData::new(),
            error: None,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Append a commit directive
    pub fn push_change(&mut self, change: impl Into<String>) {
        self.config.changes.push(change.into());
    }

    pub fn driver(&self) -> Arc<dyn Driver> {
        self.env.driver.clone()
    }

    pub fn ui(&self) -> &Ui {
        &self.env.ui
    }

    pub fn hook(&self) -> Arc<dyn Hook> {
        self.env.hook.clone()
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        self.env.connector.clone()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.env.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.env.cancel.is_cancelled()
    }

    /// Fail with [`BuildError::Cancelled`] once cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BuildError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn set_temp_dir(&mut self, path: PathBuf) {
        self.temp_dir = Some(path);
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    pub fn set_container_id(&mut self, id: impl Into<String>) {
        self.container_id = Some(id.into());
    }

    pub fn container_id(&self) -> Result<&str> {
        self.try_container_id()
            .ok_or(BuildError::MissingState("container_id"))
    }

    pub fn try_container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    pub fn set_container_ip(&mut self, ip: impl Into<String>) {
        self.container_ip = Some(ip.into());
    }

    pub fn container_ip(&self) -> Result<&str> {
        self.container_ip
            .as_deref()
            .ok_or(BuildError::MissingState("container_ip"))
    }

    pub fn set_communicator(&mut self, communicator: Arc<dyn Communicator>) {
        self.communicator = Some(communicator);
    }

    /// The connected communicator, if the build uses one
    pub fn communicator(&self) -> Option<Arc<dyn Communicator>> {
        self.communicator.clone()
    }

    pub fn clear_communicator(&mut self) {
        self.communicator = None;
    }

    pub fn add_temp_keys(&mut self, keys: impl IntoIterator<Item = PathBuf>) {
        self.temp_keys.extend(keys);
    }

    pub fn take_temp_keys(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.temp_keys)
    }

    pub fn set_image_id(&mut self, id: impl Into<String>) {
        self.image_id = Some(id.into());
    }

    pub fn image_id(&self) -> Result<&str> {
        self.image_id
            .as_deref()
            .ok_or(BuildError::MissingState("image_id"))
    }

    pub fn set_export_path(&mut self, path: PathBuf) {
        self.export_path = Some(path);
    }

    pub fn export_path(&self) -> Result<&Path> {
        self.export_path
            .as_deref()
            .ok_or(BuildError::MissingState("export_path"))
    }

    pub fn generated(&self) -> &GeneratedData {
        &self.generated
    }

    pub fn generated_mut(&mut self) -> &mut GeneratedData {
        &mut self.generated
    }

    /// Record the build's terminal error. Only the first one is kept.
    pub fn record_error(&mut self, error: BuildError) {
        if let Some(existing) = &self.error {
            debug!(kept = %existing, dropped = %error, "Error already recorded");
            return;
        }
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&BuildError> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn take_error(&mut self) -> Option<BuildError> {
        self.error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::FakeDriver;

    fn context() -> BuildContext {
        let env = BuildEnv::new(Arc::new(FakeDriver::new()), Ui::default());
        BuildContext::new(BuildConfig::new("base:1.0"), env)
    }

    #[test]
    fn test_missing_state_is_typed() {
        let ctx = context();
        assert!(matches!(
            ctx.container_id(),
            Err(BuildError::MissingState("container_id"))
        ));
        assert!(matches!(
            ctx.image_id(),
            Err(BuildError::MissingState("image_id"))
        ));
        assert!(ctx.try_container_id().is_none());
    }

    #[test]
    fn test_first_error_wins() {
        let mut ctx = context();
        ctx.record_error(BuildError::Halted("pull".to_string()));
        ctx.record_error(BuildError::Cancelled);
        assert!(matches!(ctx.error(), Some(BuildError::Halted(step)) if step == "pull"));
    }

    #[test]
    fn test_cancellation() {
        let ctx = context();
        assert!(ctx.check_cancelled().is_ok());
        ctx.cancel_token().cancel();
        assert!(ctx.check_cancelled().unwrap_err().is_cancelled());
    }

    #[test]
    fn test_push_change() {
        let mut ctx = context();
        ctx.push_change("CMD [\"/bin/sh\"]");
        assert_eq!(ctx.config().changes, vec!["CMD [\"/bin/sh\"]"]);
    }
}
