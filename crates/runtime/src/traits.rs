use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::args::ContainerSpec;
use crate::error::{Result, RuntimeError};
use crate::version::RuntimeVersion;

/// Byte sink for `export` and `save`.
pub type Sink<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

/// Process-wide lock around the runtime's credential store.
#[derive(Debug, Clone, Default)]
pub struct SessionLock {
    inner: Arc<Mutex<()>>,
}

impl SessionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other authenticated session is open.
    pub async fn acquire(&self, repo: &str) -> LoginSession {
        let guard = self.inner.clone().lock_owned().await;
        debug!(repo = %repo, "Session lock acquired");
        LoginSession {
            repo: repo.to_string(),
            _guard: guard,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

/// An authenticated registry session. Returned by [`Driver::login`] and
/// consumed by [`Driver::logout`]; the session lock is held for as long as
/// this value lives.
#[derive(Debug)]
pub struct LoginSession {
    repo: String,
    _guard: OwnedMutexGuard<()>,
}

impl LoginSession {
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl Drop for LoginSession {
    fn drop(&mut self) {
        debug!(repo = %self.repo, "Session lock released");
    }
}

/// Operations on the container runtime.
///
/// Each call maps to one invocation of the runtime executable (two for
/// `kill_container`) and is independent of the others, except `login` and
/// `logout`, which pair through [`LoginSession`].
#[async_trait]
pub trait Driver: Send + Sync {
    /// Name of the runtime backend
    fn name(&self) -> &'static str;

    /// Fail if the runtime executable cannot be located. Does not spawn.
    fn verify(&self) -> Result<()>;

    async fn version(&self) -> Result<RuntimeVersion>;

    /// Pull an image, streaming progress to the UI
    async fn pull(&self, image: &str) -> Result<()>;

    /// Push an image, streaming progress to the UI
    async fn push(&self, name: &str) -> Result<()>;

    /// Log in to a registry. Blocks while another session is open.
    async fn login(&self, repo: &str, user: &str, pass: &str) -> Result<LoginSession>;

    /// Log out and release the session lock, even if the logout fails
    async fn logout(&self, session: LoginSession) -> Result<()>;

    /// Start the build container, returning its ID
    async fn start_container(&self, spec: &ContainerSpec) -> Result<String>;

    async fn stop_container(&self, id: &str) -> Result<()>;

    /// Kill, then remove, the container
    async fn kill_container(&self, id: &str) -> Result<()>;

    /// Commit a container, returning the new image ID
    async fn commit(
        &self,
        id: &str,
        author: &str,
        changes: &[String],
        message: &str,
    ) -> Result<String>;

    /// Stream the container filesystem as a tarball into `sink`
    async fn export(&self, id: &str, sink: Sink<'_>) -> Result<()>;

    /// Stream an image archive into `sink`
    async fn save_image(&self, id: &str, sink: Sink<'_>) -> Result<()>;

    /// Import a filesystem tarball as an image, returning its ID
    async fn import(&self, path: &Path, changes: &[String], repo: &str) -> Result<String>;

    async fn tag_image(&self, id: &str, repo: &str, force: bool) -> Result<()>;

    async fn delete_image(&self, id: &str) -> Result<()>;

    async fn ip_address(&self, id: &str) -> Result<String>;

    async fn sha256(&self, id: &str) -> Result<String>;

    /// Default command of an image; empty when unset
    async fn cmd(&self, id: &str) -> Result<Vec<String>>;

    /// Default entrypoint of an image; empty when unset
    async fn entrypoint(&self, id: &str) -> Result<Vec<String>>;
}

/// Parse the JSON list printed by the `Cmd`/`Entrypoint` inspect templates.
pub fn parse_json_list(what: &'static str, output: &str) -> Result<Vec<String>> {
    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed == "[]" || trimmed == "null" {
        return Ok(Vec::new());
    }

    serde_json::from_str(trimmed).map_err(|_| RuntimeError::parse(what, trimmed))
}
