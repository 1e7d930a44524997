//! In-memory driver that records what it was asked to do.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::AsyncWriteExt;

use crate::args::{self, ContainerSpec};
use crate::error::{require, Result, RuntimeError};
use crate::traits::{Driver, LoginSession, SessionLock, Sink};
use crate::version::{password_via_stdin, tag_force_flag, RuntimeVersion};

/// One recorded driver call with the argument vector the real driver would
/// have passed to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub op: &'static str,
    pub args: Vec<String>,
}

#[derive(Debug)]
struct FakeState {
    version: RuntimeVersion,
    container_id: String,
    image_id: String,
    imported_id: String,
    ip_address: String,
    cmd: Vec<String>,
    entrypoint: Vec<String>,
    export_bytes: Vec<u8>,
    save_bytes: Vec<u8>,
    failures: HashSet<&'static str>,
    invocations: Vec<Invocation>,
    password_stdin: Vec<String>,
    imported: Vec<u8>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            version: RuntimeVersion::new(4, 9, 3),
            container_id: "fake-container".to_string(),
            image_id: "sha256:fakeimage".to_string(),
            imported_id: "sha256:fakeimport".to_string(),
            ip_address: "10.88.0.2".to_string(),
            cmd: Vec::new(),
            entrypoint: Vec::new(),
            export_bytes: b"fake-export-tar".to_vec(),
            save_bytes: b"fake-image-archive".to_vec(),
            failures: HashSet::new(),
            invocations: Vec::new(),
            password_stdin: Vec::new(),
            imported: Vec::new(),
        }
    }
}

type Trigger = Arc<dyn Fn() + Send + Sync>;

/// Scriptable [`Driver`] for tests.
///
/// Every call is recorded as an [`Invocation`]; an operation named with
/// [`FakeDriver::fail_on`] returns a `CommandFailed` error after being
/// recorded. [`FakeDriver::on_call`] runs a closure when an operation is
/// reached, e.g. to cancel a build mid-step.
#[derive(Default)]
pub struct FakeDriver {
    state: Mutex<FakeState>,
    triggers: Mutex<HashMap<&'static str, Trigger>>,
    session: SessionLock,
}

impl std::fmt::Debug for FakeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeDriver")
            .field("state", &self.state)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_version(self, version: RuntimeVersion) -> Self {
        self.state().version = version;
        self
    }

    pub fn with_container_id(self, id: impl Into<String>) -> Self {
        self.state().container_id = id.into();
        self
    }

    pub fn with_image_id(self, id: impl Into<String>) -> Self {
        self.state().image_id = id.into();
        self
    }

    pub fn with_imported_id(self, id: impl Into<String>) -> Self {
        self.state().imported_id = id.into();
        self
    }

    pub fn with_cmd(self, cmd: &[&str]) -> Self {
        self.state().cmd = cmd.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_entrypoint(self, entrypoint: &[&str]) -> Self {
        self.state().entrypoint = entrypoint.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_export_bytes(self, bytes: &[u8]) -> Self {
        self.state().export_bytes = bytes.to_vec();
        self
    }

    pub fn fail_on(self, op: &'static str) -> Self {
        self.state().failures.insert(op);
        self
    }

    pub fn on_call(self, op: &'static str, trigger: impl Fn() + Send + Sync + 'static) -> Self {
        self.triggers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(op, Arc::new(trigger));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.state().invocations.clone()
    }

    /// Operation names in call order
    pub fn ops(&self) -> Vec<&'static str> {
        self.state().invocations.iter().map(|i| i.op).collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.state().invocations.iter().filter(|i| i.op == op).count()
    }

    /// Passwords that were delivered on stdin rather than as arguments
    pub fn password_stdin(&self) -> Vec<String> {
        self.state().password_stdin.clone()
    }

    /// Bytes read from the most recent import source
    pub fn imported(&self) -> Vec<u8> {
        self.state().imported.clone()
    }

    pub fn session(&self) -> &SessionLock {
        &self.session
    }

    fn record(&self, op: &'static str, args: Vec<String>) -> Result<()> {
        let trigger = self
            .triggers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(op)
            .cloned();
        if let Some(trigger) = trigger {
            trigger();
        }

        let mut state = self.state();
        state.invocations.push(Invocation { op, args });
        if state.failures.contains(op) {
            return Err(RuntimeError::command_failed(
                op,
                "exit status: 125",
                format!("Error: injected {} failure", op),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for FakeDriver {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn verify(&self) -> Result<()> {
        Ok(())
    }

    async fn version(&self) -> Result<RuntimeVersion> {
        self.record("version", args::version_args())?;
        Ok(self.state().version.clone())
    }

    async fn pull(&self, image: &str) -> Result<()> {
        require("image", image)?;
        self.record("pull", args::pull_args(image))
    }

    async fn push(&self, name: &str) -> Result<()> {
        require("name", name)?;
        self.record("push", args::push_args(name))
    }

    async fn login(&self, repo: &str, user: &str, pass: &str) -> Result<LoginSession> {
        let session = self.session.acquire(repo).await;
        let running = self.version().await?;
        let via_stdin = !pass.is_empty() && password_via_stdin(&running);

        self.record("login", args::login_args(repo, user, pass, via_stdin))?;
        if via_stdin {
            self.state().password_stdin.push(pass.to_string());
        }
        Ok(session)
    }

    async fn logout(&self, session: LoginSession) -> Result<()> {
        let result = self.record("logout", args::logout_args(session.repo()));
        drop(session);
        result
    }

    async fn start_container(&self, spec: &ContainerSpec) -> Result<String> {
        require("image", &spec.image)?;
        self.record("start_container", args::run_args(spec)?)?;
        Ok(self.state().container_id.clone())
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        require("id", id)?;
        self.record("stop_container", args::stop_args(id))
    }

    async fn kill_container(&self, id: &str) -> Result<()> {
        require("id", id)?;
        self.record("kill_container", args::kill_args(id))
    }

    async fn commit(
        &self,
        id: &str,
        author: &str,
        changes: &[String],
        message: &str,
    ) -> Result<String> {
        require("id", id)?;
        self.record("commit", args::commit_args(id, author, changes, message))?;
        Ok(self.state().image_id.clone())
    }

    async fn export(&self, id: &str, sink: Sink<'_>) -> Result<()> {
        require("id", id)?;
        self.record("export", args::export_args(id))?;
        let bytes = self.state().export_bytes.clone();
        sink.write_all(&bytes).await?;
        sink.flush().await?;
        Ok(())
    }

    async fn save_image(&self, id: &str, sink: Sink<'_>) -> Result<()> {
        require("id", id)?;
        self.record("save_image", args::save_args(id))?;
        let bytes = self.state().save_bytes.clone();
        sink.write_all(&bytes).await?;
        sink.flush().await?;
        Ok(())
    }

    async fn import(&self, path: &Path, changes: &[String], repo: &str) -> Result<String> {
        require("path", &path.to_string_lossy())?;
        let bytes = tokio::fs::read(path).await?;
        self.record("import", args::import_args(changes, repo))?;

        let mut state = self.state();
        state.imported = bytes;
        Ok(state.imported_id.clone())
    }

    async fn tag_image(&self, id: &str, repo: &str, force: bool) -> Result<()> {
        require("id", id)?;
        require("repo", repo)?;
        let running = self.version().await?;
        self.record(
            "tag_image",
            args::tag_args(id, repo, tag_force_flag(&running, force)),
        )
    }

    async fn delete_image(&self, id: &str) -> Result<()> {
        require("id", id)?;
        self.record("delete_image", args::delete_image_args(id))
    }

    async fn ip_address(&self, id: &str) -> Result<String> {
        require("id", id)?;
        self.record("ip_address", args::inspect_args(args::INSPECT_IP_ADDRESS, id))?;
        Ok(self.state().ip_address.clone())
    }

    async fn sha256(&self, id: &str) -> Result<String> {
        require("id", id)?;
        self.record("sha256", args::inspect_args(args::INSPECT_ID, id))?;
        Ok(id.to_string())
    }

    async fn cmd(&self, id: &str) -> Result<Vec<String>> {
        require("id", id)?;
        self.record("cmd", args::inspect_args(args::INSPECT_CMD, id))?;
        Ok(self.state().cmd.clone())
    }

    async fn entrypoint(&self, id: &str) -> Result<Vec<String>> {
        require("id", id)?;
        self.record(
            "entrypoint",
            args::inspect_args(args::INSPECT_ENTRYPOINT, id),
        )?;
        Ok(self.state().entrypoint.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_on_call_runs_before_recording() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let fake = FakeDriver::new().on_call("pull", move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        fake.pull("base:1.0").await.unwrap();
        fake.push("base:1.0").await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(fake.ops(), vec!["pull", "push"]);
    }

    #[tokio::test]
    async fn test_records_invocations() {
        let fake = FakeDriver::new();
        fake.pull("base:1.0").await.unwrap();
        let id = fake
            .commit("fake-container", "", &[], "")
            .await
            .unwrap();

        assert_eq!(id, "sha256:fakeimage");
        assert_eq!(
            fake.invocations(),
            vec![
                Invocation {
                    op: "pull",
                    args: vec!["pull".to_string(), "base:1.0".to_string()]
                },
                Invocation {
                    op: "commit",
                    args: vec!["commit".to_string(), "fake-container".to_string()]
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let fake = FakeDriver::new().fail_on("pull");
        let err = fake.pull("base:1.0").await.unwrap_err();
        assert!(err.to_string().contains("injected pull failure"));
        assert_eq!(fake.ops(), vec!["pull"]);
    }

    #[tokio::test]
    async fn test_login_gate() {
        let fake = FakeDriver::new().with_version(RuntimeVersion::new(17, 7, 0));
        let session = fake.login("quay.io", "bob", "pw").await.unwrap();
        assert!(fake.session().is_locked());
        fake.logout(session).await.unwrap();
        assert!(!fake.session().is_locked());

        assert_eq!(fake.password_stdin(), vec!["pw"]);
        let login = &fake.invocations()[1];
        assert!(login.args.contains(&"--password-stdin".to_string()));
        assert!(!login.args.contains(&"pw".to_string()));
    }

    #[tokio::test]
    async fn test_export_writes_bytes() {
        let fake = FakeDriver::new().with_export_bytes(b"abc");
        let mut out: Vec<u8> = Vec::new();
        fake.export("c1", &mut out).await.unwrap();
        assert_eq!(out, b"abc");
    }
}
