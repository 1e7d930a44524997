use async_trait::async_trait;
use events::Ui;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::args::{self, ContainerSpec};
use crate::error::{require, Result, RuntimeError};
use crate::process::Process;
use crate::traits::{parse_json_list, Driver, LoginSession, SessionLock, Sink};
use crate::version::{password_via_stdin, tag_force_flag, RuntimeVersion, TagForce};

pub const DEFAULT_BINARY: &str = "podman";

/// Driver that shells out to the `podman` executable.
#[derive(Debug, Clone)]
pub struct PodmanDriver {
    process: Process,
    ui: Ui,
    session: SessionLock,
}

impl PodmanDriver {
    pub fn new(ui: Ui) -> Self {
        Self::with_binary(DEFAULT_BINARY, ui)
    }

    /// Use a different executable, either a bare name resolved on `PATH` or
    /// a path.
    pub fn with_binary(binary: impl Into<PathBuf>, ui: Ui) -> Self {
        Self {
            process: Process::new(binary),
            ui,
            session: SessionLock::new(),
        }
    }

    pub fn binary(&self) -> &Path {
        self.process.binary()
    }

    async fn inspect(&self, format: &str, id: &str) -> Result<String> {
        require("id", id)?;
        let output = self
            .process
            .capture("inspecting", &args::inspect_args(format, id))
            .await?;
        Ok(output.trim().to_string())
    }
}

#[async_trait]
impl Driver for PodmanDriver {
    fn name(&self) -> &'static str {
        "podman"
    }

    fn verify(&self) -> Result<()> {
        which::which(self.binary()).map_err(|e| RuntimeError::NotFound {
            binary: self.binary().display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn version(&self) -> Result<RuntimeVersion> {
        let output = self
            .process
            .capture("querying version", &args::version_args())
            .await?;
        let version = RuntimeVersion::parse_output(&output)?;
        debug!(version = %version, "Detected runtime version");
        Ok(version)
    }

    async fn pull(&self, image: &str) -> Result<()> {
        require("image", image)?;
        self.process
            .stream("pulling image", &args::pull_args(image), None, &self.ui)
            .await
    }

    async fn push(&self, name: &str) -> Result<()> {
        require("name", name)?;
        self.process
            .stream("pushing image", &args::push_args(name), None, &self.ui)
            .await
    }

    async fn login(&self, repo: &str, user: &str, pass: &str) -> Result<LoginSession> {
        let session = self.session.acquire(repo).await;

        // On any error below the session drops and the lock is released
        let running = self.version().await?;
        let via_stdin = !pass.is_empty() && password_via_stdin(&running);

        let args = args::login_args(repo, user, pass, via_stdin);
        let stdin = via_stdin.then_some(pass);

        info!(repo = %repo, password_stdin = via_stdin, "Logging in");
        self.process
            .stream("logging in", &args, stdin, &self.ui)
            .await?;

        Ok(session)
    }

    async fn logout(&self, session: LoginSession) -> Result<()> {
        let result = self
            .process
            .stream(
                "logging out",
                &args::logout_args(session.repo()),
                None,
                &self.ui,
            )
            .await;
        drop(session);
        result
    }

    async fn start_container(&self, spec: &ContainerSpec) -> Result<String> {
        require("image", &spec.image)?;
        let args = args::run_args(spec)?;

        self.ui.message(format!(
            "Run command: {} {}",
            self.binary().display(),
            args.join(" ")
        ));
        info!(args = ?args, "Starting container");

        let output = self.process.capture("starting container", &args).await?;
        let id = output.trim().to_string();
        if id.is_empty() {
            return Err(RuntimeError::parse("container id", output));
        }
        Ok(id)
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        require("id", id)?;
        self.process
            .capture("stopping container", &args::stop_args(id))
            .await?;
        Ok(())
    }

    async fn kill_container(&self, id: &str) -> Result<()> {
        require("id", id)?;
        self.process
            .capture("killing container", &args::kill_args(id))
            .await?;
        self.process
            .capture("removing container", &args::remove_container_args(id))
            .await?;
        Ok(())
    }

    async fn commit(
        &self,
        id: &str,
        author: &str,
        changes: &[String],
        message: &str,
    ) -> Result<String> {
        require("id", id)?;
        let args = args::commit_args(id, author, changes, message);
        info!(args = ?args, "Committing container");

        let output = self.process.capture("committing container", &args).await?;
        Ok(output.trim().to_string())
    }

    async fn export(&self, id: &str, sink: Sink<'_>) -> Result<()> {
        require("id", id)?;
        info!(container_id = %id, "Exporting container");
        self.process
            .stream_to("exporting container", &args::export_args(id), sink)
            .await
    }

    async fn save_image(&self, id: &str, sink: Sink<'_>) -> Result<()> {
        require("id", id)?;
        info!(image_id = %id, "Saving image");
        self.process
            .stream_to("saving image", &args::save_args(id), sink)
            .await
    }

    async fn import(&self, path: &Path, changes: &[String], repo: &str) -> Result<String> {
        require("path", &path.to_string_lossy())?;
        let file = tokio::fs::File::open(path).await?;
        let args = args::import_args(changes, repo);
        info!(path = %path.display(), args = ?args, "Importing tarball");

        let output = self.process.feed("importing container", &args, file).await?;
        Ok(output.trim().to_string())
    }

    async fn tag_image(&self, id: &str, repo: &str, force: bool) -> Result<()> {
        require("id", id)?;
        require("repo", repo)?;

        let running = self.version().await?;
        let force = tag_force_flag(&running, force);
        if force == TagForce::Ignored {
            warn!(
                version = %running,
                "Option \"force\" is ignored: tag -f was removed in podman 1.12.0"
            );
            self.ui
                .message("Ignoring \"force\": not supported by this podman version");
        }

        self.process
            .capture("tagging image", &args::tag_args(id, repo, force))
            .await?;
        Ok(())
    }

    async fn delete_image(&self, id: &str) -> Result<()> {
        require("id", id)?;
        info!(image_id = %id, "Deleting image");
        self.process
            .capture("deleting image", &args::delete_image_args(id))
            .await?;
        Ok(())
    }

    async fn ip_address(&self, id: &str) -> Result<String> {
        self.inspect(args::INSPECT_IP_ADDRESS, id).await
    }

    async fn sha256(&self, id: &str) -> Result<String> {
        self.inspect(args::INSPECT_ID, id).await
    }

    async fn cmd(&self, id: &str) -> Result<Vec<String>> {
        let output = self.inspect(args::INSPECT_CMD, id).await?;
        parse_json_list("cmd", &output)
    }

    async fn entrypoint(&self, id: &str) -> Result<Vec<String>> {
        let output = self.inspect(args::INSPECT_ENTRYPOINT, id).await?;
        parse_json_list("entrypoint", &output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use events::{Event, OutputStream};
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// A stand-in `podman` that logs its argv and stdin, then answers
    /// according to its first argument.
    const STUB: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
echo "$@" >> "$dir/argv.log"
case "$1" in
  -v) echo "podman version ${STUB_VERSION:-4.9.3}" ;;
  login)
    for a in "$@"; do
      if [ "$a" = "--password-stdin" ]; then cat > "$dir/stdin.log"; fi
    done
    echo "Login Succeeded!" ;;
  logout) echo "Removed login credentials" ;;
  pull)
    case "$2" in
      broken*) echo "Error: initializing source docker://$2: manifest unknown" >&2; exit 125 ;;
      latin*)
        printf 'Copying \377 blob\n'
        sleep 0.3
        echo "Copying config"
        echo "Writing manifest" ;;
      *) echo "Trying to pull $2..."; echo "Writing manifest" >&2 ;;
    esac ;;
  run) echo "  c0ffee  " ;;
  commit) echo "sha256:feedface" ;;
  export)
    case "$2" in
      gone) printf 'Error: no such container \377 gone\n' >&2; exit 125 ;;
      *) printf 'TARBYTES' ;;
    esac ;;
  save)
    case "$2" in
      gone) echo "Error: gone: image not known" >&2; exit 125 ;;
      *) printf 'IMAGEBYTES' ;;
    esac ;;
  import)
    for a in "$@"; do last="$a"; done
    cat > "$dir/import.bin"
    if [ "$last" = "local/broken" ]; then echo "Error: invalid tar header" >&2; exit 125; fi
    echo "imported123" ;;
  inspect)
    case "$3" in
      *Cmd*) echo ' ["/bin/sh","-c","run"] ' ;;
      *Entrypoint*) echo ' [] ' ;;
      *IPAddress*) echo '10.88.0.5' ;;
      *) echo 'sha256:abc' ;;
    esac ;;
  kill) echo "no such container" >&2; exit 125 ;;
  tag|rmi|rm|stop) ;;
  *) echo "unknown $1" >&2; exit 1 ;;
esac
"#;

    struct Stub {
        dir: TempDir,
        driver: PodmanDriver,
    }

    impl Stub {
        fn new(version: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let script = dir.path().join("podman");
            let body = STUB.replace("${STUB_VERSION:-4.9.3}", version);
            std::fs::write(&script, body).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            let driver = PodmanDriver::with_binary(script, Ui::default());
            Self { dir, driver }
        }

        fn argv(&self) -> Vec<String> {
            std::fs::read_to_string(self.dir.path().join("argv.log"))
                .unwrap_or_default()
                .lines()
                .map(|l| l.to_string())
                .collect()
        }
    }

    #[test]
    fn test_verify_missing_binary() {
        let driver = PodmanDriver::with_binary("/nonexistent/podman-xyz", Ui::default());
        assert!(matches!(
            driver.verify(),
            Err(RuntimeError::NotFound { .. })
        ));
    }

    #[test]
    fn test_verify_stub() {
        let stub = Stub::new("4.9.3");
        assert!(stub.driver.verify().is_ok());
        assert!(stub.argv().is_empty());
    }

    #[tokio::test]
    async fn test_version() {
        let stub = Stub::new("4.9.3");
        assert_eq!(
            stub.driver.version().await.unwrap(),
            RuntimeVersion::new(4, 9, 3)
        );
    }

    #[tokio::test]
    async fn test_start_container_trims_id() {
        let stub = Stub::new("4.9.3");
        let spec = ContainerSpec::from_config(&podbake_core::BuildConfig::new("base:1.0"));
        let id = stub.driver.start_container(&spec).await.unwrap();
        assert_eq!(id, "c0ffee");
        assert_eq!(
            stub.argv(),
            vec!["run --systemd=true -d -i -t --entrypoint=/bin/sh -- base:1.0"]
        );
    }

    #[tokio::test]
    async fn test_pull_streams_output() {
        let stub = Stub::new("4.9.3");
        let mut rx = stub.driver.ui.bus().subscribe();

        stub.driver.pull("base:1.0").await.unwrap();

        let mut lines = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            if let Event::Output { stream, line } = envelope.event {
                lines.push((stream, line));
            }
        }
        assert!(lines.contains(&(OutputStream::Stdout, "Trying to pull base:1.0...".to_string())));
        assert!(lines.contains(&(OutputStream::Stderr, "Writing manifest".to_string())));
    }

    fn output_lines(rx: &mut tokio::sync::broadcast::Receiver<events::EventEnvelope>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            if let Event::Output { line, .. } = envelope.event {
                lines.push(line);
            }
        }
        lines
    }

    #[tokio::test]
    async fn test_pull_survives_undecodable_output() {
        let stub = Stub::new("4.9.3");
        let mut rx = stub.driver.ui.bus().subscribe();

        stub.driver.pull("latin:1.0").await.unwrap();

        let lines = output_lines(&mut rx);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Copying \u{FFFD} blob");
        assert_eq!(lines[2], "Writing manifest");
    }

    #[tokio::test]
    async fn test_pull_failure_carries_stderr() {
        let stub = Stub::new("4.9.3");
        let err = stub.driver.pull("broken:1.0").await.unwrap_err();

        match err {
            RuntimeError::CommandFailed { action, stderr, .. } => {
                assert_eq!(action, "pulling image");
                assert!(stderr.contains("manifest unknown"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_login_new_version_uses_stdin() {
        let stub = Stub::new("20.10.0");
        let session = stub.driver.login("quay.io", "bob", "s3cret").await.unwrap();
        stub.driver.logout(session).await.unwrap();

        let argv = stub.argv();
        assert_eq!(argv[1], "login -u bob --password-stdin quay.io");
        assert!(argv.iter().all(|line| !line.contains("s3cret")));
        let stdin = std::fs::read_to_string(stub.dir.path().join("stdin.log")).unwrap();
        assert_eq!(stdin, "s3cret");
        assert_eq!(argv[2], "logout quay.io");
    }

    #[tokio::test]
    async fn test_login_old_version_uses_flag() {
        let stub = Stub::new("4.9.3");
        let session = stub.driver.login("quay.io", "bob", "s3cret").await.unwrap();
        assert!(stub.driver.session.is_locked());
        stub.driver.logout(session).await.unwrap();
        assert!(!stub.driver.session.is_locked());

        assert_eq!(stub.argv()[1], "login -u bob -p s3cret quay.io");
    }

    #[tokio::test]
    async fn test_commit_returns_image_id() {
        let stub = Stub::new("4.9.3");
        let changes = vec!["CMD /run.sh".to_string()];
        let id = stub.driver.commit("c0ffee", "", &changes, "").await.unwrap();
        assert_eq!(id, "sha256:feedface");
        assert_eq!(stub.argv(), vec!["commit --change CMD /run.sh c0ffee"]);
    }

    #[tokio::test]
    async fn test_kill_failure_skips_remove() {
        let stub = Stub::new("4.9.3");
        let err = stub.driver.kill_container("c0ffee").await.unwrap_err();
        assert!(err.to_string().contains("no such container"));
        assert_eq!(stub.argv(), vec!["kill c0ffee"]);
    }

    #[tokio::test]
    async fn test_export_to_sink() {
        let stub = Stub::new("4.9.3");
        let mut sink: Vec<u8> = Vec::new();
        stub.driver.export("c0ffee", &mut sink).await.unwrap();
        assert_eq!(sink, b"TARBYTES");
    }

    #[tokio::test]
    async fn test_export_failure_keeps_undecodable_stderr() {
        let stub = Stub::new("4.9.3");
        let mut sink: Vec<u8> = Vec::new();
        let err = stub.driver.export("gone", &mut sink).await.unwrap_err();

        match err {
            RuntimeError::CommandFailed { action, stderr, .. } => {
                assert_eq!(action, "exporting container");
                assert_eq!(stderr, "Error: no such container \u{FFFD} gone");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_save_image() {
        let stub = Stub::new("4.9.3");
        let mut sink: Vec<u8> = Vec::new();
        stub.driver.save_image("img", &mut sink).await.unwrap();
        assert_eq!(sink, b"IMAGEBYTES");

        let err = stub.driver.save_image("gone", &mut sink).await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::CommandFailed { ref stderr, .. } if stderr.contains("image not known")
        ));
    }

    #[tokio::test]
    async fn test_import_failure_carries_stderr() {
        let stub = Stub::new("4.9.3");
        let tarball = stub.dir.path().join("bad.tar");
        std::fs::write(&tarball, b"not-a-tar").unwrap();

        let err = stub
            .driver
            .import(&tarball, &[], "local/broken")
            .await
            .unwrap_err();

        match err {
            RuntimeError::CommandFailed { action, stderr, .. } => {
                assert_eq!(action, "importing container");
                assert_eq!(stderr, "Error: invalid tar header");
            }
            other => panic!("unexpected error: {other}"),
        }
        let received = std::fs::read(stub.dir.path().join("import.bin")).unwrap();
        assert_eq!(received, b"not-a-tar");
    }

    #[tokio::test]
    async fn test_import_pipes_file() {
        let stub = Stub::new("4.9.3");
        let tarball = stub.dir.path().join("in.tar");
        std::fs::write(&tarball, b"layer-bytes").unwrap();

        let id = stub
            .driver
            .import(&tarball, &["CMD /bin/sh".to_string()], "local/img")
            .await
            .unwrap();

        assert_eq!(id, "imported123");
        let received = std::fs::read(stub.dir.path().join("import.bin")).unwrap();
        assert_eq!(received, b"layer-bytes");
        assert_eq!(
            stub.argv(),
            vec!["import --change CMD /bin/sh - local/img"]
        );
    }

    #[tokio::test]
    async fn test_tag_force_by_version() {
        let old = Stub::new("1.11.2");
        old.driver.tag_image("img", "repo:1", true).await.unwrap();
        assert_eq!(old.argv()[1], "tag -f img repo:1");

        let new = Stub::new("4.9.3");
        new.driver.tag_image("img", "repo:1", true).await.unwrap();
        assert_eq!(new.argv()[1], "tag img repo:1");
    }

    #[tokio::test]
    async fn test_inspect_helpers() {
        let stub = Stub::new("4.9.3");
        assert_eq!(
            stub.driver.cmd("base:1.0").await.unwrap(),
            vec!["/bin/sh", "-c", "run"]
        );
        assert!(stub.driver.entrypoint("base:1.0").await.unwrap().is_empty());
        assert_eq!(stub.driver.ip_address("c0ffee").await.unwrap(), "10.88.0.5");
        assert_eq!(stub.driver.sha256("img").await.unwrap(), "sha256:abc");
    }

    #[tokio::test]
    async fn test_missing_argument() {
        let stub = Stub::new("4.9.3");
        assert!(matches!(
            stub.driver.commit("", "", &[], "").await,
            Err(RuntimeError::MissingArgument("id"))
        ));
        assert!(stub.argv().is_empty());
    }
}
