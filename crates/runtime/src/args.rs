//! Argument vectors for every runtime invocation.
//!
//! These are pure so the exact argument sequence can be asserted without
//! spawning a process; the podman driver and the fake driver both build
//! their invocations here.

use podbake_core::{template, BuildConfig, SystemdMode, TemplateData};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::version::TagForce;

pub const INSPECT_IP_ADDRESS: &str = "{{ .NetworkSettings.IPAddress }}";
pub const INSPECT_ID: &str = "{{ .Id }}";
pub const INSPECT_CMD: &str = "{{if .Config.Cmd}} {{json .Config.Cmd}} {{else}} [] {{end}}";
pub const INSPECT_ENTRYPOINT: &str =
    "{{if .Config.Entrypoint}} {{json .Config.Entrypoint}} {{else}} [] {{end}}";

/// Everything `podman run` needs to start the build container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub device: Vec<String>,
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub privileged: bool,
    pub systemd: SystemdMode,
    pub tmpfs: Vec<String>,
    /// Host path to container path
    pub volumes: BTreeMap<String, String>,
    /// Unrendered trailing tokens
    pub run_command: Vec<String>,
}

impl ContainerSpec {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            image: config.image.clone(),
            device: config.device.clone(),
            cap_add: config.cap_add.clone(),
            cap_drop: config.cap_drop.clone(),
            privileged: config.privileged,
            systemd: config.systemd,
            tmpfs: config.tmpfs.clone(),
            volumes: config.volumes.clone(),
            run_command: config.run_command.clone(),
        }
    }

    pub fn with_volume(mut self, host: impl Into<String>, guest: impl Into<String>) -> Self {
        self.volumes.insert(host.into(), guest.into());
        self
    }

    pub fn template_data(&self) -> TemplateData {
        TemplateData::new(self.image.clone())
    }
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `run` arguments in a fixed category order: devices, added capabilities,
/// dropped capabilities, privileged, systemd, tmpfs mounts, volumes, then the
/// rendered run command.
pub fn run_args(spec: &ContainerSpec) -> Result<Vec<String>> {
    let mut args = vec!["run".to_string()];

    for device in &spec.device {
        args.extend(["--device".to_string(), device.clone()]);
    }
    for cap in &spec.cap_add {
        args.extend(["--cap-add".to_string(), cap.clone()]);
    }
    for cap in &spec.cap_drop {
        args.extend(["--cap-drop".to_string(), cap.clone()]);
    }
    if spec.privileged {
        args.push("--privileged".to_string());
    }
    args.push(format!("--systemd={}", spec.systemd));
    for mount in &spec.tmpfs {
        args.extend(["--tmpfs".to_string(), mount.clone()]);
    }
    for (host, guest) in &spec.volumes {
        args.extend(["-v".to_string(), format!("{}:{}", host, guest)]);
    }

    args.extend(template::render_all(&spec.run_command, &spec.template_data())?);

    Ok(args)
}

pub fn commit_args(id: &str, author: &str, changes: &[String], message: &str) -> Vec<String> {
    let mut args = vec!["commit".to_string()];
    if !author.is_empty() {
        args.extend(["--author".to_string(), author.to_string()]);
    }
    for change in changes {
        args.extend(["--change".to_string(), change.clone()]);
    }
    if !message.is_empty() {
        args.extend(["--message".to_string(), message.to_string()]);
    }
    args.push(id.to_string());
    args
}

/// `login` arguments. With `password_stdin` the secret is never placed in
/// the vector; the caller writes it to the child's stdin instead.
pub fn login_args(repo: &str, user: &str, pass: &str, password_stdin: bool) -> Vec<String> {
    let mut args = vec!["login".to_string()];
    if !user.is_empty() {
        args.extend(["-u".to_string(), user.to_string()]);
    }
    if !pass.is_empty() {
        if password_stdin {
            args.push("--password-stdin".to_string());
        } else {
            args.extend(["-p".to_string(), pass.to_string()]);
        }
    }
    if !repo.is_empty() {
        args.push(repo.to_string());
    }
    args
}

pub fn logout_args(repo: &str) -> Vec<String> {
    let mut args = vec!["logout".to_string()];
    if !repo.is_empty() {
        args.push(repo.to_string());
    }
    args
}

pub fn tag_args(id: &str, repo: &str, force: TagForce) -> Vec<String> {
    let mut args = vec!["tag".to_string()];
    if force == TagForce::Flag {
        args.push("-f".to_string());
    }
    args.extend([id.to_string(), repo.to_string()]);
    args
}

pub fn import_args(changes: &[String], repo: &str) -> Vec<String> {
    let mut args = vec!["import".to_string()];
    for change in changes {
        args.extend(["--change".to_string(), change.clone()]);
    }
    args.push("-".to_string());
    if !repo.is_empty() {
        args.push(repo.to_string());
    }
    args
}

pub fn inspect_args(format: &str, id: &str) -> Vec<String> {
    strings(["inspect", "--format", format, id])
}

pub fn version_args() -> Vec<String> {
    strings(["-v"])
}

pub fn pull_args(image: &str) -> Vec<String> {
    strings(["pull", image])
}

pub fn push_args(name: &str) -> Vec<String> {
    strings(["push", name])
}

pub fn stop_args(id: &str) -> Vec<String> {
    strings(["stop", id])
}

pub fn kill_args(id: &str) -> Vec<String> {
    strings(["kill", id])
}

pub fn remove_container_args(id: &str) -> Vec<String> {
    strings(["rm", id])
}

pub fn export_args(id: &str) -> Vec<String> {
    strings(["export", id])
}

pub fn save_args(id: &str) -> Vec<String> {
    strings(["save", id])
}

pub fn delete_image_args(id: &str) -> Vec<String> {
    strings(["rmi", id])
}

/// Run `command` through `/bin/sh -c` inside a running container.
pub fn exec_args(id: &str, command: &str) -> Vec<String> {
    strings(["exec", id, "/bin/sh", "-c", command])
}

/// Copy a host path into a running container.
pub fn copy_args(local: &str, id: &str, remote: &str) -> Vec<String> {
    vec![
        "cp".to_string(),
        local.to_string(),
        format!("{}:{}", id, remote),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_spec() -> ContainerSpec {
        ContainerSpec {
            image: "base:1.0".to_string(),
            device: vec!["/dev/fuse".to_string()],
            cap_add: vec!["SYS_ADMIN".to_string(), "NET_ADMIN".to_string()],
            cap_drop: vec!["MKNOD".to_string()],
            privileged: true,
            systemd: SystemdMode::Always,
            tmpfs: vec!["/run".to_string()],
            volumes: BTreeMap::from([
                ("/tmp/b".to_string(), "/mnt/b".to_string()),
                ("/tmp/a".to_string(), "/mnt/a".to_string()),
            ]),
            run_command: vec!["-d".to_string(), "{{ .Image }}".to_string()],
        }
    }

    #[test]
    fn test_run_args_order() {
        let args = run_args(&full_spec()).unwrap();
        assert_eq!(
            args,
            vec![
                "run",
                "--device",
                "/dev/fuse",
                "--cap-add",
                "SYS_ADMIN",
                "--cap-add",
                "NET_ADMIN",
                "--cap-drop",
                "MKNOD",
                "--privileged",
                "--systemd=always",
                "--tmpfs",
                "/run",
                "-v",
                "/tmp/a:/mnt/a",
                "-v",
                "/tmp/b:/mnt/b",
                "-d",
                "base:1.0",
            ]
        );
    }

    #[test]
    fn test_run_args_minimal() {
        let config = BuildConfig::new("alpine");
        let args = run_args(&ContainerSpec::from_config(&config)).unwrap();
        assert_eq!(
            args,
            vec![
                "run",
                "--systemd=true",
                "-d",
                "-i",
                "-t",
                "--entrypoint=/bin/sh",
                "--",
                "alpine"
            ]
        );
    }

    #[test]
    fn test_run_args_bad_template() {
        let spec = ContainerSpec {
            run_command: vec!["{{ .Nope }}".to_string()],
            ..full_spec()
        };
        assert!(run_args(&spec).is_err());
    }

    #[test]
    fn test_commit_args() {
        let changes = vec!["CMD /run.sh".to_string(), "ENV A=b".to_string()];
        assert_eq!(
            commit_args("c1", "me", &changes, "msg"),
            vec![
                "commit", "--author", "me", "--change", "CMD /run.sh", "--change", "ENV A=b",
                "--message", "msg", "c1"
            ]
        );
        assert_eq!(commit_args("c1", "", &[], ""), vec!["commit", "c1"]);
    }

    #[test]
    fn test_login_args_stdin_hides_password() {
        let args = login_args("quay.io", "bob", "s3cret", true);
        assert_eq!(args, vec!["login", "-u", "bob", "--password-stdin", "quay.io"]);
        assert!(!args.iter().any(|a| a == "s3cret"));
    }

    #[test]
    fn test_login_args_flag() {
        let args = login_args("quay.io", "bob", "s3cret", false);
        assert_eq!(args, vec!["login", "-u", "bob", "-p", "s3cret", "quay.io"]);
    }

    #[test]
    fn test_login_args_omit_empty() {
        assert_eq!(login_args("", "", "", true), vec!["login"]);
    }

    #[test]
    fn test_tag_args() {
        assert_eq!(
            tag_args("img", "repo:1", TagForce::Flag),
            vec!["tag", "-f", "img", "repo:1"]
        );
        assert_eq!(
            tag_args("img", "repo:1", TagForce::Ignored),
            vec!["tag", "img", "repo:1"]
        );
    }

    #[test]
    fn test_import_args() {
        let changes = vec!["CMD /bin/sh".to_string()];
        assert_eq!(
            import_args(&changes, "local/img"),
            vec!["import", "--change", "CMD /bin/sh", "-", "local/img"]
        );
        assert_eq!(import_args(&[], ""), vec!["import", "-"]);
    }

    #[test]
    fn test_exec_and_copy_args() {
        assert_eq!(
            exec_args("c1", "apk add curl"),
            vec!["exec", "c1", "/bin/sh", "-c", "apk add curl"]
        );
        assert_eq!(
            copy_args("/tmp/setup.sh", "c1", "/packer-files/setup.sh"),
            vec!["cp", "/tmp/setup.sh", "c1:/packer-files/setup.sh"]
        );
    }

    #[test]
    fn test_inspect_args() {
        assert_eq!(
            inspect_args(INSPECT_ID, "abc"),
            vec!["inspect", "--format", "{{ .Id }}", "abc"]
        );
    }
}
