//! Spawning the runtime executable and collecting its output.

use events::{OutputStream, Ui};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Result, RuntimeError};
use crate::traits::Sink;

/// Runs one executable with different argument vectors.
#[derive(Debug, Clone)]
pub struct Process {
    binary: PathBuf,
}

impl Process {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command_line(&self, args: &[String]) -> String {
        format!("{} {}", self.binary.display(), args.join(" "))
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd
    }

    fn spawn_error(&self, args: &[String], source: std::io::Error) -> RuntimeError {
        RuntimeError::Spawn {
            command: self.command_line(args),
            source,
        }
    }

    /// Run to completion, returning stdout. A non-zero exit is reported
    /// with the captured stderr.
    pub async fn capture(&self, action: &str, args: &[String]) -> Result<String> {
        debug!(command = %self.command_line(args), "Running");

        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(args, e))?;

        if !output.status.success() {
            return Err(RuntimeError::command_failed(
                action,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run to completion while forwarding both output streams to the UI
    /// line by line. `stdin`, when given, is written and then closed.
    pub async fn stream(
        &self,
        action: &str,
        args: &[String],
        stdin: Option<&str>,
        ui: &Ui,
    ) -> Result<()> {
        debug!(command = %self.command_line(args), "Running with live output");

        let mut child = self
            .command(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(args, e))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
            pipe.shutdown().await?;
            // Dropping the handle closes the pipe: end of input
            drop(pipe);
        }

        let stdout = child
            .stdout
            .take()
            .map(|out| forward_lines(out, OutputStream::Stdout, ui.clone()));
        let stderr = child
            .stderr
            .take()
            .map(|err| forward_lines(err, OutputStream::Stderr, ui.clone()));

        let status = child.wait().await?;

        if let Some(handle) = stdout {
            let _ = handle.await;
        }
        let stderr_text = match stderr {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(RuntimeError::command_failed(
                action,
                status,
                stderr_text.trim_end(),
            ));
        }

        Ok(())
    }

    /// Copy the process's stdout into `sink` while stderr is collected
    /// separately for error reporting.
    pub async fn stream_to(&self, action: &str, args: &[String], sink: Sink<'_>) -> Result<()> {
        debug!(command = %self.command_line(args), "Running with stdout to sink");

        let mut child = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(args, e))?;

        let stderr = child.stderr.take().map(collect);

        let copied = match child.stdout.take() {
            Some(mut stdout) => tokio::io::copy(&mut stdout, &mut *sink).await,
            None => Ok(0),
        };

        let status = child.wait().await?;
        let stderr_text = match stderr {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(RuntimeError::command_failed(
                action,
                status,
                stderr_text.trim_end(),
            ));
        }

        let bytes = copied?;
        sink.flush().await?;
        debug!(bytes, "Stream copied");
        Ok(())
    }

    /// Feed `input` to the process's stdin from a background task while the
    /// foreground waits for the process. Returns stdout.
    pub async fn feed<R>(&self, action: &str, args: &[String], mut input: R) -> Result<String>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        debug!(command = %self.command_line(args), "Running with piped input");

        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(args, e))?;

        let transfer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                let copied = tokio::io::copy(&mut input, &mut stdin).await;
                // The only close of stdin; the runtime waits for it
                drop(stdin);
                copied
            })
        });

        let output = child.wait_with_output().await?;

        let transferred = match transfer {
            Some(handle) => handle
                .await
                .map_err(std::io::Error::other)?,
            None => Ok(0),
        };

        if !output.status.success() {
            return Err(RuntimeError::command_failed(
                action,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end(),
            ));
        }

        let bytes = transferred?;
        debug!(bytes, "Input transferred");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn forward_lines<R>(reader: R, stream: OutputStream, ui: Ui) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut collected = String::new();
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        // Drain to EOF even past undecodable bytes, or the child gets SIGPIPE
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    collected.push_str(line);
                    collected.push('\n');
                    ui.output(stream, line);
                }
                Err(e) => {
                    debug!(error = %e, "Output stream read failed");
                    break;
                }
            }
        }
        collected
    })
}

fn collect<R>(mut reader: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut raw = Vec::new();
        if let Err(e) = reader.read_to_end(&mut raw).await {
            debug!(error = %e, "Stderr read failed");
        }
        String::from_utf8_lossy(&raw).into_owned()
    })
}
