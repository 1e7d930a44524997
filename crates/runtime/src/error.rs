use podbake_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{binary} executable not found: {reason}")]
    NotFound { binary: String, reason: String },

    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error {action}: {status}\nStderr: {stderr}")]
    CommandFailed {
        action: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to parse {what}: {output:?}")]
    Parse { what: &'static str, output: String },

    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Template error: {0}")]
    Template(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn command_failed(
        action: impl Into<String>,
        status: impl ToString,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            action: action.into(),
            status: status.to_string(),
            stderr: stderr.into(),
        }
    }

    pub fn parse(what: &'static str, output: impl Into<String>) -> Self {
        Self::Parse {
            what,
            output: output.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Fail with `MissingArgument` when a required argument is empty.
pub(crate) fn require(name: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(RuntimeError::MissingArgument(name))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_includes_stderr() {
        let err = RuntimeError::command_failed(
            "committing container",
            "exit status: 125",
            "Error: no such container abc",
        );
        let text = err.to_string();
        assert!(text.contains("committing container"));
        assert!(text.contains("exit status: 125"));
        assert!(text.contains("no such container abc"));
    }

    #[test]
    fn test_require() {
        assert!(require("id", "abc").is_ok());
        assert!(matches!(
            require("id", "  "),
            Err(RuntimeError::MissingArgument("id"))
        ));
    }
}
