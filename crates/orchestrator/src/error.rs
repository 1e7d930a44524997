use podbake_core::ConfigError;
use runtime::RuntimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// A step asked for state no earlier step produced
    #[error("Missing build state: {0}")]
    MissingState(&'static str),

    #[error("Build cancelled")]
    Cancelled,

    #[error("Build halted by step {0}")]
    Halted(String),

    #[error("Hook {event} failed: {reason}")]
    Hook { event: String, reason: String },

    #[error("Communicator error: {0}")]
    Communicator(String),

    #[error("Post-processor {processor} cannot handle artifact: {reason}")]
    UnsupportedArtifact {
        processor: &'static str,
        reason: String,
    },

    #[error("Step {step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<BuildError>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Attribute an error to the step that raised it. Cancellation is left
    /// as is so callers can match on it.
    pub fn in_step(step: &'static str, error: BuildError) -> Self {
        match error {
            Self::Cancelled | Self::Step { .. } => error,
            other => Self::Step {
                step,
                source: Box::new(other),
            },
        }
    }

    pub fn hook(event: impl ToString, reason: impl ToString) -> Self {
        Self::Hook {
            event: event.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unsupported(processor: &'static str, reason: impl Into<String>) -> Self {
        Self::UnsupportedArtifact {
            processor,
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The innermost error, looking through step attribution
    pub fn root(&self) -> &BuildError {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_keeps_stderr() {
        let err = BuildError::in_step(
            "commit",
            RuntimeError::command_failed(
                "committing container",
                "exit status: 125",
                "Error: no such container",
            )
            .into(),
        );
        let text = err.to_string();
        assert!(text.starts_with("Step commit failed"));
        assert!(text.contains("Error: no such container"));
        assert!(matches!(err.root(), BuildError::Runtime(_)));
    }

    #[test]
    fn test_cancel_not_wrapped() {
        assert!(BuildError::in_step("pull", BuildError::Cancelled).is_cancelled());
    }
}
