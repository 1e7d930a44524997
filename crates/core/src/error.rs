use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("No finalization selected: one of discard, commit or export_path must be set")]
    NoFinalization,

    #[error("Conflicting finalization: only one of {0} may be set")]
    ConflictingFinalization(String),

    #[error("Template error in {template:?}: {reason}")]
    Template { template: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ConfigError::MissingField("image");
        assert!(error.to_string().contains("image"));

        let error = ConfigError::template("{{ .Nope }}", "unknown key");
        assert!(error.to_string().contains("Nope"));
        assert!(error.to_string().contains("unknown key"));
    }
}
