//! Build configuration for podbake.
//!
//! The configuration is created once, validated, and then handed to the
//! orchestrator. Parsing happens at the edges (the CLI reads TOML); this crate
//! only owns the data model, finalization-mode selection and run-command
//! templating.

pub mod config;
pub mod error;
pub mod template;

pub use config::{
    redacted, BuildConfig, CommunicatorKind, FinalizeMode, SystemdMode, DEFAULT_CONTAINER_DIR,
};
pub use error::{ConfigError, Result};
pub use template::TemplateData;
