//! What a build reports while it runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An [`Event`] stamped with an id and the time it was published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl EventEnvelope {
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Which standard stream a line of process output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// All possible events in a build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // UI events
    /// Top-level progress line
    #[serde(rename = "ui.say")]
    Say { message: String },

    /// Detail line under the current `Say`
    #[serde(rename = "ui.message")]
    Message { message: String },

    /// User-facing error
    #[serde(rename = "ui.error")]
    Error { message: String },

    /// A line streamed live from an external process
    #[serde(rename = "process.output")]
    Output { stream: OutputStream, line: String },

    // Pipeline events
    #[serde(rename = "step.started")]
    StepStarted { step: String },

    #[serde(rename = "step.finished")]
    StepFinished { step: String, halted: bool },

    /// A step's teardown failed; the build continues unwinding
    #[serde(rename = "step.cleanup_failed")]
    CleanupFailed { step: String, error: String },

    #[serde(rename = "build.finished")]
    BuildFinished { success: bool },
}

impl Event {
    /// Get the step name associated with this event, if any
    pub fn step(&self) -> Option<&str> {
        match self {
            Event::StepStarted { step } => Some(step),
            Event::StepFinished { step, .. } => Some(step),
            Event::CleanupFailed { step, .. } => Some(step),
            _ => None,
        }
    }
}
