//! User-facing output handle.

use tracing::debug;

use crate::bus::EventBus;
use crate::types::{Event, OutputStream};

/// Handle used by steps and the runtime driver to report progress.
///
/// Every call publishes an [`Event`] on the underlying bus; the CLI (or any
/// other subscriber) decides how to render it. Cloning is cheap and all
/// clones publish to the same bus.
#[derive(Debug, Clone, Default)]
pub struct Ui {
    bus: EventBus,
}

impl Ui {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn say(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(ui = "say", "{}", message);
        self.emit(Event::Say { message });
    }

    pub fn message(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(ui = "message", "{}", message);
        self.emit(Event::Message { message });
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(ui = "error", "{}", message);
        self.emit(Event::Error { message });
    }

    /// Forward one line of live process output.
    pub fn output(&self, stream: OutputStream, line: impl Into<String>) {
        self.emit(Event::Output {
            stream,
            line: line.into(),
        });
    }

    pub fn emit(&self, event: Event) {
        self.bus.send(event);
    }
}
