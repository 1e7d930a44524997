//! Event system for podbake
//!
//! This crate provides the event bus, the build event types, and the [`Ui`]
//! handle through which steps and the runtime driver report progress.

mod bus;
mod types;
mod ui;

pub use bus::EventBus;
pub use types::*;
pub use ui::Ui;
