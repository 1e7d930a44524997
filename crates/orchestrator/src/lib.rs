//! Build orchestration for podbake.
//!
//! A [`Builder`] turns a validated [`BuildConfig`](podbake_core::BuildConfig)
//! into an ordered list of [`Step`]s and runs them with a [`StepRunner`]
//! against one [`BuildContext`]. Steps talk to the container runtime through
//! the [`Driver`](runtime::Driver) in the context and to the running
//! container through a [`Communicator`]. Every started step is cleaned up in
//! reverse order whether the build succeeds or not; an [`Artifact`] is only
//! produced when no step failed.

pub mod artifact;
pub mod builder;
pub mod communicator;
pub mod context;
pub mod error;
pub mod generated;
pub mod hooks;
pub mod post;
pub mod runner;
pub mod step;
pub mod steps;

pub use artifact::{Artifact, Outcome, BUILDER_ID};
pub use builder::Builder;
pub use communicator::{Communicator, ConnectTarget, Connection, Connector, ExecConnector};
pub use context::{BuildContext, BuildEnv};
pub use error::{BuildError, Result};
pub use generated::{GeneratedData, IMAGE_SHA256};
pub use hooks::{Hook, HookEvent, NoopHook, ShellProvisioner};
pub use post::PostProcessor;
pub use runner::{RunOutcome, StepRunner};
pub use step::{Step, StepAction};
