//! Container runtime driver.
//!
//! [`Driver`] is the seam the build pipeline talks to. [`PodmanDriver`]
//! invokes the `podman` executable; with the `test-util` feature,
//! [`FakeDriver`] records calls in memory instead.

pub mod args;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod podman;
pub mod process;
pub mod traits;
pub mod version;

pub use args::ContainerSpec;
pub use error::{Result, RuntimeError};
#[cfg(any(test, feature = "test-util"))]
pub use fake::{FakeDriver, Invocation};
pub use podman::PodmanDriver;
pub use process::Process;
pub use traits::{parse_json_list, Driver, LoginSession, SessionLock, Sink};
pub use version::{password_via_stdin, tag_force_flag, RuntimeVersion, TagForce};
