//! Post-processors that act on a finished build's [`Artifact`].

mod import;
mod push;
mod save;
mod tag;

pub use import::ImportPostProcessor;
pub use push::PushPostProcessor;
pub use save::SavePostProcessor;
pub use tag::TagPostProcessor;

use async_trait::async_trait;
use events::Ui;
use runtime::Driver;

use crate::artifact::Artifact;
use crate::error::Result;

#[async_trait]
pub trait PostProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Consume an artifact and return the one downstream processors see.
    async fn process(&self, artifact: Artifact, driver: &dyn Driver, ui: &Ui) -> Result<Artifact>;
}

/// Run processors in order, each on the previous one's output.
pub async fn run_all(
    processors: &[Box<dyn PostProcessor>],
    mut artifact: Artifact,
    driver: &dyn Driver,
    ui: &Ui,
) -> Result<Artifact> {
    for processor in processors {
        ui.say(format!("Running post-processor: {}", processor.name()));
        artifact = processor.process(artifact, driver, ui).await?;
    }
    Ok(artifact)
}
