//! Entry point for running one build.

use events::Event;
use podbake_core::{BuildConfig, FinalizeMode};
use tracing::{error, info};

use crate::artifact::{Artifact, Outcome};
use crate::context::{BuildContext, BuildEnv};
use crate::error::Result;
use crate::generated::GENERATED_KEYS;
use crate::runner::StepRunner;
use crate::steps;

/// A validated build configuration, ready to run.
#[derive(Debug, Clone)]
pub struct Builder {
    config: BuildConfig,
    mode: FinalizeMode,
}

impl Builder {
    /// Validate `config`, returning the builder and the names of the values
    /// a build may publish as generated data.
    pub fn prepare(config: BuildConfig) -> Result<(Self, Vec<String>)> {
        config.validate()?;
        let mode = config.finalize_mode()?;
        let keys = GENERATED_KEYS.iter().map(|k| k.to_string()).collect();
        Ok((Self { config, mode }, keys))
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn mode(&self) -> &FinalizeMode {
        &self.mode
    }

    /// Run the pipeline. The runtime executable is checked before any step
    /// starts; the artifact is only produced when no step recorded an error.
    pub async fn run(&self, env: BuildEnv) -> Result<Artifact> {
        env.driver.verify()?;

        let ui = env.ui.clone();
        let mut ctx = BuildContext::new(self.config.clone(), env);
        let mut runner = StepRunner::new(steps::pipeline(&self.mode));

        info!(
            image = %self.config.image,
            mode = self.mode.as_str(),
            steps = ?runner.step_names(),
            "Starting build"
        );
        let outcome = runner.run(&mut ctx).await;

        if let Some(err) = ctx.take_error() {
            error!(outcome = ?outcome, error = %err, "Build failed");
            ui.emit(Event::BuildFinished { success: false });
            return Err(err);
        }

        let artifact = self.assemble(&ctx)?;
        info!(artifact = %artifact, "Build finished");
        ui.emit(Event::BuildFinished { success: true });
        Ok(artifact)
    }

    fn assemble(&self, ctx: &BuildContext) -> Result<Artifact> {
        let outcome = match &self.mode {
            FinalizeMode::Discard => Outcome::Discarded {
                container_id: ctx.container_id()?.to_string(),
            },
            FinalizeMode::Commit => Outcome::Committed {
                image_id: ctx.image_id()?.to_string(),
            },
            FinalizeMode::Export(_) => Outcome::Exported {
                path: ctx.export_path()?.to_path_buf(),
            },
        };
        Ok(Artifact::new(outcome, ctx.generated().clone()))
    }
}
