//! Concrete build steps, in pipeline order.

mod cleanup_temp_keys;
mod commit;
mod connect;
mod export;
mod provision;
mod pull;
mod run_container;
mod set_defaults;
mod set_generated_data;
mod temp_dir;

pub use cleanup_temp_keys::CleanupTempKeysStep;
pub use commit::CommitStep;
pub use connect::ConnectStep;
pub use export::ExportStep;
pub use provision::ProvisionStep;
pub use pull::PullStep;
pub use run_container::RunContainerStep;
pub use set_defaults::SetDefaultsStep;
pub use set_generated_data::SetGeneratedDataStep;
pub use temp_dir::TempDirStep;

use podbake_core::FinalizeMode;
use tracing::debug;

use crate::hooks::HookEvent;
use crate::step::Step;

/// Assemble the pipeline for a finalization mode.
pub fn pipeline(mode: &FinalizeMode) -> Vec<Box<dyn Step>> {
    let mut steps: Vec<Box<dyn Step>> = vec![
        Box::new(TempDirStep::default()),
        Box::new(PullStep),
        Box::new(RunContainerStep::default()),
        Box::new(ConnectStep),
        Box::new(ProvisionStep::new(HookEvent::Provision)),
        Box::new(CleanupTempKeysStep),
    ];

    match mode {
        FinalizeMode::Discard => {
            debug!("Container will be discarded");
        }
        FinalizeMode::Commit => {
            debug!("Container will be committed");
            steps.push(Box::new(SetDefaultsStep));
            steps.push(Box::new(CommitStep));
            steps.push(Box::new(SetGeneratedDataStep));
        }
        FinalizeMode::Export(path) => {
            debug!(path = %path.display(), "Container will be exported");
            steps.push(Box::new(ExportStep::default()));
        }
    }

    steps.push(Box::new(ProvisionStep::new(HookEvent::PostFinalize)));
    steps
}
