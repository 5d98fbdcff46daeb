// Contains post-processors for analyzing simulation results

pub mod summary;

use crate::{
    error::InputError,
    preprocessing::SimulationInput,
    sim::task::SimulationOutput,
};
use std::fs;
use tracing::{info, warn};

pub use summary::RunSummary;

/// Log the outcome of a run, write the summary file if one was requested and
/// remove the snapshot frames if asked to.
pub fn postprocess(
    sim_input: &SimulationInput,
    sim_output: &SimulationOutput,
) -> Result<RunSummary, InputError> {
    let summary = RunSummary::from_output(sim_output);
    summary.log();

    if let Some(path) = &sim_input.summary_path {
        summary.save(path)?;
        info!("Saved run summary to {}", path.display());
    }

    if let Some(settings) = &sim_input.snapshots {
        if settings.discard_frames {
            _ = fs::remove_dir_all(&settings.frames_dir)
                .inspect_err(|err| warn!("Unable to cleanup frames output: {:?}", err));
        }
    }

    Ok(summary)
}
