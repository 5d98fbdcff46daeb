use std::{fs::File, io::BufWriter, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{error::InputError, sim::task::SimulationOutput};

/// Condensed diagnostics of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps_completed: usize,

    /// First step flagged as diverged, if any
    pub diverged_at: Option<u64>,

    /// Highest speed seen over all steps
    pub peak_speed: f32,

    /// Largest speed after the last step
    pub final_max_speed: f32,

    /// Jacobi residual of the last step
    pub final_residual: f32,

    /// Largest pressure in the final field
    pub final_max_pressure: f32,

    /// Mean wall-clock time per step
    pub mean_step_time: Duration,

    /// Slowest step
    pub max_step_time: Duration,
}

impl RunSummary {
    pub fn from_output(output: &SimulationOutput) -> Self {
        let last = output.reports.last();
        let total_time: Duration = output.reports.iter().map(|r| r.elapsed).sum();

        RunSummary {
            steps_completed: output.reports.len(),
            diverged_at: output.reports.iter().find(|r| r.diverged).map(|r| r.step),
            peak_speed: output
                .reports
                .iter()
                .map(|r| r.max_speed)
                .fold(0., f32::max),
            final_max_speed: last.map_or(0., |r| r.max_speed),
            final_residual: last.map_or(0., |r| r.pressure.residual),
            final_max_pressure: output
                .final_fields
                .pressure
                .iter()
                .copied()
                .reduce(f32::max)
                .unwrap_or(0.),
            mean_step_time: u32::try_from(output.reports.len())
                .ok()
                .and_then(|n| total_time.checked_div(n))
                .unwrap_or_default(),
            max_step_time: output
                .reports
                .iter()
                .map(|r| r.elapsed)
                .max()
                .unwrap_or_default(),
        }
    }

    pub fn log(&self) {
        info!(
            "Run summary:\n\n\
        \t steps:        {}\n\
        \t peak speed:   {}\n\
        \t final speed:  {}\n\
        \t residual:     {}\n\
        \t max pressure: {}\n\
        \t step time:    {:?} mean, {:?} max\n\n\
        ",
            self.steps_completed,
            self.peak_speed,
            self.final_max_speed,
            self.final_residual,
            self.final_max_pressure,
            self.mean_step_time,
            self.max_step_time,
        );

        if let Some(step) = self.diverged_at {
            warn!("Simulation diverged at step {}; results are not meaningful", step);
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), InputError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
