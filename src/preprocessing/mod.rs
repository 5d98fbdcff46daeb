use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::InputError,
    preprocessing::serial_mask::SerialMask,
    sim::{
        field::ObstacleMask,
        setup::{FlowSetup, Inflow, SolverParams},
    },
};

pub mod cli;
pub mod preprocessor;
pub mod serial_mask;

/// Where and how often field snapshots are written while solving
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SnapshotSettings {
    pub frames_dir: PathBuf,

    /// Write a snapshot after every `every`-th step
    pub every: usize,

    /// Remove the frames directory once the run has been summarised
    #[serde(default)]
    pub discard_frames: bool,
}

/// Everything needed to run a simulation from start to finish.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SimulationInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<SerialMask>, // may be None when saved, but needs to be loaded to solve
    pub solver: SolverParams,
    pub steps: usize,

    #[serde(default)]
    pub inflow: Option<Inflow>,

    #[serde(default)]
    pub snapshots: Option<SnapshotSettings>,

    #[serde(default)]
    pub summary_path: Option<PathBuf>,
}

impl SimulationInput {
    pub fn get_mask(&self) -> Result<ObstacleMask, InputError> {
        let mask = self.mask.as_ref().ok_or(InputError::MissingMask)?;
        Ok(mask.to_mask()?)
    }

    /// The initial conditions handed to [`Navier::initialize`](crate::sim::navier::Navier::initialize)
    pub fn flow_setup(&self) -> Result<FlowSetup, InputError> {
        let mut setup = FlowSetup::new(self.get_mask()?);
        setup.inflow = self.inflow;
        Ok(setup)
    }

    pub fn log(&self) {
        let (width, height) = match self.get_mask() {
            Ok(mask) => (mask.grid().width(), mask.grid().height()),
            Err(_) => (0, 0),
        };

        info!(
            "Simulation is shown below:\n\n\
        \t grid:       {} x {}\n\
        \t steps:      {}\n\
        \t reynolds:   {}\n\
        \t dt:         {}\n\
        \t sweeps:     {}\n\
        \t limit:      {} (max speed)\n\
        \t inflow:     {:?}\n\n\
        ",
            width,
            height,
            self.steps,
            self.solver.reynolds,
            self.solver.dt,
            self.solver.jacobi_sweeps,
            self.solver.divergence_limit,
            self.inflow,
        );

        if let Some(snapshots) = &self.snapshots {
            if let Ok(snapshot_str) = serde_json::to_string_pretty(snapshots) {
                info!("Snapshot parameters are:\n\n{}", snapshot_str);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{preprocessing::preprocessor::channel_mask, sim::setup::Side};

    fn sample_input() -> SimulationInput {
        SimulationInput {
            mask: Some(SerialMask::from_mask(&channel_mask(12, 8).unwrap())),
            solver: SolverParams::default(),
            steps: 10,
            inflow: Some(Inflow::left(1, 6, (2., 0.))),
            snapshots: None,
            summary_path: None,
        }
    }

    #[test]
    fn test_input_json_round_trip() {
        let input = sample_input();

        let json = serde_json::to_string_pretty(&input).unwrap();
        let loaded: SimulationInput = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.steps, 10);
        assert_eq!(loaded.solver, input.solver);
        assert_eq!(loaded.inflow.unwrap().side, Side::Left);
        assert_eq!(loaded.get_mask().unwrap(), input.get_mask().unwrap());
    }

    #[test]
    fn test_flow_setup_needs_mask() {
        let mut input = sample_input();
        assert_eq!(input.flow_setup().unwrap().grid().width(), 12);

        input.mask = None;
        assert!(matches!(input.flow_setup(), Err(InputError::MissingMask)));
    }

    #[test]
    fn test_optional_sections_default() {
        let json = r#"{
            "mask": {"data": [0,0,0,0,0,0,0,0,0], "nrows": 3, "ncols": 3},
            "solver": {"reynolds": 10.0, "dt": 0.05},
            "steps": 3
        }"#;

        let input: SimulationInput = serde_json::from_str(json).unwrap();

        assert!(input.inflow.is_none());
        assert!(input.snapshots.is_none());
        assert!(input.summary_path.is_none());
        assert_eq!(input.solver.jacobi_sweeps, 4);
    }
}
