use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
    sync::LazyLock,
};

use clap::Parser;
use tracing::info;

use crate::{
    error::InputError,
    preprocessing::{
        SimulationInput, SnapshotSettings,
        preprocessor::{channel_mask, mask_from_image},
        serial_mask::SerialMask,
    },
    sim::{
        field::ObstacleMask,
        poisson::DEFAULT_JACOBI_SWEEPS,
        setup::{DEFAULT_DIVERGENCE_LIMIT, Inflow, SolverParams},
    },
};

static DEFAULT_FRAMES_PATH: LazyLock<&Path> = LazyLock::new(|| Path::new("sim-frames"));

// Raw, CLI input
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    #[arg(help = "The path to a PNG image whose dark pixels mark obstacles.")]
    mask_path: Option<PathBuf>,

    #[arg(long, help = "An input file with pre-loaded parameters.")]
    input_json: Option<PathBuf>,

    #[arg(long, help = "Optional path to save the effective input file to.")]
    pub input_json_savepath: Option<PathBuf>,

    #[arg(
        long,
        default_value = "200",
        help = "Grid width of the built-in channel, used when no mask image is given."
    )]
    width: usize,

    #[arg(
        long,
        default_value = "200",
        help = "Grid height of the built-in channel, used when no mask image is given."
    )]
    height: usize,

    #[arg(long, help = "Do not mark the outer ring of a mask image as walls.")]
    no_walls: bool,

    #[arg(
        long,
        help = "An optional directory where field snapshots should be saved."
    )]
    frames_dir: Option<PathBuf>,

    #[arg(
        long,
        default_value = "0",
        help = "Write a snapshot every N steps; 0 disables snapshots."
    )]
    snapshot_every: usize,

    #[arg(long, help = "Delete the snapshots once the run has been summarised.")]
    discard_frames: bool,

    #[arg(long, help = "Optional path for a JSON summary of the run.")]
    summary_path: Option<PathBuf>,

    #[arg(long, help = "Inflow x velocity along the left wall.", default_value = "5.0")]
    inflow_x: f32,

    #[arg(long, help = "Inflow y velocity along the left wall.", default_value = "0.0")]
    inflow_y: f32,

    #[arg(short, long, default_value = "500", help = "Number of timesteps.")]
    steps: usize,

    #[arg(long, default_value = "100.0", help = "Reynolds number")]
    reynolds: f32,

    #[arg(long, default_value = "0.1", help = "Timestep")]
    dt: f32,

    #[arg(long, default_value_t = DEFAULT_JACOBI_SWEEPS, help = "Jacobi sweeps per step")]
    sweeps: usize,

    #[arg(
        long,
        default_value_t = DEFAULT_DIVERGENCE_LIMIT,
        help = "Speed above which the run is reported as diverged"
    )]
    divergence_limit: f32,
}

impl CliArgs {
    pub fn crate_input(&self) -> Result<SimulationInput, InputError> {
        // if the input file is supplied, just use that
        if let Some(input_filepath) = &self.input_json {
            return self.load_input(input_filepath);
        }

        // otherwise, build the input from the other arguments
        let mask = self.load_mask()?;
        let height = mask.grid().height();

        let snapshots = (self.snapshot_every > 0).then(|| SnapshotSettings {
            frames_dir: self
                .frames_dir
                .clone()
                .unwrap_or_else(|| (*DEFAULT_FRAMES_PATH).into()),
            every: self.snapshot_every,
            discard_frames: self.discard_frames,
        });

        let solver = SolverParams {
            reynolds: self.reynolds,
            dt: self.dt,
            jacobi_sweeps: self.sweeps,
            divergence_limit: self.divergence_limit,
        };
        solver.validate()?;

        Ok(SimulationInput {
            mask: Some(SerialMask::from_mask(&mask)),
            solver,
            steps: self.steps,
            inflow: Some(Inflow::left(
                1,
                height - 2,
                (self.inflow_x, self.inflow_y),
            )),
            snapshots,
            summary_path: self.summary_path.clone(),
        })
    }

    fn load_input(&self, input_filepath: &Path) -> Result<SimulationInput, InputError> {
        if input_filepath.is_dir() {
            return Err(InputError::InvalidArgument(format!(
                "input file {} is a directory",
                input_filepath.display()
            )));
        }

        info!("Using input file {}", input_filepath.display());

        let reader = BufReader::new(File::open(input_filepath)?);
        let mut loaded_input: SimulationInput = serde_json::from_reader(reader)?;
        loaded_input.solver.validate()?;

        if loaded_input.mask.is_none() {
            if self.mask_path.is_none() {
                return Err(InputError::MissingMask);
            }
            loaded_input.mask = Some(SerialMask::from_mask(&self.load_mask()?));
        }

        Ok(loaded_input)
    }

    fn load_mask(&self) -> Result<ObstacleMask, InputError> {
        match &self.mask_path {
            Some(mask_path) => {
                let mut mask = mask_from_image(mask_path)?;
                if !self.no_walls {
                    mask.mark_walls();
                }
                Ok(mask)
            }
            None => {
                info!(
                    "No mask image given; using a {}x{} channel",
                    self.width, self.height
                );
                Ok(channel_mask(self.width, self.height)?)
            }
        }
    }
}

/// Write `input` as pretty JSON to `path`.
pub fn save_input(input: &SimulationInput, path: &Path) -> Result<(), InputError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, input)?;
    info!("Saved input file to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build_channel_input() {
        let args = CliArgs::parse_from(["navier-jacobi", "--width", "20", "--height", "10"]);
        let input = args.crate_input().unwrap();

        let mask = input.get_mask().unwrap();
        assert_eq!((mask.grid().width(), mask.grid().height()), (20, 10));
        assert_eq!(input.steps, 500);
        assert_eq!(input.solver.jacobi_sweeps, DEFAULT_JACOBI_SWEEPS);
        assert_eq!(input.inflow, Some(Inflow::left(1, 8, (5., 0.))));
        assert!(input.snapshots.is_none());
    }

    #[test]
    fn test_snapshot_flags() {
        let args = CliArgs::parse_from([
            "navier-jacobi",
            "--width",
            "8",
            "--height",
            "8",
            "--snapshot-every",
            "5",
            "--frames-dir",
            "out",
            "--discard-frames",
        ]);
        let snapshots = args.crate_input().unwrap().snapshots.unwrap();

        assert_eq!(snapshots.every, 5);
        assert_eq!(snapshots.frames_dir, PathBuf::from("out"));
        assert!(snapshots.discard_frames);
    }

    #[test]
    fn test_snapshots_kept_by_default() {
        let args = CliArgs::parse_from(["navier-jacobi", "--width", "8", "--snapshot-every", "2"]);
        let snapshots = args.crate_input().unwrap().snapshots.unwrap();

        assert!(!snapshots.discard_frames);
    }

    #[test]
    fn test_rejects_bad_solver_params() {
        let args = CliArgs::parse_from(["navier-jacobi", "--width", "8", "--dt=0"]);

        assert!(matches!(args.crate_input(), Err(InputError::Sim(_))));
    }

    #[test]
    fn test_input_json_save_and_load() {
        let path = std::env::temp_dir().join(format!("navier-input-{}.json", std::process::id()));

        let args = CliArgs::parse_from(["navier-jacobi", "--width", "9", "--height", "7", "-s", "3"]);
        let input = args.crate_input().unwrap();
        save_input(&input, &path).unwrap();

        let args = CliArgs::parse_from([
            "navier-jacobi",
            "--input-json",
            path.to_str().unwrap(),
        ]);
        let loaded = args.crate_input().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.steps, 3);
        assert_eq!(loaded.get_mask().unwrap(), input.get_mask().unwrap());
    }
}
