// Writes field snapshots to disk off the solver thread

use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
    sync::mpsc,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::InputError, sim::navier::Navier};

/// A copy of the current fields, taken between steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub step: u64,
    pub width: usize,
    pub height: usize,

    /// Row-major `[x, y]` velocity per cell
    pub velocity: Vec<[f32; 2]>,

    /// Row-major pressure per cell
    pub pressure: Vec<f32>,

    /// Row-major obstacle flags, 1 for a fixed cell
    pub obstacles: Vec<u8>,
}

impl FieldSnapshot {
    pub fn capture(sim: &Navier) -> Self {
        let grid = sim.grid();

        FieldSnapshot {
            step: sim.step_count(),
            width: grid.width(),
            height: grid.height(),
            velocity: sim.velocity_field().iter().map(|u| [u.x, u.y]).collect(),
            pressure: sim.pressure_field().to_vec(),
            obstacles: sim.obstacles().as_slice().iter().map(|b| *b as u8).collect(),
        }
    }
}

/// Save one snapshot as `<frames_dir>/<step>.json`.
pub fn snapshot_save(snapshot: &FieldSnapshot, frames_dir: &Path) -> Result<(), InputError> {
    let filename = frames_dir.join(format!("{}.json", snapshot.step));
    let writer = BufWriter::new(File::create(filename)?);
    serde_json::to_writer(writer, snapshot)?;
    Ok(())
}

/// Create `frames_dir` for a new run. An existing directory is only accepted
/// when it is empty; its contents are never removed.
pub fn prepare_frames_dir(frames_dir: &Path) -> Result<(), InputError> {
    if frames_dir.exists() {
        if fs::read_dir(frames_dir)?.next().is_some() {
            return Err(InputError::FramesDirNotEmpty(frames_dir.to_path_buf()));
        }
        return Ok(());
    }

    fs::create_dir_all(frames_dir)?;
    Ok(())
}

/// Receive snapshots until the sending side hangs up, writing each to
/// `frames_dir`, which must already exist.
///
/// Returns the number of snapshots written.
pub fn snapshot_io_loop(
    inbound: mpsc::Receiver<FieldSnapshot>,
    frames_dir: &Path,
) -> Result<usize, InputError> {
    let mut written = 0;
    for snapshot in inbound {
        snapshot_save(&snapshot, frames_dir)?;
        debug!(step = snapshot.step, "snapshot written");
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::sim::{
        field::{Grid, ObstacleMask},
        setup::{FlowSetup, Inflow, SolverParams},
    };

    #[test]
    fn test_io_loop_writes_until_hangup() {
        let frames_dir = std::env::temp_dir().join(format!("navier-frames-{}", std::process::id()));

        let setup = FlowSetup::new(ObstacleMask::with_walls(Grid::new(6, 5).unwrap()))
            .with_inflow(Inflow::left(1, 3, (1., 0.)));
        let mut sim = Navier::from_setup(SolverParams::default(), &setup).unwrap();

        prepare_frames_dir(&frames_dir).unwrap();
        let (sender, receiver) = mpsc::channel();
        let dir = frames_dir.clone();
        let writer = thread::spawn(move || snapshot_io_loop(receiver, &dir));

        for _ in 0..3 {
            sim.step().unwrap();
            sender.send(FieldSnapshot::capture(&sim)).unwrap();
        }
        drop(sender);

        assert_eq!(writer.join().unwrap().unwrap(), 3);

        let file = File::open(frames_dir.join("2.json")).unwrap();
        let loaded: FieldSnapshot = serde_json::from_reader(file).unwrap();
        fs::remove_dir_all(&frames_dir).unwrap();

        assert_eq!(loaded.step, 2);
        assert_eq!((loaded.width, loaded.height), (6, 5));
        assert_eq!(loaded.velocity.len(), 30);
        assert_eq!(loaded.velocity[6], [1., 0.]);
        assert_eq!(loaded.pressure.len(), 30);
        assert_eq!(loaded.obstacles.len(), 30);
        assert_eq!(loaded.obstacles[0], 1);
        assert_eq!(loaded.obstacles[7], 0);
    }

    #[test]
    fn test_prepare_refuses_non_empty_dir() {
        let frames_dir = std::env::temp_dir().join(format!("navier-keep-{}", std::process::id()));
        fs::create_dir_all(&frames_dir).unwrap();
        let precious = frames_dir.join("notes.txt");
        fs::write(&precious, "keep me").unwrap();

        let result = prepare_frames_dir(&frames_dir);
        let still_there = precious.exists();
        fs::remove_dir_all(&frames_dir).unwrap();

        assert!(matches!(result, Err(InputError::FramesDirNotEmpty(_))));
        assert!(still_there);
    }

    #[test]
    fn test_prepare_accepts_empty_or_missing_dir() {
        let frames_dir = std::env::temp_dir().join(format!("navier-fresh-{}", std::process::id()));

        prepare_frames_dir(&frames_dir).unwrap();
        assert!(frames_dir.is_dir());

        // reusing the now empty directory is fine
        prepare_frames_dir(&frames_dir).unwrap();
        fs::remove_dir_all(&frames_dir).unwrap();
    }
}
