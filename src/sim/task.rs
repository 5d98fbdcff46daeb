// Task runner for the solver thread

use std::{
    sync::mpsc,
    thread::{self, JoinHandle},
};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::{
    error::InputError,
    observers::snapshot::{self, FieldSnapshot},
    preprocessing::SimulationInput,
    sim::navier::{Navier, StepReport},
};

pub struct SimulationOutput {
    /// One report per completed step
    pub reports: Vec<StepReport>,

    /// The fields after the last completed step
    pub final_fields: FieldSnapshot,

    /// Snapshots written by the observer thread
    pub snapshots_written: usize,
}

/// Hands a snapshot to the writer thread every `every` steps, until the
/// writer hangs up.
struct SnapshotSender {
    channel: Option<mpsc::Sender<FieldSnapshot>>,
    every: u64,
}

impl SnapshotSender {
    /// Send a snapshot if one is due after `step`. `capture` is only called
    /// when the snapshot will actually be sent. Returns whether it was sent.
    fn offer(&mut self, step: u64, capture: impl FnOnce() -> FieldSnapshot) -> bool {
        let Some(channel) = &self.channel else {
            return false;
        };
        if step % self.every != 0 {
            return false;
        }

        let sent = channel.send(capture()).is_ok();
        if !sent {
            warn!(step, "Snapshot writer stopped; no further snapshots will be saved");
            self.channel = None;
        }
        sent
    }
}

fn progress_bar(steps: usize) -> ProgressBar {
    let bar = ProgressBar::new(steps as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "[Elapsed: {elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} steps (Remaining: {eta_precise})",
    ) {
        bar.set_style(style.progress_chars("##-"));
    }
    bar
}

/// Run the whole simulation described by `simulation_input` on the calling thread.
///
/// Stops early if a step reports divergence. Snapshots, when configured, are
/// handed to a separate writer thread after each completed step.
pub fn run(simulation_input: &SimulationInput) -> Result<SimulationOutput, InputError> {
    let setup = simulation_input.flow_setup()?;
    let mut sim = Navier::from_setup(simulation_input.solver, &setup)?;

    // spawn snapshot io thread
    let (mut sender, writer) = match &simulation_input.snapshots {
        Some(settings) if settings.every > 0 => {
            snapshot::prepare_frames_dir(&settings.frames_dir)?;

            let (sender, receiver) = mpsc::channel();
            let frames_dir = settings.frames_dir.clone();
            let writer =
                thread::spawn(move || snapshot::snapshot_io_loop(receiver, &frames_dir));
            let sender = SnapshotSender {
                channel: Some(sender),
                every: settings.every as u64,
            };
            (Some(sender), Some(writer))
        }
        _ => (None, None),
    };

    let bar = progress_bar(simulation_input.steps);
    let mut reports = Vec::with_capacity(simulation_input.steps);

    for _ in 0..simulation_input.steps {
        let report = sim.step()?;
        bar.inc(1);

        if let Some(sender) = &mut sender {
            sender.offer(report.step, || FieldSnapshot::capture(&sim));
        }

        reports.push(report);
        if report.diverged {
            break;
        }
    }
    bar.finish();

    // hang up so the writer drains and exits
    drop(sender);
    let snapshots_written = match writer {
        Some(handle) => handle
            .join()
            .map_err(|_| InputError::ThreadPanicked("snapshot writer"))??,
        None => 0,
    };

    info!(
        steps = reports.len(),
        snapshots = snapshots_written,
        "simulation finished"
    );

    Ok(SimulationOutput {
        reports,
        final_fields: FieldSnapshot::capture(&sim),
        snapshots_written,
    })
}

/// Spawns the simulation thread and starts the corresponding task
pub fn spawn_sim_thread(
    simulation_input: SimulationInput,
) -> JoinHandle<Result<SimulationOutput, InputError>> {
    thread::spawn(move || run(&simulation_input))
}
