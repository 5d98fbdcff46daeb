// Navier-Stokes timestepping struct

use std::time::{Duration, Instant};

use na::Vector2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{SimError, SimResult},
    sim::{
        field::{BufferPair, Grid, ObstacleMask},
        momentum,
        numeric::FieldElement,
        poisson::{self, JacobiReport},
        setup::{FlowSetup, SolverParams},
    },
};

/// Outcome of a single [`Navier::step`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// 1-based index of the step that produced this report
    pub step: u64,

    /// Diagnostics of the pressure relaxation
    pub pressure: JacobiReport,

    /// Largest velocity magnitude in the field after the step
    pub max_speed: f32,

    /// Whether the field holds non-finite values or exceeds the divergence limit
    pub diverged: bool,

    /// Wall-clock time spent in the step
    pub elapsed: Duration,
}

/// High-level simulation object. Owns every field buffer and advances them
/// one explicit step at a time.
///
/// A step is a velocity update followed by a pressure update, in that order.
/// Results are only observable through the read accessors once the step has
/// returned, since stepping borrows the simulator mutably.
pub struct Navier {
    /// The shape of the domain
    grid: Grid,

    /// Numerical parameters
    params: SolverParams,

    /// The velocity field
    velocity: BufferPair<Vector2<f32>>,

    /// The pressure field
    pressure: BufferPair<f32>,

    /// Scratch buffer for the pressure source term
    source: Vec<f32>,

    /// Cells excluded from every update
    obstacles: ObstacleMask,

    /// Steps taken since the last `initialize`
    step: u64,

    /// First step that reported divergence, if any
    diverged_at: Option<u64>,
}

impl Navier {
    /// Create a simulator at rest on `grid`, with no obstacles.
    ///
    /// Parameters
    /// - `grid` - The domain; every buffer is allocated to its size once
    /// - `params` - The solver parameters, validated here
    pub fn new(grid: Grid, params: SolverParams) -> SimResult<Self> {
        params.validate()?;

        debug!(
            width = grid.width(),
            height = grid.height(),
            "allocating simulation buffers"
        );

        Ok(Navier {
            grid,
            params,
            velocity: BufferPair::filled(grid.len(), Vector2::zeros()),
            pressure: BufferPair::filled(grid.len(), 0.),
            source: vec![0.; grid.len()],
            obstacles: ObstacleMask::new(grid),
            step: 0,
            diverged_at: None,
        })
    }

    /// Create a simulator sized to `setup`'s obstacle mask and initialize it.
    pub fn from_setup(params: SolverParams, setup: &FlowSetup) -> SimResult<Self> {
        let mut sim = Navier::new(setup.grid(), params)?;
        sim.initialize(setup)?;
        Ok(sim)
    }

    /// Reset the simulation: zero velocity and pressure, apply the inflow and
    /// install the obstacle mask. Buffers are reused, never reallocated.
    ///
    /// Fails without touching any state if the mask or inflow does not fit the grid.
    pub fn initialize(&mut self, setup: &FlowSetup) -> SimResult<()> {
        let grid = setup.grid();
        if grid != self.grid {
            return Err(SimError::ShapeMismatch {
                expected_width: self.grid.width(),
                expected_height: self.grid.height(),
                width: grid.width(),
                height: grid.height(),
            });
        }
        let inflow_cells = match &setup.inflow {
            Some(inflow) => inflow.cells(self.grid)?,
            None => Vec::new(),
        };

        self.velocity.fill(Vector2::zeros());
        self.pressure.fill(0.);
        self.source.fill(0.);

        if let Some(inflow) = &setup.inflow {
            let (ux, uy) = inflow.velocity;
            for index in inflow_cells {
                self.velocity.set_both(index, Vector2::new(ux, uy));
            }
        }

        self.obstacles.clone_from(&setup.obstacles);
        self.step = 0;
        self.diverged_at = None;

        info!(
            obstacles = self.obstacles.count(),
            inflow = ?setup.inflow,
            "simulation initialized"
        );

        Ok(())
    }

    /// Advance the simulation by one timestep.
    ///
    /// The returned report flags numerical divergence; the simulator keeps
    /// stepping if asked to, it never stops on its own.
    pub fn step(&mut self) -> SimResult<StepReport> {
        let SolverParams {
            reynolds,
            dt,
            jacobi_sweeps,
            divergence_limit,
        } = self.params;

        let started = Instant::now();

        self.velocity.swap();
        momentum::update_velocity(
            &mut self.velocity,
            self.pressure.current(),
            &self.obstacles,
            reynolds,
            dt,
        )?;

        let pressure = poisson::update_pressure(
            &mut self.pressure,
            &mut self.source,
            self.velocity.current(),
            &self.obstacles,
            reynolds,
            jacobi_sweeps,
        )?;

        self.step += 1;

        let max_speed = self
            .velocity
            .current()
            .par_iter()
            .map(|u| u.norm())
            .reduce(|| 0., f32::max);
        let finite = self.velocity.current().par_iter().all(FieldElement::is_finite)
            && self.pressure.current().par_iter().all(|p| p.is_finite());
        let diverged = !finite || max_speed > divergence_limit;

        if diverged && self.diverged_at.is_none() {
            warn!(
                step = self.step,
                max_speed, finite, "velocity exceeded limit; simulation diverged"
            );
            self.diverged_at = Some(self.step);
        }

        let elapsed = started.elapsed();
        debug!(
            step = self.step,
            residual = pressure.residual,
            max_speed,
            elapsed_us = elapsed.as_micros() as u64,
            "step complete"
        );

        Ok(StepReport {
            step: self.step,
            pressure,
            max_speed,
            diverged,
            elapsed,
        })
    }

    /// Iterate over up to `count` steps. Iteration ends early after the first
    /// report that flags divergence, or after an error.
    pub fn steps(&mut self, count: usize) -> Steps<'_> {
        Steps {
            sim: self,
            remaining: count,
            halted: false,
        }
    }

    /// Velocity of cell `(row, col)` in the current buffer
    pub fn velocity(&self, row: usize, col: usize) -> SimResult<Vector2<f32>> {
        let index = self.grid.checked_index(row, col)?;
        Ok(self.velocity.current()[index])
    }

    /// Pressure of cell `(row, col)` in the current buffer
    pub fn pressure(&self, row: usize, col: usize) -> SimResult<f32> {
        let index = self.grid.checked_index(row, col)?;
        Ok(self.pressure.current()[index])
    }

    pub fn is_obstacle(&self, row: usize, col: usize) -> SimResult<bool> {
        self.obstacles.get(row, col)
    }

    /// The whole current velocity buffer, row-major
    pub fn velocity_field(&self) -> &[Vector2<f32>] {
        self.velocity.current()
    }

    /// The whole current pressure buffer, row-major
    pub fn pressure_field(&self) -> &[f32] {
        self.pressure.current()
    }

    pub fn obstacles(&self) -> &ObstacleMask {
        &self.obstacles
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Steps taken since the last `initialize`
    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// First step that reported divergence since the last `initialize`
    pub fn diverged_at(&self) -> Option<u64> {
        self.diverged_at
    }
}

/// Bounded stepping iterator returned by [`Navier::steps`].
pub struct Steps<'a> {
    sim: &'a mut Navier,
    remaining: usize,
    halted: bool,
}

impl Iterator for Steps<'_> {
    type Item = SimResult<StepReport>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let report = self.sim.step();
        self.halted = match &report {
            Ok(report) => report.diverged,
            Err(_) => true,
        };

        Some(report)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.halted {
            (0, Some(0))
        } else {
            (0, Some(self.remaining))
        }
    }
}
