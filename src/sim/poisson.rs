// Fixed-sweep Jacobi relaxation for the pressure equation ∇²p = -s

use na::Vector2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    error::{SimError, SimResult},
    sim::{
        field::{BufferPair, ObstacleMask},
        numeric::UpwindStencil,
    },
};

/// Number of Jacobi sweeps run per step unless configured otherwise
pub const DEFAULT_JACOBI_SWEEPS: usize = 4;

/// Convergence diagnostics of one pressure solve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JacobiReport {
    /// Number of sweeps that were run
    pub sweeps: usize,

    /// Sum of `|p_new - p_old|` over updated cells in the final sweep
    pub residual: f32,
}

/// Compute the pressure source term from the velocity field into `source`.
///
/// Mathematically, this is
///
/// `s = ((∂u/∂x)² + (∂v/∂y)² + 2 (∂u/∂y)(∂v/∂x)) / re`
///
/// using upwind first differences of `velocity`. Cells that are obstacles or
/// on the outer ring get a zero source.
pub fn pressure_source(
    source: &mut [f32],
    velocity: &[Vector2<f32>],
    obstacles: &ObstacleMask,
    reynolds: f32,
) -> SimResult<()> {
    let grid = obstacles.grid();
    grid.check_len("source buffer", source.len())?;

    let stencil = UpwindStencil::new(velocity, velocity, grid)?;

    source
        .par_chunks_mut(grid.width())
        .enumerate()
        .for_each(|(row, out)| {
            for (col, s) in out.iter_mut().enumerate() {
                let index = grid.index(row, col);
                if !grid.is_interior(row, col) || obstacles.is_fixed(index) {
                    *s = 0.;
                    continue;
                }

                let (d_dx, d_dy) = stencil.first_order_at(index);
                let (du_dx, dv_dx) = (d_dx.x, d_dx.y);
                let (du_dy, dv_dy) = (d_dy.x, d_dy.y);

                *s = (du_dx * du_dx + dv_dy * dv_dy + 2. * du_dy * dv_dx) / reynolds;
            }
        });

    Ok(())
}

/// Run exactly `sweeps` Jacobi sweeps of the 5-point stencil for ∇²p = -s.
///
/// Each sweep swaps the pressure roles, then sets every interior non-obstacle
/// cell of the current buffer to
///
/// `p = (p_right + p_left + p_down + p_up + s) / 4`
///
/// from the previous buffer. Cells that are never written keep their value,
/// so prescribed boundary pressures act as Dirichlet conditions.
///
/// The sweep count is a hard cap; the residual is reported, never tested.
pub fn relax_pressure(
    pressure: &mut BufferPair<f32>,
    source: &[f32],
    obstacles: &ObstacleMask,
    sweeps: usize,
) -> SimResult<JacobiReport> {
    let grid = obstacles.grid();
    grid.check_len("pressure buffer", pressure.len())?;
    grid.check_len("source buffer", source.len())?;

    if sweeps == 0 {
        return Err(SimError::InvalidParameter {
            name: "jacobi_sweeps",
            reason: "at least one sweep is required".into(),
        });
    }

    let w = grid.width();
    let mut residual = 0.;

    for sweep in 0..sweeps {
        pressure.swap();
        let (previous, current) = pressure.split_mut();

        residual = current
            .par_chunks_mut(w)
            .enumerate()
            .skip(1)
            .take(grid.height() - 2)
            .map(|(row, out)| {
                let mut diff = 0.;
                for col in grid.interior_cols() {
                    let index = grid.index(row, col);
                    if obstacles.is_fixed(index) {
                        continue;
                    }

                    let neighbours = previous[index + 1]
                        + previous[index - 1]
                        + previous[index + w]
                        + previous[index - w];
                    let next = (neighbours + source[index]) * 0.25;

                    diff += (next - previous[index]).abs();
                    out[col] = next;
                }
                diff
            })
            .sum::<f32>();

        trace!(sweep, residual, "jacobi sweep");
    }

    Ok(JacobiReport { sweeps, residual })
}

/// Pressure update of one simulation step: build the source from the freshly
/// updated velocity, then relax the pressure field.
///
/// `source` is scratch space of one value per cell.
pub fn update_pressure(
    pressure: &mut BufferPair<f32>,
    source: &mut [f32],
    velocity: &[Vector2<f32>],
    obstacles: &ObstacleMask,
    reynolds: f32,
    sweeps: usize,
) -> SimResult<JacobiReport> {
    pressure_source(source, velocity, obstacles, reynolds)?;
    relax_pressure(pressure, source, obstacles, sweeps)
}
