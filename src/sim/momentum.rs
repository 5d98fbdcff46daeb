// Explicit momentum step for the velocity field

use na::Vector2;
use rayon::prelude::*;

use crate::{
    error::SimResult,
    sim::{
        field::{BufferPair, ObstacleMask},
        numeric::UpwindStencil,
    },
};

/// Advance the velocity field by one explicit Euler step.
///
/// Reads the previous velocity buffer and `pressure`, writes the current
/// velocity buffer. Only interior cells that are not obstacles are written;
/// every other cell of the current buffer is left as it was.
///
/// Per cell the update is
///
/// `u' = u + dt * ( -(u⋅∇)u - ∇p + ∇²u / re )`
///
/// where both first derivatives are upwind differences steered by `u`, and
/// the Laplacian is the 5-point central stencil with unit spacing.
///
/// Parameters
/// - `velocity` - The double-buffered velocity field, roles already swapped for this step
/// - `pressure` - The pressure field left by the previous step
/// - `obstacles` - Cells to exclude from the update
/// - `reynolds` - The Reynolds number dividing the diffusion term
/// - `dt` - The timestep
pub fn update_velocity(
    velocity: &mut BufferPair<Vector2<f32>>,
    pressure: &[f32],
    obstacles: &ObstacleMask,
    reynolds: f32,
    dt: f32,
) -> SimResult<()> {
    let grid = obstacles.grid();
    grid.check_len("velocity buffer", velocity.len())?;

    let (previous, current) = velocity.split_mut();

    let velocity_stencil = UpwindStencil::new(previous, previous, grid)?;
    let pressure_stencil = UpwindStencil::new(pressure, previous, grid)?;

    current
        .par_chunks_mut(grid.width())
        .enumerate()
        .skip(1)
        .take(grid.height() - 2)
        .for_each(|(row, out)| {
            for col in grid.interior_cols() {
                let index = grid.index(row, col);
                if obstacles.is_fixed(index) {
                    continue;
                }

                let u = previous[index];

                let (du_dx, du_dy) = velocity_stencil.first_order_at(index);
                let advection = -(du_dx * u.x + du_dy * u.y);

                let (dp_dx, dp_dy) = pressure_stencil.first_order_at(index);
                let pressure_gradient = Vector2::new(-dp_dx, -dp_dy);

                let (d2u_dx2, d2u_dy2) = velocity_stencil.second_order_at(index);
                let diffusion = (d2u_dx2 + d2u_dy2) / reynolds;

                out[col] = u + (advection + pressure_gradient + diffusion) * dt;
            }
        });

    Ok(())
}
