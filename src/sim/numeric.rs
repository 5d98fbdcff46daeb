// Finite-difference stencils over flat, row-major field buffers

use std::ops::{Add, Mul, Sub};

use na::Vector2;
use num_traits::Zero;

use crate::{error::SimResult, sim::field::Grid};

/// A value that can be stored in a field and differenced by [`UpwindStencil`].
pub trait FieldElement:
    Copy + Send + Sync + Zero + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self>
{
    /// Whether every component is finite (not NaN or infinite)
    fn is_finite(&self) -> bool;
}

impl FieldElement for f32 {
    fn is_finite(&self) -> bool {
        f32::is_finite(*self)
    }
}

impl FieldElement for Vector2<f32> {
    fn is_finite(&self) -> bool {
        self.iter().all(|c| c.is_finite())
    }
}

/// Upwind and central differences of a field buffer at interior cells.
///
/// `velocity` only selects the direction of the one-sided first difference;
/// it may be the same buffer as `field` when differencing the velocity itself.
pub struct UpwindStencil<'a, T> {
    field: &'a [T],
    velocity: &'a [Vector2<f32>],
    grid: Grid,
}

impl<'a, T: FieldElement> UpwindStencil<'a, T> {
    /// Create a stencil over `field`, with upwind direction read from `velocity`.
    ///
    /// Both buffers must hold exactly one value per grid cell.
    pub fn new(field: &'a [T], velocity: &'a [Vector2<f32>], grid: Grid) -> SimResult<Self> {
        grid.check_len("field buffer", field.len())?;
        grid.check_len("velocity buffer", velocity.len())?;

        Ok(UpwindStencil {
            field,
            velocity,
            grid,
        })
    }

    /// Upwind first differences `(dx, dy)` at interior cell `(row, col)`.
    ///
    /// The difference is taken towards the side the flow comes from: forward
    /// when the velocity component is negative, backward otherwise.
    pub fn first_order_diff(&self, row: usize, col: usize) -> SimResult<(T, T)> {
        let index = self.grid.interior_index(row, col)?;
        Ok(self.first_order_at(index))
    }

    /// Central second differences `(d2x, d2y)` at interior cell `(row, col)`,
    /// i.e. the two components of the 5-point Laplacian with unit spacing.
    pub fn second_order_diff(&self, row: usize, col: usize) -> SimResult<(T, T)> {
        let index = self.grid.interior_index(row, col)?;
        Ok(self.second_order_at(index))
    }

    /// Same as [`Self::first_order_diff`] for a flat index already known to be interior.
    #[inline]
    pub(crate) fn first_order_at(&self, index: usize) -> (T, T) {
        let w = self.grid.width();
        let f = self.field;
        let v = self.velocity[index];

        let dx = if v.x < 0. {
            f[index + 1] - f[index]
        } else {
            f[index] - f[index - 1]
        };

        let dy = if v.y < 0. {
            f[index + w] - f[index]
        } else {
            f[index] - f[index - w]
        };

        (dx, dy)
    }

    /// Same as [`Self::second_order_diff`] for a flat index already known to be interior.
    #[inline]
    pub(crate) fn second_order_at(&self, index: usize) -> (T, T) {
        let w = self.grid.width();
        let f = self.field;
        let center = f[index] * 2.;

        let d2x = f[index + 1] + f[index - 1] - center;
        let d2y = f[index + w] + f[index - w] - center;

        (d2x, d2y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    fn ramp_grid() -> (Grid, Vec<f32>) {
        let grid = Grid::new(6, 5).unwrap();
        let field = (0..grid.len()).map(|i| (i % grid.width()) as f32).collect();
        (grid, field)
    }

    #[test]
    fn test_upwind_picks_side_by_velocity_sign() {
        let grid = Grid::new(3, 3).unwrap();
        #[rustfmt::skip]
        let field: Vec<f32> = vec![
            0., 1., 0.,
            2., 5., 9.,
            0., 4., 0.,
        ];

        let positive = vec![Vector2::new(1., 1.); 9];
        let stencil = UpwindStencil::new(&field, &positive, grid).unwrap();
        assert_eq!(stencil.first_order_diff(1, 1).unwrap(), (5. - 2., 5. - 1.));

        let negative = vec![Vector2::new(-1., -1.); 9];
        let stencil = UpwindStencil::new(&field, &negative, grid).unwrap();
        assert_eq!(stencil.first_order_diff(1, 1).unwrap(), (9. - 5., 4. - 5.));

        // zero counts as non-negative
        let still = vec![Vector2::zeros(); 9];
        let stencil = UpwindStencil::new(&field, &still, grid).unwrap();
        assert_eq!(stencil.first_order_diff(1, 1).unwrap(), (3., 4.));
    }

    #[test]
    fn test_second_order_on_ramp() {
        let (grid, field) = ramp_grid();
        let velocity = vec![Vector2::zeros(); grid.len()];
        let stencil = UpwindStencil::new(&field, &velocity, grid).unwrap();

        for row in grid.interior_rows() {
            for col in grid.interior_cols() {
                let (d2x, d2y) = stencil.second_order_diff(row, col).unwrap();
                assert_eq!(d2x, 0.);
                assert_eq!(d2y, 0.);

                // the ramp is still visible to the first difference
                let (dx, dy) = stencil.first_order_diff(row, col).unwrap();
                assert_eq!(dx, 1.);
                assert_eq!(dy, 0.);
            }
        }
    }

    #[test]
    fn test_second_order_ramp_leaves_orthogonal_axis() {
        let grid = Grid::new(5, 5).unwrap();
        // ramp along columns plus a parabola along rows
        let field: Vec<f32> = (0..grid.len())
            .map(|i| {
                let (row, col) = ((i / 5) as f32, (i % 5) as f32);
                col + row * row
            })
            .collect();
        let velocity = vec![Vector2::zeros(); grid.len()];
        let stencil = UpwindStencil::new(&field, &velocity, grid).unwrap();

        for row in grid.interior_rows() {
            for col in grid.interior_cols() {
                assert_eq!(stencil.second_order_diff(row, col).unwrap(), (0., 2.));
            }
        }
    }

    #[test]
    fn test_vector_field_differences() {
        let grid = Grid::new(3, 3).unwrap();
        let mut field = vec![Vector2::<f32>::zeros(); 9];
        field[3] = Vector2::new(5., 0.);

        let stencil = UpwindStencil::new(&field, &field, grid).unwrap();

        let (dx, dy) = stencil.first_order_diff(1, 1).unwrap();
        assert_eq!(dx, Vector2::new(-5., 0.));
        assert_eq!(dy, Vector2::zeros());

        let (d2x, d2y) = stencil.second_order_diff(1, 1).unwrap();
        assert_eq!(d2x, Vector2::new(5., 0.));
        assert_eq!(d2y, Vector2::zeros());
    }

    #[test]
    fn test_rejects_boundary_cells() {
        let (grid, field) = ramp_grid();
        let velocity = vec![Vector2::zeros(); grid.len()];
        let stencil = UpwindStencil::new(&field, &velocity, grid).unwrap();

        for (row, col) in [(0, 2), (4, 2), (2, 0), (2, 5), (7, 7)] {
            assert!(matches!(
                stencil.first_order_diff(row, col),
                Err(SimError::NotInterior { .. })
            ));
            assert!(matches!(
                stencil.second_order_diff(row, col),
                Err(SimError::NotInterior { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_mismatched_buffers() {
        let grid = Grid::new(4, 4).unwrap();
        let field = vec![0.0f32; 15];
        let velocity = vec![Vector2::zeros(); 16];

        assert!(matches!(
            UpwindStencil::new(&field, &velocity, grid),
            Err(SimError::LengthMismatch {
                expected: 16,
                actual: 15,
                ..
            })
        ));
    }
}
