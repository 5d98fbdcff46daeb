// Solver parameters and initial flow conditions

use serde::{Deserialize, Serialize};

use crate::{
    error::{SimError, SimResult},
    sim::{
        field::{Grid, ObstacleMask},
        poisson::DEFAULT_JACOBI_SWEEPS,
    },
};

/// Speed above which a step is reported as diverged
pub const DEFAULT_DIVERGENCE_LIMIT: f32 = 1000.;

/// Numerical parameters of the solver. Fixed for the lifetime of a [`Navier`](crate::sim::navier::Navier).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverParams {
    /// The Reynolds number; larger values mean less diffusive damping
    pub reynolds: f32,

    /// The integration timestep
    pub dt: f32,

    /// Jacobi sweeps per pressure update
    #[serde(default = "default_sweeps")]
    pub jacobi_sweeps: usize,

    /// Speed above which a step is flagged as diverged
    #[serde(default = "default_divergence_limit")]
    pub divergence_limit: f32,
}

fn default_sweeps() -> usize {
    DEFAULT_JACOBI_SWEEPS
}

fn default_divergence_limit() -> f32 {
    DEFAULT_DIVERGENCE_LIMIT
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            reynolds: 100.,
            dt: 0.1,
            jacobi_sweeps: DEFAULT_JACOBI_SWEEPS,
            divergence_limit: DEFAULT_DIVERGENCE_LIMIT,
        }
    }
}

impl SolverParams {
    /// Reject non-positive or non-finite values.
    pub fn validate(&self) -> SimResult<()> {
        positive("reynolds", self.reynolds)?;
        positive("dt", self.dt)?;
        positive("divergence_limit", self.divergence_limit)?;

        if self.jacobi_sweeps == 0 {
            return Err(SimError::InvalidParameter {
                name: "jacobi_sweeps",
                reason: "at least one sweep is required".into(),
            });
        }

        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> SimResult<()> {
    if !(value.is_finite() && value > 0.) {
        return Err(SimError::InvalidParameter {
            name,
            reason: format!("must be a positive finite number (got {value})"),
        });
    }
    Ok(())
}

/// A side of the outer ring of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Column 0
    Left,
    /// The last column
    Right,
    /// Row 0
    Top,
    /// The last row
    Bottom,
}

/// A velocity prescribed along a segment of one boundary side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Inflow {
    pub side: Side,

    /// First cell of the segment, counted along the side
    pub start: usize,

    /// Last cell of the segment (inclusive)
    pub end: usize,

    /// The prescribed velocity (x, y)
    pub velocity: (f32, f32),
}

impl Inflow {
    /// Inflow along the left column, rows `start..=end`.
    pub fn left(start: usize, end: usize, velocity: (f32, f32)) -> Self {
        Inflow {
            side: Side::Left,
            start,
            end,
            velocity,
        }
    }

    /// Flat indices of the cells covered by this inflow on `grid`.
    pub fn cells(&self, grid: Grid) -> SimResult<Vec<usize>> {
        let len = match self.side {
            Side::Left | Side::Right => grid.height(),
            Side::Top | Side::Bottom => grid.width(),
        };

        if self.start > self.end || self.end >= len {
            return Err(SimError::InflowOutOfRange {
                start: self.start,
                end: self.end,
                len,
            });
        }

        let cells = (self.start..=self.end)
            .map(|i| match self.side {
                Side::Left => grid.index(i, 0),
                Side::Right => grid.index(i, grid.width() - 1),
                Side::Top => grid.index(0, i),
                Side::Bottom => grid.index(grid.height() - 1, i),
            })
            .collect();

        Ok(cells)
    }
}

/// Everything [`Navier::initialize`](crate::sim::navier::Navier::initialize) installs:
/// the obstacle mask and an optional inflow segment.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSetup {
    pub obstacles: ObstacleMask,
    pub inflow: Option<Inflow>,
}

impl FlowSetup {
    pub fn new(obstacles: ObstacleMask) -> Self {
        FlowSetup {
            obstacles,
            inflow: None,
        }
    }

    pub fn with_inflow(mut self, inflow: Inflow) -> Self {
        self.inflow = Some(inflow);
        self
    }

    pub fn grid(&self) -> Grid {
        self.obstacles.grid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_validation() {
        assert!(SolverParams::default().validate().is_ok());

        for params in [
            SolverParams {
                reynolds: 0.,
                ..Default::default()
            },
            SolverParams {
                dt: -0.1,
                ..Default::default()
            },
            SolverParams {
                dt: f32::NAN,
                ..Default::default()
            },
            SolverParams {
                jacobi_sweeps: 0,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                params.validate(),
                Err(SimError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_params_defaults_from_json() {
        let params: SolverParams = serde_json::from_str(r#"{"reynolds": 1.0, "dt": 0.1}"#).unwrap();

        assert_eq!(params.jacobi_sweeps, DEFAULT_JACOBI_SWEEPS);
        assert_eq!(params.divergence_limit, DEFAULT_DIVERGENCE_LIMIT);
    }

    #[test]
    fn test_inflow_cells_per_side() {
        let grid = Grid::new(5, 4).unwrap();

        assert_eq!(Inflow::left(1, 2, (1., 0.)).cells(grid).unwrap(), vec![5, 10]);

        let right = Inflow {
            side: Side::Right,
            ..Inflow::left(0, 1, (1., 0.))
        };
        assert_eq!(right.cells(grid).unwrap(), vec![4, 9]);

        let top = Inflow {
            side: Side::Top,
            ..Inflow::left(3, 4, (0., 1.))
        };
        assert_eq!(top.cells(grid).unwrap(), vec![3, 4]);

        let bottom = Inflow {
            side: Side::Bottom,
            ..Inflow::left(0, 0, (0., 1.))
        };
        assert_eq!(bottom.cells(grid).unwrap(), vec![15]);
    }

    #[test]
    fn test_inflow_out_of_range() {
        let grid = Grid::new(5, 4).unwrap();

        assert_eq!(
            Inflow::left(1, 4, (1., 0.)).cells(grid),
            Err(SimError::InflowOutOfRange {
                start: 1,
                end: 4,
                len: 4
            })
        );
        assert!(Inflow::left(3, 2, (1., 0.)).cells(grid).is_err());
    }
}
