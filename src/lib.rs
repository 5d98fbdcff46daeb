//! 2D incompressible-flow approximation on a fixed grid: upwind advection,
//! Laplacian diffusion and a fixed-sweep Jacobi pressure relaxation under a
//! static obstacle mask.
//!
//! The numerical core lives in [`sim`]; [`preprocessing`], [`observers`] and
//! [`postprocessing`] make up the headless driver used by the binary.

extern crate nalgebra as na;

pub mod error;
pub mod observers;
pub mod postprocessing;
pub mod preprocessing;
pub mod sim;

pub use error::{SimError, SimResult};
pub use sim::{FlowSetup, Grid, Inflow, Navier, ObstacleMask, Side, SolverParams, StepReport};
