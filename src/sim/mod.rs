// Explicit finite-difference flow solver

pub mod field;
pub mod momentum;
pub mod navier;
pub mod numeric;
pub mod poisson;
pub mod setup;
pub mod task;

pub use field::{BufferPair, Grid, ObstacleMask};
pub use navier::{Navier, StepReport};
pub use poisson::JacobiReport;
pub use setup::{FlowSetup, Inflow, Side, SolverParams};
