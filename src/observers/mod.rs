// Consumers of simulation state that run beside the solver thread

pub mod snapshot;
