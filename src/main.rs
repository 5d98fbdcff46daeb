use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use navier_jacobi::{
    error::InputError,
    postprocessing,
    preprocessing::cli::{CliArgs, save_input},
    sim::task,
};

fn run(args: &CliArgs) -> Result<(), InputError> {
    let simulation_input = args.crate_input()?;

    if let Some(savepath) = &args.input_json_savepath {
        save_input(&simulation_input, savepath)?;
    }

    simulation_input.log();

    let output = task::spawn_sim_thread(simulation_input.clone())
        .join()
        .map_err(|_| InputError::ThreadPanicked("simulation"))??;

    postprocessing::postprocess(&simulation_input, &output)?;

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
