use ::log::error;
use elecplan::cli::run_cli;
use elecplan::log;
use human_panic::{metadata, setup_panic};
use std::process::ExitCode;

fn main() -> ExitCode {
    setup_panic!(metadata!());

    if let Err(err) = run_cli() {
        // Once the logger is running, errors also go to the error log file
        if log::is_logger_initialised() {
            error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
