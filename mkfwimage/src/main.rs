//! Main entry point for the mkfwimage CLI tool

use std::process::ExitCode;

use clap::Parser;
use mkfwimage::cli::{Args, run_cli};
use mkfwimage::logger::ConsoleLogger;

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = ConsoleLogger::from_flags(args.verbose, args.quiet).init() {
        eprintln!("Error: {e}");
    }

    match run_cli(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
