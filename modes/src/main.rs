use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use modes::Command;

fn main() -> ExitCode {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	match modes::run(Command::parse()) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("{} {}", "Error:".bold().red(), err);
			ExitCode::FAILURE
		},
	}
}
