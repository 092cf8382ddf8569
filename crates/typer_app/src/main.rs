mod cli;
mod config;
mod platform;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    platform::run(cli::Cli::parse())
}
