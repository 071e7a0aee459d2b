#![warn(rust_2018_idioms)]

use std::process::ExitCode;

mod cli;
mod outcome;
mod pacing;
mod receiver;
mod sender;

use cli::Command;
use outcome::Outcome;

fn main() -> ExitCode {
    let cli = match cli::parse() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(1);
        }
    };

    let level = if cli.debug {
        log::LevelFilter::Debug
    } else if cli.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let result = match cli.command {
        Command::Send(args) => runtime.block_on(sender::run(args)),
        Command::Receive(args) => runtime.block_on(receiver::run(args)),
    };

    match result {
        Ok(Outcome::Clean) => ExitCode::from(0),
        Ok(Outcome::Incomplete) => ExitCode::from(2),
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
