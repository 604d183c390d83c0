use camlkit::cli::{Cli, execute, read_input};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match read_input(&cli).and_then(|input| execute(&cli, &input)) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::debug!("camlkit failed: {:?}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
