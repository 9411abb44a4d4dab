//! gtbook - book chapters as a tree of markdown files

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = gtbook::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
