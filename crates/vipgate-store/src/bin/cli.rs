//! vipgate users standalone binary.

use std::process::ExitCode;

use clap::Parser;
use vipgate_store::{UsersArgs, cli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = UsersArgs::parse();

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
