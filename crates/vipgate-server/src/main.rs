//! vipgate-server standalone binary.

use std::process::ExitCode;

use clap::Parser;
use vipgate_server::{ServerArgs, cli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = ServerArgs::parse();
    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vipgate-server: {e}");
            ExitCode::FAILURE
        }
    }
}
