//! Unified vipgate CLI.
//!
//! This binary provides a unified interface to all vipgate components:
//! - `vipgate run` - Run the subscription and help desk bots
//! - `vipgate users` - Inspect and manage subscribers (SQL backend)
//!
//! Each subcommand can also be run as a standalone binary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// vipgate unified CLI.
#[derive(Parser)]
#[command(
    name = "vipgate",
    version,
    about = "Subscription gate for a paid VIP channel",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bots.
    #[command(name = "run", alias = "server")]
    Run(Box<vipgate_server::ServerArgs>),

    /// Manage subscribers (SQL backend).
    #[command(name = "users")]
    Users(vipgate_store::UsersArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => vipgate_server::cli::run(*args).await,
        Commands::Users(args) => vipgate_store::cli::run(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
