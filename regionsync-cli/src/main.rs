mod cli;
mod config;
mod error;
mod reconcile;
mod sheets;
mod trigger;

use clap::Parser;
use colored::*;
use log::debug;

use cli::commands::reconcile::handle_reconcile_command;
use cli::commands::regions::handle_regions_command;
use cli::{Cli, Commands};
use reconcile::EXIT_HARD_FAILURE;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp_millis()
        .init();

    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
    }

    let code = match cli.command {
        Commands::Reconcile(args) => handle_reconcile_command(args, cli.config.as_deref()).await,
        Commands::Regions(args) => match handle_regions_command(args, cli.config.as_deref()) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
                EXIT_HARD_FAILURE
            }
        },
    };

    std::process::exit(code);
}
