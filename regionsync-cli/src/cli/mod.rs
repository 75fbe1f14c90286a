//! Command-line interface

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::reconcile::ReconcileArgs;
use commands::regions::RegionsArgs;

#[derive(Parser, Debug)]
#[command(name = "regionsync")]
#[command(about = "Reconcile uploaded regional records into destination spreadsheets")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file (defaults to <config dir>/regionsync/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replace the selected regions' rows in the destination spreadsheet
    Reconcile(ReconcileArgs),
    /// Show the effective Region -> Sheet map
    Regions(RegionsArgs),
}

impl Cli {
    /// Log filter implied by -v / -q
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
