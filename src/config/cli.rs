use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "package-tracker")]
#[command(about = "Track packages and compare them against historical shipping times")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "package-tracker.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Fetch the package from the carrier, store it and estimate arrival
    Track { tracking_number: String },

    /// Show the locally stored copy of a package without contacting the carrier
    Details { tracking_number: String },

    /// List cached shipping statistics for a route
    Stats {
        #[arg(long)]
        origin: String,

        #[arg(long)]
        destination: String,
    },
}

impl Command {
    pub fn tracking_number(&self) -> Option<&str> {
        match self {
            Command::Track { tracking_number } | Command::Details { tracking_number } => {
                Some(tracking_number)
            }
            Command::Stats { .. } => None,
        }
    }
}
