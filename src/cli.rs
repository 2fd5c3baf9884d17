//! Command line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "sshtrap", version, about = "Low-interaction SSH deception server")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        default_value = "sshtrap.toml",
        env = "SSHTRAP_CONFIG",
        value_name = "FILE"
    )]
    pub config: PathBuf,

    /// Override the configured log level (EnvFilter syntax).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Override the configured listen address.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Override the capture log destination.
    #[arg(long, value_name = "FILE")]
    pub capture_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse and validate the configuration, then exit.
    CheckConfig,
    /// Write an annotated default configuration file.
    Init {
        /// Destination path.
        #[arg(short, long, default_value = "sshtrap.toml", value_name = "FILE")]
        output: PathBuf,
    },
}
