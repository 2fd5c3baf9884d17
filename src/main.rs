use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use sshtrap::cli::{Cli, Command};
use sshtrap::config::{self, AppConfig};
use sshtrap::{logging, server};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Command::CheckConfig) => {
            let config = config::load_config(&cli.config)?;
            println!("Configuration OK: {}", cli.config.display());
            println!("  listen:            {}", config.server.listen);
            println!("  server_id:         {}", config.server.server_id);
            println!(
                "  sentinel version:  {}",
                config.server.sentinel_client_version
            );
            println!("  max auth attempts: {}", config.server.max_auth_attempts);
            match &config.capture.log_path {
                Some(path) => println!("  capture log:       {}", path.display()),
                None => println!("  capture log:       disabled"),
            }
            return Ok(());
        }
        Some(Command::Init { output }) => {
            std::fs::write(output, config::default_config_toml())
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote default configuration to {}", output.display());
            return Ok(());
        }
        None => {}
    }

    let mut config = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        AppConfig::default()
    };
    if let Some(listen) = &cli.listen {
        config.server.listen = listen.clone();
    }
    if let Some(path) = &cli.capture_log {
        config.capture.log_path = Some(path.clone());
    }
    config::validate(&config)?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.to_string());
    logging::setup_logging(&level, config.logging.format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "Starting sshtrap"
    );

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(async {
        if let Err(e) = server::run(config).await {
            error!(error = %e, "Server error");
            std::process::exit(1);
        }
    });

    Ok(())
}
