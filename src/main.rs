//! Leasekeeper CLI entry point.

use clap::Parser;

use leasekeeper::cli::commands::{self, load_config};
use leasekeeper::cli::{Cli, Commands};
use leasekeeper::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.command.secret_args()) {
        Ok(config) => config,
        Err(err) => leasekeeper::cli::handle_error(err, cli.json),
    };

    let logger = match LogConfig::try_from(&config.logging)
        .map_err(anyhow::Error::msg)
        .and_then(|log_config| LoggerImpl::init(&log_config))
    {
        Ok(logger) => logger,
        Err(err) => leasekeeper::cli::handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Watch(args) => commands::watch::execute(args, &config, cli.json).await,
        Commands::Fetch(args) => commands::fetch::execute(args, &config, cli.json).await,
    };

    // flush file output before a possible process::exit
    drop(logger);

    if let Err(err) = result {
        leasekeeper::cli::handle_error(err, cli.json);
    }
}
