//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cli::commands::fetch::FetchArgs;
use crate::cli::commands::watch::WatchArgs;

#[derive(Parser, Debug)]
#[command(name = "leasekeeper")]
#[command(about = "Fetch dynamic Vault credentials and keep their lease alive", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to leasekeeper.yaml and leasekeeper.local.yaml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch credentials and renew their lease until it ends or a signal arrives
    Watch(WatchArgs),

    /// Fetch credentials once and print them
    Fetch(FetchArgs),
}

/// Secret selection and backend connection flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct SecretArgs {
    /// Service name
    #[arg(short, long)]
    pub service: String,

    /// Role name (e.g. ro, rw)
    #[arg(short, long)]
    pub role: String,

    /// Vault token to use for authentication
    #[arg(short, long, env = "VAULT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Vault address
    #[arg(short, long, env = "VAULT_ADDR")]
    pub addr: Option<String>,
}

impl SecretArgs {
    /// Overlay command-line connection flags onto loaded configuration
    pub fn apply(&self, config: &mut crate::domain::models::Config) {
        if let Some(token) = &self.token {
            config.backend.token = Some(token.clone());
        }
        if let Some(addr) = &self.addr {
            config.backend.address.clone_from(addr);
        }
    }
}

impl Commands {
    pub const fn secret_args(&self) -> &SecretArgs {
        match self {
            Self::Watch(args) => &args.secret,
            Self::Fetch(args) => &args.secret,
        }
    }
}
