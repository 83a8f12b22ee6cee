//! Fetch command: issue credentials once without renewing them.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::application::CredentialSession;
use crate::cli::output::{output, CredentialsOutput};
use crate::cli::types::SecretArgs;
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub secret: SecretArgs,
}

pub async fn execute(args: FetchArgs, config: &Config, json: bool) -> Result<()> {
    let session = CredentialSession::new(super::connect(config)?, config);

    info!(
        service = %args.secret.service,
        role = %args.secret.role,
        "fetching dynamic credentials"
    );
    let lease = session
        .fetch(&args.secret.service, &args.secret.role)
        .await
        .context("Failed to fetch credentials")?;

    output(&CredentialsOutput::from(&lease), json);
    Ok(())
}
