//! Watch command: issue credentials and keep their lease alive.

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use crate::application::{ControlLoop, CredentialSession};
use crate::cli::output::{event_line, output, CredentialsOutput};
use crate::cli::signals::shutdown_signal;
use crate::cli::types::SecretArgs;
use crate::domain::models::Config;
use crate::domain::LeaseError;

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub secret: SecretArgs,

    /// Print every renewal event as a JSON line (implied by --json)
    #[arg(short, long)]
    pub events: bool,
}

pub async fn execute(args: WatchArgs, config: &Config, json: bool) -> Result<()> {
    let session = CredentialSession::new(super::connect(config)?, config);
    let grace = config.renewal.shutdown_grace();

    info!(
        service = %args.secret.service,
        role = %args.secret.role,
        "fetching dynamic credentials"
    );
    let mut watched = tokio::select! {
        result = session.fetch_and_watch(&args.secret.service, &args.secret.role) => {
            result.context("Failed to fetch credentials")?
        }
        () = shutdown_signal() => return Err(LeaseError::CancellationRequested.into()),
    };

    output(&CredentialsOutput::from(&watched.lease), json);
    info!(
        lease_id = %watched.lease.lease_id,
        ttl_secs = watched.lease.ttl.as_secs(),
        renewable = watched.lease.renewable,
        "starting renewal routine"
    );

    let print_events = json || args.events;
    let stopper = watched.handle.stop_handle();
    let outcome = ControlLoop::new(grace)
        .run_with(&mut watched.events, &stopper, shutdown_signal(), |event| {
            if print_events {
                event_line(event);
            }
        })
        .await;

    if !watched.handle.shutdown(grace).await {
        warn!("lease watcher task was aborted");
    }

    info!(outcome = ?outcome, "watch finished");
    outcome.into_result()?;
    Ok(())
}
