//! Process termination signals

use tracing::{info, warn};

/// Resolve once the process is asked to terminate
///
/// Listens for Ctrl-C everywhere, plus SIGTERM and SIGHUP on unix. A signal
/// that cannot be registered is logged and ignored.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())
            .inspect_err(|e| warn!(error = %e, "failed to register SIGTERM handler"))
            .ok();
        let mut sighup = signal(SignalKind::hangup())
            .inspect_err(|e| warn!(error = %e, "failed to register SIGHUP handler"))
            .ok();

        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => info!("Received SIGINT"),
                Err(e) => {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            },
            Some(()) = recv(sigterm.as_mut()) => info!("Received SIGTERM"),
            Some(()) = recv(sighup.as_mut()) => info!("Received SIGHUP"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl-C");
    }
}

#[cfg(unix)]
async fn recv(stream: Option<&mut tokio::signal::unix::Signal>) -> Option<()> {
    match stream {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}
