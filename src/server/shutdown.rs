//! Graceful shutdown
//!
//! One [`CancellationToken`] is shared by the HTTP server, the Discord
//! adapter, the boot task and open log streams. Ctrl+C or SIGTERM cancels it.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Wait for Ctrl+C or SIGTERM
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}

/// Resolve on a shutdown signal or when `token` is cancelled elsewhere;
/// either way the token ends up cancelled.
pub async fn shutdown_signal(token: CancellationToken) {
    tokio::select! {
        _ = wait_for_shutdown_signal() => token.cancel(),
        _ = token.cancelled() => {}
    }
    info!("Shutting down");
}
