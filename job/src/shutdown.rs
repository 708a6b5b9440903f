//! Termination signal handling.

use tracing::{error, info, warn};

/// Wait for SIGTERM or Ctrl+C.
///
/// If no handler can be installed this never resolves, so the pass runs to
/// completion.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => on_ctrl_c(result).await,
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler, listening for Ctrl+C only");
                on_ctrl_c(tokio::signal::ctrl_c().await).await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        on_ctrl_c(tokio::signal::ctrl_c().await).await;
    }
}

async fn on_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
