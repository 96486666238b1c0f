//! OS signal handling.
//!
//! The first Ctrl-C triggers graceful shutdown: the current wait is aborted and
//! the summary is still printed. A second Ctrl-C exits immediately.

use crate::lifecycle::shutdown::Shutdown;

/// Spawn the Ctrl-C listener.
pub fn spawn_ctrl_c_handler(shutdown: Shutdown) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        tracing::warn!("Interrupt received, shutting down after the current step");
        shutdown.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Second interrupt, exiting immediately");
            std::process::exit(130);
        }
    });
}
