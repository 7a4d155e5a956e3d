//! OS signal handling.
//!
//! SIGINT and SIGTERM both mean "shut down gracefully". SIGKILL cannot be
//! observed by a process, so SIGTERM is the kill-equivalent we listen for.
//! If a handler cannot be installed the error is logged and that signal is
//! simply never reported; the other triggers keep working.

/// Resolves when the process receives an interrupt or terminate signal.
pub async fn termination() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt => tracing::info!("Received interrupt signal"),
        _ = terminate() => tracing::info!("Received terminate signal"),
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
