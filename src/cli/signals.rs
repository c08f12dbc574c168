//! Signal handling for interrupting a run

use std::future::Future;
use std::io;

/// Wait for an interrupt or terminate signal, returning its name
pub async fn shutdown_signal() -> io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => Ok("SIGINT"),
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl+C")
    }
}

/// Run a future until it finishes or a shutdown signal arrives
///
/// Returns `None` when interrupted; the future is dropped at that point.
pub async fn with_cancellation<F: Future>(future: F) -> Option<F::Output> {
    race_shutdown(future, shutdown_signal()).await
}

async fn race_shutdown<F, S>(future: F, shutdown: S) -> Option<F::Output>
where
    F: Future,
    S: Future<Output = io::Result<&'static str>>,
{
    tokio::pin!(future);

    tokio::select! {
        result = &mut future => Some(result),
        signal = shutdown => match signal {
            Ok(name) => {
                tracing::warn!(signal = name, "Interrupted, cancelling run");
                eprintln!("\nReceived {}, shutting down...", name);
                None
            }
            Err(e) => {
                // Without a handler the run just can't be interrupted
                tracing::warn!(error = %e, "Failed to install signal handler");
                Some(future.await)
            }
        },
    }
}
