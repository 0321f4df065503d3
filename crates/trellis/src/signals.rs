//! Shutdown signal handling.

use tokio::signal;
use tracing::info;

/// Waits for a termination signal.
///
/// # Platform Support
///
/// * **Unix platforms**: SIGINT and SIGTERM
/// * **Windows**: Ctrl+C
///
/// # Returns
///
/// `Ok(())` once a signal arrives, or the I/O error from installing the
/// signal handlers.
///
/// # Example
///
/// ```rust,no_run
/// use lib_trellis::signals::wait_for_shutdown;
///
/// #[tokio::main]
/// async fn main() -> std::io::Result<()> {
///     // Mount the page...
///     wait_for_shutdown().await?;
///     // Tear it down
///     Ok(())
/// }
/// ```
pub async fn wait_for_shutdown() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    info!("📡 Received shutdown signal");
    Ok(())
}
