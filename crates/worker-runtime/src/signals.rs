//! Translates the process's own shutdown signals into the same
//! cancellation token a remote yield command uses, so "someone asked this
//! worker to wind down" has one representation regardless of who asked.

use tokio_util::sync::CancellationToken;
use tracing::info;

pub fn install_shutdown_handler() -> Result<CancellationToken, std::io::Error> {
    let token = CancellationToken::new();
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let child = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
        info!("shutdown signal received, finishing the current task before exit");
        child.cancel();
    });
    Ok(token)
}
