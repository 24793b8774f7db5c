//! SIGINT / SIGTERM -> engine cancellation.

use downtraffic_core::control::{CancelSignal, StopReason};
use tokio::task::JoinHandle;

/// Raises `cancel` with `Interrupted` on the first interrupt or terminate signal.
pub(crate) fn spawn_interrupt_listener(cancel: CancelSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_shutdown().await;
        if cancel.cancel(StopReason::Interrupted) {
            tracing::info!("interrupt received, stopping workers");
            eprintln!("\nInterrupted, stopping workers...");
        }
    })
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("cannot listen for SIGTERM: {}", e);
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    ctrl_c().await;
}
