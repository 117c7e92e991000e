//! CLI command implementations

pub mod clear_empty;
pub mod config;
pub mod prune;
pub mod tiers;

use anyhow::{Context, Result};
use retention::StopFlag;

/// Run blocking engine work (process spawning, destroy calls) off the runtime
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("Worker thread panicked")?
}

/// Stop flag raised by the first Ctrl-C; a second one exits immediately
pub(crate) fn stop_on_ctrl_c() -> StopFlag {
    let stop = StopFlag::new();
    let handle = stop.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, stopping after the current iteration");
        handle.request();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    stop
}
