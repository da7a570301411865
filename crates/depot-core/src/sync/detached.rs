//! Fire-and-forget side effects.

use std::future::Future;

use tokio::task::JoinHandle;

use crate::error::Result;

/// Run `future` in the background.
///
/// Its outcome only reaches the `tracing` sink; the caller's own result never
/// depends on it. The handle may be dropped.
pub fn spawn_detached<T, F>(name: &'static str, future: F) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(async move {
        match future.await {
            Ok(_) => tracing::debug!("Background task '{name}' finished"),
            Err(error) => tracing::warn!("Background task '{name}' failed: {error}"),
        }
    })
}
