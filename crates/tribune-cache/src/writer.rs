//! Background persistence for the response cache.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tribune_core::error::{ErrorKind, TribuneError};
use tribune_storage::StateStore;

use crate::response::ResponseCache;

/// Writes the response cache to the [`StateStore`] after changes settle.
///
/// Changes within the debounce window produce a single write. Dropping the
/// writer stops the task and writes any pending change.
pub struct CacheWriter {
    cache: Arc<ResponseCache>,
    state: Arc<dyn StateStore>,
    shutdown: CancellationToken,
}

impl CacheWriter {
    /// Start the writer. Must be called inside a tokio runtime.
    pub fn spawn(cache: Arc<ResponseCache>, state: Arc<dyn StateStore>, debounce: Duration) -> Self {
        let shutdown = CancellationToken::new();
        let task_cache = Arc::clone(&cache);
        let task_state = Arc::clone(&state);
        let task_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_shutdown.cancelled() => break,
                    _ = task_cache.changed() => {}
                }
                tokio::select! {
                    _ = task_shutdown.cancelled() => break,
                    _ = tokio::time::sleep(debounce) => {}
                }
                persist_logged(&task_cache, task_state.as_ref());
            }
            debug!("Response cache writer stopped");
        });
        Self {
            cache,
            state,
            shutdown,
        }
    }

    /// Write immediately, bypassing the debounce window.
    pub fn flush(&self) -> Result<(), TribuneError> {
        self.cache.persist_to(self.state.as_ref())
    }
}

impl Drop for CacheWriter {
    fn drop(&mut self) {
        self.shutdown.cancel();
        persist_logged(&self.cache, self.state.as_ref());
    }
}

fn persist_logged(cache: &ResponseCache, state: &dyn StateStore) {
    if let Err(e) = cache.persist_if_dirty(state) {
        warn!(kind = %ErrorKind::CacheError, error = %e, "Failed to persist response cache");
    }
}
