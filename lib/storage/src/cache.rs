use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Build-once cache with at most one build in flight.
///
/// The slot lock is held for the whole build, so concurrent callers on a
/// cold cache queue behind the builder and then read its result instead of
/// building again. A failed build leaves the slot empty and the next caller
/// retries.
pub struct SingleFlight<T> {
    slot: Mutex<Option<Arc<T>>>,
    builds: AtomicUsize,
}

impl<T> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            builds: AtomicUsize::new(0),
        }
    }

    /// Cached value, building it with `build` on a cold cache
    pub async fn get_or_build<F, Fut, E>(&self, build: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }

        self.builds.fetch_add(1, Ordering::Relaxed);
        let value = Arc::new(build().await?);
        *slot = Some(value.clone());
        Ok(value)
    }

    /// Drop the cached value; the next `get_or_build` rebuilds.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    /// Cached value without building or waiting on a build
    pub fn peek(&self) -> Option<Arc<T>> {
        self.slot.try_lock().ok().and_then(|slot| slot.clone())
    }

    /// Number of builds started so far
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
