use std::sync::{Arc, Mutex, RwLock};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped on every invalidation. A rebuild only publishes its result
    /// if no invalidation happened while it was running.
    generation: u64,
    ids: Option<Arc<[u64]>>,
}

/// Lazily rebuilt, invalidate-on-write view of the sorted valid-id set.
///
/// Readers always see either the previous complete list or the next
/// complete list; a rebuild swaps in a fresh `Arc` rather than editing
/// the published one.
#[derive(Debug, Default)]
pub struct IdCache {
    state: RwLock<CacheState>,
    rebuild_lock: Mutex<()>,
}

impl IdCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a cached list is currently published.
    pub fn is_valid(&self) -> bool {
        self.state.read().is_ok_and(|state| state.ids.is_some())
    }

    /// Mark the cached list stale. Call after every successful ingest.
    pub fn invalidate(&self) -> Result<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.generation += 1;
        state.ids = None;
        Ok(())
    }

    /// Return the cached ids, rebuilding with `rebuild` if stale.
    ///
    /// `rebuild` may return ids in any order; they are sorted and
    /// deduplicated before publishing. Concurrent callers that find the
    /// cache stale run the rebuild once between them.
    pub fn get_or_rebuild<F>(&self, rebuild: F) -> Result<Arc<[u64]>>
    where
        F: FnOnce() -> Result<Vec<u64>>,
    {
        if let Some(ids) = self.cached()? {
            return Ok(ids);
        }

        let _guard = self.rebuild_lock.lock().map_err(|_| poisoned())?;

        // Another caller may have finished a rebuild while we waited.
        if let Some(ids) = self.cached()? {
            return Ok(ids);
        }

        self.publish(rebuild)
    }

    /// Run `rebuild` and publish its result even if the cache is valid.
    ///
    /// Serialized with lazy rebuilds, so the caller always gets the output
    /// of its own closure.
    pub fn rebuild<F>(&self, rebuild: F) -> Result<Arc<[u64]>>
    where
        F: FnOnce() -> Result<Vec<u64>>,
    {
        let _guard = self.rebuild_lock.lock().map_err(|_| poisoned())?;
        self.publish(rebuild)
    }

    /// Caller must hold `rebuild_lock`.
    fn publish<F>(&self, rebuild: F) -> Result<Arc<[u64]>>
    where
        F: FnOnce() -> Result<Vec<u64>>,
    {
        let generation = self.state.read().map_err(|_| poisoned())?.generation;

        let mut ids = rebuild()?;
        ids.sort_unstable();
        ids.dedup();
        let ids: Arc<[u64]> = ids.into();

        let mut state = self.state.write().map_err(|_| poisoned())?;
        if state.generation == generation {
            state.ids = Some(Arc::clone(&ids));
        } else {
            tracing::debug!("id cache invalidated during rebuild, not publishing");
        }
        Ok(ids)
    }

    fn cached(&self) -> Result<Option<Arc<[u64]>>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.ids.clone())
    }
}

fn poisoned() -> Error {
    Error::Inconsistent("id cache lock poisoned".into())
}
