use crate::{
    loader::{sdk::SdkReady, LoadError},
    prelude::{Arc, Mutex},
};
use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::Lazy;

/// The in-flight (or settled) SDK load every caller awaits
pub type LoadFuture = Shared<BoxFuture<'static, Result<SdkReady, LoadError>>>;

/// Process-wide cache shared by loaders that don't bring their own
static GLOBAL_CACHE: Lazy<Arc<LoadCache>> = Lazy::new(|| Arc::new(LoadCache::new()));

struct CacheEntry {
    generation: u64,
    future: LoadFuture,
}

#[derive(Default)]
struct CacheState {
    next_generation: u64,
    entry: Option<CacheEntry>,
}

/// Holds at most one shared SDK load.
///
/// Each stored load gets a generation number so a caller that saw it fail
/// can only invalidate that exact load, never a newer retry.
#[derive(Default)]
pub struct LoadCache {
    state: Mutex<CacheState>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> Arc<LoadCache> {
        GLOBAL_CACHE.clone()
    }

    /// Return the cached load, or store the one built by `create`.
    ///
    /// `create` runs under the cache lock, at most once per generation.
    pub fn get_or_create<F>(&self, create: F) -> (LoadFuture, u64)
    where
        F: FnOnce() -> BoxFuture<'static, Result<SdkReady, LoadError>>,
    {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(entry) = &state.entry {
            return (entry.future.clone(), entry.generation);
        }

        let generation = state.next_generation;
        state.next_generation += 1;
        let future = create().shared();
        state.entry = Some(CacheEntry {
            generation,
            future: future.clone(),
        });
        log::debug!("started SDK load generation {generation}");
        (future, generation)
    }

    /// Drop the cached load if it is still `generation`. Returns whether
    /// anything was removed.
    pub fn invalidate(&self, generation: u64) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        match &state.entry {
            Some(entry) if entry.generation == generation => {
                state.entry = None;
                log::debug!("invalidated SDK load generation {generation}");
                true
            }
            _ => false,
        }
    }

    /// Forget whatever is cached
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.entry = None;
        }
    }

    pub fn is_cached(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.entry.is_some())
            .unwrap_or(false)
    }
}
