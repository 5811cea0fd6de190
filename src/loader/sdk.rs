use crate::{
    core::config::LoaderConfig,
    loader::{cache::LoadCache, LoadError},
    prelude::Arc,
    runtime,
    traits::SdkHost,
};
use futures::FutureExt;

/// How far the SDK has loaded, as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkStatus {
    /// Library object present and initialized
    Ready,
    /// Script tag present, library not yet initialized
    ScriptPresent,
    /// Nothing loaded yet
    Absent,
}

/// Which path a load took to readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPath {
    AlreadyLoaded,
    Initialized,
    Injected,
}

/// Proof that the SDK is usable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdkReady {
    pub path: LoadPath,
}

impl SdkReady {
    pub fn new(path: LoadPath) -> Self {
        Self { path }
    }
}

/// Loads the SDK at most once per cache.
///
/// Every loader built on the same [`LoadCache`] (by default the
/// process-wide one) shares a single in-flight load, whichever widget
/// asked first.
#[derive(Clone)]
pub struct SdkLoader {
    host: Arc<dyn SdkHost>,
    config: LoaderConfig,
    cache: Arc<LoadCache>,
}

impl SdkLoader {
    /// Loader on the process-wide cache
    pub fn new(host: Arc<dyn SdkHost>, config: LoaderConfig) -> Self {
        Self::with_cache(host, config, LoadCache::global())
    }

    pub fn with_cache(host: Arc<dyn SdkHost>, config: LoaderConfig, cache: Arc<LoadCache>) -> Self {
        Self {
            host,
            config,
            cache,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Make the SDK ready, joining any load already in flight.
    ///
    /// A missing app key fails before anything is cached. Any other failure
    /// evicts the cached load so the next call starts over.
    pub async fn load(&self) -> Result<SdkReady, LoadError> {
        let Some(url) = self.config.script_url() else {
            log::warn!("mapping SDK app key missing; not loading");
            return Err(LoadError::MissingAppKey);
        };

        let host = self.host.clone();
        let limit = self.config.timeout;
        let (future, generation) = self.cache.get_or_create(move || {
            async move {
                match runtime::timeout(limit, run_load(host, url)).await {
                    Ok(result) => result,
                    Err(_) => Err(LoadError::Timeout(limit)),
                }
            }
            .boxed()
        });

        let result = future.await;
        match &result {
            Ok(ready) => log::debug!("mapping SDK ready ({:?})", ready.path),
            Err(e) => {
                if self.cache.invalidate(generation) {
                    log::warn!("mapping SDK load failed: {e}");
                }
            }
        }
        result
    }

    /// Poll for a sub-module the SDK attaches after initialization
    pub async fn wait_for_module(&self, name: &str) -> Result<(), LoadError> {
        let attempts = self.config.module_poll_attempts.max(1);
        for attempt in 1..=attempts {
            if self.host.has_module(name) {
                return Ok(());
            }
            if attempt < attempts {
                runtime::sleep(self.config.module_poll_interval).await;
            }
        }

        log::warn!("SDK module {name} unavailable after {attempts} polls");
        Err(LoadError::ModuleUnavailable(name.to_string()))
    }
}

async fn run_load(host: Arc<dyn SdkHost>, url: String) -> Result<SdkReady, LoadError> {
    match host.status() {
        SdkStatus::Ready => Ok(SdkReady::new(LoadPath::AlreadyLoaded)),
        SdkStatus::ScriptPresent => {
            host.initialize().await?;
            Ok(SdkReady::new(LoadPath::Initialized))
        }
        SdkStatus::Absent => {
            log::info!("injecting mapping SDK script");
            host.inject_script(&url).await?;
            host.initialize().await?;
            Ok(SdkReady::new(LoadPath::Injected))
        }
    }
}
