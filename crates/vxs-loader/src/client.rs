// File: vxs-loader/src/client.rs
// Purpose: Client-side loader data resolution: handoff, then preload, then fetch

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::cache::LoaderDataCache;
use crate::error::Result;
use crate::handoff::{loader_path_for, parse_loader_js, Handoff};
use crate::preload::Preloader;

/// Fetches a loader-data module from the server
#[async_trait]
pub trait LoaderFetcher: Send + Sync {
    /// GETs `path` (under the loader prefix) and returns the JS body.
    async fn fetch(&self, path: &str) -> Result<String>;
}

/// Where a navigation's loader data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Handoff,
    Preload,
    Cache,
    Network,
}

/// Resolves loader data for client navigations without fetching twice
pub struct LoaderClient {
    handoff: Handoff,
    preloader: Option<Arc<Preloader>>,
    cache: LoaderDataCache,
    fetcher: Arc<dyn LoaderFetcher>,
}

impl LoaderClient {
    pub fn new(fetcher: Arc<dyn LoaderFetcher>) -> Self {
        Self {
            handoff: Handoff::default(),
            preloader: None,
            cache: LoaderDataCache::new(),
            fetcher,
        }
    }

    pub fn with_handoff(mut self, handoff: Handoff) -> Self {
        self.handoff = handoff;
        self
    }

    /// Bounds the client cache to `capacity` hrefs.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = LoaderDataCache::with_capacity(capacity);
        self
    }

    pub fn with_preloader(mut self, preloader: Arc<Preloader>) -> Self {
        self.preloader = Some(preloader);
        self
    }

    pub fn cache(&self) -> &LoaderDataCache {
        &self.cache
    }

    /// Loader data for route `file` rendered at `href`.
    pub async fn resolve(&self, file: &str, href: &str) -> Result<Value> {
        self.resolve_with_source(file, href).await.map(|(value, _)| value)
    }

    /// Like [`resolve`](Self::resolve), also reporting the source.
    ///
    /// The SSR handoff is used once, for the hydrated route. Next come
    /// values preloaded for `href`, then the client cache. A miss fetches
    /// the loader module from the server, shared by concurrent callers.
    pub async fn resolve_with_source(&self, file: &str, href: &str) -> Result<(Value, DataSource)> {
        if let Some(value) = self.handoff.take(file) {
            self.cache.set(href, value.clone());
            return Ok((value, DataSource::Handoff));
        }

        if let Some(value) = self.preloader.as_ref().and_then(|p| p.take_preloaded(href)) {
            debug!(href = %href, "Using preloaded loader data");
            self.cache.set(href, value.clone());
            return Ok((value, DataSource::Preload));
        }

        if let Some(value) = self.cache.get(href) {
            return Ok((value, DataSource::Cache));
        }

        let fetcher = Arc::clone(&self.fetcher);
        let path = loader_path_for(href);
        let value = self
            .cache
            .load(href, move || async move {
                let js = fetcher.fetch(&path).await?;
                parse_loader_js(&js)
            })
            .await?;
        Ok((value, DataSource::Network))
    }

    /// Forgets the data cached for `href` so the next resolve refetches.
    pub fn refresh(&self, href: &str) -> bool {
        self.cache.invalidate(href)
    }
}
