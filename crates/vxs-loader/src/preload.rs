// File: vxs-loader/src/preload.rs
// Purpose: Speculative loader execution for links, with a bounded attempt history

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use vxs_router::path::{has_scheme, parse_search, split_url};
use vxs_router::RouteManifest;

use crate::error::{LoaderError, Result};
use crate::module::{LoaderProps, ModuleRegistry};

/// Which link heuristic triggers preloads. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreloadStrategy {
    /// Pointer enters a link
    Hover,
    /// Link scrolls into view
    Viewport,
    /// Pointer trajectory heads for a link, with hover as fallback
    #[default]
    Intent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreloadStatus {
    Pending,
    Loading,
    Loaded,
    Error,
}

/// One preload attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadEntry {
    pub href: String,
    pub status: PreloadStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub has_loader: bool,
    pub has_css: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadOptions {
    pub strategy: PreloadStrategy,
    /// Attempts kept in [`Preloader::history`]
    pub history_limit: usize,
    /// Preloaded values kept until a navigation takes them
    pub cache_capacity: usize,
    /// Origin of the app, e.g. `https://example.com`; absolute hrefs on
    /// other origins are never preloaded
    pub origin: Option<String>,
}

impl Default for PreloadOptions {
    fn default() -> Self {
        Self {
            strategy: PreloadStrategy::default(),
            history_limit: 100,
            cache_capacity: 50,
            origin: None,
        }
    }
}

/// Clears an in-flight href when the preload finishes or is dropped
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    href: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(self.href);
    }
}

/// Runs route loaders ahead of navigation
///
/// Values are stored by href until [`take_preloaded`](Self::take_preloaded)
/// hands them to the navigation that needs them. Failures are logged and
/// dropped; the navigation then fetches normally.
pub struct Preloader {
    registry: Arc<ModuleRegistry>,
    manifest: RwLock<Arc<RouteManifest>>,
    options: PreloadOptions,
    history: Mutex<VecDeque<PreloadEntry>>,
    preloaded: Mutex<LruCache<String, Value>>,
    in_flight: Mutex<HashSet<String>>,
}

impl Preloader {
    pub fn new(registry: Arc<ModuleRegistry>, manifest: Arc<RouteManifest>, options: PreloadOptions) -> Self {
        let capacity = NonZeroUsize::new(options.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            registry,
            manifest: RwLock::new(manifest),
            options,
            history: Mutex::new(VecDeque::new()),
            preloaded: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn options(&self) -> &PreloadOptions {
        &self.options
    }

    /// Swaps in a rebuilt manifest.
    pub fn set_manifest(&self, manifest: Arc<RouteManifest>) {
        *self.manifest.write() = manifest;
    }

    /// The in-app href for `href`, or `None` when it leaves the origin.
    pub fn same_origin(&self, href: &str) -> Option<String> {
        if !has_scheme(href) && !href.starts_with("//") {
            return Some(href.to_string());
        }
        let origin = self.options.origin.as_deref()?;
        let rest = href.strip_prefix(origin.trim_end_matches('/'))?;
        match rest {
            "" => Some("/".to_string()),
            _ if rest.starts_with(['/', '?', '#']) => Some(rest.to_string()),
            _ => None,
        }
    }

    /// Starts a background preload of `href`.
    ///
    /// Returns `None` when the href is cross-origin, already preloaded or
    /// already in flight.
    pub fn preload(self: &Arc<Self>, href: &str) -> Option<JoinHandle<()>> {
        let Some(href) = self.same_origin(href) else {
            debug!(href = %href, "Skipping cross-origin preload");
            return None;
        };
        if self.preloaded.lock().contains(&href) || !self.in_flight.lock().insert(href.clone()) {
            return None;
        }

        let preloader = Arc::clone(self);
        Some(tokio::spawn(async move {
            if let Err(e) = preloader.run(&href).await {
                error!(href = %href, error = %e, "Preload failed");
            }
            preloader.in_flight.lock().remove(&href);
        }))
    }

    /// Preloads `href` in the current task and reports the outcome.
    ///
    /// Returns `Ok` without running the loader when a preload of `href` is
    /// already in flight.
    pub async fn preload_now(&self, href: &str) -> Result<()> {
        let href = self
            .same_origin(href)
            .ok_or_else(|| LoaderError::CrossOrigin(href.to_string()))?;
        if !self.in_flight.lock().insert(href.clone()) {
            debug!(href = %href, "Preload already in flight");
            return Ok(());
        }
        let _guard = InFlight {
            set: &self.in_flight,
            href: &href,
        };
        self.run(&href).await
    }

    async fn run(&self, href: &str) -> Result<()> {
        self.record(PreloadEntry {
            href: href.to_string(),
            status: PreloadStatus::Pending,
            start_time: Utc::now(),
            end_time: None,
            error: None,
            has_loader: false,
            has_css: false,
        });

        let result = self.execute(href).await;
        let error = result.as_ref().err().map(ToString::to_string);
        self.update(href, |entry| {
            entry.status = if error.is_some() {
                PreloadStatus::Error
            } else {
                PreloadStatus::Loaded
            };
            entry.end_time = Some(Utc::now());
            entry.error = error.clone();
        });
        result
    }

    async fn execute(&self, href: &str) -> Result<()> {
        let parts = split_url(href);
        let (file, params) = {
            let manifest = self.manifest.read();
            let (route, path_params) = manifest
                .match_page(parts.pathname)
                .ok_or_else(|| LoaderError::NoRoute(href.to_string()))?;
            let mut params = parse_search(parts.search);
            params.extend(path_params);
            (route.file.clone(), params)
        };

        let module = self.registry.require(&file)?;
        self.update(href, |entry| {
            entry.status = PreloadStatus::Loading;
            entry.has_loader = module.has_loader();
            entry.has_css = module.css.is_some();
        });

        if !module.has_loader() {
            debug!(href = %href, file = %file, "Preloaded route without loader");
            return Ok(());
        }

        let props = LoaderProps {
            path: parts.pathname.to_string(),
            params,
            request: None,
        };
        let value = module.run_loader(props).await?;
        self.preloaded.lock().put(href.to_string(), value);
        debug!(href = %href, file = %file, "Preloaded loader data");
        Ok(())
    }

    fn record(&self, entry: PreloadEntry) {
        let mut history = self.history.lock();
        history.push_back(entry);
        while history.len() > self.options.history_limit.max(1) {
            history.pop_front();
        }
    }

    fn update(&self, href: &str, f: impl FnOnce(&mut PreloadEntry)) {
        let mut history = self.history.lock();
        if let Some(entry) = history.iter_mut().rev().find(|e| e.href == href) {
            f(entry);
        }
    }

    /// Removes and returns the value preloaded for `href`.
    pub fn take_preloaded(&self, href: &str) -> Option<Value> {
        let href = self.same_origin(href)?;
        self.preloaded.lock().pop(&href)
    }

    pub fn is_preloaded(&self, href: &str) -> bool {
        self.same_origin(href)
            .is_some_and(|href| self.preloaded.lock().contains(&href))
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Attempts, oldest first.
    pub fn history(&self) -> Vec<PreloadEntry> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.preloaded.lock().clear();
        self.history.lock().clear();
    }
}
