// File: vxs-loader/src/module.rs
// Purpose: Explicit route-to-module registry populated at build time

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use vxs_router::Params;

use crate::error::{LoaderError, Result};

/// The request a server-side loader runs for
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LoaderRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// Input of a loader call: `{path, params, request?}`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LoaderProps {
    pub path: String,
    pub params: Params,
    /// Absent for client-side preloads
    pub request: Option<LoaderRequest>,
}

pub type LoaderFn = Arc<dyn Fn(LoaderProps) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// What the build knows about one route file
#[derive(Clone, Default)]
pub struct RouteModule {
    /// Context key, e.g. `./users/[id].tsx`
    pub file: String,
    pub loader: Option<LoaderFn>,
    /// Stylesheet to fetch alongside a preload
    pub css: Option<String>,
    /// Built client bundle for the route
    pub client_js: Option<String>,
}

impl std::fmt::Debug for RouteModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteModule")
            .field("file", &self.file)
            .field("loader", &self.loader.is_some())
            .field("css", &self.css)
            .field("client_js", &self.client_js)
            .finish()
    }
}

impl RouteModule {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    pub fn with_loader<F, Fut>(mut self, loader: F) -> Self
    where
        F: Fn(LoaderProps) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.loader = Some(Arc::new(move |props: LoaderProps| loader(props).boxed()));
        self
    }

    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    pub fn with_client_js(mut self, js: impl Into<String>) -> Self {
        self.client_js = Some(js.into());
        self
    }

    pub fn has_loader(&self) -> bool {
        self.loader.is_some()
    }

    /// Runs the loader standalone, without rendering the route.
    pub async fn run_loader(&self, props: LoaderProps) -> Result<Value> {
        let loader = self
            .loader
            .clone()
            .ok_or_else(|| LoaderError::NoLoader(self.file.clone()))?;
        (*loader)(props).await
    }
}

/// Route file → module map
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, Arc<RouteModule>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, module: RouteModule) {
        self.modules.write().insert(module.file.clone(), Arc::new(module));
    }

    pub fn with(self, module: RouteModule) -> Self {
        self.register(module);
        self
    }

    pub fn get(&self, file: &str) -> Option<Arc<RouteModule>> {
        self.modules.read().get(file).cloned()
    }

    pub fn require(&self, file: &str) -> Result<Arc<RouteModule>> {
        self.get(file).ok_or_else(|| LoaderError::ModuleNotFound(file.to_string()))
    }

    pub fn remove(&self, file: &str) -> bool {
        self.modules.write().remove(file).is_some()
    }

    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.modules.read().keys().cloned().collect();
        files.sort();
        files
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_run_loader_passes_props() {
        let module = RouteModule::new("./users/[id].tsx").with_loader(|props: LoaderProps| async move {
            Ok(json!({ "path": props.path, "id": props.params.get("id").and_then(|v| v.first()) }))
        });

        let props = LoaderProps {
            path: "/users/3".into(),
            params: vxs_router::params::params([("id", "3")]),
            request: None,
        };
        assert_eq!(
            module.run_loader(props).await.unwrap(),
            json!({ "path": "/users/3", "id": "3" })
        );
    }

    #[tokio::test]
    async fn test_missing_loader_and_module() {
        let registry = ModuleRegistry::new().with(RouteModule::new("./about.tsx"));

        let module = registry.require("./about.tsx").unwrap();
        assert_eq!(
            module.run_loader(LoaderProps::default()).await,
            Err(LoaderError::NoLoader("./about.tsx".into()))
        );
        assert_eq!(
            registry.require("./nope.tsx").unwrap_err(),
            LoaderError::ModuleNotFound("./nope.tsx".into())
        );
    }
}
