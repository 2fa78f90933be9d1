// File: vxs-server/src/modules.rs
// Purpose: Route module resolution, from the registry and build output

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use vxs_loader::{LoaderError, ModuleRegistry, RouteModule};

use crate::build_info::BuildInfo;
use crate::error::HandlerError;
use crate::request::{ApiRequest, ApiResponse};

/// An API route handler: `(request, {params}) -> response`
pub type ApiFn = Arc<dyn Fn(ApiRequest) -> BoxFuture<'static, Result<ApiResponse, HandlerError>> + Send + Sync>;

/// Gives the dispatcher executable modules for route files
///
/// In development this is backed by the bundler; in production by the
/// statically built registry.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Page module for a route file.
    async fn load(&self, file: &str) -> Result<Arc<RouteModule>, HandlerError>;

    /// Handler for an `+api` route file.
    async fn api(&self, file: &str) -> Result<ApiFn, HandlerError>;

    /// Client script for a route file, if it has one.
    async fn client_js(&self, file: &str) -> Result<Option<String>, HandlerError>;
}

/// Production modules: the build-time registry plus `buildInfo.json`
#[derive(Default)]
pub struct StaticModules {
    registry: Arc<ModuleRegistry>,
    api: RwLock<HashMap<String, ApiFn>>,
    build_info: BuildInfo,
}

impl StaticModules {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            ..Default::default()
        }
    }

    /// A module per route file, with assets from the build where known.
    ///
    /// Loaders are not part of the build output; register them on the
    /// returned registry.
    pub fn for_files<S: AsRef<str>>(files: &[S], build_info: BuildInfo) -> Self {
        let registry = ModuleRegistry::new();
        for file in files {
            let file = file.as_ref();
            let mut module = RouteModule::new(file);
            if let Some(built) = build_info.route(file) {
                module.css = built.css.first().cloned();
                module.client_js = built.client_js.clone();
            }
            registry.register(module);
        }
        Self::new(Arc::new(registry)).with_build_info(build_info)
    }

    pub fn with_build_info(mut self, build_info: BuildInfo) -> Self {
        self.build_info = build_info;
        self
    }

    pub fn with_api<F, Fut>(self, file: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ApiResponse, HandlerError>> + Send + 'static,
    {
        let handler: ApiFn = Arc::new(move |request: ApiRequest| handler(request).boxed());
        self.api.write().insert(file.into(), handler);
        self
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn build_info(&self) -> &BuildInfo {
        &self.build_info
    }
}

#[async_trait]
impl ModuleLoader for StaticModules {
    async fn load(&self, file: &str) -> Result<Arc<RouteModule>, HandlerError> {
        Ok(self.registry.require(file)?)
    }

    async fn api(&self, file: &str) -> Result<ApiFn, HandlerError> {
        self.api
            .read()
            .get(file)
            .cloned()
            .ok_or_else(|| LoaderError::ModuleNotFound(file.to_string()).into())
    }

    async fn client_js(&self, file: &str) -> Result<Option<String>, HandlerError> {
        let from_module = self.registry.get(file).and_then(|m| m.client_js.clone());
        Ok(from_module.or_else(|| self.build_info.route(file).and_then(|r| r.client_js.clone())))
    }
}
