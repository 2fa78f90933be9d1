// File: vxs-server/src/handlers.rs
// Purpose: SSR, loader-data and API handlers invoked by the dispatcher

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use vxs_loader::handoff::{render_handoff_script, render_loader_js};
use vxs_loader::{HandoffPayload, LoaderDataCache, LoaderError, LoaderProps, RouteModule};
use vxs_router::{Params, RouteInfo};

use crate::error::HandlerError;
use crate::modules::ModuleLoader;
use crate::render::{self, Document};
use crate::request::{ApiRequest, ApiResponse, IncomingRequest};

/// A request matched to a route
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub request: IncomingRequest,
    pub route: RouteInfo,
    /// Path of the page being served; for loader-data requests the page's
    /// path, not the loader URL
    pub pathname: String,
    pub params: Params,
}

impl RouteRequest {
    fn loader_props(&self) -> LoaderProps {
        LoaderProps {
            path: self.pathname.clone(),
            params: self.params.clone(),
            request: Some(self.request.to_loader_request()),
        }
    }

    /// The href the page is shown at, with the query.
    pub fn href(&self) -> String {
        match self.request.query() {
            "" => self.pathname.clone(),
            query => format!("{}?{}", self.pathname, query),
        }
    }
}

/// The three handlers a matched request goes to
#[async_trait]
pub trait RequestHandlers: Send + Sync {
    /// Full HTML document for a page route.
    async fn handle_ssr(&self, request: &RouteRequest) -> Result<String, HandlerError>;

    /// Client JS with the page's loader data inlined.
    async fn handle_loader(&self, request: &RouteRequest) -> Result<String, HandlerError>;

    async fn handle_api(&self, request: &RouteRequest) -> Result<ApiResponse, HandlerError>;

    /// Called after the route set was rebuilt.
    fn routes_changed(&self) {}
}

/// What a renderer gets for one page
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub route: &'a RouteInfo,
    pub pathname: &'a str,
    pub params: &'a Params,
    /// Loader output, `null` for routes without a loader
    pub data: &'a Value,
}

/// Turns a route module plus its data into body markup
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, module: &RouteModule, page: PageContext<'_>) -> Result<String, HandlerError>;
}

/// Renders a page as its loader data, for running without a UI renderer
#[derive(Debug, Default)]
pub struct DataRenderer;

#[async_trait]
impl PageRenderer for DataRenderer {
    async fn render(&self, module: &RouteModule, page: PageContext<'_>) -> Result<String, HandlerError> {
        let data = serde_json::to_string_pretty(page.data).map_err(|e| HandlerError::render(&module.file, e))?;
        Ok(maud::html! {
            section data-route=(page.route.page) {
                h1 { (page.pathname) }
                pre { (data) }
            }
        }
        .into_string())
    }
}

/// Built-in handlers over a [`ModuleLoader`] and a [`PageRenderer`]
///
/// Loader output from a page render is kept under the route file until the
/// page's loader-data request picks it up, so hydration does not run the
/// loader a second time.
pub struct RouteHandlers {
    modules: Arc<dyn ModuleLoader>,
    renderer: Arc<dyn PageRenderer>,
    loader_data: LoaderDataCache,
    title: String,
    client_entry: String,
}

impl RouteHandlers {
    pub fn new(modules: Arc<dyn ModuleLoader>, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            modules,
            renderer,
            loader_data: LoaderDataCache::new(),
            title: "vxs".to_string(),
            client_entry: "/assets/client.js".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_client_entry(mut self, client_entry: impl Into<String>) -> Self {
        self.client_entry = client_entry.into();
        self
    }

    /// Loader data kept from page renders, keyed by route file.
    pub fn loader_cache(&self) -> &LoaderDataCache {
        &self.loader_data
    }

    /// The route's module; `None` for a not-found route without one.
    async fn page_module(&self, request: &RouteRequest) -> Result<Option<Arc<RouteModule>>, HandlerError> {
        match self.modules.load(&request.route.file).await {
            Ok(module) => Ok(Some(module)),
            Err(HandlerError::Loader(LoaderError::ModuleNotFound(_))) if request.route.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn load_data(&self, module: &RouteModule, request: &RouteRequest) -> Result<Value, HandlerError> {
        if !module.has_loader() {
            return Ok(Value::Null);
        }
        debug!(file = %module.file, path = %request.pathname, "Running loader");
        Ok(module.run_loader(request.loader_props()).await?)
    }
}

#[async_trait]
impl RequestHandlers for RouteHandlers {
    async fn handle_ssr(&self, request: &RouteRequest) -> Result<String, HandlerError> {
        let Some(module) = self.page_module(request).await? else {
            let body = render::not_found(&request.pathname).into_string();
            return Ok(render::document(&Document {
                title: &self.title,
                body: &body,
                ..Default::default()
            })
            .into_string());
        };

        let data = self.load_data(&module, request).await?;
        let body = self
            .renderer
            .render(
                &module,
                PageContext {
                    route: &request.route,
                    pathname: &request.pathname,
                    params: &request.params,
                    data: &data,
                },
            )
            .await?;

        let handoff = if module.has_loader() {
            let href = request.href();
            self.loader_data.set_for_href(&module.file, &href, data.clone());
            Some(render_handoff_script(&HandoffPayload {
                file: module.file.clone(),
                href,
                data,
            })?)
        } else {
            None
        };

        let mut scripts = vec![self.client_entry.clone()];
        scripts.extend(self.modules.client_js(&module.file).await?);
        let css: Vec<String> = module.css.iter().cloned().collect();

        Ok(render::document(&Document {
            title: &self.title,
            body: &body,
            css: &css,
            handoff: handoff.as_deref(),
            scripts: &scripts,
        })
        .into_string())
    }

    async fn handle_loader(&self, request: &RouteRequest) -> Result<String, HandlerError> {
        let data = match self.page_module(request).await? {
            Some(module) => match self.loader_data.take_for_href(&module.file, &request.href()) {
                Some(data) => {
                    debug!(file = %module.file, path = %request.pathname, "Loader data from page render");
                    data
                }
                None => self.load_data(&module, request).await?,
            },
            None => Value::Null,
        };
        Ok(render_loader_js(&data)?)
    }

    async fn handle_api(&self, request: &RouteRequest) -> Result<ApiResponse, HandlerError> {
        let handler = self.modules.api(&request.route.file).await?;
        handler(ApiRequest {
            request: request.request.clone(),
            params: request.params.clone(),
        })
        .await
    }

    fn routes_changed(&self) {
        self.loader_data.clear();
    }
}
