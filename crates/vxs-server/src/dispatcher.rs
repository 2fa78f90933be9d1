// File: vxs-server/src/dispatcher.rs
// Purpose: Match requests against the route manifest and hand them to a handler

use axum::http::{Method, StatusCode};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error};
use vxs_loader::handoff::href_from_loader_path;
use vxs_router::path::parse_search;
use vxs_router::{Params, RouteInfo, RouteManifest, RouteType};

use crate::config::Config;
use crate::error::HandlerError;
use crate::handlers::{RequestHandlers, RouteRequest};
use crate::render;
use crate::request::{DispatchOutput, IncomingRequest};
use crate::single_flight::{SingleFlight, SingleFlightStats};

/// Paths served by the dev tooling itself
pub const DEV_ASSET_PREFIXES: &[&str] = &["/@vxs/", "/@fs/", "/@id/", "/__vxs", "/node_modules/"];

pub type IgnoreFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// `None` means the request is left to the hosting server.
pub type DispatchResult = Result<Option<DispatchOutput>, HandlerError>;

#[derive(Clone)]
pub struct DispatcherOptions {
    /// Render diagnostic pages instead of propagating page errors
    pub dev: bool,
    pub ignore_prefixes: Vec<String>,
    /// Caller-supplied predicate over the pathname
    pub ignore: Option<IgnoreFn>,
    pub title: String,
    /// Script the SPA shell boots from
    pub client_entry: String,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            dev: cfg!(debug_assertions),
            ignore_prefixes: Vec::new(),
            ignore: None,
            title: "vxs".to_string(),
            client_entry: "/assets/client.js".to_string(),
        }
    }
}

impl DispatcherOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dev: config.is_dev(),
            ignore_prefixes: config.routing.ignore.clone(),
            ignore: None,
            title: config.project.name.clone(),
            client_entry: config.build.client_entry.clone(),
        }
    }

    pub fn with_ignore(mut self, ignore: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.ignore = Some(Arc::new(ignore));
        self
    }
}

/// Routes GET requests to the SSR, loader-data or API handler
///
/// Concurrent requests for the same URL share one dispatch.
pub struct RequestDispatcher {
    manifest: RwLock<Arc<RouteManifest>>,
    handlers: Arc<dyn RequestHandlers>,
    options: DispatcherOptions,
    flights: SingleFlight<String, DispatchResult>,
}

impl RequestDispatcher {
    pub fn new(manifest: Arc<RouteManifest>, handlers: Arc<dyn RequestHandlers>, options: DispatcherOptions) -> Self {
        Self {
            manifest: RwLock::new(manifest),
            handlers,
            options,
            flights: SingleFlight::new(),
        }
    }

    pub fn manifest(&self) -> Arc<RouteManifest> {
        Arc::clone(&self.manifest.read())
    }

    /// Swaps in a rebuilt manifest; in-flight requests keep the old one.
    ///
    /// Handlers drop loader data kept from earlier renders.
    pub fn set_manifest(&self, manifest: Arc<RouteManifest>) {
        *self.manifest.write() = manifest;
        self.handlers.routes_changed();
    }

    pub fn options(&self) -> &DispatcherOptions {
        &self.options
    }

    pub fn stats(&self) -> SingleFlightStats {
        self.flights.stats()
    }

    pub fn is_ignored(&self, pathname: &str) -> bool {
        DEV_ASSET_PREFIXES.iter().any(|p| pathname.starts_with(p))
            || self.options.ignore_prefixes.iter().any(|p| pathname.starts_with(p.as_str()))
            || self.options.ignore.as_ref().is_some_and(|ignore| ignore(pathname))
    }

    pub async fn handle_request(self: &Arc<Self>, request: IncomingRequest) -> DispatchResult {
        if request.method != Method::GET {
            return Ok(None);
        }
        if self.is_ignored(request.pathname()) {
            debug!(path = %request.pathname(), "Ignoring request");
            return Ok(None);
        }

        let key = request.url();
        let dispatcher = Arc::clone(self);
        self.flights
            .run(key, move || async move { dispatcher.dispatch(request).await })
            .await
    }

    async fn dispatch(&self, request: IncomingRequest) -> DispatchResult {
        let manifest = self.manifest();
        let pathname = request.pathname().to_string();

        if let Some((route, params)) = manifest.match_api(&pathname) {
            debug!(path = %pathname, file = %route.file, "API route");
            let matched = matched(request, route, pathname, params);
            let result = self.handlers.handle_api(&matched).await.map(|response| {
                match response.redirect_location() {
                    Some(location) => DispatchOutput::redirect(response.status.as_u16(), location),
                    None => DispatchOutput::Api(response),
                }
            });
            return self.finish(&matched, result, false);
        }

        // before pages: the root not-found catch-all would match loader paths
        if let Some(href) = href_from_loader_path(&pathname) {
            let Some((route, params)) = manifest.match_page(&href) else {
                return Ok(None);
            };
            debug!(path = %href, file = %route.file, "Loader data request");
            let matched = matched(request, route, href, params);
            let result = self.handlers.handle_loader(&matched).await.map(DispatchOutput::Script);
            return self.finish(&matched, result, false);
        }

        let Some((route, params)) = manifest.match_page(&pathname) else {
            return Ok(None);
        };

        let status = if route.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::OK
        };

        if route.route_type == RouteType::Spa {
            debug!(path = %pathname, file = %route.file, "SPA shell");
            let body = render::spa_shell(&self.options.title, &self.options.client_entry).into_string();
            return Ok(Some(DispatchOutput::Html { status, body }));
        }

        debug!(path = %pathname, file = %route.file, status = %status, "Page render");
        let matched = matched(request, route, pathname, params);
        let result = self
            .handlers
            .handle_ssr(&matched)
            .await
            .map(|body| DispatchOutput::Html { status, body });
        self.finish(&matched, result, true)
    }

    fn finish(&self, matched: &RouteRequest, result: Result<DispatchOutput, HandlerError>, page: bool) -> DispatchResult {
        match result {
            Ok(output) => Ok(Some(output)),
            Err(HandlerError::Redirect { status, location }) => Ok(Some(DispatchOutput::redirect(status, location))),
            Err(err) if page && self.options.dev => {
                error!(url = %matched.request.url(), file = %matched.route.file, error = %err, "Page render failed");
                let page = render::error_page(&matched.request.url(), Some(matched.route.file.as_str()), &err.chain());
                Ok(Some(DispatchOutput::Html {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: page.into_string(),
                }))
            }
            Err(err) => {
                error!(url = %matched.request.url(), file = %matched.route.file, error = %err, "Request failed");
                Err(err)
            }
        }
    }
}

/// Search params first so path params win on a name clash.
fn matched(request: IncomingRequest, route: &RouteInfo, pathname: String, path_params: Params) -> RouteRequest {
    let mut params = parse_search(request.query());
    params.extend(path_params);
    RouteRequest {
        request,
        route: route.clone(),
        pathname,
        params,
    }
}
