//! # VXS Server
//!
//! Request dispatch for vxs file-system routes.
//!
//! Every GET request is matched against the compiled route manifest and
//! handed to one of three handlers:
//!
//! - **API routes** (`+api` files) get the request plus path params
//! - **Loader data** requests under `/_vxs/loader/...` get client JS with the
//!   page's loader output inlined
//! - **Pages** are server-rendered, or answered with a bootstrap shell for
//!   `spa` routes; the not-found route renders with status 404
//!
//! Concurrent requests for the same URL share one render.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vxs_loader::{ModuleRegistry, RouteModule};
//! use vxs_router::{RouteTree, TreeOptions};
//! use vxs_server::{
//!     DataRenderer, DispatcherOptions, IncomingRequest, RequestDispatcher, RouteHandlers, StaticModules,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let tree = RouteTree::build(["index.tsx"], TreeOptions::default());
//!     let modules = StaticModules::new(Arc::new(ModuleRegistry::new().with(RouteModule::new("./index.tsx"))));
//!     let handlers = RouteHandlers::new(Arc::new(modules), Arc::new(DataRenderer));
//!     let dispatcher = Arc::new(RequestDispatcher::new(
//!         tree.manifest().clone(),
//!         Arc::new(handlers),
//!         DispatcherOptions::default(),
//!     ));
//!
//!     let output = dispatcher.handle_request(IncomingRequest::get("/missing")).await.unwrap().unwrap();
//!     assert_eq!(output.status().as_u16(), 404);
//! }
//! ```

pub mod app;
pub mod build_info;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod modules;
pub mod render;
pub mod request;
pub mod single_flight;
pub mod watcher;

pub use app::{app, AppState};
pub use build_info::{BuildInfo, BuiltRoute};
pub use config::Config;
pub use dispatcher::{DispatchResult, DispatcherOptions, RequestDispatcher};
pub use error::{HandlerError, Result, ServerError};
pub use handlers::{DataRenderer, PageContext, PageRenderer, RequestHandlers, RouteHandlers, RouteRequest};
pub use modules::{ApiFn, ModuleLoader, StaticModules};
pub use request::{ApiRequest, ApiResponse, DispatchOutput, IncomingRequest};
pub use single_flight::SingleFlight;
pub use watcher::{scan_routes, RouteChange, RouteWatcher};
