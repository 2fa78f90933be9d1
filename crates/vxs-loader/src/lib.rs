//! # VXS Loader
//!
//! Loader data for vxs routes, from the server render to client navigations.
//!
//! ## Features
//!
//! - **Module Registry**: explicit route file → loader map built at build time
//! - **Loader Data Cache**: `Unresolved → Pending → Resolved | Failed` entries
//!   with single-flight loads
//! - **Handoff**: SSR data embedded under `window.__vxsLoaderData__`, read once
//! - **Preloading**: hover, viewport or intent heuristics run loaders ahead of
//!   navigation; attempts kept in a bounded history
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use vxs_loader::{ModuleRegistry, PreloadOptions, Preloader, RouteModule};
//! use vxs_router::{RouteTree, TreeOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tree = RouteTree::build(["index.tsx", "users/[id].tsx"], TreeOptions::default());
//!     let registry = Arc::new(ModuleRegistry::new().with(
//!         RouteModule::new("./users/[id].tsx").with_loader(|props| async move { Ok(json!({ "path": props.path })) }),
//!     ));
//!
//!     let preloader = Arc::new(Preloader::new(registry, tree.manifest().clone(), PreloadOptions::default()));
//!     preloader.preload_now("/users/7").await.unwrap();
//!     assert_eq!(preloader.take_preloaded("/users/7"), Some(json!({ "path": "/users/7" })));
//! }
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod handoff;
pub mod module;
pub mod preload;
pub mod strategy;

pub use cache::{CacheStats, EntryState, LoaderDataCache, LoaderEntry, DEFAULT_CACHE_CAPACITY};
pub use client::{DataSource, LoaderClient, LoaderFetcher};
pub use error::{LoaderError, Result};
pub use handoff::{Handoff, HandoffPayload, LOADER_DATA_GLOBAL, LOADER_PATH_PREFIX};
pub use module::{LoaderFn, LoaderProps, LoaderRequest, ModuleRegistry, RouteModule};
pub use preload::{PreloadEntry, PreloadOptions, PreloadStatus, PreloadStrategy, Preloader};
pub use strategy::{LinkEvent, PreloadController, PreloadTrigger, Rect};
