//! # VXS Router
//!
//! File-system based routing with support for:
//! - Static routes (`about.tsx` → `/about`)
//! - Dynamic segments (`users/[id].tsx` → `/users/42`)
//! - Catch-all segments (`files/[...path].tsx` → `/files/a/b/c`)
//! - Groups (`(marketing)/about.tsx` → `/about`)
//! - Nested layouts, middlewares and API routes (`+api`)
//! - Parallel slots (`@modal`) and intercept routes (`(.)`, `(..)`, `(...)`)
//! - Per-directory render modes (`+ssr`, `+ssg`, `+spa`)
//!
//! ## Pipeline
//!
//! 1. [`tree`] builds a [`RouteNode`] tree from a directory listing
//! 2. [`manifest`] compiles it into regex-matchable entries for dispatch
//! 3. [`linking`] maps paths to nested navigation state and back
//!
//! ## Path Normalization
//!
//! Handles all common user mistakes gracefully:
//! - Trailing slashes: `/path/` → `/path`
//! - Double slashes: `/path//to` → `/path/to`
//! - Backslashes: `\path\to` → `/path/to`
//! - Malformed percent-encoding: kept as raw text
//!
//! ## Example
//!
//! ```
//! use vxs_router::linking::{get_linking_config, get_path_from_state, get_state_from_path, PathOptions};
//! use vxs_router::{RouteTree, TreeOptions};
//!
//! let tree = RouteTree::build(["index.tsx", "users/[id].tsx", "api/health+api.ts"], TreeOptions::default());
//!
//! let (route, params) = tree.manifest().match_page("/users/123").unwrap();
//! assert_eq!(route.file, "./users/[id].tsx");
//! assert_eq!(params["id"].first(), Some("123"));
//!
//! let config = get_linking_config(tree.root());
//! let state = get_state_from_path("/users/123", &config).unwrap();
//! assert_eq!(get_path_from_state(&state, &config, PathOptions::default()), "/users/123");
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod error;
mod intercept;
pub mod linking;
pub mod manifest;
pub mod params;
pub mod path;
pub mod route;
pub mod tree;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{MaskError, RouteBuildError};
pub use intercept::InterceptLevel;
pub use manifest::{get_manifest, CompiledPattern, ManifestCache, RouteInfo, RouteManifest};
pub use params::{ParamValue, Params, HASH_PARAM};
pub use path::{is_valid_path, normalize_path};
pub use route::{DynamicSegment, InterceptRoute, RenderMode, RouteNode, RouteSlot, RouteType};
pub use tree::{build_route_tree, RouteTree, TreeOptions};
