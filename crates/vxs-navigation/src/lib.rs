//! # VXS Navigation
//!
//! Router store and navigation actions on top of [`vxs_router`] linking.
//!
//! - [`store::RouterStore`] owns the route tree and the root navigation
//!   state and derives [`route_info::UrlObject`] from it
//! - [`action`] turns a target state into the action for the shallowest
//!   diverging navigator
//! - [`container::NavigationContainer`] is the seam to the UI's navigator
//!   tree; [`memory::MemoryNavigationContainer`] implements it in memory
//! - [`history::BrowserHistory`] records displayed URLs and mask state
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use vxs_navigation::{MemoryNavigationContainer, RouterStore, StoreOptions};
//! use vxs_router::{RouteTree, TreeOptions};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let tree = RouteTree::build(["index.tsx", "about.tsx"], TreeOptions::default());
//! let container = Arc::new(MemoryNavigationContainer::new());
//! let store = Arc::new(RouterStore::new());
//!
//! store
//!     .initialize(tree.root().clone(), container.clone(), None, Some("/"), StoreOptions::default())
//!     .unwrap();
//! container.mount(store.initial_state().unwrap());
//!
//! store.push("/about").await.unwrap();
//! assert_eq!(store.route_info().pathname, "/about");
//! # });
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod action;
pub mod container;
pub mod error;
pub mod history;
pub mod href;
pub mod memory;
pub mod route_info;
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use action::{get_navigate_action, ActionPayload, LinkKind, NavigationAction};
pub use container::{DispatchOutcome, ListenerId, NavigationContainer, StateListener};
pub use error::{NavigationError, Result, RouterError};
pub use history::{BrowserHistory, HistoryEntry, MemoryHistory};
pub use href::{Href, HrefObject};
pub use memory::MemoryNavigationContainer;
pub use route_info::{get_route_info_from_state, UrlObject};
pub use store::{LinkOptions, LoadState, RouterStore, StoreOptions, SubscriptionId, UnhandledActionPolicy};
