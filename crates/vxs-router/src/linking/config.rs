//! Screen configuration derived from the route tree.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::route::{RouteNode, RouteType};

/// A string-to-string param coercion (`parse` on decode, `stringify` on encode)
#[derive(Clone)]
pub struct ParamTransform(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl ParamTransform {
    pub fn new(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, value: &str) -> String {
        (*self.0)(value)
    }
}

impl fmt::Debug for ParamTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParamTransform(..)")
    }
}

/// Config for one screen
///
/// `path` is the route with a trailing `index` removed; groups are kept and
/// dropped at match time.
#[derive(Debug, Clone, Default)]
pub struct ScreenConfig {
    pub name: String,
    pub path: String,
    pub initial_route_name: Option<String>,
    pub screens: Vec<ScreenConfig>,
    pub parse: BTreeMap<String, ParamTransform>,
    pub stringify: BTreeMap<String, ParamTransform>,
    /// A navigator rather than a leaf screen
    pub layout: bool,
}

impl ScreenConfig {
    pub fn screen(&self, name: &str) -> Option<&ScreenConfig> {
        self.screens.iter().find(|s| s.name == name)
    }
}

/// The root `{initial_route_name, screens}` structure matched against paths
#[derive(Debug, Clone, Default)]
pub struct LinkingConfig {
    /// Prefix stripped before decoding and prepended after encoding
    pub base_url: Option<String>,
    pub initial_route_name: Option<String>,
    pub screens: Vec<ScreenConfig>,
}

impl LinkingConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn screen(&self, name: &str) -> Option<&ScreenConfig> {
        self.screens.iter().find(|s| s.name == name)
    }

    /// Looks up a nested screen by its name chain, e.g. `["blog", "[slug]"]`.
    pub fn screen_mut(&mut self, chain: &[&str]) -> Option<&mut ScreenConfig> {
        let (first, rest) = chain.split_first()?;
        let mut screen = self.screens.iter_mut().find(|s| s.name == *first)?;
        for name in rest {
            screen = screen.screens.iter_mut().find(|s| s.name == *name)?;
        }
        Some(screen)
    }
}

/// Route string with a trailing `index` segment removed.
pub fn strip_index(route: &str) -> &str {
    if route == "index" {
        ""
    } else {
        route.strip_suffix("/index").unwrap_or(route)
    }
}

/// Derives the screen configuration of a route tree (pure function)
///
/// API routes have no screen and are left out.
///
/// ```
/// use vxs_router::linking::get_linking_config;
/// use vxs_router::tree::{build_route_tree, TreeOptions};
///
/// let built = build_route_tree(&["index.tsx", "blog/_layout.tsx", "blog/[slug].tsx"], &TreeOptions::default());
/// let config = get_linking_config(&built.root);
/// assert_eq!(config.screen("index").unwrap().path, "");
/// assert_eq!(config.screen("blog").unwrap().screens[0].path, "[slug]");
/// ```
pub fn get_linking_config(root: &RouteNode) -> LinkingConfig {
    LinkingConfig {
        base_url: None,
        initial_route_name: root.initial_route_name.clone(),
        screens: screens_for(&root.children),
    }
}

fn screens_for(children: &[RouteNode]) -> Vec<ScreenConfig> {
    children
        .iter()
        .filter(|node| node.route_type != RouteType::Api)
        .map(|node| ScreenConfig {
            name: node.route.clone(),
            path: strip_index(&node.route).to_string(),
            initial_route_name: node.initial_route_name.clone(),
            screens: screens_for(&node.children),
            layout: node.is_layout(),
            ..Default::default()
        })
        .collect()
}
