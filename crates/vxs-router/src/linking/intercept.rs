//! Intercept resolution for soft navigations.

use serde::Serialize;

use crate::manifest::CompiledPattern;
use crate::params::Params;
use crate::path::{parse_search, split_url};
use crate::route::RouteNode;

use super::state::NavigationState;

/// How a navigation was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    /// In-app link or imperative navigation
    Soft,
    /// Full URL load or refresh
    Hard,
}

/// A slot route that should render instead of a full navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptMatch {
    /// Context key of the layout owning the slot
    pub layout: String,
    pub slot: String,
    /// Context key of the intercept route
    pub route: String,
    /// Route name of the intercept route within its slot
    pub route_name: String,
    pub params: Params,
    pub href: String,
}

/// Finds an intercept route for `href`
///
/// Layouts along the focused chain of `state` are searched deepest first;
/// within a layout, slots and their routes are tried in order. Hard
/// navigations never intercept.
pub fn find_intercept_route(
    root: &RouteNode,
    state: Option<&NavigationState>,
    href: &str,
    mode: NavigationMode,
) -> Option<InterceptMatch> {
    if mode == NavigationMode::Hard {
        return None;
    }

    let parts = split_url(href);
    let layouts = focused_layouts(root, state);

    layouts.iter().rev().find_map(|layout| {
        layout.slots.iter().find_map(|slot| {
            slot.routes.iter().find_map(|route| {
                let intercept = route.intercept.as_ref()?;
                let pattern = CompiledPattern::from_pattern(&intercept.target).ok()?;
                let path_params = pattern.matches(parts.pathname)?;

                let mut params = parse_search(parts.search);
                params.extend(path_params);

                Some(InterceptMatch {
                    layout: layout.context_key.clone(),
                    slot: slot.name.clone(),
                    route: route.context_key.clone(),
                    route_name: route.route.clone(),
                    params,
                    href: href.to_string(),
                })
            })
        })
    })
}

/// Layout nodes along the focused chain of `state`, root first.
fn focused_layouts<'a>(root: &'a RouteNode, state: Option<&NavigationState>) -> Vec<&'a RouteNode> {
    let mut layouts = vec![root];
    let mut node = root;
    let mut current = state;

    while let Some(level) = current {
        let Some(route) = level.focused() else {
            break;
        };
        let Some(child) = node.child(&route.name).filter(|c| c.is_layout()) else {
            break;
        };
        layouts.push(child);
        node = child;
        current = route.state.as_deref();
    }

    layouts
}
