//! Route module for file-based routing
//!
//! Contains the route node model plus the pure functional pieces that build
//! it: segment classification ([`pattern`]) and file parsing ([`parser`]).

pub mod parser;
pub mod pattern;

use serde::{Deserialize, Serialize};

use crate::intercept::InterceptLevel;
pub use pattern::{classify_segment, url_segments, RenderMode, SegmentKind};

/// How a route is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    Ssg,
    Spa,
    Ssr,
    Api,
    Layout,
}

impl From<RenderMode> for RouteType {
    fn from(mode: RenderMode) -> Self {
        match mode {
            RenderMode::Ssg => Self::Ssg,
            RenderMode::Ssr => Self::Ssr,
            RenderMode::Spa => Self::Spa,
        }
    }
}

/// Descriptor of one dynamic segment of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicSegment {
    pub name: String,
    /// Spans one or more URL segments (`[...name]`, `+not-found`)
    pub deep: bool,
    pub not_found: bool,
}

impl DynamicSegment {
    /// Extracts the dynamic descriptors of a route string.
    pub fn from_route(route: &str) -> Option<Vec<Self>> {
        let dynamic: Vec<Self> = url_segments(route)
            .iter()
            .filter_map(|seg| {
                seg.param_name().map(|name| Self {
                    name: name.to_string(),
                    deep: seg.is_deep(),
                    not_found: matches!(seg, SegmentKind::NotFound),
                })
            })
            .collect();

        (!dynamic.is_empty()).then_some(dynamic)
    }
}

/// URL an intercept route stands in for, e.g. `/photos/[id]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterceptRoute {
    pub level: InterceptLevel,
    pub target: String,
}

/// Parallel route slot (`@name`) owned by a layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSlot {
    pub name: String,
    pub routes: Vec<RouteNode>,
}

/// One file-system-derived route or layout
///
/// `route` is relative to the owning layout: a page at `users/[id].tsx`
/// under the root layout has route `users/[id]`, while the same page under
/// `users/_layout.tsx` has route `[id]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteNode {
    pub route: String,
    pub context_key: String,
    pub dynamic: Option<Vec<DynamicSegment>>,
    pub children: Vec<RouteNode>,
    #[serde(rename = "type")]
    pub route_type: RouteType,
    /// Ancestor layout chain, root first
    pub layouts: Vec<String>,
    /// Ancestor middleware chain, root first
    pub middlewares: Vec<String>,
    pub slots: Vec<RouteSlot>,
    pub intercept: Option<InterceptRoute>,
    pub initial_route_name: Option<String>,
    /// Framework route such as the fallback not-found page
    pub internal: bool,
    /// Synthesized, not backed by a file
    pub generated: bool,
}

impl RouteNode {
    /// Whether this node owns child routes.
    pub fn is_layout(&self) -> bool {
        self.route_type == RouteType::Layout
    }

    /// Whether this node is a `+not-found` route.
    pub fn is_not_found(&self) -> bool {
        self.dynamic
            .as_ref()
            .is_some_and(|d| d.iter().any(|s| s.not_found))
    }

    /// Finds a direct child by route name.
    pub fn child(&self, route: &str) -> Option<&RouteNode> {
        self.children.iter().find(|c| c.route == route)
    }

    /// Depth-first walk over this node and all descendants, slots excluded.
    pub fn walk(&self) -> Vec<&RouteNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_from_route() {
        assert_eq!(DynamicSegment::from_route("about"), None);
        assert_eq!(
            DynamicSegment::from_route("(app)/files/[...path]"),
            Some(vec![DynamicSegment {
                name: "path".to_string(),
                deep: true,
                not_found: false,
            }])
        );
        assert_eq!(
            DynamicSegment::from_route("+not-found"),
            Some(vec![DynamicSegment {
                name: "not-found".to_string(),
                deep: true,
                not_found: true,
            }])
        );
    }
}
