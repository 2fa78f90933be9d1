// File: vxs-navigation/src/route_info.rs
// Purpose: URL view of a navigation state, recomputed on every state change

use serde::Serialize;
use vxs_router::linking::{get_path_from_state, LinkingConfig, NavigationState, PathOptions};
use vxs_router::{Params, HASH_PARAM};

/// Where the app is, as a URL
///
/// Derived from the navigation state; never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlObject {
    /// Displayed path without query or hash
    pub pathname: String,
    /// Params of the focused route, hash excluded
    pub params: Params,
    /// Route pattern segments including groups, e.g. `["(app)", "users", "[id]"]`
    pub segments: Vec<String>,
    pub is_index: bool,
    /// Full href including base URL, query and hash
    pub unstable_global_href: String,
}

impl UrlObject {
    /// The `/` route before any state exists.
    pub fn root() -> Self {
        Self {
            pathname: "/".to_string(),
            unstable_global_href: "/".to_string(),
            ..Default::default()
        }
    }
}

/// Computes the URL view of `state` (pure function).
pub fn get_route_info_from_state(state: &NavigationState, config: &LinkingConfig) -> UrlObject {
    let href = get_path_from_state(state, config, PathOptions::default());

    let local = LinkingConfig {
        base_url: None,
        ..config.clone()
    };
    let plain = get_path_from_state(state, &local, PathOptions::default());
    let pathname = plain
        .split(['?', '#'])
        .next()
        .filter(|p| !p.is_empty())
        .unwrap_or("/")
        .to_string();

    let pattern = get_path_from_state(state, &local, PathOptions::pattern());
    let segments = pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let mut params = state.active_params();
    params.remove(HASH_PARAM);

    let is_index = state
        .focused_leaf()
        .is_some_and(|route| route.name == "index" || route.name.ends_with("/index"));

    UrlObject {
        pathname,
        params,
        segments,
        is_index,
        unstable_global_href: href,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vxs_router::linking::{get_linking_config, get_state_from_path};
    use vxs_router::params::params;
    use vxs_router::{RouteTree, TreeOptions};

    #[test]
    fn test_route_info() {
        let tree = RouteTree::build(["index.tsx", "(app)/users/[id].tsx"], TreeOptions::default());
        let config = get_linking_config(tree.root()).with_base_url("/base");
        let state = get_state_from_path("/base/users/4?tab=a#top", &config).unwrap();

        assert_eq!(
            get_route_info_from_state(&state, &config),
            UrlObject {
                pathname: "/users/4".into(),
                params: params([("id", "4"), ("tab", "a")]),
                segments: vec!["(app)".into(), "users".into(), "[id]".into()],
                is_index: false,
                unstable_global_href: "/base/users/4?tab=a#top".into(),
            }
        );
    }

    #[test]
    fn test_index_route_info() {
        let tree = RouteTree::build(["index.tsx"], TreeOptions::default());
        let config = get_linking_config(tree.root());
        let state = get_state_from_path("/", &config).unwrap();

        let info = get_route_info_from_state(&state, &config);
        assert_eq!(info.pathname, "/");
        assert!(info.is_index);
        assert!(info.segments.is_empty());
    }
}
