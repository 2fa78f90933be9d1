//! Decode direction: path → navigation state.

use crate::params::{ParamValue, Params, HASH_PARAM};
use crate::path::{parse_search, path_segments, split_url};

use super::config::{LinkingConfig, ScreenConfig};
use super::matcher::{match_configs, match_segments};
use super::state::{NavigationState, StateRoute};

/// Strips a configured base URL off a path. Paths outside the base are left alone.
pub fn strip_base_url<'a>(path: &'a str, base_url: Option<&str>) -> &'a str {
    let Some(base) = base_url.map(|b| b.trim_end_matches('/')).filter(|b| !b.is_empty()) else {
        return path;
    };
    match path.strip_prefix(base) {
        Some(rest) if rest.is_empty() => "/",
        Some(rest) if rest.starts_with(['/', '?', '#']) => rest,
        _ => path,
    }
}

/// Decodes a path into a navigation state (pure function)
///
/// Candidates are tried most specific first; the first whose pattern
/// consumes every segment wins. Path params, search params and the hash
/// (under `#`) are put on every level of the resulting state. Returns
/// `None` when nothing matches.
///
/// # Examples
///
/// ```
/// use vxs_router::linking::{get_linking_config, get_state_from_path};
/// use vxs_router::params::ParamValue;
/// use vxs_router::tree::{build_route_tree, TreeOptions};
///
/// let built = build_route_tree(&["users/[id].tsx", "users/settings.tsx"], &TreeOptions::default());
/// let config = get_linking_config(&built.root);
///
/// let state = get_state_from_path("/users/settings", &config).unwrap();
/// assert_eq!(state.focused_names(), vec!["users/settings"]);
///
/// let state = get_state_from_path("/users/42?tab=posts", &config).unwrap();
/// assert_eq!(state.active_params()["id"], ParamValue::from("42"));
/// assert_eq!(state.active_params()["tab"], ParamValue::from("posts"));
/// ```
pub fn get_state_from_path(path: &str, config: &LinkingConfig) -> Option<NavigationState> {
    let path = strip_base_url(path, config.base_url.as_deref());
    let parts = split_url(path);
    let segments = path_segments(parts.pathname);

    let mut extra = parse_search(parts.search);
    if !parts.hash.is_empty() {
        extra.insert(HASH_PARAM.to_string(), ParamValue::One(parts.hash.to_string()));
    }

    for candidate in match_configs(config) {
        let Some(path_params) = match_segments(&candidate.segments, &segments) else {
            continue;
        };
        let Some(chain) = resolve_initial(candidate.chain) else {
            continue;
        };

        let mut params = extra.clone();
        params.extend(path_params);
        apply_parsers(&chain, &mut params);
        return Some(create_nested_state(config, &chain, &params));
    }

    if segments.is_empty() {
        let name = config.initial_route_name.as_deref()?;
        let screen = config.screen(name)?;
        let chain = resolve_initial(vec![screen])?;
        return Some(create_nested_state(config, &chain, &extra));
    }

    None
}

/// Extends a chain ending at a navigator down to the screen it opens on:
/// its `initial_route_name`, or its first index child.
fn resolve_initial(mut chain: Vec<&ScreenConfig>) -> Option<Vec<&ScreenConfig>> {
    loop {
        let last = *chain.last()?;
        if !last.layout && last.screens.is_empty() {
            return Some(chain);
        }

        let next = last
            .initial_route_name
            .as_deref()
            .and_then(|name| last.screen(name))
            .or_else(|| last.screens.iter().find(|s| s.path.is_empty()))?;
        chain.push(next);
    }
}

fn apply_parsers(chain: &[&ScreenConfig], params: &mut Params) {
    for screen in chain {
        for (name, parse) in &screen.parse {
            if let Some(ParamValue::One(value)) = params.get_mut(name) {
                *value = parse.apply(value);
            }
        }
    }
}

/// Builds the nested state for a resolved chain
///
/// The same param set goes on every level. A navigator whose initial route
/// differs from the matched one gets the initial route prepended so back
/// navigation lands there.
fn create_nested_state(config: &LinkingConfig, chain: &[&ScreenConfig], params: &Params) -> NavigationState {
    let mut nested: Option<NavigationState> = None;

    for (i, screen) in chain.iter().enumerate().rev() {
        let initial = match i {
            0 => config.initial_route_name.as_deref(),
            _ => chain[i - 1].initial_route_name.as_deref(),
        };

        let mut route = StateRoute::new(screen.name.clone()).with_params(params.clone());
        route.state = nested.take().map(Box::new);

        nested = Some(match initial {
            Some(initial) if initial != screen.name => {
                NavigationState::from_routes(vec![StateRoute::new(initial), route], 1)
            }
            _ => NavigationState::from_routes(vec![route], 0),
        });
    }

    nested.unwrap_or_default()
}
