//! Encode direction: navigation state → path.

use std::collections::HashSet;

use crate::params::{ParamValue, Params, HASH_PARAM};
use crate::path::{encode_search, encode_segment};
use crate::route::pattern::{classify_segment, SegmentKind};

use super::config::{LinkingConfig, ScreenConfig};
use super::state::NavigationState;

/// Flags threaded through every level of encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathOptions {
    /// Emit `[param]` patterns instead of values; no query or hash
    pub preserve_dynamic_routes: bool,
    /// Keep `(group)` segments
    pub preserve_groups: bool,
}

impl PathOptions {
    /// Pattern form used for matching and grouping: `/(app)/users/[id]`.
    pub fn pattern() -> Self {
        Self {
            preserve_dynamic_routes: true,
            preserve_groups: true,
        }
    }
}

/// Encodes a navigation state into a path (pure function)
///
/// Walks the focused route of every level, emitting static segments and
/// substituting dynamic ones with URL-encoded params. Params of the deepest
/// route that the path did not consume become the query string; `#` becomes
/// the hash.
///
/// ```
/// use vxs_router::linking::{get_linking_config, get_path_from_state, get_state_from_path, PathOptions};
/// use vxs_router::tree::{build_route_tree, TreeOptions};
///
/// let built = build_route_tree(&["(app)/users/[id].tsx"], &TreeOptions::default());
/// let config = get_linking_config(&built.root);
/// let state = get_state_from_path("/users/a%20b?tab=1#top", &config).unwrap();
///
/// assert_eq!(get_path_from_state(&state, &config, PathOptions::default()), "/users/a%20b?tab=1#top");
/// assert_eq!(get_path_from_state(&state, &config, PathOptions::pattern()), "/(app)/users/[id]");
/// ```
pub fn get_path_from_state(state: &NavigationState, config: &LinkingConfig, options: PathOptions) -> String {
    let mut segments = Vec::new();
    let mut consumed = HashSet::new();
    let leaf_params = walk(state, &config.screens, options, &mut segments, &mut consumed);

    let mut path = format!("/{}", segments.join("/"));
    if let Some(base) = config
        .base_url
        .as_deref()
        .map(|b| b.trim_end_matches('/'))
        .filter(|b| !b.is_empty())
    {
        path = if path == "/" { base.to_string() } else { format!("{}{}", base, path) };
    }

    if options.preserve_dynamic_routes {
        return path;
    }

    if let Some(params) = leaf_params {
        let query = encode_search(
            params
                .iter()
                .filter(|(key, _)| key.as_str() != HASH_PARAM && !consumed.contains(key.as_str())),
        );
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query);
        }
        if let Some(hash) = params.get(HASH_PARAM).and_then(ParamValue::first) {
            if !hash.is_empty() {
                path.push('#');
                path.push_str(hash);
            }
        }
    }

    path
}

/// Emits the segments of one level and recurses into the focused nested state.
/// Returns the params of the deepest route reached.
fn walk<'a>(
    state: &'a NavigationState,
    screens: &[ScreenConfig],
    options: PathOptions,
    segments: &mut Vec<String>,
    consumed: &mut HashSet<String>,
) -> Option<&'a Params> {
    let route = state.focused()?;
    let Some(screen) = screens.iter().find(|s| s.name == route.name) else {
        return Some(&route.params);
    };

    for raw in screen.path.split('/').filter(|s| !s.is_empty()) {
        let kind = classify_segment(raw).unwrap_or_else(|_| SegmentKind::Static(raw.to_string()));
        match &kind {
            SegmentKind::Group(_) => {
                if options.preserve_groups {
                    segments.push(raw.to_string());
                }
            }
            SegmentKind::Slot(_) => {}
            SegmentKind::Static(text) => segments.push(encode_segment(text).into_owned()),
            _ => {
                let Some(name) = kind.param_name() else {
                    continue;
                };
                consumed.insert(name.to_string());

                if options.preserve_dynamic_routes {
                    segments.push(kind.pattern());
                    continue;
                }

                match route.params.get(name) {
                    Some(value) => {
                        let values = if kind.is_deep() {
                            value.values()
                        } else {
                            value.first().into_iter().collect()
                        };
                        segments.extend(
                            values
                                .into_iter()
                                .map(|v| stringify(screen, name, v))
                                .map(|v| encode_segment(&v).into_owned()),
                        );
                    }
                    None if matches!(kind, SegmentKind::NotFound) => {}
                    None => segments.push(kind.pattern()),
                }
            }
        }
    }

    match route.state.as_deref() {
        Some(nested) if !screen.screens.is_empty() => {
            walk(nested, &screen.screens, options, segments, consumed).or(Some(&route.params))
        }
        _ => Some(&route.params),
    }
}

fn stringify(screen: &ScreenConfig, name: &str, value: &str) -> String {
    match screen.stringify.get(name) {
        Some(transform) => transform.apply(value),
        None => value.to_string(),
    }
}
