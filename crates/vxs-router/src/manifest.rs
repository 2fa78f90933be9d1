//! Compiled route manifest
//!
//! Flattens a route tree into regex-matchable entries for request dispatch:
//! `{api_routes, page_routes, middleware_routes}`, each in specificity order.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;
use serde::Serialize;
use tracing::error;

use crate::params::{ParamValue, Params};
use crate::path::{decode_segment, normalize_path};
use crate::route::parser::parse_route_file;
use crate::route::pattern::{compare_specificity, url_segments, SegmentKind};
use crate::route::{DynamicSegment, RouteNode, RouteType};

/// A route pattern compiled to a regex with named capture groups
///
/// `route_keys` maps each capture group to the declared param name. Group
/// names are sanitized (`vxs` prefix, alphanumerics only) since param names
/// may contain characters regex group names cannot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPattern {
    pub named_regex: String,
    pub route_keys: BTreeMap<String, String>,
    #[serde(skip)]
    dynamic: Vec<DynamicSegment>,
    #[serde(skip)]
    regex: Regex,
}

impl CompiledPattern {
    /// Compiles URL segments into an exact-match pattern.
    pub fn compile(segments: &[SegmentKind]) -> Result<Self, regex::Error> {
        Self::build(segments, false)
    }

    /// Compiles URL segments into a pattern that also matches everything below.
    pub fn compile_prefix(segments: &[SegmentKind]) -> Result<Self, regex::Error> {
        Self::build(segments, true)
    }

    /// Compiles a route pattern string such as `/photos/[id]`.
    pub fn from_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Self::compile(&url_segments(pattern))
    }

    fn build(segments: &[SegmentKind], open_ended: bool) -> Result<Self, regex::Error> {
        let mut body = String::new();
        let mut route_keys = BTreeMap::new();
        let mut dynamic = Vec::new();

        for segment in segments {
            let Some(name) = segment.param_name() else {
                if let SegmentKind::Static(text) = segment {
                    body.push('/');
                    body.push_str(&regex::escape(text));
                }
                continue;
            };

            let key = route_key(name, &route_keys);
            match segment {
                SegmentKind::Dynamic(_) => body.push_str(&format!("/(?P<{}>[^/]+?)", key)),
                SegmentKind::CatchAll(_) => body.push_str(&format!("/(?P<{}>.+?)", key)),
                _ => body.push_str(&format!("(?:/(?P<{}>.+?))?", key)),
            }
            route_keys.insert(key, name.to_string());
            dynamic.push(DynamicSegment {
                name: name.to_string(),
                deep: segment.is_deep(),
                not_found: matches!(segment, SegmentKind::NotFound),
            });
        }

        let tail = if open_ended { "(?:/.*)?$" } else { "(?:/)?$" };
        let named_regex = format!("^{}{}", body, tail);
        let regex = Regex::new(&named_regex)?;

        Ok(Self {
            named_regex,
            route_keys,
            dynamic,
            regex,
        })
    }

    /// Matches a pathname, extracting params
    ///
    /// The pathname is normalized first. Dynamic values are percent-decoded;
    /// deep values are split into their segments.
    ///
    /// ```
    /// use vxs_router::manifest::CompiledPattern;
    /// use vxs_router::params::ParamValue;
    ///
    /// let pattern = CompiledPattern::from_pattern("/files/[...path]").unwrap();
    /// let params = pattern.matches("/files/a/b/c").unwrap();
    /// assert_eq!(params["path"], ParamValue::from(vec!["a", "b", "c"]));
    /// ```
    pub fn matches(&self, pathname: &str) -> Option<Params> {
        let pathname = normalize_path(pathname);
        let captures = self.regex.captures(&pathname)?;

        let params = self
            .route_keys
            .iter()
            .filter_map(|(key, name)| {
                let raw = captures.name(key)?.as_str();
                let value = if self.is_deep(name) {
                    ParamValue::Many(
                        raw.split('/')
                            .filter(|s| !s.is_empty())
                            .map(|s| decode_segment(s).into_owned())
                            .collect(),
                    )
                } else {
                    ParamValue::One(decode_segment(raw).into_owned())
                };
                Some((name.clone(), value))
            })
            .collect();

        Some(params)
    }

    pub fn is_match(&self, pathname: &str) -> bool {
        self.regex.is_match(&normalize_path(pathname))
    }

    pub fn dynamic(&self) -> &[DynamicSegment] {
        &self.dynamic
    }

    fn is_deep(&self, name: &str) -> bool {
        self.dynamic.iter().any(|d| d.deep && d.name == name)
    }
}

fn route_key(name: &str, taken: &BTreeMap<String, String>) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let base = format!("vxs{}", sanitized);

    let mut key = base.clone();
    let mut n = 1;
    while taken.contains_key(&key) {
        key = format!("{}{}", base, n);
        n += 1;
    }
    key
}

/// Public path pattern for URL segments, e.g. `/users/[id]`.
pub fn page_pattern(segments: &[SegmentKind]) -> String {
    let parts: Vec<String> = segments.iter().map(SegmentKind::pattern).collect();
    format!("/{}", parts.join("/"))
}

/// One matchable manifest entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInfo {
    pub file: String,
    pub page: String,
    #[serde(flatten)]
    pub pattern: CompiledPattern,
    #[serde(rename = "type")]
    pub route_type: RouteType,
    pub layouts: Vec<String>,
    pub middlewares: Vec<String>,
}

impl RouteInfo {
    pub fn matches(&self, pathname: &str) -> Option<Params> {
        self.pattern.matches(pathname)
    }

    pub fn is_not_found(&self) -> bool {
        self.pattern.dynamic().iter().any(|d| d.not_found)
    }
}

/// Compiled patterns reused across rebuilds, keyed by `(file, page)`
#[derive(Debug, Default)]
pub struct ManifestCache {
    entries: HashMap<(String, String), CompiledPattern>,
}

impl ManifestCache {
    fn get_or_compile(
        &mut self,
        file: &str,
        page: &str,
        segments: &[SegmentKind],
        open_ended: bool,
    ) -> Result<CompiledPattern, regex::Error> {
        let key = (file.to_string(), page.to_string());
        if let Some(pattern) = self.entries.get(&key) {
            return Ok(pattern.clone());
        }
        let pattern = CompiledPattern::build(segments, open_ended)?;
        self.entries.insert(key, pattern.clone());
        Ok(pattern)
    }

    /// Drops entries for files no longer present in the tree.
    pub fn retain_files(&mut self, root: &RouteNode) {
        let mut live: HashSet<&str> = HashSet::new();
        for node in root.walk() {
            live.insert(&node.context_key);
            live.extend(node.middlewares.iter().map(String::as_str));
        }
        self.entries.retain(|(file, _), _| live.contains(file.as_str()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The compiled manifest consumed by the request dispatcher and build tooling
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteManifest {
    pub api_routes: Vec<RouteInfo>,
    pub page_routes: Vec<RouteInfo>,
    /// Middlewares run at directory boundaries; their entries match the
    /// directory and everything below it.
    pub middleware_routes: Vec<RouteInfo>,
}

impl RouteManifest {
    /// First API route matching `pathname`.
    pub fn match_api(&self, pathname: &str) -> Option<(&RouteInfo, Params)> {
        first_match(&self.api_routes, pathname)
    }

    /// First page route matching `pathname`, in manifest order.
    pub fn match_page(&self, pathname: &str) -> Option<(&RouteInfo, Params)> {
        first_match(&self.page_routes, pathname)
    }

    /// Every middleware covering `pathname`, root first.
    pub fn match_middlewares(&self, pathname: &str) -> Vec<&RouteInfo> {
        self.middleware_routes
            .iter()
            .filter(|m| m.pattern.is_match(pathname))
            .collect()
    }
}

fn first_match<'a>(routes: &'a [RouteInfo], pathname: &str) -> Option<(&'a RouteInfo, Params)> {
    routes
        .iter()
        .find_map(|route| route.matches(pathname).map(|params| (route, params)))
}

/// Compiles the manifest for a tree
///
/// Layouts contribute their route prefix; slot routes are not directly
/// addressable and stay out of the manifest.
pub fn get_manifest(root: &RouteNode, cache: &mut ManifestCache) -> RouteManifest {
    let mut api_routes = Vec::new();
    let mut page_routes = Vec::new();
    collect_routes(root, &[], cache, &mut api_routes, &mut page_routes);

    sort_by_page(&mut api_routes);
    sort_by_page(&mut page_routes);

    let mut middleware_routes = Vec::new();
    let mut seen = HashSet::new();
    for node in root.walk() {
        for key in &node.middlewares {
            if !seen.insert(key.clone()) {
                continue;
            }
            let Ok(parsed) = parse_route_file(key) else {
                continue;
            };
            let segments = url_segments(&parsed.dir_names().join("/"));
            let page = page_pattern(&segments);
            match cache.get_or_compile(key, &page, &segments, true) {
                Ok(pattern) => middleware_routes.push(RouteInfo {
                    file: key.clone(),
                    page,
                    pattern,
                    route_type: RouteType::Layout,
                    layouts: Vec::new(),
                    middlewares: Vec::new(),
                }),
                Err(e) => error!(file = %key, error = %e, "Failed to compile middleware pattern"),
            }
        }
    }
    middleware_routes.sort_by_key(|m| url_segments(&m.page).len());

    RouteManifest {
        api_routes,
        page_routes,
        middleware_routes,
    }
}

fn collect_routes(
    node: &RouteNode,
    prefix: &[SegmentKind],
    cache: &mut ManifestCache,
    api_routes: &mut Vec<RouteInfo>,
    page_routes: &mut Vec<RouteInfo>,
) {
    for child in &node.children {
        let mut segments = prefix.to_vec();
        segments.extend(url_segments(&child.route));

        if child.is_layout() {
            collect_routes(child, &segments, cache, api_routes, page_routes);
            continue;
        }

        let page = page_pattern(&segments);
        let pattern = match cache.get_or_compile(&child.context_key, &page, &segments, false) {
            Ok(pattern) => pattern,
            Err(e) => {
                error!(file = %child.context_key, error = %e, "Failed to compile route pattern");
                continue;
            }
        };

        let info = RouteInfo {
            file: child.context_key.clone(),
            page,
            pattern,
            route_type: child.route_type,
            layouts: child.layouts.clone(),
            middlewares: child.middlewares.clone(),
        };

        if child.route_type == RouteType::Api {
            api_routes.push(info);
        } else {
            page_routes.push(info);
        }
    }
}

fn sort_by_page(routes: &mut [RouteInfo]) {
    routes.sort_by(|a, b| compare_specificity(&url_segments(&a.page), &url_segments(&b.page)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_regex_shapes() {
        let p = CompiledPattern::from_pattern("/users/[id]").unwrap();
        assert_eq!(p.named_regex, "^/users/(?P<vxsid>[^/]+?)(?:/)?$");
        assert_eq!(p.route_keys.get("vxsid").map(String::as_str), Some("id"));

        let root = CompiledPattern::from_pattern("/").unwrap();
        assert_eq!(root.named_regex, "^(?:/)?$");
        assert!(root.is_match("/"));
    }

    #[test]
    fn test_route_keys_are_sanitized() {
        let p = CompiledPattern::from_pattern("/[user-id]/+not-found").unwrap();
        assert_eq!(p.route_keys.get("vxsuser_id").map(String::as_str), Some("user-id"));
        assert_eq!(p.route_keys.get("vxsnot_found").map(String::as_str), Some("not-found"));
    }

    #[test]
    fn test_not_found_matches_everything_below() {
        let p = CompiledPattern::from_pattern("/docs/+not-found").unwrap();
        assert!(p.is_match("/docs"));
        assert_eq!(
            p.matches("/docs/a/b").unwrap().get("not-found"),
            Some(&ParamValue::from(vec!["a", "b"]))
        );
    }

    #[test]
    fn test_malformed_percent_encoding_falls_back() {
        let p = CompiledPattern::from_pattern("/[id]").unwrap();
        assert_eq!(
            p.matches("/%E0%A4%A").unwrap().get("id"),
            Some(&ParamValue::from("%E0%A4%A"))
        );
    }

    #[test]
    fn test_prefix_pattern() {
        let p = CompiledPattern::compile_prefix(&url_segments("admin")).unwrap();
        assert!(p.is_match("/admin"));
        assert!(p.is_match("/admin/users/1"));
        assert!(!p.is_match("/administrator"));
    }
}
