// File: vxs-navigation/src/href.rs
// Purpose: Href forms accepted by the router and their resolution to paths

use serde::Serialize;
use vxs_router::path::{encode_search, encode_segment, has_scheme, split_url};
use vxs_router::route::pattern::{classify_segment, SegmentKind};
use vxs_router::Params;

use crate::error::{Result, RouterError};

/// Object href: a route pattern plus the params to fill it with
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct HrefObject {
    pub pathname: String,
    pub params: Params,
}

/// Anything a link can point at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Href {
    Path(String),
    Object(HrefObject),
}

impl From<&str> for Href {
    fn from(value: &str) -> Self {
        Self::Path(value.to_string())
    }
}

impl From<String> for Href {
    fn from(value: String) -> Self {
        Self::Path(value)
    }
}

impl From<HrefObject> for Href {
    fn from(value: HrefObject) -> Self {
        Self::Object(value)
    }
}

/// Whether `href` leaves the app: a URL scheme or a protocol-relative URL.
pub fn is_external(href: &str) -> bool {
    has_scheme(href) || href.starts_with("//")
}

/// Turns an href into a path string
///
/// Dynamic segments of an object href are filled from its params; params
/// the pattern does not use become the query string.
///
/// ```
/// use vxs_navigation::href::{resolve_href, HrefObject};
/// use vxs_router::params::params;
///
/// let href = HrefObject {
///     pathname: "/users/[id]".into(),
///     params: params([("id", "7"), ("tab", "posts")]),
/// };
/// assert_eq!(resolve_href(&href.into()).unwrap(), "/users/7?tab=posts");
/// ```
pub fn resolve_href(href: &Href) -> Result<String> {
    match href {
        Href::Path(path) => Ok(path.clone()),
        Href::Object(object) => interpolate(object),
    }
}

fn interpolate(object: &HrefObject) -> Result<String> {
    let mut segments = Vec::new();
    let mut used = Vec::new();

    for raw in object.pathname.split('/').filter(|s| !s.is_empty()) {
        let kind = classify_segment(raw).unwrap_or_else(|_| SegmentKind::Static(raw.to_string()));
        match &kind {
            SegmentKind::Group(_) | SegmentKind::Slot(_) => {}
            SegmentKind::Static(_) => segments.push(raw.to_string()),
            _ => {
                let Some(name) = kind.param_name() else {
                    continue;
                };
                let value = object.params.get(name);
                match value {
                    Some(value) if kind.is_deep() => {
                        segments.extend(value.values().into_iter().map(|v| encode_segment(v).into_owned()))
                    }
                    Some(value) => {
                        let first = value.first().unwrap_or_default();
                        segments.push(encode_segment(first).into_owned());
                    }
                    None if matches!(kind, SegmentKind::NotFound) => {}
                    None => {
                        return Err(RouterError::MissingParam {
                            pathname: object.pathname.clone(),
                            param: name.to_string(),
                        })
                    }
                }
                used.push(name.to_string());
            }
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    let query = encode_search(object.params.iter().filter(|(key, _)| !used.contains(*key)));
    if !query.is_empty() {
        path.push('?');
        path.push_str(&query);
    }
    Ok(path)
}

/// Resolves `./` and `../` hrefs against the current pathname
///
/// Follows URL resolution: the last segment of `current` is the document,
/// so `./x` from `/a/b` is `/a/x` and `../x` is `/x`. Absolute hrefs are
/// returned unchanged.
pub fn resolve_relative(href: &str, current: &str) -> String {
    if !href.starts_with("./") && !href.starts_with("../") && href != "." && href != ".." {
        return href.to_string();
    }

    let current_path = split_url(current).pathname;
    let mut base: Vec<&str> = current_path.split('/').filter(|s| !s.is_empty()).collect();
    base.pop();

    let parts = split_url(href);
    for segment in parts.pathname.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                base.pop();
            }
            other => base.push(other),
        }
    }

    let mut resolved = format!("/{}", base.join("/"));
    if !parts.search.is_empty() {
        resolved.push('?');
        resolved.push_str(parts.search.trim_start_matches('?'));
    }
    if !parts.hash.is_empty() {
        resolved.push('#');
        resolved.push_str(parts.hash);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use vxs_router::params::params;
    use vxs_router::ParamValue;

    #[rstest]
    #[case("./x", "/a/b", "/a/x")]
    #[case("../x", "/a/b", "/x")]
    #[case("../../x", "/a/b", "/x")]
    #[case("./x?q=1#h", "/a/b", "/a/x?q=1#h")]
    #[case("/abs", "/a/b", "/abs")]
    #[case("..", "/a/b/c", "/a")]
    fn test_resolve_relative(#[case] href: &str, #[case] current: &str, #[case] expected: &str) {
        assert_eq!(resolve_relative(href, current), expected);
    }

    #[test]
    fn test_object_href_catch_all_and_groups() {
        let href = HrefObject {
            pathname: "/(docs)/files/[...path]".into(),
            params: params([("path", ParamValue::from(vec!["a", "b c"]))]),
        };
        assert_eq!(resolve_href(&href.into()).unwrap(), "/files/a/b%20c");
    }

    #[test]
    fn test_object_href_missing_param() {
        let href = HrefObject {
            pathname: "/users/[id]".into(),
            params: Params::new(),
        };
        assert_eq!(
            resolve_href(&href.into()),
            Err(RouterError::MissingParam {
                pathname: "/users/[id]".into(),
                param: "id".into(),
            })
        );
    }

    #[test]
    fn test_external() {
        assert!(is_external("https://example.com"));
        assert!(is_external("//cdn.example.com/a.js"));
        assert!(is_external("mailto:someone@example.com"));
        assert!(!is_external("/about"));
    }
}
