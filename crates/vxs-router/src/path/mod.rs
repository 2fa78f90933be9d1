//! URL path utilities: validation, normalization and safe percent-coding
//!
//! All functions are **pure**: given same input, always produce same output with no side effects.
//! None of them panic on malformed input; undecodable text is passed through raw.

use std::borrow::Cow;

use crate::params::{ParamValue, Params};

/// Validates if a path is in canonical form
///
/// # Rules
///
/// - Must start with `/`
/// - Must not contain `//` or `\`
/// - Must not end with `/` (except root `/`)
/// - Must not be empty
///
/// # Examples
///
/// ```
/// use vxs_router::path::is_valid_path;
///
/// assert!(is_valid_path("/"));
/// assert!(is_valid_path("/users/123"));
///
/// assert!(!is_valid_path(""));
/// assert!(!is_valid_path("about"));
/// assert!(!is_valid_path("/about/"));
/// assert!(!is_valid_path("/about//page"));
/// ```
pub fn is_valid_path(path: &str) -> bool {
    if path.is_empty() || !path.starts_with('/') {
        return false;
    }

    if path.contains("//") || path.contains('\\') {
        return false;
    }

    path == "/" || !path.ends_with('/')
}

/// Normalize a path to canonical form
///
/// Returns `Cow::Borrowed` when input is already valid (zero allocations).
///
/// - Trailing slashes: `/path/` → `/path`
/// - Repeated slashes: `/path//to` → `/path/to`
/// - Backslashes: `\path\to` → `/path/to`
///
/// ```
/// use vxs_router::path::normalize_path;
///
/// assert_eq!(normalize_path("/about/"), "/about");
/// assert_eq!(normalize_path("/path//to///page"), "/path/to/page");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if is_valid_path(path) {
        return Cow::Borrowed(path);
    }

    let normalized = path
        .replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if normalized.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{}", normalized))
    }
}

/// A URL split into its path, search and hash parts (without `?` and `#`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub pathname: &'a str,
    pub search: &'a str,
    pub hash: &'a str,
}

/// Splits `"/a/b?x=1#top"` into pathname, search and hash.
///
/// Absolute URLs (`https://host/path`) are reduced to their path.
pub fn split_url(url: &str) -> UrlParts<'_> {
    let url = strip_origin(url);
    let (rest, hash) = url.split_once('#').unwrap_or((url, ""));
    let (pathname, search) = rest.split_once('?').unwrap_or((rest, ""));
    UrlParts {
        pathname,
        search,
        hash,
    }
}

fn strip_origin(url: &str) -> &str {
    match url.find("://") {
        Some(scheme_end) => {
            let after = &url[scheme_end + 3..];
            after.find('/').map(|i| &after[i..]).unwrap_or("/")
        }
        None => url,
    }
}

/// Whether an href points at another scheme (`https:`, `mailto:`, ...).
pub fn has_scheme(href: &str) -> bool {
    match href.find(':') {
        Some(i) => {
            let scheme = &href[..i];
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && !href.starts_with('/')
        }
        None => false,
    }
}

/// Percent-decodes a path segment, falling back to the raw text when the
/// result is not valid UTF-8.
///
/// ```
/// use vxs_router::path::decode_segment;
///
/// assert_eq!(decode_segment("hello%20world"), "hello world");
/// assert_eq!(decode_segment("%E0%A4%A"), "%E0%A4%A");
/// ```
pub fn decode_segment(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

/// Percent-encodes a single path segment or query component.
pub fn encode_segment(segment: &str) -> Cow<'_, str> {
    urlencoding::encode(segment)
}

/// Splits a pathname into decoded, non-empty segments.
///
/// Repeated slashes collapse, so `//a///b/` yields `["a", "b"]`.
pub fn path_segments(pathname: &str) -> Vec<String> {
    pathname
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .map(|s| decode_segment(s).into_owned())
        .collect()
}

/// Parses a search string (`a=1&b=2&a=3`) into params; repeated keys become `Many`.
///
/// `+` is read as a space, as browsers do for query strings.
pub fn parse_search(search: &str) -> Params {
    let search = search.strip_prefix('?').unwrap_or(search);
    let mut out = Params::new();

    for pair in search.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_query_component(key);
        if key.is_empty() {
            continue;
        }
        let value = decode_query_component(value);

        match out.get_mut(&key) {
            Some(existing) => existing.push(value),
            None => {
                out.insert(key, ParamValue::One(value));
            }
        }
    }

    out
}

fn decode_query_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    decode_segment(&spaced).into_owned()
}

/// Encodes params as a search string without the leading `?`.
///
/// Keys are emitted in map order; `Many` values repeat their key.
pub fn encode_search<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a ParamValue)>,
{
    entries
        .into_iter()
        .flat_map(|(key, value)| {
            value
                .values()
                .into_iter()
                .map(move |v| format!("{}={}", encode_segment(key), encode_segment(v)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::params;

    #[test]
    fn test_is_valid_path() {
        assert!(is_valid_path("/"));
        assert!(is_valid_path("/about"));
        assert!(is_valid_path("/blog/posts/hello-world"));

        assert!(!is_valid_path(""));
        assert!(!is_valid_path("about"));
        assert!(!is_valid_path("/about/"));
        assert!(!is_valid_path("/about\\page"));
    }

    #[test]
    fn test_normalize_path_valid_is_borrowed() {
        let path = normalize_path("/about");
        assert!(matches!(path, Cow::Borrowed("/about")));
    }

    #[test]
    fn test_normalize_path_backslash() {
        assert_eq!(normalize_path("\\users\\123"), "/users/123");
    }

    #[test]
    fn test_split_url() {
        let parts = split_url("/a/b?x=1&y=2#top");
        assert_eq!(parts.pathname, "/a/b");
        assert_eq!(parts.search, "x=1&y=2");
        assert_eq!(parts.hash, "top");

        let parts = split_url("https://example.com/photos/5?x=1");
        assert_eq!(parts.pathname, "/photos/5");
        assert_eq!(parts.search, "x=1");

        let parts = split_url("https://example.com");
        assert_eq!(parts.pathname, "/");
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("https://example.com"));
        assert!(has_scheme("mailto:someone@example.com"));
        assert!(!has_scheme("/users/1"));
        assert!(!has_scheme("./a:b"));
        assert!(!has_scheme("settings"));
    }

    #[test]
    fn test_path_segments_collapse_and_decode() {
        assert_eq!(path_segments("//a///b%20c/"), vec!["a", "b c"]);
        assert!(path_segments("/").is_empty());
        assert_eq!(path_segments("/%C3"), vec!["%C3"]);
    }

    #[test]
    fn test_parse_search_repeated_keys() {
        let parsed = parse_search("?a=1&b=two+words&a=3&=skip&flag");
        assert_eq!(
            parsed,
            params([
                ("a", ParamValue::from(vec!["1", "3"])),
                ("b", ParamValue::from("two words")),
                ("flag", ParamValue::from("")),
            ])
        );
    }

    #[test]
    fn test_encode_search() {
        let p = params([
            ("a", ParamValue::from(vec!["1", "3"])),
            ("q", ParamValue::from("x y")),
        ]);
        assert_eq!(encode_search(&p), "a=1&a=3&q=x%20y");
    }
}
