/// Segment grammar for file-based routes
///
/// Pure functional classification of route file segments into typed kinds.
/// All functions are **pure**: same input → same output, no side effects.

use serde::Serialize;
use std::cmp::Ordering;

/// One classified route segment
///
/// # Examples
///
/// ```
/// use vxs_router::route::pattern::{classify_segment, SegmentKind};
///
/// assert_eq!(classify_segment("about"), Ok(SegmentKind::Static("about".into())));
/// assert_eq!(classify_segment("(marketing)"), Ok(SegmentKind::Group("marketing".into())));
/// assert_eq!(classify_segment("[id]"), Ok(SegmentKind::Dynamic("id".into())));
/// assert_eq!(classify_segment("[...path]"), Ok(SegmentKind::CatchAll("path".into())));
/// assert_eq!(classify_segment("@modal"), Ok(SegmentKind::Slot("modal".into())));
/// assert_eq!(classify_segment("+not-found"), Ok(SegmentKind::NotFound));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SegmentKind {
    /// Literal text matched as-is
    Static(String),
    /// `(name)`: organizational only, invisible in the URL
    Group(String),
    /// `[name]`: exactly one URL segment
    Dynamic(String),
    /// `[...name]`: one or more URL segments
    CatchAll(String),
    /// `@name`: parallel route slot owned by the enclosing layout
    Slot(String),
    /// `+not-found`: zero or more URL segments, lowest priority
    NotFound,
}

/// Why a segment failed to classify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentIssue {
    Malformed,
    EmptyName,
}

/// Param name carried by `+not-found` routes.
pub const NOT_FOUND_PARAM: &str = "not-found";

impl SegmentKind {
    /// Matching rank: lower ranks are more specific.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Static(_) | Self::Group(_) | Self::Slot(_) => 0,
            Self::Dynamic(_) => 1,
            Self::CatchAll(_) => 2,
            Self::NotFound => 3,
        }
    }

    /// Whether the segment shows up in a URL.
    pub fn is_url_significant(&self) -> bool {
        !matches!(self, Self::Group(_) | Self::Slot(_))
    }

    /// Name of the param this segment captures, if any.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Self::Dynamic(name) | Self::CatchAll(name) => Some(name),
            Self::NotFound => Some(NOT_FOUND_PARAM),
            _ => None,
        }
    }

    /// Whether the captured value spans several URL segments.
    pub fn is_deep(&self) -> bool {
        matches!(self, Self::CatchAll(_) | Self::NotFound)
    }

    /// Source form of the segment, as written in the file name.
    pub fn pattern(&self) -> String {
        match self {
            Self::Static(s) => s.clone(),
            Self::Group(g) => format!("({})", g),
            Self::Dynamic(d) => format!("[{}]", d),
            Self::CatchAll(c) => format!("[...{}]", c),
            Self::Slot(s) => format!("@{}", s),
            Self::NotFound => "+not-found".to_string(),
        }
    }
}

/// Classifies a segment (pure function)
///
/// # Parsing Rules (evaluated in order)
///
/// 1. **Not found**: `+not-found`
/// 2. **Slot**: `@name`
/// 3. **Group**: `(name)`
/// 4. **Catch-all**: `[...name]`
/// 5. **Dynamic**: `[name]`
/// 6. **Static**: anything without brackets or parentheses
///
/// Optional segments (`[[...name]]`, `[name?]`) are not part of the grammar
/// and classify as malformed.
pub fn classify_segment(segment: &str) -> Result<SegmentKind, SegmentIssue> {
    if segment == "+not-found" {
        return Ok(SegmentKind::NotFound);
    }

    if let Some(name) = segment.strip_prefix('@') {
        return valid_name(name).map(|n| SegmentKind::Slot(n.to_string()));
    }

    if let Some(inner) = segment.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        return valid_name(inner).map(|n| SegmentKind::Group(n.to_string()));
    }

    if let Some(inner) = segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return match inner.strip_prefix("...") {
            Some(name) => valid_name(name).map(|n| SegmentKind::CatchAll(n.to_string())),
            None => valid_name(inner).map(|n| SegmentKind::Dynamic(n.to_string())),
        };
    }

    if segment.is_empty() || segment.contains(['[', ']', '(', ')']) {
        return Err(SegmentIssue::Malformed);
    }

    Ok(SegmentKind::Static(segment.to_string()))
}

fn valid_name(name: &str) -> Result<&str, SegmentIssue> {
    if name.is_empty() {
        Err(SegmentIssue::EmptyName)
    } else if name.contains(['[', ']', '(', ')', '/', '?']) || name.starts_with("...") {
        Err(SegmentIssue::Malformed)
    } else {
        Ok(name)
    }
}

/// Render mode requested by a `+ssr`, `+ssg` or `+spa` suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Ssg,
    Ssr,
    Spa,
}

/// Splits a render-mode suffix off a segment
///
/// ```
/// use vxs_router::route::pattern::{split_render_suffix, RenderMode};
///
/// assert_eq!(split_render_suffix("blog+ssg"), ("blog", Some(RenderMode::Ssg)));
/// assert_eq!(split_render_suffix("about"), ("about", None));
/// ```
pub fn split_render_suffix(segment: &str) -> (&str, Option<RenderMode>) {
    const SUFFIXES: [(&str, RenderMode); 3] = [
        ("+ssg", RenderMode::Ssg),
        ("+ssr", RenderMode::Ssr),
        ("+spa", RenderMode::Spa),
    ];

    SUFFIXES
        .iter()
        .find_map(|(suffix, mode)| {
            segment
                .strip_suffix(suffix)
                .filter(|rest| !rest.is_empty())
                .map(|rest| (rest, Some(*mode)))
        })
        .unwrap_or((segment, None))
}

/// URL-significant segments of a route string
///
/// Groups and slots are dropped, as is a trailing `index`. Segments that
/// fail to classify are kept as static text; route strings reaching this
/// point have already been validated by the parser.
///
/// ```
/// use vxs_router::route::pattern::{url_segments, SegmentKind};
///
/// assert_eq!(
///     url_segments("(app)/users/[id]/index"),
///     vec![SegmentKind::Static("users".into()), SegmentKind::Dynamic("id".into())]
/// );
/// ```
pub fn url_segments(route: &str) -> Vec<SegmentKind> {
    let mut segments: Vec<SegmentKind> = route
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| classify_segment(s).unwrap_or_else(|_| SegmentKind::Static(s.to_string())))
        .filter(SegmentKind::is_url_significant)
        .collect();

    if matches!(segments.last(), Some(SegmentKind::Static(s)) if s == "index") {
        segments.pop();
    }

    segments
}

/// Orders two segment lists by specificity (pure function)
///
/// Segments compare position by position: static before dynamic, dynamic
/// before catch-all, catch-all before not-found. When every shared position
/// ties, the shorter list comes first. Equal lists compare `Equal` so a
/// stable sort keeps declaration order.
pub fn compare_specificity(a: &[SegmentKind], b: &[SegmentKind]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.rank().cmp(&y.rank()))
        .find(|ord| ord.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}
