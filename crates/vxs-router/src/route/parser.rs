/// Route file parsing
///
/// Pure functional parser that turns one route-directory file path into a
/// validated [`ParsedRouteFile`]. All functions are **pure**: same input →
/// same output, no side effects. The tree builder decides what to do with
/// the result.

use std::collections::HashSet;

use serde::Serialize;

use super::pattern::{classify_segment, split_render_suffix, RenderMode, SegmentIssue, SegmentKind};
use crate::error::{Result, RouteBuildError};
use crate::intercept::InterceptLevel;
use crate::route::InterceptRoute;

/// Source extensions recognized as route modules.
pub const ROUTE_EXTENSIONS: [&str; 8] = ["tsx", "ts", "jsx", "js", "mjs", "cjs", "md", "mdx"];

/// What a route file contributes to the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    Page,
    Layout,
    Middleware,
    Api,
    Html,
    NotFound,
}

/// One directory segment of a route file, render suffix removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirSegment {
    pub name: String,
    pub render_mode: Option<RenderMode>,
}

/// A validated route file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRouteFile {
    /// `./`-prefixed file path, the unique file identity
    pub context_key: String,
    pub dirs: Vec<DirSegment>,
    /// File stem without extension, `+api` or render suffix
    pub name: String,
    pub kind: FileKind,
    pub render_mode: Option<RenderMode>,
    /// Index into `dirs` of the `@slot` directory and the slot name
    pub slot: Option<(usize, String)>,
    pub intercept: Option<InterceptRoute>,
}

impl ParsedRouteFile {
    /// Directory names, render suffixes removed.
    pub fn dir_names(&self) -> Vec<String> {
        self.dirs.iter().map(|d| d.name.clone()).collect()
    }

    /// Deepest render mode: the file suffix first, then the closest directory.
    pub fn effective_render_mode(&self) -> Option<RenderMode> {
        self.render_mode
            .or_else(|| self.dirs.iter().rev().find_map(|d| d.render_mode))
    }
}

/// Internal state accumulator for fold-based validation
///
/// Tracks what earlier segments established so later segments can be
/// checked against it.
#[derive(Default)]
struct ParseState {
    params: HashSet<String>,
    catch_all: Option<String>,
    slot: Option<(usize, String)>,
    intercept: Option<(usize, InterceptLevel)>,
}

impl ParseState {
    fn with_segment(mut self, file: &str, index: usize, raw: &str, is_file: bool) -> Result<Self> {
        let mut segment = raw;

        if let Some((level, rest)) = InterceptLevel::from_prefix(raw) {
            if self.slot.is_none() || self.intercept.is_some() {
                return Err(RouteBuildError::InterceptOutsideSlot { file: file.to_string() });
            }
            self.intercept = Some((index, level));
            if rest.is_empty() {
                return Ok(self);
            }
            segment = rest;
        }

        if is_file && segment == "index" {
            return Ok(self);
        }

        let kind = classify_segment(segment).map_err(|issue| match issue {
            SegmentIssue::Malformed => RouteBuildError::MalformedSegment {
                file: file.to_string(),
                segment: raw.to_string(),
            },
            SegmentIssue::EmptyName => RouteBuildError::EmptyName {
                file: file.to_string(),
                segment: raw.to_string(),
            },
        })?;

        if kind.is_url_significant() {
            if let Some(name) = &self.catch_all {
                return Err(RouteBuildError::CatchAllNotLast {
                    file: file.to_string(),
                    name: name.clone(),
                });
            }
        }

        match kind {
            SegmentKind::Slot(name) => {
                if is_file || self.slot.is_some() {
                    return Err(RouteBuildError::MalformedSegment {
                        file: file.to_string(),
                        segment: raw.to_string(),
                    });
                }
                self.slot = Some((index, name));
            }
            SegmentKind::NotFound if !is_file => {
                return Err(RouteBuildError::MalformedSegment {
                    file: file.to_string(),
                    segment: raw.to_string(),
                });
            }
            SegmentKind::Dynamic(name) => self.with_param(file, name, false)?,
            SegmentKind::CatchAll(name) => self.with_param(file, name, true)?,
            _ => {}
        }

        Ok(self)
    }

    fn with_param(&mut self, file: &str, name: String, deep: bool) -> Result<()> {
        if !self.params.insert(name.clone()) {
            return Err(RouteBuildError::DuplicateParam { file: file.to_string(), name });
        }
        if deep {
            self.catch_all = Some(name);
        }
        Ok(())
    }
}

/// Normalizes a listing entry: backslashes to `/`, leading `./` and `.`
/// segments dropped.
pub fn normalize_file(file: &str) -> String {
    file.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Strips a supported extension off a file name
///
/// Type-only declaration files (`.d.ts`) are rejected.
fn strip_extension(file_name: &str) -> Option<&str> {
    if file_name.ends_with(".d.ts") {
        return None;
    }
    let (stem, ext) = file_name.rsplit_once('.')?;
    (!stem.is_empty() && ROUTE_EXTENSIONS.contains(&ext)).then_some(stem)
}

fn file_kind(stem: &str) -> (FileKind, &str) {
    if let Some(name) = stem.strip_suffix("+api") {
        return (FileKind::Api, name);
    }
    let kind = match stem {
        "_layout" => FileKind::Layout,
        "_middleware" => FileKind::Middleware,
        "+html" => FileKind::Html,
        "+not-found" => FileKind::NotFound,
        _ => FileKind::Page,
    };
    (kind, stem)
}

/// Parses a route file path (pure function)
///
/// # Examples
///
/// ```
/// use vxs_router::route::parser::{parse_route_file, FileKind};
///
/// let parsed = parse_route_file("./(marketing)/about.tsx").unwrap();
/// assert_eq!(parsed.context_key, "./(marketing)/about.tsx");
/// assert_eq!(parsed.kind, FileKind::Page);
/// assert_eq!(parsed.name, "about");
///
/// let api = parse_route_file("api/users+api.ts").unwrap();
/// assert_eq!(api.kind, FileKind::Api);
/// assert_eq!(api.name, "users");
///
/// assert!(parse_route_file("types.d.ts").is_err());
/// ```
///
/// # Special Files
///
/// - `_layout` - layout owning its directory
/// - `_middleware` - middleware for its directory and below
/// - `+html` - document template, routes root only
/// - `+not-found` - not-found route for its directory
/// - `*+api` - API route
pub fn parse_route_file(path: &str) -> Result<ParsedRouteFile> {
    let normalized = normalize_file(path);
    let context_key = format!("./{}", normalized);
    let not_route = || RouteBuildError::NotARouteFile { file: context_key.clone() };

    let mut parts: Vec<&str> = normalized.split('/').collect();
    let file_name = parts.pop().filter(|f| !f.is_empty()).ok_or_else(not_route)?;
    let stem = strip_extension(file_name).ok_or_else(not_route)?;

    let (kind, stem) = file_kind(stem);
    let (name, render_mode) = match kind {
        FileKind::Page | FileKind::NotFound => split_render_suffix(stem),
        _ => (stem, None),
    };
    let kind = if name == "+not-found" { FileKind::NotFound } else { kind };

    if kind == FileKind::Html && !parts.is_empty() {
        return Err(RouteBuildError::NestedHtml { file: context_key });
    }

    let dirs: Vec<DirSegment> = parts
        .iter()
        .map(|raw| {
            let (name, render_mode) = split_render_suffix(raw);
            DirSegment { name: name.to_string(), render_mode }
        })
        .collect();

    let state = dirs
        .iter()
        .enumerate()
        .try_fold(ParseState::default(), |state, (i, dir)| {
            state.with_segment(&context_key, i, &dir.name, false)
        })?;

    let state = match kind {
        FileKind::Page | FileKind::Api | FileKind::NotFound => {
            state.with_segment(&context_key, dirs.len(), name, true)?
        }
        _ => state,
    };

    let intercept = state
        .intercept
        .map(|(at, level)| intercept_route(&dirs, name, state.slot.as_ref(), at, level));

    Ok(ParsedRouteFile {
        context_key,
        dirs,
        name: name.to_string(),
        kind,
        render_mode,
        slot: state.slot,
        intercept,
    })
}

/// Computes the URL pattern an intercept route stands in for
///
/// The base is the URL of the directory owning the slot, cut back by the
/// intercept level; the segments after the marker are appended.
fn intercept_route(
    dirs: &[DirSegment],
    name: &str,
    slot: Option<&(usize, String)>,
    at: usize,
    level: InterceptLevel,
) -> InterceptRoute {
    let significant = |raw: &str| -> Option<String> {
        let raw = InterceptLevel::from_prefix(raw).map(|(_, rest)| rest).unwrap_or(raw);
        match classify_segment(raw) {
            Ok(kind) if kind.is_url_significant() => Some(raw.to_string()),
            _ => None,
        }
    };

    let owner_end = slot.map(|(i, _)| *i).unwrap_or(0);
    let base: Vec<String> = dirs[..owner_end].iter().filter_map(|d| significant(&d.name)).collect();

    let mut segments = level.base_segments(&base).to_vec();
    segments.extend(dirs[at.min(dirs.len())..].iter().filter_map(|d| significant(&d.name)));
    if name != "index" {
        segments.extend(significant(name));
    }

    InterceptRoute {
        level,
        target: format!("/{}", segments.join("/")),
    }
}
