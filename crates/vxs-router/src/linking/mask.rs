//! Route masking: display one URL while rendering another.
//!
//! A mask remembers the real route either in history state ([`MaskState`])
//! or, when `use_search_param` is set, in a base64url search parameter so a
//! reload restores it without history support.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::MaskError;
use crate::manifest::CompiledPattern;
use crate::params::{ParamValue, Params};
use crate::path::{encode_search, encode_segment, parse_search, split_url};
use crate::route::pattern::{url_segments, SegmentKind};

/// Search parameter carrying the encoded real route.
pub const MASK_SEARCH_PARAM: &str = "__vxs_mask";

/// Maps the params captured by `from` onto the params `to` needs.
pub type MaskParamsFn = Arc<dyn Fn(&Params) -> Params + Send + Sync>;

/// A declarative mask rule
#[derive(Clone)]
pub struct RouteMask {
    pub from: String,
    pub to: String,
    pub params: Option<MaskParamsFn>,
    /// Render the displayed URL, not the real route, after a reload
    pub unmask_on_reload: bool,
    pub use_search_param: bool,
}

impl RouteMask {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            params: None,
            unmask_on_reload: false,
            use_search_param: false,
        }
    }

    pub fn with_params(mut self, f: impl Fn(&Params) -> Params + Send + Sync + 'static) -> Self {
        self.params = Some(Arc::new(f));
        self
    }

    pub fn unmask_on_reload(mut self, unmask: bool) -> Self {
        self.unmask_on_reload = unmask;
        self
    }

    pub fn use_search_param(mut self, enabled: bool) -> Self {
        self.use_search_param = enabled;
        self
    }
}

impl fmt::Debug for RouteMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMask")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("params", &self.params.as_ref().map(|_| ".."))
            .field("unmask_on_reload", &self.unmask_on_reload)
            .field("use_search_param", &self.use_search_param)
            .finish()
    }
}

/// A mask with its `from` pattern compiled
#[derive(Debug, Clone)]
pub struct CompiledRouteMask {
    pub mask: RouteMask,
    pub from_regex: CompiledPattern,
    pub from_params: Vec<String>,
    to_segments: Vec<SegmentKind>,
}

/// Compiles masks, preserving their order
///
/// Every dynamic segment of `to` must be captured by `from`, unless the mask
/// supplies a params transform.
pub fn compile_route_masks(masks: &[RouteMask]) -> Result<Vec<CompiledRouteMask>, MaskError> {
    masks
        .iter()
        .map(|mask| {
            let from_segments = url_segments(&mask.from);
            let from_regex = CompiledPattern::compile(&from_segments).map_err(|e| MaskError::InvalidPattern {
                from: mask.from.clone(),
                message: e.to_string(),
            })?;
            let from_params: Vec<String> = from_segments
                .iter()
                .filter_map(|s| s.param_name().map(str::to_string))
                .collect();

            let to_segments = url_segments(&mask.to);
            if mask.params.is_none() {
                let captured: HashSet<&str> = from_params.iter().map(String::as_str).collect();
                if let Some(param) = to_segments
                    .iter()
                    .filter_map(SegmentKind::param_name)
                    .find(|p| !captured.contains(p))
                {
                    return Err(MaskError::UnknownParam {
                        from: mask.from.clone(),
                        to: mask.to.clone(),
                        param: param.to_string(),
                    });
                }
            }

            Ok(CompiledRouteMask {
                mask: mask.clone(),
                from_regex,
                from_params,
                to_segments,
            })
        })
        .collect()
}

/// What a mask leaves in history state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskState {
    /// The real href being rendered
    pub actual: String,
    pub unmask_on_reload: bool,
}

/// Result of applying a mask to an href
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedRoute {
    pub actual: String,
    pub displayed: String,
    pub state: MaskState,
}

/// Applies the first mask whose `from` matches `href`
///
/// Search and hash of the real href carry over to the displayed one.
///
/// ```
/// use vxs_router::linking::{compile_route_masks, match_route_mask, RouteMask};
///
/// let masks = compile_route_masks(&[RouteMask::new("/photos/[id]/modal", "/photos/[id]")]).unwrap();
/// let masked = match_route_mask(&masks, "/photos/5/modal").unwrap();
/// assert_eq!(masked.displayed, "/photos/5");
/// assert_eq!(masked.state.actual, "/photos/5/modal");
/// ```
pub fn match_route_mask(masks: &[CompiledRouteMask], href: &str) -> Option<MaskedRoute> {
    let parts = split_url(href);

    masks.iter().find_map(|compiled| {
        let captured = compiled.from_regex.matches(parts.pathname)?;
        let params = match &compiled.mask.params {
            Some(transform) => (**transform)(&captured),
            None => captured,
        };
        let pathname = interpolate(&compiled.to_segments, &params)?;

        let mut search = parse_search(parts.search);
        if compiled.mask.use_search_param {
            search.insert(
                MASK_SEARCH_PARAM.to_string(),
                ParamValue::One(URL_SAFE_NO_PAD.encode(href.as_bytes())),
            );
        }

        let mut displayed = pathname;
        let query = encode_search(&search);
        if !query.is_empty() {
            displayed.push('?');
            displayed.push_str(&query);
        }
        if !parts.hash.is_empty() {
            displayed.push('#');
            displayed.push_str(parts.hash);
        }

        Some(MaskedRoute {
            actual: href.to_string(),
            displayed,
            state: MaskState {
                actual: href.to_string(),
                unmask_on_reload: compiled.mask.unmask_on_reload,
            },
        })
    })
}

fn interpolate(segments: &[SegmentKind], params: &Params) -> Option<String> {
    let mut out = Vec::new();
    for segment in segments {
        match segment {
            SegmentKind::Static(text) => out.push(encode_segment(text).into_owned()),
            SegmentKind::Group(_) | SegmentKind::Slot(_) => {}
            _ => {
                let name = segment.param_name()?;
                let value = params.get(name)?;
                if segment.is_deep() {
                    out.extend(value.values().into_iter().map(|v| encode_segment(v).into_owned()));
                } else {
                    out.push(encode_segment(value.first()?).into_owned());
                }
            }
        }
    }
    Some(format!("/{}", out.join("/")))
}

/// Resolves which href to render for a displayed location
///
/// A mask search parameter wins; otherwise history state restores the real
/// route, except on a reload of a mask declared with `unmask_on_reload`.
pub fn unmask_location(displayed: &str, history_state: Option<&MaskState>, is_reload: bool) -> String {
    if let Some(actual) = decode_mask_param(displayed) {
        let unmasked_reload = is_reload && history_state.is_some_and(|s| s.unmask_on_reload);
        if !unmasked_reload {
            return actual;
        }
        return strip_mask_param(displayed);
    }

    match history_state {
        Some(state) if !(is_reload && state.unmask_on_reload) => state.actual.clone(),
        _ => displayed.to_string(),
    }
}

fn decode_mask_param(href: &str) -> Option<String> {
    let search = parse_search(split_url(href).search);
    let encoded = search.get(MASK_SEARCH_PARAM)?.first()?.to_string();
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}

fn strip_mask_param(href: &str) -> String {
    let parts = split_url(href);
    let mut search = parse_search(parts.search);
    search.remove(MASK_SEARCH_PARAM);

    let mut out = parts.pathname.to_string();
    let query = encode_search(&search);
    if !query.is_empty() {
        out.push('?');
        out.push_str(&query);
    }
    if !parts.hash.is_empty() {
        out.push('#');
        out.push_str(parts.hash);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::params;

    #[test]
    fn test_unknown_to_param_is_rejected() {
        let err = compile_route_masks(&[RouteMask::new("/photos/[id]", "/albums/[album]")]).unwrap_err();
        assert_eq!(
            err,
            MaskError::UnknownParam {
                from: "/photos/[id]".to_string(),
                to: "/albums/[album]".to_string(),
                param: "album".to_string(),
            }
        );
    }

    #[test]
    fn test_params_transform_supplies_missing_params() {
        let mask = RouteMask::new("/photos/[id]", "/albums/[album]")
            .with_params(|p| params([("album", p["id"].first().unwrap_or_default().to_string())]));
        let masks = compile_route_masks(&[mask]).unwrap();
        assert_eq!(match_route_mask(&masks, "/photos/9").unwrap().displayed, "/albums/9");
    }

    #[test]
    fn test_first_mask_wins() {
        let masks = compile_route_masks(&[
            RouteMask::new("/photos/[id]", "/first/[id]"),
            RouteMask::new("/photos/[id]", "/second/[id]"),
        ])
        .unwrap();
        assert_eq!(match_route_mask(&masks, "/photos/1").unwrap().displayed, "/first/1");
        assert!(match_route_mask(&masks, "/videos/1").is_none());
    }

    #[test]
    fn test_search_param_round_trip() {
        let masks = compile_route_masks(&[
            RouteMask::new("/photos/[id]/modal", "/photos/[id]").use_search_param(true),
        ])
        .unwrap();
        let masked = match_route_mask(&masks, "/photos/5/modal?x=1").unwrap();
        assert!(masked.displayed.starts_with("/photos/5?"));
        assert!(masked.displayed.contains(MASK_SEARCH_PARAM));

        assert_eq!(unmask_location(&masked.displayed, None, true), "/photos/5/modal?x=1");
    }

    #[test]
    fn test_unmask_on_reload() {
        let state = MaskState {
            actual: "/photos/5/modal".to_string(),
            unmask_on_reload: true,
        };
        assert_eq!(unmask_location("/photos/5", Some(&state), false), "/photos/5/modal");
        assert_eq!(unmask_location("/photos/5", Some(&state), true), "/photos/5");
    }
}
