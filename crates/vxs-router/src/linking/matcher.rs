//! Flattened, specificity-ordered match candidates for decoding.

use crate::params::{ParamValue, Params};
use crate::route::pattern::{compare_specificity, url_segments, SegmentKind, NOT_FOUND_PARAM};

use super::config::{LinkingConfig, ScreenConfig};

/// One decode candidate: a chain of screens from the root and the URL
/// segments it covers.
#[derive(Debug)]
pub(crate) struct MatchConfig<'a> {
    pub chain: Vec<&'a ScreenConfig>,
    pub segments: Vec<SegmentKind>,
}

impl MatchConfig<'_> {
    fn is_layout(&self) -> bool {
        self.chain.last().is_some_and(|s| s.layout || !s.screens.is_empty())
    }
}

/// Every screen of the config as a candidate, most specific first.
///
/// Ties keep declaration order, with leaf screens ahead of navigators
/// covering the same segments.
pub(crate) fn match_configs(config: &LinkingConfig) -> Vec<MatchConfig<'_>> {
    let mut out = Vec::new();
    flatten(&config.screens, &[], &[], &mut out);
    out.sort_by(|a, b| {
        compare_specificity(&a.segments, &b.segments).then_with(|| a.is_layout().cmp(&b.is_layout()))
    });
    out
}

fn flatten<'a>(
    screens: &'a [ScreenConfig],
    chain: &[&'a ScreenConfig],
    prefix: &[SegmentKind],
    out: &mut Vec<MatchConfig<'a>>,
) {
    for screen in screens {
        let mut chain = chain.to_vec();
        chain.push(screen);
        let mut segments = prefix.to_vec();
        segments.extend(url_segments(&screen.path));

        if !screen.screens.is_empty() {
            flatten(&screen.screens, &chain, &segments, out);
        }
        out.push(MatchConfig { chain, segments });
    }
}

/// Matches decoded path segments against a candidate's pattern
///
/// Every segment must be consumed. A catch-all takes one or more segments as
/// a single array param; `+not-found` takes zero or more.
pub(crate) fn match_segments(pattern: &[SegmentKind], segments: &[String]) -> Option<Params> {
    let mut params = Params::new();
    let mut i = 0;

    for kind in pattern {
        match kind {
            SegmentKind::Static(text) => {
                if segments.get(i) != Some(text) {
                    return None;
                }
                i += 1;
            }
            SegmentKind::Dynamic(name) => {
                let value = segments.get(i)?;
                params.insert(name.clone(), ParamValue::One(value.clone()));
                i += 1;
            }
            SegmentKind::CatchAll(name) => {
                if i >= segments.len() {
                    return None;
                }
                params.insert(name.clone(), ParamValue::Many(segments[i..].to_vec()));
                i = segments.len();
            }
            SegmentKind::NotFound => {
                if i < segments.len() {
                    params.insert(NOT_FOUND_PARAM.to_string(), ParamValue::Many(segments[i..].to_vec()));
                }
                i = segments.len();
            }
            SegmentKind::Group(_) | SegmentKind::Slot(_) => {}
        }
    }

    (i == segments.len()).then_some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(s: &[&str]) -> Vec<String> {
        s.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_match_segments_requires_full_consumption() {
        let pattern = url_segments("users/[id]");
        assert!(match_segments(&pattern, &segs(&["users"])).is_none());
        assert!(match_segments(&pattern, &segs(&["users", "1", "x"])).is_none());
        assert_eq!(
            match_segments(&pattern, &segs(&["users", "1"])).unwrap()["id"],
            ParamValue::from("1")
        );
    }

    #[test]
    fn test_catch_all_needs_one_segment() {
        let pattern = url_segments("files/[...path]");
        assert!(match_segments(&pattern, &segs(&["files"])).is_none());
    }

    #[test]
    fn test_not_found_accepts_zero_segments() {
        let pattern = url_segments("+not-found");
        assert_eq!(match_segments(&pattern, &[]), Some(Params::new()));
    }
}
