use serde::Serialize;

/// How far up an intercepting route reaches for the URL it intercepts.
///
/// Intercept routes live inside an `@slot` directory. The level is relative
/// to the directory that owns the slot.
///
/// # Examples
///
/// ```
/// use vxs_router::InterceptLevel;
///
/// // feed/@modal/(.)photos/[id].tsx  → intercepts /feed/photos/[id]
/// assert_eq!(InterceptLevel::from_prefix("(.)photos"), Some((InterceptLevel::SameLevel, "photos")));
///
/// // feed/@modal/(..)photos/[id].tsx → intercepts /photos/[id]
/// assert_eq!(InterceptLevel::from_prefix("(..)photos"), Some((InterceptLevel::OneLevelUp, "photos")));
///
/// // feed/@modal/(...)photos/[id].tsx → intercepts /photos/[id] from the root
/// assert_eq!(InterceptLevel::from_prefix("(...)photos"), Some((InterceptLevel::FromRoot, "photos")));
/// ```
///
/// # Interception Patterns
///
/// - `(.)` → **SameLevel**
/// - `(..)` → **OneLevelUp**
/// - `(..)(..)` → **TwoLevelsUp**
/// - `(...)` → **FromRoot**
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterceptLevel {
    /// (.) - Intercept segments at the same level
    SameLevel,
    /// (..) - Intercept segments one level up
    OneLevelUp,
    /// (..)(..) - Intercept segments two levels up
    TwoLevelsUp,
    /// (...) - Intercept segments from the root
    FromRoot,
}

impl InterceptLevel {
    /// Splits an intercept prefix off a segment.
    ///
    /// Longest prefix first, so `(...)` is never read as `(..)` followed by `.)`.
    pub fn from_prefix(segment: &str) -> Option<(Self, &str)> {
        const PREFIXES: [(&str, InterceptLevel); 4] = [
            ("(..)(..)", InterceptLevel::TwoLevelsUp),
            ("(...)", InterceptLevel::FromRoot),
            ("(..)", InterceptLevel::OneLevelUp),
            ("(.)", InterceptLevel::SameLevel),
        ];

        PREFIXES
            .iter()
            .find_map(|(prefix, level)| segment.strip_prefix(prefix).map(|rest| (*level, rest)))
    }

    /// Resolves the URL segments this level intercepts from.
    ///
    /// `base` is the URL of the directory that owns the slot.
    pub fn base_segments<'a>(&self, base: &'a [String]) -> &'a [String] {
        let keep = match self {
            Self::SameLevel => base.len(),
            Self::OneLevelUp => base.len().saturating_sub(1),
            Self::TwoLevelsUp => base.len().saturating_sub(2),
            Self::FromRoot => 0,
        };
        &base[..keep]
    }
}
