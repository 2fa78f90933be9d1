//! Error types for route building and route masks.

use thiserror::Error;

/// A route file whose name does not follow the routing grammar.
///
/// These never abort a tree build: the offending file is logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteBuildError {
    /// A segment with unbalanced or misplaced brackets, e.g. `[id` or `a[b]`.
    #[error("{file}: malformed segment `{segment}`")]
    MalformedSegment { file: String, segment: String },

    /// `[]`, `[...]`, `()` or `@` with nothing inside.
    #[error("{file}: empty name in segment `{segment}`")]
    EmptyName { file: String, segment: String },

    /// The same dynamic name used twice in one route.
    #[error("{file}: duplicate dynamic segment `{name}`")]
    DuplicateParam { file: String, name: String },

    /// A catch-all segment followed by more URL segments.
    #[error("{file}: catch-all `{name}` must be the last segment")]
    CatchAllNotLast { file: String, name: String },

    /// An intercept prefix such as `(.)` outside of an `@slot` directory.
    #[error("{file}: intercept route must live inside an @slot directory")]
    InterceptOutsideSlot { file: String },

    /// `+html` anywhere but the routes root.
    #[error("{file}: +html is only allowed at the routes root")]
    NestedHtml { file: String },

    /// Not a route source file (unsupported extension or type declaration).
    #[error("{file}: not a route file")]
    NotARouteFile { file: String },
}

impl RouteBuildError {
    /// The file the error was raised for.
    pub fn file(&self) -> &str {
        match self {
            Self::MalformedSegment { file, .. }
            | Self::EmptyName { file, .. }
            | Self::DuplicateParam { file, .. }
            | Self::CatchAllNotLast { file, .. }
            | Self::InterceptOutsideSlot { file }
            | Self::NestedHtml { file }
            | Self::NotARouteFile { file } => file,
        }
    }
}

/// Invalid route mask declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    /// `to` references a dynamic segment that `from` does not capture and no
    /// params transform was supplied.
    #[error("mask `{from}` -> `{to}`: `{param}` is not captured by `from`")]
    UnknownParam {
        from: String,
        to: String,
        param: String,
    },

    /// The `from` pattern failed to compile.
    #[error("mask `{from}`: {message}")]
    InvalidPattern { from: String, message: String },
}

pub type Result<T> = std::result::Result<T, RouteBuildError>;
