//! Path↔state codec
//!
//! Bidirectional mapping between URLs and nested navigation state, derived
//! from the route tree:
//!
//! - [`get_linking_config`]: route tree → screen configuration
//! - [`get_state_from_path`]: path → state (decode)
//! - [`get_path_from_state`]: state → path (encode)
//! - [`mask`]: displayed-vs-actual URL rules
//! - [`intercept`]: slot routes standing in for soft navigations
//!
//! Decoding and encoding never panic on malformed input: percent-decoding
//! failures fall back to the raw text.

pub mod config;
pub mod decode;
pub mod encode;
pub mod intercept;
pub mod mask;
mod matcher;
pub mod state;

pub use config::{get_linking_config, LinkingConfig, ParamTransform, ScreenConfig};
pub use decode::{get_state_from_path, strip_base_url};
pub use encode::{get_path_from_state, PathOptions};
pub use intercept::{find_intercept_route, InterceptMatch, NavigationMode};
pub use mask::{
    compile_route_masks, match_route_mask, unmask_location, CompiledRouteMask, MaskState, MaskedRoute, RouteMask,
    MASK_SEARCH_PARAM,
};
pub use state::{NavigationState, NavigatorKind, StateRoute};
