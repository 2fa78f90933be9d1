// File: vxs-navigation/src/error.rs
// Purpose: Error types for navigation containers and the router store

use thiserror::Error;
use vxs_router::MaskError;

/// Failure reported by a navigation container
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    /// No navigator along the dispatch path claimed the action
    #[error("The action '{action}'{} was not handled by any navigator", route_suffix(.route))]
    ActionNotHandled { action: &'static str, route: Option<String> },

    #[error("Navigator '{0}' does not exist in the current state")]
    UnknownNavigator(String),

    #[error("The navigation container is not mounted")]
    NotMounted,
}

/// Failure reported by the router store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error(
        "Attempted to navigate before mounting the root layout. \
         Make sure the navigation container is ready before calling router methods."
    )]
    NotReady,

    #[error("External href '{0}' cannot be handled by the router")]
    ExternalHref(String),

    #[error("No route matches '{0}'")]
    NoMatch(String),

    #[error("Missing param '{param}' for href '{pathname}'")]
    MissingParam { pathname: String, param: String },

    #[error("{source}{}", available_suffix(.available))]
    Unhandled {
        #[source]
        source: NavigationError,
        available: Vec<String>,
    },

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Mask(#[from] MaskError),
}

fn route_suffix(route: &Option<String>) -> String {
    route
        .as_ref()
        .map(|r| format!(" with route '{}'", r))
        .unwrap_or_default()
}

fn available_suffix(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(". Available routes: {}", available.join(", "))
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
