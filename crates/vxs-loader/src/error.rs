//! Loader errors

use thiserror::Error;

/// Errors raised while resolving loader data
///
/// Clonable so one failure can be handed to every waiter of a shared load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoaderError {
    #[error("No route module registered for '{0}'")]
    ModuleNotFound(String),

    #[error("Route '{0}' does not export a loader")]
    NoLoader(String),

    #[error("No route matches '{0}'")]
    NoRoute(String),

    #[error("Loader for '{file}' failed: {message}")]
    Failed { file: String, message: String },

    #[error("Fetching loader data for '{href}' failed: {message}")]
    Fetch { href: String, message: String },

    #[error("Loader data is not valid JSON: {0}")]
    InvalidData(String),

    #[error("'{0}' is not on this origin")]
    CrossOrigin(String),
}

impl LoaderError {
    pub fn failed(file: impl Into<String>, message: impl ToString) -> Self {
        Self::Failed {
            file: file.into(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;
