// File: vxs-server/src/error.rs
// Purpose: Server and request-handler error types

use thiserror::Error;
use vxs_loader::LoaderError;

/// Failures outside a single request: build info, IO, watching
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid build info: {0}")]
    BuildInfo(#[from] serde_json::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Routes directory not found: {0}")]
    RoutesDir(String),
}

/// A request handler failure
///
/// Clonable so that requests coalesced onto one in-flight render all
/// receive the same error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("Render failed for '{file}': {message}")]
    Render { file: String, message: String },

    #[error("API route '{file}' failed: {message}")]
    Api { file: String, message: String },

    /// Not a failure: the handler asked for a redirect
    #[error("Redirect ({status}) to {location}")]
    Redirect { status: u16, location: String },

    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    pub fn render(file: impl Into<String>, message: impl ToString) -> Self {
        Self::Render {
            file: file.into(),
            message: message.to_string(),
        }
    }

    pub fn api(file: impl Into<String>, message: impl ToString) -> Self {
        Self::Api {
            file: file.into(),
            message: message.to_string(),
        }
    }

    /// A `307 Temporary Redirect` to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            status: 307,
            location: location.into(),
        }
    }

    /// Error chain, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let message = err.to_string();
            if chain.last() != Some(&message) {
                chain.push(message);
            }
            source = err.source();
        }
        chain
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
