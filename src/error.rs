//! Error types for the engine.

use axum::http::Method;
use thiserror::Error;

use crate::config::loader::ConfigError;

/// Errors that abort startup or the serve loop.
#[derive(Debug, Error)]
pub enum Error {
    /// A plugin asserted a prerequisite that was never registered.
    #[error("The plugin {plugin} is not registered")]
    MissingDependency { plugin: String },

    /// The router has no method filter for this method.
    #[error("Unsupported route method: {0}")]
    UnsupportedMethod(Method),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serve loop failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
