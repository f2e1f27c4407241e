// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebcliError {
    /// The caller supplied an argument vector the launcher cannot use.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Resolving the executable or spawning the child process failed.
    #[error("Launch error: {context}: {source}")]
    Launch {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Registry is shutting down; no new runs are accepted")]
    ShuttingDown,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WebcliError {
    pub(crate) fn launch(context: impl Into<String>, source: std::io::Error) -> Self {
        WebcliError::Launch {
            context: context.into(),
            source,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WebcliError>;
