//! Unified error types for stencil.

use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur while assembling a renderer or rendering a template.
#[derive(Error, Debug)]
pub enum StencilError {
    // --- Configuration ---

    /// The configuration file was not found or could not be read.
    #[error("config file not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file exists but contains invalid JSON.
    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required configuration section is absent or malformed (e.g. no cache settings).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    // --- Engine runtime ---

    /// The engine runtime source could not be located in the cache or loaded from disk.
    #[error("couldn't load engine runtime from '{0}'")]
    SourceNotFound(String),

    /// The engine runtime source was found but the engine rejected it.
    #[error("an error occurred creating the engine from source '{source_name}': {message}")]
    InvalidSource {
        source_name: String,
        message: String,
    },

    // --- Helpers ---

    /// A configured helper could not be loaded.
    #[error("couldn't load helper from '{0}'")]
    HelperNotFound(String),

    /// A helper was loaded but the engine refused to register it.
    #[error("invalid helper '{name}': {message}")]
    InvalidHelper { name: String, message: String },

    // --- Templates ---

    /// No resolver in the chain produced a template for this name.
    #[error("couldn't resolve '{0}'")]
    TemplateNotFound(String),

    /// The template source was found but failed to compile.
    #[error("error compiling '{name}': {message}")]
    TemplateCompilation { name: String, message: String },

    /// The compiled template failed while executing against its parameters.
    #[error("error running '{name}': {message}")]
    TemplateExecution { name: String, message: String },

    /// Render parameters were not a JSON object.
    #[error("parameters for '{name}' must be an object, got {kind}")]
    InvalidParams { name: String, kind: &'static str },

    // --- General ---

    /// A filesystem I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A catch-all for errors from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification a host can map onto its own error pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration, runtime or helper setup is wrong (500-like).
    Misconfiguration,
    /// The requested template does not exist (404-like).
    Missing,
    /// The template source is syntactically invalid.
    Syntax,
    /// The template failed while running against its parameters.
    Runtime,
}

impl StencilError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::Configuration(_)
            | Self::SourceNotFound(_)
            | Self::InvalidSource { .. }
            | Self::HelperNotFound(_)
            | Self::InvalidHelper { .. }
            | Self::Io(_)
            | Self::Other(_) => ErrorCategory::Misconfiguration,
            Self::TemplateNotFound(_) => ErrorCategory::Missing,
            Self::TemplateCompilation { .. } => ErrorCategory::Syntax,
            Self::TemplateExecution { .. } | Self::InvalidParams { .. } => ErrorCategory::Runtime,
        }
    }
}

/// Alias for `Result<T, StencilError>`.
pub type Result<T> = std::result::Result<T, StencilError>;
