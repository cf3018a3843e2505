//! Template engine boundary.
//!
//! The renderer never talks to Handlebars directly: it goes through [`Engine`],
//! whose calls return [`EngineError`] diagnostics that callers translate into
//! typed [`crate::error::StencilError`] conditions with the template name attached.
//!
//! [`HandlebarsEngine`] is the production implementation.

pub mod embedded;
mod hbs;

pub use self::hbs::{EscapeMode, HandlebarsEngine, RuntimeSettings};

use thiserror::Error;

use crate::helpers::HostHelper;

/// Raw diagnostic from the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Outcome of a runtime registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeStatus {
    /// This call installed the process-wide runtime.
    Registered,
    /// A runtime was already installed; the call was a no-op.
    AlreadyRegistered,
}

/// Callable handle to an instantiated template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    handle: String,
}

impl CompiledTemplate {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }
}

/// Capabilities the renderer needs from a template engine.
pub trait Engine: Send + Sync {
    /// Whether the process-wide runtime has been registered.
    fn is_runtime_registered(&self) -> bool;

    /// Register the process-wide runtime from its source.
    ///
    /// Registering again is a no-op reported as [`RuntimeStatus::AlreadyRegistered`].
    fn register_runtime(&self, source: &str) -> EngineResult<RuntimeStatus>;

    /// Compile raw template source into an opaque artifact.
    fn precompile(&self, source: &str) -> EngineResult<String>;

    /// Instantiate a callable template from an artifact produced by [`Engine::precompile`].
    fn template(&self, name: &str, compiled: &str) -> EngineResult<CompiledTemplate>;

    /// Run a template against its parameters.
    fn execute(&self, template: &CompiledTemplate, params: &serde_json::Value)
        -> EngineResult<String>;

    /// Make `template` invocable as `{{> name}}`.
    fn register_partial(&self, name: &str, template: &CompiledTemplate) -> EngineResult<()>;

    /// Register an engine-native script helper.
    fn register_script_helper(&self, name: &str, source: &str) -> EngineResult<()>;

    /// Register a host-language helper.
    fn register_host_helper(&self, name: &str, helper: HostHelper) -> EngineResult<()>;
}
