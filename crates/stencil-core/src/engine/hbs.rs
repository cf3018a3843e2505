//! [`Engine`] implementation on top of the [`handlebars`] crate.
//!
//! ## Runtime
//!
//! The runtime source is a small JSON document of process-wide engine
//! settings (strict mode, escaping). It is registered once per process behind
//! a [`OnceLock`]; every engine instance applies the registered settings to
//! its own registry before compiling or registering anything. Sources are
//! validated before the once-only check, so a malformed runtime is always
//! reported, even when another runtime is already installed.
//!
//! ## Compiled artifacts
//!
//! [`Engine::precompile`] parses the source (surfacing syntax errors) and
//! wraps it in a JSON envelope carrying a format tag, version and SHA-256
//! digest. [`Engine::template`] only accepts such envelopes, so raw source
//! that ends up in a compiled slot is rejected instead of executed.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::{CompiledTemplate, Engine, EngineError, EngineResult, RuntimeStatus};
use crate::helpers::HostHelper;

static RUNTIME: OnceLock<RuntimeSettings> = OnceLock::new();

const ARTIFACT_FORMAT: &str = "stencil-hbs";
const ARTIFACT_VERSION: u32 = 1;

/// Registry prefix for instantiated templates, keeping them apart from partial names.
const INSTANCE_PREFIX: &str = "__instance__::";

/// Process-wide engine settings parsed from the runtime source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RuntimeSettings {
    pub name: String,
    pub version: String,
    /// Missing variables fail rendering instead of producing empty output.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub escape: EscapeMode,
    /// Do not indent the output of standalone partials.
    #[serde(default)]
    pub prevent_indent: bool,
    #[serde(default)]
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    #[default]
    Html,
    None,
}

impl RuntimeSettings {
    pub fn parse(source: &str) -> EngineResult<Self> {
        if source.trim().is_empty() {
            return Err(EngineError::new("runtime source is empty"));
        }
        serde_json::from_str(source)
            .map_err(|e| EngineError::new(format!("malformed runtime source: {e}")))
    }

    fn apply(&self, hbs: &mut Handlebars<'static>) {
        hbs.set_strict_mode(self.strict);
        hbs.set_prevent_indent(self.prevent_indent);
        hbs.set_dev_mode(self.dev_mode);
        match self.escape {
            EscapeMode::Html => hbs.register_escape_fn(handlebars::html_escape),
            EscapeMode::None => hbs.register_escape_fn(handlebars::no_escape),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Artifact {
    format: String,
    version: u32,
    digest: String,
    source: String,
}

fn digest(source: &str) -> String {
    hex::encode(Sha256::digest(source.as_bytes()))
}

struct EngineState {
    hbs: Handlebars<'static>,
    /// Digest of the artifact each instance handle was built from.
    instances: HashMap<String, String>,
    runtime_applied: bool,
}

impl EngineState {
    fn ensure_runtime(&mut self) -> EngineResult<()> {
        if !self.runtime_applied {
            let settings = RUNTIME
                .get()
                .ok_or_else(|| EngineError::new("engine runtime is not registered"))?;
            settings.apply(&mut self.hbs);
            self.runtime_applied = true;
        }
        Ok(())
    }
}

/// Handlebars-backed engine.
pub struct HandlebarsEngine {
    state: RwLock<EngineState>,
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlebarsEngine {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState {
                hbs: Handlebars::new(),
                instances: HashMap::new(),
                runtime_applied: false,
            }),
        }
    }

    /// Settings of the process-wide runtime, if one is registered.
    pub fn runtime() -> Option<&'static RuntimeSettings> {
        RUNTIME.get()
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, EngineState>> {
        self.state
            .read()
            .map_err(|_| EngineError::new("engine state lock poisoned"))
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, EngineState>> {
        self.state
            .write()
            .map_err(|_| EngineError::new("engine state lock poisoned"))
    }
}

impl Engine for HandlebarsEngine {
    fn is_runtime_registered(&self) -> bool {
        RUNTIME.get().is_some()
    }

    fn register_runtime(&self, source: &str) -> EngineResult<RuntimeStatus> {
        let settings = RuntimeSettings::parse(source)?;
        let status = match RUNTIME.set(settings) {
            Ok(()) => RuntimeStatus::Registered,
            Err(requested) => {
                if RUNTIME.get() != Some(&requested) {
                    warn!(
                        "engine runtime already registered with different settings, ignoring {} {}",
                        requested.name, requested.version
                    );
                }
                RuntimeStatus::AlreadyRegistered
            }
        };
        self.write()?.ensure_runtime()?;
        Ok(status)
    }

    fn precompile(&self, source: &str) -> EngineResult<String> {
        handlebars::Template::compile(source).map_err(|e| EngineError::new(e.to_string()))?;
        let artifact = Artifact {
            format: ARTIFACT_FORMAT.into(),
            version: ARTIFACT_VERSION,
            digest: digest(source),
            source: source.to_string(),
        };
        serde_json::to_string(&artifact).map_err(|e| EngineError::new(e.to_string()))
    }

    fn template(&self, name: &str, compiled: &str) -> EngineResult<CompiledTemplate> {
        let artifact: Artifact = serde_json::from_str(compiled)
            .map_err(|_| EngineError::new(format!("'{name}' is not a compiled artifact")))?;
        if artifact.format != ARTIFACT_FORMAT || artifact.version != ARTIFACT_VERSION {
            return Err(EngineError::new(format!(
                "unsupported artifact {} v{} for '{name}'",
                artifact.format, artifact.version
            )));
        }
        if digest(&artifact.source) != artifact.digest {
            return Err(EngineError::new(format!("artifact digest mismatch for '{name}'")));
        }

        let handle = format!("{INSTANCE_PREFIX}{name}");
        let mut state = self.write()?;
        state.ensure_runtime()?;
        if state.instances.get(&handle) != Some(&artifact.digest) {
            let template = handlebars::Template::compile(&artifact.source)
                .map_err(|e| EngineError::new(e.to_string()))?;
            state.hbs.register_template(&handle, template);
            state.instances.insert(handle.clone(), artifact.digest);
        }
        Ok(CompiledTemplate::new(handle))
    }

    fn execute(
        &self,
        template: &CompiledTemplate,
        params: &serde_json::Value,
    ) -> EngineResult<String> {
        let state = self.read()?;
        if !state.runtime_applied {
            return Err(EngineError::new("engine runtime is not registered"));
        }
        state
            .hbs
            .render(template.handle(), params)
            .map_err(|e| EngineError::new(e.to_string()))
    }

    fn register_partial(&self, name: &str, template: &CompiledTemplate) -> EngineResult<()> {
        let mut state = self.write()?;
        state.ensure_runtime()?;
        let partial = state
            .hbs
            .get_template(template.handle())
            .cloned()
            .ok_or_else(|| EngineError::new(format!("unknown template handle for partial '{name}'")))?;
        state.hbs.register_template(name, partial);
        Ok(())
    }

    fn register_script_helper(&self, name: &str, source: &str) -> EngineResult<()> {
        let mut state = self.write()?;
        state.ensure_runtime()?;
        state
            .hbs
            .register_script_helper(name, source)
            .map_err(|e| EngineError::new(e.to_string()))
    }

    fn register_host_helper(&self, name: &str, helper: HostHelper) -> EngineResult<()> {
        let mut state = self.write()?;
        state.ensure_runtime()?;
        state.hbs.register_helper(name, helper);
        Ok(())
    }
}
