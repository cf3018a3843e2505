//! The renderer: resolve, compile when needed, cache, execute.
//!
//! Each [`Renderer::render`] call runs to completion in this order:
//!
//! 1. resolve the name through the [`AggregateResolver`]
//!    (absent → [`StencilError::TemplateNotFound`])
//! 2. raw source only: compile it (failure → [`StencilError::TemplateCompilation`])
//!    and save the artifact through the chain; save failures are logged and ignored
//! 3. instantiate and execute against the merged parameters
//!    (failure → [`StencilError::TemplateExecution`])

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::{Result, StencilError};
use crate::key::{TemplateKey, DEFAULT_NAMESPACE, SYSTEM_NAMESPACE};
use crate::resolver::{AggregateResolver, Template};

/// Default-parameter scope that applies to every template.
pub const TEMPLATE_ALL: &str = "*";

/// A configured template directory, as reported to hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePath {
    pub path: PathBuf,
    /// `None` for the default namespace.
    pub namespace: Option<String>,
}

/// Default parameters: a global layer plus per-template layers.
#[derive(Debug, Clone, Default)]
pub struct DefaultParams {
    global: Map<String, Value>,
    per_template: HashMap<String, Map<String, Value>>,
}

impl DefaultParams {
    pub fn add(&mut self, template: &str, param: impl Into<String>, value: Value) {
        let layer = if template == TEMPLATE_ALL {
            &mut self.global
        } else {
            self.per_template.entry(template.to_string()).or_default()
        };
        layer.insert(param.into(), value);
    }

    /// Global defaults, then the template's defaults, then `params`. Later layers win key by key.
    pub fn merge(&self, name: &str, params: &Value) -> Result<Value> {
        let mut merged = self.global.clone();
        if let Some(layer) = self.per_template.get(name) {
            merged.extend(layer.clone());
        }
        match params {
            Value::Object(call) => merged.extend(call.clone()),
            Value::Null => {}
            other => {
                return Err(StencilError::InvalidParams {
                    name: name.to_string(),
                    kind: json_kind(other),
                })
            }
        }
        Ok(Value::Object(merged))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Return the compiled artifact for a resolved template.
///
/// Raw source is compiled and, when the chain can save, written back under
/// the template's key. A failed save only logs.
pub(crate) async fn compiled_artifact(
    engine: &dyn Engine,
    resolver: &AggregateResolver,
    name: &str,
    template: Template,
) -> Result<String> {
    if template.is_compiled() {
        debug!("'{name}' served from cache");
        return Ok(template.into_content());
    }

    debug!("compiling '{name}'");
    let compiled = engine
        .precompile(template.content())
        .map_err(|e| StencilError::TemplateCompilation {
            name: name.to_string(),
            message: e.to_string(),
        })?;

    if resolver.supports_save() && !resolver.save(template.key(), &compiled).await {
        warn!("could not cache compiled '{}'", template.key());
    }
    Ok(compiled)
}

/// Outcome of [`Renderer::warm`].
#[derive(Debug, Clone, Default)]
pub struct WarmReport {
    /// Keys compiled and written to the cache by this run.
    pub compiled: Vec<String>,
    /// Keys that already had a compiled artifact.
    pub cached: Vec<String>,
    /// Keys that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Renders named templates through a resolver chain and an engine.
pub struct Renderer {
    engine: Box<dyn Engine>,
    resolver: AggregateResolver,
    defaults: DefaultParams,
}

impl Renderer {
    pub fn new(engine: Box<dyn Engine>, resolver: AggregateResolver) -> Self {
        Self {
            engine,
            resolver,
            defaults: DefaultParams::default(),
        }
    }

    pub async fn render(&self, name: &str, params: &Value) -> Result<String> {
        let params = self.defaults.merge(name, params)?;

        let template = self
            .resolver
            .resolve(name)
            .await?
            .ok_or_else(|| StencilError::TemplateNotFound(name.to_string()))?;

        let compiled = compiled_artifact(self.engine.as_ref(), &self.resolver, name, template).await?;

        let execution_error = |e: crate::engine::EngineError| StencilError::TemplateExecution {
            name: name.to_string(),
            message: e.to_string(),
        };
        let callable = self.engine.template(name, &compiled).map_err(execution_error)?;
        self.engine.execute(&callable, &params).map_err(execution_error)
    }

    pub fn add_path(&mut self, path: impl Into<PathBuf>, namespace: Option<&str>) -> &mut Self {
        self.resolver.add_path(path, namespace);
        self
    }

    /// Configured directories, flattened in namespace then registration order.
    pub fn get_paths(&self) -> Vec<TemplatePath> {
        self.resolver
            .get_paths()
            .into_iter()
            .flat_map(|(namespace, dirs)| {
                let namespace = (namespace != DEFAULT_NAMESPACE).then_some(namespace);
                dirs.into_iter().map(move |path| TemplatePath {
                    path,
                    namespace: namespace.clone(),
                })
            })
            .collect()
    }

    /// Add a default parameter for `template`, or for every template with [`TEMPLATE_ALL`].
    pub fn add_default_param(
        &mut self,
        template: &str,
        param: impl Into<String>,
        value: Value,
    ) -> &mut Self {
        self.defaults.add(template, param, value);
        self
    }

    pub fn resolver(&self) -> &AggregateResolver {
        &self.resolver
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    /// Compile every template on the configured paths into the cache.
    ///
    /// Failures are collected in the report rather than aborting the run.
    pub async fn warm(&self) -> Result<WarmReport> {
        let mut report = WarmReport::default();
        let Some(fs) = self.resolver.filesystem() else {
            return Ok(report);
        };

        for (namespace, _) in fs.paths() {
            if namespace == SYSTEM_NAMESPACE {
                continue;
            }
            for name in fs.discover(namespace, true).await? {
                let key = TemplateKey::new(namespace.as_str(), name).to_string();
                match self.resolver.resolve(&key).await {
                    Ok(Some(template)) if template.is_compiled() => report.cached.push(key),
                    Ok(Some(template)) => {
                        match compiled_artifact(self.engine.as_ref(), &self.resolver, &key, template)
                            .await
                        {
                            Ok(_) => report.compiled.push(key),
                            Err(e) => report.failed.push((key, e.to_string())),
                        }
                    }
                    Ok(None) => report.failed.push((key, "disappeared during warm-up".into())),
                    Err(e) => report.failed.push((key, e.to_string())),
                }
            }
        }

        info!(
            "warmed cache: {} compiled, {} already cached, {} failed",
            report.compiled.len(),
            report.cached.len(),
            report.failed.len()
        );
        Ok(report)
    }
}
