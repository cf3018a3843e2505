//! Renderer assembly.
//!
//! Builds the resolver chain from configuration, then bootstraps the engine in
//! a fixed order: runtime, partials, script helpers, host helpers. Each step
//! reads through the chain first and writes what it loaded back to the cache
//! under the [`SYSTEM_NAMESPACE`], so a warm cache skips the disk entirely.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::RendererConfig;
use crate::engine::{embedded, Engine, RuntimeStatus};
use crate::error::{Result, StencilError};
use crate::helpers::{helper_name, HelperCatalog};
use crate::key::{TemplateKey, SYSTEM_NAMESPACE};
use crate::renderer::{compiled_artifact, Renderer, TEMPLATE_ALL};
use crate::resolver::{AggregateResolver, CacheResolver, FilesystemResolver};
use crate::store::{self, CacheStore};

/// Chain priority of the cache resolver. Lower values are tried first.
pub const CACHE_PRIORITY: i32 = 0;
/// Chain priority of the filesystem resolver.
pub const FILESYSTEM_PRIORITY: i32 = 1;

const RUNTIME_ENTRY: &str = "handlebars";
const PARTIALS_ENTRY: &str = "partials";

/// Build the resolver chain: the cache over `store`, then the configured directories.
pub fn build_resolver(config: &RendererConfig, store: Arc<dyn CacheStore>) -> AggregateResolver {
    let mut filesystem = FilesystemResolver::new();
    filesystem
        .set_extension(config.extension.as_str())
        .set_separator(config.separator.as_str());
    for (namespace, paths) in &config.paths {
        let namespace = (!namespace.is_empty()).then_some(namespace.as_str());
        for path in paths.to_vec() {
            filesystem.add_path(path, namespace);
        }
    }

    let mut cache = CacheResolver::new(store);
    cache.set_is_compiled(true);

    let mut chain = AggregateResolver::new();
    chain
        .attach(cache, CACHE_PRIORITY)
        .attach(filesystem, FILESYSTEM_PRIORITY);
    chain
}

/// Build a fully bootstrapped renderer from configuration.
///
/// Fails with [`StencilError::Configuration`] when the `cache` section is unusable.
pub async fn build_renderer(
    config: &RendererConfig,
    engine: Box<dyn Engine>,
    helpers: HelperCatalog,
) -> Result<Renderer> {
    let store = store::from_config(config.cache.as_ref())?;
    let resolver = build_resolver(config, store);
    assemble(config, engine, resolver, helpers).await
}

/// Bootstrap `engine` through `resolver` and wrap both in a [`Renderer`].
pub async fn assemble(
    config: &RendererConfig,
    engine: Box<dyn Engine>,
    resolver: AggregateResolver,
    mut helpers: HelperCatalog,
) -> Result<Renderer> {
    register_runtime(engine.as_ref(), &resolver, config.source.as_deref()).await?;
    register_partials(engine.as_ref(), &resolver, &config.partials_namespace).await?;
    register_script_helpers(engine.as_ref(), &resolver, &config.script_helpers).await?;
    register_host_helpers(engine.as_ref(), &config.host_helpers, &mut helpers)?;

    let mut renderer = Renderer::new(engine, resolver);
    for (param, value) in &config.defaults {
        renderer.add_default_param(TEMPLATE_ALL, param.as_str(), value.clone());
    }
    info!("renderer ready");
    Ok(renderer)
}

async fn cache_system_entry(resolver: &AggregateResolver, key: &str, content: &str) {
    if resolver.supports_save() && !resolver.save(key, content).await {
        warn!("could not cache '{key}'");
    }
}

async fn register_runtime(
    engine: &dyn Engine,
    resolver: &AggregateResolver,
    source: Option<&Path>,
) -> Result<()> {
    let key = TemplateKey::system(RUNTIME_ENTRY).to_string();
    let source_name = source
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| embedded::RUNTIME_NAME.to_string());

    let runtime = match resolver.resolve(&key).await? {
        Some(cached) => {
            debug!("engine runtime served from cache");
            cached.into_content()
        }
        None => {
            let runtime = match source {
                Some(path) => tokio::fs::read_to_string(path)
                    .await
                    .ok()
                    .filter(|runtime| !runtime.is_empty())
                    .ok_or_else(|| StencilError::SourceNotFound(source_name.clone()))?,
                None => embedded::RUNTIME.to_string(),
            };
            cache_system_entry(resolver, &key, &runtime).await;
            runtime
        }
    };

    let status = engine
        .register_runtime(&runtime)
        .map_err(|e| StencilError::InvalidSource {
            source_name,
            message: e.to_string(),
        })?;
    match status {
        RuntimeStatus::Registered => info!("engine runtime registered"),
        RuntimeStatus::AlreadyRegistered => debug!("engine runtime already registered"),
    }
    Ok(())
}

/// Short name to key for every partial in `namespace`.
async fn discover_partials(
    resolver: &AggregateResolver,
    namespace: &str,
) -> Result<BTreeMap<String, String>> {
    let Some(filesystem) = resolver.filesystem() else {
        return Ok(BTreeMap::new());
    };
    Ok(filesystem
        .discover(namespace, false)
        .await?
        .into_iter()
        .map(|name| {
            let key = TemplateKey::new(namespace, name.as_str()).to_string();
            (name, key)
        })
        .collect())
}

async fn register_partials(
    engine: &dyn Engine,
    resolver: &AggregateResolver,
    namespace: &str,
) -> Result<()> {
    let key = TemplateKey::system(PARTIALS_ENTRY).to_string();

    let cached: BTreeMap<String, String> = match resolver.resolve(&key).await? {
        Some(entry) => serde_json::from_str(entry.content()).unwrap_or_else(|e| {
            warn!("ignoring unreadable partial map in cache: {e}");
            BTreeMap::new()
        }),
        None => BTreeMap::new(),
    };

    let partials = if cached.is_empty() {
        let discovered = discover_partials(resolver, namespace).await?;
        let encoded = serde_json::to_string(&discovered).map_err(anyhow::Error::from)?;
        cache_system_entry(resolver, &key, &encoded).await;
        discovered
    } else {
        debug!("partial map served from cache");
        cached
    };

    for (name, partial_key) in &partials {
        let Some(template) = resolver.resolve(partial_key).await? else {
            warn!("partial '{partial_key}' not found, skipping");
            continue;
        };
        let compiled = compiled_artifact(engine, resolver, partial_key, template).await?;

        let compilation_error = |e: crate::engine::EngineError| StencilError::TemplateCompilation {
            name: partial_key.clone(),
            message: e.to_string(),
        };
        let handle = engine.template(partial_key, &compiled).map_err(compilation_error)?;
        engine.register_partial(name, &handle).map_err(compilation_error)?;
        debug!("registered partial '{name}' from '{partial_key}'");
    }

    info!("registered {} partial(s) from '{namespace}'", partials.len());
    Ok(())
}

async fn register_script_helpers(
    engine: &dyn Engine,
    resolver: &AggregateResolver,
    files: &[PathBuf],
) -> Result<()> {
    for file in files {
        let file_name = file.display().to_string();
        let key = TemplateKey::new(SYSTEM_NAMESPACE, file_name.as_str()).to_string();

        let source = match resolver.resolve(&key).await? {
            Some(cached) => cached.into_content(),
            None => {
                let source = tokio::fs::read_to_string(file)
                    .await
                    .ok()
                    .filter(|source| !source.trim().is_empty())
                    .ok_or_else(|| StencilError::HelperNotFound(file_name.clone()))?;
                cache_system_entry(resolver, &key, &source).await;
                source
            }
        };

        let name = helper_name(&file_name);
        engine
            .register_script_helper(&name, &source)
            .map_err(|e| StencilError::InvalidHelper {
                name: name.clone(),
                message: e.to_string(),
            })?;
        debug!("registered script helper '{name}' from {file_name}");
    }
    Ok(())
}

fn register_host_helpers(
    engine: &dyn Engine,
    entries: &[String],
    catalog: &mut HelperCatalog,
) -> Result<()> {
    let mut registered = HashSet::new();
    for entry in entries {
        let name = helper_name(entry);
        if registered.contains(&name) {
            continue;
        }
        let helper = catalog
            .take(&name)
            .ok_or_else(|| StencilError::HelperNotFound(entry.clone()))?;
        engine
            .register_host_helper(&name, helper)
            .map_err(|e| StencilError::InvalidHelper {
                name: name.clone(),
                message: e.to_string(),
            })?;
        debug!("registered host helper '{name}'");
        registered.insert(name);
    }
    Ok(())
}
