//! Renderer configuration (`stencil.config.json`).
//!
//! ```json
//! {
//!   "source": "vendor/handlebars.runtime.json",
//!   "partials-namespace": "partials",
//!   "script-helpers": ["helpers/shout.rhai"],
//!   "host-helpers": ["upper", "snake_case"],
//!   "extension": "hbs",
//!   "separator": "/",
//!   "paths": {
//!     "": "templates",
//!     "partials": ["templates/partials", "vendor/partials"]
//!   },
//!   "cache": { "adapter": "filesystem", "options": { "cache-dir": ".stencil-cache" } },
//!   "defaults": { "site": "example.org" }
//! }
//! ```
//!
//! Every key is optional except `cache`, which the store factory requires.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StencilError};
use crate::key::NAMESPACE_DELIMITER;

pub const DEFAULT_CONFIG_FILE: &str = "stencil.config.json";
pub const DEFAULT_EXTENSION: &str = "hbs";
pub const DEFAULT_SEPARATOR: &str = "/";
pub const DEFAULT_PARTIALS_NAMESPACE: &str = "partials";

/// Top-level renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RendererConfig {
    /// Engine runtime source. `None` uses the bundled runtime.
    pub source: Option<PathBuf>,
    /// Namespace whose directories are scanned for partials.
    pub partials_namespace: String,
    /// Script helper files, registered under their base name.
    pub script_helpers: Vec<PathBuf>,
    /// Host helpers to pull from the [`crate::helpers::HelperCatalog`].
    pub host_helpers: Vec<String>,
    /// Template file extension, without the leading dot.
    pub extension: String,
    /// Separator between path segments inside a template name.
    pub separator: String,
    /// Namespace to directory mapping. The `""` entry is the default namespace.
    pub paths: BTreeMap<String, PathList>,
    pub cache: Option<CacheConfig>,
    /// Default render parameters applied to every template.
    pub defaults: serde_json::Map<String, serde_json::Value>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            source: None,
            partials_namespace: DEFAULT_PARTIALS_NAMESPACE.into(),
            script_helpers: Vec::new(),
            host_helpers: Vec::new(),
            extension: DEFAULT_EXTENSION.into(),
            separator: DEFAULT_SEPARATOR.into(),
            paths: BTreeMap::new(),
            cache: None,
            defaults: serde_json::Map::new(),
        }
    }
}

/// One directory or an ordered list of directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathList {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl PathList {
    pub fn to_vec(&self) -> Vec<PathBuf> {
        match self {
            Self::One(path) => vec![path.clone()],
            Self::Many(paths) => paths.clone(),
        }
    }

    fn rebase(&mut self, base: &Path) {
        match self {
            Self::One(path) => rebase_path(path, base),
            Self::Many(paths) => paths.iter_mut().for_each(|p| rebase_path(p, base)),
        }
    }
}

/// Cache store section, shaped after storage-factory configs:
/// an adapter name plus adapter options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CacheConfig {
    /// `memory`, `filesystem` or `blackhole`.
    pub adapter: Option<String>,
    pub options: CacheOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CacheOptions {
    /// Directory for the `filesystem` adapter.
    pub cache_dir: Option<PathBuf>,
}

impl RendererConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StencilError::ConfigNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|e| StencilError::ConfigParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the resolvers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() {
            return Err(StencilError::Configuration("extension must not be empty".into()));
        }
        if self.extension.starts_with('.') {
            return Err(StencilError::Configuration(format!(
                "extension '{}' must not start with a dot",
                self.extension
            )));
        }
        if self.separator.is_empty() {
            return Err(StencilError::Configuration("separator must not be empty".into()));
        }
        if self.separator.contains(NAMESPACE_DELIMITER) {
            return Err(StencilError::Configuration(format!(
                "separator '{}' clashes with the namespace delimiter '{NAMESPACE_DELIMITER}'",
                self.separator
            )));
        }
        Ok(())
    }

    /// Make every relative path absolute against `base` (usually the config file's directory).
    pub fn rebase(&mut self, base: &Path) {
        if let Some(source) = self.source.as_mut() {
            rebase_path(source, base);
        }
        for helper in &mut self.script_helpers {
            rebase_path(helper, base);
        }
        for paths in self.paths.values_mut() {
            paths.rebase(base);
        }
        if let Some(dir) = self
            .cache
            .as_mut()
            .and_then(|cache| cache.options.cache_dir.as_mut())
        {
            rebase_path(dir, base);
        }
    }
}

fn rebase_path(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}
