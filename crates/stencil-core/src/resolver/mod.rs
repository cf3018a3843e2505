//! Template resolution.
//!
//! A resolver maps a key to a [`Template`] or reports it absent. The concrete
//! resolvers are closed over in the [`Resolver`] enum, each advertising its
//! [`Capability`] set, and composed by the [`AggregateResolver`]:
//!
//! | Resolver | Resolve | Save | Paths |
//! |---|---|---|---|
//! | [`FilesystemResolver`] | raw source | - | yes |
//! | [`CacheResolver`] | compiled artifacts | yes | - |

mod aggregate;
mod cache;
mod filesystem;

pub use aggregate::AggregateResolver;
pub use cache::CacheResolver;
pub use filesystem::FilesystemResolver;

use crate::error::Result;

/// A resolved template: raw source or a compiled artifact.
///
/// When `compiled` is true the content was produced by the engine's compile
/// step and is opaque; otherwise it is raw template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    key: String,
    content: String,
    compiled: bool,
}

impl Template {
    pub fn source(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            compiled: false,
        }
    }

    pub fn compiled(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            compiled: true,
        }
    }

    /// The key this template was resolved under; compiled artifacts are saved back under it.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

/// What a resolver can do beyond plain resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Resolve,
    /// Persists compiled artifacts.
    Save,
    /// Exposes namespace to directory mappings.
    Paths,
}

/// The closed set of resolvers a chain can hold.
pub enum Resolver {
    Filesystem(FilesystemResolver),
    Cache(CacheResolver),
}

impl Resolver {
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Filesystem(_) => &[Capability::Resolve, Capability::Paths],
            Self::Cache(_) => &[Capability::Resolve, Capability::Save],
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub async fn resolve(&self, key: &str) -> Result<Option<Template>> {
        match self {
            Self::Filesystem(fs) => fs.resolve(key).await,
            Self::Cache(cache) => Ok(cache.resolve(key).await),
        }
    }

    /// Persist `content` under `key`. Resolvers without [`Capability::Save`] return `false`.
    pub async fn save(&self, key: &str, content: &str) -> bool {
        match self {
            Self::Filesystem(_) => false,
            Self::Cache(cache) => cache.save(key, content).await,
        }
    }

    pub fn as_filesystem(&self) -> Option<&FilesystemResolver> {
        match self {
            Self::Filesystem(fs) => Some(fs),
            _ => None,
        }
    }

    pub fn as_filesystem_mut(&mut self) -> Option<&mut FilesystemResolver> {
        match self {
            Self::Filesystem(fs) => Some(fs),
            _ => None,
        }
    }

    pub fn as_cache(&self) -> Option<&CacheResolver> {
        match self {
            Self::Cache(cache) => Some(cache),
            _ => None,
        }
    }
}

impl From<FilesystemResolver> for Resolver {
    fn from(resolver: FilesystemResolver) -> Self {
        Self::Filesystem(resolver)
    }
}

impl From<CacheResolver> for Resolver {
    fn from(resolver: CacheResolver) -> Self {
        Self::Cache(resolver)
    }
}
