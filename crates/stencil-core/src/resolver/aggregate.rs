use std::path::PathBuf;

use tracing::{debug, warn};

use super::{Capability, FilesystemResolver, Resolver, Template};
use crate::error::Result;

struct Attached {
    resolver: Resolver,
    priority: i32,
}

/// Ordered chain of resolvers.
///
/// Lower priority values are tried first; equal priorities keep attachment
/// order. Resolution short-circuits on the first hit, so whichever resolver
/// sits earlier shadows the later ones for the same key.
#[derive(Default)]
pub struct AggregateResolver {
    resolvers: Vec<Attached>,
}

impl AggregateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, resolver: impl Into<Resolver>, priority: i32) -> &mut Self {
        let position = self
            .resolvers
            .iter()
            .position(|attached| attached.priority > priority)
            .unwrap_or(self.resolvers.len());
        self.resolvers.insert(
            position,
            Attached {
                resolver: resolver.into(),
                priority,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Resolvers in trial order.
    pub fn iter(&self) -> impl Iterator<Item = &Resolver> {
        self.resolvers.iter().map(|attached| &attached.resolver)
    }

    pub async fn resolve(&self, key: &str) -> Result<Option<Template>> {
        for attached in &self.resolvers {
            if let Some(template) = attached.resolver.resolve(key).await? {
                debug!(
                    "'{key}' resolved at priority {} (compiled: {})",
                    attached.priority,
                    template.is_compiled()
                );
                return Ok(Some(template));
            }
        }
        Ok(None)
    }

    /// First attached resolver offering `capability`.
    pub fn fetch_by_type(&self, capability: Capability) -> Option<&Resolver> {
        self.iter().find(|resolver| resolver.supports(capability))
    }

    pub fn has_type(&self, capability: Capability) -> bool {
        self.fetch_by_type(capability).is_some()
    }

    pub fn supports_save(&self) -> bool {
        self.has_type(Capability::Save)
    }

    pub fn filesystem(&self) -> Option<&FilesystemResolver> {
        self.fetch_by_type(Capability::Paths)
            .and_then(Resolver::as_filesystem)
    }

    pub fn filesystem_mut(&mut self) -> Option<&mut FilesystemResolver> {
        self.resolvers
            .iter_mut()
            .find_map(|attached| attached.resolver.as_filesystem_mut())
    }

    /// Save to every save-capable member. Returns whether any of them accepted.
    pub async fn save(&self, key: &str, content: &str) -> bool {
        let mut saved = false;
        for resolver in self.iter().filter(|r| r.supports(Capability::Save)) {
            saved |= resolver.save(key, content).await;
        }
        saved
    }

    /// Namespace to directories of the filesystem member, empty without one.
    pub fn get_paths(&self) -> Vec<(String, Vec<PathBuf>)> {
        self.filesystem()
            .map(|fs| fs.paths().to_vec())
            .unwrap_or_default()
    }

    pub fn add_path(&mut self, path: impl Into<PathBuf>, namespace: Option<&str>) -> &mut Self {
        match self.filesystem_mut() {
            Some(fs) => {
                fs.add_path(path, namespace);
            }
            None => warn!("no filesystem resolver attached, ignoring template path"),
        }
        self
    }
}
