use std::sync::Arc;

use tracing::{debug, warn};

use super::Template;
use crate::store::CacheStore;

/// Resolves templates from a cache store and saves compiled artifacts back to it.
///
/// Hits are flagged with the configured `is_compiled` value. Only compiled
/// artifacts are ever written by the renderer, so production chains set it to `true`.
pub struct CacheResolver {
    store: Arc<dyn CacheStore>,
    is_compiled: bool,
}

impl CacheResolver {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            is_compiled: false,
        }
    }

    pub fn set_is_compiled(&mut self, is_compiled: bool) -> &mut Self {
        self.is_compiled = is_compiled;
        self
    }

    pub fn is_compiled(&self) -> bool {
        self.is_compiled
    }

    pub async fn resolve(&self, key: &str) -> Option<Template> {
        let bytes = self.store.get(key).await?;
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                warn!("ignoring non UTF-8 cache entry for '{key}'");
                return None;
            }
        };
        debug!("cache hit for '{key}'");
        Some(if self.is_compiled {
            Template::compiled(key, content)
        } else {
            Template::source(key, content)
        })
    }

    pub async fn save(&self, key: &str, content: &str) -> bool {
        self.store.put(key, content.as_bytes()).await
    }
}
