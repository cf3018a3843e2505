use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::Template;
use crate::config::{DEFAULT_EXTENSION, DEFAULT_SEPARATOR};
use crate::error::{Result, StencilError};
use crate::key::{namespace_or_default, TemplateKey};

/// Resolves raw template source from namespaced directories.
///
/// `ns::admin/users` is looked up as `<dir>/admin/users.<extension>` in each
/// directory registered for `ns`, in registration order. The first existing
/// file wins.
#[derive(Debug, Clone)]
pub struct FilesystemResolver {
    extension: String,
    separator: String,
    paths: Vec<(String, Vec<PathBuf>)>,
}

impl Default for FilesystemResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FilesystemResolver {
    pub fn new() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.into(),
            separator: DEFAULT_SEPARATOR.into(),
            paths: Vec::new(),
        }
    }

    pub fn set_extension(&mut self, extension: impl Into<String>) -> &mut Self {
        self.extension = extension.into();
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn set_separator(&mut self, separator: impl Into<String>) -> &mut Self {
        self.separator = separator.into();
        self
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Append `path` to the directories of `namespace` (`None` is the default namespace).
    pub fn add_path(&mut self, path: impl Into<PathBuf>, namespace: Option<&str>) -> &mut Self {
        let namespace = namespace_or_default(namespace);
        let path = path.into();
        match self.paths.iter_mut().find(|(ns, _)| *ns == namespace) {
            Some((_, dirs)) => dirs.push(path),
            None => self.paths.push((namespace, vec![path])),
        }
        self
    }

    /// Namespace to directories, in registration order.
    pub fn paths(&self) -> &[(String, Vec<PathBuf>)] {
        &self.paths
    }

    pub fn directories(&self, namespace: &str) -> &[PathBuf] {
        self.paths
            .iter()
            .find(|(ns, _)| ns == namespace)
            .map(|(_, dirs)| dirs.as_slice())
            .unwrap_or(&[])
    }

    pub async fn resolve(&self, key: &str) -> Result<Option<Template>> {
        let parsed = TemplateKey::parse(key);
        let dirs = self.directories(parsed.namespace());
        if dirs.is_empty() {
            return Ok(None);
        }

        let Some(relative) = self.relative_path(parsed.name()) else {
            warn!("refusing to resolve template name '{}'", parsed.name());
            return Ok(None);
        };

        for dir in dirs {
            let candidate = dir.join(&relative);
            match tokio::fs::metadata(&candidate).await {
                Ok(meta) if meta.is_file() => {
                    debug!("resolved '{key}' to {}", candidate.display());
                    let unreadable = |message: String| StencilError::TemplateCompilation {
                        name: key.to_string(),
                        message,
                    };
                    let bytes = tokio::fs::read(&candidate).await.map_err(|e| {
                        unreadable(format!("cannot read {}: {e}", candidate.display()))
                    })?;
                    let content = String::from_utf8(bytes).map_err(|_| {
                        unreadable(format!("{} is not valid UTF-8", candidate.display()))
                    })?;
                    return Ok(Some(Template::source(key, content)));
                }
                _ => continue,
            }
        }

        Ok(None)
    }

    /// Map a template name onto a relative file path.
    ///
    /// Returns `None` for names that would escape the configured directories.
    fn relative_path(&self, name: &str) -> Option<PathBuf> {
        let segments: Vec<&str> = name.split(self.separator.as_str()).collect();
        let valid = segments.iter().all(|s| {
            !s.is_empty() && *s != "." && *s != ".." && !s.contains(['/', '\\'])
        });
        if !valid {
            return None;
        }

        let (file, dirs) = segments.split_last()?;
        let mut path: PathBuf = dirs.iter().collect();
        path.push(format!("{file}.{}", self.extension));
        Some(path)
    }

    /// List template names available in `namespace`.
    ///
    /// Only files directly inside each directory are listed unless `recursive`
    /// is set; nested names are joined with the separator. A name found in an
    /// earlier directory shadows the same name in later ones. Files or
    /// directories whose name contains the separator cannot be addressed and
    /// are skipped.
    pub async fn discover(&self, namespace: &str, recursive: bool) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();

        for dir in self.directories(namespace) {
            if !tokio::fs::metadata(dir).await.is_ok_and(|meta| meta.is_dir()) {
                debug!("skipping missing template directory {}", dir.display());
                continue;
            }
            let mut found = self.walk(dir, recursive).await?;
            found.sort();
            for name in found {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }

        Ok(names)
    }

    async fn walk(&self, root: &Path, recursive: bool) -> Result<Vec<String>> {
        let mut found = Vec::new();
        let mut pending: Vec<(PathBuf, Vec<String>)> = vec![(root.to_path_buf(), Vec::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
                    continue;
                };

                if entry.file_type().await?.is_dir() {
                    if !recursive {
                        continue;
                    }
                    if file_name.contains(self.separator.as_str()) {
                        warn!("skipping directory {} (name contains the separator)", path.display());
                        continue;
                    }
                    let mut nested = prefix.clone();
                    nested.push(file_name.to_string());
                    pending.push((path, nested));
                    continue;
                }

                if !path.extension().is_some_and(|ext| ext == self.extension.as_str()) {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if stem.contains(self.separator.as_str()) {
                    warn!("skipping {} (name contains the separator)", path.display());
                    continue;
                }
                let mut parts = prefix.clone();
                parts.push(stem.to_string());
                found.push(parts.join(&self.separator));
            }
        }
        Ok(found)
    }
}
