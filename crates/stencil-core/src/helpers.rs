//! Host-language (Rust) helpers.
//!
//! Script helpers are loaded from files by the renderer assembly. Rust helpers
//! cannot be loaded that way, so the host hands the assembly a
//! [`HelperCatalog`] and the configuration picks entries from it by name.

use std::collections::HashMap;
use std::path::Path;

use handlebars::{handlebars_helper, HelperDef};

/// A helper implemented in Rust.
pub type HostHelper = Box<dyn HelperDef + Send + Sync + 'static>;

handlebars_helper!(upper: |s: str| s.to_uppercase());
handlebars_helper!(lower: |s: str| s.to_lowercase());
handlebars_helper!(snake_case: |s: str| delimit(s, '_'));
handlebars_helper!(kebab_case: |s: str| delimit(s, '-'));

fn delimit(s: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_lower = false;
    for c in s.trim().chars() {
        if c == ' ' || c == '-' || c == '_' {
            if !out.is_empty() && !out.ends_with(delimiter) {
                out.push(delimiter);
            }
            prev_lower = false;
        } else if c.is_uppercase() {
            if prev_lower {
                out.push(delimiter);
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Named Rust helpers available for registration.
#[derive(Default)]
pub struct HelperCatalog {
    helpers: HashMap<String, HostHelper>,
}

impl HelperCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the helpers shipped in this crate:
    /// `upper`, `lower`, `snake_case`, `kebab_case`.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog
            .insert("upper", Box::new(upper))
            .insert("lower", Box::new(lower))
            .insert("snake_case", Box::new(snake_case))
            .insert("kebab_case", Box::new(kebab_case));
        catalog
    }

    pub fn insert(&mut self, name: impl Into<String>, helper: HostHelper) -> &mut Self {
        self.helpers.insert(name.into(), helper);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Remove and return a helper; each helper is registered at most once.
    pub fn take(&mut self, name: &str) -> Option<HostHelper> {
        self.helpers.remove(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.helpers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Helper name for a file: its base name up to the first `.`.
///
/// `helpers/format.date.rhai` registers as `format`; a base name without a
/// dot is used whole.
pub fn helper_name(file: &str) -> String {
    let base = Path::new(file)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(file);
    match base.find('.') {
        Some(0) | None => base.to_string(),
        Some(idx) => base[..idx].to_string(),
    }
}
