//! Namespaced template keys.
//!
//! A key is `namespace::name` or just `name`. Un-namespaced keys live in the
//! [`DEFAULT_NAMESPACE`]. The reserved [`SYSTEM_NAMESPACE`] holds entries the
//! renderer assembly caches for itself (runtime source, partial map, helpers).

use std::fmt;

/// Delimiter between namespace and name.
pub const NAMESPACE_DELIMITER: &str = "::";

/// Sentinel for keys without an explicit namespace.
pub const DEFAULT_NAMESPACE: &str = "__DEFAULT__";

/// Reserved namespace for internal cache entries.
pub const SYSTEM_NAMESPACE: &str = "__SYSTEM__";

/// A template key split into namespace and name.
///
/// Equality is exact: keys are case- and separator-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    namespace: String,
    name: String,
}

impl TemplateKey {
    /// Split `raw` on the first `::`. Without one, the key is in the default namespace.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(NAMESPACE_DELIMITER) {
            Some((namespace, name)) if !namespace.is_empty() => Self {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            Some((_, name)) => Self::in_default(name),
            None => Self::in_default(raw),
        }
    }

    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key for an internal entry in the [`SYSTEM_NAMESPACE`].
    pub fn system(name: impl Into<String>) -> Self {
        Self::new(SYSTEM_NAMESPACE, name)
    }

    fn in_default(name: &str) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            name: name.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default(&self) -> bool {
        self.namespace == DEFAULT_NAMESPACE
    }

    pub fn is_system(&self) -> bool {
        self.namespace == SYSTEM_NAMESPACE
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}{}{}", self.namespace, NAMESPACE_DELIMITER, self.name)
        }
    }
}

/// Map a user-facing namespace (`None` or `""`) onto the internal namespace name.
pub fn namespace_or_default(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => ns.to_string(),
        _ => DEFAULT_NAMESPACE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_namespaced() {
        let key = TemplateKey::parse("foo::bar");
        assert_eq!(key.namespace(), "foo");
        assert_eq!(key.name(), "bar");
        assert_eq!(key.to_string(), "foo::bar");
    }

    #[test]
    fn test_parse_default_namespace() {
        let key = TemplateKey::parse("bar");
        assert!(key.is_default());
        assert_eq!(key.name(), "bar");
        assert_eq!(key.to_string(), "bar");
    }

    #[test]
    fn test_parse_leading_delimiter_is_default() {
        let key = TemplateKey::parse("::bar");
        assert!(key.is_default());
        assert_eq!(key.name(), "bar");
    }

    #[test]
    fn test_parse_splits_on_first_delimiter_only() {
        let key = TemplateKey::parse("a::b::c");
        assert_eq!(key.namespace(), "a");
        assert_eq!(key.name(), "b::c");
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        assert_ne!(TemplateKey::parse("Foo::bar"), TemplateKey::parse("foo::bar"));
    }

    #[test]
    fn test_system_key() {
        let key = TemplateKey::system("handlebars");
        assert!(key.is_system());
        assert_eq!(key.to_string(), "__SYSTEM__::handlebars");
    }

    #[test]
    fn test_namespace_or_default() {
        assert_eq!(namespace_or_default(None), DEFAULT_NAMESPACE);
        assert_eq!(namespace_or_default(Some("")), DEFAULT_NAMESPACE);
        assert_eq!(namespace_or_default(Some("admin")), "admin");
    }
}
