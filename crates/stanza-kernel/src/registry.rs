//! Command registry: maps command names to invocation templates.
//!
//! The registry is built once by the caller and handed to the interpreter.
//! It is never mutated during evaluation.
//!
//! On disk it is a flat JSON object:
//!
//! ```json
//! {
//!   "d0t.crawl": "curl -s {0}",
//!   "analyze": "analyze --input {input}"
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::ast::Command;

/// Errors loading a registry file.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid registry JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("registry entry {key:?} must be a string template")]
    NotATemplate { key: String },
    #[error("registry must be a JSON object of name → template")]
    NotAnObject,
}

/// A registry hit: the key that matched and its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub key: &'a str,
    pub template: &'a str,
}

/// Registry of external command templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRegistry {
    entries: BTreeMap<String, String>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.entries.insert(key.into(), template.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.insert(key, template);
        self
    }

    /// Parse a registry from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let object = value.as_object().ok_or(RegistryError::NotAnObject)?;

        let mut registry = Self::new();
        for (key, template) in object {
            let template = template
                .as_str()
                .ok_or_else(|| RegistryError::NotATemplate { key: key.clone() })?;
            registry.insert(key.clone(), template);
        }
        Ok(registry)
    }

    /// Load a registry from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), entries = registry.len(), "loaded command registry");
        Ok(registry)
    }

    /// Look up a command: full `namespace.action` key first, then the bare
    /// action.
    pub fn resolve(&self, command: &Command) -> Option<Resolved<'_>> {
        let full = command.key();
        self.entries
            .get_key_value(full.as_str())
            .or_else(|| self.entries.get_key_value(command.action.as_str()))
            .map(|(key, template)| Resolved {
                key: key.as_str(),
                template: template.as_str(),
            })
    }

    /// Look up a raw key without fallback.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
