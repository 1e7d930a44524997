//! Values a build exposes to hooks and post-processors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Digest of the committed image.
pub const IMAGE_SHA256: &str = "ImageSha256";

/// Names of every value a build can publish.
pub const GENERATED_KEYS: &[&str] = &[IMAGE_SHA256];

/// Named values produced during a build.
///
/// A key is only present once the step that defines it has run; lookups of
/// anything else return `None` rather than an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedData {
    values: BTreeMap<String, String>,
}

impl GeneratedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
