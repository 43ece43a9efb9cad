//! Plugin registry seam and the local registry catalog.
//!
//! The resolver only needs one thing from a registry: the release list and
//! engine constraints of a plugin. Network transport lives behind
//! [`RegistryClient`]; [`LocalRegistry`] serves the same answers from an
//! in-memory catalog that can be loaded from a JSON document keyed by id.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintTable;
use crate::error::{Error, Result};
use crate::target::ResolveOptions;

/// Registry view of a plugin package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Package name as published.
    #[serde(default)]
    pub name: String,
    /// Every published release, in registry order.
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engines: Option<Engines>,
}

/// The `engines` section of a plugin package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engines {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cordova_dependencies: Option<ConstraintTable>,
}

impl PluginMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.versions = versions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_constraints(mut self, table: ConstraintTable) -> Self {
        self.engines = Some(Engines {
            cordova_dependencies: Some(table),
        });
        self
    }

    /// The declared engine constraint table, if any.
    pub fn constraint_table(&self) -> Option<&ConstraintTable> {
        self.engines.as_ref()?.cordova_dependencies.as_ref()
    }
}

/// Looks up plugin metadata in a registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetch metadata for the first of `plugin_ids`.
    ///
    /// Rejects with [`Error::RegistryUnavailable`] when the registry cannot
    /// answer.
    async fn lookup(
        &self,
        plugin_ids: &[String],
        project_root: &Path,
        options: &ResolveOptions,
    ) -> Result<PluginMetadata>;
}

/// In-memory registry catalog.
#[derive(Debug, Clone, Default)]
pub struct LocalRegistry {
    entries: HashMap<String, PluginMetadata>,
}

impl LocalRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Parse a catalog document: `{ "<plugin id>": { "versions": [...], "engines": {...} } }`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let documents: HashMap<String, PluginMetadata> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for (id, metadata) in documents {
            registry.register(id, metadata);
        }
        Ok(registry)
    }

    /// Load a catalog document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loading local registry catalog");
        Self::from_json_str(&content)
    }

    /// Register metadata under `id`, replacing any previous entry.
    pub fn register(&mut self, id: impl Into<String>, mut metadata: PluginMetadata) {
        let id = id.into();
        if metadata.name.is_empty() {
            metadata.name = id.clone();
        }
        self.entries.insert(id, metadata);
    }

    /// Look up a plugin by id.
    pub fn get(&self, id: &str) -> Option<&PluginMetadata> {
        self.entries.get(id)
    }

    /// List all known plugin ids (sorted).
    pub fn known_plugins(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RegistryClient for LocalRegistry {
    async fn lookup(
        &self,
        plugin_ids: &[String],
        _project_root: &Path,
        _options: &ResolveOptions,
    ) -> Result<PluginMetadata> {
        let id = plugin_ids.first().ok_or_else(|| Error::RegistryUnavailable {
            plugins: String::new(),
            reason: "no plugin id given".to_string(),
        })?;

        self.get(id).cloned().ok_or_else(|| Error::RegistryUnavailable {
            plugins: plugin_ids.join(", "),
            reason: "not found in local registry".to_string(),
        })
    }
}
