//! Project-level plugin records.
//!
//! Two places remember which plugins a project wants: the project
//! configuration (behind [`ProjectConfig`]) and the project's
//! `package.json`, whose `dependencies` map can pin a plugin to a version
//! or source and whose `cordova.plugins` map stores install variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const PACKAGE_MANIFEST: &str = "package.json";

/// A plugin entry in the project configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginRecord {
    pub name: String,
    /// Version range, URL or path the plugin was added from.
    pub spec: Option<String>,
    pub variables: BTreeMap<String, String>,
}

impl PluginRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = Some(spec.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// The project configuration document.
pub trait ProjectConfig: Send + Sync {
    fn get_plugin(&self, id: &str) -> Option<PluginRecord>;

    fn remove_plugin(&mut self, id: &str);

    /// Record `record` with `variables` as its install variables.
    fn add_plugin(&mut self, record: PluginRecord, variables: &BTreeMap<String, String>);

    /// Persist pending changes.
    fn write(&mut self) -> Result<()>;
}

/// Project configuration held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryProjectConfig {
    plugins: Vec<PluginRecord>,
    writes: usize,
}

impl MemoryProjectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, record: PluginRecord) -> Self {
        self.plugins.push(record);
        self
    }

    pub fn plugins(&self) -> &[PluginRecord] {
        &self.plugins
    }

    /// Number of times [`ProjectConfig::write`] was called.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl ProjectConfig for MemoryProjectConfig {
    fn get_plugin(&self, id: &str) -> Option<PluginRecord> {
        self.plugins.iter().find(|p| p.name == id).cloned()
    }

    fn remove_plugin(&mut self, id: &str) {
        self.plugins.retain(|p| p.name != id);
    }

    fn add_plugin(&mut self, mut record: PluginRecord, variables: &BTreeMap<String, String>) {
        record.variables = variables.clone();
        self.plugins.push(record);
    }

    fn write(&mut self) -> Result<()> {
        self.writes += 1;
        Ok(())
    }
}

/// The project's `package.json`.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    path: PathBuf,
    document: Map<String, Value>,
}

impl PackageManifest {
    /// Load `<project_root>/package.json`; `None` if the project has none.
    pub fn load(project_root: &Path) -> Result<Option<Self>> {
        let path = project_root.join(PACKAGE_MANIFEST);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let document = match serde_json::from_str(&content)? {
            Value::Object(map) => map,
            _ => {
                return Err(Error::PluginManifest {
                    path,
                    message: "top level is not an object".to_string(),
                });
            }
        };
        Ok(Some(Self { path, document }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `dependencies` value recorded for `package`, if it is a string.
    pub fn dependency(&self, package: &str) -> Option<&str> {
        self.document
            .get("dependencies")?
            .get(package)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// Install variables stored under `cordova.plugins.<id>`.
    pub fn plugin_variables(&self, id: &str) -> Option<BTreeMap<String, String>> {
        let entry = self.document.get("cordova")?.get("plugins")?.get(id)?;
        let map = entry.as_object()?;
        Some(
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect(),
        )
    }

    /// Store install variables under `cordova.plugins.<id>`.
    pub fn set_plugin_variables(
        &mut self,
        id: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<()> {
        let path = self.path.clone();
        let cordova = object_entry(&mut self.document, "cordova", &path)?;
        let plugins = object_entry(cordova, "plugins", &path)?;
        let values = variables
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        plugins.insert(id.to_string(), Value::Object(values));

        if !self.document.contains_key("dependencies") {
            self.document
                .insert("dependencies".to_string(), Value::Object(Map::new()));
        }
        Ok(())
    }

    /// Write the document back with two-space indentation.
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.document)?;
        std::fs::write(&self.path, content)?;
        tracing::debug!(path = %self.path.display(), "Saved package manifest");
        Ok(())
    }
}

fn object_entry<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
    path: &Path,
) -> Result<&'a mut Map<String, Value>> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if entry.is_null() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut().ok_or_else(|| Error::PluginManifest {
        path: path.to_path_buf(),
        message: format!("'{key}' is not an object"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_memory_config_replace_cycle() {
        let mut config = MemoryProjectConfig::new()
            .with_plugin(PluginRecord::new("p").with_spec("1.0.0").with_variable("A", "1"));

        let vars = BTreeMap::from([("B".to_string(), "2".to_string())]);
        config.remove_plugin("p");
        config.add_plugin(PluginRecord::new("p").with_spec("^2.0.0"), &vars);
        config.write().unwrap();

        let record = config.get_plugin("p").unwrap();
        assert_eq!(record.spec.as_deref(), Some("^2.0.0"));
        assert_eq!(record.variables, vars);
        assert_eq!(config.plugins().len(), 1);
        assert_eq!(config.write_count(), 1);
    }

    #[test]
    fn test_manifest_absent() {
        let temp = TempDir::new().unwrap();
        assert!(PackageManifest::load(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_manifest_dependency_lookup() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(PACKAGE_MANIFEST),
            r#"{ "dependencies": { "@cordova/x": "^1.0.0", "empty": "", "odd": 3 } }"#,
        )
        .unwrap();

        let manifest = PackageManifest::load(temp.path()).unwrap().unwrap();
        assert_eq!(manifest.dependency("@cordova/x"), Some("^1.0.0"));
        assert_eq!(manifest.dependency("empty"), None);
        assert_eq!(manifest.dependency("odd"), None);
        assert_eq!(manifest.dependency("missing"), None);
    }

    #[test]
    fn test_set_plugin_variables_round_trips_through_disk() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(PACKAGE_MANIFEST), r#"{ "name": "app" }"#).unwrap();

        let mut manifest = PackageManifest::load(temp.path()).unwrap().unwrap();
        let vars = BTreeMap::from([("API_KEY".to_string(), "k".to_string())]);
        manifest.set_plugin_variables("cordova-plugin-maps", &vars).unwrap();
        manifest.save().unwrap();

        let saved: Value =
            serde_json::from_str(&std::fs::read_to_string(temp.path().join(PACKAGE_MANIFEST)).unwrap())
                .unwrap();
        assert_eq!(
            saved,
            serde_json::json!({
                "name": "app",
                "cordova": { "plugins": { "cordova-plugin-maps": { "API_KEY": "k" } } },
                "dependencies": {}
            })
        );

        let reloaded = PackageManifest::load(temp.path()).unwrap().unwrap();
        assert_eq!(reloaded.plugin_variables("cordova-plugin-maps"), Some(vars));
    }

    #[test]
    fn test_set_plugin_variables_rejects_non_object() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(PACKAGE_MANIFEST), r#"{ "cordova": [] }"#).unwrap();

        let mut manifest = PackageManifest::load(temp.path()).unwrap().unwrap();
        let err = manifest
            .set_plugin_variables("p", &BTreeMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("'cordova' is not an object"));
    }
}
