//! Metadata of a fetched plugin, read from its directory.
//!
//! A plugin directory carries a `package.json` whose `cordova` section
//! declares the plugin id, its dependencies (shared and per platform) and
//! the install-time preferences it understands:
//!
//! ```json
//! {
//!   "name": "cordova-plugin-maps",
//!   "version": "1.2.0",
//!   "cordova": {
//!     "id": "cordova-plugin-maps",
//!     "dependencies": ["cordova-plugin-geolocation"],
//!     "platformDependencies": { "android": [{ "id": "cordova-plugin-play-services", "version": "^2.0.0" }] },
//!     "preferences": { "API_KEY": null, "REGION": "eu" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::registry::Engines;

pub const PLUGIN_MANIFEST: &str = "package.json";

/// A dependency edge declared by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PluginDependency {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub subdir: Option<String>,
}

impl PluginDependency {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: None,
            version: None,
            subdir: None,
        }
    }
}

/// Parsed metadata of an installed or fetched plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInfo {
    pub id: String,
    pub version: String,
    pub dir: PathBuf,
    pub engines: Option<Engines>,
    dependencies: Vec<PluginDependency>,
    platform_dependencies: BTreeMap<String, Vec<PluginDependency>>,
    preferences: Vec<(String, Option<String>)>,
}

impl PluginInfo {
    pub fn new(id: impl Into<String>, version: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            dir: dir.into(),
            engines: None,
            dependencies: Vec::new(),
            platform_dependencies: BTreeMap::new(),
            preferences: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, dependency: PluginDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_platform_dependency(
        mut self,
        platform: impl Into<String>,
        dependency: PluginDependency,
    ) -> Self {
        self.platform_dependencies
            .entry(platform.into())
            .or_default()
            .push(dependency);
        self
    }

    /// Declare a preference; `None` marks it mandatory.
    pub fn with_preference(mut self, name: impl Into<String>, default: Option<&str>) -> Self {
        self.preferences
            .push((name.into(), default.map(str::to_string)));
        self
    }

    /// Dependencies that apply on `platform`: shared ones first.
    pub fn get_dependencies(&self, platform: &str) -> Vec<&PluginDependency> {
        let specific = self
            .platform_dependencies
            .get(platform)
            .map(Vec::as_slice)
            .unwrap_or_default();
        self.dependencies.iter().chain(specific).collect()
    }

    /// Declared preferences with their defaults.
    pub fn preferences(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.preferences
            .iter()
            .map(|(name, default)| (name.as_str(), default.as_deref()))
    }

    /// Preferences without a non-empty default.
    pub fn mandatory_preferences(&self) -> impl Iterator<Item = &str> {
        self.preferences()
            .filter(|(_, default)| default.is_none_or(str::is_empty))
            .map(|(name, _)| name)
    }
}

/// Reads plugin metadata from a plugin directory.
pub trait PluginInfoProvider: Send + Sync {
    fn get(&self, plugin_dir: &Path) -> Result<PluginInfo>;
}

/// Reads `<plugin_dir>/package.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackagePluginInfoProvider;

#[derive(Debug, Deserialize)]
struct PackageDocument {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    engines: Option<Engines>,
    #[serde(default)]
    cordova: CordovaSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CordovaSection {
    id: Option<String>,
    #[serde(default)]
    dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    platform_dependencies: BTreeMap<String, Vec<DependencyEntry>>,
    #[serde(default)]
    preferences: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependencyEntry {
    Id(String),
    Full(PluginDependency),
}

impl From<DependencyEntry> for PluginDependency {
    fn from(entry: DependencyEntry) -> Self {
        match entry {
            DependencyEntry::Id(id) => PluginDependency::new(id),
            DependencyEntry::Full(dependency) => dependency,
        }
    }
}

impl PluginInfoProvider for PackagePluginInfoProvider {
    fn get(&self, plugin_dir: &Path) -> Result<PluginInfo> {
        let path = plugin_dir.join(PLUGIN_MANIFEST);
        let manifest_error = |message: String| Error::PluginManifest {
            path: path.clone(),
            message,
        };

        let content = std::fs::read_to_string(&path).map_err(|e| manifest_error(e.to_string()))?;
        let document: PackageDocument =
            serde_json::from_str(&content).map_err(|e| manifest_error(e.to_string()))?;

        let id = document
            .cordova
            .id
            .or(document.name)
            .ok_or_else(|| manifest_error("no plugin id or package name".to_string()))?;
        let version = document
            .version
            .ok_or_else(|| manifest_error("no version".to_string()))?;

        let mut info = PluginInfo::new(id, version, plugin_dir);
        info.engines = document.engines;
        info.dependencies = document
            .cordova
            .dependencies
            .into_iter()
            .map(Into::into)
            .collect();
        info.platform_dependencies = document
            .cordova
            .platform_dependencies
            .into_iter()
            .map(|(platform, deps)| (platform, deps.into_iter().map(Into::into).collect()))
            .collect();
        info.preferences = document
            .cordova
            .preferences
            .into_iter()
            .map(|(name, default)| {
                let default = match default {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                };
                (name, default)
            })
            .collect();

        tracing::debug!(id = %info.id, version = %info.version, "Read plugin manifest");
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, json: &str) {
        std::fs::write(dir.join(PLUGIN_MANIFEST), json).unwrap();
    }

    #[test]
    fn test_reads_id_version_and_dependencies() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            r#"{
                "name": "cordova-plugin-maps",
                "version": "1.2.0",
                "cordova": {
                    "id": "cordova-plugin-maps",
                    "dependencies": ["A", { "id": "B", "version": "^2.0.0" }],
                    "platformDependencies": { "android": ["C"] }
                }
            }"#,
        );

        let info = PackagePluginInfoProvider.get(temp.path()).unwrap();
        assert_eq!(info.id, "cordova-plugin-maps");
        assert_eq!(info.version, "1.2.0");

        let android: Vec<&str> = info
            .get_dependencies("android")
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(android, vec!["A", "B", "C"]);

        let ios: Vec<&str> = info
            .get_dependencies("ios")
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ios, vec!["A", "B"]);
        assert_eq!(info.get_dependencies("ios")[1].version.as_deref(), Some("^2.0.0"));
    }

    #[test]
    fn test_falls_back_to_package_name() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), r#"{ "name": "plain", "version": "0.1.0" }"#);

        let info = PackagePluginInfoProvider.get(temp.path()).unwrap();
        assert_eq!(info.id, "plain");
        assert!(info.get_dependencies("android").is_empty());
    }

    #[test]
    fn test_mandatory_preferences() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            r#"{
                "name": "p",
                "version": "1.0.0",
                "cordova": { "preferences": { "API_KEY": null, "REGION": "eu", "TOKEN": "" } }
            }"#,
        );

        let info = PackagePluginInfoProvider.get(temp.path()).unwrap();
        let mandatory: Vec<&str> = info.mandatory_preferences().collect();
        assert_eq!(mandatory, vec!["API_KEY", "TOKEN"]);
    }

    #[test]
    fn test_missing_manifest_is_error() {
        let temp = TempDir::new().unwrap();
        let err = PackagePluginInfoProvider.get(temp.path()).unwrap_err();
        assert!(matches!(err, Error::PluginManifest { .. }));
    }

    #[test]
    fn test_manifest_without_version_is_error() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), r#"{ "name": "p" }"#);
        let err = PackagePluginInfoProvider.get(temp.path()).unwrap_err();
        assert!(err.to_string().contains("no version"));
    }

    #[test]
    fn test_builder_preferences() {
        let info = PluginInfo::new("p", "1.0.0", "/tmp/p")
            .with_preference("A", None)
            .with_preference("B", Some("x"));
        assert_eq!(info.mandatory_preferences().collect::<Vec<_>>(), vec!["A"]);
    }
}
