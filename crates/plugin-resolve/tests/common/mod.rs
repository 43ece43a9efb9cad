#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use plugin_resolve::{
    Error, PluginFetcher, PluginInstaller, PluginMetadata, RegistryClient, ResolveOptions, Result,
};
use serde_json::json;

/// Registry that serves fixed metadata and counts lookups.
#[derive(Default)]
pub struct CountingRegistry {
    entries: HashMap<String, PluginMetadata>,
    calls: AtomicUsize,
}

impl CountingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metadata: PluginMetadata) -> Self {
        self.entries.insert(metadata.name.clone(), metadata);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryClient for CountingRegistry {
    async fn lookup(
        &self,
        plugin_ids: &[String],
        _project_root: &Path,
        _options: &ResolveOptions,
    ) -> Result<PluginMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = &plugin_ids[0];
        self.entries
            .get(id)
            .cloned()
            .ok_or_else(|| Error::RegistryUnavailable {
                plugins: id.clone(),
                reason: "offline".to_string(),
            })
    }
}

/// A plugin the fake fetcher knows how to materialise.
#[derive(Clone)]
pub struct FakePlugin {
    pub id: String,
    pub version: String,
    pub preferences: serde_json::Value,
}

impl FakePlugin {
    pub fn new(id: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            version: version.to_string(),
            preferences: json!({}),
        }
    }

    pub fn with_preferences(mut self, preferences: serde_json::Value) -> Self {
        self.preferences = preferences;
        self
    }
}

/// Fetcher that writes a plugin directory for known targets and records
/// every target it was asked for.
#[derive(Default)]
pub struct FakeFetcher {
    plugins: HashMap<String, FakePlugin>,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: &str, plugin: FakePlugin) -> Self {
        self.plugins.insert(target.to_string(), plugin);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PluginFetcher for FakeFetcher {
    async fn fetch(
        &self,
        target: &str,
        plugins_dir: &Path,
        _options: &ResolveOptions,
    ) -> Result<PathBuf> {
        self.fetched.lock().unwrap().push(target.to_string());
        let plugin = self.plugins.get(target).ok_or_else(|| Error::Fetch {
            target: target.to_string(),
            reason: "unknown target".to_string(),
        })?;

        let dir = plugins_dir.join(&plugin.id);
        std::fs::create_dir_all(&dir)?;
        let manifest = json!({
            "name": plugin.id,
            "version": plugin.version,
            "cordova": { "id": plugin.id, "preferences": plugin.preferences },
        });
        std::fs::write(dir.join("package.json"), serde_json::to_string(&manifest)?)?;
        Ok(dir)
    }
}

/// Installer that records `(platform, plugin, variables)` per call.
#[derive(Default)]
pub struct RecordingInstaller {
    pub installs: Mutex<Vec<(String, String, BTreeMap<String, String>)>>,
}

impl RecordingInstaller {
    pub fn installs(&self) -> Vec<(String, String, BTreeMap<String, String>)> {
        self.installs.lock().unwrap().clone()
    }
}

#[async_trait]
impl PluginInstaller for RecordingInstaller {
    async fn install(
        &self,
        platform: &str,
        _project_root: &Path,
        plugin_id: &str,
        _plugins_dir: &Path,
        variables: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.installs.lock().unwrap().push((
            platform.to_string(),
            plugin_id.to_string(),
            variables.clone(),
        ));
        Ok(())
    }
}
