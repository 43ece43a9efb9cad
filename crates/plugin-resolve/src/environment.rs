//! What a project currently has installed.
//!
//! Plugins are discovered by scanning `<project>/plugins/*` for plugin
//! manifests; platforms come from `<project>/platforms/platforms.json`,
//! which maps each platform name to its installed version.

use std::collections::BTreeMap;
use std::path::Path;

use crate::constraints::EnvironmentSnapshot;
use crate::error::{Error, Result};
use crate::plugin_info::{PackagePluginInfoProvider, PluginInfoProvider};

pub const PLUGINS_DIR: &str = "plugins";
pub const PLATFORMS_DIR: &str = "platforms";
pub const PLATFORMS_MANIFEST: &str = "platforms.json";

/// Reports installed plugins and platforms of a project.
pub trait EnvironmentSource: Send + Sync {
    /// Plugin id to installed version.
    fn installed_plugins(&self, project_root: &Path) -> Result<BTreeMap<String, String>>;

    /// Platform name to installed version.
    fn installed_platforms(&self, project_root: &Path) -> Result<BTreeMap<String, String>>;

    fn snapshot(&self, project_root: &Path, tool_version: &str) -> Result<EnvironmentSnapshot> {
        Ok(EnvironmentSnapshot {
            tool_version: tool_version.to_string(),
            installed_platforms: self.installed_platforms(project_root)?,
            installed_plugins: self.installed_plugins(project_root)?,
        })
    }
}

/// Reads the environment from the project's directory layout.
#[derive(Debug, Clone, Default)]
pub struct ProjectEnvironment<P = PackagePluginInfoProvider> {
    provider: P,
}

impl ProjectEnvironment {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: PluginInfoProvider> ProjectEnvironment<P> {
    pub fn with_provider(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: PluginInfoProvider> EnvironmentSource for ProjectEnvironment<P> {
    fn installed_plugins(&self, project_root: &Path) -> Result<BTreeMap<String, String>> {
        let plugins_dir = project_root.join(PLUGINS_DIR);
        let mut plugins = BTreeMap::new();
        if !plugins_dir.is_dir() {
            return Ok(plugins);
        }

        for entry in std::fs::read_dir(&plugins_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            match self.provider.get(&path) {
                Ok(info) => {
                    plugins.insert(info.id, info.version);
                }
                Err(e) => tracing::debug!(path = %path.display(), "Skipping plugin directory: {}", e),
            }
        }
        Ok(plugins)
    }

    fn installed_platforms(&self, project_root: &Path) -> Result<BTreeMap<String, String>> {
        let path = project_root.join(PLATFORMS_DIR).join(PLATFORMS_MANIFEST);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| Error::PlatformState {
            path,
            message: e.to_string(),
        })
    }
}
