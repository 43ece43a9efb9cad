//! Per-platform plugin install state.
//!
//! Each platform records what it has installed in `<plugins_dir>/<platform>.json`:
//! plugins the user asked for live under `installed_plugins`, plugins pulled
//! in as dependencies under `dependent_plugins`. Both maps keep file order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Install state of one platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformState {
    #[serde(skip)]
    pub platform: String,
    #[serde(default)]
    pub installed_plugins: Map<String, Value>,
    #[serde(default)]
    pub dependent_plugins: Map<String, Value>,
}

impl PlatformState {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            ..Self::default()
        }
    }

    /// Location of the state file for `platform`.
    pub fn path_for(plugins_dir: &Path, platform: &str) -> PathBuf {
        plugins_dir.join(format!("{platform}.json"))
    }

    /// Load the state file; a platform without one has installed nothing.
    pub fn load(plugins_dir: &Path, platform: &str) -> Result<Self> {
        let path = Self::path_for(plugins_dir, platform);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No platform state file, assuming empty");
            return Ok(Self::new(platform));
        }

        let content = std::fs::read_to_string(&path)?;
        let mut state: Self =
            serde_json::from_str(&content).map_err(|e| Error::PlatformState {
                path: path.clone(),
                message: e.to_string(),
            })?;
        state.platform = platform.to_string();
        Ok(state)
    }

    pub fn with_installed(mut self, id: impl Into<String>) -> Self {
        self.installed_plugins
            .insert(id.into(), Value::Object(Map::new()));
        self
    }

    pub fn with_dependent(mut self, id: impl Into<String>) -> Self {
        self.dependent_plugins
            .insert(id.into(), Value::Object(Map::new()));
        self
    }

    /// Ids of top-level plugins, in file order.
    pub fn installed_ids(&self) -> impl Iterator<Item = &str> {
        self.installed_plugins.keys().map(String::as_str)
    }

    /// Ids of dependency-only plugins, in file order.
    pub fn dependent_ids(&self) -> impl Iterator<Item = &str> {
        self.dependent_plugins.keys().map(String::as_str)
    }

    pub fn is_top_level(&self, id: &str) -> bool {
        self.installed_plugins.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_load_keeps_file_order() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("android.json"),
            r#"{
                "prepare_queue": { "installed": [], "uninstalled": [] },
                "installed_plugins": { "Z": {}, "A": { "API_KEY": "x" } },
                "dependent_plugins": { "M": {} }
            }"#,
        )
        .unwrap();

        let state = PlatformState::load(temp.path(), "android").unwrap();
        assert_eq!(state.platform, "android");
        assert_eq!(state.installed_ids().collect::<Vec<_>>(), vec!["Z", "A"]);
        assert_eq!(state.dependent_ids().collect::<Vec<_>>(), vec!["M"]);
        assert!(state.is_top_level("A"));
        assert!(!state.is_top_level("M"));
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let temp = TempDir::new().unwrap();
        let state = PlatformState::load(temp.path(), "ios").unwrap();
        assert_eq!(state.installed_ids().count(), 0);
        assert_eq!(state.dependent_ids().count(), 0);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("ios.json"), "{ nope").unwrap();
        let err = PlatformState::load(temp.path(), "ios").unwrap_err();
        assert!(matches!(err, Error::PlatformState { .. }));
    }
}
