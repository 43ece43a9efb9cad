//! Project settings read from `plugman.toml`.
//!
//! ```toml
//! tool_version = "7.1.0"
//! registry = "registry.json"
//! noregistry = false
//!
//! [plugins.cordova-plugin-device]
//! spec = "^2.0.0"
//! variables = { API_KEY = "abc" }
//! ```
//!
//! Every key is optional; command-line flags override file values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use plugin_resolve::{LocalRegistry, MemoryProjectConfig, PluginRecord, ResolveOptions};
use serde::Deserialize;

use crate::cli::RegistryArgs;
use crate::error::{CliError, Result};

/// The canonical settings filename, at the project root.
pub const SETTINGS_FILE: &str = "plugman.toml";

/// A plugin recorded in the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PluginEntry {
    pub spec: Option<String>,
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tool_version: Option<String>,
    /// Registry document, relative to the project root.
    pub registry: Option<PathBuf>,
    pub searchpath: Option<String>,
    pub noregistry: bool,
    pub plugins: BTreeMap<String, PluginEntry>,
}

impl Settings {
    /// Load settings from `<project_root>/plugman.toml`, or defaults when
    /// the file is absent.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let settings: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, args: &RegistryArgs) -> Self {
        if let Some(version) = &args.tool_version {
            self.tool_version = Some(version.clone());
        }
        if let Some(registry) = &args.registry {
            self.registry = Some(registry.clone());
        }
        if let Some(searchpath) = &args.searchpath {
            self.searchpath = Some(searchpath.clone());
        }
        self.noregistry |= args.noregistry;
        self
    }

    pub fn resolve_options(&self, variables: BTreeMap<String, String>) -> ResolveOptions {
        ResolveOptions {
            searchpath: self.searchpath.clone(),
            noregistry: self.noregistry,
            variables: (!variables.is_empty()).then_some(variables),
        }
    }

    /// The tool version, required whenever requirements are evaluated.
    pub fn require_tool_version(&self) -> Result<&str> {
        self.tool_version.as_deref().ok_or_else(|| {
            CliError::user(format!(
                "no tool version configured; set tool_version in {SETTINGS_FILE} or pass --tool-version"
            ))
        })
    }

    /// Load the configured registry document, if any.
    pub fn load_registry(&self, project_root: &Path) -> Result<Option<LocalRegistry>> {
        self.registry
            .as_ref()
            .map(|path| LocalRegistry::load(&project_root.join(path)).map_err(CliError::from))
            .transpose()
    }

    /// Project configuration seeded from the `[plugins]` table.
    pub fn project_config(&self) -> MemoryProjectConfig {
        self.plugins
            .iter()
            .fold(MemoryProjectConfig::new(), |config, (id, entry)| {
                let mut record = PluginRecord::new(id);
                record.spec = entry.spec.clone();
                record.variables = entry.variables.clone();
                config.with_plugin(record)
            })
    }
}

/// Parse `NAME=value` pairs given with `--variable`.
pub fn parse_variables(raw: &[String]) -> Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.to_string()))
            }
            _ => Err(CliError::user(format!(
                "invalid variable '{pair}', expected NAME=value"
            ))),
        })
        .collect()
}
