//! Turning a user-supplied plugin target into a fetchable specifier.
//!
//! Resolution tries, in order:
//!
//! 1. the target as given, if it pins a version, is a URL or is a local
//!    directory;
//! 2. the project's `package.json` `dependencies` entry;
//! 3. the version spec recorded in the project configuration;
//! 4. the highest release compatible with the project, from the registry;
//! 5. the bare id.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::environment::EnvironmentSource;
use crate::error::{Error, Result};
use crate::project::{PackageManifest, ProjectConfig};
use crate::registry::RegistryClient;
use crate::selector::{HighestCompatibleSelector, VersionSelector, get_fetch_version};

/// `[@scope/]name[@version]`
static SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(@[^/@\s]+)/)?([^@/\s]+)(?:@(.*))?$").expect("valid regex")
});

/// A `scheme:` prefix of two or more characters (`https://`, `file:../x`,
/// `github:user/repo`) or scp-style `git@host:path`. One-letter schemes are
/// drive letters.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.\-]+:|[\w.\-]+@[\w.\-]+:)").expect("valid regex")
});

/// Options that shape where a plugin may be resolved from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Local directories searched before the registry.
    pub searchpath: Option<String>,
    /// Never consult the registry.
    pub noregistry: bool,
    /// Install variables supplied on the command line.
    pub variables: Option<BTreeMap<String, String>>,
}

impl ResolveOptions {
    /// Whether the registry may be consulted.
    pub fn registry_allowed(&self) -> bool {
        !self.noregistry && self.searchpath.as_deref().is_none_or(str::is_empty)
    }
}

/// A plugin target split into package and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSpec {
    /// `@scope` part, if the package is scoped.
    pub scope: Option<String>,
    /// Full package name, scope included.
    pub package: String,
    /// Version part after `@`, if any.
    pub version: Option<String>,
}

impl PluginSpec {
    /// Split `raw` into package and version.
    ///
    /// Targets that do not look like a package name (paths, URLs) become a
    /// spec whose package is the whole target and that has no version.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::InvalidSpecifier(raw.to_string()));
        }

        let Some(caps) = SPEC_RE.captures(raw) else {
            return Ok(Self {
                scope: None,
                package: raw.to_string(),
                version: None,
            });
        };

        let scope = caps.get(1).map(|m| m.as_str().to_string());
        let name = &caps[2];
        let package = match &scope {
            Some(scope) => format!("{scope}/{name}"),
            None => name.to_string(),
        };
        let version = caps
            .get(3)
            .map(|m| m.as_str().trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(Self {
            scope,
            package,
            version,
        })
    }
}

/// Whether `target` names a remote source.
pub fn is_url(target: &str) -> bool {
    URL_RE.is_match(target)
}

/// `Some(target)` if it is a URL or a path that exists relative to `base`.
pub fn parse_source(target: &str, base: &Path) -> Option<String> {
    if is_url(target) || base.join(target).exists() {
        Some(target.to_string())
    } else {
        None
    }
}

/// The spec recorded for `id` in the project configuration.
pub fn get_version_from_config_file(id: &str, config: &dyn ProjectConfig) -> Option<String> {
    config
        .get_plugin(id)
        .and_then(|record| record.spec)
        .filter(|spec| !spec.trim().is_empty())
}

/// Resolves a raw plugin target.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn resolve_target(
        &self,
        project_root: &Path,
        config: &dyn ProjectConfig,
        raw_target: &str,
        options: &ResolveOptions,
    ) -> Result<String>;
}

/// Resolver backed by a registry, a version selector and the project's
/// installed environment.
pub struct RegistryTargetResolver {
    registry: Arc<dyn RegistryClient>,
    selector: Arc<dyn VersionSelector>,
    environment: Arc<dyn EnvironmentSource>,
    tool_version: String,
}

impl RegistryTargetResolver {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        environment: Arc<dyn EnvironmentSource>,
        tool_version: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            selector: Arc::new(HighestCompatibleSelector::new()),
            environment,
            tool_version: tool_version.into(),
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn VersionSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn tool_version(&self) -> &str {
        &self.tool_version
    }

    fn pinned_or_source(&self, spec: &str, id: &str, project_root: &Path) -> String {
        parse_source(spec, project_root).unwrap_or_else(|| format!("{id}@{spec}"))
    }
}

#[async_trait]
impl TargetResolver for RegistryTargetResolver {
    async fn resolve_target(
        &self,
        project_root: &Path,
        config: &dyn ProjectConfig,
        raw_target: &str,
        options: &ResolveOptions,
    ) -> Result<String> {
        if is_url(raw_target) {
            return Ok(raw_target.to_string());
        }
        let spec = PluginSpec::parse(raw_target)?;
        if spec.version.is_some() || project_root.join(raw_target).is_dir() {
            return Ok(raw_target.to_string());
        }
        let id = spec.package;

        if let Some(manifest) = PackageManifest::load(project_root)? {
            if let Some(pinned) = manifest.dependency(&id) {
                return Ok(self.pinned_or_source(pinned, &id, project_root));
            }
        }

        if let Some(recorded) = get_version_from_config_file(&id, config) {
            return Ok(self.pinned_or_source(&recorded, &id, project_root));
        }

        if !options.registry_allowed() {
            tracing::debug!(
                "Not checking npm info for {} because searchpath or noregistry flag was given",
                id
            );
            return Ok(id);
        }

        tracing::debug!(
            "Attempting to use npm info for {} to choose a compatible release",
            id
        );
        let metadata = self
            .registry
            .lookup(std::slice::from_ref(&id), project_root, options)
            .await?;

        let version = get_fetch_version(
            self.selector.as_ref(),
            self.environment.as_ref(),
            project_root,
            &metadata,
            &self.tool_version,
        )?;

        Ok(match version {
            Some(version) => format!("{id}@{version}"),
            None => id,
        })
    }
}
