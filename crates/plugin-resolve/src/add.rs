//! Adding plugins to a project.
//!
//! Each requested target is resolved, fetched into the project's plugins
//! directory, checked for mandatory install variables, installed into every
//! installed platform and optionally recorded in the project configuration
//! and `package.json`.
//!
//! Plugins are processed one at a time. A failure while resolving, fetching
//! or installing one plugin is reported and processing moves on; missing
//! mandatory variables abort the whole request.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::environment::{EnvironmentSource, PLUGINS_DIR};
use crate::error::{Error, Result};
use crate::plugin_info::{PluginInfo, PluginInfoProvider};
use crate::project::{PackageManifest, PluginRecord, ProjectConfig};
use crate::target::{PluginSpec, ResolveOptions, TargetResolver, parse_source};

/// A request to add one or more plugins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddRequest {
    pub plugins: Vec<String>,
    pub cli_variables: BTreeMap<String, String>,
    /// Record added plugins in the project configuration.
    pub save: bool,
    pub searchpath: Option<String>,
    pub noregistry: bool,
}

impl AddRequest {
    pub fn new<I, S>(plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            plugins: plugins.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cli_variables.insert(name.into(), value.into());
        self
    }

    pub fn with_save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }

    fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            searchpath: self.searchpath.clone(),
            noregistry: self.noregistry,
            variables: (!self.cli_variables.is_empty()).then(|| self.cli_variables.clone()),
        }
    }
}

/// Downloads a resolved plugin target.
#[async_trait]
pub trait PluginFetcher: Send + Sync {
    /// Fetch `target` into `plugins_dir`, returning the plugin directory.
    async fn fetch(
        &self,
        target: &str,
        plugins_dir: &Path,
        options: &ResolveOptions,
    ) -> Result<PathBuf>;
}

/// Installs a fetched plugin into a platform.
#[async_trait]
pub trait PluginInstaller: Send + Sync {
    async fn install(
        &self,
        platform: &str,
        project_root: &Path,
        plugin_id: &str,
        plugins_dir: &Path,
        variables: &BTreeMap<String, String>,
    ) -> Result<()>;
}

/// A plugin that was fetched and installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedPlugin {
    pub id: String,
    pub version: String,
    /// The specifier the plugin was fetched with.
    pub target: String,
    pub platforms: Vec<String>,
}

/// Outcome of an add request.
#[derive(Debug, Default)]
pub struct AddReport {
    pub added: Vec<AddedPlugin>,
    /// Targets that could not be added, with the reason.
    pub failed: Vec<(String, Error)>,
}

impl AddReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs add requests against a project.
pub struct PluginAdder {
    resolver: Arc<dyn TargetResolver>,
    fetcher: Arc<dyn PluginFetcher>,
    installer: Arc<dyn PluginInstaller>,
    info_provider: Arc<dyn PluginInfoProvider>,
    environment: Arc<dyn EnvironmentSource>,
}

impl PluginAdder {
    pub fn new(
        resolver: Arc<dyn TargetResolver>,
        fetcher: Arc<dyn PluginFetcher>,
        installer: Arc<dyn PluginInstaller>,
        info_provider: Arc<dyn PluginInfoProvider>,
        environment: Arc<dyn EnvironmentSource>,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            installer,
            info_provider,
            environment,
        }
    }

    /// Add every plugin of `request`, in order.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyRequest`] when no plugin is named and
    /// [`Error::MissingMandatoryVariables`] when a fetched plugin needs a
    /// variable nobody supplied. Other failures end up in the report.
    pub async fn add_plugins(
        &self,
        project_root: &Path,
        config: &mut dyn ProjectConfig,
        request: &AddRequest,
    ) -> Result<AddReport> {
        if request.plugins.is_empty() {
            return Err(Error::EmptyRequest);
        }

        let options = request.resolve_options();
        let mut report = AddReport::default();

        for raw in &request.plugins {
            let target = raw.trim_end_matches(['/', '\\']);
            match self
                .add_plugin(project_root, config, target, request, &options)
                .await
            {
                Ok(added) => report.added.push(added),
                Err(e @ Error::MissingMandatoryVariables { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!("Failed to add plugin \"{}\": {}", target, e);
                    report.failed.push((target.to_string(), e));
                }
            }
        }

        Ok(report)
    }

    async fn add_plugin(
        &self,
        project_root: &Path,
        config: &mut dyn ProjectConfig,
        target: &str,
        request: &AddRequest,
        options: &ResolveOptions,
    ) -> Result<AddedPlugin> {
        let plugins_dir = project_root.join(PLUGINS_DIR);

        let resolved = self
            .resolver
            .resolve_target(project_root, &*config, target, options)
            .await?;

        tracing::debug!("Calling fetch on plugin \"{}\"", resolved);
        let plugin_dir = self.fetcher.fetch(&resolved, &plugins_dir, options).await?;
        let info = self.info_provider.get(&plugin_dir)?;

        let variables = merge_variables(&request.cli_variables, config, &info);
        check_mandatory_variables(&info, &variables, &plugin_dir).await?;

        let platforms: Vec<String> = self
            .environment
            .installed_platforms(project_root)?
            .into_keys()
            .collect();
        for platform in &platforms {
            tracing::debug!("Installing \"{}\" for {}", info.id, platform);
            self.installer
                .install(platform, project_root, &info.id, &plugins_dir, &variables)
                .await?;
        }

        if request.save {
            save_plugin(project_root, config, &info, &resolved, &variables)?;
        }

        Ok(AddedPlugin {
            id: info.id,
            version: info.version,
            target: resolved,
            platforms,
        })
    }
}

/// Variables recorded in the configuration apply only when the command line
/// supplied none.
fn merge_variables(
    cli_variables: &BTreeMap<String, String>,
    config: &dyn ProjectConfig,
    info: &PluginInfo,
) -> BTreeMap<String, String> {
    if !cli_variables.is_empty() {
        return cli_variables.clone();
    }
    config
        .get_plugin(&info.id)
        .map(|record| record.variables)
        .unwrap_or_default()
}

async fn check_mandatory_variables(
    info: &PluginInfo,
    variables: &BTreeMap<String, String>,
    plugin_dir: &Path,
) -> Result<()> {
    let missing: Vec<String> = info
        .mandatory_preferences()
        .filter(|name| variables.get(*name).is_none_or(String::is_empty))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    tracing::debug!(
        "Removing {} because mandatory plugin variables were missing.",
        plugin_dir.display()
    );
    if let Err(e) = tokio::fs::remove_dir_all(plugin_dir).await {
        tracing::warn!("Could not remove {}: {}", plugin_dir.display(), e);
    }

    Err(Error::MissingMandatoryVariables {
        plugin: info.id.clone(),
        variables: missing,
    })
}

fn save_plugin(
    project_root: &Path,
    config: &mut dyn ProjectConfig,
    info: &PluginInfo,
    resolved: &str,
    variables: &BTreeMap<String, String>,
) -> Result<()> {
    let spec = match parse_source(resolved, project_root) {
        Some(source) => source,
        None => PluginSpec::parse(resolved)?
            .version
            .unwrap_or_else(|| format!("^{}", info.version)),
    };

    config.remove_plugin(&info.id);
    config.add_plugin(PluginRecord::new(&info.id).with_spec(spec), variables);
    config.write()?;

    if let Some(mut manifest) = PackageManifest::load(project_root)? {
        manifest.set_plugin_variables(&info.id, variables)?;
        manifest.save()?;
    }

    tracing::info!("Saved plugin info for \"{}\" to the project configuration", info.id);
    Ok(())
}
