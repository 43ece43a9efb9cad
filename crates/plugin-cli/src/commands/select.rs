//! Release selection and requirement checks against the registry

use std::path::Path;

use colored::Colorize;
use plugin_resolve::{
    ConstraintEvaluator, EngineConstraintEvaluator, EnvironmentSource, HighestCompatibleSelector,
    LocalRegistry, PluginMetadata, ProjectEnvironment, RegistryClient, ResolveOptions,
    get_fetch_version, version::parse_version,
};

use crate::cli::RegistryArgs;
use crate::config::{SETTINGS_FILE, Settings};
use crate::error::{CliError, Result};

async fn lookup(
    project_root: &Path,
    settings: &Settings,
    plugin: &str,
) -> Result<PluginMetadata> {
    let registry: LocalRegistry = settings.load_registry(project_root)?.ok_or_else(|| {
        CliError::user(format!(
            "no registry configured; set registry in {SETTINGS_FILE} or pass --registry"
        ))
    })?;
    let metadata = registry
        .lookup(&[plugin.to_string()], project_root, &ResolveOptions::default())
        .await?;
    Ok(metadata)
}

/// Run the select command
pub async fn run_select(
    project_root: &Path,
    plugin: &str,
    args: &RegistryArgs,
    json: bool,
) -> Result<()> {
    let settings = Settings::load(project_root)?.with_overrides(args);
    let tool_version = settings.require_tool_version()?;
    let metadata = lookup(project_root, &settings, plugin).await?;

    let version = get_fetch_version(
        &HighestCompatibleSelector::new(),
        &ProjectEnvironment::new(),
        project_root,
        &metadata,
        tool_version,
    )?;

    if json {
        let output = serde_json::json!({ "plugin": plugin, "version": version });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match version {
        Some(version) => println!("{}@{}", plugin, version.green()),
        None => println!(
            "{} {}",
            plugin,
            "(no compatible release pinned, latest will be fetched)".dimmed()
        ),
    }
    Ok(())
}

/// Run the check command
pub async fn run_check(
    project_root: &Path,
    plugin: &str,
    version: &str,
    args: &RegistryArgs,
) -> Result<()> {
    let settings = Settings::load(project_root)?.with_overrides(args);
    let tool_version = settings.require_tool_version()?;
    let metadata = lookup(project_root, &settings, plugin).await?;
    let release = parse_version(version)?;

    let Some(table) = metadata.constraint_table() else {
        println!("{} declares no engine requirements", plugin);
        return Ok(());
    };

    let snapshot = ProjectEnvironment::new().snapshot(project_root, tool_version)?;
    let failures =
        EngineConstraintEvaluator::new().evaluate(&table.requirements_for(&release), &snapshot);

    if failures.is_empty() {
        println!(
            "{} All engine requirements of {}@{} are met",
            "OK".green().bold(),
            plugin,
            version
        );
        return Ok(());
    }

    println!("Unmet project requirements for {}@{}:", plugin, version);
    for failure in &failures {
        println!("    {}", failure.to_string().yellow());
    }
    Err(CliError::user(format!(
        "{} unmet requirement(s) for {}@{}",
        failures.len(),
        plugin,
        version
    )))
}
