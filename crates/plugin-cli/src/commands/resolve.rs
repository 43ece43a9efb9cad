//! Resolve plugin targets into fetchable specifiers

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use plugin_resolve::{ProjectEnvironment, RegistryTargetResolver, TargetResolver};

use crate::cli::RegistryArgs;
use crate::config::{Settings, parse_variables};
use crate::error::Result;

/// Run the resolve command
pub async fn run_resolve(
    project_root: &Path,
    targets: &[String],
    args: &RegistryArgs,
    variables: &[String],
) -> Result<()> {
    let settings = Settings::load(project_root)?.with_overrides(args);
    let mut options = settings.resolve_options(parse_variables(variables)?);

    let registry = settings.load_registry(project_root)?;
    if registry.is_none() && options.registry_allowed() {
        tracing::debug!("No registry document configured, resolving without registry");
        options.noregistry = true;
    }
    let tool_version = if options.registry_allowed() {
        settings.require_tool_version()?.to_string()
    } else {
        settings.tool_version.clone().unwrap_or_default()
    };

    let resolver = RegistryTargetResolver::new(
        Arc::new(registry.unwrap_or_default()),
        Arc::new(ProjectEnvironment::new()),
        tool_version,
    );
    let config = settings.project_config();

    for target in targets {
        let resolved = resolver
            .resolve_target(project_root, &config, target, &options)
            .await?;
        println!("{} {} {}", target, "->".dimmed(), resolved.green());
    }

    Ok(())
}
