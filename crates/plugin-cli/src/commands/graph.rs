//! Dependency queries over a platform's installed plugins

use std::path::Path;

use colored::Colorize;
use plugin_resolve::environment::PLUGINS_DIR;
use plugin_resolve::{DependencyAnalysis, DependencyInfo, PackagePluginInfoProvider, PlatformState};

use crate::error::Result;

fn load(project_root: &Path, platform: &str) -> Result<DependencyInfo> {
    let plugins_dir = project_root.join(PLUGINS_DIR);
    let state = PlatformState::load(&plugins_dir, platform)?;
    Ok(DependencyInfo::build(
        &state,
        &plugins_dir,
        &PackagePluginInfoProvider,
    )?)
}

fn print_ids(ids: &[String]) {
    if ids.is_empty() {
        println!("{}", "none".dimmed());
    }
    for id in ids {
        println!("{}", id);
    }
}

/// Run the dependents command
pub fn run_dependents(project_root: &Path, plugin: &str, platform: &str) -> Result<()> {
    let info = load(project_root, platform)?;
    print_ids(&info.dependents(plugin));
    Ok(())
}

/// Run the danglers command
pub fn run_danglers(project_root: &Path, plugin: &str, platform: &str) -> Result<()> {
    let info = load(project_root, platform)?;
    print_ids(&info.danglers(plugin));
    Ok(())
}
