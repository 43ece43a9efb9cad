//! Choosing which plugin release to fetch.
//!
//! The selector walks a plugin's stable releases from newest to oldest and
//! picks the first one whose engine requirements the project meets. Every
//! constraint-table range a release falls into contributes its requirement
//! set; all of them must pass.

use std::path::Path;

use semver::Version;

use crate::constraints::{
    ConstraintEvaluator, EngineConstraintEvaluator, EnvironmentSnapshot, FailedRequirement,
};
use crate::environment::EnvironmentSource;
use crate::error::Result;
use crate::registry::PluginMetadata;
use crate::version::{is_valid_range, parse_version, sort_descending};

/// Picks a release of a plugin compatible with the environment.
pub trait VersionSelector: Send + Sync {
    /// Return the release to pin, or `None` to let the fetch layer use the
    /// plugin's default release.
    fn select_version(
        &self,
        metadata: &PluginMetadata,
        environment: &EnvironmentSnapshot,
    ) -> Option<String>;
}

/// Selects the highest release whose applicable requirements all pass.
#[derive(Debug, Clone, Default)]
pub struct HighestCompatibleSelector<E = EngineConstraintEvaluator> {
    evaluator: E,
}

impl HighestCompatibleSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: ConstraintEvaluator> HighestCompatibleSelector<E> {
    /// Use a specific constraint evaluator.
    pub fn with_evaluator(evaluator: E) -> Self {
        Self { evaluator }
    }
}

impl<E: ConstraintEvaluator> VersionSelector for HighestCompatibleSelector<E> {
    fn select_version(
        &self,
        metadata: &PluginMetadata,
        environment: &EnvironmentSnapshot,
    ) -> Option<String> {
        let table = metadata.constraint_table()?;
        let name = metadata.name.as_str();

        let mut valid_keys = 0;
        for (key, _) in table.iter() {
            if is_valid_range(key) {
                valid_keys += 1;
            } else {
                tracing::debug!(
                    "Ignoring invalid version in {} cordovaDependencies: {} (must be a semver range)",
                    name,
                    key
                );
            }
        }
        if valid_keys == 0 {
            tracing::debug!(
                "Ignoring {} cordovaDependencies entry because it did not contain any valid plugin version entries",
                name
            );
            return None;
        }

        let mut candidates: Vec<(Version, &str)> = metadata
            .versions
            .iter()
            .filter_map(|v| match parse_version(v) {
                Ok(parsed) if parsed.pre.is_empty() => Some((parsed, v.as_str())),
                Ok(_) => None,
                Err(_) => {
                    tracing::debug!("Ignoring unparsable release {} of {}", v, name);
                    None
                }
            })
            .collect();
        sort_descending(&mut candidates);

        let (latest, latest_label) = candidates.first()?;
        let latest_failures = self
            .evaluator
            .evaluate(&table.requirements_for(latest), environment);

        for (index, (version, label)) in candidates.iter().enumerate() {
            let satisfied = if index == 0 {
                latest_failures.is_empty()
            } else {
                self.evaluator
                    .evaluate(&table.requirements_for(version), environment)
                    .is_empty()
            };
            if !satisfied {
                continue;
            }

            if index > 0 {
                list_unmet_requirements(name, &latest_failures);
                tracing::warn!(
                    "Fetching highest version of {} that this project supports: {} (latest is {})",
                    name,
                    label,
                    latest_label
                );
            }
            return find_version(&metadata.versions, label).map(str::to_string);
        }

        list_unmet_requirements(name, &latest_failures);
        tracing::warn!(
            "Current project does not satisfy the engine requirements specified by any version of {}. \
             Fetching latest version of plugin anyway (may be incompatible)",
            name
        );
        None
    }
}

/// Exact membership lookup of `version` in `versions`.
pub fn find_version<'a>(versions: &'a [String], version: &str) -> Option<&'a str> {
    versions
        .iter()
        .find(|v| v.as_str() == version)
        .map(String::as_str)
}

/// Format unmet requirements as user-facing warning lines and emit them.
pub fn list_unmet_requirements(name: &str, failed: &[FailedRequirement]) -> Vec<String> {
    let mut lines = Vec::with_capacity(failed.len() + 1);
    lines.push(format!(
        "Unmet project requirements for latest version of {name}:"
    ));
    lines.extend(failed.iter().map(|f| format!("    {f}")));

    for line in &lines {
        tracing::warn!("{}", line);
    }
    lines
}

/// Gather the project's environment and select a release for `metadata`.
///
/// Plugins without a constraint table short-circuit to `None` before the
/// project is inspected.
pub fn get_fetch_version(
    selector: &dyn VersionSelector,
    environment: &dyn EnvironmentSource,
    project_root: &Path,
    metadata: &PluginMetadata,
    tool_version: &str,
) -> Result<Option<String>> {
    if metadata.constraint_table().is_none() {
        return Ok(None);
    }
    let snapshot = environment.snapshot(project_root, tool_version)?;
    Ok(selector.select_version(metadata, &snapshot))
}
