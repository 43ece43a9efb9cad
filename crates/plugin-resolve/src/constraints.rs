//! Engine constraint tables and their evaluation against a project.
//!
//! A plugin's `engines.cordovaDependencies` maps plugin-version ranges to
//! requirement sets:
//!
//! ```json
//! {
//!   "<2.0.0": { "cordova": "<7.0.0" },
//!   "2.0.0":  { "cordova": ">=7.0.0", "cordova-android": ">=6.0.0" }
//! }
//! ```
//!
//! Requirement names are either the literal `cordova` (the tool version), a
//! `cordova-<platform>` name, or another plugin id.

use std::collections::BTreeMap;

use semver::Version;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::version::{VersionRange, next_patch, parse_version};

/// Requirement name that refers to the hosting tool itself.
pub const TOOL_DEPENDENCY: &str = "cordova";

/// Prefix that turns a requirement name into a platform requirement.
pub const PLATFORM_PREFIX: &str = "cordova-";

/// Ordered `dependency name -> required range` pairs.
///
/// Names may repeat once sets are merged; every entry is an independent
/// constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSet {
    entries: Vec<(String, String)>,
}

impl RequirementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a requirement, keeping any existing one with the same name.
    pub fn push(&mut self, dependency: impl Into<String>, range: impl Into<String>) {
        self.entries.push((dependency.into(), range.into()));
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, dependency: impl Into<String>, range: impl Into<String>) -> Self {
        self.push(dependency, range);
        self
    }

    /// Append every entry of `other`.
    pub fn extend(&mut self, other: &RequirementSet) {
        self.entries.extend(other.entries.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(d, r)| (d.as_str(), r.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequirementSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (dependency, range) in iter {
            set.push(dependency, range);
        }
        set
    }
}

/// Per-plugin-version-range requirement sets, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintTable {
    entries: Vec<(String, RequirementSet)>,
}

impl ConstraintTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the requirement set for plugin releases matching `range`.
    pub fn insert(&mut self, range: impl Into<String>, requirements: RequirementSet) {
        let range = range.into();
        match self.entries.iter_mut().find(|(r, _)| *r == range) {
            Some((_, existing)) => *existing = requirements,
            None => self.entries.push((range, requirements)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, range: impl Into<String>, requirements: RequirementSet) -> Self {
        self.insert(range, requirements);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RequirementSet)> {
        self.entries.iter().map(|(r, reqs)| (r.as_str(), reqs))
    }

    /// Union of the requirement sets whose range contains `version`.
    ///
    /// Keys that are not valid ranges never match.
    pub fn requirements_for(&self, version: &Version) -> RequirementSet {
        let mut merged = RequirementSet::new();
        for (range, requirements) in &self.entries {
            if VersionRange::parse(range).is_ok_and(|r| r.satisfies(version)) {
                merged.extend(requirements);
            }
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Installed facts a constraint table is checked against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    /// Version of the hosting tool (the `cordova` requirement).
    pub tool_version: String,
    /// Installed platform name -> platform version.
    pub installed_platforms: BTreeMap<String, String>,
    /// Installed plugin id -> plugin version.
    pub installed_plugins: BTreeMap<String, String>,
}

impl EnvironmentSnapshot {
    pub fn new(tool_version: impl Into<String>) -> Self {
        Self {
            tool_version: tool_version.into(),
            ..Self::default()
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>, version: impl Into<String>) -> Self {
        self.installed_platforms
            .insert(platform.into(), version.into());
        self
    }

    pub fn with_plugin(mut self, id: impl Into<String>, version: impl Into<String>) -> Self {
        self.installed_plugins.insert(id.into(), version.into());
        self
    }
}

/// One requirement the current project does not meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRequirement {
    pub dependency: String,
    pub installed: String,
    pub required: String,
}

impl std::fmt::Display for FailedRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} in project, {} required)",
            self.dependency, self.installed, self.required
        )
    }
}

/// Reports which requirements of a set fail in an environment.
pub trait ConstraintEvaluator: Send + Sync {
    /// Return every failing requirement, in requirement-set order.
    ///
    /// An empty result means the set is fully satisfied.
    fn evaluate(
        &self,
        requirements: &RequirementSet,
        environment: &EnvironmentSnapshot,
    ) -> Vec<FailedRequirement>;
}

/// The canonical evaluator for engine requirement sets.
///
/// Requirements on platforms or plugins that are not installed are
/// vacuously satisfied. Entries whose name or range does not parse are
/// skipped with a diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConstraintEvaluator;

impl EngineConstraintEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl ConstraintEvaluator for EngineConstraintEvaluator {
    fn evaluate(
        &self,
        requirements: &RequirementSet,
        environment: &EnvironmentSnapshot,
    ) -> Vec<FailedRequirement> {
        // Development builds are judged, and reported, as the release they
        // lead up to.
        let (effective_tool_version, reported_tool_version) =
            match parse_version(&environment.tool_version) {
                Ok(v) if !v.pre.is_empty() => {
                    let bumped = next_patch(&v);
                    let reported = bumped.to_string();
                    (Some(bumped), reported)
                }
                Ok(v) => (Some(v), environment.tool_version.clone()),
                Err(_) => (None, environment.tool_version.clone()),
            };

        let mut failed = Vec::new();

        for (raw_name, raw_range) in requirements.iter() {
            let name = raw_name.trim();
            let range = match VersionRange::parse(raw_range) {
                Ok(range) if is_valid_dependency_name(name) => range,
                _ => {
                    tracing::debug!(
                        "Ignoring invalid plugin dependency constraint {}:{}",
                        raw_name,
                        raw_range
                    );
                    continue;
                }
            };

            let installed = if let Some(version) = environment.installed_plugins.get(name) {
                (!range.satisfies_str(version)).then(|| version.clone())
            } else if name == TOOL_DEPENDENCY {
                let satisfied = effective_tool_version
                    .as_ref()
                    .is_some_and(|v| range.satisfies(v));
                (!satisfied).then(|| reported_tool_version.clone())
            } else if let Some(platform) = name.strip_prefix(PLATFORM_PREFIX) {
                environment
                    .installed_platforms
                    .get(platform)
                    .filter(|version| !range.satisfies_str(version))
                    .cloned()
            } else {
                None
            };

            if let Some(installed) = installed {
                failed.push(FailedRequirement {
                    dependency: name.to_string(),
                    installed: installed.trim().to_string(),
                    required: raw_range.trim().to_string(),
                });
            }
        }

        failed
    }
}

fn is_valid_dependency_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(char::is_whitespace)
}

impl Serialize for RequirementSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (dependency, range) in &self.entries {
            map.serialize_entry(dependency, range)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RequirementSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries: Vec<(String, serde_json::Value)> =
            deserializer.deserialize_map(OrderedEntries::default())?;
        Ok(entries
            .into_iter()
            .map(|(dependency, value)| {
                // Non-string ranges are kept as text so evaluation can skip them.
                let range = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (dependency, range)
            })
            .collect())
    }
}

impl Serialize for ConstraintTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (range, requirements) in &self.entries {
            map.serialize_entry(range, requirements)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConstraintTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries: Vec<(String, RequirementSet)> =
            deserializer.deserialize_map(OrderedEntries::default())?;
        Ok(Self { entries })
    }
}

/// Collects map entries in the order the deserializer yields them.
struct OrderedEntries<V>(std::marker::PhantomData<V>);

impl<V> Default for OrderedEntries<V> {
    fn default() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedEntries<V> {
    type Value = Vec<(String, V)>;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a map of version ranges")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            entries.push((key, value));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_requirements_for_unions_matching_ranges() {
        let table = ConstraintTable::new()
            .with(">=1.0.0", RequirementSet::new().with("cordova", ">=5.0.0"))
            .with("not a range", RequirementSet::new().with("cordova", ">=99.0.0"))
            .with("<2.0.0", RequirementSet::new().with("cordova-android", ">=4.0.0"));

        let reqs = table.requirements_for(&Version::new(1, 5, 0));
        assert_eq!(
            reqs.iter().collect::<Vec<_>>(),
            vec![("cordova", ">=5.0.0"), ("cordova-android", ">=4.0.0")]
        );
        assert_eq!(table.requirements_for(&Version::new(0, 1, 0)).len(), 0);
    }

    fn evaluate(reqs: RequirementSet, env: EnvironmentSnapshot) -> Vec<FailedRequirement> {
        EngineConstraintEvaluator::new().evaluate(&reqs, &env)
    }

    fn failure(dependency: &str, installed: &str, required: &str) -> FailedRequirement {
        FailedRequirement {
            dependency: dependency.to_string(),
            installed: installed.to_string(),
            required: required.to_string(),
        }
    }

    #[test]
    fn test_satisfied_tool_requirement() {
        let reqs = RequirementSet::new().with("cordova", ">=7.0.0");
        assert!(evaluate(reqs, EnvironmentSnapshot::new("7.0.0")).is_empty());
    }

    #[test]
    fn test_failed_tool_requirement() {
        let reqs = RequirementSet::new().with("cordova", ">=7.0.0");
        assert_eq!(
            evaluate(reqs, EnvironmentSnapshot::new("6.5.0")),
            vec![failure("cordova", "6.5.0", ">=7.0.0")]
        );
    }

    #[test]
    fn test_prerelease_tool_counts_as_next_patch() {
        let reqs = RequirementSet::new().with("cordova", ">=7.0.1");
        assert!(evaluate(reqs, EnvironmentSnapshot::new("7.0.0-dev")).is_empty());
    }

    #[test]
    fn test_prerelease_tool_reports_next_patch() {
        let reqs = RequirementSet::new().with("cordova", ">=8.0.0");
        assert_eq!(
            evaluate(reqs, EnvironmentSnapshot::new("7.0.0-nightly.1")),
            vec![failure("cordova", "7.0.1", ">=8.0.0")]
        );
    }

    #[test]
    fn test_failed_platform_requirement() {
        let reqs = RequirementSet::new().with("cordova-android", ">=6.0.0");
        let env = EnvironmentSnapshot::new("7.0.0").with_platform("android", "5.5.0");
        assert_eq!(
            evaluate(reqs, env),
            vec![failure("cordova-android", "5.5.0", ">=6.0.0")]
        );
    }

    #[test]
    fn test_missing_platform_is_vacuously_satisfied() {
        let reqs = RequirementSet::new().with("cordova-ios", ">=99.0.0");
        let env = EnvironmentSnapshot::new("7.0.0").with_platform("android", "5.5.0");
        assert!(evaluate(reqs, env).is_empty());
    }

    #[test]
    fn test_failed_plugin_requirement() {
        let reqs = RequirementSet::new().with("cordova-plugin-camera", ">1.0.0");
        let env = EnvironmentSnapshot::new("7.0.0").with_plugin("cordova-plugin-camera", "1.0.0");
        assert_eq!(
            evaluate(reqs, env),
            vec![failure("cordova-plugin-camera", "1.0.0", ">1.0.0")]
        );
    }

    #[test]
    fn test_missing_plugin_is_vacuously_satisfied() {
        let reqs = RequirementSet::new().with("cordova-plugin-file", "^4.0.0");
        assert!(evaluate(reqs, EnvironmentSnapshot::new("7.0.0")).is_empty());
    }

    #[test]
    fn test_invalid_range_is_skipped() {
        let reqs = RequirementSet::new()
            .with("1", "wrong")
            .with(" ", ">=1.0.0")
            .with("cordova", ">=8.0.0");
        assert_eq!(
            evaluate(reqs, EnvironmentSnapshot::new("7.0.0")),
            vec![failure("cordova", "7.0.0", ">=8.0.0")]
        );
    }

    #[test]
    fn test_reports_every_failure_in_order() {
        let reqs = RequirementSet::new()
            .with("cordova-android", ">=7.0.0")
            .with("cordova", ">=8.0.0")
            .with("cordova-plugin-device", "^2.0.0");
        let env = EnvironmentSnapshot::new("7.1.0")
            .with_platform("android", "6.3.0")
            .with_plugin("cordova-plugin-device", "1.1.7");
        let failed = evaluate(reqs, env);
        let names: Vec<&str> = failed.iter().map(|f| f.dependency.as_str()).collect();
        assert_eq!(
            names,
            vec!["cordova-android", "cordova", "cordova-plugin-device"]
        );
    }

    #[test]
    fn test_duplicate_names_are_independent_constraints() {
        let reqs = RequirementSet::new()
            .with("cordova", ">=6.0.0")
            .with("cordova", "<7.0.0");
        assert_eq!(
            evaluate(reqs, EnvironmentSnapshot::new("7.0.0")),
            vec![failure("cordova", "7.0.0", "<7.0.0")]
        );
    }

    #[test]
    fn test_unparsable_installed_version_fails() {
        let reqs = RequirementSet::new().with("cordova-android", ">=6.0.0");
        let env = EnvironmentSnapshot::new("7.0.0").with_platform("android", "git-master");
        assert_eq!(evaluate(reqs, env).len(), 1);
    }

    #[test]
    fn test_deserialize_preserves_order() {
        let table: ConstraintTable = serde_json::from_str(
            r#"{ "<3.0.0": { "cordova": ">=7.0.0" }, "1.0.0": { "cordova": "<7.0.0", "x": 1 } }"#,
        )
        .unwrap();
        let ranges: Vec<&str> = table.iter().map(|(r, _)| r).collect();
        assert_eq!(ranges, vec!["<3.0.0", "1.0.0"]);

        let (_, second) = table.iter().nth(1).unwrap();
        let reqs: Vec<(&str, &str)> = second.iter().collect();
        assert_eq!(reqs, vec![("cordova", "<7.0.0"), ("x", "1")]);
    }

    #[test]
    fn test_failed_requirement_display() {
        let f = failure("cordova", "6.5.0", ">=7.0.0");
        assert_eq!(f.to_string(), "cordova (6.5.0 in project, >=7.0.0 required)");
    }
}
