//! [`TestProject`] builder for plugin manager test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use tempfile::TempDir;

/// A temporary project directory with helpers to lay out installed plugins,
/// platforms and the project manifest.
///
/// # Example
///
/// ```rust,no_run
/// use plugin_test_utils::project::TestProject;
///
/// let project = TestProject::new();
/// project.add_plugin("A", "1.0.0", &["B"]);
/// project.add_plugin("B", "1.0.0", &[]);
/// project.write_platform_state("android", &["A"], &["B"]);
/// project.assert_file_exists("plugins/A/package.json");
/// ```
pub struct TestProject {
    temp_dir: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// Create an empty temporary project.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the project root.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Return `<root>/plugins`.
    pub fn plugins_dir(&self) -> PathBuf {
        self.root().join("plugins")
    }

    /// Install a plugin directory whose manifest declares `dependencies`
    /// for every platform.
    pub fn add_plugin(&self, id: &str, version: &str, dependencies: &[&str]) -> PathBuf {
        self.add_plugin_manifest(
            id,
            json!({
                "name": id,
                "version": version,
                "cordova": { "id": id, "dependencies": dependencies },
            }),
        )
    }

    /// Install a plugin directory with an arbitrary `package.json`.
    pub fn add_plugin_manifest(&self, id: &str, manifest: Value) -> PathBuf {
        let dir = self.plugins_dir().join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("package.json"),
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .unwrap();
        dir
    }

    /// Write `<plugins>/<platform>.json` listing top-level and dependent
    /// plugins.
    pub fn write_platform_state(&self, platform: &str, installed: &[&str], dependent: &[&str]) {
        let to_map = |ids: &[&str]| -> Map<String, Value> {
            ids.iter()
                .map(|id| (id.to_string(), Value::Object(Map::new())))
                .collect()
        };
        let state = json!({
            "installed_plugins": to_map(installed),
            "dependent_plugins": to_map(dependent),
        });

        fs::create_dir_all(self.plugins_dir()).unwrap();
        fs::write(
            self.plugins_dir().join(format!("{platform}.json")),
            serde_json::to_string_pretty(&state).unwrap(),
        )
        .unwrap();
    }

    /// Record `platform` at `version` in `platforms/platforms.json`.
    pub fn install_platform(&self, platform: &str, version: &str) {
        let dir = self.root().join("platforms");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("platforms.json");

        let mut platforms: Map<String, Value> = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        platforms.insert(platform.to_string(), Value::String(version.to_string()));
        fs::write(&path, serde_json::to_string_pretty(&platforms).unwrap()).unwrap();
    }

    /// Write the project's `package.json`.
    pub fn write_package_json(&self, manifest: Value) {
        fs::write(
            self.root().join("package.json"),
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .unwrap();
    }

    /// Read a JSON file relative to the root.
    pub fn read_json(&self, path: &str) -> Value {
        let full_path = self.root().join(path);
        let content = fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()));
        serde_json::from_str(&content).unwrap()
    }

    /// Assert that `path` (relative to the project root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the project root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }
}
