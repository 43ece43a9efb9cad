//! Integration tests that invoke the compiled `plugman-resolve` binary.

use assert_cmd::Command;
use plugin_test_utils::project::TestProject;
use predicates::prelude::*;
use serde_json::json;

/// Get a Command for the plugman-resolve binary, rooted at `project`.
fn cmd(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("plugman-resolve").expect("Failed to find binary");
    cmd.env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .arg("--project")
        .arg(project.root());
    cmd
}

fn project_with_registry(tool_version: &str) -> TestProject {
    let project = TestProject::new();
    std::fs::write(
        project.root().join("registry.json"),
        serde_json::to_string(&json!({
            "cordova-plugin-device": {
                "versions": ["0.0.1", "1.0.0", "2.0.0"],
                "engines": { "cordovaDependencies": { "2.0.0": { "cordova": ">=7.0.0" } } }
            },
            "cordova-plugin-plain": { "versions": ["1.0.0"] }
        }))
        .unwrap(),
    )
    .unwrap();
    std::fs::write(
        project.root().join("plugman.toml"),
        format!("tool_version = \"{tool_version}\"\nregistry = \"registry.json\"\n"),
    )
    .unwrap();
    project
}

// ============================================================================
// resolve
// ============================================================================

#[test]
fn test_resolve_picks_compatible_release() {
    let project = project_with_registry("6.5.0");
    cmd(&project)
        .args(["resolve", "cordova-plugin-device"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cordova-plugin-device@1.0.0"));
}

#[test]
fn test_resolve_pinned_target_unchanged() {
    let project = project_with_registry("6.5.0");
    cmd(&project)
        .args(["resolve", "cordova-plugin-device@2.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-> cordova-plugin-device@2.0.0"));
}

#[test]
fn test_resolve_noregistry_flag() {
    let project = project_with_registry("6.5.0");
    cmd(&project)
        .args(["resolve", "cordova-plugin-device", "--noregistry"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-> cordova-plugin-device\n"));
}

#[test]
fn test_resolve_without_settings_skips_registry() {
    let project = TestProject::new();
    cmd(&project)
        .args(["resolve", "cordova-plugin-device"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-> cordova-plugin-device"));
}

#[test]
fn test_resolve_uses_recorded_spec() {
    let project = project_with_registry("6.5.0");
    std::fs::write(
        project.root().join("plugman.toml"),
        "tool_version = \"6.5.0\"\nregistry = \"registry.json\"\n\n[plugins.cordova-plugin-device]\nspec = \"~0.0.1\"\n",
    )
    .unwrap();
    cmd(&project)
        .args(["resolve", "cordova-plugin-device"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cordova-plugin-device@~0.0.1"));
}

#[test]
fn test_resolve_unknown_plugin_fails() {
    let project = project_with_registry("6.5.0");
    cmd(&project)
        .args(["resolve", "cordova-plugin-nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("cordova-plugin-nope"));
}

#[test]
fn test_resolve_rejects_malformed_variable() {
    let project = TestProject::new();
    cmd(&project)
        .args(["resolve", "p", "--variable", "oops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected NAME=value"));
}

// ============================================================================
// select / check
// ============================================================================

#[test]
fn test_select_json_output() {
    let project = project_with_registry("7.0.0");
    let output = cmd(&project)
        .args(["select", "cordova-plugin-device", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        value,
        json!({ "plugin": "cordova-plugin-device", "version": "2.0.0" })
    );
}

#[test]
fn test_select_without_constraints() {
    let project = project_with_registry("7.0.0");
    cmd(&project)
        .args(["select", "cordova-plugin-plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("latest will be fetched"));
}

#[test]
fn test_select_requires_registry() {
    let project = TestProject::new();
    cmd(&project)
        .args(["select", "cordova-plugin-device", "--tool-version", "7.0.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no registry configured"));
}

#[test]
fn test_check_reports_unmet_requirement() {
    let project = project_with_registry("6.5.0");
    cmd(&project)
        .args(["check", "cordova-plugin-device", "2.0.0"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "cordova (6.5.0 in project, >=7.0.0 required)",
        ))
        .stderr(predicate::str::contains("1 unmet requirement(s)"));
}

#[test]
fn test_check_passes_with_override() {
    let project = project_with_registry("6.5.0");
    cmd(&project)
        .args(["check", "cordova-plugin-device", "2.0.0", "--tool-version", "7.1.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("are met"));
}

// ============================================================================
// dependents / danglers
// ============================================================================

fn installed_project() -> TestProject {
    let project = TestProject::new();
    project.add_plugin("A", "1.0.0", &["B"]);
    project.add_plugin("B", "1.0.0", &["C"]);
    project.add_plugin("C", "1.0.0", &[]);
    project.add_plugin("D", "1.0.0", &["C"]);
    project.write_platform_state("android", &["A", "D"], &["B", "C"]);
    project
}

#[test]
fn test_dependents_lists_top_level_plugins() {
    let project = installed_project();
    cmd(&project)
        .args(["dependents", "C", "--platform", "android"])
        .assert()
        .success()
        .stdout("A\nD\n");
}

#[test]
fn test_danglers_excludes_shared_dependencies() {
    let project = installed_project();
    cmd(&project)
        .args(["danglers", "A", "--platform", "android"])
        .assert()
        .success()
        .stdout("B\n");
}

#[test]
fn test_danglers_none() {
    let project = installed_project();
    cmd(&project)
        .args(["danglers", "D", "--platform", "android"])
        .assert()
        .success()
        .stdout(predicate::str::contains("none"));
}
