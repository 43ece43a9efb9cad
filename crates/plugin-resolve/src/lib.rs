//! Plugin resolution core for the plugin manager.
//!
//! This crate decides which release of a plugin a project can use, turns
//! user-supplied targets into fetchable specifiers, drives the add pipeline,
//! and answers dependency questions (dependents and danglers) for a
//! platform's installed plugins.

pub mod add;
pub mod constraints;
pub mod environment;
pub mod error;
pub mod graph;
pub mod platform;
pub mod plugin_info;
pub mod project;
pub mod registry;
pub mod selector;
pub mod target;
pub mod version;

pub use add::{AddReport, AddRequest, AddedPlugin, PluginAdder, PluginFetcher, PluginInstaller};
pub use constraints::{
    ConstraintEvaluator, ConstraintTable, EngineConstraintEvaluator, EnvironmentSnapshot,
    FailedRequirement, RequirementSet,
};
pub use environment::{EnvironmentSource, ProjectEnvironment};
pub use error::{Error, Result};
pub use graph::{DependencyAnalysis, DependencyGraph, DependencyInfo};
pub use platform::PlatformState;
pub use plugin_info::{PackagePluginInfoProvider, PluginDependency, PluginInfo, PluginInfoProvider};
pub use project::{MemoryProjectConfig, PackageManifest, PluginRecord, ProjectConfig};
pub use registry::{Engines, LocalRegistry, PluginMetadata, RegistryClient};
pub use selector::{
    HighestCompatibleSelector, VersionSelector, find_version, get_fetch_version,
    list_unmet_requirements,
};
pub use target::{PluginSpec, RegistryTargetResolver, ResolveOptions, TargetResolver};
pub use version::VersionRange;
