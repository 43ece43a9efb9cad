//! Shared test fixtures for the plugin manager workspace.
//!
//! This crate is a dev-dependency only and is never published.
//!
//! # Modules
//!
//! - [`project`]: [`TestProject`](project::TestProject) builder for on-disk
//!   project layouts (plugins, platform state, `package.json`)

pub mod project;
