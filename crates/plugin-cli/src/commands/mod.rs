//! Command implementations for plugin-cli

pub mod graph;
pub mod resolve;
pub mod select;

pub use graph::{run_danglers, run_dependents};
pub use resolve::run_resolve;
pub use select::{run_check, run_select};
