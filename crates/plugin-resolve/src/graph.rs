//! Plugin dependency graph of one platform and the queries built on it.
//!
//! Removing a plugin should also remove the plugins it pulled in, unless
//! some other top-level plugin still needs them. This module answers the two
//! questions that decision needs: which top-level plugins depend on a plugin
//! ([`DependencyAnalysis::dependents`]), and which of its transitive
//! dependencies nothing else uses ([`DependencyAnalysis::danglers`]).
//!
//! # Example
//!
//! ```
//! use plugin_resolve::graph::{DependencyAnalysis, DependencyGraph, DependencyInfo};
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_edge("A", "B");
//! graph.add_edge("B", "C");
//! graph.add_edge("D", "C");
//!
//! let info = DependencyInfo::new(graph, vec!["A".into(), "D".into()]);
//! assert_eq!(info.dependents("C"), vec!["A", "D"]);
//! assert_eq!(info.danglers("A"), vec!["B"]);
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use crate::error::Result;
use crate::platform::PlatformState;
use crate::plugin_info::PluginInfoProvider;

/// Directed graph of plugin dependencies.
///
/// Edges point from dependent to dependency. Cycles are allowed.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Adjacency list in declaration order: key depends on each value.
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Create an empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node without edges. Existing edges are kept.
    pub fn add_node(&mut self, id: &str) {
        self.edges.entry(id.to_string()).or_default();
    }

    /// Declare that `from` depends on `to`. Duplicate edges are ignored.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.add_node(to);
        let deps = self.edges.entry(from.to_string()).or_default();
        if !deps.iter().any(|d| d == to) {
            deps.push(to.to_string());
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Return the number of nodes.
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Return the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Get the direct dependencies of a node.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .get(id)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Transitive dependencies of `id`, deepest first, `id` itself excluded.
    pub fn chain(&self, id: &str) -> Vec<String> {
        let mut visited = HashSet::from([id.to_string()]);
        let mut chain = Vec::new();
        // (node, index of its next dependency to visit)
        let mut stack = vec![(id, 0usize)];

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            match self.edges.get(node).and_then(|deps| deps.get(next)) {
                Some(dep) => {
                    frame.1 += 1;
                    if visited.insert(dep.clone()) {
                        stack.push((dep.as_str(), 0));
                    }
                }
                None => {
                    stack.pop();
                    if !stack.is_empty() {
                        chain.push(node.to_string());
                    }
                }
            }
        }

        chain
    }
}

/// Dependency questions asked before removing a plugin.
pub trait DependencyAnalysis {
    /// Top-level plugins other than `id` whose transitive dependencies
    /// include `id`.
    fn dependents(&self, id: &str) -> Vec<String>;

    /// Transitive dependencies of `id` not reachable from any other
    /// top-level plugin.
    fn danglers(&self, id: &str) -> Vec<String>;
}

/// A platform's dependency graph plus its top-level plugins.
#[derive(Debug, Clone)]
pub struct DependencyInfo {
    graph: DependencyGraph,
    top_level_plugins: Vec<String>,
    chains: RefCell<HashMap<String, Rc<[String]>>>,
}

impl DependencyInfo {
    pub fn new(graph: DependencyGraph, top_level_plugins: Vec<String>) -> Self {
        Self {
            graph,
            top_level_plugins,
            chains: RefCell::new(HashMap::new()),
        }
    }

    /// Build the graph of `state`'s platform from the plugins installed
    /// under `plugins_dir`.
    ///
    /// Every entry of `installed_plugins` is top-level. Plugins whose
    /// directory is missing contribute no edges.
    pub fn build(
        state: &PlatformState,
        plugins_dir: &Path,
        provider: &dyn PluginInfoProvider,
    ) -> Result<Self> {
        let mut graph = DependencyGraph::new();
        let mut top_level_plugins = Vec::new();

        for id in state.installed_ids() {
            top_level_plugins.push(id.to_string());
            add_plugin_edges(&mut graph, id, &state.platform, plugins_dir, provider)?;
        }
        for id in state.dependent_ids() {
            add_plugin_edges(&mut graph, id, &state.platform, plugins_dir, provider)?;
        }

        tracing::debug!(
            platform = %state.platform,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built plugin dependency graph"
        );
        Ok(Self::new(graph, top_level_plugins))
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn top_level_plugins(&self) -> &[String] {
        &self.top_level_plugins
    }

    /// Memoized [`DependencyGraph::chain`].
    pub fn chain(&self, id: &str) -> Rc<[String]> {
        if let Some(chain) = self.chains.borrow().get(id) {
            return Rc::clone(chain);
        }
        let chain: Rc<[String]> = self.graph.chain(id).into();
        self.chains
            .borrow_mut()
            .insert(id.to_string(), Rc::clone(&chain));
        chain
    }
}

impl DependencyAnalysis for DependencyInfo {
    fn dependents(&self, id: &str) -> Vec<String> {
        self.top_level_plugins
            .iter()
            .filter(|tlp| tlp.as_str() != id && self.chain(tlp).iter().any(|dep| dep == id))
            .cloned()
            .collect()
    }

    fn danglers(&self, id: &str) -> Vec<String> {
        let mut used: HashSet<String> = HashSet::new();
        for tlp in self.top_level_plugins.iter().filter(|tlp| tlp.as_str() != id) {
            used.insert(tlp.clone());
            used.extend(self.chain(tlp).iter().cloned());
        }

        self.chain(id)
            .iter()
            .filter(|dep| !used.contains(dep.as_str()))
            .cloned()
            .collect()
    }
}

fn add_plugin_edges(
    graph: &mut DependencyGraph,
    id: &str,
    platform: &str,
    plugins_dir: &Path,
    provider: &dyn PluginInfoProvider,
) -> Result<()> {
    let dir = plugins_dir.join(id);
    if !dir.is_dir() {
        tracing::debug!("Plugin \"{}\" does not exist ({})", id, dir.display());
        return Ok(());
    }

    let info = provider.get(&dir)?;
    graph.add_node(id);
    for dependency in info.get_dependencies(platform) {
        graph.add_edge(id, &dependency.id);
    }
    Ok(())
}
