//! The formula-derived dependency graph and its analyses.
//!
//! Rebuilt from a [`Model`] on every analysis call and never persisted. The
//! user-authored `Edge` entities play no part here: only references
//! extracted from formulas induce edges.

mod registry;
mod topology;

pub use registry::{DepKind, NodeArena, NodeId};
pub use topology::CircularDependencyError;

use std::collections::{BTreeSet, VecDeque};

use serde::Serialize;
use tracing::{debug, trace};

use crate::formula;
use crate::model::Model;

/// Shape summary returned by the `analyze_graph` operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub max_level: u32,
    pub cycle_count: usize,
    pub is_acyclic: bool,
    /// Dependency-first variable order; empty when the graph is cyclic.
    pub topological_order: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    arena: NodeArena,
}

impl DependencyGraph {
    /// Derives the graph from a model's formula dependencies.
    ///
    /// Offset references collapse to an edge from their base variable,
    /// tagged [`DepKind::Temporal`]; plain references produce
    /// [`DepKind::Direct`] edges. A temporal self-reference marks the node
    /// time-dependent but adds no edge (it is legal recursion across time,
    /// not a cycle). A reference whose base names no variable in the model
    /// is skipped: unlike model mutation, the builder must stay usable on
    /// partially-applied states, so dangling references degrade to a
    /// partial graph here instead of failing.
    pub fn build(model: &Model) -> DependencyGraph {
        let mut arena = NodeArena::default();
        for name in model.variables().keys() {
            arena.insert(name);
        }

        for (idx, variable) in model.variables().values().enumerate() {
            let node = NodeId::new(idx);
            for token in &variable.dependencies {
                let (base, temporal) = formula::reference_base(token);
                if temporal {
                    arena.mark_time_dependent(node);
                }
                if temporal && base == variable.name {
                    continue;
                }
                match arena.resolve(base) {
                    Some(dep) => {
                        let kind = if temporal { DepKind::Temporal } else { DepKind::Direct };
                        arena.add_dep(node, dep, kind);
                    }
                    None => {
                        trace!(variable = %variable.name, reference = %token, "skipping dangling reference");
                    }
                }
            }
        }

        debug!(
            model = %model.name,
            nodes = arena.count(),
            edges = arena.edge_count(),
            "dependency graph built"
        );
        DependencyGraph { arena }
    }

    pub fn node_count(&self) -> usize {
        self.arena.count()
    }

    pub fn edge_count(&self) -> usize {
        self.arena.edge_count()
    }

    pub fn resolve(&self, name: &str) -> Option<NodeId> {
        self.arena.resolve(name)
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.arena.name(id)
    }

    pub fn is_time_dependent(&self, id: NodeId) -> bool {
        self.arena.is_time_dependent(id)
    }

    /// Direct dependencies of a node, with their edge kinds.
    pub fn deps(&self, id: NodeId) -> &[(NodeId, DepKind)] {
        self.arena.deps(id)
    }

    /// Nodes that directly depend on `id`.
    pub fn dependents(&self, id: NodeId) -> &[NodeId] {
        self.arena.dependents(id)
    }

    /// Dependency-first ordering over all nodes, or the offending variable
    /// when a non-temporal cycle makes one impossible.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, CircularDependencyError> {
        topology::sort(&self.arena)
    }

    /// Every cycle in the graph as variable-name lists; empty iff
    /// [`Self::topological_order`] succeeds.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        topology::find_cycles(&self.arena)
            .into_iter()
            .map(|cycle| {
                cycle
                    .into_iter()
                    .map(|id| self.arena.name(id).to_string())
                    .collect()
            })
            .collect()
    }

    pub fn is_acyclic(&self) -> bool {
        self.topological_order().is_ok()
    }

    /// Longest-path level per node (grouping/visualization only); all zero
    /// when the graph is cyclic.
    pub fn levels(&self) -> Vec<u32> {
        match self.topological_order() {
            Ok(order) => topology::levels(&self.arena, &order),
            Err(_) => vec![0; self.arena.count()],
        }
    }

    /// The transitive dependency closure of `name`, itself included.
    /// Temporal edges are followed: a lagged input is still an input.
    pub fn transitive_dependencies(&self, name: &str) -> Option<BTreeSet<String>> {
        let start = self.arena.resolve(name)?;
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            if visited.insert(self.arena.name(node).to_string()) {
                for &(dep, _) in self.arena.deps(node) {
                    queue.push_back(dep);
                }
            }
        }
        Some(visited)
    }

    pub fn summary(&self) -> GraphSummary {
        let cycles = self.find_cycles();
        let (topological_order, max_level) = match self.topological_order() {
            Ok(order) => {
                let levels = topology::levels(&self.arena, &order);
                let names = order
                    .iter()
                    .map(|&id| self.arena.name(id).to_string())
                    .collect();
                (names, levels.iter().copied().max().unwrap_or(0))
            }
            Err(_) => (Vec::new(), 0),
        };
        GraphSummary {
            node_count: self.arena.count(),
            edge_count: self.arena.edge_count(),
            max_level,
            cycle_count: cycles.len(),
            is_acyclic: cycles.is_empty(),
            topological_order,
        }
    }
}
