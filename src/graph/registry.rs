//! Columnar arena backing the dependency graph.
//!
//! Nodes live in parallel vectors indexed by a dense `NodeId`; every
//! cross-reference is an index, never an owning pointer, so the structure
//! has no reference cycles and can be handed to collaborators (the bulk
//! diff/apply service) wholesale.

use std::collections::HashMap;

use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn new(idx: usize) -> NodeId {
        NodeId(idx as u32)
    }
}

/// How a dependency edge was derived from the formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepKind {
    /// A plain reference: the dependency's current-step value feeds this
    /// node, so ordering matters within a time step.
    Direct,
    /// Derived from a time-offset reference, collapsed to its base variable.
    Temporal,
}

type DepList = SmallVec<[(NodeId, DepKind); 4]>;
type DependentList = SmallVec<[NodeId; 4]>;

#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    names: Vec<String>,
    index: HashMap<String, NodeId>,
    deps: Vec<DepList>,
    dependents: Vec<DependentList>,
    time_dependent: Vec<bool>,
    edge_count: usize,
}

impl NodeArena {
    pub fn count(&self) -> usize {
        self.names.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn insert(&mut self, name: &str) -> NodeId {
        let id = NodeId::new(self.names.len());
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        self.deps.push(SmallVec::new());
        self.dependents.push(SmallVec::new());
        self.time_dependent.push(false);
        id
    }

    pub fn resolve(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.names[id.index()]
    }

    /// Records `dependency -> node`. Duplicate (dependency, kind) pairs are
    /// collapsed; the same base may legitimately appear once as Direct and
    /// once as Temporal.
    pub fn add_dep(&mut self, node: NodeId, dependency: NodeId, kind: DepKind) {
        let list = &mut self.deps[node.index()];
        if list.contains(&(dependency, kind)) {
            return;
        }
        list.push((dependency, kind));
        let dependents = &mut self.dependents[dependency.index()];
        if !dependents.contains(&node) {
            dependents.push(node);
        }
        self.edge_count += 1;
    }

    #[inline(always)]
    pub fn deps(&self, id: NodeId) -> &[(NodeId, DepKind)] {
        &self.deps[id.index()]
    }

    pub fn dependents(&self, id: NodeId) -> &[NodeId] {
        &self.dependents[id.index()]
    }

    pub fn mark_time_dependent(&mut self, id: NodeId) {
        self.time_dependent[id.index()] = true;
    }

    pub fn is_time_dependent(&self, id: NodeId) -> bool {
        self.time_dependent[id.index()]
    }
}
