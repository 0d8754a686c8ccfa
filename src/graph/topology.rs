//! Topological sort, cycle enumeration and level computation over the
//! dependency arena.
//!
//! The sort is a depth-first post-order: dependencies land before their
//! consumers, and deep chains stay adjacent in the output.

use thiserror::Error;

use super::registry::{NodeArena, NodeId};

/// A non-temporal cycle found during topological traversal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circular dependency detected at variable '{variable}'")]
pub struct CircularDependencyError {
    pub variable: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    Visiting,
    Visited,
}

/// Returns a dependency-first ordering of every node, disconnected ones
/// included. Fails on the first node found on its own downstream path.
pub(crate) fn sort(arena: &NodeArena) -> Result<Vec<NodeId>, CircularDependencyError> {
    let count = arena.count();
    let mut order = Vec::with_capacity(count);
    let mut state = vec![VisitState::Unvisited; count];

    for i in 0..count {
        if state[i] == VisitState::Unvisited {
            visit(NodeId::new(i), arena, &mut state, &mut order)?;
        }
    }

    Ok(order)
}

fn visit(
    node: NodeId,
    arena: &NodeArena,
    state: &mut [VisitState],
    order: &mut Vec<NodeId>,
) -> Result<(), CircularDependencyError> {
    let idx = node.index();
    match state[idx] {
        VisitState::Visited => return Ok(()),
        VisitState::Visiting => {
            return Err(CircularDependencyError {
                variable: arena.name(node).to_string(),
            })
        }
        VisitState::Unvisited => state[idx] = VisitState::Visiting,
    }

    for &(dep, _) in arena.deps(node) {
        visit(dep, arena, state, order)?;
    }

    state[idx] = VisitState::Visited;
    order.push(node);
    Ok(())
}

/// Walks the same DFS as [`sort`] but collects every cycle instead of
/// aborting: on meeting an in-progress node, the current path is sliced
/// from that node's earlier occurrence to form one cycle.
pub(crate) fn find_cycles(arena: &NodeArena) -> Vec<Vec<NodeId>> {
    let count = arena.count();
    let mut state = vec![VisitState::Unvisited; count];
    let mut path = Vec::new();
    let mut cycles = Vec::new();

    for i in 0..count {
        if state[i] == VisitState::Unvisited {
            walk(NodeId::new(i), arena, &mut state, &mut path, &mut cycles);
        }
    }

    cycles
}

fn walk(
    node: NodeId,
    arena: &NodeArena,
    state: &mut [VisitState],
    path: &mut Vec<NodeId>,
    cycles: &mut Vec<Vec<NodeId>>,
) {
    let idx = node.index();
    match state[idx] {
        VisitState::Visited => return,
        VisitState::Visiting => {
            if let Some(start) = path.iter().position(|&n| n == node) {
                cycles.push(path[start..].to_vec());
            }
            return;
        }
        VisitState::Unvisited => state[idx] = VisitState::Visiting,
    }

    path.push(node);
    for &(dep, _) in arena.deps(node) {
        walk(dep, arena, state, path, cycles);
    }
    path.pop();
    state[idx] = VisitState::Visited;
}

/// Longest-path level per node: 0 for sources, otherwise 1 + the maximum
/// level over direct and temporal dependencies. `order` must be a valid
/// topological ordering of `arena`.
pub(crate) fn levels(arena: &NodeArena, order: &[NodeId]) -> Vec<u32> {
    let mut levels = vec![0u32; arena.count()];
    for &node in order {
        let deepest = arena
            .deps(node)
            .iter()
            .map(|&(dep, _)| levels[dep.index()])
            .max();
        levels[node.index()] = deepest.map_or(0, |d| d + 1);
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::registry::DepKind;
    use proptest::prelude::*;

    fn pos(order: &[NodeId], id: NodeId) -> usize {
        order.iter().position(|&n| n == id).unwrap()
    }

    #[test]
    fn sorts_diamond_dependency() {
        // A feeds B and C; D consumes both. Valid: A,B,C,D or A,C,B,D.
        let mut arena = NodeArena::default();
        let a = arena.insert("A");
        let b = arena.insert("B");
        let c = arena.insert("C");
        let d = arena.insert("D");
        arena.add_dep(b, a, DepKind::Direct);
        arena.add_dep(c, a, DepKind::Direct);
        arena.add_dep(d, b, DepKind::Direct);
        arena.add_dep(d, c, DepKind::Direct);

        let order = sort(&arena).expect("diamond is acyclic");
        assert!(pos(&order, a) < pos(&order, b));
        assert!(pos(&order, a) < pos(&order, c));
        assert!(pos(&order, b) < pos(&order, d));
        assert!(pos(&order, c) < pos(&order, d));
    }

    #[test]
    fn sort_reports_the_offending_variable() {
        let mut arena = NodeArena::default();
        let a = arena.insert("A");
        let b = arena.insert("B");
        arena.add_dep(a, b, DepKind::Direct);
        arena.add_dep(b, a, DepKind::Direct);

        let err = sort(&arena).unwrap_err();
        assert!(err.variable == "A" || err.variable == "B");
    }

    #[test]
    fn find_cycles_slices_the_path_at_the_back_edge() {
        // D -> A -> B -> C -> A: the cycle is [A, B, C], D stays out.
        let mut arena = NodeArena::default();
        let a = arena.insert("A");
        let b = arena.insert("B");
        let c = arena.insert("C");
        let d = arena.insert("D");
        arena.add_dep(d, a, DepKind::Direct);
        arena.add_dep(a, b, DepKind::Direct);
        arena.add_dep(b, c, DepKind::Direct);
        arena.add_dep(c, a, DepKind::Direct);

        let cycles = find_cycles(&arena);
        assert_eq!(cycles.len(), 1);
        let members: Vec<&str> = cycles[0].iter().map(|&n| arena.name(n)).collect();
        assert_eq!(members.len(), 3);
        assert!(members.contains(&"A") && members.contains(&"B") && members.contains(&"C"));
        assert!(!members.contains(&"D"));
    }

    #[test]
    fn find_cycles_collects_multiple_disjoint_cycles() {
        let mut arena = NodeArena::default();
        let a = arena.insert("A");
        let b = arena.insert("B");
        let c = arena.insert("C");
        let d = arena.insert("D");
        arena.add_dep(a, b, DepKind::Direct);
        arena.add_dep(b, a, DepKind::Direct);
        arena.add_dep(c, d, DepKind::Direct);
        arena.add_dep(d, c, DepKind::Direct);

        assert_eq!(find_cycles(&arena).len(), 2);
    }

    #[test]
    fn levels_are_longest_path_depths() {
        // A -> B -> D, A -> C -> D via a longer arm: level(D) follows the
        // deepest dependency.
        let mut arena = NodeArena::default();
        let a = arena.insert("A");
        let b = arena.insert("B");
        let c = arena.insert("C");
        let c2 = arena.insert("C2");
        let d = arena.insert("D");
        arena.add_dep(b, a, DepKind::Direct);
        arena.add_dep(c, a, DepKind::Direct);
        arena.add_dep(c2, c, DepKind::Temporal);
        arena.add_dep(d, b, DepKind::Direct);
        arena.add_dep(d, c2, DepKind::Direct);

        let order = sort(&arena).unwrap();
        let levels = levels(&arena, &order);
        assert_eq!(levels[a.index()], 0);
        assert_eq!(levels[b.index()], 1);
        assert_eq!(levels[c.index()], 1);
        assert_eq!(levels[c2.index()], 2);
        assert_eq!(levels[d.index()], 3);
    }

    proptest! {
        /// The throwing and non-throwing traversals must always agree on
        /// acyclicity, whatever the edge set.
        #[test]
        fn sort_and_find_cycles_agree(
            node_count in 1usize..10,
            edges in proptest::collection::vec((0usize..10, 0usize..10), 0..25),
        ) {
            let mut arena = NodeArena::default();
            for i in 0..node_count {
                arena.insert(&format!("N{i}"));
            }
            for (from, to) in edges {
                if from < node_count && to < node_count {
                    arena.add_dep(NodeId::new(from), NodeId::new(to), DepKind::Direct);
                }
            }
            let sorted = sort(&arena);
            let cycles = find_cycles(&arena);
            prop_assert_eq!(sorted.is_ok(), cycles.is_empty());
        }
    }
}
