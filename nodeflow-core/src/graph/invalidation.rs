//! Invalidation Propagator
//!
//! When a node changes, every cached value computed from it is stale. The
//! propagator walks output connections breadth-first from the changed node
//! and purges the cache entry of each node it reaches.
//!
//! # Algorithm
//!
//! 1. Seed the queue with the changed node (it need not exist any more; a
//!    removed node's own entry is purged the same way).
//! 2. Pop a node, skip it if already visited, otherwise record it.
//! 3. Push every consumer on its output sockets.
//!
//! The visited set makes the walk terminate on cyclic graphs. Only the set
//! of visited nodes matters, not the order they were reached in.

use std::collections::VecDeque;

use indexmap::IndexSet;
use tracing::trace;

use super::node::NodeId;
use super::store::Graph;
use crate::eval::Cache;

/// `start` and every node transitively downstream of it.
pub fn reachable(graph: &Graph, start: &NodeId) -> IndexSet<NodeId> {
    let mut visited = IndexSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start.clone());

    while let Some(node_id) = queue.pop_front() {
        if !visited.insert(node_id.clone()) {
            continue;
        }
        if let Some(node) = graph.node(&node_id) {
            queue.extend(
                node.consumers()
                    .filter(|consumer| !visited.contains(*consumer))
                    .cloned(),
            );
        }
    }

    visited
}

/// Return `cache` without the entries of `start` and everything downstream.
pub fn mark_dirty(graph: &Graph, cache: &Cache, start: &NodeId) -> Cache {
    let dirty = reachable(graph, start);
    trace!(start = %start, dirty = dirty.len(), "mark dirty");
    cache.without(&dirty)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::eval::NodeValue;
    use crate::graph::{EdgeSource, EdgeTarget};
    use crate::registry::NodeKind;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn filled(ids: &[&str]) -> Cache {
        let mut cache = Cache::new();
        for s in ids {
            cache.insert(id(s), Arc::new(NodeValue::default()));
        }
        cache
    }

    fn chain() -> Graph {
        // A -> B -> C, D unconnected
        Graph::new()
            .add_node(NodeKind::Number, id("A"), None)
            .and_then(|g| g.add_node(NodeKind::Add, id("B"), None))
            .and_then(|g| g.add_node(NodeKind::Output, id("C"), None))
            .and_then(|g| g.add_node(NodeKind::Number, id("D"), None))
            .and_then(|g| g.add_edge(&EdgeSource::new("A", 0), &EdgeTarget::new("B", 0)))
            .and_then(|g| g.add_edge(&EdgeSource::new("B", 0), &EdgeTarget::new("C", 0)))
            .unwrap()
    }

    #[test]
    fn purges_downstream_only() {
        let graph = chain();
        let cache = filled(&["A", "B", "C", "D"]);

        let after = mark_dirty(&graph, &cache, &id("B"));

        assert!(after.contains(&id("A")));
        assert!(!after.contains(&id("B")));
        assert!(!after.contains(&id("C")));
        assert!(after.contains(&id("D")));
        // the input cache is untouched
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn terminates_on_cycles() {
        // Only self-loops are rejected, so A -> B -> A is a legal graph.
        let graph = Graph::new()
            .add_node(NodeKind::Add, id("A"), None)
            .and_then(|g| g.add_node(NodeKind::Add, id("B"), None))
            .and_then(|g| g.add_node(NodeKind::Number, id("X"), None))
            .and_then(|g| g.add_edge(&EdgeSource::new("A", 0), &EdgeTarget::new("B", 0)))
            .and_then(|g| g.add_edge(&EdgeSource::new("B", 0), &EdgeTarget::new("A", 0)))
            .unwrap();
        let cache = filled(&["A", "B", "X"]);

        let after = mark_dirty(&graph, &cache, &id("A"));

        assert_eq!(after.len(), 1);
        assert!(after.contains(&id("X")));
        let dirty: Vec<_> = reachable(&graph, &id("A")).into_iter().collect();
        assert_eq!(dirty, vec![id("A"), id("B")]);
    }

    #[test]
    fn missing_start_is_still_purged() {
        let graph = chain();
        let cache = filled(&["gone", "A"]);
        let after = mark_dirty(&graph, &cache, &id("gone"));
        assert!(!after.contains(&id("gone")));
        assert!(after.contains(&id("A")));
    }

    #[test]
    fn reachable_includes_start() {
        let dirty: Vec<_> = reachable(&chain(), &id("A")).into_iter().collect();
        assert_eq!(dirty, vec![id("A"), id("B"), id("C")]);
    }
}
