//! Graph snapshots and the mutation engine.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::node::{Connection, Node, NodeId};
use crate::error::{GraphError, Result, SocketSide};
use crate::registry::NodeKind;
use crate::value::Value;

/// The producing end of an edge: a node and one of its output sockets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeSource {
    pub node: NodeId,
    pub output: usize,
}

impl EdgeSource {
    pub fn new(node: impl Into<NodeId>, output: usize) -> Self {
        Self {
            node: node.into(),
            output,
        }
    }
}

/// The consuming end of an edge: a node and one of its input sockets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeTarget {
    pub node: NodeId,
    pub input: usize,
}

impl EdgeTarget {
    pub fn new(node: impl Into<NodeId>, input: usize) -> Self {
        Self {
            node: node.into(),
            input,
        }
    }
}

/// An immutable graph snapshot.
///
/// Cloning is cheap relative to the graph's contents: node records are shared.
/// Equality is structural.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Graph {
    nodes: IndexMap<NodeId, Arc<Node>>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(Arc::as_ref)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get the total number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(Arc::as_ref)
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    fn require(&self, id: &NodeId) -> Result<&Node> {
        self.node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))
    }

    /// Copy-on-write access to a record of this (new) snapshot.
    fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).map(Arc::make_mut)
    }

    /// Every node `id` transitively consumes from, nearest first.
    pub fn upstream(&self, id: &NodeId) -> IndexSet<NodeId> {
        let mut found = IndexSet::new();
        let mut stack: Vec<&NodeId> = vec![id];

        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            for producer in node.producers() {
                if producer != id && found.insert(producer.clone()) {
                    stack.push(producer);
                }
            }
        }

        found
    }

    /// Insert a fresh, unconnected node.
    ///
    /// `config` defaults to the kind's default config when omitted.
    pub fn add_node(&self, kind: NodeKind, id: NodeId, config: Option<Vec<Value>>) -> Result<Graph> {
        if self.contains(&id) {
            return Err(GraphError::DuplicateId(id));
        }
        let config = config.unwrap_or_else(|| kind.definition().default_config());

        let mut graph = self.clone();
        trace!(node = %id, %kind, "add node");
        graph.nodes.insert(id.clone(), Arc::new(Node::new(kind, id, config)));
        Ok(graph)
    }

    /// Delete a node and strip it from every neighbour's sockets.
    ///
    /// Returns the new snapshot and the neighbours that lost a connection.
    pub fn remove_node(&self, id: &NodeId) -> Result<(Graph, IndexSet<NodeId>)> {
        let node = self.require(id)?;
        let touched: IndexSet<NodeId> = node
            .producers()
            .chain(node.consumers())
            .filter(|peer| *peer != id)
            .cloned()
            .collect();

        let mut graph = self.clone();
        for peer in &touched {
            if let Some(neighbour) = graph.node_mut(peer) {
                neighbour.unlink(id);
            }
        }
        graph.nodes.shift_remove(id);

        trace!(node = %id, touched = touched.len(), "remove node");
        Ok((graph, touched))
    }

    /// Replace a node's config verbatim.
    pub fn update_node_data(&self, id: &NodeId, config: Vec<Value>) -> Result<Graph> {
        self.require(id)?;

        let mut graph = self.clone();
        if let Some(node) = graph.node_mut(id) {
            node.set_config(config);
        }
        trace!(node = %id, "update node data");
        Ok(graph)
    }

    /// Connect `source`'s output socket to `target`'s input socket.
    ///
    /// Checks, in order: both nodes exist, both sockets exist, the edge is not
    /// a self-loop, the target socket has room, the source socket has room,
    /// the edge is not already present, and the types are compatible.
    pub fn add_edge(&self, source: &EdgeSource, target: &EdgeTarget) -> Result<Graph> {
        let from = self.require(&source.node)?;
        let to = self.require(&target.node)?;

        let source_missing = || GraphError::SocketNotFound {
            node: source.node.clone(),
            side: SocketSide::Output,
            socket: source.output,
        };
        let target_missing = || GraphError::SocketNotFound {
            node: target.node.clone(),
            side: SocketSide::Input,
            socket: target.input,
        };
        let output_def = from.kind().definition().output(source.output).ok_or_else(source_missing)?;
        let input_def = to.kind().definition().input(target.input).ok_or_else(target_missing)?;
        let outgoing = from.outputs().get(source.output).ok_or_else(source_missing)?;
        let incoming = to.inputs().get(target.input).ok_or_else(target_missing)?;

        if source.node == target.node {
            return Err(GraphError::SelfLoopEdge(source.node.clone()));
        }
        if let Some(max) = input_def.max_connections().filter(|max| incoming.len() >= *max) {
            return Err(GraphError::SocketMaxConnectionsExceeded {
                node: target.node.clone(),
                side: SocketSide::Input,
                socket: target.input,
                max,
            });
        }
        if let Some(max) = output_def.max_connections().filter(|max| outgoing.len() >= *max) {
            return Err(GraphError::SocketMaxConnectionsExceeded {
                node: source.node.clone(),
                side: SocketSide::Output,
                socket: source.output,
                max,
            });
        }
        if outgoing
            .iter()
            .any(|c| c.peer == target.node && c.socket == target.input)
        {
            return Err(GraphError::DuplicateEdge {
                from: source.node.clone(),
                output: source.output,
                to: target.node.clone(),
                input: target.input,
            });
        }
        if !input_def.value_type().accepts(output_def.value_type()) {
            return Err(GraphError::TypeMismatchEdge {
                output: output_def.value_type(),
                input: input_def.value_type(),
            });
        }

        let mut graph = self.clone();
        if let Some(socket) = graph
            .node_mut(&source.node)
            .and_then(|node| node.output_mut(source.output))
        {
            socket.push(Connection::new(target.node.clone(), target.input));
        }
        if let Some(socket) = graph
            .node_mut(&target.node)
            .and_then(|node| node.input_mut(target.input))
        {
            socket.push(Connection::new(source.node.clone(), source.output));
        }

        trace!(
            source = %source.node,
            output = source.output,
            target = %target.node,
            input = target.input,
            "add edge"
        );
        Ok(graph)
    }

    /// Disconnect `source` from `target`.
    ///
    /// Removing an edge that does not exist is a no-op, as long as both nodes
    /// do.
    pub fn remove_edge(&self, source: &EdgeSource, target: &EdgeTarget) -> Result<Graph> {
        let from = self.require(&source.node)?;
        let to = self.require(&target.node)?;

        let is_target = |c: &Connection| c.peer == target.node && c.socket == target.input;
        let is_source = |c: &Connection| c.peer == source.node && c.socket == source.output;

        let linked = from
            .outputs()
            .get(source.output)
            .is_some_and(|socket| socket.iter().any(is_target))
            || to
                .inputs()
                .get(target.input)
                .is_some_and(|socket| socket.iter().any(is_source));
        if !linked {
            return Ok(self.clone());
        }

        let mut graph = self.clone();
        if let Some(socket) = graph
            .node_mut(&source.node)
            .and_then(|node| node.output_mut(source.output))
        {
            socket.retain(|c| !is_target(c));
        }
        if let Some(socket) = graph
            .node_mut(&target.node)
            .and_then(|node| node.input_mut(target.input))
        {
            socket.retain(|c| !is_source(c));
        }

        trace!(source = %source.node, target = %target.node, "remove edge");
        Ok(graph)
    }

    /// Check every structural invariant.
    ///
    /// Snapshots built through the mutation engine always pass; this is for
    /// graphs that arrive from outside, e.g. deserialized from a host's
    /// saved document.
    pub fn validate(&self) -> Result<()> {
        for (key, node) in &self.nodes {
            if key != node.id() {
                return Err(GraphError::CorruptGraph(format!(
                    "node \"{}\" is stored under id \"{key}\"",
                    node.id()
                )));
            }
            let def = node.kind().definition();
            if node.inputs().len() != def.inputs().len() || node.outputs().len() != def.outputs().len() {
                return Err(GraphError::CorruptGraph(format!(
                    "node \"{key}\" does not have the socket layout of {}",
                    node.kind()
                )));
            }

            for (index, socket) in node.inputs().iter().enumerate() {
                let input_def = &def.inputs()[index];
                if let Some(connection) = first_repeat(socket) {
                    return Err(GraphError::DuplicateEdge {
                        from: connection.peer.clone(),
                        output: connection.socket,
                        to: key.clone(),
                        input: index,
                    });
                }
                check_count(key, SocketSide::Input, index, socket.len(), input_def.max_connections())?;
                for connection in socket {
                    let peer = self.linked_peer(key, connection)?;
                    let output_def = peer
                        .kind()
                        .definition()
                        .output(connection.socket)
                        .ok_or_else(|| GraphError::SocketNotFound {
                            node: connection.peer.clone(),
                            side: SocketSide::Output,
                            socket: connection.socket,
                        })?;
                    if !input_def.value_type().accepts(output_def.value_type()) {
                        return Err(GraphError::TypeMismatchEdge {
                            output: output_def.value_type(),
                            input: input_def.value_type(),
                        });
                    }
                    let mirrored = peer
                        .outputs()
                        .get(connection.socket)
                        .is_some_and(|s| s.contains(&Connection::new(key.clone(), index)));
                    if !mirrored {
                        return Err(GraphError::CorruptGraph(format!(
                            "input {index} of \"{key}\" is not mirrored on \"{}\"",
                            connection.peer
                        )));
                    }
                }
            }

            for (index, socket) in node.outputs().iter().enumerate() {
                if let Some(connection) = first_repeat(socket) {
                    return Err(GraphError::DuplicateEdge {
                        from: key.clone(),
                        output: index,
                        to: connection.peer.clone(),
                        input: connection.socket,
                    });
                }
                check_count(key, SocketSide::Output, index, socket.len(), def.outputs()[index].max_connections())?;
                for connection in socket {
                    let peer = self.linked_peer(key, connection)?;
                    let mirrored = peer
                        .inputs()
                        .get(connection.socket)
                        .is_some_and(|s| s.contains(&Connection::new(key.clone(), index)));
                    if !mirrored {
                        return Err(GraphError::CorruptGraph(format!(
                            "output {index} of \"{key}\" is not mirrored on \"{}\"",
                            connection.peer
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn linked_peer(&self, owner: &NodeId, connection: &Connection) -> Result<&Node> {
        if &connection.peer == owner {
            return Err(GraphError::SelfLoopEdge(owner.clone()));
        }
        self.require(&connection.peer)
    }
}

/// The first connection that also appears earlier in the same socket.
fn first_repeat(socket: &[Connection]) -> Option<&Connection> {
    socket
        .iter()
        .enumerate()
        .find(|(position, connection)| socket[..*position].contains(connection))
        .map(|(_, connection)| connection)
}

fn check_count(node: &NodeId, side: SocketSide, socket: usize, count: usize, max: Option<usize>) -> Result<()> {
    match max {
        Some(max) if count > max => Err(GraphError::SocketMaxConnectionsExceeded {
            node: node.clone(),
            side,
            socket,
            max,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    /// N1=number[5], N2=number[3], N3=add, N4=sink, wired N1,N2 -> N3 -> N4.
    fn adder() -> Graph {
        let graph = Graph::new()
            .add_node(NodeKind::Number, id("N1"), Some(vec![Value::from(5)]))
            .and_then(|g| g.add_node(NodeKind::Number, id("N2"), Some(vec![Value::from(3)])))
            .and_then(|g| g.add_node(NodeKind::Add, id("N3"), None))
            .and_then(|g| g.add_node(NodeKind::Output, id("N4"), None))
            .unwrap();
        graph
            .add_edge(&EdgeSource::new("N1", 0), &EdgeTarget::new("N3", 0))
            .and_then(|g| g.add_edge(&EdgeSource::new("N2", 0), &EdgeTarget::new("N3", 1)))
            .and_then(|g| g.add_edge(&EdgeSource::new("N3", 0), &EdgeTarget::new("N4", 0)))
            .unwrap()
    }

    #[test]
    fn add_node_uses_default_config() {
        let graph = Graph::new().add_node(NodeKind::If, id("N1"), None).unwrap();
        let node = graph.node(&id("N1")).unwrap();
        assert_eq!(node.config(), NodeKind::If.definition().default_config().as_slice());
        assert!(node.inputs().iter().all(|socket| socket.is_empty()));
    }

    #[test]
    fn add_node_rejects_duplicate_ids() {
        let graph = Graph::new().add_node(NodeKind::Number, id("N1"), None).unwrap();
        assert_eq!(
            graph.add_node(NodeKind::String, id("N1"), None).unwrap_err(),
            GraphError::DuplicateId(id("N1"))
        );
    }

    #[test]
    fn mutations_leave_the_input_snapshot_untouched() {
        let before = adder();
        let copy = before.clone();

        let after = before
            .update_node_data(&id("N1"), vec![Value::from(10)])
            .unwrap();

        assert_eq!(before, copy);
        assert_eq!(before.node(&id("N1")).unwrap().config(), &[Value::from(5)]);
        assert_eq!(after.node(&id("N1")).unwrap().config(), &[Value::from(10)]);
    }

    #[test]
    fn untouched_records_are_shared() {
        let before = adder();
        let after = before
            .update_node_data(&id("N1"), vec![Value::from(10)])
            .unwrap();

        assert!(Arc::ptr_eq(&before.nodes[&id("N2")], &after.nodes[&id("N2")]));
        assert!(!Arc::ptr_eq(&before.nodes[&id("N1")], &after.nodes[&id("N1")]));
    }

    #[test]
    fn edges_are_mirrored() {
        let graph = adder();
        let n1 = graph.node(&id("N1")).unwrap();
        let n3 = graph.node(&id("N3")).unwrap();
        assert_eq!(n1.outputs()[0].as_slice(), &[Connection::new("N3", 0)]);
        assert_eq!(n3.inputs()[0].as_slice(), &[Connection::new("N1", 0)]);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn add_then_remove_edge_restores_graph() {
        let base = Graph::new()
            .add_node(NodeKind::Number, id("A"), None)
            .and_then(|g| g.add_node(NodeKind::Output, id("B"), None))
            .unwrap();
        let source = EdgeSource::new("A", 0);
        let target = EdgeTarget::new("B", 0);

        let linked = base.add_edge(&source, &target).unwrap();
        assert_ne!(linked, base);
        assert_eq!(linked.remove_edge(&source, &target).unwrap(), base);
    }

    #[test]
    fn self_loops_are_rejected_regardless_of_type() {
        let graph = Graph::new().add_node(NodeKind::Add, id("A"), None).unwrap();
        let err = graph
            .add_edge(&EdgeSource::new("A", 0), &EdgeTarget::new("A", 0))
            .unwrap_err();
        assert_eq!(err, GraphError::SelfLoopEdge(id("A")));
    }

    #[test]
    fn full_input_socket_is_rejected() {
        let graph = adder()
            .add_node(NodeKind::Number, id("N5"), None)
            .unwrap();
        let err = graph
            .add_edge(&EdgeSource::new("N5", 0), &EdgeTarget::new("N3", 0))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::SocketMaxConnectionsExceeded {
                node: id("N3"),
                side: SocketSide::Input,
                socket: 0,
                max: 1,
            }
        );
    }

    #[test]
    fn literal_inputs_accept_no_connections() {
        let graph = Graph::new()
            .add_node(NodeKind::Number, id("A"), None)
            .and_then(|g| g.add_node(NodeKind::Number, id("B"), None))
            .unwrap();
        let err = graph
            .add_edge(&EdgeSource::new("A", 0), &EdgeTarget::new("B", 0))
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::SocketMaxConnectionsExceeded { max: 0, side: SocketSide::Input, .. }
        ));
    }

    #[test]
    fn duplicate_edges_are_rejected() {
        // Operand inputs hold one connection, so the limit fires first.
        let graph = Graph::new()
            .add_node(NodeKind::Number, id("A"), None)
            .and_then(|g| g.add_node(NodeKind::Add, id("B"), None))
            .unwrap();
        let source = EdgeSource::new("A", 0);
        let target = EdgeTarget::new("B", 0);
        let linked = graph.add_edge(&source, &target).unwrap();

        let err = linked.add_edge(&source, &target).unwrap_err();
        assert!(matches!(err, GraphError::SocketMaxConnectionsExceeded { .. }));

        // With the target side cleared, only the source still records it.
        let mut half = linked.clone();
        half.node_mut(&id("B")).unwrap().unlink(&id("A"));
        let err = half.add_edge(&source, &target).unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateEdge {
                from: id("A"),
                output: 0,
                to: id("B"),
                input: 0,
            }
        );
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let graph = Graph::new()
            .add_node(NodeKind::String, id("S"), None)
            .and_then(|g| g.add_node(NodeKind::Subtract, id("D"), None))
            .unwrap();
        let err = graph
            .add_edge(&EdgeSource::new("S", 0), &EdgeTarget::new("D", 0))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::TypeMismatchEdge {
                output: ValueType::String,
                input: ValueType::Number,
            }
        );
    }

    #[test]
    fn wildcard_inputs_accept_any_output() {
        let graph = Graph::new()
            .add_node(NodeKind::String, id("S"), None)
            .and_then(|g| g.add_node(NodeKind::Add, id("A"), None))
            .unwrap();
        assert!(graph
            .add_edge(&EdgeSource::new("S", 0), &EdgeTarget::new("A", 1))
            .is_ok());
    }

    #[test]
    fn missing_endpoints_and_sockets() {
        let graph = adder();
        assert_eq!(
            graph
                .add_edge(&EdgeSource::new("N9", 0), &EdgeTarget::new("N3", 0))
                .unwrap_err(),
            GraphError::NodeNotFound(id("N9"))
        );
        assert_eq!(
            graph
                .add_edge(&EdgeSource::new("N1", 0), &EdgeTarget::new("N4", 3))
                .unwrap_err(),
            GraphError::SocketNotFound {
                node: id("N4"),
                side: SocketSide::Input,
                socket: 3,
            }
        );
        assert_eq!(
            graph
                .remove_edge(&EdgeSource::new("N1", 0), &EdgeTarget::new("N9", 0))
                .unwrap_err(),
            GraphError::NodeNotFound(id("N9"))
        );
    }

    #[test]
    fn removing_an_absent_edge_is_a_noop() {
        let graph = adder();
        let same = graph
            .remove_edge(&EdgeSource::new("N1", 0), &EdgeTarget::new("N4", 0))
            .unwrap();
        assert_eq!(same, graph);
    }

    #[test]
    fn removing_with_out_of_range_sockets_is_a_noop() {
        let graph = adder();
        for (output, input) in [(7, 0), (0, 7), (7, 7)] {
            let same = graph
                .remove_edge(&EdgeSource::new("N3", output), &EdgeTarget::new("N4", input))
                .unwrap();
            assert_eq!(same, graph);
        }
        // a literal's hidden input exists but never holds a connection
        let same = graph
            .remove_edge(&EdgeSource::new("N2", 0), &EdgeTarget::new("N1", 0))
            .unwrap();
        assert_eq!(same, graph);
    }

    #[test]
    fn remove_node_strips_only_its_links() {
        let graph = adder();
        let (after, touched) = graph.remove_node(&id("N1")).unwrap();

        assert!(!after.contains(&id("N1")));
        assert_eq!(touched.into_iter().collect::<Vec<_>>(), vec![id("N3")]);

        let n3 = after.node(&id("N3")).unwrap();
        assert!(n3.inputs()[0].is_empty());
        assert_eq!(n3.inputs()[1].as_slice(), &[Connection::new("N2", 0)]);
        assert_eq!(n3.outputs()[0].as_slice(), &[Connection::new("N4", 0)]);
        assert!(after.validate().is_ok());
    }

    #[test]
    fn remove_node_reports_both_directions() {
        let (_, touched) = adder().remove_node(&id("N3")).unwrap();
        let mut touched: Vec<_> = touched.into_iter().collect();
        touched.sort();
        assert_eq!(touched, vec![id("N1"), id("N2"), id("N4")]);
    }

    #[test]
    fn unknown_node_operations_fail() {
        let graph = adder();
        assert_eq!(
            graph.remove_node(&id("N9")).unwrap_err(),
            GraphError::NodeNotFound(id("N9"))
        );
        assert_eq!(
            graph.update_node_data(&id("N9"), vec![]).unwrap_err(),
            GraphError::NodeNotFound(id("N9"))
        );
    }

    #[test]
    fn upstream_collects_transitive_producers() {
        let upstream = adder().upstream(&id("N4"));
        let mut ids: Vec<_> = upstream.into_iter().collect();
        ids.sort();
        assert_eq!(ids, vec![id("N1"), id("N2"), id("N3")]);
    }

    #[test]
    fn validate_catches_missing_mirror() {
        let mut graph = adder();
        graph.node_mut(&id("N4")).unwrap().unlink(&id("N3"));
        assert!(matches!(graph.validate(), Err(GraphError::CorruptGraph(_))));
    }

    #[test]
    fn validate_catches_repeated_input_connection() {
        let mut graph = adder();
        graph
            .node_mut(&id("N4"))
            .and_then(|node| node.input_mut(0))
            .unwrap()
            .push(Connection::new("N3", 0));

        assert_eq!(
            graph.validate(),
            Err(GraphError::DuplicateEdge {
                from: id("N3"),
                output: 0,
                to: id("N4"),
                input: 0,
            })
        );
    }

    #[test]
    fn validate_catches_repeated_output_connection() {
        let mut graph = adder();
        graph
            .node_mut(&id("N3"))
            .and_then(|node| node.output_mut(0))
            .unwrap()
            .push(Connection::new("N4", 0));

        assert_eq!(
            graph.validate(),
            Err(GraphError::DuplicateEdge {
                from: id("N3"),
                output: 0,
                to: id("N4"),
                input: 0,
            })
        );
    }

    #[test]
    fn graph_round_trips_through_serde() {
        let graph = adder()
            .update_node_data(&id("N2"), vec![Value::from("x"), Value::Null])
            .unwrap();
        let json = serde_json::to_string(&graph).unwrap();
        let back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);
        assert!(back.validate().is_ok());
    }
}
