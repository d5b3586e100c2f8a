//! Graph Nodes
//!
//! This module defines the node records that live in the graph store.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::registry::NodeKind;
use crate::value::Value;

/// Unique identifier for a node in the graph.
///
/// Ids are chosen by the host (or generated by a [`Session`](crate::Session))
/// and are plain strings such as `"N1"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One end of an edge as seen from the node holding it.
///
/// On an input socket, `peer` is the producing node and `socket` its output
/// index; on an output socket, `peer` is the consumer and `socket` its input
/// index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub peer: NodeId,
    pub socket: usize,
}

impl Connection {
    pub fn new(peer: impl Into<NodeId>, socket: usize) -> Self {
        Self {
            peer: peer.into(),
            socket,
        }
    }
}

/// Ordered connections held by a single socket. Most sockets hold at most one.
pub type Connections = SmallVec<[Connection; 1]>;

/// A node in the graph.
///
/// Nodes are immutable once published in a snapshot; the mutation engine
/// clones the few records an operation touches and shares the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    config: Vec<Value>,
    inputs: Vec<Connections>,
    outputs: Vec<Connections>,
}

impl Node {
    /// Create an unconnected node whose socket lists match its kind.
    pub fn new(kind: NodeKind, id: NodeId, config: Vec<Value>) -> Self {
        let def = kind.definition();
        Self {
            id,
            kind,
            config,
            inputs: vec![Connections::new(); def.inputs().len()],
            outputs: vec![Connections::new(); def.outputs().len()],
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn config(&self) -> &[Value] {
        &self.config
    }

    /// Incoming connections, one list per input socket.
    pub fn inputs(&self) -> &[Connections] {
        &self.inputs
    }

    /// Outgoing connections, one list per output socket.
    pub fn outputs(&self) -> &[Connections] {
        &self.outputs
    }

    /// Every node this one consumes from, in socket order, without repeats.
    pub fn producers(&self) -> impl Iterator<Item = &NodeId> {
        let mut seen = Vec::new();
        self.inputs.iter().flatten().filter_map(move |c| {
            if seen.contains(&&c.peer) {
                None
            } else {
                seen.push(&c.peer);
                Some(&c.peer)
            }
        })
    }

    /// Every node consuming this one's outputs.
    pub fn consumers(&self) -> impl Iterator<Item = &NodeId> {
        self.outputs.iter().flatten().map(|c| &c.peer)
    }

    /// Whether any socket references `peer`.
    pub fn is_linked_to(&self, peer: &NodeId) -> bool {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .flatten()
            .any(|c| &c.peer == peer)
    }

    pub(crate) fn set_config(&mut self, config: Vec<Value>) {
        self.config = config;
    }

    pub(crate) fn input_mut(&mut self, socket: usize) -> Option<&mut Connections> {
        self.inputs.get_mut(socket)
    }

    pub(crate) fn output_mut(&mut self, socket: usize) -> Option<&mut Connections> {
        self.outputs.get_mut(socket)
    }

    /// Drop every connection to `peer` from every socket.
    pub(crate) fn unlink(&mut self, peer: &NodeId) {
        for socket in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            socket.retain(|c| &c.peer != peer);
        }
    }
}
