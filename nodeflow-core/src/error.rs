//! Error Types
//!
//! Every failure the engine can report is a caller/input error. Errors are
//! raised synchronously by the operation that detects them and carry the
//! offending ids and socket indices so the host can surface them verbatim.

use thiserror::Error;

use crate::graph::NodeId;
use crate::value::ValueType;

/// Which end of an edge a socket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketSide {
    Input,
    Output,
}

impl std::fmt::Display for SocketSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocketSide::Input => f.write_str("input"),
            SocketSide::Output => f.write_str("output"),
        }
    }
}

/// Errors produced by the registry, the mutation engine and the evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("unknown node type \"{0}\"")]
    UnknownNodeType(String),

    #[error("node \"{0}\" already exists")]
    DuplicateId(NodeId),

    #[error("node \"{0}\" not found")]
    NodeNotFound(NodeId),

    #[error("node \"{node}\" has no {side} socket {socket}")]
    SocketNotFound {
        node: NodeId,
        side: SocketSide,
        socket: usize,
    },

    #[error("node \"{node}\" {side} socket {socket} has reached its maximum of {max} connections")]
    SocketMaxConnectionsExceeded {
        node: NodeId,
        side: SocketSide,
        socket: usize,
        max: usize,
    },

    #[error("an edge from \"{from}\" output {output} to \"{to}\" input {input} already exists")]
    DuplicateEdge {
        from: NodeId,
        output: usize,
        to: NodeId,
        input: usize,
    },

    #[error("self-loops are not allowed: \"{0}\" cannot connect to itself")]
    SelfLoopEdge(NodeId),

    #[error("type mismatch: cannot connect output type {output} to input type {input}")]
    TypeMismatchEdge { output: ValueType, input: ValueType },

    #[error("cycle detected while evaluating: {}", format_path(.0))]
    CyclicGraph(Vec<NodeId>),

    #[error("evaluation of \"{node}\" exceeded the depth limit of {limit}")]
    DepthLimitExceeded { node: NodeId, limit: usize },

    #[error("inconsistent graph: {0}")]
    CorruptGraph(String),

    #[error("invalid session configuration: {0}")]
    Config(String),
}

fn format_path(path: &[NodeId]) -> String {
    path.iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;
