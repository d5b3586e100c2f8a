//! Evaluation Engine
//!
//! Lazily computes node values from the leaves up and memoizes them.
//!
//! # How Evaluation Works
//!
//! 1. A cached value is returned immediately.
//!
//! 2. Otherwise every input socket is resolved first (post-order). Nodes
//!    under resolution sit on an explicit work stack; the top node pushes
//!    its first producer without a cached value, and once none is left it
//!    is computed and popped. Each producer contributes the value on the
//!    output socket the edge starts from.
//!
//! 3. The node's logic runs on the per-socket value lists and its config,
//!    and the result is cached before it is returned.
//!
//! The cache being filled is threaded through sibling and nested calls, so
//! within one top-level call no producer is computed twice.
//!
//! # Cycles
//!
//! The mutation engine only forbids self-loops, so cyclic graphs can exist.
//! The evaluator keeps the stack of nodes currently being resolved and fails
//! with [`GraphError::CyclicGraph`](crate::GraphError::CyclicGraph) as soon
//! as a node on that stack is requested again.

mod cache;
mod evaluator;

pub use cache::{Cache, NodeValue};
pub use evaluator::{evaluate_node, trace, Evaluator};
