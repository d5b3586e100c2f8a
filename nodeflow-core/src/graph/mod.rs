//! Graph Store
//!
//! This module implements the dataflow graph: an id-indexed store of nodes
//! whose sockets are linked by typed edges, plus the pure mutation engine and
//! the invalidation propagator that operate on it.
//!
//! # Overview
//!
//! Every edge is recorded twice: as an input connection on the consumer and
//! as an output connection on the producer. Keeping both directions makes
//! upstream evaluation and downstream invalidation equally cheap.
//!
//! # Design Decisions
//!
//! 1. A [`Graph`] is an immutable snapshot. Mutations borrow the current
//!    snapshot and return a new one, so readers holding an older snapshot
//!    are never disturbed.
//!
//! 2. Node records sit behind `Arc`. A mutation clones only the records it
//!    touches (at most the two endpoints of an edge, or a removed node's
//!    neighbours) and shares the rest with the previous snapshot.
//!
//! 3. Every check runs before the first write, so a failed mutation never
//!    yields a partially applied snapshot.

mod invalidation;
mod node;
mod store;

pub use invalidation::{mark_dirty, reachable};
pub use node::{Connection, Connections, Node, NodeId};
pub use store::{EdgeSource, EdgeTarget, Graph};
