//! Nodeflow Core
//!
//! This crate provides the engine behind a visual dataflow editor: users
//! place typed nodes on a canvas, wire output sockets to input sockets, and
//! see values propagate. It implements:
//!
//! - A closed registry of node types (literals, arithmetic, comparison,
//!   conditional, output sink) with their socket schemas and default config
//! - Immutable graph snapshots and a mutation engine that enforces every
//!   structural invariant before a new snapshot is produced
//! - Downstream cache invalidation
//! - A lazy, memoized evaluator that rejects cyclic graphs
//!
//! Rendering, persistence formats, and undo history belong to the host.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `registry`: Node kinds, their schemas, and their evaluation logic
//! - `graph`: Snapshots, mutations, and invalidation
//! - `eval`: Cache and evaluator
//! - `session`: Id minting and the invalidation policy over one editing state
//! - `shared`: A session that can be mutated and read from many threads
//!
//! # Example
//!
//! ```rust
//! use nodeflow_core::{EdgeSource, EdgeTarget, NodeKind, Session, Value};
//!
//! let mut session = Session::default();
//! let a = session.add_node(NodeKind::Number, Some(vec![5.0.into()]))?;
//! let b = session.add_node(NodeKind::Number, Some(vec![3.0.into()]))?;
//! let sum = session.add_node(NodeKind::Add, None)?;
//!
//! session.add_edge(&EdgeSource::new(a.clone(), 0), &EdgeTarget::new(sum.clone(), 0))?;
//! session.add_edge(&EdgeSource::new(b, 0), &EdgeTarget::new(sum.clone(), 1))?;
//! assert_eq!(session.evaluate(&sum)?.value(), &Value::from(8));
//!
//! // Editing a literal purges everything computed from it.
//! let dirty = session.update_node_data(&a, vec![10.0.into()])?;
//! assert!(dirty.contains(&sum));
//! assert_eq!(session.evaluate(&sum)?.value(), &Value::from(13));
//! # Ok::<(), nodeflow_core::GraphError>(())
//! ```

pub mod config;
pub mod error;
pub mod eval;
pub mod graph;
pub mod registry;
pub mod session;
pub mod shared;
pub mod value;

pub use config::SessionConfig;
pub use error::{GraphError, Result, SocketSide};
pub use eval::{Cache, NodeValue};
pub use graph::{EdgeSource, EdgeTarget, Graph, Node, NodeId};
pub use registry::NodeKind;
pub use session::{Session, Snapshot};
pub use shared::SharedSession;
pub use value::{Value, ValueType};
