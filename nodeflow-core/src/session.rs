//! Editing Session
//!
//! A session owns the current graph snapshot, the evaluation cache that goes
//! with it, and the counter used to mint node ids. It is the only place that
//! applies the invalidation policy, so a host that edits through a session
//! can never observe a cache entry computed from a graph that no longer
//! exists.
//!
//! # Invalidation Policy
//!
//! After a mutation commits, cache entries are purged starting from:
//!
//! - `add_node`: nothing (the new node has no consumers).
//! - `remove_node`: every neighbour that lost a connection, plus the removed
//!   node itself.
//! - `update_node_data`: the updated node.
//! - `add_edge` / `remove_edge`: the target node only. The source's own
//!   value does not depend on its consumers.
//!
//! Each editing call returns the purged ids so a host can refresh exactly
//! those nodes.
//!
//! A rejected mutation leaves both the graph and the cache as they were.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::{GraphError, Result};
use crate::eval::{Cache, Evaluator, NodeValue};
use crate::graph::{reachable, EdgeSource, EdgeTarget, Graph, NodeId};
use crate::registry::NodeKind;
use crate::value::Value;

/// An immutable graph together with the cache computed against it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    graph: Graph,
    cache: Cache,
}

impl Snapshot {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }
}

/// Mutable editing context over immutable snapshots.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    /// Counter of the next minted id; `None` once `u64::MAX` was handed out.
    next_id: Option<u64>,
    graph: Graph,
    cache: Cache,
}

impl Default for Session {
    fn default() -> Self {
        let config = SessionConfig::default();
        Self {
            next_id: Some(config.first_id),
            config,
            graph: Graph::new(),
            cache: Cache::new(),
        }
    }
}

impl Session {
    /// Start an empty session.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::from_graph(config, Graph::new())
    }

    /// Start a session over an existing graph, e.g. one loaded from disk.
    ///
    /// The graph is validated first; the cache starts empty.
    pub fn from_graph(config: SessionConfig, graph: Graph) -> Result<Self> {
        config.validate()?;
        graph.validate()?;
        debug!(nodes = graph.len(), "session opened");
        Ok(Self {
            next_id: Some(config.first_id),
            config,
            graph,
            cache: Cache::new(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Copy out the current graph and cache.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            graph: self.graph.clone(),
            cache: self.cache.clone(),
        }
    }

    /// Mint a node id that is not used in the current graph.
    ///
    /// Fails once the counter has passed `u64::MAX`.
    pub fn next_id(&mut self) -> Result<NodeId> {
        loop {
            let Some(n) = self.next_id else {
                return Err(GraphError::Config(format!(
                    "node id counter for prefix \"{}\" is exhausted",
                    self.config.id_prefix
                )));
            };
            self.next_id = n.checked_add(1);
            let id = NodeId::new(format!("{}{n}", self.config.id_prefix));
            if !self.graph.contains(&id) {
                return Ok(id);
            }
        }
    }

    /// Add a node under a freshly minted id and return the id.
    pub fn add_node(&mut self, kind: NodeKind, config: Option<Vec<Value>>) -> Result<NodeId> {
        let id = rejected("add_node", self.next_id())?;
        self.insert_node(kind, id.clone(), config)?;
        Ok(id)
    }

    /// Add a node under a caller-chosen id.
    pub fn insert_node(
        &mut self,
        kind: NodeKind,
        id: impl Into<NodeId>,
        config: Option<Vec<Value>>,
    ) -> Result<()> {
        let id = id.into();
        let graph = rejected("add_node", self.graph.add_node(kind, id.clone(), config))?;
        debug!(node = %id, %kind, "node added");
        self.graph = graph;
        Ok(())
    }

    pub fn remove_node(&mut self, id: &NodeId) -> Result<BTreeSet<NodeId>> {
        let (graph, touched) = rejected("remove_node", self.graph.remove_node(id))?;
        let starts = touched.into_iter().chain(std::iter::once(id.clone()));
        let dirty = self.commit(graph, starts);
        debug!(node = %id, dirty = dirty.len(), "node removed");
        Ok(dirty)
    }

    pub fn update_node_data(&mut self, id: &NodeId, config: Vec<Value>) -> Result<BTreeSet<NodeId>> {
        let graph = rejected("update_node_data", self.graph.update_node_data(id, config))?;
        let dirty = self.commit(graph, [id.clone()]);
        debug!(node = %id, dirty = dirty.len(), "node data updated");
        Ok(dirty)
    }

    pub fn add_edge(&mut self, source: &EdgeSource, target: &EdgeTarget) -> Result<BTreeSet<NodeId>> {
        let graph = rejected("add_edge", self.graph.add_edge(source, target))?;
        let dirty = self.commit(graph, [target.node.clone()]);
        debug!(
            from = %source.node,
            output = source.output,
            to = %target.node,
            input = target.input,
            dirty = dirty.len(),
            "edge added"
        );
        Ok(dirty)
    }

    pub fn remove_edge(&mut self, source: &EdgeSource, target: &EdgeTarget) -> Result<BTreeSet<NodeId>> {
        let graph = rejected("remove_edge", self.graph.remove_edge(source, target))?;
        let dirty = self.commit(graph, [target.node.clone()]);
        debug!(
            from = %source.node,
            output = source.output,
            to = %target.node,
            input = target.input,
            dirty = dirty.len(),
            "edge removed"
        );
        Ok(dirty)
    }

    /// Evaluate a node, keeping every value computed on the way.
    pub fn evaluate(&mut self, id: &NodeId) -> Result<Arc<NodeValue>> {
        let mut evaluator = self.evaluator();
        let value = evaluator.evaluate(id)?;
        self.cache = evaluator.into_cache();
        Ok(value)
    }

    /// Evaluate a node and return the values of it and its upstream closure.
    pub fn trace(&mut self, id: &NodeId) -> Result<IndexMap<NodeId, Arc<NodeValue>>> {
        let mut evaluator = self.evaluator();
        let traced = evaluator.trace(id)?;
        self.cache = evaluator.into_cache();
        Ok(traced)
    }

    fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.graph, &self.cache).with_max_depth(self.config.max_eval_depth)
    }

    /// Install `graph` and purge everything downstream of `starts` in it.
    fn commit(&mut self, graph: Graph, starts: impl IntoIterator<Item = NodeId>) -> BTreeSet<NodeId> {
        let mut dirty = IndexSet::new();
        for start in starts {
            if !dirty.contains(&start) {
                dirty.extend(reachable(&graph, &start));
            }
        }
        self.cache = self.cache.without(&dirty);
        self.graph = graph;
        dirty.into_iter().collect()
    }
}

fn rejected<T>(op: &'static str, result: Result<T>) -> Result<T> {
    result.map_err(|err: GraphError| {
        warn!(op, error = %err, "mutation rejected");
        err
    })
}
