//! Memoized post-order evaluator.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use super::cache::{Cache, NodeValue};
use crate::error::{GraphError, Result};
use crate::graph::{Graph, Node, NodeId};
use crate::value::Value;

/// Evaluation state for one graph snapshot.
///
/// Starts from a copy of an existing cache and fills it as nodes are
/// computed. The input cache is never modified; take the filled one back
/// with [`Evaluator::into_cache`].
pub struct Evaluator<'g> {
    graph: &'g Graph,
    cache: Cache,
    /// Nodes whose inputs are being resolved, outermost first.
    active: IndexSet<NodeId>,
    max_depth: Option<usize>,
    computed: usize,
}

impl<'g> Evaluator<'g> {
    pub fn new(graph: &'g Graph, cache: &Cache) -> Self {
        Self {
            graph,
            cache: cache.clone(),
            active: IndexSet::new(),
            max_depth: None,
            computed: 0,
        }
    }

    /// Limit how many nodes may be under resolution at once.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Number of nodes whose logic actually ran (cache misses).
    pub fn computed(&self) -> usize {
        self.computed
    }

    pub fn into_cache(self) -> Cache {
        self.cache
    }

    /// Get the value of `id`, computing it and its missing producers.
    ///
    /// Producers are resolved with an explicit work stack, so the depth of
    /// the graph is bounded by memory rather than by the thread's stack.
    pub fn evaluate(&mut self, id: &NodeId) -> Result<Arc<NodeValue>> {
        if let Some(value) = self.cache.get(id) {
            trace!(node = %id, "cache hit");
            return Ok(Arc::clone(value));
        }

        let result = self.run(id);
        // A failed run leaves partial work on the stack; values computed
        // before the failure stay cached.
        self.active.clear();
        result
    }

    fn run(&mut self, id: &NodeId) -> Result<Arc<NodeValue>> {
        let graph = self.graph;
        self.enter(id)?;

        while let Some(current) = self.active.last().cloned() {
            let node = graph
                .node(&current)
                .ok_or_else(|| GraphError::NodeNotFound(current.clone()))?;

            match self.pending_producer(node) {
                Some(producer) => {
                    if let Some(position) = self.active.get_index_of(producer) {
                        let mut path: Vec<NodeId> =
                            self.active.iter().skip(position).cloned().collect();
                        path.push(producer.clone());
                        return Err(GraphError::CyclicGraph(path));
                    }
                    self.enter(producer)?;
                }
                None => {
                    self.compute(node);
                    self.active.pop();
                }
            }
        }

        self.cache
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))
    }

    /// Push `id` onto the stack of nodes under resolution.
    fn enter(&mut self, id: &NodeId) -> Result<()> {
        if !self.graph.contains(id) {
            return Err(GraphError::NodeNotFound(id.clone()));
        }
        if let Some(limit) = self.max_depth {
            if self.active.len() >= limit {
                return Err(GraphError::DepthLimitExceeded {
                    node: id.clone(),
                    limit,
                });
            }
        }
        self.active.insert(id.clone());
        Ok(())
    }

    /// The first producer of `node`, in socket then connection order, that
    /// has no cached value yet.
    fn pending_producer<'n>(&self, node: &'n Node) -> Option<&'n NodeId> {
        node.inputs()
            .iter()
            .flatten()
            .map(|connection| &connection.peer)
            .find(|peer| !self.cache.contains(peer))
    }

    /// Run the logic of `node`, whose producers are all cached.
    fn compute(&mut self, node: &Node) {
        let inputs: Vec<Vec<Value>> = node
            .inputs()
            .iter()
            .map(|socket| {
                socket
                    .iter()
                    .map(|connection| {
                        self.cache
                            .get(&connection.peer)
                            .and_then(|producer| producer.output(connection.socket))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        let value = Arc::new(node.kind().definition().evaluate(&inputs, node.config()));
        trace!(node = %node.id(), kind = %node.kind(), value = %value.value(), "computed");

        self.computed += 1;
        self.cache.insert(node.id().clone(), value);
    }

    /// Evaluate `id` and collect its value together with the value of every
    /// node upstream of it, which is what the canvas shows on each socket.
    pub fn trace(&mut self, id: &NodeId) -> Result<IndexMap<NodeId, Arc<NodeValue>>> {
        let mut traced = IndexMap::new();
        traced.insert(id.clone(), self.evaluate(id)?);
        for producer in self.graph.upstream(id) {
            let value = self.evaluate(&producer)?;
            traced.insert(producer, value);
        }
        Ok(traced)
    }
}

/// Evaluate `id` against `graph`, returning its value and the filled cache.
///
/// On error no cache is returned; the caller keeps the one it passed in.
pub fn evaluate_node(graph: &Graph, cache: &Cache, id: &NodeId) -> Result<(Arc<NodeValue>, Cache)> {
    let mut evaluator = Evaluator::new(graph, cache);
    let value = evaluator.evaluate(id)?;
    Ok((value, evaluator.into_cache()))
}

/// Evaluate `id` and return the values of it and its whole upstream closure.
pub fn trace(graph: &Graph, cache: &Cache, id: &NodeId) -> Result<(IndexMap<NodeId, Arc<NodeValue>>, Cache)> {
    let mut evaluator = Evaluator::new(graph, cache);
    let traced = evaluator.trace(id)?;
    Ok((traced, evaluator.into_cache()))
}
