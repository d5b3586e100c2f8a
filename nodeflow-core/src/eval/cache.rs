//! Evaluation cache.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::graph::NodeId;
use crate::value::Value;

static NULL: Value = Value::Null;

/// The result of evaluating one node.
///
/// `inputs` holds the resolved value of each input socket (after config
/// fallback), `outputs` the value produced on each output socket. The
/// consumer of output socket *k* receives `outputs[k]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeValue {
    inputs: Vec<Value>,
    outputs: Vec<Value>,
}

impl NodeValue {
    pub fn new(inputs: Vec<Value>, outputs: Vec<Value>) -> Self {
        Self { inputs, outputs }
    }

    pub fn inputs(&self) -> &[Value] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Value] {
        &self.outputs
    }

    /// The value on output socket `socket`.
    pub fn output(&self, socket: usize) -> Option<&Value> {
        self.outputs.get(socket)
    }

    /// The node's primary value: its first output, or `Null`.
    pub fn value(&self) -> &Value {
        self.outputs.first().unwrap_or(&NULL)
    }
}

/// Memoized node values, keyed by node id.
///
/// An entry is valid only while the node's config and its whole upstream
/// closure are unchanged. The mutation side purges entries through
/// [`mark_dirty`](crate::graph::mark_dirty); the evaluator fills them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cache {
    entries: IndexMap<NodeId, Arc<NodeValue>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Arc<NodeValue>> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Arc<NodeValue>)> {
        self.entries.iter()
    }

    pub(crate) fn insert(&mut self, id: NodeId, value: Arc<NodeValue>) {
        self.entries.insert(id, value);
    }

    /// A copy of this cache without the given entries.
    pub fn without(&self, ids: &IndexSet<NodeId>) -> Cache {
        let entries = self
            .entries
            .iter()
            .filter(|(id, _)| !ids.contains(*id))
            .map(|(id, value)| (id.clone(), Arc::clone(value)))
            .collect();
        Cache { entries }
    }
}
