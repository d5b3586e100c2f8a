//! Node Type Registry
//!
//! Static definitions for every node kind the engine understands: socket
//! shapes and types, connection limits, config slots with their defaults, and
//! the pure logic that turns resolved inputs into outputs.
//!
//! # Design Decisions
//!
//! 1. The set of kinds is closed. [`NodeKind`] is a plain enum and node logic
//!    is dispatched with an exhaustive `match`, so adding a kind without
//!    logic is a compile error rather than a runtime lookup failure.
//!
//! 2. Definitions are built once, on first use, and handed out as
//!    `&'static NodeTypeDef`. Nothing in the registry is mutable.
//!
//! 3. Hosts address kinds by their registry name (`"numberNode"`,
//!    `"additionNode"`, ...). [`lookup`] is the only place a name becomes a
//!    kind.

mod def;
mod logic;

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::value::Value;

pub use def::{ConfigSlotDef, NodeTypeDef, SlotWidget, SocketDef, SocketWidget};

/// Every kind of node the engine can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "booleanNode")]
    Boolean,
    #[serde(rename = "numberNode")]
    Number,
    #[serde(rename = "stringNode")]
    String,
    #[serde(rename = "additionNode")]
    Add,
    #[serde(rename = "subtractionNode", alias = "subractionNode")]
    Subtract,
    #[serde(rename = "multiplicationNode")]
    Multiply,
    #[serde(rename = "divisionNode")]
    Divide,
    #[serde(rename = "comparisonNode")]
    Compare,
    #[serde(rename = "ifNode")]
    If,
    #[serde(rename = "outputNode")]
    Output,
}

impl NodeKind {
    /// All kinds, in declaration order.
    pub const ALL: [NodeKind; 10] = [
        NodeKind::Boolean,
        NodeKind::Number,
        NodeKind::String,
        NodeKind::Add,
        NodeKind::Subtract,
        NodeKind::Multiply,
        NodeKind::Divide,
        NodeKind::Compare,
        NodeKind::If,
        NodeKind::Output,
    ];

    /// The registry name hosts use to address this kind.
    pub fn type_name(self) -> &'static str {
        match self {
            NodeKind::Boolean => "booleanNode",
            NodeKind::Number => "numberNode",
            NodeKind::String => "stringNode",
            NodeKind::Add => "additionNode",
            NodeKind::Subtract => "subtractionNode",
            NodeKind::Multiply => "multiplicationNode",
            NodeKind::Divide => "divisionNode",
            NodeKind::Compare => "comparisonNode",
            NodeKind::If => "ifNode",
            NodeKind::Output => "outputNode",
        }
    }

    /// The static definition of this kind.
    pub fn definition(self) -> &'static NodeTypeDef {
        &definitions()[self as usize]
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for NodeKind {
    type Err = GraphError;

    fn from_str(name: &str) -> Result<Self> {
        // Graphs saved by older editors carry the misspelled subtraction name.
        if name == "subractionNode" {
            return Ok(NodeKind::Subtract);
        }
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.type_name() == name)
            .ok_or_else(|| GraphError::UnknownNodeType(name.to_string()))
    }
}

static DEFINITIONS: OnceLock<Vec<NodeTypeDef>> = OnceLock::new();

fn definitions() -> &'static [NodeTypeDef] {
    DEFINITIONS.get_or_init(|| NodeKind::ALL.into_iter().map(def::build).collect())
}

/// Look up a definition by registry name.
pub fn lookup(name: &str) -> Result<&'static NodeTypeDef> {
    name.parse::<NodeKind>().map(NodeKind::definition)
}

/// Default config for the named kind, shaped like its config slots.
pub fn produce_default_config(name: &str) -> Result<Vec<Value>> {
    lookup(name).map(NodeTypeDef::default_config)
}

/// Every registered definition, in declaration order.
pub fn all() -> impl Iterator<Item = &'static NodeTypeDef> {
    definitions().iter()
}
