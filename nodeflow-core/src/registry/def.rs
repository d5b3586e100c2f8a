//! Node type definitions.

use serde::Serialize;

use super::{logic, NodeKind};
use crate::eval::NodeValue;
use crate::value::{Value, ValueType};

/// How the canvas draws a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketWidget {
    /// Not drawn as a connectable handle.
    None,
    Show,
}

/// How the canvas draws a config slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotWidget {
    /// Editable field.
    Input,
    /// Read-only display of the node's value.
    Display,
}

/// A named, typed connection point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketDef {
    name: &'static str,
    #[serde(rename = "type")]
    value_type: ValueType,
    /// `None` means unbounded fan-in/out.
    max_connections: Option<usize>,
    widget: SocketWidget,
    show_name: bool,
}

impl SocketDef {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    pub fn widget(&self) -> SocketWidget {
        self.widget
    }

    pub fn show_name(&self) -> bool {
        self.show_name
    }

    /// Whether a socket currently holding `count` connections can take one
    /// more.
    pub fn has_room(&self, count: usize) -> bool {
        self.max_connections.map_or(true, |max| count < max)
    }
}

/// A stored config value and the input socket it backs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSlotDef {
    input_index: usize,
    default_value: Value,
    widget: SlotWidget,
}

impl ConfigSlotDef {
    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    pub fn widget(&self) -> SlotWidget {
        self.widget
    }
}

/// Immutable definition of one node kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeDef {
    kind: NodeKind,
    name: &'static str,
    inputs: Vec<SocketDef>,
    outputs: Vec<SocketDef>,
    config: Vec<ConfigSlotDef>,
    auto_evaluate_on_connect: bool,
}

impl NodeTypeDef {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Display name, e.g. `"Add"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn inputs(&self) -> &[SocketDef] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[SocketDef] {
        &self.outputs
    }

    pub fn input(&self, socket: usize) -> Option<&SocketDef> {
        self.inputs.get(socket)
    }

    pub fn output(&self, socket: usize) -> Option<&SocketDef> {
        self.outputs.get(socket)
    }

    pub fn config_slots(&self) -> &[ConfigSlotDef] {
        &self.config
    }

    /// Whether the host should evaluate this node as soon as an edge lands on
    /// one of its inputs.
    pub fn auto_evaluate_on_connect(&self) -> bool {
        self.auto_evaluate_on_connect
    }

    /// A fresh config built from the slot defaults.
    pub fn default_config(&self) -> Vec<Value> {
        self.config
            .iter()
            .map(|slot| slot.default_value.clone())
            .collect()
    }

    /// Run this kind's logic.
    ///
    /// `inputs` holds, per input socket, the values delivered by its
    /// connections (empty when unconnected).
    pub fn evaluate(&self, inputs: &[Vec<Value>], config: &[Value]) -> NodeValue {
        logic::evaluate(self.kind, inputs, config)
    }
}

fn socket(name: &'static str, value_type: ValueType, max: Option<usize>) -> SocketDef {
    SocketDef {
        name,
        value_type,
        max_connections: max,
        widget: SocketWidget::Show,
        show_name: false,
    }
}

fn hidden(name: &'static str, value_type: ValueType, max: Option<usize>) -> SocketDef {
    SocketDef {
        widget: SocketWidget::None,
        ..socket(name, value_type, max)
    }
}

fn slot(input_index: usize, default_value: impl Into<Value>) -> ConfigSlotDef {
    ConfigSlotDef {
        input_index,
        default_value: default_value.into(),
        widget: SlotWidget::Input,
    }
}

fn literal(kind: NodeKind, name: &'static str, value_type: ValueType, default: Value) -> NodeTypeDef {
    NodeTypeDef {
        kind,
        name,
        inputs: vec![hidden("value", value_type, Some(0))],
        outputs: vec![socket("value", value_type, None)],
        config: vec![slot(0, default)],
        auto_evaluate_on_connect: false,
    }
}

fn binary(kind: NodeKind, name: &'static str, operand: ValueType, output: SocketDef) -> NodeTypeDef {
    NodeTypeDef {
        kind,
        name,
        inputs: vec![socket("a", operand, Some(1)), socket("b", operand, Some(1))],
        outputs: vec![output],
        config: vec![slot(0, 0), slot(1, 0)],
        auto_evaluate_on_connect: false,
    }
}

pub(super) fn build(kind: NodeKind) -> NodeTypeDef {
    match kind {
        NodeKind::Boolean => literal(kind, "Boolean", ValueType::Boolean, false.into()),
        NodeKind::Number => literal(kind, "Number", ValueType::Number, 0.into()),
        NodeKind::String => literal(kind, "String", ValueType::String, "".into()),
        NodeKind::Add => binary(kind, "Add", ValueType::Any, socket("sum", ValueType::Any, None)),
        NodeKind::Subtract => binary(
            kind,
            "Subtract",
            ValueType::Number,
            socket("difference", ValueType::Any, None),
        ),
        NodeKind::Multiply => binary(
            kind,
            "Multiply",
            ValueType::Number,
            socket("product", ValueType::Any, None),
        ),
        NodeKind::Divide => binary(
            kind,
            "Divide",
            ValueType::Number,
            socket("quotient", ValueType::Any, None),
        ),
        NodeKind::Compare => binary(
            kind,
            "Compare",
            ValueType::Any,
            socket("isEqual", ValueType::Boolean, None),
        ),
        NodeKind::If => NodeTypeDef {
            kind,
            name: "If",
            inputs: vec![
                socket("condition", ValueType::Boolean, Some(1)),
                socket("trueValue", ValueType::Any, Some(1)),
                socket("falseValue", ValueType::Any, Some(1)),
            ],
            outputs: vec![socket("output", ValueType::Any, None)],
            config: vec![slot(0, false), slot(1, 0), slot(2, 0)],
            auto_evaluate_on_connect: false,
        },
        NodeKind::Output => NodeTypeDef {
            kind,
            name: "Output",
            inputs: vec![hidden("input", ValueType::Any, Some(1))],
            outputs: Vec::new(),
            config: vec![ConfigSlotDef {
                widget: SlotWidget::Display,
                ..slot(0, " ")
            }],
            auto_evaluate_on_connect: true,
        },
    }
}
