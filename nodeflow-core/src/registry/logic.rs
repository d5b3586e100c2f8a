//! Node logic.
//!
//! Pure functions from (per-socket input values, config) to a [`NodeValue`].
//! An unconnected socket falls back to the config slot backing it; only the
//! sink treats "no connection" as `Null`.

use std::borrow::Cow;

use super::NodeKind;
use crate::eval::NodeValue;
use crate::value::Value;

pub(super) fn evaluate(kind: NodeKind, inputs: &[Vec<Value>], config: &[Value]) -> NodeValue {
    match kind {
        NodeKind::Boolean | NodeKind::Number | NodeKind::String => literal(config),
        NodeKind::Add => fold_pair(inputs, config, coerce_addend, sum),
        NodeKind::Subtract => fold_pair(inputs, config, Value::clone, |a, b| {
            arithmetic(a, b, |x, y| x - y)
        }),
        NodeKind::Multiply => fold_pair(inputs, config, Value::clone, |a, b| {
            arithmetic(a, b, |x, y| x * y)
        }),
        // Unguarded IEEE division: x / 0 is +-Infinity, 0 / 0 is NaN.
        NodeKind::Divide => fold_pair(inputs, config, Value::clone, |a, b| {
            arithmetic(a, b, |x, y| x / y)
        }),
        NodeKind::Compare => compare(inputs, config),
        NodeKind::If => conditional(inputs, config),
        NodeKind::Output => sink(inputs),
    }
}

/// Connected values of `socket`, or its config fallback when unconnected.
fn socket_values<'a>(
    inputs: &'a [Vec<Value>],
    config: &'a [Value],
    socket: usize,
    coerce: fn(&Value) -> Value,
) -> Cow<'a, [Value]> {
    match inputs.get(socket) {
        Some(values) if !values.is_empty() => Cow::Borrowed(values),
        _ => Cow::Owned(vec![config.get(socket).map(coerce).unwrap_or_default()]),
    }
}

/// First connected value of `socket`, or its config fallback.
fn first_or_config(inputs: &[Vec<Value>], config: &[Value], socket: usize) -> Value {
    socket_values(inputs, config, socket, Value::clone)
        .first()
        .cloned()
        .unwrap_or_default()
}

fn literal(config: &[Value]) -> NodeValue {
    NodeValue::new(Vec::new(), vec![config.first().cloned().unwrap_or_default()])
}

/// Fold each of the two operand sockets from `Null`, then combine the two
/// results with the same operator.
fn fold_pair(
    inputs: &[Vec<Value>],
    config: &[Value],
    coerce: fn(&Value) -> Value,
    op: fn(Value, Value) -> Value,
) -> NodeValue {
    let resolved: Vec<Value> = (0..2)
        .map(|socket| {
            socket_values(inputs, config, socket, coerce)
                .iter()
                .cloned()
                .fold(Value::Null, op)
        })
        .collect();
    let output = op(resolved[0].clone(), resolved[1].clone());
    NodeValue::new(resolved, vec![output])
}

/// Config operands of an addition become numbers when they read as a
/// non-zero number (`true` included); anything else is kept as typed.
fn coerce_addend(value: &Value) -> Value {
    let n = value.to_number();
    if n != 0.0 && !n.is_nan() {
        Value::Number(n)
    } else {
        value.clone()
    }
}

/// Addition never fails: `Null` is the identity, booleans count as 0 or 1,
/// and any other mix of non-numbers concatenates.
fn sum(acc: Value, val: Value) -> Value {
    match (acc, val) {
        (acc, Value::Null) => acc,
        (Value::Null, val) => val,
        (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (acc @ Value::Boolean(_), val) | (acc, val @ Value::Boolean(_)) => {
            Value::Number(acc.to_number() + val.to_number())
        }
        (acc, val) => Value::String(format!("{acc}{val}")),
    }
}

/// `Null` is the identity for whichever operand it stands in for.
fn arithmetic(acc: Value, val: Value, op: fn(f64, f64) -> f64) -> Value {
    match (acc, val) {
        (acc, Value::Null) => acc,
        (Value::Null, val) => val,
        (acc, val) => Value::Number(op(acc.to_number(), val.to_number())),
    }
}

fn compare(inputs: &[Vec<Value>], config: &[Value]) -> NodeValue {
    let a = first_or_config(inputs, config, 0);
    let b = first_or_config(inputs, config, 1);
    let equal = a == b;
    NodeValue::new(vec![a, b], vec![Value::Boolean(equal)])
}

fn conditional(inputs: &[Vec<Value>], config: &[Value]) -> NodeValue {
    let condition = first_or_config(inputs, config, 0);
    let when_true = first_or_config(inputs, config, 1);
    let when_false = first_or_config(inputs, config, 2);
    let output = match condition {
        Value::Boolean(true) => when_true.clone(),
        Value::Boolean(false) => when_false.clone(),
        _ => Value::Null,
    };
    NodeValue::new(vec![condition, when_true, when_false], vec![output])
}

/// The sink displays what arrives; it mirrors its inputs as outputs.
fn sink(inputs: &[Vec<Value>]) -> NodeValue {
    let resolved: Vec<Value> = inputs
        .iter()
        .map(|values| values.first().cloned().unwrap_or_default())
        .collect();
    NodeValue::new(resolved.clone(), resolved)
}
