//! Values
//!
//! The dynamic values that flow along edges and live in node configs.
//!
//! Node logic never raises a type error: operands of the wrong variant are
//! coerced with [`Value::to_number`] or rendered through the `Display` impl,
//! which follows the conventions the canvas shows to users (integral numbers
//! print without a fraction, non-finite numbers print as `NaN`, `Infinity`
//! and `-Infinity`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type tag carried by every socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Number,
    String,
    /// Universal wildcard. An `any` input accepts every output type.
    Any,
}

impl ValueType {
    /// Whether an input socket of this type accepts an edge from an output
    /// socket of type `output`.
    pub fn accepts(self, output: ValueType) -> bool {
        self == ValueType::Any || self == output
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Any => "any",
        };
        f.write_str(name)
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric coercion.
    ///
    /// `Null` is 0, booleans are 0 or 1, strings are parsed after trimming
    /// (the empty string is 0, anything unparsable is `NaN`).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
        }
    }

    /// The tag of this value. `Null` has no natural tag and reports `Any`.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Any,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
        }
    }
}

fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_radix(&trimmed[2..], radix);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts spellings like "inf" and "nan" that users never type.
        _ if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

/// Unsigned integer digits after a `0x`/`0o`/`0b` prefix. No sign, fraction
/// or exponent is allowed there.
fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0_f64, |acc, c| {
            c.to_digit(radix)
                .map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

/// Shortest round-trip digits, laid out the way the canvas shows numbers:
/// plain notation for decimal exponents in `-7..21`, otherwise `1.5e+21`.
fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        return f.write_str("NaN");
    }
    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if n == 0.0 {
        // -0 prints as 0
        return f.write_str("0");
    }
    if n < 0.0 {
        f.write_str("-")?;
    }

    let scientific = format!("{:e}", n.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let len = i32::try_from(digits.len()).unwrap_or(i32::MAX);
    // position of the decimal point relative to the first digit
    let point = exponent + 1;

    if len <= point && point <= 21 {
        write!(f, "{digits}{}", "0".repeat((point - len) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        write!(f, "{int}.{frac}")
    } else if -6 < point && point <= 0 {
        write!(f, "0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            write!(f, "{first}e{sign}{}", exponent.unsigned_abs())
        } else {
            write!(f, "{first}.{rest}e{sign}{}", exponent.unsigned_abs())
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => format_number(*n, f),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Non-finite numbers have no JSON form and become `null`.
impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Number::from_f64(n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s),
        }
    }
}

/// Arrays and objects have no `Value` counterpart and are kept as their JSON
/// text.
impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_canvas_conventions() {
        assert_eq!(Value::from(8.0).to_string(), "8");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(-0.0).to_string(), "0");
        assert_eq!(Value::from(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::from(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn display_switches_to_exponent_form_at_the_edges() {
        let cases = [
            (123.456, "123.456"),
            (-2.5, "-2.5"),
            (0.1, "0.1"),
            (0.000001, "0.000001"),
            (1e-7, "1e-7"),
            (1.25e-9, "1.25e-9"),
            (1e20, "100000000000000000000"),
            (1e21, "1e+21"),
            (-1.5e300, "-1.5e+300"),
            (0.1 + 0.2, "0.30000000000000004"),
        ];
        for (n, shown) in cases {
            assert_eq!(Value::from(n).to_string(), shown, "{n:e}");
        }
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(Value::Null.to_number(), 0.0);
        assert_eq!(Value::from(true).to_number(), 1.0);
        assert_eq!(Value::from(" 12 ").to_number(), 12.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert_eq!(Value::from("1e3").to_number(), 1000.0);
        assert!(Value::from("abc").to_number().is_nan());
        assert!(Value::from("nan").to_number().is_nan());
        assert_eq!(Value::from("-Infinity").to_number(), f64::NEG_INFINITY);
    }

    #[test]
    fn prefixed_integer_literals() {
        assert_eq!(Value::from("0x10").to_number(), 16.0);
        assert_eq!(Value::from(" 0XfF ").to_number(), 255.0);
        assert_eq!(Value::from("0o17").to_number(), 15.0);
        assert_eq!(Value::from("0b101").to_number(), 5.0);
        for bad in ["0x", "-0x10", "0x1.8", "0b12", "0o8"] {
            assert!(Value::from(bad).to_number().is_nan(), "{bad}");
        }
    }

    #[test]
    fn wildcard_accepts_everything() {
        assert!(ValueType::Any.accepts(ValueType::Number));
        assert!(ValueType::Number.accepts(ValueType::Number));
        assert!(!ValueType::Number.accepts(ValueType::Any));
        assert!(!ValueType::Boolean.accepts(ValueType::String));
    }

    #[test]
    fn serde_is_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![Value::Null, Value::from(true), Value::from(5), Value::from("x")]
        );
        assert_eq!(serde_json::to_string(&values).unwrap(), r#"[null,true,5.0,"x"]"#);
    }

    #[test]
    fn json_conversion() {
        let json = serde_json::json!(3.5);
        assert_eq!(Value::from(&json), Value::from(3.5));
        assert_eq!(serde_json::Value::from(Value::from(f64::NAN)), serde_json::Value::Null);
        assert_eq!(Value::from(&serde_json::json!([1])), Value::from("[1]"));
    }
}
