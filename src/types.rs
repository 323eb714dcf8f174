//! Semantic type system
//!
//! Every expression node carries exactly one [`Type`], fixed when the node
//! is built. The set is closed: scripts cannot define new types, and the
//! interpreter dispatches over this enum instead of a type hierarchy.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::runtime::value::{Value, Vector2};

/// Semantic type of a value or expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point number
    Float,
    /// Boolean
    Bool,
    /// Immutable text
    String,
    /// Two-component vector
    Vector2,
    /// Opaque host object exposing registered members
    Host,
    /// Universal escape type: matches any parameter slot
    Object,
    /// Absence of a value
    Void,
}

impl Type {
    /// Resolve a source-level type name
    ///
    /// Only declarable types have names; `host`, `object` and `void`
    /// cannot be written in scripts.
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "int" => Some(Type::Int),
            "float" => Some(Type::Float),
            "bool" => Some(Type::Bool),
            "string" => Some(Type::String),
            "vector2" => Some(Type::Vector2),
            _ => None,
        }
    }

    /// Source-level name of the type
    pub fn name(&self) -> &'static str {
        match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::Bool => "bool",
            Type::String => "string",
            Type::Vector2 => "vector2",
            Type::Host => "host",
            Type::Object => "object",
            Type::Void => "void",
        }
    }

    /// True for `int` and `float`
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Default value a declaration without an initializer receives
    ///
    /// `Object` and `Void` have no value and yield `None`.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Type::Int => Some(Value::Int(0)),
            Type::Float => Some(Value::Float(0.0)),
            Type::Bool => Some(Value::Bool(false)),
            Type::String => Some(Value::Str(String::new())),
            Type::Vector2 => Some(Value::Vec2(Vector2::ZERO)),
            Type::Host => Some(Value::Host("std".to_string())),
            Type::Object | Type::Void => None,
        }
    }

    /// True if a value of type `from` may occupy a slot of this type
    ///
    /// Exact matches always pass, `Object` accepts everything, and an
    /// `Int` widens into a `Float` slot.
    pub fn accepts(&self, from: Type) -> bool {
        *self == from || *self == Type::Object || (*self == Type::Float && from == Type::Int)
    }

    /// Convert a value to this type
    ///
    /// Numeric conversions truncate toward zero; other targets require a
    /// matching value and fail otherwise.
    pub fn convert(&self, value: &Value) -> Result<Value> {
        let converted = match (self, value) {
            (Type::Int, Value::Int(i)) => Some(Value::Int(*i)),
            (Type::Int, Value::Float(f)) => Some(Value::Int(*f as i64)),
            (Type::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
            (Type::Float, Value::Float(f)) => Some(Value::Float(*f)),
            (Type::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
            (Type::String, Value::Str(s)) => Some(Value::Str(s.clone())),
            (Type::Vector2, Value::Vec2(v)) => Some(Value::Vec2(*v)),
            (Type::Host, Value::Host(h)) => Some(Value::Host(h.clone())),
            (Type::Object, v) => Some(v.clone()),
            _ => None,
        };
        converted.ok_or_else(|| Error::ConversionError {
            value: value.render(),
            target: self.name().to_string(),
        })
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result type of a binary numeric operation
///
/// Mixed operands widen to `Float`; two `Int`s stay `Int`.
pub fn numeric_result(left: Type, right: Type) -> Option<Type> {
    if !left.is_numeric() || !right.is_numeric() {
        return None;
    }
    if left == Type::Float || right == Type::Float {
        Some(Type::Float)
    } else {
        Some(Type::Int)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for ty in [Type::Int, Type::Float, Type::Bool, Type::String, Type::Vector2] {
            assert_eq!(Type::from_name(ty.name()), Some(ty));
        }
        assert_eq!(Type::from_name("host"), None);
        assert_eq!(Type::from_name("object"), None);
        assert_eq!(Type::from_name("void"), None);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Type::Int.default_value(), Some(Value::Int(0)));
        assert_eq!(Type::Bool.default_value(), Some(Value::Bool(false)));
        assert_eq!(Type::String.default_value(), Some(Value::Str(String::new())));
        assert_eq!(Type::Vector2.default_value(), Some(Value::Vec2(Vector2::ZERO)));
        assert_eq!(Type::Void.default_value(), None);
    }

    #[test]
    fn test_widening() {
        assert!(Type::Float.accepts(Type::Int));
        assert!(!Type::Int.accepts(Type::Float));
        assert!(Type::Object.accepts(Type::Vector2));
        assert_eq!(numeric_result(Type::Int, Type::Float), Some(Type::Float));
        assert_eq!(numeric_result(Type::Int, Type::Int), Some(Type::Int));
        assert_eq!(numeric_result(Type::Int, Type::Bool), None);
    }

    #[test]
    fn test_convert_truncates() {
        let v = Type::Int.convert(&Value::Float(-2.9)).unwrap();
        assert_eq!(v, Value::Int(-2));
        assert!(Type::Bool.convert(&Value::Int(1)).is_err());
    }
}
