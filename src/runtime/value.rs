//! Runtime values

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// Two-component vector value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    /// Horizontal component
    pub x: f64,
    /// Vertical component
    pub y: f64,
}

impl Vector2 {
    /// The zero vector
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    /// Create a vector from components
    pub fn new(x: f64, y: f64) -> Self {
        Vector2 { x, y }
    }

    /// Component-wise sum
    pub fn add(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference
    pub fn sub(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x - other.x, self.y - other.y)
    }

    /// Scale by a scalar
    pub fn scale(self, factor: f64) -> Vector2 {
        Vector2::new(self.x * factor, self.y * factor)
    }

    /// Component-wise product with another vector
    pub fn mul_components(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x * other.x, self.y * other.y)
    }

    /// Divide both components by a scalar
    ///
    /// Divides directly rather than scaling by the reciprocal, which
    /// would lose a bit on quotients like 3/5.
    pub fn div(self, divisor: f64) -> Vector2 {
        Vector2::new(self.x / divisor, self.y / divisor)
    }

    /// Negation of both components
    pub fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }

    /// Euclidean length
    pub fn magnitude(self) -> f64 {
        self.sqr_magnitude().sqrt()
    }

    /// Squared Euclidean length
    pub fn sqr_magnitude(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Unit-length copy; the zero vector normalizes to itself
    pub fn normalized(self) -> Vector2 {
        let m = self.magnitude();
        if m == 0.0 {
            Vector2::ZERO
        } else {
            self.div(m)
        }
    }

    /// Counter-clockwise perpendicular
    pub fn perpendicular(self) -> Vector2 {
        Vector2::new(-self.y, self.x)
    }
}

impl std::fmt::Display for Vector2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A value produced by evaluating an expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// String value
    Str(String),
    /// Vector value
    Vec2(Vector2),
    /// Opaque host object, identified by its registered name
    Host(String),
}

impl Value {
    /// Semantic type of the value
    pub fn semantic_type(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::Bool(_) => Type::Bool,
            Value::Str(_) => Type::String,
            Value::Vec2(_) => Type::Vector2,
            Value::Host(_) => Type::Host,
        }
    }

    /// True for `Int` and `Float`
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Numeric content as `f64`, if the value is numeric
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean content, if the value is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// True if the value differs from its type's default
    ///
    /// This is the truth test loop and branch guards use, so numeric and
    /// string guards work without an explicit comparison.
    pub fn is_truthy(&self) -> bool {
        match self.semantic_type().default_value() {
            Some(default) => *self != default,
            None => true,
        }
    }

    /// Plain-text rendering used by `PRINT` and string concatenation
    pub fn render(&self) -> String {
        match self {
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Str(s) => s.clone(),
            Value::Vec2(v) => v.to_string(),
            Value::Host(name) => format!("<host {}>", name),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}
