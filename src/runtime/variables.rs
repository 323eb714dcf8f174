//! Variable storage
//!
//! Names are registered by the scanner as soon as they are seen; a
//! declaration later binds a type. A variable is therefore in one of two
//! states: `Unbound` (name known, no type yet) or `Bound` (typed, holding
//! a value). Reading or writing an unbound variable is an error.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::runtime::value::Value;
use crate::types::Type;

/// Binding state of a registered name
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Name seen by the scanner, not yet declared
    Unbound,
    /// Declared variable with its frozen type and current value
    Bound {
        /// Declared type
        ty: Type,
        /// Current value
        value: Value,
    },
}

/// Name of the predeclared host object
pub const STD_NAME: &str = "std";

/// Bounded table of script variables
///
/// Cloning the table snapshots every binding; [`crate::Script::spawn`]
/// relies on this to give each instance independent state.
#[derive(Debug, Clone)]
pub struct VariableTable {
    capacity: usize,
    entries: HashMap<String, Binding>,
}

impl VariableTable {
    /// Create a table holding at most `capacity` variables
    ///
    /// The `std` host object is predeclared and counts against the
    /// capacity.
    pub fn new(capacity: usize) -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            STD_NAME.to_string(),
            Binding::Bound {
                ty: Type::Host,
                value: Value::Host(STD_NAME.to_string()),
            },
        );
        VariableTable { capacity, entries }
    }

    /// True if the name is registered (bound or not)
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// True if the name is registered and declared
    pub fn is_bound(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(Binding::Bound { .. }))
    }

    /// Declared type of a bound variable
    pub fn declared_type(&self, name: &str) -> Option<Type> {
        match self.entries.get(name) {
            Some(Binding::Bound { ty, .. }) => Some(*ty),
            _ => None,
        }
    }

    /// Register a name in the unbound state
    ///
    /// Registering an existing name is a no-op. Returns `false` when the
    /// table is full.
    pub fn register(&mut self, name: &str) -> bool {
        if self.entries.contains_key(name) {
            return true;
        }
        if self.entries.len() >= self.capacity {
            return false;
        }
        self.entries.insert(name.to_string(), Binding::Unbound);
        true
    }

    /// Bind a registered name to a type, setting the type's default value
    pub fn bind(&mut self, name: &str, ty: Type) -> Result<()> {
        let default = ty
            .default_value()
            .ok_or_else(|| Error::runtime(format!("type {} has no default value", ty)))?;
        match self.entries.get_mut(name) {
            None => Err(Error::UndefinedVariable { name: name.to_string() }),
            Some(Binding::Bound { .. }) => {
                Err(Error::runtime(format!("variable '{}' is already declared", name)))
            }
            Some(slot) => {
                *slot = Binding::Bound { ty, value: default };
                Ok(())
            }
        }
    }

    /// Current value of a bound variable
    pub fn get(&self, name: &str) -> Result<Value> {
        match self.entries.get(name) {
            None => Err(Error::UndefinedVariable { name: name.to_string() }),
            Some(Binding::Unbound) => Err(Error::UnboundVariable { name: name.to_string() }),
            Some(Binding::Bound { value, .. }) => Ok(value.clone()),
        }
    }

    /// Store a value in a bound variable
    ///
    /// The value's type must match the declared type exactly; numeric
    /// conversion happens before the store, in the evaluator.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match self.entries.get_mut(name) {
            None => Err(Error::UndefinedVariable { name: name.to_string() }),
            Some(Binding::Unbound) => Err(Error::UnboundVariable { name: name.to_string() }),
            Some(Binding::Bound { ty, value: slot }) => {
                if value.semantic_type() != *ty {
                    return Err(Error::ValueTypeMismatch {
                        name: name.to_string(),
                        expected: ty.name().to_string(),
                        got: value.semantic_type().name().to_string(),
                    });
                }
                *slot = value;
                Ok(())
            }
        }
    }

    /// Number of registered names, including `std`
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if only `std` is registered
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Maximum number of names
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_is_predeclared() {
        let table = VariableTable::new(8);
        assert!(table.is_bound(STD_NAME));
        assert_eq!(table.declared_type(STD_NAME), Some(Type::Host));
    }

    #[test]
    fn test_unbound_lifecycle() {
        let mut table = VariableTable::new(8);
        assert!(table.register("x"));
        assert!(table.contains("x"));
        assert!(!table.is_bound("x"));
        assert!(matches!(table.get("x"), Err(Error::UnboundVariable { .. })));

        table.bind("x", Type::Int).unwrap();
        assert_eq!(table.get("x").unwrap(), Value::Int(0));
        assert!(table.bind("x", Type::Float).is_err());
    }

    #[test]
    fn test_set_checks_type() {
        let mut table = VariableTable::new(8);
        table.register("x");
        table.bind("x", Type::Int).unwrap();
        table.set("x", Value::Int(5)).unwrap();
        assert_eq!(table.get("x").unwrap(), Value::Int(5));
        assert!(matches!(
            table.set("x", Value::Float(1.0)),
            Err(Error::ValueTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_capacity_limit() {
        let mut table = VariableTable::new(2);
        assert!(table.register("a"));
        assert!(!table.register("b"));
        assert!(table.register("a"));
    }

    #[test]
    fn test_clone_is_snapshot() {
        let mut table = VariableTable::new(8);
        table.register("x");
        table.bind("x", Type::Int).unwrap();
        table.set("x", Value::Int(3)).unwrap();

        let mut copy = table.clone();
        copy.set("x", Value::Int(9)).unwrap();
        assert_eq!(table.get("x").unwrap(), Value::Int(3));
        assert_eq!(copy.get("x").unwrap(), Value::Int(9));
    }
}
