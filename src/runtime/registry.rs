//! Host member registry
//!
//! Properties, methods and constructors are registered explicitly against
//! an owner [`Type`]; the parser resolves member accesses and constructor
//! calls by lookup, and the evaluator invokes the stored callables. No
//! scanning or reflection: what is registered is exactly what scripts can
//! reach.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::runtime::value::{Value, Vector2};
use crate::types::Type;

/// Callable backing a property or method
///
/// Receives the owner value and the evaluated arguments.
pub type MemberFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value> + Send + Sync>;

/// Callable backing a constructor
pub type ConstructorFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A registered readable property
#[derive(Clone)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Owner type
    pub owner: Type,
    /// Result type
    pub ret: Type,
    call: MemberFn,
}

impl Property {
    /// Read the property from an owner value
    pub fn read(&self, owner: &Value) -> Result<Value> {
        (self.call)(owner, &[])
    }
}

/// A registered callable method
#[derive(Clone)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Owner type
    pub owner: Type,
    /// Parameter types; `Type::Object` accepts anything
    pub params: Vec<Type>,
    /// Result type
    pub ret: Type,
    call: MemberFn,
}

impl Method {
    /// Invoke the method, widening `Int` arguments into `Float`
    /// parameter slots first
    pub fn invoke(&self, owner: &Value, args: &[Value]) -> Result<Value> {
        let mut converted = Vec::with_capacity(args.len());
        for (param, arg) in self.params.iter().zip(args) {
            if *param == Type::Object || arg.semantic_type() == *param {
                converted.push(arg.clone());
            } else {
                converted.push(param.convert(arg)?);
            }
        }
        (self.call)(owner, &converted)
    }
}

/// A registered constructor
#[derive(Clone)]
pub struct Constructor {
    /// Constructed type
    pub owner: Type,
    /// Parameter types
    pub params: Vec<Type>,
    call: ConstructorFn,
}

impl Constructor {
    /// Invoke the constructor, widening `Int` arguments into `Float`
    /// parameter slots first
    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        let mut converted = Vec::with_capacity(args.len());
        for (param, arg) in self.params.iter().zip(args) {
            if *param == Type::Object {
                converted.push(arg.clone());
            } else {
                converted.push(param.convert(arg)?);
            }
        }
        (self.call)(&converted)
    }
}

/// Registry of members reachable from scripts
#[derive(Clone, Default)]
pub struct MemberRegistry {
    properties: HashMap<(Type, String), Property>,
    methods: HashMap<(Type, String), Method>,
    constructors: HashMap<Type, Vec<Constructor>>,
}

impl MemberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the standard members installed
    pub fn with_stdlib() -> Self {
        let mut registry = Self::new();
        registry.install_stdlib();
        registry
    }

    /// Register a property
    pub fn register_property(
        &mut self,
        owner: Type,
        name: impl Into<String>,
        ret: Type,
        call: MemberFn,
    ) {
        let name = name.into();
        self.properties.insert(
            (owner, name.clone()),
            Property { name, owner, ret, call },
        );
    }

    /// Register a method
    pub fn register_method(
        &mut self,
        owner: Type,
        name: impl Into<String>,
        params: Vec<Type>,
        ret: Type,
        call: MemberFn,
    ) {
        let name = name.into();
        self.methods.insert(
            (owner, name.clone()),
            Method { name, owner, params, ret, call },
        );
    }

    /// Register a constructor
    pub fn register_constructor(&mut self, owner: Type, params: Vec<Type>, call: ConstructorFn) {
        self.constructors
            .entry(owner)
            .or_default()
            .push(Constructor { owner, params, call });
    }

    /// Look up a property by owner type and name
    pub fn find_property(&self, owner: Type, name: &str) -> Option<&Property> {
        self.properties.get(&(owner, name.to_string()))
    }

    /// Look up a method by owner type and name
    pub fn find_method(&self, owner: Type, name: &str) -> Option<&Method> {
        self.methods.get(&(owner, name.to_string()))
    }

    /// Find the first constructor of `owner` whose parameters accept the
    /// argument types
    pub fn find_constructor(&self, owner: Type, args: &[Type]) -> Option<&Constructor> {
        self.constructors.get(&owner)?.iter().find(|c| {
            c.params.len() == args.len()
                && c.params.iter().zip(args).all(|(p, a)| p.accepts(*a))
        })
    }

    /// Install the standard string, vector and `std` members
    fn install_stdlib(&mut self) {
        // string members
        self.register_property(
            Type::String,
            "len",
            Type::Int,
            Arc::new(|owner, _| match owner {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(type_mismatch("len", other)),
            }),
        );
        self.register_method(
            Type::String,
            "get",
            vec![Type::Int],
            Type::String,
            Arc::new(|owner, args| {
                let s = match owner {
                    Value::Str(s) => s,
                    other => return Err(type_mismatch("get", other)),
                };
                let index = match args.first() {
                    Some(Value::Int(i)) => *i,
                    _ => return Err(Error::HostCallFailed {
                        member: "get".to_string(),
                        reason: "index must be an int".to_string(),
                    }),
                };
                let c = usize::try_from(index)
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .ok_or_else(|| Error::HostCallFailed {
                        member: "get".to_string(),
                        reason: format!("index {} out of range", index),
                    })?;
                Ok(Value::Str(c.to_string()))
            }),
        );

        // vector2 members
        self.register_vector_property("x", |v| Value::Float(v.x));
        self.register_vector_property("y", |v| Value::Float(v.y));
        self.register_vector_property("magnitude", |v| Value::Float(v.magnitude()));
        self.register_vector_property("sqrMagnitude", |v| Value::Float(v.sqr_magnitude()));
        self.register_property(
            Type::Vector2,
            "normalized",
            Type::Vector2,
            Arc::new(|owner, _| match owner {
                Value::Vec2(v) => Ok(Value::Vec2(v.normalized())),
                other => Err(type_mismatch("normalized", other)),
            }),
        );
        self.register_property(
            Type::Vector2,
            "perpendicular",
            Type::Vector2,
            Arc::new(|owner, _| match owner {
                Value::Vec2(v) => Ok(Value::Vec2(v.perpendicular())),
                other => Err(type_mismatch("perpendicular", other)),
            }),
        );
        self.register_constructor(
            Type::Vector2,
            vec![Type::Float, Type::Float],
            Arc::new(|args| match (args.first(), args.get(1)) {
                (Some(Value::Float(x)), Some(Value::Float(y))) => {
                    Ok(Value::Vec2(Vector2::new(*x, *y)))
                }
                _ => Err(Error::HostCallFailed {
                    member: "vector2".to_string(),
                    reason: "expected two float components".to_string(),
                }),
            }),
        );

        // std host constants
        self.register_std_constant("maxInt", Value::Int(i64::MAX));
        self.register_std_constant("minInt", Value::Int(i64::MIN));
        self.register_std_constant("maxFloat", Value::Float(f64::MAX));
        self.register_std_constant("minFloat", Value::Float(f64::MIN));
        self.register_std_constant("pi", Value::Float(std::f64::consts::PI));
        self.register_std_constant("e", Value::Float(std::f64::consts::E));
    }

    fn register_vector_property(&mut self, name: &str, read: fn(Vector2) -> Value) {
        let member = name.to_string();
        self.register_property(
            Type::Vector2,
            name,
            Type::Float,
            Arc::new(move |owner, _| match owner {
                Value::Vec2(v) => Ok(read(*v)),
                other => Err(type_mismatch(&member, other)),
            }),
        );
    }

    fn register_std_constant(&mut self, name: &str, value: Value) {
        let ret = value.semantic_type();
        self.register_property(
            Type::Host,
            name,
            ret,
            Arc::new(move |_, _| Ok(value.clone())),
        );
    }
}

impl std::fmt::Debug for MemberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberRegistry")
            .field("properties", &self.properties.len())
            .field("methods", &self.methods.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

fn type_mismatch(member: &str, owner: &Value) -> Error {
    Error::HostCallFailed {
        member: member.to_string(),
        reason: format!("not defined for {}", owner.semantic_type()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdlib_lookup() {
        let registry = MemberRegistry::with_stdlib();
        let len = registry.find_property(Type::String, "len").unwrap();
        assert_eq!(len.ret, Type::Int);
        let get = registry.find_method(Type::String, "get").unwrap();
        assert_eq!(get.params, vec![Type::Int]);
        assert!(registry.find_property(Type::Int, "len").is_none());
        assert!(registry.find_property(Type::String, "size").is_none());
    }

    #[test]
    fn test_string_members() {
        let registry = MemberRegistry::with_stdlib();
        let owner = Value::Str("hello".to_string());
        let len = registry.find_property(Type::String, "len").unwrap();
        assert_eq!(len.read(&owner).unwrap(), Value::Int(5));

        let get = registry.find_method(Type::String, "get").unwrap();
        assert_eq!(
            get.invoke(&owner, &[Value::Int(1)]).unwrap(),
            Value::Str("e".to_string())
        );
        assert!(get.invoke(&owner, &[Value::Int(9)]).is_err());
    }

    #[test]
    fn test_vector_members() {
        let registry = MemberRegistry::with_stdlib();
        let owner = Value::Vec2(Vector2::new(3.0, 4.0));
        let mag = registry.find_property(Type::Vector2, "magnitude").unwrap();
        assert_eq!(mag.read(&owner).unwrap(), Value::Float(5.0));
    }

    #[test]
    fn test_constructor_widens_ints() {
        let registry = MemberRegistry::with_stdlib();
        let ctor = registry
            .find_constructor(Type::Vector2, &[Type::Int, Type::Float])
            .unwrap();
        let v = ctor.invoke(&[Value::Int(1), Value::Float(2.0)]).unwrap();
        assert_eq!(v, Value::Vec2(Vector2::new(1.0, 2.0)));
        assert!(registry
            .find_constructor(Type::Vector2, &[Type::String, Type::Float])
            .is_none());
        assert!(registry.find_constructor(Type::Vector2, &[Type::Float]).is_none());
    }

    #[test]
    fn test_std_constants() {
        let registry = MemberRegistry::with_stdlib();
        let owner = Value::Host("std".to_string());
        let pi = registry.find_property(Type::Host, "pi").unwrap();
        assert_eq!(pi.read(&owner).unwrap(), Value::Float(std::f64::consts::PI));
        let max = registry.find_property(Type::Host, "maxInt").unwrap();
        assert_eq!(max.read(&owner).unwrap(), Value::Int(i64::MAX));
    }
}
