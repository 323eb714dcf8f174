//! Typed syntax tree
//!
//! Nodes are built through validating constructors: operands are attached
//! first, then the node computes and freezes its result type, rejecting
//! incompatible operand combinations. Where an operator's meaning depends
//! on operand types (`+` on strings, `*` on vectors, `$` on a string) the
//! constructor substitutes the derived operator kind before typing, so
//! the evaluator never re-inspects operand types.

use crate::error::{Error, Result};
use crate::lexer::token::OpKind;
use crate::runtime::eval::{apply_binary, apply_unary};
use crate::runtime::value::Value;
use crate::types::{numeric_result, Type};

/// An expression node with its frozen result type
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal or folded constant
    Constant {
        /// The constant value
        value: Value,
    },
    /// Reference to a declared variable
    Variable {
        /// Variable name
        name: String,
        /// Declared type at parse time
        ty: Type,
    },
    /// Unary operation
    Unary {
        /// Operator kind (post-substitution)
        op: OpKind,
        /// Operand
        arg: Box<Expr>,
        /// Frozen result type
        ty: Type,
    },
    /// Binary operation
    Binary {
        /// Operator kind (post-substitution)
        op: OpKind,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
        /// Frozen result type
        ty: Type,
    },
    /// Conditional expression
    Ternary {
        /// Boolean condition
        cond: Box<Expr>,
        /// Branch taken when the condition is true
        when_true: Box<Expr>,
        /// Branch taken when the condition is false
        when_false: Box<Expr>,
        /// Frozen result type (both branches share it)
        ty: Type,
    },
    /// Property read resolved against the registry
    Property {
        /// Owner expression
        owner: Box<Expr>,
        /// Member name
        name: String,
        /// Property result type
        ty: Type,
    },
    /// Method call resolved against the registry
    Method {
        /// Owner expression
        owner: Box<Expr>,
        /// Member name
        name: String,
        /// Argument expressions
        args: Vec<Expr>,
        /// Method result type
        ty: Type,
    },
    /// Constructor call resolved against the registry
    Construct {
        /// Constructed type
        owner: Type,
        /// Argument expressions
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Frozen result type of the node
    pub fn ty(&self) -> Type {
        match self {
            Expr::Constant { value } => value.semantic_type(),
            Expr::Variable { ty, .. }
            | Expr::Unary { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Ternary { ty, .. }
            | Expr::Property { ty, .. }
            | Expr::Method { ty, .. } => *ty,
            Expr::Construct { owner, .. } => *owner,
        }
    }

    /// True for a constant node
    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Constant { .. })
    }

    /// Wrap a value as a constant node
    pub fn constant(value: Value) -> Expr {
        Expr::Constant { value }
    }

    /// Reference a declared variable
    pub fn variable(name: impl Into<String>, ty: Type) -> Expr {
        Expr::Variable { name: name.into(), ty }
    }

    /// Build a unary node, substituting the type-dependent forms and
    /// freezing the result type
    pub fn unary(op: OpKind, arg: Expr, line: usize) -> Result<Expr> {
        let arg_ty = arg.ty();
        let op = match (op, arg_ty) {
            (OpKind::Char, Type::String) => OpKind::ChCode,
            (OpKind::Neg, Type::Vector2) => OpKind::Vneg,
            (op, _) => op,
        };
        let ty = match (op, arg_ty) {
            (OpKind::Not, Type::Bool) => Type::Bool,
            (OpKind::Neg, t) if t.is_numeric() => t,
            (OpKind::Vneg, Type::Vector2) => Type::Vector2,
            (OpKind::Char, Type::Int) => Type::String,
            (OpKind::ChCode, Type::String) => Type::Int,
            _ => {
                return Err(Error::TypeError {
                    line,
                    message: format!("operator '{}' is not defined for {}", op.lexeme(), arg_ty),
                })
            }
        };
        Ok(Expr::Unary { op, arg: Box::new(arg), ty })
    }

    /// Build a binary node, substituting the type-dependent forms and
    /// freezing the result type
    pub fn binary(op: OpKind, left: Expr, right: Expr, line: usize) -> Result<Expr> {
        let (lt, rt) = (left.ty(), right.ty());
        let op = substitute_binary(op, lt, rt);
        let ty = binary_result(op, lt, rt).ok_or_else(|| Error::TypeError {
            line,
            message: format!(
                "operator '{}' is not defined for {} and {}",
                op.lexeme(),
                lt,
                rt
            ),
        })?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    /// Build a ternary node
    ///
    /// The condition must be boolean and both branches must share one
    /// type, which becomes the node's type.
    pub fn ternary(cond: Expr, when_true: Expr, when_false: Expr, line: usize) -> Result<Expr> {
        if cond.ty() != Type::Bool {
            return Err(Error::TypeError {
                line,
                message: format!("ternary condition must be bool, found {}", cond.ty()),
            });
        }
        if when_true.ty() != when_false.ty() {
            return Err(Error::TypeError {
                line,
                message: format!(
                    "ternary branches must share a type, found {} and {}",
                    when_true.ty(),
                    when_false.ty()
                ),
            });
        }
        let ty = when_true.ty();
        Ok(Expr::Ternary {
            cond: Box::new(cond),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
            ty,
        })
    }

    /// Build a property node; the parser resolves `ty` from the registry
    pub fn property(owner: Expr, name: impl Into<String>, ty: Type) -> Expr {
        Expr::Property {
            owner: Box::new(owner),
            name: name.into(),
            ty,
        }
    }

    /// Build a method node; the parser resolves `ty` from the registry
    pub fn method(owner: Expr, name: impl Into<String>, args: Vec<Expr>, ty: Type) -> Expr {
        Expr::Method {
            owner: Box::new(owner),
            name: name.into(),
            args,
            ty,
        }
    }

    /// Build a constructor node; the parser resolves the overload
    pub fn construct(owner: Type, args: Vec<Expr>) -> Expr {
        Expr::Construct { owner, args }
    }

    /// Collapse constant subtrees
    ///
    /// Works bottom-up: a node whose operands all folded to constants
    /// evaluates immediately and is replaced by the result. A node whose
    /// evaluation would raise a runtime error is left unfolded so the
    /// error surfaces during execution. A ternary with a constant
    /// condition reduces to its selected branch; the dead branch is
    /// discarded without being evaluated.
    pub fn fold(self) -> Expr {
        match self {
            Expr::Unary { op, arg, ty } => {
                let arg = arg.fold();
                if let Expr::Constant { value } = &arg {
                    if let Ok(folded) = apply_unary(op, value) {
                        return Expr::constant(folded);
                    }
                }
                Expr::Unary { op, arg: Box::new(arg), ty }
            }
            Expr::Binary { op, left, right, ty } => {
                let left = left.fold();
                let right = right.fold();
                if let (Expr::Constant { value: l }, Expr::Constant { value: r }) = (&left, &right)
                {
                    if let Ok(folded) = apply_binary(op, l, r, ty) {
                        return Expr::constant(folded);
                    }
                }
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    ty,
                }
            }
            Expr::Ternary { cond, when_true, when_false, ty } => {
                let cond = cond.fold();
                if let Expr::Constant { value: Value::Bool(b) } = cond {
                    return if b { when_true.fold() } else { when_false.fold() };
                }
                Expr::Ternary {
                    cond: Box::new(cond),
                    when_true,
                    when_false,
                    ty,
                }
            }
            other => other,
        }
    }
}

/// Substitute the type-dependent binary forms
pub(crate) fn substitute_binary(op: OpKind, left: Type, right: Type) -> OpKind {
    match op {
        OpKind::Mul if left == Type::String => OpKind::StrMul,
        OpKind::Add if left == Type::String || right == Type::String => OpKind::Concat,
        _ if left == Type::Vector2 => match op {
            OpKind::Mul if right == Type::Vector2 => OpKind::DotProduct,
            OpKind::Add => OpKind::Vadd,
            OpKind::Sub => OpKind::Vsub,
            OpKind::Mul => OpKind::Vmul,
            OpKind::Div => OpKind::Vdiv,
            other => other,
        },
        other => other,
    }
}

/// Result type of a binary operation, or `None` when undefined
pub(crate) fn binary_result(op: OpKind, left: Type, right: Type) -> Option<Type> {
    if op.is_arithmetic() {
        if !left.is_numeric() || !right.is_numeric() {
            return None;
        }
        return match op {
            OpKind::Div => Some(Type::Float),
            OpKind::DivInt => Some(Type::Int),
            _ => numeric_result(left, right),
        };
    }
    if op.is_logical() {
        return (left == Type::Bool && right == Type::Bool).then_some(Type::Bool);
    }
    if op.is_number_relational() {
        return (left.is_numeric() && right.is_numeric()).then_some(Type::Bool);
    }
    if op.is_relational() {
        // Eq / NotEq: same type, or any numeric pair
        return (left == right || (left.is_numeric() && right.is_numeric()))
            .then_some(Type::Bool);
    }
    match op {
        OpKind::Concat => {
            (left == Type::String || right == Type::String).then_some(Type::String)
        }
        OpKind::StrMul => {
            (left == Type::String && right == Type::Int).then_some(Type::String)
        }
        OpKind::Vmul | OpKind::Vdiv => {
            (left == Type::Vector2 && right.is_numeric()).then_some(Type::Vector2)
        }
        OpKind::Vadd | OpKind::Vsub | OpKind::DotProduct => {
            (left == Type::Vector2 && right == Type::Vector2).then_some(Type::Vector2)
        }
        _ => None,
    }
}

/// An assignment or declaration initialization
///
/// Compound operators are substituted and type-checked at construction:
/// the computed value must land back in the target's declared type, with
/// the usual numeric widening and truncation applied at run time.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Target variable name
    pub target: String,
    /// Target's declared type
    pub target_ty: Type,
    /// `Assign` for plain `=`, the substituted operator for compounds
    pub op: OpKind,
    /// Right-hand expression (already folded)
    pub rvalue: Expr,
}

impl Assignment {
    /// Build and validate an assignment
    pub fn new(
        target: impl Into<String>,
        target_ty: Type,
        op: OpKind,
        rvalue: Expr,
        line: usize,
    ) -> Result<Assignment> {
        let rv_ty = rvalue.ty();
        let op = if op == OpKind::Assign {
            OpKind::Assign
        } else {
            substitute_binary(op, target_ty, rv_ty)
        };

        let compatible = if op == OpKind::Assign {
            target_ty == rv_ty || (target_ty.is_numeric() && rv_ty.is_numeric())
        } else {
            match binary_result(op, target_ty, rv_ty) {
                Some(result) => {
                    result == target_ty || (result.is_numeric() && target_ty.is_numeric())
                }
                None => false,
            }
        };
        if !compatible {
            return Err(Error::TypeError {
                line,
                message: format!(
                    "cannot assign {} to variable of type {}",
                    rv_ty, target_ty
                ),
            });
        }

        Ok(Assignment {
            target: target.into(),
            target_ty,
            op,
            rvalue: rvalue.fold(),
        })
    }
}

/// A sequence of statements forming a block body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    /// Statements in source order
    pub statements: Vec<Stmt>,
}

/// One arm of an `if`/`elif`/`else` chain
#[derive(Debug, Clone, PartialEq)]
pub struct CondArm {
    /// Guard expression; `None` for the `else` arm
    pub guard: Option<Expr>,
    /// Arm body
    pub body: Block,
}

/// A value a `case` arm matches against
#[derive(Debug, Clone, PartialEq)]
pub enum CaseValue {
    /// Literal match value
    Constant(Value),
    /// Match against a variable's value at execution time
    Variable(String),
}

/// One arm of a `switch`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    /// Match values; `None` for the `default` arm, which matches anything
    pub matches: Option<Vec<CaseValue>>,
    /// Arm body
    pub body: Block,
}

/// A statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `PRINT expr`
    Print(Expr),
    /// Bare expression evaluated for its effects
    Expr(Expr),
    /// Assignment or declaration initialization
    Assign(Assignment),
    /// `if`/`elif`/`else` chain; at most one guard-less arm, last
    IfChain(Vec<CondArm>),
    /// `switch` over a numeric scrutinee
    Switch {
        /// Scrutinee expression
        scrutinee: Expr,
        /// Case arms in source order; the `default` arm is last
        arms: Vec<CaseArm>,
    },
    /// `while` / `always` loop; `None` guard loops unconditionally
    While {
        /// Loop guard; `None` for `always`
        guard: Option<Expr>,
        /// Loop body
        body: Block,
    },
    /// `for` loop
    For {
        /// Optional init assignment, run once
        init: Option<Assignment>,
        /// Loop guard
        guard: Expr,
        /// Step assignment, run after each iteration
        step: Assignment,
        /// Loop body
        body: Block,
    },
    /// `break`
    Break,
    /// `continue`
    Continue,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Expr {
        Expr::constant(Value::Int(v))
    }

    fn float(v: f64) -> Expr {
        Expr::constant(Value::Float(v))
    }

    fn string(s: &str) -> Expr {
        Expr::constant(Value::Str(s.to_string()))
    }

    #[test]
    fn test_frozen_types() {
        let e = Expr::binary(OpKind::Add, int(1), int(2), 0).unwrap();
        assert_eq!(e.ty(), Type::Int);
        let e = Expr::binary(OpKind::Add, int(1), float(2.0), 0).unwrap();
        assert_eq!(e.ty(), Type::Float);
        let e = Expr::binary(OpKind::Div, int(1), int(2), 0).unwrap();
        assert_eq!(e.ty(), Type::Float);
        let e = Expr::binary(OpKind::DivInt, float(1.0), int(2), 0).unwrap();
        assert_eq!(e.ty(), Type::Int);
    }

    #[test]
    fn test_type_dependent_substitution() {
        let e = Expr::binary(OpKind::Add, string("a"), int(1), 0).unwrap();
        assert!(matches!(e, Expr::Binary { op: OpKind::Concat, .. }));

        let e = Expr::binary(OpKind::Mul, string("ab"), int(2), 0).unwrap();
        assert!(matches!(e, Expr::Binary { op: OpKind::StrMul, .. }));

        let e = Expr::unary(OpKind::Char, string("a"), 0).unwrap();
        assert!(matches!(e, Expr::Unary { op: OpKind::ChCode, .. }));
        assert_eq!(e.ty(), Type::Int);
    }

    #[test]
    fn test_type_errors() {
        assert!(Expr::binary(OpKind::Add, int(1), Expr::constant(Value::Bool(true)), 0).is_err());
        assert!(Expr::binary(OpKind::And2, int(1), int(2), 0).is_err());
        assert!(Expr::binary(OpKind::StrMul, string("a"), float(2.0), 0).is_err());
        assert!(Expr::ternary(int(1), int(2), int(3), 0).is_err());
        assert!(Expr::ternary(Expr::constant(Value::Bool(true)), int(1), string("x"), 0).is_err());
    }

    #[test]
    fn test_folding() {
        let e = Expr::binary(OpKind::Add, int(2), int(3), 0).unwrap().fold();
        assert_eq!(e, Expr::constant(Value::Int(5)));

        // variables block folding
        let v = Expr::variable("x", Type::Int);
        let e = Expr::binary(OpKind::Add, v, int(3), 0).unwrap().fold();
        assert!(!e.is_constant());
    }

    #[test]
    fn test_fold_leaves_runtime_errors() {
        let e = Expr::binary(OpKind::Div, int(1), int(0), 0).unwrap().fold();
        assert!(!e.is_constant());
    }

    #[test]
    fn test_ternary_short_circuit_fold() {
        // the dead branch would divide by zero; it must be discarded
        let dead = Expr::binary(OpKind::Div, int(1), int(0), 0).unwrap();
        let e = Expr::ternary(Expr::constant(Value::Bool(false)), dead, int(5), 0)
            .unwrap()
            .fold();
        assert_eq!(e, Expr::constant(Value::Int(5)));
    }

    #[test]
    fn test_assignment_validation() {
        // int x; x = 1.9 truncates at run time but types fine
        assert!(Assignment::new("x", Type::Int, OpKind::Assign, float(1.9), 0).is_ok());
        assert!(Assignment::new("x", Type::Int, OpKind::Assign, string("s"), 0).is_err());
        // int x; x /= 2 stays int via conversion
        assert!(Assignment::new("x", Type::Int, OpKind::Div, int(2), 0).is_ok());
        // string s; s += 1 concatenates
        let a = Assignment::new("s", Type::String, OpKind::Add, int(1), 0).unwrap();
        assert_eq!(a.op, OpKind::Concat);
        // int x; x += "a" would produce a string
        assert!(Assignment::new("x", Type::Int, OpKind::Add, string("a"), 0).is_err());
    }
}
