//! Tree-walking evaluator
//!
//! Expressions evaluate to a [`Value`] or fail with the first error, left
//! to right. Statements additionally produce a [`Flow`] signal: `break`
//! and `continue` travel up the tree as ordinary return values until a
//! loop consumes them. The same operator kernels back constant folding,
//! so a folded expression and an executed one cannot disagree.

use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::error::{Error, Result};
use crate::lexer::token::OpKind;
use crate::parser::ast::{binary_result, Assignment, Block, CaseValue, Expr, Stmt};
use crate::runtime::registry::MemberRegistry;
use crate::runtime::value::Value;
use crate::runtime::variables::VariableTable;
use crate::types::Type;

/// Upper bound on the size of a repeated string, in bytes
const MAX_STR_REPEAT_BYTES: usize = 1 << 26;

/// Control signal produced by executing a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the next statement
    Normal,
    /// Unwind to the nearest loop and leave it
    Break,
    /// Unwind to the nearest loop and start its next iteration
    Continue,
}

/// Everything a statement needs while executing
pub struct ExecContext<'a> {
    /// Script variable state
    pub variables: &'a mut VariableTable,
    /// Host members
    pub registry: &'a MemberRegistry,
    /// Diagnostic stream (`PRINT` output goes here)
    pub sink: &'a mut (dyn DiagnosticSink + 'a),
}

/// Evaluate an expression
pub fn eval_expr(expr: &Expr, cx: &mut ExecContext<'_>) -> Result<Value> {
    match expr {
        Expr::Constant { value } => Ok(value.clone()),
        Expr::Variable { name, .. } => cx.variables.get(name),
        Expr::Unary { op, arg, .. } => {
            let value = eval_expr(arg, cx)?;
            apply_unary(*op, &value)
        }
        Expr::Binary { op, left, right, ty } => {
            let l = eval_expr(left, cx)?;
            let r = eval_expr(right, cx)?;
            apply_binary(*op, &l, &r, *ty)
        }
        Expr::Ternary { cond, when_true, when_false, .. } => {
            let c = eval_expr(cond, cx)?;
            if c.as_bool().unwrap_or(false) {
                eval_expr(when_true, cx)
            } else {
                eval_expr(when_false, cx)
            }
        }
        Expr::Property { owner, name, .. } => {
            let owner_value = eval_expr(owner, cx)?;
            let property = cx
                .registry
                .find_property(owner_value.semantic_type(), name)
                .ok_or_else(|| Error::UnknownMember {
                    owner: owner_value.semantic_type().name().to_string(),
                    name: name.clone(),
                })?;
            property.read(&owner_value)
        }
        Expr::Method { owner, name, args, .. } => {
            let owner_value = eval_expr(owner, cx)?;
            let mut arg_values = Vec::with_capacity(args.len());
            for arg in args {
                arg_values.push(eval_expr(arg, cx)?);
            }
            let method = cx
                .registry
                .find_method(owner_value.semantic_type(), name)
                .ok_or_else(|| Error::UnknownMember {
                    owner: owner_value.semantic_type().name().to_string(),
                    name: name.clone(),
                })?;
            method.invoke(&owner_value, &arg_values)
        }
        Expr::Construct { owner, args } => {
            let mut arg_values = Vec::with_capacity(args.len());
            let mut arg_types = Vec::with_capacity(args.len());
            for arg in args {
                arg_types.push(arg.ty());
                arg_values.push(eval_expr(arg, cx)?);
            }
            let ctor = cx
                .registry
                .find_constructor(*owner, &arg_types)
                .ok_or_else(|| Error::UnknownConstructor {
                    owner: owner.name().to_string(),
                })?;
            ctor.invoke(&arg_values)
        }
    }
}

/// Execute one statement
pub fn exec_stmt(stmt: &Stmt, cx: &mut ExecContext<'_>) -> Result<Flow> {
    match stmt {
        Stmt::Print(expr) => {
            let value = eval_expr(expr, cx)?;
            cx.sink
                .emit(Diagnostic::global(Severity::Output, value.render()));
            Ok(Flow::Normal)
        }
        Stmt::Expr(expr) => {
            eval_expr(expr, cx)?;
            Ok(Flow::Normal)
        }
        Stmt::Assign(assignment) => {
            exec_assignment(assignment, cx)?;
            Ok(Flow::Normal)
        }
        Stmt::IfChain(arms) => {
            for arm in arms {
                let taken = match &arm.guard {
                    None => true,
                    Some(guard) => eval_expr(guard, cx)?.is_truthy(),
                };
                if taken {
                    return exec_block(&arm.body, cx);
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::Switch { scrutinee, arms } => {
            let value = eval_expr(scrutinee, cx)?;
            for arm in arms {
                if case_matches(arm.matches.as_deref(), &value, cx)? {
                    return exec_block(&arm.body, cx);
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::While { guard, body } => {
            loop {
                if let Some(guard) = guard {
                    if !eval_expr(guard, cx)?.is_truthy() {
                        break;
                    }
                }
                match exec_block(body, cx)? {
                    Flow::Break => break,
                    Flow::Continue | Flow::Normal => {}
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::For { init, guard, step, body } => {
            if let Some(init) = init {
                exec_assignment(init, cx)?;
            }
            loop {
                if !eval_expr(guard, cx)?.is_truthy() {
                    break;
                }
                match exec_block(body, cx)? {
                    Flow::Break => break,
                    Flow::Continue | Flow::Normal => {}
                }
                exec_assignment(step, cx)?;
            }
            Ok(Flow::Normal)
        }
        Stmt::Break => Ok(Flow::Break),
        Stmt::Continue => Ok(Flow::Continue),
    }
}

/// Execute a block, stopping at the first `break`/`continue` signal
pub fn exec_block(block: &Block, cx: &mut ExecContext<'_>) -> Result<Flow> {
    for stmt in &block.statements {
        match exec_stmt(stmt, cx)? {
            Flow::Normal => {}
            signal => return Ok(signal),
        }
    }
    Ok(Flow::Normal)
}

/// Execute an assignment, applying the compound operator and the numeric
/// conversion into the target's type
pub fn exec_assignment(assignment: &Assignment, cx: &mut ExecContext<'_>) -> Result<()> {
    let rhs = eval_expr(&assignment.rvalue, cx)?;
    let computed = if assignment.op == OpKind::Assign {
        rhs
    } else {
        let current = cx.variables.get(&assignment.target)?;
        let result_ty = binary_result(assignment.op, assignment.target_ty, assignment.rvalue.ty())
            .ok_or_else(|| {
                Error::runtime(format!(
                    "operator '{}' is not defined for {}",
                    assignment.op.lexeme(),
                    assignment.target_ty
                ))
            })?;
        apply_binary(assignment.op, &current, &rhs, result_ty)?
    };
    let value = if computed.semantic_type() == assignment.target_ty {
        computed
    } else {
        assignment.target_ty.convert(&computed)?
    };
    cx.variables.set(&assignment.target, value)
}

fn case_matches(
    matches: Option<&[CaseValue]>,
    scrutinee: &Value,
    cx: &mut ExecContext<'_>,
) -> Result<bool> {
    let matches = match matches {
        // the default arm matches anything
        None => return Ok(true),
        Some(values) => values,
    };
    for case in matches {
        let candidate = match case {
            CaseValue::Constant(value) => value.clone(),
            CaseValue::Variable(name) => cx.variables.get(name)?,
        };
        if values_equal(scrutinee, &candidate) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Equality with Int/Float unification
pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

/// Apply a unary operator to a value
pub(crate) fn apply_unary(op: OpKind, value: &Value) -> Result<Value> {
    match (op, value) {
        (OpKind::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (OpKind::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
        (OpKind::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (OpKind::Vneg, Value::Vec2(v)) => Ok(Value::Vec2(v.neg())),
        (OpKind::Char, Value::Int(i)) => {
            let c = u32::try_from(*i)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| Error::runtime(format!("{} is not a valid character code", i)))?;
            Ok(Value::Str(c.to_string()))
        }
        (OpKind::ChCode, Value::Str(s)) => {
            Ok(Value::Int(s.chars().next().map_or(0, |c| c as i64)))
        }
        (op, value) => Err(Error::runtime(format!(
            "operator '{}' cannot be applied to {}",
            op.lexeme(),
            value.semantic_type()
        ))),
    }
}

/// Apply a binary operator to two values
///
/// `result_ty` is the node's frozen type; arithmetic computes in `f64`
/// and casts back when the result type is `int`.
pub(crate) fn apply_binary(op: OpKind, left: &Value, right: &Value, result_ty: Type) -> Result<Value> {
    if op.is_arithmetic() {
        return apply_arithmetic(op, left, right, result_ty);
    }
    if op.is_logical() {
        let (l, r) = match (left.as_bool(), right.as_bool()) {
            (Some(l), Some(r)) => (l, r),
            _ => return Err(operand_error(op, left, right)),
        };
        let result = match op {
            OpKind::Or | OpKind::Or2 => l || r,
            OpKind::And | OpKind::And2 => l && r,
            _ => l ^ r,
        };
        return Ok(Value::Bool(result));
    }
    if op.is_relational() {
        return apply_relational(op, left, right);
    }
    match op {
        OpKind::Concat => Ok(Value::Str(left.render() + &right.render())),
        OpKind::StrMul => match (left, right) {
            (Value::Str(s), Value::Int(n)) => {
                let count = usize::try_from(*n).unwrap_or(0);
                match s.len().checked_mul(count) {
                    Some(total) if total <= MAX_STR_REPEAT_BYTES => {
                        Ok(Value::Str(s.repeat(count)))
                    }
                    _ => Err(Error::runtime(format!(
                        "string repeated {} times exceeds the {} byte limit",
                        n, MAX_STR_REPEAT_BYTES
                    ))),
                }
            }
            _ => Err(operand_error(op, left, right)),
        },
        OpKind::Vadd | OpKind::Vsub | OpKind::DotProduct => match (left, right) {
            (Value::Vec2(l), Value::Vec2(r)) => Ok(Value::Vec2(match op {
                OpKind::Vadd => l.add(*r),
                OpKind::Vsub => l.sub(*r),
                _ => l.mul_components(*r),
            })),
            _ => Err(operand_error(op, left, right)),
        },
        OpKind::Vmul | OpKind::Vdiv => {
            let (v, factor) = match (left, right.as_number()) {
                (Value::Vec2(v), Some(f)) => (v, f),
                _ => return Err(operand_error(op, left, right)),
            };
            if op == OpKind::Vdiv {
                if factor == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(Value::Vec2(v.div(factor)))
            } else {
                Ok(Value::Vec2(v.scale(factor)))
            }
        }
        _ => Err(operand_error(op, left, right)),
    }
}

fn apply_arithmetic(op: OpKind, left: &Value, right: &Value, result_ty: Type) -> Result<Value> {
    if result_ty == Type::Int {
        if let (Value::Int(l), Value::Int(r)) = (left, right) {
            return apply_int_arithmetic(op, *l, *r);
        }
    }
    let (l, r) = match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => (l, r),
        _ => return Err(operand_error(op, left, right)),
    };
    match op {
        OpKind::Div | OpKind::DivInt | OpKind::Mod if r == 0.0 => {
            return Err(Error::DivisionByZero)
        }
        OpKind::Pow => {
            let int_exponent = matches!(right, Value::Int(_));
            if (l < 0.0 && !int_exponent) || (l == 0.0 && r <= 0.0) {
                return Err(Error::InvalidPower { base: l, exponent: r });
            }
        }
        _ => {}
    }
    let result = match op {
        OpKind::Add => l + r,
        OpKind::Sub => l - r,
        OpKind::Mul => l * r,
        OpKind::Div => l / r,
        OpKind::DivInt => (l / r).trunc(),
        OpKind::Mod => l % r,
        _ => l.powf(r),
    };
    if result_ty == Type::Int {
        Ok(Value::Int(result as i64))
    } else {
        Ok(Value::Float(result))
    }
}

/// Int operands with an Int result compute on `i64` directly, wrapping
/// on overflow, so values stay exact across the full integer range
/// (an `f64` round trip loses precision above 2^53)
fn apply_int_arithmetic(op: OpKind, l: i64, r: i64) -> Result<Value> {
    match op {
        OpKind::DivInt | OpKind::Mod if r == 0 => return Err(Error::DivisionByZero),
        OpKind::Pow if l == 0 && r <= 0 => {
            return Err(Error::InvalidPower { base: l as f64, exponent: r as f64 })
        }
        _ => {}
    }
    let result = match op {
        OpKind::Add => l.wrapping_add(r),
        OpKind::Sub => l.wrapping_sub(r),
        OpKind::Mul => l.wrapping_mul(r),
        OpKind::DivInt => l.wrapping_div(r),
        OpKind::Mod => l.wrapping_rem(r),
        OpKind::Pow => {
            if r < 0 {
                // fractional result, truncated toward zero
                (l as f64).powf(r as f64) as i64
            } else {
                l.wrapping_pow(u32::try_from(r).unwrap_or(u32::MAX))
            }
        }
        // `/` always has a Float result type
        _ => return Err(operand_error(op, &Value::Int(l), &Value::Int(r))),
    };
    Ok(Value::Int(result))
}

fn apply_relational(op: OpKind, left: &Value, right: &Value) -> Result<Value> {
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        let result = match op {
            OpKind::Less => l < r,
            OpKind::LessEq => l <= r,
            OpKind::Greater => l > r,
            OpKind::GreaterEq => l >= r,
            OpKind::Eq => l == r,
            _ => l != r,
        };
        return Ok(Value::Bool(result));
    }
    match op {
        OpKind::Eq => Ok(Value::Bool(left == right)),
        OpKind::NotEq => Ok(Value::Bool(left != right)),
        _ => Err(operand_error(op, left, right)),
    }
}

fn operand_error(op: OpKind, left: &Value, right: &Value) -> Error {
    Error::runtime(format!(
        "operator '{}' cannot be applied to {} and {}",
        op.lexeme(),
        left.semantic_type(),
        right.semantic_type()
    ))
}
