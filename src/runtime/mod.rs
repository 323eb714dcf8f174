//! Execution: values, variable state, host members, the evaluator and
//! the cooperative script driver

pub mod eval;
pub mod registry;
pub mod script;
pub mod value;
pub mod variables;

pub use eval::{eval_expr, exec_stmt, ExecContext, Flow};
pub use registry::{Constructor, MemberRegistry, Method, Property};
pub use script::{Program, Script, ScriptConfig, Step};
pub use value::{Value, Vector2};
pub use variables::{Binding, VariableTable};
