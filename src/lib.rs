//! # linescript
//!
//! An embeddable, line-oriented scripting language with static typing,
//! parse-time constant folding and cooperative single-stepping.
//!
//! Scripts are plain text, one statement per line; blocks are closed by
//! a lone `cls`. Every expression carries a type fixed while the tree is
//! built, so type mismatches are compile errors, not surprises at run
//! time. The host decides what scripts can touch by registering
//! properties, methods and constructors in a [`MemberRegistry`], and it
//! decides when scripts get CPU by resuming them one top-level statement
//! at a time.
//!
//! ## Pipeline
//!
//! ```text
//! source ──Scanner──▶ tokens ──Parser──▶ typed tree ──Script──▶ effects
//! ```
//!
//! 1. **Scan** — [`Scanner`] turns each line into classified tokens,
//!    registering fresh identifiers in the [`VariableTable`].
//! 2. **Parse** — [`Parser`] builds typed statements, folds constant
//!    subtrees and reports every error it finds before giving up.
//! 3. **Execute** — [`Script`] walks the tree; `PRINT` output and all
//!    diagnostics stream through a [`DiagnosticSink`].
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use linescript::{MemberRegistry, MemorySink, Script, ScriptConfig, Step};
//!
//! let source = "\
//! int total
//! int i
//! for i = 1 ; i < 4 ; i += 1
//! total += i
//! cls
//! PRINT total";
//!
//! let mut sink = MemorySink::new();
//! let mut script = Script::compile(
//!     source,
//!     Arc::new(MemberRegistry::with_stdlib()),
//!     &ScriptConfig::default(),
//!     &mut sink,
//! )
//! .unwrap();
//!
//! while script.resume(&mut sink) == Step::Suspended {}
//! assert_eq!(sink.output_lines(), vec!["6"]);
//! ```

pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod types;

pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, Severity};
pub use error::{Error, Result};
pub use lexer::{BracketKind, KeywordKind, OpKind, Scanner, Token, TokenKind};
pub use parser::ast::{Assignment, Block, CaseArm, CaseValue, CondArm, Expr, Stmt};
pub use parser::Parser;
pub use runtime::{
    ExecContext, Flow, MemberRegistry, Program, Script, ScriptConfig, Step, Value, VariableTable,
    Vector2,
};
pub use types::Type;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
