//! Compiled programs and cooperative execution
//!
//! [`Script::compile`] runs the scanner and parser and yields a script
//! instance. The parse product — the statement list plus the initial
//! variable table — is an immutable [`Program`] behind an [`Arc`], so
//! [`Script::spawn`] can create any number of instances sharing one tree
//! while owning independent state.
//!
//! Execution is cooperative: [`Script::resume`] runs exactly one
//! top-level statement (a loop or conditional counts as one, body
//! included) and returns a [`Step`], so a host can interleave many
//! scripts on one thread. [`Script::run`] drives `resume` to completion.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, Result};
use crate::lexer::scanner::Scanner;
use crate::lexer::token::Token;
use crate::parser::ast::Stmt;
use crate::parser::Parser;
use crate::runtime::eval::{exec_stmt, ExecContext, Flow};
use crate::runtime::registry::MemberRegistry;
use crate::runtime::value::Value;
use crate::runtime::variables::VariableTable;

/// Compilation limits and knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Maximum number of variable names a script may register,
    /// including the predeclared `std`
    #[serde(default = "default_max_variables")]
    pub max_variables: usize,
    /// Top-level statements executed per [`Script::resume`] call
    #[serde(default = "default_statements_per_resume")]
    pub statements_per_resume: usize,
}

fn default_max_variables() -> usize {
    1024
}

fn default_statements_per_resume() -> usize {
    1
}

impl Default for ScriptConfig {
    fn default() -> Self {
        ScriptConfig {
            max_variables: default_max_variables(),
            statements_per_resume: default_statements_per_resume(),
        }
    }
}

/// Immutable product of a successful parse
#[derive(Debug, Clone)]
pub struct Program {
    statements: Vec<Stmt>,
    initial_variables: VariableTable,
}

impl Program {
    /// Number of top-level statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// True for a program with no statements
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Outcome of one [`Script::resume`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A statement ran; more remain
    Suspended,
    /// The last statement ran; the script is done
    Finished,
    /// A runtime error was reported; the script will not continue
    Failed,
}

/// A runnable script instance
///
/// Owns its variable state and statement cursor; the program tree and
/// member registry are shared. Resuming takes `&mut self`, so a script
/// cannot re-enter itself.
#[derive(Debug, Clone)]
pub struct Script {
    program: Arc<Program>,
    registry: Arc<MemberRegistry>,
    variables: VariableTable,
    cursor: usize,
    failed: bool,
    statements_per_resume: usize,
}

impl Script {
    /// Compile source text into a script
    ///
    /// All lexical and syntax diagnostics go to `sink`; compilation
    /// fails with the collected error count if any line was rejected.
    pub fn compile(
        source: &str,
        registry: Arc<MemberRegistry>,
        config: &ScriptConfig,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Script> {
        let mut variables = VariableTable::new(config.max_variables);
        let mut rows: Vec<Option<Vec<Token>>> = Vec::new();
        for (line_no, line) in source.lines().enumerate() {
            match Scanner::analyse(line, line_no, &mut variables) {
                Ok(tokens) => rows.push(Some(tokens)),
                Err(e) => {
                    sink.report(&e);
                    rows.push(None);
                }
            }
        }

        let statements = Parser::new(&rows, &registry, &mut variables, sink).parse()?;
        tracing::debug!(
            target: "linescript",
            lines = rows.len(),
            statements = statements.len(),
            variables = variables.len(),
            "compiled script"
        );

        let program = Arc::new(Program {
            statements,
            initial_variables: variables,
        });
        Ok(Self::instantiate(
            program,
            registry,
            config.statements_per_resume,
        ))
    }

    fn instantiate(
        program: Arc<Program>,
        registry: Arc<MemberRegistry>,
        statements_per_resume: usize,
    ) -> Script {
        let variables = program.initial_variables.clone();
        Script {
            program,
            registry,
            variables,
            cursor: 0,
            failed: false,
            statements_per_resume: statements_per_resume.max(1),
        }
    }

    /// Create a fresh instance sharing this script's program tree
    ///
    /// The new instance starts at the first statement with pristine
    /// variable state, regardless of how far this one has run.
    pub fn spawn(&self) -> Script {
        Self::instantiate(
            Arc::clone(&self.program),
            Arc::clone(&self.registry),
            self.statements_per_resume,
        )
    }

    /// The shared program
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Current variable state
    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Read a variable of the running instance
    pub fn variable(&self, name: &str) -> Result<Value> {
        self.variables.get(name)
    }

    /// Index of the next top-level statement to run
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// True once every statement has run
    pub fn is_finished(&self) -> bool {
        !self.failed && self.cursor >= self.program.statements.len()
    }

    /// True once a runtime error stopped the script
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Run the next slice of top-level statements
    ///
    /// The slice size is [`ScriptConfig::statements_per_resume`], one by
    /// default. Runtime errors are reported to `sink` and latch the
    /// script into the failed state; further calls keep returning
    /// [`Step::Failed`].
    pub fn resume(&mut self, sink: &mut dyn DiagnosticSink) -> Step {
        if self.failed {
            return Step::Failed;
        }
        for _ in 0..self.statements_per_resume {
            match self.step(sink) {
                Ok(true) => return Step::Finished,
                Ok(false) => {}
                Err(e) => {
                    sink.report(&e);
                    self.failed = true;
                    return Step::Failed;
                }
            }
        }
        Step::Suspended
    }

    /// Run to completion
    pub fn run(&mut self, sink: &mut dyn DiagnosticSink) -> Result<()> {
        if self.failed {
            return Err(Error::runtime("script has already failed"));
        }
        loop {
            match self.step(sink) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => {
                    sink.report(&e);
                    self.failed = true;
                    return Err(e);
                }
            }
        }
    }

    fn step(&mut self, sink: &mut dyn DiagnosticSink) -> Result<bool> {
        let program = Arc::clone(&self.program);
        let Some(stmt) = program.statements.get(self.cursor) else {
            return Ok(true);
        };
        tracing::trace!(target: "linescript", cursor = self.cursor, "executing statement");

        let mut cx = ExecContext {
            variables: &mut self.variables,
            registry: &self.registry,
            sink,
        };
        match exec_stmt(stmt, &mut cx)? {
            Flow::Normal => {}
            Flow::Break => return Err(Error::InvalidBreak),
            Flow::Continue => return Err(Error::InvalidContinue),
        }
        self.cursor += 1;
        Ok(self.cursor >= program.statements.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;

    fn compile(source: &str) -> (Script, MemorySink) {
        let mut sink = MemorySink::new();
        let script = Script::compile(
            source,
            Arc::new(MemberRegistry::with_stdlib()),
            &ScriptConfig::default(),
            &mut sink,
        )
        .expect("compilation failed");
        (script, sink)
    }

    #[test]
    fn test_resume_runs_one_statement_at_a_time() {
        let (mut script, mut sink) = compile("PRINT 1\nPRINT 2\nPRINT 3");
        assert_eq!(script.program().len(), 3);

        assert_eq!(script.resume(&mut sink), Step::Suspended);
        assert_eq!(sink.output_lines(), vec!["1"]);
        assert_eq!(script.resume(&mut sink), Step::Suspended);
        assert_eq!(script.resume(&mut sink), Step::Finished);
        assert_eq!(sink.output_lines(), vec!["1", "2", "3"]);
        assert!(script.is_finished());
        assert_eq!(script.resume(&mut sink), Step::Finished);
    }

    #[test]
    fn test_loop_is_one_step() {
        let (mut script, mut sink) = compile("int i\nwhile i < 3\ni += 1\ncls\nPRINT i");
        // declaration
        assert_eq!(script.resume(&mut sink), Step::Suspended);
        // the whole loop
        assert_eq!(script.resume(&mut sink), Step::Suspended);
        assert_eq!(script.variable("i").unwrap(), Value::Int(3));
        assert_eq!(script.resume(&mut sink), Step::Finished);
        assert_eq!(sink.output_lines(), vec!["3"]);
    }

    #[test]
    fn test_runtime_failure_latches() {
        let (mut script, mut sink) = compile("int x\nint y\nx = 1 // y");
        assert_eq!(script.resume(&mut sink), Step::Suspended);
        assert_eq!(script.resume(&mut sink), Step::Suspended);
        assert_eq!(script.resume(&mut sink), Step::Failed);
        assert!(script.has_failed());
        assert_eq!(script.resume(&mut sink), Step::Failed);
        assert_eq!(sink.count(crate::diagnostics::Severity::RuntimeError), 1);
    }

    #[test]
    fn test_top_level_break_is_an_error() {
        let (mut script, mut sink) = compile("break");
        assert_eq!(script.resume(&mut sink), Step::Failed);
    }

    #[test]
    fn test_spawn_shares_tree_not_state() {
        let (mut script, mut sink) = compile("int x\nx = x + 1\nPRINT x");
        let mut sibling = script.spawn();

        script.run(&mut sink).unwrap();
        assert_eq!(script.variable("x").unwrap(), Value::Int(1));

        // the sibling starts from scratch
        assert_eq!(sibling.cursor(), 0);
        assert_eq!(sibling.variable("x").unwrap(), Value::Int(0));
        let mut sink2 = MemorySink::new();
        sibling.run(&mut sink2).unwrap();
        assert_eq!(sink2.output_lines(), vec!["1"]);
    }

    #[test]
    fn test_spawn_after_run_is_pristine() {
        let (mut script, mut sink) = compile("int x\nx = 41\nx += 1");
        script.run(&mut sink).unwrap();
        assert_eq!(script.variable("x").unwrap(), Value::Int(42));
        let sibling = script.spawn();
        assert_eq!(sibling.variable("x").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_compile_error_reports_count() {
        let mut sink = MemorySink::new();
        let result = Script::compile(
            "int x = \nPRINT (",
            Arc::new(MemberRegistry::with_stdlib()),
            &ScriptConfig::default(),
            &mut sink,
        );
        assert!(matches!(result, Err(Error::ParseFailed { .. })));
        assert!(sink.has_errors());
    }

    #[test]
    fn test_statement_granularity_config() {
        let mut sink = MemorySink::new();
        let mut script = Script::compile(
            "PRINT 1\nPRINT 2\nPRINT 3",
            Arc::new(MemberRegistry::with_stdlib()),
            &ScriptConfig { statements_per_resume: 2, ..ScriptConfig::default() },
            &mut sink,
        )
        .unwrap();

        assert_eq!(script.resume(&mut sink), Step::Suspended);
        assert_eq!(sink.output_lines(), vec!["1", "2"]);
        assert_eq!(script.resume(&mut sink), Step::Finished);
        assert_eq!(sink.output_lines(), vec!["1", "2", "3"]);

        // spawned siblings keep the granularity
        let mut sibling = script.spawn();
        let mut sink2 = MemorySink::new();
        assert_eq!(sibling.resume(&mut sink2), Step::Suspended);
        assert_eq!(sink2.output_lines(), vec!["1", "2"]);
    }

    #[test]
    fn test_variable_capacity_config() {
        let mut sink = MemorySink::new();
        let result = Script::compile(
            "int a\nint b\nint c",
            Arc::new(MemberRegistry::with_stdlib()),
            &ScriptConfig { max_variables: 2, ..ScriptConfig::default() },
            &mut sink,
        );
        assert!(result.is_err());
        assert_eq!(sink.count(crate::diagnostics::Severity::LexicalError), 2);
    }
}
