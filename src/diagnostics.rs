//! Diagnostic stream shared by every pipeline stage
//!
//! The lexer, parser and evaluator all report through a [`DiagnosticSink`]
//! instead of printing: errors, warnings and `PRINT` output travel the same
//! channel, tagged with a [`Severity`]. Hosts implement the trait to route
//! messages wherever they want; [`MemorySink`] collects them in order for
//! tests and batch runs.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Classification of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Character-level scanning failure
    LexicalError,
    /// Structural or typing failure while building the tree
    SyntaxError,
    /// Suspicious but recoverable construct
    Warning,
    /// Failure during execution
    RuntimeError,
    /// Interpreter tracing detail
    Debug,
    /// Text produced by the `PRINT` statement
    Output,
}

impl Severity {
    /// Human-readable label used when rendering a diagnostic
    pub fn label(&self) -> &'static str {
        match self {
            Severity::LexicalError => "lexical error",
            Severity::SyntaxError => "syntax error",
            Severity::Warning => "warning",
            Severity::RuntimeError => "runtime error",
            Severity::Debug => "debug",
            Severity::Output => "output",
        }
    }
}

/// A single message emitted by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Message classification
    pub severity: Severity,
    /// Zero-based source line, when the message refers to one
    pub line: Option<usize>,
    /// Message text
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic with a line reference
    pub fn new(severity: Severity, line: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            line: Some(line),
            message: message.into(),
        }
    }

    /// Create a diagnostic with no line reference
    pub fn global(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            line: None,
            message: message.into(),
        }
    }

    /// Build a diagnostic from a pipeline error
    pub fn from_error(error: &Error) -> Self {
        Diagnostic {
            severity: error.severity(),
            line: error.line(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "[{}] line {}: {}", self.severity.label(), line, self.message),
            None => write!(f, "[{}] {}", self.severity.label(), self.message),
        }
    }
}

/// Receiver for pipeline diagnostics
pub trait DiagnosticSink {
    /// Accept one diagnostic
    fn emit(&mut self, diagnostic: Diagnostic);

    /// Report an error through the sink
    fn report(&mut self, error: &Error) {
        self.emit(Diagnostic::from_error(error));
    }

    /// Emit a warning tied to a source line
    fn warn(&mut self, line: usize, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(Diagnostic::new(Severity::Warning, line, message));
    }

    /// Emit `PRINT` output
    fn output(&mut self, text: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(Diagnostic::global(Severity::Output, text));
    }
}

/// In-memory sink that keeps diagnostics in emission order
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Vec<Diagnostic>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All collected diagnostics, in emission order
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Messages of one severity, in emission order
    pub fn messages(&self, severity: Severity) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.message.as_str())
            .collect()
    }

    /// `PRINT` output lines
    pub fn output_lines(&self) -> Vec<&str> {
        self.messages(Severity::Output)
    }

    /// Number of diagnostics of one severity
    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    /// True if any error-class diagnostic was collected
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| {
            matches!(
                d.severity,
                Severity::LexicalError | Severity::SyntaxError | Severity::RuntimeError
            )
        })
    }

    /// Drop all collected diagnostics
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::LexicalError | Severity::SyntaxError | Severity::RuntimeError => {
                tracing::error!(target: "linescript", "{}", diagnostic);
            }
            Severity::Warning => tracing::warn!(target: "linescript", "{}", diagnostic),
            Severity::Debug => tracing::debug!(target: "linescript", "{}", diagnostic),
            Severity::Output => tracing::info!(target: "linescript", "{}", diagnostic),
        }
        self.entries.push(diagnostic);
    }
}
