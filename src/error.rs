//! Error types for the linescript interpreter

use thiserror::Error;

use crate::diagnostics::Severity;

/// Linescript pipeline errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Lexical errors
    /// String literal without a closing quote
    ///
    /// **Triggered by:** a line ending while inside a string span
    /// **Example:** `PRINT "hello`
    #[error("String in line {line} is not terminated")]
    UnterminatedString {
        /// Line number where the string opened
        line: usize,
    },

    /// Run of repeated operator characters that forms no valid operator
    ///
    /// **Example:** `x === 3` or `a *** b`
    #[error("Invalid operator '{lexeme}' in line {line}")]
    InvalidOperatorRun {
        /// Line number
        line: usize,
        /// The offending run of characters
        lexeme: String,
    },

    /// Word that is neither a literal, keyword, nor a valid identifier
    #[error("Invalid identifier '{lexeme}' in line {line}")]
    InvalidIdentifier {
        /// Line number
        line: usize,
        /// The offending word
        lexeme: String,
    },

    /// Unsupported escape sequence inside a string literal
    ///
    /// Only `\\`, `\"`, `\n` and `\t` are recognized.
    #[error("Invalid escape sequence '\\{escape}' in line {line}")]
    InvalidEscape {
        /// Line number
        line: usize,
        /// Character following the backslash
        escape: char,
    },

    /// `=` placed after an operator that does not support compounding
    #[error("Operator '{op}' cannot be combined with '=' in line {line}")]
    CompoundNotSupported {
        /// Line number
        line: usize,
        /// The operator the `=` followed
        op: String,
    },

    /// Variable table capacity reached while registering a new name
    #[error("Cannot register variable '{name}' in line {line}: table is full")]
    VariableLimit {
        /// Line number
        line: usize,
        /// Name that could not be registered
        name: String,
    },

    // Syntax errors
    /// General syntax error with line context
    #[error("Syntax error in line {line}: {message}")]
    SyntaxError {
        /// Line number where the error occurred
        line: usize,
        /// Error description
        message: String,
    },

    /// Incompatible operand types discovered while completing a node
    ///
    /// Reported at the same stage as syntax errors; both abort parsing.
    #[error("Type error in line {line}: {message}")]
    TypeError {
        /// Line number where the error occurred
        line: usize,
        /// Error description
        message: String,
    },

    /// A block was opened but never closed by `cls`
    #[error("{kind} block opened in line {line} is not closed")]
    UnclosedBlock {
        /// Line where the block opened
        line: usize,
        /// Statement kind that opened the block
        kind: String,
    },

    /// Parsing finished with one or more reported errors
    #[error("Parsing failed with {errors} error(s)")]
    ParseFailed {
        /// Number of errors collected during the pass
        errors: usize,
    },

    // Runtime errors
    /// Division (or modulo) with a zero right-hand side
    ///
    /// **Triggered by:** `1 / 0`, `1 // 0`, `5 % 0`
    #[error("Division by zero")]
    DivisionByZero,

    /// Power operation outside its defined domain
    ///
    /// **Triggered by:** `0 ** 0`, `0 ** -1`, or a negative base with a
    /// non-integer exponent
    #[error("Invalid power: {base} ** {exponent}")]
    InvalidPower {
        /// Base value
        base: f64,
        /// Exponent value
        exponent: f64,
    },

    /// Reference to a name that was never registered
    #[error("Variable '{name}' does not exist")]
    UndefinedVariable {
        /// Variable name
        name: String,
    },

    /// Use of a variable before its declaration bound a type
    #[error("Variable '{name}' is used before it is declared")]
    UnboundVariable {
        /// Variable name
        name: String,
    },

    /// Stored value would no longer match the variable's declared type
    #[error("Cannot store {got} value in variable '{name}' of type {expected}")]
    ValueTypeMismatch {
        /// Variable name
        name: String,
        /// Declared type name
        expected: String,
        /// Runtime type name of the rejected value
        got: String,
    },

    /// Member lookup failed against the registry
    #[error("Member '{name}' does not exist for type {owner}")]
    UnknownMember {
        /// Owner type name
        owner: String,
        /// Member name
        name: String,
    },

    /// No registered constructor matches the argument types
    #[error("No constructor of {owner} accepts the given arguments")]
    UnknownConstructor {
        /// Constructed type name
        owner: String,
    },

    /// Value conversion between semantic types failed
    #[error("Cannot convert {value} to {target}")]
    ConversionError {
        /// Rendered source value
        value: String,
        /// Target type name
        target: String,
    },

    /// A registered host callable reported a failure
    #[error("Host call '{member}' failed: {reason}")]
    HostCallFailed {
        /// Member name
        member: String,
        /// Failure reason
        reason: String,
    },

    /// Break signal reached the script boundary
    #[error("Break statement outside loop")]
    InvalidBreak,

    /// Continue signal reached the script boundary
    #[error("Continue statement outside loop")]
    InvalidContinue,

    /// General runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl Error {
    /// Create a runtime error with a message
    pub fn runtime(msg: impl Into<String>) -> Self {
        Error::RuntimeError(msg.into())
    }

    /// Create a syntax error with line context
    pub fn syntax(line: usize, msg: impl Into<String>) -> Self {
        Error::SyntaxError {
            line,
            message: msg.into(),
        }
    }

    /// Diagnostic severity this error is reported at
    pub fn severity(&self) -> Severity {
        match self {
            Error::UnterminatedString { .. }
            | Error::InvalidOperatorRun { .. }
            | Error::InvalidIdentifier { .. }
            | Error::InvalidEscape { .. }
            | Error::VariableLimit { .. } => Severity::LexicalError,

            Error::CompoundNotSupported { .. }
            | Error::SyntaxError { .. }
            | Error::TypeError { .. }
            | Error::UnclosedBlock { .. }
            | Error::ParseFailed { .. } => Severity::SyntaxError,

            _ => Severity::RuntimeError,
        }
    }

    /// Source line the error refers to, when known
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::UnterminatedString { line }
            | Error::InvalidOperatorRun { line, .. }
            | Error::InvalidIdentifier { line, .. }
            | Error::InvalidEscape { line, .. }
            | Error::CompoundNotSupported { line, .. }
            | Error::VariableLimit { line, .. }
            | Error::SyntaxError { line, .. }
            | Error::TypeError { line, .. }
            | Error::UnclosedBlock { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Result type for linescript operations
pub type Result<T> = std::result::Result<T, Error>;
