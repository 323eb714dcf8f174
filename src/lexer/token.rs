//! Token model
//!
//! Tokens come out of the scanner already classified: literals carry their
//! [`Value`], operators their [`OpKind`], and names are resolved against
//! the variable table, the keyword table and the type names. The parser
//! never looks at raw text again.

use serde::{Deserialize, Serialize};

use crate::runtime::value::Value;
use crate::types::Type;

/// Operator kind
///
/// Includes the writable source operators plus the derived forms the
/// parser substitutes based on operand types (string multiply, concat,
/// character code, the vector group). Derived forms never appear in the
/// token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    /// `?` opening a ternary
    Ter1,
    /// `:` separating ternary branches
    Ter2,
    /// `.` member access
    Dot,
    /// `+`
    Add,
    /// `-` (binary)
    Sub,
    /// `-` (unary)
    Neg,
    /// `*`
    Mul,
    /// `**`
    Pow,
    /// `/`
    Div,
    /// `//` integer division
    DivInt,
    /// `%`
    Mod,
    /// `!`
    Not,
    /// `|` logical or
    Or,
    /// `||` logical or
    Or2,
    /// `&` logical and
    And,
    /// `&&` logical and
    And2,
    /// `^` logical xor
    Xor,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `+` on strings: concatenation
    Concat,
    /// `*` on string and int: repetition
    StrMul,
    /// `$` on int: code point to string
    Char,
    /// `$` on string: first code point
    ChCode,
    /// `+` on vectors
    Vadd,
    /// `-` on vectors
    Vsub,
    /// `*` on vector and scalar
    Vmul,
    /// `/` on vector and scalar
    Vdiv,
    /// `-` (unary) on a vector
    Vneg,
    /// `*` on two vectors: component-wise product
    DotProduct,
    /// `=` assignment
    Assign,
    /// `,` or `;` separator
    Sep,
}

impl OpKind {
    /// Binding priority; higher binds tighter
    ///
    /// `Assign` and `Sep` are not expression operators and rank lowest.
    pub fn priority(&self) -> u8 {
        use OpKind::*;
        match self {
            Assign | Sep => 0,
            Ter1 => 1,
            Ter2 => 2,
            Or2 => 3,
            And2 => 4,
            Or => 5,
            Xor => 6,
            And => 7,
            Eq | NotEq => 8,
            Less | LessEq | Greater | GreaterEq => 9,
            Add | Sub | Concat | Vadd | Vsub => 10,
            Mul | Div | DivInt | Mod | StrMul | Vmul | Vdiv | DotProduct => 11,
            Pow => 12,
            Neg | Not | Char | ChCode | Vneg => 13,
            Dot => 14,
        }
    }

    /// True for operators taking a single right-hand operand
    pub fn is_unary(&self) -> bool {
        matches!(self, OpKind::Neg | OpKind::Not | OpKind::Char | OpKind::ChCode | OpKind::Vneg)
    }

    /// Numeric arithmetic group
    pub fn is_arithmetic(&self) -> bool {
        use OpKind::*;
        matches!(self, Add | Sub | Mul | Pow | Div | DivInt | Mod)
    }

    /// Boolean connective group
    pub fn is_logical(&self) -> bool {
        use OpKind::*;
        matches!(self, Or | Or2 | And | And2 | Xor)
    }

    /// Comparison group
    pub fn is_relational(&self) -> bool {
        use OpKind::*;
        matches!(self, Less | LessEq | Greater | GreaterEq | Eq | NotEq)
    }

    /// Comparisons defined only on numbers
    pub fn is_number_relational(&self) -> bool {
        use OpKind::*;
        matches!(self, Less | LessEq | Greater | GreaterEq)
    }

    /// String-producing group
    pub fn is_stringy(&self) -> bool {
        matches!(self, OpKind::Concat | OpKind::StrMul)
    }

    /// Vector group
    pub fn is_vectorish(&self) -> bool {
        use OpKind::*;
        matches!(self, Vadd | Vsub | Vmul | Vdiv | DotProduct)
    }

    /// True if a trailing `=` may compound this operator into an
    /// assignment (or upgrade it, as in `<` + `=`)
    pub fn usable_with_assignment(&self) -> bool {
        use OpKind::*;
        matches!(
            self,
            Add | Sub | Mul | Pow | Div | DivInt | Mod | Not | Or | Or2 | And | And2 | Xor | Less
                | Greater
        )
    }

    /// Compound form produced by a trailing `=`
    ///
    /// Comparisons upgrade to their inclusive form; every other
    /// compoundable operator keeps its kind and gains the assignment flag.
    pub fn compound_with_eq(&self) -> Option<(OpKind, bool)> {
        match self {
            OpKind::Less => Some((OpKind::LessEq, false)),
            OpKind::Greater => Some((OpKind::GreaterEq, false)),
            OpKind::Not => Some((OpKind::NotEq, false)),
            op if op.usable_with_assignment() => Some((*op, true)),
            _ => None,
        }
    }

    /// Source spelling of the operator
    pub fn lexeme(&self) -> &'static str {
        use OpKind::*;
        match self {
            Ter1 => "?",
            Ter2 => ":",
            Dot => ".",
            Add | Concat | Vadd => "+",
            Sub | Neg | Vsub | Vneg => "-",
            Mul | StrMul | Vmul | DotProduct => "*",
            Pow => "**",
            Div | Vdiv => "/",
            DivInt => "//",
            Mod => "%",
            Not => "!",
            Or => "|",
            Or2 => "||",
            And => "&",
            And2 => "&&",
            Xor => "^",
            Less => "<",
            LessEq => "<=",
            Greater => ">",
            GreaterEq => ">=",
            Eq => "==",
            NotEq => "!=",
            Char | ChCode => "$",
            Assign => "=",
            Sep => ",",
        }
    }

    /// Resolve an operator lexeme scanned from source
    pub fn from_lexeme(text: &str) -> Option<OpKind> {
        use OpKind::*;
        match text {
            "?" => Some(Ter1),
            ":" => Some(Ter2),
            "." => Some(Dot),
            "+" => Some(Add),
            "-" => Some(Sub),
            "*" => Some(Mul),
            "**" => Some(Pow),
            "/" => Some(Div),
            "//" => Some(DivInt),
            "%" => Some(Mod),
            "!" => Some(Not),
            "|" => Some(Or),
            "||" => Some(Or2),
            "&" => Some(And),
            "&&" => Some(And2),
            "^" => Some(Xor),
            "<" => Some(Less),
            ">" => Some(Greater),
            "$" => Some(Char),
            "=" => Some(Assign),
            "," | ";" => Some(Sep),
            _ => None,
        }
    }
}

/// Statement keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeywordKind {
    /// `PRINT`
    Print,
    /// `cls` block terminator
    Cls,
    /// `if`
    If,
    /// `elif`
    Elif,
    /// `else`
    Else,
    /// `switch`
    Switch,
    /// `case`
    Case,
    /// `default`
    Default,
    /// `while`
    While,
    /// `always` (unconditional loop)
    Always,
    /// `for`
    For,
    /// `break`
    Break,
    /// `continue`
    Continue,
}

impl KeywordKind {
    /// Resolve a keyword lexeme
    pub fn from_lexeme(text: &str) -> Option<KeywordKind> {
        use KeywordKind::*;
        match text {
            "PRINT" => Some(Print),
            "cls" => Some(Cls),
            "if" => Some(If),
            "elif" => Some(Elif),
            "else" => Some(Else),
            "switch" => Some(Switch),
            "case" => Some(Case),
            "default" => Some(Default),
            "while" => Some(While),
            "always" => Some(Always),
            "for" => Some(For),
            "break" => Some(Break),
            "continue" => Some(Continue),
            _ => None,
        }
    }

    /// Source spelling
    pub fn lexeme(&self) -> &'static str {
        use KeywordKind::*;
        match self {
            Print => "PRINT",
            Cls => "cls",
            If => "if",
            Elif => "elif",
            Else => "else",
            Switch => "switch",
            Case => "case",
            Default => "default",
            While => "while",
            Always => "always",
            For => "for",
            Break => "break",
            Continue => "continue",
        }
    }
}

/// Bracket family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BracketKind {
    /// `(` `)`
    Round,
    /// `[` `]`
    Square,
    /// `{` `}`
    Curly,
}

/// Classified token content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Literal value (number, string, `True`/`False`)
    Value(Value),
    /// Reference to a registered variable
    Variable(String),
    /// Operator; `assign` marks `=` and compound assignments
    Operator {
        /// Operator kind
        op: OpKind,
        /// True for `=` and operator-`=` compounds
        assign: bool,
    },
    /// Bracket
    Bracket {
        /// Bracket family
        kind: BracketKind,
        /// True for the closing form
        closing: bool,
    },
    /// Declarable type name
    TypeName(Type),
    /// Statement keyword
    Keyword(KeywordKind),
    /// Member name following a `.`
    Member(String),
}

/// A token with its position in the line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Token content
    pub kind: TokenKind,
    /// Byte offset of the lexeme in the source line
    pub column: usize,
}

impl Token {
    /// Create a token
    pub fn new(kind: TokenKind, column: usize) -> Self {
        Token { kind, column }
    }

    /// Operator kind, if this is an operator token
    pub fn op(&self) -> Option<OpKind> {
        match &self.kind {
            TokenKind::Operator { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// True for `=` and compound assignment operators
    pub fn is_assignment(&self) -> bool {
        matches!(&self.kind, TokenKind::Operator { assign: true, .. })
    }

    /// True for an opening or closing bracket
    pub fn is_bracket(&self, closing: bool) -> bool {
        matches!(&self.kind, TokenKind::Bracket { closing: c, .. } if *c == closing)
    }

    /// True for tokens that can end an operand: literals, variables and
    /// closing brackets. Used to distinguish binary `-` from unary `-`.
    pub fn ends_operand(&self) -> bool {
        matches!(
            &self.kind,
            TokenKind::Value(_) | TokenKind::Variable(_) | TokenKind::Member(_)
        ) || self.is_bracket(true)
    }
}
