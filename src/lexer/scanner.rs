//! Line scanner
//!
//! Turns one source line into classified tokens. The pass is regex-table
//! driven: comments are stripped, string spans are decoded with their
//! escapes, bracket and operator lexemes are cut out by pattern, and the
//! whitespace-separated leftovers are classified as keywords, literals,
//! members, type names or variables. Fresh identifiers are registered in
//! the variable table immediately, in the unbound state.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};
use crate::lexer::token::{BracketKind, KeywordKind, OpKind, Token, TokenKind};
use crate::runtime::value::Value;
use crate::runtime::variables::VariableTable;
use crate::types::Type;

lazy_static! {
    /// Runs of operator characters that form no valid operator
    static ref INVALID_RUN: Regex =
        Regex::new(r"(\*{3,})|(/{3,})|(\|{3,})|(&{3,})|(={3,})").unwrap();
    /// All bracket characters
    static ref BRACKETS: Regex = Regex::new(r"[(){}\[\]]").unwrap();
    /// All operator lexemes; doubled forms listed with `{1,2}` so they
    /// match as one token
    static ref OPERATORS: Regex = Regex::new(
        r"\*{1,2}|/{1,2}|\|{1,2}|&{1,2}|={1,2}|[?:.+%!^<>$,;-]"
    )
    .unwrap();
    /// Valid variable and member names
    static ref IDENTIFIER: Regex = Regex::new(r"^[a-zA-Z_]*[a-zA-Z][0-9a-zA-Z_]*$").unwrap();
    /// Numeric literal shape accepted by the classifier; a leading or
    /// trailing dot never survives the operator scan, so only the
    /// digits-dot-digits form can arrive here
    static ref NUMBER: Regex = Regex::new(r"^\d+(\.\d+)?$").unwrap();
}

/// Raw lexeme cut out of a line before classification
#[derive(Debug)]
enum Raw {
    /// Decoded string literal
    Str(String),
    /// Operator lexeme
    Op(String),
    /// Bracket character
    Bracket(char),
    /// Whitespace-separated word
    Word(String),
}

/// Per-line lexer
pub struct Scanner;

impl Scanner {
    /// Scan one source line into tokens
    ///
    /// `line_no` is the zero-based line number used in diagnostics.
    /// Fresh identifiers are registered in `variables` as unbound names.
    pub fn analyse(
        line: &str,
        line_no: usize,
        variables: &mut VariableTable,
    ) -> Result<Vec<Token>> {
        let stripped = strip_comment(line);
        let raws = split_raw(stripped, line_no)?;

        let mut tokens: Vec<Token> = Vec::with_capacity(raws.len());
        for (column, raw) in raws {
            match raw {
                Raw::Str(text) => tokens.push(Token::new(TokenKind::Value(Value::Str(text)), column)),
                Raw::Bracket(c) => tokens.push(bracket_token(c, column)),
                Raw::Op(text) => push_operator(&text, column, line_no, &mut tokens)?,
                Raw::Word(word) => {
                    let token = classify_word(&word, column, line_no, &tokens, variables)?;
                    tokens.push(token);
                }
            }
        }

        tracing::trace!(target: "linescript", line = line_no, count = tokens.len(), "scanned line");
        Ok(tokens)
    }
}

/// Truncate the line at the first `#` outside a string span
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if c == '#' {
            return &line[..i];
        }
    }
    line
}

/// Cut the line into raw lexemes, in source order
fn split_raw(stripped: &str, line_no: usize) -> Result<Vec<(usize, Raw)>> {
    let mut raws: Vec<(usize, Raw)> = Vec::new();
    let chars: Vec<(usize, char)> = stripped.char_indices().collect();
    let mut outside_start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if c != '"' {
            i += 1;
            continue;
        }

        scan_span(&stripped[outside_start..pos], outside_start, line_no, &mut raws)?;

        // Decode the string span, handling escapes
        let open = pos;
        let mut value = String::new();
        let mut closed = false;
        i += 1;
        while i < chars.len() {
            let (p, c) = chars[i];
            match c {
                '\\' => {
                    i += 1;
                    let (_, esc) = *chars
                        .get(i)
                        .ok_or(Error::UnterminatedString { line: line_no })?;
                    value.push(match esc {
                        '\\' => '\\',
                        '"' => '"',
                        'n' => '\n',
                        't' => '\t',
                        other => {
                            return Err(Error::InvalidEscape { line: line_no, escape: other })
                        }
                    });
                    i += 1;
                }
                '"' => {
                    closed = true;
                    outside_start = p + 1;
                    i += 1;
                    break;
                }
                other => {
                    value.push(other);
                    i += 1;
                }
            }
        }
        if !closed {
            return Err(Error::UnterminatedString { line: line_no });
        }
        raws.push((open, Raw::Str(value)));
    }

    scan_span(&stripped[outside_start..], outside_start, line_no, &mut raws)?;
    Ok(raws)
}

/// Scan a span between string literals for brackets, operators and words
fn scan_span(
    span: &str,
    base: usize,
    line_no: usize,
    raws: &mut Vec<(usize, Raw)>,
) -> Result<()> {
    if span.is_empty() {
        return Ok(());
    }
    if let Some(m) = INVALID_RUN.find(span) {
        return Err(Error::InvalidOperatorRun {
            line: line_no,
            lexeme: m.as_str().to_string(),
        });
    }

    let mut marks: Vec<(usize, usize, Raw)> = Vec::new();
    for m in BRACKETS.find_iter(span) {
        let c = span[m.start()..].chars().next().unwrap_or('(');
        marks.push((m.start(), m.end(), Raw::Bracket(c)));
    }
    for m in OPERATORS.find_iter(span) {
        // A dot flanked by digits belongs to a float literal
        if m.as_str() == "." && digit_flanked(span, m.start(), m.end()) {
            continue;
        }
        marks.push((m.start(), m.end(), Raw::Op(m.as_str().to_string())));
    }
    marks.sort_by_key(|(start, _, _)| *start);

    let mut items: Vec<(usize, Raw)> = Vec::new();
    let mut cursor = 0;
    for (start, end, raw) in marks {
        if start > cursor {
            collect_words(&span[cursor..start], base + cursor, &mut items);
        }
        items.push((base + start, raw));
        cursor = end;
    }
    if cursor < span.len() {
        collect_words(&span[cursor..], base + cursor, &mut items);
    }

    items.sort_by_key(|(col, _)| *col);
    raws.extend(items);
    Ok(())
}

/// True if the bytes on both sides of a `.` are ASCII digits
fn digit_flanked(span: &str, start: usize, end: usize) -> bool {
    let before = span[..start].chars().next_back();
    let after = span[end..].chars().next();
    matches!(before, Some(c) if c.is_ascii_digit()) && matches!(after, Some(c) if c.is_ascii_digit())
}

/// Split a gap into whitespace-separated words with their offsets
fn collect_words(text: &str, base: usize, out: &mut Vec<(usize, Raw)>) {
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((base + s, Raw::Word(text[s..i].to_string())));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((base + s, Raw::Word(text[s..].to_string())));
    }
}

fn bracket_token(c: char, column: usize) -> Token {
    let (kind, closing) = match c {
        '(' => (BracketKind::Round, false),
        ')' => (BracketKind::Round, true),
        '[' => (BracketKind::Square, false),
        ']' => (BracketKind::Square, true),
        '{' => (BracketKind::Curly, false),
        _ => (BracketKind::Curly, true),
    };
    Token::new(TokenKind::Bracket { kind, closing }, column)
}

/// Emit an operator token, applying the context rules
///
/// `==` is always equality. A lone `=` compounds into the preceding
/// operator when that operator allows it, upgrades `<` `>` `!` to their
/// `=`-forms, and otherwise becomes a plain assignment. A lone `-` is
/// unary unless the previous token can end an operand.
fn push_operator(
    text: &str,
    column: usize,
    line_no: usize,
    tokens: &mut Vec<Token>,
) -> Result<()> {
    if text == "==" {
        tokens.push(Token::new(
            TokenKind::Operator { op: OpKind::Eq, assign: false },
            column,
        ));
        return Ok(());
    }

    if text == "=" {
        if let Some(TokenKind::Operator { op, assign: assign @ false }) =
            tokens.last_mut().map(|t| &mut t.kind)
        {
            return match op.compound_with_eq() {
                Some((merged, flag)) => {
                    *op = merged;
                    *assign = flag;
                    Ok(())
                }
                None => Err(Error::CompoundNotSupported {
                    line: line_no,
                    op: op.lexeme().to_string(),
                }),
            };
        }
        tokens.push(Token::new(
            TokenKind::Operator { op: OpKind::Assign, assign: true },
            column,
        ));
        return Ok(());
    }

    let mut op = OpKind::from_lexeme(text).ok_or_else(|| Error::InvalidOperatorRun {
        line: line_no,
        lexeme: text.to_string(),
    })?;
    if op == OpKind::Sub && !tokens.last().map_or(false, Token::ends_operand) {
        op = OpKind::Neg;
    }
    tokens.push(Token::new(TokenKind::Operator { op, assign: false }, column));
    Ok(())
}

/// Classify a whitespace-separated word
fn classify_word(
    word: &str,
    column: usize,
    line_no: usize,
    tokens: &[Token],
    variables: &mut VariableTable,
) -> Result<Token> {
    if let Some(kw) = KeywordKind::from_lexeme(word) {
        return Ok(Token::new(TokenKind::Keyword(kw), column));
    }
    if word == "True" {
        return Ok(Token::new(TokenKind::Value(Value::Bool(true)), column));
    }
    if word == "False" {
        return Ok(Token::new(TokenKind::Value(Value::Bool(false)), column));
    }
    if NUMBER.is_match(word) {
        if let Ok(i) = word.parse::<i64>() {
            return Ok(Token::new(TokenKind::Value(Value::Int(i)), column));
        }
        if let Ok(f) = word.parse::<f64>() {
            return Ok(Token::new(TokenKind::Value(Value::Float(f)), column));
        }
    }

    // A word right after `.` is a member name, not a variable
    let after_dot = matches!(
        tokens.last().map(|t| &t.kind),
        Some(TokenKind::Operator { op: OpKind::Dot, .. })
    );
    if after_dot {
        if !IDENTIFIER.is_match(word) {
            return Err(Error::InvalidIdentifier {
                line: line_no,
                lexeme: word.to_string(),
            });
        }
        return Ok(Token::new(TokenKind::Member(word.to_string()), column));
    }

    if variables.contains(word) {
        return Ok(Token::new(TokenKind::Variable(word.to_string()), column));
    }
    if let Some(ty) = Type::from_name(word) {
        return Ok(Token::new(TokenKind::TypeName(ty), column));
    }
    if !IDENTIFIER.is_match(word) {
        return Err(Error::InvalidIdentifier {
            line: line_no,
            lexeme: word.to_string(),
        });
    }
    if !variables.register(word) {
        return Err(Error::VariableLimit {
            line: line_no,
            name: word.to_string(),
        });
    }
    Ok(Token::new(TokenKind::Variable(word.to_string()), column))
}
