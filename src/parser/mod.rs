//! Line-oriented parser
//!
//! Consumes the token matrix the scanner produced (one row per source
//! line) and builds typed statements. The parser is an explicit context
//! object: line cursor, open-block bookkeeping and the error count all
//! live here, and every statement grammar is a method on it.
//!
//! Blocks are closed by a lone `cls`. An `if`/`elif`/`else` chain is
//! collected across sibling lines and sealed when a non-continuation
//! line, a closing `cls` or the end of input arrives. Expression parsing
//! is precedence-based: the span splits at its lowest-priority depth-0
//! operator (rightmost among equals, so equal-priority operators
//! associate left to right), with ternaries grouped by pairing the
//! leftmost `?` with its matching `:`.
//!
//! Errors do not abort the pass: each bad line is reported to the sink
//! and skipped, and parsing fails at the end with the collected count.

pub mod ast;

use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::error::{Error, Result};
use crate::lexer::token::{KeywordKind, OpKind, Token, TokenKind};
use crate::parser::ast::{Assignment, Block, CaseArm, CaseValue, CondArm, Expr, Stmt};
use crate::runtime::eval::values_equal;
use crate::runtime::registry::MemberRegistry;
use crate::runtime::value::Value;
use crate::runtime::variables::VariableTable;
use crate::types::Type;

/// Parser context
pub struct Parser<'a> {
    rows: &'a [Option<Vec<Token>>],
    registry: &'a MemberRegistry,
    variables: &'a mut VariableTable,
    sink: &'a mut (dyn DiagnosticSink + 'a),
    line: usize,
    errors: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser over a scanned token matrix
    ///
    /// A `None` row marks a line the scanner rejected; the parser skips
    /// it and counts it toward the final error total.
    pub fn new(
        rows: &'a [Option<Vec<Token>>],
        registry: &'a MemberRegistry,
        variables: &'a mut VariableTable,
        sink: &'a mut (dyn DiagnosticSink + 'a),
    ) -> Self {
        Parser {
            rows,
            registry,
            variables,
            sink,
            line: 0,
            errors: 0,
        }
    }

    /// Parse the whole matrix into top-level statements
    pub fn parse(mut self) -> Result<Vec<Stmt>> {
        let statements = self.parse_sequence(None);
        if self.errors > 0 {
            return Err(Error::ParseFailed { errors: self.errors });
        }
        Ok(statements)
    }

    fn report(&mut self, error: Error) {
        self.errors += 1;
        self.sink.report(&error);
    }

    fn warn(&mut self, line: usize, message: impl Into<String>) {
        self.sink
            .emit(Diagnostic::new(Severity::Warning, line, message));
    }

    fn flush(chain: &mut Option<Vec<CondArm>>, statements: &mut Vec<Stmt>) {
        if let Some(arms) = chain.take() {
            statements.push(Stmt::IfChain(arms));
        }
    }

    /// Parse statements until a closing `cls` (when inside a block) or
    /// the end of input
    fn parse_sequence(&mut self, open: Option<(usize, &'static str)>) -> Vec<Stmt> {
        let mut statements = Vec::new();
        let mut chain: Option<Vec<CondArm>> = None;

        while self.line < self.rows.len() {
            let line_no = self.line;
            let row = match &self.rows[line_no] {
                None => {
                    self.errors += 1;
                    self.line = line_no + 1;
                    continue;
                }
                Some(row) if row.is_empty() => {
                    self.line = line_no + 1;
                    continue;
                }
                Some(row) => row.clone(),
            };

            match row[0].kind.clone() {
                TokenKind::Keyword(KeywordKind::Cls) => {
                    self.line = line_no + 1;
                    if row.len() > 1 {
                        self.report(Error::syntax(line_no, "'cls' must stand alone"));
                        continue;
                    }
                    Self::flush(&mut chain, &mut statements);
                    if open.is_some() {
                        return statements;
                    }
                    self.warn(line_no, "'cls' outside any block is ignored");
                }
                TokenKind::Keyword(KeywordKind::If) => {
                    Self::flush(&mut chain, &mut statements);
                    self.line = line_no + 1;
                    let guard = self.parse_guard(&row, line_no);
                    let body = self.block_body(line_no, "if");
                    match guard {
                        Ok(guard) => chain = Some(vec![CondArm { guard: Some(guard), body }]),
                        Err(e) => self.report(e),
                    }
                }
                TokenKind::Keyword(KeywordKind::Elif) => {
                    self.line = line_no + 1;
                    let guard = self.parse_guard(&row, line_no);
                    let body = self.block_body(line_no, "elif");
                    match (chain.as_mut(), guard) {
                        (Some(arms), Ok(guard)) => arms.push(CondArm { guard: Some(guard), body }),
                        (None, _) => {
                            self.report(Error::syntax(line_no, "'elif' without a preceding 'if'"))
                        }
                        (_, Err(e)) => self.report(e),
                    }
                }
                TokenKind::Keyword(KeywordKind::Else) => {
                    self.line = line_no + 1;
                    let well_formed = row.len() == 1;
                    let body = self.block_body(line_no, "else");
                    if !well_formed {
                        self.report(Error::syntax(line_no, "'else' takes no condition"));
                    } else {
                        match chain.take() {
                            Some(mut arms) => {
                                arms.push(CondArm { guard: None, body });
                                statements.push(Stmt::IfChain(arms));
                            }
                            None => self.report(Error::syntax(
                                line_no,
                                "'else' without a preceding 'if'",
                            )),
                        }
                    }
                }
                TokenKind::Keyword(KeywordKind::While) => {
                    Self::flush(&mut chain, &mut statements);
                    self.line = line_no + 1;
                    let guard = self.parse_guard(&row, line_no);
                    let body = self.block_body(line_no, "while");
                    match guard {
                        Ok(guard) => statements.push(Stmt::While { guard: Some(guard), body }),
                        Err(e) => self.report(e),
                    }
                }
                TokenKind::Keyword(KeywordKind::Always) => {
                    Self::flush(&mut chain, &mut statements);
                    self.line = line_no + 1;
                    let well_formed = row.len() == 1;
                    let body = self.block_body(line_no, "always");
                    if well_formed {
                        statements.push(Stmt::While { guard: None, body });
                    } else {
                        self.report(Error::syntax(line_no, "'always' takes no condition"));
                    }
                }
                TokenKind::Keyword(KeywordKind::For) => {
                    Self::flush(&mut chain, &mut statements);
                    if let Some(stmt) = self.parse_for(&row, line_no) {
                        statements.push(stmt);
                    }
                }
                TokenKind::Keyword(KeywordKind::Switch) => {
                    Self::flush(&mut chain, &mut statements);
                    match self.parse_switch(&row, line_no) {
                        Ok(stmt) => statements.push(stmt),
                        Err(e) => self.report(e),
                    }
                }
                TokenKind::Keyword(KeywordKind::Print) => {
                    Self::flush(&mut chain, &mut statements);
                    self.line = line_no + 1;
                    if row.len() < 2 {
                        self.report(Error::syntax(line_no, "PRINT needs an expression"));
                        continue;
                    }
                    match self.parse_expr(&row, 1, row.len() - 1, line_no) {
                        Ok(expr) => statements.push(Stmt::Print(expr)),
                        Err(e) => self.report(e),
                    }
                }
                TokenKind::Keyword(KeywordKind::Break) => {
                    Self::flush(&mut chain, &mut statements);
                    self.line = line_no + 1;
                    if row.len() > 1 {
                        self.report(Error::syntax(line_no, "'break' must stand alone"));
                    } else {
                        statements.push(Stmt::Break);
                    }
                }
                TokenKind::Keyword(KeywordKind::Continue) => {
                    Self::flush(&mut chain, &mut statements);
                    self.line = line_no + 1;
                    if row.len() > 1 {
                        self.report(Error::syntax(line_no, "'continue' must stand alone"));
                    } else {
                        statements.push(Stmt::Continue);
                    }
                }
                TokenKind::Keyword(kw @ (KeywordKind::Case | KeywordKind::Default)) => {
                    Self::flush(&mut chain, &mut statements);
                    self.line = line_no + 1;
                    self.report(Error::syntax(
                        line_no,
                        format!("'{}' outside a switch", kw.lexeme()),
                    ));
                }
                TokenKind::TypeName(ty) => {
                    Self::flush(&mut chain, &mut statements);
                    self.line = line_no + 1;
                    match self.parse_declaration(&row, ty, line_no) {
                        Ok(stmt) => statements.push(stmt),
                        Err(e) => self.report(e),
                    }
                }
                _ => {
                    Self::flush(&mut chain, &mut statements);
                    self.line = line_no + 1;
                    match self.parse_simple(&row, line_no) {
                        Ok(stmt) => statements.push(stmt),
                        Err(e) => self.report(e),
                    }
                }
            }
        }

        Self::flush(&mut chain, &mut statements);
        if let Some((line, kind)) = open {
            self.report(Error::UnclosedBlock { line, kind: kind.to_string() });
        }
        statements
    }

    fn block_body(&mut self, opened: usize, kind: &'static str) -> Block {
        Block {
            statements: self.parse_sequence(Some((opened, kind))),
        }
    }

    fn parse_guard(&mut self, row: &[Token], line_no: usize) -> Result<Expr> {
        if row.len() < 2 {
            return Err(Error::syntax(line_no, "condition expected"));
        }
        self.parse_expr(row, 1, row.len() - 1, line_no)
    }

    /// `type name` or `type name = expr`
    ///
    /// The right-hand side is parsed before the name is bound, so an
    /// initializer referring to the declared variable fails.
    fn parse_declaration(&mut self, row: &[Token], ty: Type, line_no: usize) -> Result<Stmt> {
        let name = match row.get(1).map(|t| &t.kind) {
            Some(TokenKind::Variable(name)) => name.clone(),
            _ => return Err(Error::syntax(line_no, "variable name expected after type")),
        };
        if self.variables.is_bound(&name) {
            return Err(Error::syntax(
                line_no,
                format!("variable '{}' is already declared", name),
            ));
        }

        match row.iter().position(Token::is_assignment) {
            None => {
                if row.len() != 2 {
                    return Err(Error::syntax(line_no, "malformed declaration"));
                }
                let default = ty
                    .default_value()
                    .ok_or_else(|| Error::syntax(line_no, "type cannot be declared"))?;
                self.variables.bind(&name, ty)?;
                let init = Assignment::new(name, ty, OpKind::Assign, Expr::constant(default), line_no)?;
                Ok(Stmt::Assign(init))
            }
            Some(2) => {
                if row[2].op() != Some(OpKind::Assign) {
                    return Err(Error::syntax(
                        line_no,
                        "compound assignment is not allowed in a declaration",
                    ));
                }
                if row.len() < 4 {
                    return Err(Error::syntax(line_no, "initializer expected after '='"));
                }
                let rvalue = self.parse_expr(row, 3, row.len() - 1, line_no)?;
                self.variables.bind(&name, ty)?;
                let init = Assignment::new(name, ty, OpKind::Assign, rvalue, line_no)?;
                Ok(Stmt::Assign(init))
            }
            Some(_) => Err(Error::syntax(line_no, "malformed declaration")),
        }
    }

    /// Assignment or bare expression statement; such lines must start
    /// with a variable reference
    fn parse_simple(&mut self, row: &[Token], line_no: usize) -> Result<Stmt> {
        if !matches!(row[0].kind, TokenKind::Variable(_)) {
            return Err(Error::syntax(line_no, "a statement cannot start with this token"));
        }
        match row.iter().position(Token::is_assignment) {
            Some(idx) => {
                let assignment = self.parse_assignment_span(row, 0, row.len() - 1, idx, line_no)?;
                Ok(Stmt::Assign(assignment))
            }
            None => {
                let expr = self.parse_expr(row, 0, row.len() - 1, line_no)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_assignment_span(
        &mut self,
        row: &[Token],
        start: usize,
        end: usize,
        assign_idx: usize,
        line_no: usize,
    ) -> Result<Assignment> {
        if assign_idx == start || assign_idx >= end {
            return Err(Error::syntax(line_no, "malformed assignment"));
        }
        let lvalue = self.parse_expr(row, start, assign_idx - 1, line_no)?;
        let (name, ty) = match lvalue {
            Expr::Variable { name, ty } => (name, ty),
            _ => {
                return Err(Error::syntax(
                    line_no,
                    "assignment target must be a variable",
                ))
            }
        };
        let op = row[assign_idx]
            .op()
            .ok_or_else(|| Error::syntax(line_no, "malformed assignment"))?;
        let rvalue = self.parse_expr(row, assign_idx + 1, end, line_no)?;
        Assignment::new(name, ty, op, rvalue, line_no)
    }

    /// `for init; cond; step` or `for cond; step`
    ///
    /// The body is consumed even when the header is malformed so the
    /// block structure stays aligned.
    fn parse_for(&mut self, row: &[Token], line_no: usize) -> Option<Stmt> {
        let header = self.parse_for_header(row, line_no);
        self.line = line_no + 1;
        let body = self.block_body(line_no, "for");
        match header {
            Ok((init, guard, step)) => Some(Stmt::For { init, guard, step, body }),
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn parse_for_header(
        &mut self,
        row: &[Token],
        line_no: usize,
    ) -> Result<(Option<Assignment>, Expr, Assignment)> {
        let end = row.len() - 1;
        let mut seps = Vec::new();
        let mut depth = 0i32;
        for (i, token) in row.iter().enumerate().take(end + 1).skip(1) {
            match &token.kind {
                TokenKind::Bracket { closing: false, .. } => depth += 1,
                TokenKind::Bracket { closing: true, .. } => depth -= 1,
                TokenKind::Operator { op: OpKind::Sep, .. } if depth == 0 => seps.push(i),
                _ => {}
            }
        }

        let (init, guard_span, step_span) = match seps.as_slice() {
            [s] => (None, (1, *s), (*s + 1, end)),
            [s0, s1] => (Some((1, *s0)), (*s0 + 1, *s1), (*s1 + 1, end)),
            _ => {
                return Err(Error::syntax(
                    line_no,
                    "for header needs one or two ';' separators",
                ))
            }
        };

        let init = match init {
            None => None,
            Some((start, sep)) => {
                if sep <= start {
                    return Err(Error::syntax(line_no, "empty for initializer"));
                }
                Some(self.parse_header_assignment(row, start, sep - 1, line_no)?)
            }
        };
        if guard_span.1 <= guard_span.0 {
            return Err(Error::syntax(line_no, "empty for condition"));
        }
        let guard = self.parse_expr(row, guard_span.0, guard_span.1 - 1, line_no)?;
        if step_span.1 < step_span.0 {
            return Err(Error::syntax(line_no, "empty for step"));
        }
        let step = self.parse_header_assignment(row, step_span.0, step_span.1, line_no)?;
        Ok((init, guard, step))
    }

    fn parse_header_assignment(
        &mut self,
        row: &[Token],
        start: usize,
        end: usize,
        line_no: usize,
    ) -> Result<Assignment> {
        let assign_idx = (start..=end)
            .find(|&i| row[i].is_assignment())
            .ok_or_else(|| Error::syntax(line_no, "assignment expected in for header"))?;
        self.parse_assignment_span(row, start, end, assign_idx, line_no)
    }

    /// `switch expr` followed by `case`/`default` blocks; the `default`
    /// block closes the switch
    fn parse_switch(&mut self, row: &[Token], line_no: usize) -> Result<Stmt> {
        self.line = line_no + 1;
        if row.len() < 2 {
            return Err(Error::syntax(line_no, "switch needs a scrutinee"));
        }
        let scrutinee = self.parse_expr(row, 1, row.len() - 1, line_no)?;
        if !scrutinee.ty().is_numeric() {
            return Err(Error::TypeError {
                line: line_no,
                message: format!("switch scrutinee must be numeric, found {}", scrutinee.ty()),
            });
        }

        let mut arms: Vec<CaseArm> = Vec::new();
        let mut seen: Vec<Value> = Vec::new();

        loop {
            if self.line >= self.rows.len() {
                return Err(Error::syntax(
                    line_no,
                    "switch requires a terminating 'default' block",
                ));
            }
            let case_line = self.line;
            let row = match &self.rows[case_line] {
                None => {
                    self.errors += 1;
                    self.line = case_line + 1;
                    continue;
                }
                Some(row) if row.is_empty() => {
                    self.line = case_line + 1;
                    continue;
                }
                Some(row) => row.clone(),
            };

            match row[0].kind {
                TokenKind::Keyword(KeywordKind::Case) => {
                    if row.len() < 2 {
                        return Err(Error::syntax(case_line, "case needs at least one value"));
                    }
                    let matches = self.parse_case_values(&row, case_line, &mut seen);
                    self.line = case_line + 1;
                    let body = self.block_body(case_line, "case");
                    arms.push(CaseArm { matches: Some(matches), body });
                }
                TokenKind::Keyword(KeywordKind::Default) => {
                    if row.len() > 1 {
                        return Err(Error::syntax(case_line, "'default' takes no values"));
                    }
                    self.line = case_line + 1;
                    let body = self.block_body(case_line, "default");
                    arms.push(CaseArm { matches: None, body });
                    return Ok(Stmt::Switch { scrutinee, arms });
                }
                _ => {
                    return Err(Error::syntax(
                        case_line,
                        "expected 'case' or 'default' inside switch",
                    ))
                }
            }
        }
    }

    /// Case match values: numeric literals or declared numeric variables.
    /// Wrong-typed and duplicate values are dropped with a warning.
    fn parse_case_values(
        &mut self,
        row: &[Token],
        line_no: usize,
        seen: &mut Vec<Value>,
    ) -> Vec<CaseValue> {
        let mut values = Vec::new();
        for token in &row[1..] {
            match &token.kind {
                TokenKind::Operator { op: OpKind::Sep, .. } => {}
                TokenKind::Value(value) => {
                    if !value.is_numeric() {
                        self.warn(
                            line_no,
                            format!("case value {} is not numeric; ignored", value.render()),
                        );
                        continue;
                    }
                    if seen.iter().any(|v| values_equal(v, value)) {
                        self.warn(
                            line_no,
                            format!("duplicate case value {}; ignored", value.render()),
                        );
                        continue;
                    }
                    seen.push(value.clone());
                    values.push(CaseValue::Constant(value.clone()));
                }
                TokenKind::Variable(name) => {
                    match self.variables.declared_type(name) {
                        Some(ty) if ty.is_numeric() => {
                            values.push(CaseValue::Variable(name.clone()));
                        }
                        Some(_) => self.warn(
                            line_no,
                            format!("case variable '{}' is not numeric; ignored", name),
                        ),
                        None => self.warn(
                            line_no,
                            format!("case variable '{}' is not declared; ignored", name),
                        ),
                    }
                }
                _ => self.warn(line_no, "unexpected token in case values; ignored"),
            }
        }
        values
    }

    // --- expressions ---

    /// Parse and fold the expression spanning `row[start..=end]`
    fn parse_expr(
        &mut self,
        row: &[Token],
        start: usize,
        end: usize,
        line_no: usize,
    ) -> Result<Expr> {
        if start > end || end >= row.len() {
            return Err(Error::syntax(line_no, "expression expected"));
        }
        self.validate_span(row, start, end, line_no)?;
        Ok(self.expr_inner(row, start, end, line_no)?.fold())
    }

    /// Structural validation of an expression span: balanced brackets of
    /// matching kinds, no assignment operators, no keywords, separators
    /// only inside brackets
    fn validate_span(&self, row: &[Token], start: usize, end: usize, line_no: usize) -> Result<()> {
        let mut stack = Vec::new();
        for token in &row[start..=end] {
            match &token.kind {
                TokenKind::Bracket { kind, closing: false } => stack.push(*kind),
                TokenKind::Bracket { kind, closing: true } => {
                    if stack.pop() != Some(*kind) {
                        return Err(Error::syntax(line_no, "mismatched brackets"));
                    }
                }
                TokenKind::Operator { assign: true, .. } => {
                    return Err(Error::syntax(line_no, "unexpected '=' in expression"))
                }
                TokenKind::Operator { op: OpKind::Sep, .. } if stack.is_empty() => {
                    return Err(Error::syntax(line_no, "unexpected separator in expression"))
                }
                TokenKind::Keyword(kw) => {
                    return Err(Error::syntax(
                        line_no,
                        format!("unexpected keyword '{}' in expression", kw.lexeme()),
                    ))
                }
                _ => {}
            }
        }
        if !stack.is_empty() {
            return Err(Error::syntax(line_no, "unclosed bracket in expression"));
        }
        Ok(())
    }

    fn expr_inner(&mut self, row: &[Token], start: usize, end: usize, line_no: usize) -> Result<Expr> {
        if start > end {
            return Err(Error::syntax(line_no, "expression expected"));
        }
        if start == end {
            return self.leaf(&row[start], line_no);
        }

        match self.find_split(row, start, end) {
            Some((_, OpKind::Ter1 | OpKind::Ter2)) => self.parse_ternary(row, start, end, line_no),
            Some((idx, op)) if op.is_unary() => {
                if idx != start {
                    return Err(Error::syntax(
                        line_no,
                        format!("unexpected tokens before unary '{}'", op.lexeme()),
                    ));
                }
                let arg = self.expr_inner(row, idx + 1, end, line_no)?;
                Expr::unary(op, arg, line_no)
            }
            Some((idx, OpKind::Dot)) => self.parse_member(row, start, idx, end, line_no),
            Some((idx, op)) => {
                if idx == start || idx == end {
                    return Err(Error::syntax(
                        line_no,
                        format!("operator '{}' is missing an operand", op.lexeme()),
                    ));
                }
                let left = self.expr_inner(row, start, idx - 1, line_no)?;
                let right = self.expr_inner(row, idx + 1, end, line_no)?;
                Expr::binary(op, left, right, line_no)
            }
            None => {
                // no depth-0 operator: a bracketed group or a constructor
                if row[start].is_bracket(false) && self.matching_close(row, start, end) == Some(end)
                {
                    return self.expr_inner(row, start + 1, end - 1, line_no);
                }
                if let TokenKind::TypeName(ty) = row[start].kind {
                    return self.parse_construct(row, start, end, ty, line_no);
                }
                Err(Error::syntax(line_no, "expression expected"))
            }
        }
    }

    /// Find the split operator: the depth-0 operator with the lowest
    /// priority, keeping the rightmost among equal binaries and the
    /// leftmost among equal unaries
    fn find_split(&self, row: &[Token], start: usize, end: usize) -> Option<(usize, OpKind)> {
        let mut depth = 0i32;
        let mut best: Option<(usize, OpKind)> = None;
        for i in (start..=end).rev() {
            match &row[i].kind {
                TokenKind::Bracket { closing: true, .. } => depth += 1,
                TokenKind::Bracket { closing: false, .. } => depth -= 1,
                TokenKind::Operator { op, .. } if depth == 0 => {
                    if matches!(op, OpKind::Sep | OpKind::Assign) {
                        continue;
                    }
                    let replace = match best {
                        None => true,
                        Some((_, b)) => {
                            op.priority() < b.priority()
                                || (op.priority() == b.priority() && op.is_unary())
                        }
                    };
                    if replace {
                        best = Some((i, *op));
                    }
                }
                _ => {}
            }
        }
        best
    }

    /// Group `cond ? a : b`, pairing the leftmost depth-0 `?` with its
    /// matching `:` so chained ternaries nest to the right
    fn parse_ternary(&mut self, row: &[Token], start: usize, end: usize, line_no: usize) -> Result<Expr> {
        let mut depth = 0i32;
        let mut question = None;
        for i in start..=end {
            match &row[i].kind {
                TokenKind::Bracket { closing: false, .. } => depth += 1,
                TokenKind::Bracket { closing: true, .. } => depth -= 1,
                TokenKind::Operator { op: OpKind::Ter1, .. } if depth == 0 => {
                    question = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let question = question.ok_or_else(|| Error::syntax(line_no, "':' without a '?'"))?;

        let mut depth = 0i32;
        let mut nesting = 1i32;
        let mut colon = None;
        for i in question + 1..=end {
            match &row[i].kind {
                TokenKind::Bracket { closing: false, .. } => depth += 1,
                TokenKind::Bracket { closing: true, .. } => depth -= 1,
                TokenKind::Operator { op: OpKind::Ter1, .. } if depth == 0 => nesting += 1,
                TokenKind::Operator { op: OpKind::Ter2, .. } if depth == 0 => {
                    nesting -= 1;
                    if nesting == 0 {
                        colon = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let colon = colon.ok_or_else(|| Error::syntax(line_no, "'?' without a ':'"))?;

        if question == start || colon == question + 1 || colon == end {
            return Err(Error::syntax(line_no, "ternary is missing an operand"));
        }
        let cond = self.expr_inner(row, start, question - 1, line_no)?;
        let when_true = self.expr_inner(row, question + 1, colon - 1, line_no)?;
        let when_false = self.expr_inner(row, colon + 1, end, line_no)?;
        Expr::ternary(cond, when_true, when_false, line_no)
    }

    /// Member access: `owner.name` property read or `owner.name(args)`
    /// method call, resolved against the registry
    fn parse_member(
        &mut self,
        row: &[Token],
        start: usize,
        dot: usize,
        end: usize,
        line_no: usize,
    ) -> Result<Expr> {
        if dot == start {
            return Err(Error::syntax(line_no, "member access is missing its owner"));
        }
        let owner = self.expr_inner(row, start, dot - 1, line_no)?;
        let name = match row.get(dot + 1).map(|t| &t.kind) {
            Some(TokenKind::Member(name)) => name.clone(),
            _ => return Err(Error::syntax(line_no, "member name expected after '.'")),
        };

        if dot + 1 == end {
            let property = self
                .registry
                .find_property(owner.ty(), &name)
                .ok_or_else(|| {
                    Error::syntax(
                        line_no,
                        format!("member '{}' does not exist for type {}", name, owner.ty()),
                    )
                })?;
            return Ok(Expr::property(owner, name, property.ret));
        }

        let open = dot + 2;
        if !row[open].is_bracket(false) || self.matching_close(row, open, end) != Some(end) {
            return Err(Error::syntax(
                line_no,
                format!("malformed call of member '{}'", name),
            ));
        }
        let args = self.parse_args(row, open, end, line_no)?;
        let method = self
            .registry
            .find_method(owner.ty(), &name)
            .ok_or_else(|| {
                Error::syntax(
                    line_no,
                    format!("method '{}' does not exist for type {}", name, owner.ty()),
                )
            })?;
        if method.params.len() != args.len() {
            return Err(Error::syntax(
                line_no,
                format!(
                    "method '{}' takes {} argument(s), {} given",
                    name,
                    method.params.len(),
                    args.len()
                ),
            ));
        }
        for (param, arg) in method.params.iter().zip(&args) {
            if !param.accepts(arg.ty()) {
                return Err(Error::TypeError {
                    line: line_no,
                    message: format!(
                        "method '{}' expects {}, found {}",
                        name,
                        param,
                        arg.ty()
                    ),
                });
            }
        }
        Ok(Expr::method(owner, name, args, method.ret))
    }

    /// Constructor call: a type name followed by a bracketed argument list
    fn parse_construct(
        &mut self,
        row: &[Token],
        start: usize,
        end: usize,
        ty: Type,
        line_no: usize,
    ) -> Result<Expr> {
        let open = start + 1;
        if open >= end || !row[open].is_bracket(false) || self.matching_close(row, open, end) != Some(end)
        {
            return Err(Error::syntax(
                line_no,
                format!("malformed constructor call of {}", ty),
            ));
        }
        let args = self.parse_args(row, open, end, line_no)?;
        let arg_types: Vec<Type> = args.iter().map(Expr::ty).collect();
        if self.registry.find_constructor(ty, &arg_types).is_none() {
            return Err(Error::syntax(
                line_no,
                format!("no constructor of {} accepts the given arguments", ty),
            ));
        }
        Ok(Expr::construct(ty, args))
    }

    /// Split the bracketed span `row[open..=close]` into argument
    /// expressions at depth-0 separators
    fn parse_args(
        &mut self,
        row: &[Token],
        open: usize,
        close: usize,
        line_no: usize,
    ) -> Result<Vec<Expr>> {
        if open + 1 == close {
            return Ok(Vec::new());
        }
        let mut args = Vec::new();
        let mut depth = 0i32;
        let mut piece_start = open + 1;
        for i in open + 1..close {
            match &row[i].kind {
                TokenKind::Bracket { closing: false, .. } => depth += 1,
                TokenKind::Bracket { closing: true, .. } => depth -= 1,
                TokenKind::Operator { op: OpKind::Sep, .. } if depth == 0 => {
                    if i == piece_start {
                        return Err(Error::syntax(line_no, "empty argument"));
                    }
                    args.push(self.expr_inner(row, piece_start, i - 1, line_no)?);
                    piece_start = i + 1;
                }
                _ => {}
            }
        }
        if piece_start >= close {
            return Err(Error::syntax(line_no, "empty argument"));
        }
        args.push(self.expr_inner(row, piece_start, close - 1, line_no)?);
        Ok(args)
    }

    /// Index of the bracket closing `row[open]`, bounded by `end`
    fn matching_close(&self, row: &[Token], open: usize, end: usize) -> Option<usize> {
        let mut depth = 0i32;
        for (i, token) in row.iter().enumerate().take(end + 1).skip(open) {
            match &token.kind {
                TokenKind::Bracket { closing: false, .. } => depth += 1,
                TokenKind::Bracket { closing: true, .. } => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn leaf(&mut self, token: &Token, line_no: usize) -> Result<Expr> {
        match &token.kind {
            TokenKind::Value(value) => Ok(Expr::constant(value.clone())),
            TokenKind::Variable(name) => match self.variables.declared_type(name) {
                Some(ty) => Ok(Expr::variable(name.clone(), ty)),
                None => Err(Error::syntax(
                    line_no,
                    format!("variable '{}' is used before it is declared", name),
                )),
            },
            _ => Err(Error::syntax(line_no, "unexpected token in expression")),
        }
    }
}
