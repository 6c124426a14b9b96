use tracing::debug;

use crate::frontend::lexer::{significant, unquote};
use crate::frontend::parser_error::{ParserError, SyntaxKind};
use crate::frontend::token::{Keyword, Token, TokenKind};
use crate::lang::node::{BinOp, Expr, Operation, Stmt};
use crate::lang::program::{ContextError, Program, ProgramContext};
use crate::lang::types::ValueType;

/// A GOTO whose target can only be checked once every line has been seen.
#[derive(Debug, Clone)]
struct PendingGoto {
    line: u32,
    target: u32,
    row: usize,
    col: usize,
}

/// Line-oriented parser.
///
/// Each source line is `<line number> <statement>`. Lines are fed one at a
/// time with [`Parser::parse_line`]; every accepted line records its label and
/// appends at most one statement. [`Parser::finish`] checks GOTO targets and
/// hands back the [`Program`].
///
/// The first error aborts: there is no resynchronisation.
pub struct Parser {
    context: ProgramContext,
    statements: Vec<Stmt>,
    last_line: Option<u32>,
    gotos: Vec<PendingGoto>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            context: ProgramContext::new(),
            statements: Vec::new(),
            last_line: None,
            gotos: Vec::new(),
        }
    }

    /// Parses a whole source text.
    pub fn parse(source: &str) -> Result<Program, ParserError> {
        let mut parser = Parser::new();
        for (index, line) in source.split_inclusive('\n').enumerate() {
            parser.parse_line(index + 1, line)?;
        }
        parser.finish()
    }

    /// Parses one physical line. `row` is its 1-based position in the file.
    pub fn parse_line(&mut self, row: usize, text: &str) -> Result<(), ParserError> {
        let owned;
        let text = if text.ends_with('\n') {
            text
        } else {
            owned = format!("{}\n", text);
            owned.as_str()
        };

        let tokens: Vec<Token> = significant(text).collect();
        let mut line = LineParser {
            source: text,
            tokens,
            pos: 0,
            row,
            line: None,
            context: &mut self.context,
            gotos: &mut self.gotos,
        };

        if line.peek().kind == TokenKind::EndOfLine {
            return Ok(());
        }

        let number = line.line_number()?;
        if let Some(last) = self.last_line {
            if number <= last {
                return Err(line.error(
                    SyntaxKind::Parse,
                    format!(
                        "line numbers not strictly increasing: {} follows {}",
                        number, last
                    ),
                ));
            }
        }
        line.line = Some(number);
        line.reject_lex_errors()?;

        line.context.set_label(number, self.statements.len());
        if let Some(stmt) = line.statement()? {
            self.statements.push(stmt);
        }
        self.last_line = Some(number);
        Ok(())
    }

    /// Validates GOTO targets and returns the parsed program.
    pub fn finish(self) -> Result<Program, ParserError> {
        for goto in &self.gotos {
            if self.context.label(goto.target).is_none() {
                return Err(ParserError {
                    kind: SyntaxKind::Parse,
                    message: format!("undefined line number {} in GOTO", goto.target),
                    line: Some(goto.line),
                    row: goto.row,
                    col: goto.col,
                });
            }
        }

        debug!(
            lines = self.context.labels().len(),
            statements = self.statements.len(),
            "parsed program"
        );

        Ok(Program {
            context: self.context,
            statements: self.statements,
        })
    }
}

/// Parses a complete program from source text.
pub fn parse_program(source: &str) -> Result<Program, ParserError> {
    Parser::parse(source)
}

/// Operator stack entry for the shunting-yard pass.
#[derive(Clone, Copy)]
enum Pending {
    Op(BinOp, Token),
    Group(Token),
}

struct LineParser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    row: usize,
    line: Option<u32>,
    context: &'a mut ProgramContext,
    gotos: &'a mut Vec<PendingGoto>,
}

impl<'a> LineParser<'a> {
    /// Current token. Lines always end in `EndOfLine`, which is sticky.
    fn peek(&self) -> Token {
        let last = self.tokens.len().saturating_sub(1);
        self.tokens[self.pos.min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn text(&self, token: &Token) -> &'a str {
        token.text(self.source)
    }

    fn error(&self, kind: SyntaxKind, message: impl Into<String>) -> ParserError {
        self.error_at(&self.peek(), kind, message)
    }

    fn error_at(&self, token: &Token, kind: SyntaxKind, message: impl Into<String>) -> ParserError {
        ParserError {
            kind,
            message: message.into(),
            line: self.line,
            row: self.row,
            col: token.start + 1,
        }
    }

    fn line_number(&mut self) -> Result<u32, ParserError> {
        let token = self.peek();
        if token.kind != TokenKind::Integer {
            return Err(self.error(
                SyntaxKind::Parse,
                "line must start with an integer line number",
            ));
        }
        let number = self
            .text(&token)
            .parse::<u32>()
            .map_err(|_| self.error(SyntaxKind::Parse, "line number out of range"))?;
        self.advance();
        Ok(number)
    }

    fn reject_lex_errors(&self) -> Result<(), ParserError> {
        match self.tokens.iter().find(|t| t.kind == TokenKind::Error) {
            Some(token) => Err(self.error_at(
                token,
                SyntaxKind::Lex,
                token.message.unwrap_or("invalid token"),
            )),
            None => Ok(()),
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, context: &str) -> Result<(), ParserError> {
        if self.peek().is_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(
                SyntaxKind::Parse,
                format!("{} expecting {}", context, keyword.as_str()),
            ))
        }
    }

    fn expect_end_of_line(&self) -> Result<(), ParserError> {
        let token = self.peek();
        if token.kind == TokenKind::EndOfLine {
            Ok(())
        } else {
            Err(self.error(
                SyntaxKind::Parse,
                format!("expecting end of line, found {:?}", self.text(&token)),
            ))
        }
    }

    /// Reads a variable reference and resolves it in the symbol table.
    fn variable(&mut self, context: &str) -> Result<(ValueType, u16), ParserError> {
        let token = self.peek();
        if token.kind != TokenKind::Identifier {
            return Err(self.error(
                SyntaxKind::Parse,
                format!("{} expecting a variable name", context),
            ));
        }
        let name = self.text(&token);
        let symbol = self.context.lookup(name).ok_or_else(|| {
            self.error(SyntaxKind::Parse, format!("undefined variable {}", name))
        })?;
        let resolved = (symbol.ty, symbol.slot);
        self.advance();
        Ok(resolved)
    }

    fn statement(&mut self) -> Result<Option<Stmt>, ParserError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Keyword(Keyword::Dim) => {
                self.advance();
                self.dim()?;
                Ok(None)
            }
            TokenKind::Keyword(Keyword::Input) => {
                self.advance();
                self.input().map(Some)
            }
            TokenKind::Keyword(Keyword::If) => {
                self.advance();
                self.if_then().map(Some)
            }
            TokenKind::Keyword(Keyword::Print) => {
                self.advance();
                self.print().map(Some)
            }
            TokenKind::Keyword(Keyword::Goto) => {
                self.advance();
                self.goto().map(Some)
            }
            TokenKind::Keyword(Keyword::End) => {
                self.advance();
                self.expect_end_of_line()?;
                Ok(Some(Stmt::End))
            }
            TokenKind::Keyword(Keyword::Let) => {
                self.advance();
                self.assign().map(Some)
            }
            TokenKind::Identifier => self.assign().map(Some),
            TokenKind::EndOfLine => Err(self.error(SyntaxKind::Parse, "missing statement")),
            _ => Err(self.error(
                SyntaxKind::Parse,
                format!("unrecognized statement {:?}", self.text(&token)),
            )),
        }
    }

    fn dim(&mut self) -> Result<(), ParserError> {
        let name_token = self.peek();
        match name_token.kind {
            TokenKind::Identifier => {}
            TokenKind::Keyword(k) => {
                return Err(self.error(
                    SyntaxKind::Parse,
                    format!("cannot use keyword {} as a variable name", k.as_str()),
                ));
            }
            _ => return Err(self.error(SyntaxKind::Parse, "DIM expecting a variable name")),
        }
        self.advance();
        self.expect_keyword(Keyword::As, "DIM")?;

        let ty = match self.peek().kind {
            TokenKind::Keyword(Keyword::Integer) => ValueType::Int,
            TokenKind::Keyword(Keyword::String) => ValueType::Str,
            _ => {
                let found = self.text(&self.peek()).to_string();
                return Err(self.error(SyntaxKind::Parse, format!("unknown type {:?}", found)));
            }
        };
        self.advance();
        self.expect_end_of_line()?;

        let name = name_token.text(self.source);
        let declared = self.context.declare(name, ty).map(|_| ());
        match declared {
            Ok(()) => Ok(()),
            Err(ContextError::AlreadyDefined(name)) => Err(self.error_at(
                &name_token,
                SyntaxKind::Parse,
                format!("variable {} already defined", name),
            )),
            Err(other) => Err(self.context_error(&name_token, other)),
        }
    }

    fn context_error(&self, token: &Token, err: ContextError) -> ParserError {
        let message = match err {
            ContextError::AlreadyDefined(name) => format!("variable {} already defined", name),
            ContextError::TooManySlots(ty) => format!("too many {} variables", ty),
            ContextError::PoolFull(ty) => format!("too many distinct {} constants", ty),
        };
        self.error_at(token, SyntaxKind::Parse, message)
    }

    fn input(&mut self) -> Result<Stmt, ParserError> {
        let prompt = self.expr()?;
        if self.peek().kind != TokenKind::Semicolon {
            return Err(self.error(SyntaxKind::Parse, "INPUT expecting ; after message"));
        }
        self.advance();
        let (ty, slot) = self.variable("INPUT")?;
        self.expect_end_of_line()?;
        Ok(Stmt::Input { prompt, ty, slot })
    }

    fn if_then(&mut self) -> Result<Stmt, ParserError> {
        let start = self.peek();
        let cond = self.expr()?;
        if cond.ty() != ValueType::Int {
            return Err(self.error_at(
                &start,
                SyntaxKind::Type,
                format!("IF condition must be int, found {}", cond.ty()),
            ));
        }
        self.expect_keyword(Keyword::Then, "IF")?;

        if self.peek().is_keyword(Keyword::Dim) {
            return Err(self.error(SyntaxKind::Parse, "DIM is not allowed after THEN"));
        }
        let then = self
            .statement()?
            .ok_or_else(|| self.error(SyntaxKind::Parse, "IF expecting a statement after THEN"))?;
        Ok(Stmt::If {
            cond,
            then: Box::new(then),
        })
    }

    fn print(&mut self) -> Result<Stmt, ParserError> {
        let mut items = Vec::new();
        loop {
            items.push(self.expr()?);
            match self.peek().kind {
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::EndOfLine => break,
                _ => {
                    return Err(self.error(
                        SyntaxKind::Parse,
                        "PRINT expecting expressions separated by ;",
                    ));
                }
            }
        }
        Ok(Stmt::Print(items))
    }

    fn goto(&mut self) -> Result<Stmt, ParserError> {
        let token = self.peek();
        if token.kind != TokenKind::Integer {
            return Err(self.error(SyntaxKind::Parse, "GOTO expecting integer line number"));
        }
        let target = self
            .text(&token)
            .parse::<u32>()
            .map_err(|_| self.error(SyntaxKind::Parse, "line number out of range"))?;
        self.advance();
        self.expect_end_of_line()?;

        self.gotos.push(PendingGoto {
            line: self.line.unwrap_or_default(),
            target,
            row: self.row,
            col: token.start + 1,
        });
        Ok(Stmt::Goto(target))
    }

    fn assign(&mut self) -> Result<Stmt, ParserError> {
        let target = self.peek();
        let (ty, slot) = self.variable("LET")?;

        let eq = self.peek();
        if eq.kind != TokenKind::Operator || self.text(&eq) != "=" {
            return Err(self.error(SyntaxKind::Parse, "LET expected = sign for assignment"));
        }
        self.advance();

        let value = self.expr()?;
        if value.ty() != ty {
            return Err(self.error_at(
                &target,
                SyntaxKind::Type,
                format!(
                    "cannot assign {} value to {} variable {}",
                    value.ty(),
                    ty,
                    target.text(self.source)
                ),
            ));
        }
        self.expect_end_of_line()?;
        Ok(Stmt::Assign { ty, slot, value })
    }

    /// Operator-precedence expression parser.
    ///
    /// Stops (without consuming) at `;`, `THEN` or end of line. Operands and
    /// operators must alternate; `(` and `)` group.
    fn expr(&mut self) -> Result<Expr, ParserError> {
        let mut output: Vec<Expr> = Vec::new();
        let mut pending: Vec<Pending> = Vec::new();
        let mut expect_operand = true;

        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Semicolon | TokenKind::EndOfLine | TokenKind::Keyword(Keyword::Then) => {
                    break;
                }
                TokenKind::Integer if expect_operand => {
                    let value = self.text(&token).parse::<i32>().map_err(|_| {
                        self.error(SyntaxKind::Parse, "integer literal out of range")
                    })?;
                    let index = self
                        .context
                        .add_int_const(value)
                        .map_err(|e| self.context_error(&token, e))?;
                    output.push(Expr::Const {
                        ty: ValueType::Int,
                        index,
                    });
                    expect_operand = false;
                }
                TokenKind::String if expect_operand => {
                    let value = unquote(self.text(&token));
                    let index = self
                        .context
                        .add_str_const(&value)
                        .map_err(|e| self.context_error(&token, e))?;
                    output.push(Expr::Const {
                        ty: ValueType::Str,
                        index,
                    });
                    expect_operand = false;
                }
                TokenKind::Identifier if expect_operand => {
                    let name = self.text(&token);
                    let symbol = self.context.lookup(name).ok_or_else(|| {
                        self.error(SyntaxKind::Parse, format!("undefined variable {}", name))
                    })?;
                    output.push(Expr::Var {
                        ty: symbol.ty,
                        slot: symbol.slot,
                    });
                    expect_operand = false;
                }
                TokenKind::Float => {
                    return Err(self.error(
                        SyntaxKind::Parse,
                        "floating-point literals are not supported",
                    ));
                }
                TokenKind::LParen if expect_operand => pending.push(Pending::Group(token)),
                TokenKind::Operator if !expect_operand => {
                    let symbol = self.text(&token);
                    let op = BinOp::from_symbol(symbol).ok_or_else(|| {
                        self.error(
                            SyntaxKind::Parse,
                            format!("unsupported operator {}", symbol),
                        )
                    })?;
                    // left-associative: reduce while the stacked operator binds at least as tightly
                    while let Some(Pending::Op(top, top_token)) = pending.last().copied() {
                        if top.precedence() < op.precedence() {
                            break;
                        }
                        pending.pop();
                        self.reduce(&mut output, top, &top_token)?;
                    }
                    pending.push(Pending::Op(op, token));
                    expect_operand = true;
                }
                TokenKind::RParen if !expect_operand => loop {
                    match pending.pop() {
                        Some(Pending::Op(op, op_token)) => self.reduce(&mut output, op, &op_token)?,
                        Some(Pending::Group(_)) => break,
                        None => return Err(self.error(SyntaxKind::Parse, "unbalanced )")),
                    }
                },
                _ => {
                    let what = if expect_operand {
                        "expecting an operand"
                    } else {
                        "expecting an operator"
                    };
                    return Err(self.error(
                        SyntaxKind::Parse,
                        format!("invalid token in expression {:?}: {}", self.text(&token), what),
                    ));
                }
            }
            self.advance();
        }

        if expect_operand {
            return Err(self.error(SyntaxKind::Parse, "incomplete expression"));
        }

        while let Some(item) = pending.pop() {
            match item {
                Pending::Op(op, op_token) => self.reduce(&mut output, op, &op_token)?,
                Pending::Group(open) => {
                    return Err(self.error_at(&open, SyntaxKind::Parse, "missing )"));
                }
            }
        }

        match (output.pop(), output.is_empty()) {
            (Some(expr), true) => Ok(expr),
            _ => Err(self.error(SyntaxKind::Parse, "incomplete expression")),
        }
    }

    /// Pops two operands, type-checks them against `op` and pushes the result.
    fn reduce(&self, output: &mut Vec<Expr>, op: BinOp, token: &Token) -> Result<(), ParserError> {
        let (Some(rhs), Some(lhs)) = (output.pop(), output.pop()) else {
            return Err(self.error_at(token, SyntaxKind::Parse, "incomplete expression"));
        };
        let operation = Operation::resolve(lhs.ty(), op, rhs.ty()).ok_or_else(|| {
            self.error_at(
                token,
                SyntaxKind::Type,
                format!(
                    "invalid use of operator types {} {} {}",
                    lhs.ty(),
                    op.symbol(),
                    rhs.ty()
                ),
            )
        })?;
        output.push(Expr::Binary {
            op: operation,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::parse(source).expect("program should parse")
    }

    fn parse_err(source: &str) -> ParserError {
        match Parser::parse(source) {
            Ok(program) => panic!("expected an error, got {:?}", program.statements),
            Err(e) => e,
        }
    }

    fn int_const(index: u16) -> Expr {
        Expr::Const {
            ty: ValueType::Int,
            index,
        }
    }

    #[test]
    fn test_dim_assign_print() {
        let program = parse("10 DIM I AS INTEGER\n20 I = 1 + 2\n30 PRINT I\n40 END\n");
        assert_eq!(
            program.statements,
            vec![
                Stmt::Assign {
                    ty: ValueType::Int,
                    slot: 0,
                    value: Expr::Binary {
                        op: Operation::AddInt,
                        lhs: Box::new(int_const(0)),
                        rhs: Box::new(int_const(1)),
                    },
                },
                Stmt::Print(vec![Expr::Var {
                    ty: ValueType::Int,
                    slot: 0
                }]),
                Stmt::End,
            ]
        );
        // DIM produces no statement, so line 10 and 20 share index 0
        assert_eq!(program.context.label(10), Some(0));
        assert_eq!(program.context.label(20), Some(0));
        assert_eq!(program.context.label(40), Some(2));
        assert_eq!(program.context.int_pool(), &[1, 2]);
    }

    #[test]
    fn test_let_keyword_is_optional() {
        let a = parse("10 DIM A AS INTEGER\n20 LET A = 5\n");
        let b = parse("10 DIM A AS INTEGER\n20 A = 5\n");
        assert_eq!(a.statements, b.statements);
    }

    #[test]
    fn test_precedence_and_grouping() {
        let program = parse("10 DIM A AS INTEGER\n20 A = 1 + 2 * 3\n30 A = (1 + 2) * 3\n");
        match &program.statements[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::Binary { op, rhs, .. } => {
                    assert_eq!(*op, Operation::AddInt);
                    assert!(matches!(
                        **rhs,
                        Expr::Binary {
                            op: Operation::MulInt,
                            ..
                        }
                    ));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
        match &program.statements[1] {
            Stmt::Assign {
                value: Expr::Binary { op, lhs, .. },
                ..
            } => {
                assert_eq!(*op, Operation::MulInt);
                assert!(matches!(
                    **lhs,
                    Expr::Binary {
                        op: Operation::AddInt,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let program = parse("10 DIM A AS INTEGER\n20 A = 10 - 3 - 2\n");
        match &program.statements[0] {
            Stmt::Assign {
                value: Expr::Binary { op, lhs, rhs },
                ..
            } => {
                assert_eq!(*op, Operation::SubInt);
                assert!(matches!(
                    **lhs,
                    Expr::Binary {
                        op: Operation::SubInt,
                        ..
                    }
                ));
                assert_eq!(**rhs, int_const(2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_equality_binds_loosest() {
        let program = parse("10 DIM A AS INTEGER\n20 IF A + 1 = 2 THEN END\n");
        match &program.statements[0] {
            Stmt::If { cond, then } => {
                assert!(matches!(
                    cond,
                    Expr::Binary {
                        op: Operation::EqInt,
                        ..
                    }
                ));
                assert_eq!(**then, Stmt::End);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_string_ops_and_pool_dedup() {
        let program = parse(
            "10 DIM S AS STRING\n20 S = \"a\" + \"b\"\n30 IF S = \"a\" THEN PRINT \"yes\"\n",
        );
        assert_eq!(
            program.context.str_pool(),
            &["a".to_string(), "b".to_string(), "yes".to_string()]
        );
        match &program.statements[1] {
            Stmt::If { cond, .. } => assert_eq!(cond.ty(), ValueType::Int),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_escaped_quotes_in_literal() {
        let program = parse("10 PRINT \"say \"\"hi\"\"\"\n");
        assert_eq!(program.context.str_pool(), &["say \"hi\"".to_string()]);
    }

    #[test]
    fn test_input_and_print_list() {
        let program =
            parse("10 DIM N AS STRING\n20 INPUT \"name? \"; N\n30 PRINT \"hi \"; N; 1\n");
        assert_eq!(
            program.statements[0],
            Stmt::Input {
                prompt: Expr::Const {
                    ty: ValueType::Str,
                    index: 0
                },
                ty: ValueType::Str,
                slot: 0,
            }
        );
        match &program.statements[1] {
            Stmt::Print(items) => assert_eq!(items.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let program = parse("\n10 END\n   \n\n20 END");
        assert_eq!(program.statements, vec![Stmt::End, Stmt::End]);
    }

    #[test]
    fn test_type_error_names_types_and_line() {
        let err = parse_err("10 DIM I AS INTEGER\n20 I = 1 + \"x\"\n");
        assert_eq!(err.kind, SyntaxKind::Type);
        assert_eq!(err.line, Some(20));
        assert!(err.message.contains("int + str"), "{}", err.message);
        let shown = err.to_string();
        assert!(shown.contains("line 20"), "{}", shown);
    }

    #[test]
    fn test_assignment_type_mismatch() {
        let err = parse_err("10 DIM I AS INTEGER\n20 I = \"x\"\n");
        assert_eq!(err.kind, SyntaxKind::Type);
        assert!(err.message.contains("cannot assign str"), "{}", err.message);
    }

    #[test]
    fn test_string_condition_rejected() {
        let err = parse_err("10 IF \"a\" THEN END\n");
        assert_eq!(err.kind, SyntaxKind::Type);
    }

    #[test]
    fn test_line_numbers_must_increase() {
        let err = parse_err("10 END\n10 END\n");
        assert_eq!(err.kind, SyntaxKind::Parse);
        assert!(err.message.contains("not strictly increasing"));

        let err = parse_err("20 END\n10 END\n");
        assert!(err.message.contains("10 follows 20"));
    }

    #[test]
    fn test_missing_line_number() {
        let err = parse_err("PRINT 1\n");
        assert_eq!(err.kind, SyntaxKind::Parse);
        assert_eq!(err.line, None);
        assert_eq!(err.row, 1);
    }

    #[test]
    fn test_undefined_variable() {
        let err = parse_err("10 PRINT X\n");
        assert!(err.message.contains("undefined variable X"));
        let err = parse_err("10 X = 1\n");
        assert!(err.message.contains("undefined variable X"));
    }

    #[test]
    fn test_redefinition_and_keyword_names() {
        let err = parse_err("10 DIM A AS INTEGER\n20 DIM A AS STRING\n");
        assert!(err.message.contains("already defined"));
        let err = parse_err("10 DIM PRINT AS INTEGER\n");
        assert!(err.message.contains("keyword PRINT"));
        let err = parse_err("10 DIM A AS FLOAT\n");
        assert!(err.message.contains("unknown type"));
    }

    #[test]
    fn test_undefined_goto_target() {
        let err = parse_err("10 GOTO 100\n20 END\n");
        assert_eq!(err.kind, SyntaxKind::Parse);
        assert_eq!(err.line, Some(10));
        assert!(err.message.contains("undefined line number 100"));

        let err = parse_err("10 IF 1 THEN GOTO 5\n");
        assert!(err.message.contains("undefined line number 5"));
    }

    #[test]
    fn test_lex_errors_are_reported() {
        let err = parse_err("10 PRINT \"oops\n");
        assert_eq!(err.kind, SyntaxKind::Lex);
        assert_eq!(err.col, 10);
        let err = parse_err("10 PRINT 1 ? 2\n");
        assert_eq!(err.kind, SyntaxKind::Lex);
    }

    #[test]
    fn test_control_bytes_in_strings_are_lex_errors() {
        let err = parse_err("10 DIM S AS STRING\n20 PRINT \"a\0b\"; S\n");
        assert_eq!(err.kind, SyntaxKind::Lex);
        assert_eq!(err.line, Some(20));
        assert_eq!(err.col, 10);
        assert!(err.message.contains("illegal character in string literal"));
    }

    #[test]
    fn test_malformed_expressions() {
        for source in [
            "10 PRINT\n",
            "10 PRINT 1 +\n",
            "10 PRINT 1 2\n",
            "10 PRINT (1\n",
            "10 PRINT 1)\n",
            "10 PRINT 1 < 2\n",
            "10 PRINT 1.5\n",
            "10 PRINT * 2\n",
        ] {
            let err = parse_err(source);
            assert_eq!(err.kind, SyntaxKind::Parse, "{}", source);
        }
    }

    #[test]
    fn test_integer_literal_range() {
        assert!(Parser::parse("10 PRINT 2147483647\n").is_ok());
        let err = parse_err("10 PRINT 2147483648\n");
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn test_trailing_garbage() {
        let err = parse_err("10 END 5\n");
        assert!(err.message.contains("expecting end of line"));
        let err = parse_err("10 GOTO 10 20\n");
        assert!(err.message.contains("expecting end of line"));
    }
}
