//! Hand-written recursive-descent parser with Pratt-style precedence
//! climbing for the binary operator chain. The parser holds an immutable
//! token slice and a cursor; a trailing `EndOfInput` token guarantees the
//! current token is always well-defined, so no bounds checks are needed on
//! `peek`.

use std::rc::Rc;

use crate::ast::{
    AssignOpKind, BinaryOpKind, Expr, ExprKind, FunctionDecl, Param, Stmt, StmtKind, StructDef, StructInitializer,
    UnaryOpKind,
};
use crate::error::ParseError;
use crate::token::{Token, TokenKind};
use crate::types::Type;

/// A single call argument. Only struct construction uses the `name:` form;
/// ordinary calls require every argument to be positional.
pub struct CallArg {
    pub name: Option<String>,
    pub value: Expr,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.at_end() {
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::EndOfInput)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if !self.at_end() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn is_kw(&self, word: &str) -> bool {
        self.current().is_keyword(word)
    }

    fn eat_kw(&mut self, word: &str) -> bool {
        if self.is_kw(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, word: &str) -> PResult<Token> {
        if self.is_kw(word) {
            Ok(self.advance())
        } else {
            Err(ParseError::unexpected(self.current().clone()))
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::unexpected(self.current().clone()))
        }
    }

    fn ident(&mut self) -> PResult<String> {
        match &self.current().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::unexpected(self.current().clone())),
        }
    }

    // ---- statements ----

    fn statement(&mut self) -> PResult<Stmt> {
        let start = self.current().span.clone();

        if self.check(&TokenKind::LeftBrace) {
            return self.block();
        }
        if self.is_kw("function") {
            return self.function_decl();
        }
        if self.is_kw("struct") {
            return self.struct_def();
        }
        if self.eat_kw("print") {
            return self.print_stmt(start, false);
        }
        if self.eat_kw("println") {
            return self.print_stmt(start, true);
        }
        if self.eat_kw("let") {
            let name = self.ident()?;
            self.expect(TokenKind::Equal)?;
            let init = self.expr()?;
            let end = self.expect(TokenKind::Semicolon)?.span;
            return Ok(Stmt::new(StmtKind::VariableDefinition { name, init }, start.merge(&end)));
        }
        if self.is_kw("if") {
            return self.if_stmt();
        }
        if self.eat_kw("assert") {
            self.expect(TokenKind::LeftParen)?;
            let cond = self.expr()?;
            self.expect(TokenKind::RightParen)?;
            let end = self.expect(TokenKind::Semicolon)?.span;
            return Ok(Stmt::new(StmtKind::Assert(cond), start.merge(&end)));
        }
        if self.is_kw("while") {
            return self.while_stmt();
        }
        if self.eat_kw("break") {
            let end = self.expect(TokenKind::Semicolon)?.span;
            return Ok(Stmt::new(StmtKind::Break, start.merge(&end)));
        }
        if self.eat_kw("continue") {
            let end = self.expect(TokenKind::Semicolon)?.span;
            return Ok(Stmt::new(StmtKind::Continue, start.merge(&end)));
        }
        if self.eat_kw("return") {
            let value = if self.check(&TokenKind::Semicolon) { None } else { Some(self.expr()?) };
            let end = self.expect(TokenKind::Semicolon)?.span;
            return Ok(Stmt::new(StmtKind::Return(value), start.merge(&end)));
        }
        if self.is_kw("for") {
            return self.for_stmt();
        }

        // expr (assign_op expr)? ";"
        let expr = self.expr()?;
        if let Some(op) = self.peek_assign_op() {
            self.advance();
            let value = self.expr()?;
            let end = self.expect(TokenKind::Semicolon)?.span;
            let span = start.merge(&end);
            return Ok(Stmt::new(StmtKind::Assignment { target: expr, op, value }, span));
        }
        let end = self.expect(TokenKind::Semicolon)?.span;
        let span = start.merge(&end);
        Ok(Stmt::new(StmtKind::Expression(expr), span))
    }

    fn peek_assign_op(&self) -> Option<AssignOpKind> {
        match self.current().kind {
            TokenKind::Equal => Some(AssignOpKind::Assign),
            TokenKind::PlusEqual => Some(AssignOpKind::AddAssign),
            TokenKind::MinusEqual => Some(AssignOpKind::SubAssign),
            TokenKind::StarEqual => Some(AssignOpKind::MulAssign),
            TokenKind::SlashEqual => Some(AssignOpKind::DivAssign),
            _ => None,
        }
    }

    fn block(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::LeftBrace)?.span;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            stmts.push(self.statement()?);
        }
        let end = self.expect(TokenKind::RightBrace)?.span;
        Ok(Stmt::new(StmtKind::Block(stmts), start.merge(&end)))
    }

    fn print_stmt(&mut self, start: crate::span::Span, newline: bool) -> PResult<Stmt> {
        self.expect(TokenKind::LeftParen)?;
        let value = if self.check(&TokenKind::RightParen) { None } else { Some(self.expr()?) };
        self.expect(TokenKind::RightParen)?;
        let end = self.expect(TokenKind::Semicolon)?.span;
        let span = start.merge(&end);
        let kind = if newline { StmtKind::Println(value) } else { StmtKind::Print(value) };
        Ok(Stmt::new(kind, span))
    }

    fn if_stmt(&mut self) -> PResult<Stmt> {
        let start = self.expect_kw("if")?.span;
        let cond = self.expr()?;
        let then_branch = Box::new(self.block()?);
        let else_branch = if self.eat_kw("else") {
            if self.is_kw("if") {
                Some(Box::new(self.if_stmt()?))
            } else if self.check(&TokenKind::LeftBrace) {
                Some(Box::new(self.block()?))
            } else {
                Some(Box::new(self.statement()?))
            }
        } else {
            None
        };
        let span = match &else_branch {
            Some(b) => start.merge(&b.span),
            None => start.merge(&then_branch.span),
        };
        Ok(Stmt::new(StmtKind::If { cond, then_branch, else_branch }, span))
    }

    fn while_stmt(&mut self) -> PResult<Stmt> {
        let start = self.expect_kw("while")?.span;
        let cond = self.expr()?;
        let body = Box::new(self.block()?);
        let span = start.merge(&body.span);
        Ok(Stmt::new(StmtKind::While { cond, body }, span))
    }

    fn for_stmt(&mut self) -> PResult<Stmt> {
        let start = self.expect_kw("for")?.span;
        let var = self.ident()?;
        self.expect_kw("in")?;
        let iterable = self.expr()?;
        let body = Box::new(self.block()?);
        let span = start.merge(&body.span);
        Ok(Stmt::new(StmtKind::For { var, iterable, body }, span))
    }

    fn function_decl(&mut self) -> PResult<Stmt> {
        let start = self.expect_kw("function")?.span;
        let name = self.ident()?;
        self.expect(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let pname = self.ident()?;
                self.expect(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                params.push(Param { name: pname, ty });
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::TildeArrow)?;
        let return_type = self.parse_type()?;
        let body_block = self.block()?;
        let StmtKind::Block(body) = body_block.kind else { unreachable!() };
        let span = start.merge(&body_block.span);
        let decl = FunctionDecl { name, params, return_type, body, span: span.clone() };
        Ok(Stmt::new(StmtKind::FunctionDeclaration(Rc::new(decl)), span))
    }

    fn struct_def(&mut self) -> PResult<Stmt> {
        let start = self.expect_kw("struct")?.span;
        let name = self.ident()?;
        self.expect(TokenKind::LeftBrace)?;
        let mut members = Vec::new();
        if !self.check(&TokenKind::RightBrace) {
            loop {
                let mname = self.ident()?;
                self.expect(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                members.push((mname, ty));
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RightBrace)?.span;
        let span = start.merge(&end);
        let def = StructDef { name, members, span: span.clone() };
        Ok(Stmt::new(StmtKind::StructDefinition(Rc::new(def)), span))
    }

    fn parse_type(&mut self) -> PResult<Type> {
        if self.check(&TokenKind::LeftBracket) {
            self.advance();
            let inner = self.parse_type()?;
            self.expect(TokenKind::RightBracket)?;
            return Ok(Type::Array(Box::new(inner)));
        }
        if self.check(&TokenKind::Question) {
            self.advance();
            return Ok(Type::Unspecified);
        }
        let name = self.ident()?;
        match name.as_str() {
            "I32" => Ok(Type::I32),
            "Char" => Ok(Type::Char),
            "Bool" => Ok(Type::Bool),
            "String" => Ok(Type::String),
            "Nothing" => Ok(Type::Nothing),
            "Range" => Ok(Type::Range),
            other => Ok(Type::StructType(self.named_struct_placeholder(other))),
        }
    }

    /// Struct type names aren't resolvable until the interpreter runs (the
    /// definition may appear later or in a different scope); the parser
    /// records only the name here and the interpreter re-resolves it when
    /// the type annotation is actually consulted.
    fn named_struct_placeholder(&self, name: &str) -> Rc<StructDef> {
        Rc::new(StructDef { name: name.to_string(), members: Vec::new(), span: self.current().span.clone() })
    }

    // ---- expressions ----

    pub fn expr(&mut self) -> PResult<Expr> {
        self.range()
    }

    fn range(&mut self) -> PResult<Expr> {
        let start = self.or()?;
        if self.check(&TokenKind::DotDot) || self.check(&TokenKind::DotDotEqual) {
            let inclusive = self.check(&TokenKind::DotDotEqual);
            self.advance();
            let end = self.or()?;
            let span = start.span.merge(&end.span);
            return Ok(Expr::new(
                ExprKind::Range { start: Box::new(start), end: Box::new(end), inclusive },
                span,
            ));
        }
        Ok(start)
    }

    fn or(&mut self) -> PResult<Expr> {
        let mut lhs = self.and()?;
        while self.is_kw("or") {
            self.advance();
            let rhs = self.and()?;
            let span = lhs.span.merge(&rhs.span);
            lhs = Expr::new(ExprKind::BinaryOp(BinaryOpKind::Or, Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn and(&mut self) -> PResult<Expr> {
        let mut lhs = self.eq()?;
        while self.is_kw("and") {
            self.advance();
            let rhs = self.eq()?;
            let span = lhs.span.merge(&rhs.span);
            lhs = Expr::new(ExprKind::BinaryOp(BinaryOpKind::And, Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn eq(&mut self) -> PResult<Expr> {
        let mut lhs = self.rel()?;
        loop {
            let op = match self.current().kind {
                TokenKind::EqualEqual => BinaryOpKind::Eq,
                TokenKind::BangEqual => BinaryOpKind::NotEq,
                _ => break,
            };
            self.advance();
            let rhs = self.rel()?;
            let span = lhs.span.merge(&rhs.span);
            lhs = Expr::new(ExprKind::BinaryOp(op, Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn rel(&mut self) -> PResult<Expr> {
        let mut lhs = self.sum()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Less => BinaryOpKind::Less,
                TokenKind::LessEqual => BinaryOpKind::LessEq,
                TokenKind::Greater => BinaryOpKind::Greater,
                TokenKind::GreaterEqual => BinaryOpKind::GreaterEq,
                _ => break,
            };
            self.advance();
            let rhs = self.sum()?;
            let span = lhs.span.merge(&rhs.span);
            lhs = Expr::new(ExprKind::BinaryOp(op, Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn sum(&mut self) -> PResult<Expr> {
        let mut lhs = self.prod()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOpKind::Add,
                TokenKind::Minus => BinaryOpKind::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.prod()?;
            let span = lhs.span.merge(&rhs.span);
            lhs = Expr::new(ExprKind::BinaryOp(op, Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn prod(&mut self) -> PResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match &self.current().kind {
                TokenKind::Star => BinaryOpKind::Mul,
                TokenKind::Slash => BinaryOpKind::Div,
                TokenKind::Identifier(name) if name == "mod" => BinaryOpKind::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            let span = lhs.span.merge(&rhs.span);
            lhs = Expr::new(ExprKind::BinaryOp(op, Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> PResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Plus => Some(UnaryOpKind::Plus),
            TokenKind::Minus => Some(UnaryOpKind::Minus),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.advance().span;
            let operand = self.unary()?;
            let span = start.merge(&operand.span);
            return Ok(Expr::new(ExprKind::UnaryOp(op, Box::new(operand)), span));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            match self.current().kind {
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.expr()?;
                    let end = self.expect(TokenKind::RightBracket)?.span;
                    let span = expr.span.merge(&end);
                    expr = Expr::new(ExprKind::Subscript(Box::new(expr), Box::new(index)), span);
                }
                TokenKind::LeftParen => {
                    self.advance();
                    let (args, named) = self.call_args()?;
                    let end = self.expect(TokenKind::RightParen)?.span;
                    let span = expr.span.merge(&end);
                    if named {
                        let ExprKind::Name(name) = expr.kind else {
                            return Err(ParseError::unexpected(self.current().clone()));
                        };
                        let initializers = args
                            .into_iter()
                            .map(|a| StructInitializer {
                                name: a.name.expect("named call args are checked by call_args"),
                                span: a.value.span.clone(),
                                value: a.value,
                            })
                            .collect();
                        expr = Expr::new(ExprKind::StructLiteral { name, initializers }, span);
                    } else {
                        let args = args.into_iter().map(|a| a.value).collect();
                        expr = Expr::new(ExprKind::Call { callee: Box::new(expr), args }, span);
                    }
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.ident()?;
                    let span = expr.span.clone();
                    expr = Expr::new(ExprKind::MemberAccess(Box::new(expr), name), span);
                }
                TokenKind::FatArrow => {
                    self.advance();
                    let ty = self.parse_type()?;
                    let span = expr.span.clone();
                    expr = Expr::new(ExprKind::Cast(Box::new(expr), ty), span);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Parses a comma-separated argument list. Returns whether every
    /// argument used the `name: expr` form (struct construction) — mixed
    /// named/positional lists are a parse error.
    fn call_args(&mut self) -> PResult<(Vec<CallArg>, bool)> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RightParen) {
            return Ok((args, false));
        }
        loop {
            let name = if matches!(self.current().kind, TokenKind::Identifier(_)) && self.peek_colon_after_ident() {
                Some(self.ident()?)
            } else {
                None
            };
            if name.is_some() {
                self.expect(TokenKind::Colon)?;
            }
            let value = self.expr()?;
            args.push(CallArg { name, value });
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let all_named = !args.is_empty() && args.iter().all(|a| a.name.is_some());
        let all_positional = args.iter().all(|a| a.name.is_none());
        if !all_named && !all_positional {
            return Err(ParseError::unexpected(self.current().clone()));
        }
        Ok((args, all_named))
    }

    fn peek_colon_after_ident(&self) -> bool {
        matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Colon))
    }

    fn primary(&mut self) -> PResult<Expr> {
        let tok = self.current().clone();
        match &tok.kind {
            TokenKind::Integer(v) => {
                self.advance();
                Ok(Expr::new(ExprKind::IntegerLiteral(*v), tok.span))
            }
            TokenKind::StringLiteral(s) => {
                let s = s.clone();
                self.advance();
                Ok(Expr::new(ExprKind::StringLiteral(s), tok.span))
            }
            TokenKind::CharLiteral(c) => {
                let c = *c;
                self.advance();
                Ok(Expr::new(ExprKind::CharLiteral(c), tok.span))
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RightBracket) {
                    loop {
                        elements.push(self.expr()?);
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RightBracket)?.span;
                Ok(Expr::new(ExprKind::ArrayLiteral(elements), tok.span.merge(&end)))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::Identifier(name) => {
                if name == "true" {
                    self.advance();
                    return Ok(Expr::new(ExprKind::BoolLiteral(true), tok.span));
                }
                if name == "false" {
                    self.advance();
                    return Ok(Expr::new(ExprKind::BoolLiteral(false), tok.span));
                }
                if name == "typeof" {
                    self.advance();
                    self.expect(TokenKind::LeftParen)?;
                    let inner = self.expr()?;
                    let end = self.expect(TokenKind::RightParen)?.span;
                    return Ok(Expr::new(ExprKind::TypeOf(Box::new(inner)), tok.span.merge(&end)));
                }
                let name = name.clone();
                self.advance();
                Ok(Expr::new(ExprKind::Name(name), tok.span))
            }
            _ => Err(ParseError::unexpected(tok)),
        }
    }
}
