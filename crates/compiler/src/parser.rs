//! Recursive-descent parser producing an [`crate::ast::Program`] from a
//! token stream. Mirrors the teacher's `Parser{tokens, pos}` shape: a
//! flat cursor over a pre-tokenized `Vec<Token>`, no backtracking beyond
//! a handful of one-token lookaheads.

use crate::ast::{
    BinaryOp, BreakTarget, ContinueTarget, Expr, IntervalKind, Literal, Pattern, Program, Stmt, SwitchArm, SwitchTest, UnaryOp,
};
use crate::lexer::{self, Token, TokenKind};
use asteria_core::{ErrorKind, Fault, SourceLocation};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: String,
}

impl Parser {
    pub fn new(source: &str, file: impl Into<String>) -> Result<Self, Fault> {
        let tokens = lexer::tokenize(source)?;
        Ok(Parser { tokens, pos: 0, file: file.into() })
    }

    pub fn parse(&mut self) -> Result<Program, Fault> {
        let mut stmts = Vec::new();
        while !self.is_eof() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    // -- token cursor helpers -------------------------------------------------

    fn is_eof(&self) -> bool {
        matches!(self.tokens[self.pos].kind, TokenKind::Eof)
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn loc(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.tokens[self.pos].line)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if !self.is_eof() {
            self.pos += 1;
        }
        tok
    }

    fn check_punct(&self, p: &str) -> bool {
        matches!(self.peek(), TokenKind::Punct(q) if *q == p)
    }

    fn check_ident(&self, word: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(w) if w == word)
    }

    fn eat_punct(&mut self, p: &str) -> Result<(), Fault> {
        if self.check_punct(p) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{p}`")))
        }
    }

    fn eat_ident(&mut self, word: &str) -> Result<(), Fault> {
        if self.check_ident(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{word}`")))
        }
    }

    fn expect_name(&mut self) -> Result<String, Fault> {
        match self.peek().clone() {
            TokenKind::Ident(w) if !lexer::is_keyword(&w) => {
                self.advance();
                Ok(w)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn unexpected(&self, want: &str) -> Fault {
        Fault::new(
            ErrorKind::Parse,
            format!("expected {want} on line {}, found {:?}", self.tokens[self.pos].line, self.tokens[self.pos].kind),
        )
        .at(self.loc())
    }

    // -- statements ------------------------------------------------------------

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Fault> {
        self.eat_punct("{")?;
        let mut stmts = Vec::new();
        while !self.check_punct("}") {
            if self.is_eof() {
                return Err(self.unexpected("`}`"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.eat_punct("}")?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Fault> {
        if self.check_punct("{") {
            return Ok(Stmt::Block(self.parse_block()?));
        }
        if self.check_ident("import") {
            let location = self.loc();
            self.advance();
            let path = match self.advance().kind {
                TokenKind::String(s) => s,
                _ => return Err(self.unexpected("a string literal")),
            };
            self.eat_punct(";")?;
            return Ok(Stmt::Import(path, location));
        }
        if self.check_ident("var") || self.check_ident("const") {
            return self.parse_var_decl();
        }
        if self.check_ident("func") {
            return self.parse_func_decl();
        }
        if self.check_ident("if") {
            return self.parse_if();
        }
        if self.check_ident("while") {
            return self.parse_while();
        }
        if self.check_ident("do") {
            return self.parse_do_while();
        }
        if self.check_ident("for") {
            return self.parse_for();
        }
        if self.check_ident("switch") {
            return self.parse_switch();
        }
        if self.check_ident("try") {
            return self.parse_try_catch();
        }
        if self.check_ident("defer") {
            self.advance();
            let body = self.parse_block()?;
            return Ok(Stmt::Defer(body));
        }
        if self.check_ident("throw") {
            let location = self.loc();
            self.advance();
            let value = self.parse_expr()?;
            self.eat_punct(";")?;
            return Ok(Stmt::Throw(value, location));
        }
        if self.check_ident("assert") {
            let location = self.loc();
            self.advance();
            let cond = self.parse_expr()?;
            let message = if self.check_punct(":") {
                self.advance();
                match self.advance().kind {
                    TokenKind::String(s) => Some(s),
                    _ => return Err(self.unexpected("a string literal")),
                }
            } else {
                None
            };
            self.eat_punct(";")?;
            return Ok(Stmt::Assert { cond, message, location });
        }
        if self.check_ident("return") {
            self.advance();
            let by_ref = self.check_punct("&");
            if by_ref {
                self.advance();
            }
            let value = if self.check_punct(";") { None } else { Some(self.parse_expr()?) };
            self.eat_punct(";")?;
            return Ok(Stmt::Return { value, by_ref });
        }
        if self.check_ident("break") {
            self.advance();
            let target = self.parse_jump_target_break()?;
            self.eat_punct(";")?;
            return Ok(Stmt::Break(target));
        }
        if self.check_ident("continue") {
            self.advance();
            let target = self.parse_jump_target_continue()?;
            self.eat_punct(";")?;
            return Ok(Stmt::Continue(target));
        }
        let expr = self.parse_expr()?;
        self.eat_punct(";")?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_jump_target_break(&mut self) -> Result<BreakTarget, Fault> {
        if self.check_ident("switch") {
            self.advance();
            Ok(BreakTarget::Switch)
        } else if self.check_ident("while") {
            self.advance();
            Ok(BreakTarget::While)
        } else if self.check_ident("for") {
            self.advance();
            Ok(BreakTarget::For)
        } else {
            Ok(BreakTarget::Unspec)
        }
    }

    fn parse_jump_target_continue(&mut self) -> Result<ContinueTarget, Fault> {
        if self.check_ident("while") {
            self.advance();
            Ok(ContinueTarget::While)
        } else if self.check_ident("for") {
            self.advance();
            Ok(ContinueTarget::For)
        } else {
            Ok(ContinueTarget::Unspec)
        }
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, Fault> {
        let immutable = self.check_ident("const");
        self.advance();
        if self.check_punct("[") || self.check_punct("{") {
            let closing = if self.check_punct("[") { "]" } else { "}" };
            let pattern_is_array = closing == "]";
            self.advance();
            let mut names = Vec::new();
            while !self.check_punct(closing) {
                names.push(self.expect_name()?);
                if self.check_punct(",") {
                    self.advance();
                } else {
                    break;
                }
            }
            self.eat_punct(closing)?;
            self.eat_punct("=")?;
            let init = self.parse_expr()?;
            self.eat_punct(";")?;
            let pattern = if pattern_is_array { Pattern::Array(names) } else { Pattern::Object(names) };
            return Ok(Stmt::Destructure { pattern, immutable, init });
        }
        let name = self.expect_name()?;
        let init = if self.check_punct("=") {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.eat_punct(";")?;
        Ok(Stmt::VarDecl { name, immutable, init })
    }

    fn parse_func_decl(&mut self) -> Result<Stmt, Fault> {
        let location = self.loc();
        self.advance();
        let name = self.expect_name()?;
        let (params, variadic) = self.parse_param_list()?;
        let body = self.parse_block()?;
        Ok(Stmt::FunctionDecl { name, params, variadic, body, location })
    }

    fn parse_param_list(&mut self) -> Result<(Vec<String>, bool), Fault> {
        self.eat_punct("(")?;
        let mut params = Vec::new();
        let mut variadic = false;
        while !self.check_punct(")") {
            if self.check_punct(".") {
                // `...` variadic marker, tokenized as three separate `.` puncts.
                self.advance();
                self.eat_punct(".")?;
                self.eat_punct(".")?;
                variadic = true;
                break;
            }
            params.push(self.expect_name()?);
            if self.check_punct(",") {
                self.advance();
            } else {
                break;
            }
        }
        self.eat_punct(")")?;
        Ok((params, variadic))
    }

    fn parse_if(&mut self) -> Result<Stmt, Fault> {
        self.advance();
        self.eat_punct("(")?;
        let cond = self.parse_expr()?;
        self.eat_punct(")")?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.check_ident("else") {
            self.advance();
            if self.check_ident("if") {
                vec![self.parse_if()?]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If { cond, then_branch, else_branch })
    }

    fn parse_while(&mut self) -> Result<Stmt, Fault> {
        self.advance();
        self.eat_punct("(")?;
        let cond = self.parse_expr()?;
        self.eat_punct(")")?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_do_while(&mut self) -> Result<Stmt, Fault> {
        self.advance();
        let body = self.parse_block()?;
        self.eat_ident("while")?;
        self.eat_punct("(")?;
        let cond = self.parse_expr()?;
        self.eat_punct(")")?;
        self.eat_punct(";")?;
        Ok(Stmt::DoWhile { body, cond })
    }

    /// `for (init; cond; step) body` and `for each (value : expr) body` /
    /// `for each (key, value : expr) body`.
    fn parse_for(&mut self) -> Result<Stmt, Fault> {
        self.advance();
        if self.check_ident("each") {
            self.advance();
            self.eat_punct("(")?;
            let first = self.expect_name()?;
            let (key_name, value_name) = if self.check_punct(",") {
                self.advance();
                (Some(first), self.expect_name()?)
            } else {
                (None, first)
            };
            self.eat_punct(":")?;
            let collection = self.parse_expr()?;
            self.eat_punct(")")?;
            let body = self.parse_block()?;
            return Ok(Stmt::ForEach { key_name, value_name, collection, body });
        }
        self.eat_punct("(")?;
        let init = if self.check_punct(";") {
            None
        } else if self.check_ident("var") || self.check_ident("const") {
            Some(self.parse_var_decl()?)
        } else {
            let e = self.parse_expr()?;
            self.eat_punct(";")?;
            Some(Stmt::Expr(e))
        };
        if init.is_none() {
            self.eat_punct(";")?;
        }
        let cond = if self.check_punct(";") { None } else { Some(self.parse_expr()?) };
        self.eat_punct(";")?;
        let step = if self.check_punct(")") { None } else { Some(self.parse_expr()?) };
        self.eat_punct(")")?;
        let body = self.parse_block()?;
        Ok(Stmt::For { init: Box::new(init), cond, step, body })
    }

    fn parse_switch(&mut self) -> Result<Stmt, Fault> {
        self.advance();
        self.eat_punct("(")?;
        let control = self.parse_expr()?;
        self.eat_punct(")")?;
        self.eat_punct("{")?;
        let mut arms = Vec::new();
        while !self.check_punct("}") {
            let test = if self.check_ident("default") {
                self.advance();
                None
            } else {
                self.eat_ident("case")?;
                let lo = self.parse_expr()?;
                if self.check_punct("..") {
                    self.advance();
                    let hi = self.parse_expr()?;
                    // An optional trailing bracket after `hi` narrows the
                    // interval; checked only once `hi` is fully parsed, so
                    // it never collides with parenthesised sub-expressions
                    // inside `lo`/`hi` themselves. Bare `lo..hi` is closed.
                    let kind = if self.check_punct(")") {
                        self.advance();
                        IntervalKind::HalfOpenRight
                    } else {
                        if self.check_punct("]") {
                            self.advance();
                        }
                        IntervalKind::Closed
                    };
                    Some(SwitchTest::Range(lo, hi, kind))
                } else {
                    Some(SwitchTest::Value(lo))
                }
            };
            self.eat_punct(":")?;
            let mut locals = Vec::new();
            let mut body = Vec::new();
            while !self.check_ident("case") && !self.check_ident("default") && !self.check_punct("}") {
                let stmt = self.parse_stmt()?;
                match &stmt {
                    Stmt::VarDecl { name, .. } => locals.push(name.clone()),
                    Stmt::Destructure { pattern: Pattern::Array(names) | Pattern::Object(names), .. } => locals.extend(names.iter().cloned()),
                    _ => {}
                }
                body.push(stmt);
            }
            arms.push(SwitchArm { test, locals, body });
        }
        self.eat_punct("}")?;
        Ok(Stmt::Switch { control, arms })
    }

    fn parse_try_catch(&mut self) -> Result<Stmt, Fault> {
        self.advance();
        let try_body = self.parse_block()?;
        self.eat_ident("catch")?;
        self.eat_punct("(")?;
        let catch_name = self.expect_name()?;
        self.eat_punct(")")?;
        let catch_body = self.parse_block()?;
        Ok(Stmt::TryCatch { try_body, catch_name, catch_body })
    }

    // -- expressions -------------------------------------------------------------
    //
    // Precedence climbing, lowest to highest:
    //   assignment (right-assoc) -> ternary -> || -> && -> == != ->
    //   < <= > >= -> << >> -> + - -> * / % -> unary -> postfix -> primary

    fn parse_expr(&mut self) -> Result<Expr, Fault> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> Result<Expr, Fault> {
        let lhs = self.parse_ternary()?;
        if self.check_punct("=") {
            self.advance();
            let rhs = self.parse_assign()?;
            return Ok(Expr::Assign(Box::new(lhs), Box::new(rhs)));
        }
        for (punct, op) in COMPOUND_OPS {
            if self.check_punct(punct) {
                let location = self.loc();
                self.advance();
                let rhs = self.parse_assign()?;
                return Ok(Expr::CompoundAssign(*op, Box::new(lhs), Box::new(rhs), location));
            }
        }
        Ok(lhs)
    }

    fn parse_ternary(&mut self) -> Result<Expr, Fault> {
        let cond = self.parse_logical_or()?;
        if self.check_punct("?") {
            self.advance();
            let then_expr = self.parse_assign()?;
            self.eat_punct(":")?;
            let else_expr = self.parse_assign()?;
            return Ok(Expr::Ternary(Box::new(cond), Box::new(then_expr), Box::new(else_expr)));
        }
        Ok(cond)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, Fault> {
        let mut lhs = self.parse_logical_and()?;
        while self.check_punct("||") {
            let location = self.loc();
            self.advance();
            let rhs = self.parse_logical_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs), location);
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, Fault> {
        let mut lhs = self.parse_equality()?;
        while self.check_punct("&&") {
            let location = self.loc();
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs), location);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, Fault> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = if self.check_punct("==") {
                BinaryOp::Eq
            } else if self.check_punct("!=") {
                BinaryOp::Ne
            } else {
                break;
            };
            let location = self.loc();
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), location);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, Fault> {
        let mut lhs = self.parse_shift()?;
        loop {
            let op = if self.check_punct("<=") {
                BinaryOp::Le
            } else if self.check_punct(">=") {
                BinaryOp::Ge
            } else if self.check_punct("<") {
                BinaryOp::Lt
            } else if self.check_punct(">") {
                BinaryOp::Gt
            } else {
                break;
            };
            let location = self.loc();
            self.advance();
            let rhs = self.parse_shift()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), location);
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> Result<Expr, Fault> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = if self.check_punct("<<") {
                BinaryOp::Shl
            } else if self.check_punct(">>") {
                BinaryOp::Shr
            } else {
                break;
            };
            let location = self.loc();
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), location);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, Fault> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.check_punct("+") {
                BinaryOp::Add
            } else if self.check_punct("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            let location = self.loc();
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), location);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Fault> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.check_punct("*") {
                BinaryOp::Mul
            } else if self.check_punct("/") {
                BinaryOp::Div
            } else if self.check_punct("%") {
                BinaryOp::Rem
            } else {
                break;
            };
            let location = self.loc();
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), location);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, Fault> {
        let location = self.loc();
        let op = if self.check_punct("-") {
            Some(UnaryOp::Neg)
        } else if self.check_punct("!") {
            Some(UnaryOp::Not)
        } else if self.check_punct("&") {
            Some(UnaryOp::BitNot)
        } else if self.check_ident("countof") {
            Some(UnaryOp::CountOf)
        } else if self.check_ident("typeof") {
            Some(UnaryOp::TypeOf)
        } else if self.check_ident("unset") {
            Some(UnaryOp::Unset)
        } else {
            None
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(op, Box::new(operand), location));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Fault> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check_punct("(") {
                let location = self.loc();
                self.advance();
                let mut args = Vec::new();
                while !self.check_punct(")") {
                    args.push(self.parse_assign()?);
                    if self.check_punct(",") {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.eat_punct(")")?;
                expr = Expr::Call { callee: Box::new(expr), args, location };
            } else if self.check_punct("[") {
                self.advance();
                let index = self.parse_expr()?;
                self.eat_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.check_punct(".") {
                self.advance();
                let name = self.expect_name()?;
                expr = Expr::Index(Box::new(expr), Box::new(Expr::Literal(Literal::String(name), self.loc())));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Fault> {
        let location = self.loc();
        match self.peek().clone() {
            TokenKind::Integer(v) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(v), location))
            }
            TokenKind::Real(v) => {
                self.advance();
                Ok(Expr::Literal(Literal::Real(v), location))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s), location))
            }
            TokenKind::Ident(word) => match word.as_str() {
                "null" => {
                    self.advance();
                    Ok(Expr::Literal(Literal::Null, location))
                }
                "true" => {
                    self.advance();
                    Ok(Expr::Literal(Literal::Boolean(true), location))
                }
                "false" => {
                    self.advance();
                    Ok(Expr::Literal(Literal::Boolean(false), location))
                }
                "this" => {
                    self.advance();
                    Ok(Expr::This(location))
                }
                "func" => self.parse_func_expr(),
                _ if !lexer::is_keyword(&word) => {
                    self.advance();
                    Ok(Expr::Ident(word, location))
                }
                _ => Err(self.unexpected("an expression")),
            },
            TokenKind::Punct("(") => {
                self.advance();
                let inner = self.parse_expr()?;
                self.eat_punct(")")?;
                Ok(inner)
            }
            TokenKind::Punct("[") => {
                self.advance();
                let mut items = Vec::new();
                while !self.check_punct("]") {
                    items.push(self.parse_assign()?);
                    if self.check_punct(",") {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.eat_punct("]")?;
                Ok(Expr::Array(items))
            }
            TokenKind::Punct("{") => {
                self.advance();
                let mut fields = Vec::new();
                while !self.check_punct("}") {
                    let key = match self.advance().kind {
                        TokenKind::String(s) => s,
                        TokenKind::Ident(w) => w,
                        other => return Err(Fault::new(ErrorKind::Parse, format!("expected object key, found {other:?}"))),
                    };
                    self.eat_punct(":")?;
                    let value = self.parse_assign()?;
                    fields.push((key, value));
                    if self.check_punct(",") {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.eat_punct("}")?;
                Ok(Expr::Object(fields))
            }
            other => Err(Fault::new(ErrorKind::Parse, format!("unexpected token {other:?} on line {}", self.tokens[self.pos].line))),
        }
    }

    fn parse_func_expr(&mut self) -> Result<Expr, Fault> {
        let location = self.loc();
        self.advance();
        let name = if !self.check_punct("(") { Some(self.expect_name()?) } else { None };
        let (params, variadic) = self.parse_param_list()?;
        let body = self.parse_block()?;
        Ok(Expr::Function { name, params, variadic, body, location })
    }
}

const COMPOUND_OPS: &[(&str, BinaryOp)] = &[
    ("+=", BinaryOp::Add),
    ("-=", BinaryOp::Sub),
    ("*=", BinaryOp::Mul),
    ("/=", BinaryOp::Div),
    ("%=", BinaryOp::Rem),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        Parser::new(src, "<test>").unwrap().parse().unwrap()
    }

    #[test]
    fn parses_var_decl_and_arithmetic() {
        let prog = parse("var x = 1 + 2 * 3;");
        assert_eq!(prog.len(), 1);
        assert!(matches!(&prog[0], Stmt::VarDecl { name, immutable: false, init: Some(_) } if name == "x"));
    }

    #[test]
    fn parses_if_else() {
        let prog = parse("if (x) { y = 1; } else { y = 2; }");
        assert!(matches!(&prog[0], Stmt::If { .. }));
    }

    #[test]
    fn parses_function_decl_with_variadic() {
        let prog = parse("func f(a, b, ...) { return a; }");
        match &prog[0] {
            Stmt::FunctionDecl { name, params, variadic, .. } => {
                assert_eq!(name, "f");
                assert_eq!(params, &vec!["a".to_string(), "b".to_string()]);
                assert!(*variadic);
            }
            other => panic!("expected FunctionDecl, got {other:?}"),
        }
    }

    #[test]
    fn parses_for_each_with_key_and_value() {
        let prog = parse("for each (k, v : arr) { }");
        assert!(matches!(&prog[0], Stmt::ForEach { key_name: Some(k), value_name, .. } if k == "k" && value_name == "v"));
    }

    #[test]
    fn parses_call_in_return_position() {
        // Tail-call-ness is determined by the lowering pass from this
        // expression's position, not by any surface syntax (spec §4.G) --
        // the parser only needs to produce a plain call here.
        let prog = parse("return f(x);");
        assert!(matches!(&prog[0], Stmt::Return { value: Some(Expr::Call { .. }), .. }));
    }

    #[test]
    fn parses_try_catch() {
        let prog = parse("try { throw 1; } catch (e) { }");
        assert!(matches!(&prog[0], Stmt::TryCatch { .. }));
    }

    #[test]
    fn parses_switch_with_default() {
        let prog = parse("switch (x) { case 1: break; default: break; }");
        match &prog[0] {
            Stmt::Switch { arms, .. } => assert_eq!(arms.len(), 2),
            other => panic!("expected Switch, got {other:?}"),
        }
    }
}
