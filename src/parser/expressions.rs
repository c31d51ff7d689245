//! Expression parsing implementation
//!
//! This module handles parsing of expressions using one method per precedence
//! level for binary operators and recursive descent for other expression forms.
//!
//! # Supported Expressions
//!
//! - Literals: numbers, strings, templates, booleans, `null`, `undefined`
//! - Identifiers, `this`, array and object literals
//! - Function expressions and arrow functions (optionally `async`)
//! - Binary operators: arithmetic, `**`, equality, relational
//! - Logical: `&&`, `||`, `??`
//! - Unary: `-`, `+`, `!`, `typeof`, `void`, `await`, prefix `++`/`--`
//! - Postfix: `.`, `[]`, `()`, `++`, `--`
//! - Ternary: `? :`, assignment and compound assignment
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{TemplatePart, TokenKind};
use crate::parser::parse::{ParseError, Parser};
use std::rc::Rc;

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    /// Parse assignment, arrow function, `yield`, or ternary (right-associative)
    pub(crate) fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_assignment_inner)
    }

    fn parse_assignment_inner(&mut self) -> Result<Expr, ParseError> {
        if let Some(is_async) = self.arrow_ahead() {
            return self.parse_arrow_function(is_async);
        }

        if self.check(&TokenKind::Yield) {
            let loc = self.current_location();
            self.advance();
            let argument = if self.statement_ends_at_current() {
                None
            } else {
                Some(Box::new(self.parse_assignment()?))
            };
            return Ok(Expr::Yield {
                argument,
                location: loc,
            });
        }

        let expr = self.parse_ternary()?;

        let op = match self.peek().kind {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            TokenKind::StarEq => AssignOp::MulAssign,
            TokenKind::SlashEq => AssignOp::DivAssign,
            TokenKind::PercentEq => AssignOp::ModAssign,
            _ => return Ok(expr),
        };

        if !matches!(expr, Expr::Identifier(..) | Expr::Member { .. }) {
            return Err(self.error_here("Invalid assignment target"));
        }
        self.advance();

        let value = Box::new(self.parse_assignment()?);
        Ok(Expr::Assign {
            location: expr.location(),
            op,
            target: Box::new(expr),
            value,
        })
    }

    fn statement_ends_at_current(&self) -> bool {
        let next = self.peek();
        next.newline_before
            || matches!(
                next.kind,
                TokenKind::Semicolon
                    | TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::RBrace
                    | TokenKind::Comma
                    | TokenKind::Colon
                    | TokenKind::Eof
            )
    }

    /// Look ahead for an arrow function head. Returns `Some(is_async)` when the
    /// upcoming tokens are `x =>`, `(...) =>`, `async x =>` or `async (...) =>`.
    fn arrow_ahead(&self) -> Option<bool> {
        let mut index = self.position;
        let mut is_async = false;

        if self.check_ident("async") {
            if let Some(next) = self.tokens.get(index + 1) {
                if !next.newline_before
                    && matches!(next.kind, TokenKind::Ident(_) | TokenKind::LParen)
                {
                    is_async = true;
                    index += 1;
                }
            }
        }

        match self.tokens.get(index).map(|t| &t.kind) {
            Some(TokenKind::Ident(_)) => {
                let arrow = self.tokens.get(index + 1)?;
                (arrow.kind == TokenKind::Arrow && !arrow.newline_before).then_some(is_async)
            }
            Some(TokenKind::LParen) => {
                let close = self.matching_paren(index)?;
                let arrow = self.tokens.get(close + 1)?;
                (arrow.kind == TokenKind::Arrow && !arrow.newline_before).then_some(is_async)
            }
            _ => None,
        }
    }

    /// Index of the `)` closing the `(` at `open`
    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (index, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(index);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
        }
        None
    }

    fn parse_arrow_function(&mut self, is_async: bool) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        if is_async {
            self.advance(); // consume 'async'
        }

        let params = if self.check(&TokenKind::LParen) {
            self.parse_parameter_list()?
        } else {
            let location = self.current_location();
            vec![Param {
                name: self.expect_identifier()?,
                default: None,
                location,
            }]
        };
        self.expect_token(&TokenKind::Arrow, "Expected '=>'")?;

        let body = if self.check(&TokenKind::LBrace) {
            FunctionBody::Block(self.parse_function_body(is_async)?)
        } else {
            let saved = (self.in_async, self.in_function);
            self.in_async = is_async;
            self.in_function = true;
            let expr = self.parse_assignment();
            (self.in_async, self.in_function) = saved;
            FunctionBody::Expression(Box::new(expr?))
        };

        Ok(Expr::Function(Rc::new(FunctionNode {
            name: None,
            params,
            body,
            is_async,
            is_arrow: true,
            is_generator: false,
            location: loc,
        })))
    }

    /// Parse ternary: condition ? consequent : alternate
    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_nullish()?;

        if self.match_token(&TokenKind::Question) {
            let consequent = Box::new(self.parse_assignment()?);
            self.expect_token(&TokenKind::Colon, "Expected ':' in conditional expression")?;
            let alternate = Box::new(self.parse_assignment()?);

            return Ok(Expr::Conditional {
                location: expr.location(),
                test: Box::new(expr),
                consequent,
                alternate,
            });
        }

        Ok(expr)
    }

    /// Parse nullish coalescing (??)
    fn parse_nullish(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_or()?;

        while self.match_token(&TokenKind::QuestionQuestion) {
            let right = Box::new(self.parse_logical_or()?);
            left = Expr::Logical {
                op: LogicalOp::Nullish,
                location: left.location(),
                left: Box::new(left),
                right,
            };
        }

        Ok(left)
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;

        while self.match_token(&TokenKind::OrOr) {
            let right = Box::new(self.parse_logical_and()?);
            left = Expr::Logical {
                op: LogicalOp::Or,
                location: left.location(),
                left: Box::new(left),
                right,
            };
        }

        Ok(left)
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;

        while self.match_token(&TokenKind::AndAnd) {
            let right = Box::new(self.parse_equality()?);
            left = Expr::Logical {
                op: LogicalOp::And,
                location: left.location(),
                left: Box::new(left),
                right,
            };
        }

        Ok(left)
    }

    /// Parse equality (==, !=, ===, !==)
    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinaryOp::LooseEq,
                TokenKind::NotEq => BinaryOp::LooseNe,
                TokenKind::EqEqEq => BinaryOp::StrictEq,
                TokenKind::NotEqEq => BinaryOp::StrictNe,
                _ => break,
            };
            self.advance();
            let right = Box::new(self.parse_relational()?);
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse relational (<, <=, >, >=)
    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = Box::new(self.parse_additive()?);
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse additive (+, -)
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = Box::new(self.parse_multiplicative()?);
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse multiplicative (*, /, %)
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = Box::new(self.parse_exponent()?);
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse exponentiation (**), right-associative
    fn parse_exponent(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_unary()?;

        if self.match_token(&TokenKind::StarStar) {
            let exponent = Box::new(self.parse_exponent()?);
            return Ok(binary(BinaryOp::Exp, base, exponent));
        }

        Ok(base)
    }

    /// Parse unary operators
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let argument = Box::new(self.nested(Self::parse_unary)?);
            return Ok(Expr::Unary {
                op,
                argument,
                location: loc,
            });
        }

        if self.check(&TokenKind::PlusPlus) || self.check(&TokenKind::MinusMinus) {
            let op = if self.check(&TokenKind::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            let target = self.nested(Self::parse_unary)?;
            return self.update_expression(op, true, target, loc);
        }

        if self.check(&TokenKind::Await) {
            if !self.in_async {
                return Err(self.error_here("'await' is only valid inside async functions"));
            }
            self.advance();
            let argument = Box::new(self.nested(Self::parse_unary)?);
            return Ok(Expr::Await {
                argument,
                location: loc,
            });
        }

        self.parse_postfix()
    }

    /// Parse postfix `++` / `--` (no line break allowed before the operator)
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_left_hand_side()?;

        let next = self.peek();
        if next.newline_before {
            return Ok(expr);
        }
        let op = match next.kind {
            TokenKind::PlusPlus => UpdateOp::Increment,
            TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        self.advance();
        let loc = expr.location();
        self.update_expression(op, false, expr, loc)
    }

    fn update_expression(
        &self,
        op: UpdateOp,
        prefix: bool,
        target: Expr,
        location: SourceLocation,
    ) -> Result<Expr, ParseError> {
        if !matches!(target, Expr::Identifier(..) | Expr::Member { .. }) {
            return Err(ParseError::new(
                "Invalid left-hand side in update expression",
                location,
            ));
        }
        Ok(Expr::Update {
            op,
            prefix,
            target: Box::new(target),
            location,
        })
    }

    /// Parse calls and member accesses: primary followed by `.name`, `[expr]`, `(args)`
    pub(crate) fn parse_left_hand_side(&mut self) -> Result<Expr, ParseError> {
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };

        loop {
            let location = expr.location();
            if self.match_token(&TokenKind::Dot) {
                let name = self.expect_property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: MemberProperty::Named(name),
                    location,
                };
            } else if self.match_token(&TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.expect_token(&TokenKind::RBracket, "Expected ']' after index")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: MemberProperty::Computed(Box::new(index)),
                    location,
                };
            } else if self.check(&TokenKind::LParen) {
                let arguments = self.parse_arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    arguments,
                    location,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// `new Callee(args)` or the `new.target` meta property
    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        self.advance(); // consume 'new'

        if self.match_token(&TokenKind::Dot) {
            let property = self.expect_property_name()?;
            return Ok(Expr::MetaProperty {
                meta: "new".to_string(),
                property,
                location: loc,
            });
        }

        let mut callee = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            let location = callee.location();
            if self.match_token(&TokenKind::Dot) {
                let name = self.expect_property_name()?;
                callee = Expr::Member {
                    object: Box::new(callee),
                    property: MemberProperty::Named(name),
                    location,
                };
            } else if self.match_token(&TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.expect_token(&TokenKind::RBracket, "Expected ']' after index")?;
                callee = Expr::Member {
                    object: Box::new(callee),
                    property: MemberProperty::Computed(Box::new(index)),
                    location,
                };
            } else {
                break;
            }
        }

        let arguments = if self.check(&TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expr::New {
            callee: Box::new(callee),
            arguments,
            location: loc,
        })
    }

    /// Parse `(a, b, c)` call arguments; a trailing comma is allowed
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_lparen("before arguments")?;
        let mut arguments = Vec::new();

        while !self.check(&TokenKind::RParen) {
            arguments.push(self.parse_assignment()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_rparen("after arguments")?;
        Ok(arguments)
    }

    /// Parse primary expressions (literals, identifiers, grouping, literals of
    /// compound values, function expressions)
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        let expr = match &self.peek().kind {
            TokenKind::Number(n) => Expr::Number(*n, loc),
            TokenKind::String(s) => Expr::String(s.clone(), loc),
            TokenKind::True => Expr::Boolean(true, loc),
            TokenKind::False => Expr::Boolean(false, loc),
            TokenKind::Null => Expr::Null(loc),
            TokenKind::Undefined => Expr::Undefined(loc),
            TokenKind::This => Expr::This(loc),
            TokenKind::Template(parts) => {
                let parts = parts.clone();
                self.advance();
                return self.parse_template(parts, loc);
            }
            TokenKind::Ident(name) if name == "async" && self.async_function_ahead() => {
                self.advance(); // consume 'async'
                return Ok(Expr::Function(self.parse_function(true, loc, false)?));
            }
            TokenKind::Ident(name) => Expr::Identifier(name.clone(), loc),
            TokenKind::Function => {
                return Ok(Expr::Function(self.parse_function(false, loc, false)?));
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen("after expression")?;
                return Ok(expr);
            }
            TokenKind::LBracket => return self.parse_array_literal(),
            TokenKind::LBrace => return self.parse_object_literal(),
            TokenKind::Class => {
                let name = self.parse_class_skeleton()?;
                return Ok(Expr::Class {
                    name,
                    location: loc,
                });
            }
            TokenKind::Import => {
                self.advance();
                if self.match_token(&TokenKind::Dot) {
                    let property = self.expect_property_name()?;
                    return Ok(Expr::MetaProperty {
                        meta: "import".to_string(),
                        property,
                        location: loc,
                    });
                }
                return Err(ParseError::new("Dynamic import() is not supported", loc));
            }
            kind => {
                return Err(self.error_here(format!("Unexpected token {}", kind)));
            }
        };

        self.advance();
        Ok(expr)
    }

    fn async_function_ahead(&self) -> bool {
        self.peek_ahead(1)
            .is_some_and(|t| t.kind == TokenKind::Function && !t.newline_before)
    }

    /// Parse template literal parts: literal text alternating with `${}`
    /// substitutions, each lexed and parsed in place at its own offset.
    fn parse_template(
        &mut self,
        parts: Vec<TemplatePart>,
        location: SourceLocation,
    ) -> Result<Expr, ParseError> {
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        let mut text = String::new();

        for part in parts {
            match part {
                TemplatePart::Text(chunk) => text.push_str(&chunk),
                TemplatePart::Expression { source, location } => {
                    quasis.push(std::mem::take(&mut text));

                    let mut inner = Parser::with_origin(&source, location)?;
                    inner.in_async = self.in_async;
                    inner.in_function = self.in_function;
                    inner.depth = self.depth;
                    let expr = inner.parse_expression()?;
                    if !inner.is_at_end() {
                        return Err(inner.error_here(format!(
                            "Unexpected {} in template substitution",
                            inner.peek().kind
                        )));
                    }
                    expressions.push(expr);
                }
            }
        }
        quasis.push(text);

        Ok(Expr::Template {
            quasis,
            expressions,
            location,
        })
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        self.advance(); // consume '['

        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            elements.push(self.parse_assignment()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RBracket, "Expected ']' after array elements")?;

        Ok(Expr::Array {
            elements,
            location: loc,
        })
    }

    /// Parse `{ key: value, shorthand, method() {}, async method() {} }`
    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        self.advance(); // consume '{'

        let mut properties = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key_loc = self.current_location();
            let is_async = self.check_ident("async")
                && self.peek_ahead(1).is_some_and(|t| {
                    !matches!(
                        t.kind,
                        TokenKind::Colon | TokenKind::LParen | TokenKind::Comma | TokenKind::RBrace
                    )
                });
            if is_async {
                self.advance();
            }

            let (key, shorthand_ok) = match self.peek().kind.clone() {
                TokenKind::String(s) => {
                    self.advance();
                    (s, false)
                }
                TokenKind::Number(n) => {
                    self.advance();
                    (crate::interpreter::format::format_number(n), false)
                }
                TokenKind::Ident(name) => {
                    self.advance();
                    (name, true)
                }
                _ => (self.expect_property_name()?, false),
            };

            let value = if self.check(&TokenKind::LParen) {
                let params = self.parse_parameter_list()?;
                let body = self.parse_function_body(is_async)?;
                Expr::Function(Rc::new(FunctionNode {
                    name: Some(key.clone()),
                    params,
                    body: FunctionBody::Block(body),
                    is_async,
                    is_arrow: false,
                    is_generator: false,
                    location: key_loc,
                }))
            } else if is_async {
                return Err(self.error_here("Expected '(' after async method name"));
            } else if self.match_token(&TokenKind::Colon) {
                self.parse_assignment()?
            } else if shorthand_ok {
                Expr::Identifier(key.clone(), key_loc)
            } else {
                return Err(self.error_here("Expected ':' after property name"));
            };

            properties.push(Property { key, value });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_rbrace("after object literal")?;

        Ok(Expr::Object {
            properties,
            location: loc,
        })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Box<Expr>) -> Expr {
    Expr::Binary {
        op,
        location: left.location(),
        left: Box::new(left),
        right,
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn parse_expr(source: &str) -> Expr {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        match &program.body[0] {
            Stmt::Expression { expr, .. } => expr.clone(),
            Stmt::VarDecl { declarations, .. } => declarations[0].init.clone().unwrap(),
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        match parse_expr("1 + 2 * 3;") {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            )),
            other => panic!("Expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_exponent_is_right_associative() {
        match parse_expr("2 ** 3 ** 2;") {
            Expr::Binary {
                op: BinaryOp::Exp,
                left,
                right,
                ..
            } => {
                assert!(matches!(*left, Expr::Number(n, _) if n == 2.0));
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOp::Exp,
                        ..
                    }
                ));
            }
            other => panic!("Expected exponentiation, got {:?}", other),
        }
    }

    #[test]
    fn test_arrow_functions() {
        match parse_expr("const f = x => x * 2;") {
            Expr::Function(function) => {
                assert!(function.is_arrow);
                assert_eq!(function.params.len(), 1);
                assert!(matches!(function.body, FunctionBody::Expression(_)));
            }
            other => panic!("Expected arrow, got {:?}", other),
        }

        match parse_expr("const g = async (a, b) => { return a; };") {
            Expr::Function(function) => {
                assert!(function.is_async && function.is_arrow);
                assert_eq!(function.params.len(), 2);
            }
            other => panic!("Expected async arrow, got {:?}", other),
        }
    }

    #[test]
    fn test_parenthesized_expression_is_not_arrow() {
        assert!(matches!(
            parse_expr("(a + b) * c;"),
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_method_chain() {
        match parse_expr("Promise.resolve(1).then(v => v).catch(e => e);") {
            Expr::Call { callee, .. } => match *callee {
                Expr::Member {
                    property: MemberProperty::Named(name),
                    ..
                } => assert_eq!(name, "catch"),
                other => panic!("Expected member callee, got {:?}", other),
            },
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_template_substitution_offsets() {
        match parse_expr("`a ${x + 1} b`;") {
            Expr::Template {
                quasis,
                expressions,
                ..
            } => {
                assert_eq!(quasis, vec!["a ".to_string(), " b".to_string()]);
                assert_eq!(expressions.len(), 1);
                assert_eq!(expressions[0].location().offset, 5);
            }
            other => panic!("Expected template, got {:?}", other),
        }
    }

    #[test]
    fn test_object_literal_forms() {
        match parse_expr("const o = { a: 1, b, 'c d': 2, m() { return 3; } };") {
            Expr::Object { properties, .. } => {
                let keys: Vec<_> = properties.iter().map(|p| p.key.as_str()).collect();
                assert_eq!(keys, vec!["a", "b", "c d", "m"]);
                assert!(matches!(properties[3].value, Expr::Function(_)));
            }
            other => panic!("Expected object literal, got {:?}", other),
        }
    }

    #[test]
    fn test_new_expression() {
        match parse_expr("new Promise((resolve) => resolve(1));") {
            Expr::New { arguments, .. } => assert_eq!(arguments.len(), 1),
            other => panic!("Expected new expression, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = Parser::new("1 = 2;").unwrap().parse_program().unwrap_err();
        assert!(err.message.contains("Invalid assignment target"));
    }
}
