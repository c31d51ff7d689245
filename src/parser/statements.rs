//! Statement parsing implementation
//!
//! Declarations, control flow, blocks, and the constructs the interpreter
//! rejects (classes, modules, `with`). The rejected constructs are parsed just
//! far enough to build a node carrying their location; `validate` reports them.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use std::rc::Rc;

impl Parser {
    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();

        match self.peek().kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let kind = self.parse_decl_kind();
                let declarations = self.parse_declarators(kind)?;
                self.consume_semicolon("after variable declaration")?;
                Ok(Stmt::VarDecl {
                    kind,
                    declarations,
                    location: loc,
                })
            }
            TokenKind::Function => {
                let function = self.parse_function(false, loc, true)?;
                Ok(Stmt::FunctionDecl {
                    function,
                    location: loc,
                })
            }
            TokenKind::Ident(_)
                if self.check_ident("async")
                    && self
                        .peek_ahead(1)
                        .is_some_and(|t| t.kind == TokenKind::Function && !t.newline_before) =>
            {
                self.advance(); // consume 'async'
                let function = self.parse_function(true, loc, true)?;
                Ok(Stmt::FunctionDecl {
                    function,
                    location: loc,
                })
            }
            TokenKind::LBrace => {
                let body = self.parse_block("to open block")?;
                Ok(Stmt::Block {
                    body,
                    location: loc,
                })
            }
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::Return => {
                self.advance();
                if !self.in_function {
                    return Err(ParseError::new("'return' outside of a function", loc));
                }
                let argument = if self.statement_ends_here() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon("after return")?;
                Ok(Stmt::Return {
                    argument,
                    location: loc,
                })
            }
            TokenKind::Break => {
                self.advance();
                self.consume_semicolon("after 'break'")?;
                Ok(Stmt::Break { location: loc })
            }
            TokenKind::Continue => {
                self.advance();
                self.consume_semicolon("after 'continue'")?;
                Ok(Stmt::Continue { location: loc })
            }
            TokenKind::Throw => {
                self.advance();
                if self.peek().newline_before {
                    return Err(self.error_here("Illegal newline after 'throw'"));
                }
                let argument = self.parse_expression()?;
                self.consume_semicolon("after throw")?;
                Ok(Stmt::Throw {
                    argument,
                    location: loc,
                })
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty { location: loc })
            }
            TokenKind::Class => {
                let name = self.parse_class_skeleton()?;
                Ok(Stmt::Class {
                    name,
                    location: loc,
                })
            }
            TokenKind::Import
                if !matches!(
                    self.peek_ahead(1).map(|t| &t.kind),
                    Some(TokenKind::Dot) | Some(TokenKind::LParen)
                ) =>
            {
                self.parse_import_skeleton()?;
                Ok(Stmt::Import { location: loc })
            }
            TokenKind::Export => self.parse_export_statement(),
            TokenKind::With => {
                self.advance();
                self.expect_lparen("after 'with'")?;
                let object = self.parse_expression()?;
                self.expect_rparen("after with object")?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::With {
                    object,
                    body,
                    location: loc,
                })
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon("after expression")?;
                Ok(Stmt::Expression {
                    expr,
                    location: loc,
                })
            }
        }
    }

    /// True when the next token cannot start an expression on this line
    /// (`return` followed by `}`, `;`, a line break, or end of input).
    fn statement_ends_here(&self) -> bool {
        let next = self.peek();
        next.newline_before
            || matches!(
                next.kind,
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
            )
    }

    fn parse_decl_kind(&mut self) -> DeclKind {
        let kind = match self.peek().kind {
            TokenKind::Let => DeclKind::Let,
            TokenKind::Const => DeclKind::Const,
            _ => DeclKind::Var,
        };
        self.advance();
        kind
    }

    /// Parse `a = 1, b, c = 2` after the declaration keyword
    fn parse_declarators(&mut self, kind: DeclKind) -> Result<Vec<Declarator>, ParseError> {
        let mut declarations = Vec::new();
        loop {
            let location = self.current_location();
            let name = self.expect_identifier()?;
            let init = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_assignment()?)
            } else if kind == DeclKind::Const {
                return Err(ParseError::new(
                    "Missing initializer in const declaration",
                    location,
                ));
            } else {
                None
            };
            declarations.push(Declarator {
                name,
                init,
                location,
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        Ok(declarations)
    }

    /// Parse `{ statements }` into a shared statement slice
    pub(crate) fn parse_block(&mut self, ctx: &str) -> Result<Rc<[Stmt]>, ParseError> {
        self.expect_lbrace(ctx)?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        self.expect_rbrace("to close block")?;
        Ok(statements.into())
    }

    /// Parse `function [*] [name] (params) { body }`; `start` is the location
    /// of the first token (`async` or `function`).
    pub(crate) fn parse_function(
        &mut self,
        is_async: bool,
        start: SourceLocation,
        require_name: bool,
    ) -> Result<Rc<FunctionNode>, ParseError> {
        self.expect_token(&TokenKind::Function, "Expected 'function'")?;
        let is_generator = self.match_token(&TokenKind::Star);

        let name = if let TokenKind::Ident(_) = self.peek().kind {
            Some(self.expect_identifier()?)
        } else if require_name {
            return Err(self.error_here("Expected function name"));
        } else {
            None
        };

        let params = self.parse_parameter_list()?;
        let body = self.parse_function_body(is_async)?;

        Ok(Rc::new(FunctionNode {
            name,
            params,
            body: FunctionBody::Block(body),
            is_async,
            is_arrow: false,
            is_generator,
            location: start,
        }))
    }

    /// Parse a block body with the async/function context set for its contents
    pub(crate) fn parse_function_body(&mut self, is_async: bool) -> Result<Rc<[Stmt]>, ParseError> {
        let saved = (self.in_async, self.in_function);
        self.in_async = is_async;
        self.in_function = true;
        let body = self.parse_block("before function body");
        (self.in_async, self.in_function) = saved;
        body
    }

    /// Parse parameter list: (name, name = default, ...)
    pub(crate) fn parse_parameter_list(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect_lparen("before parameters")?;
        let mut params = Vec::new();

        if self.match_token(&TokenKind::RParen) {
            return Ok(params);
        }

        loop {
            let location = self.current_location();
            let name = self.expect_identifier()?;
            let default = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            params.push(Param {
                name,
                default,
                location,
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_rparen("after parameters")?;
        Ok(params)
    }

    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();
        self.advance(); // consume 'if'

        self.expect_lparen("after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect_rparen("after if condition")?;

        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();
        self.advance(); // consume 'while'

        self.expect_lparen("after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect_rparen("after while condition")?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::While {
            condition,
            body,
            location: loc,
        })
    }

    fn parse_do_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();
        self.advance(); // consume 'do'

        let body = Box::new(self.parse_statement()?);
        self.expect_token(&TokenKind::While, "Expected 'while' after do body")?;
        self.expect_lparen("after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect_rparen("after do-while condition")?;
        self.match_token(&TokenKind::Semicolon);

        Ok(Stmt::DoWhile {
            body,
            condition,
            location: loc,
        })
    }

    /// Parse `for (init; cond; update)`, `for (x of xs)` or `for (k in obj)`
    fn parse_for_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();
        self.advance(); // consume 'for'
        self.expect_lparen("after 'for'")?;

        // for...of / for...in: `[kind] name of|in expr`
        let kind_len = usize::from(matches!(
            self.peek().kind,
            TokenKind::Var | TokenKind::Let | TokenKind::Const
        ));
        let is_iteration = matches!(
            self.peek_ahead(kind_len).map(|t| &t.kind),
            Some(TokenKind::Ident(_))
        ) && matches!(
            self.peek_ahead(kind_len + 1).map(|t| &t.kind),
            Some(TokenKind::In) | Some(TokenKind::Ident(_))
        ) && self.peek_ahead(kind_len + 1).is_some_and(|t| match &t.kind {
            TokenKind::Ident(word) => word == "of",
            _ => true,
        });

        if is_iteration {
            let kind = if kind_len == 1 {
                Some(self.parse_decl_kind())
            } else {
                None
            };
            let name = self.expect_identifier()?;
            let iteration = if self.match_token(&TokenKind::In) {
                IterationKind::In
            } else {
                self.advance(); // consume 'of'
                IterationKind::Of
            };
            let iterable = self.parse_expression()?;
            self.expect_rparen("after for-loop header")?;
            let body = Box::new(self.parse_statement()?);

            return Ok(Stmt::ForEach {
                iteration,
                binding: ForBinding { kind, name },
                iterable,
                body,
                location: loc,
            });
        }

        let init = if self.match_token(&TokenKind::Semicolon) {
            None
        } else {
            let init = if kind_len == 1 {
                let kind = self.parse_decl_kind();
                ForInit::VarDecl {
                    kind,
                    declarations: self.parse_declarators(kind)?,
                }
            } else {
                ForInit::Expression(self.parse_expression()?)
            };
            self.expect_token(&TokenKind::Semicolon, "Expected ';' after for-loop initializer")?;
            Some(init)
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_token(&TokenKind::Semicolon, "Expected ';' after for-loop condition")?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_rparen("after for-loop header")?;

        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
            location: loc,
        })
    }

    fn parse_switch_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();
        self.advance(); // consume 'switch'

        self.expect_lparen("after 'switch'")?;
        let discriminant = self.parse_expression()?;
        self.expect_rparen("after switch expression")?;
        self.expect_lbrace("to open switch body")?;

        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let case_loc = self.current_location();
            let test = if self.match_token(&TokenKind::Case) {
                Some(self.parse_expression()?)
            } else if self.match_token(&TokenKind::Default) {
                if seen_default {
                    return Err(ParseError::new("Multiple default clauses in switch", case_loc));
                }
                seen_default = true;
                None
            } else {
                return Err(self.error_here(format!(
                    "Expected 'case' or 'default', found {}",
                    self.peek().kind
                )));
            };
            self.expect_token(&TokenKind::Colon, "Expected ':' after case label")?;

            let mut body = Vec::new();
            while !matches!(
                self.peek().kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                body.push(self.parse_statement()?);
            }

            cases.push(SwitchCase {
                test,
                body,
                location: case_loc,
            });
        }

        self.expect_rbrace("to close switch body")?;

        Ok(Stmt::Switch {
            discriminant,
            cases,
            location: loc,
        })
    }

    fn parse_try_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();
        self.advance(); // consume 'try'

        let block = self.parse_block("after 'try'")?;

        let handler = if self.check(&TokenKind::Catch) {
            let catch_loc = self.current_location();
            self.advance();
            let param = if self.match_token(&TokenKind::LParen) {
                let name = self.expect_identifier()?;
                self.expect_rparen("after catch parameter")?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block("after 'catch'")?;
            Some(CatchClause {
                param,
                body,
                location: catch_loc,
            })
        } else {
            None
        };

        let finalizer = if self.match_token(&TokenKind::Finally) {
            Some(self.parse_block("after 'finally'")?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(ParseError::new("Missing catch or finally after try", loc));
        }

        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
            location: loc,
        })
    }

    /// `class Name [extends Expr] { ... }`: the body is skipped, only the
    /// name is kept.
    pub(crate) fn parse_class_skeleton(&mut self) -> Result<Option<String>, ParseError> {
        self.advance(); // consume 'class'
        let name = if let TokenKind::Ident(_) = self.peek().kind {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        if self.match_token(&TokenKind::Extends) {
            self.parse_left_hand_side()?;
        }
        if !self.check(&TokenKind::LBrace) {
            return Err(self.error_here("Expected '{' to open class body"));
        }
        self.skip_balanced()?;
        Ok(name)
    }

    /// `import ... from '...'` / `import '...'`: skipped up to the statement end
    fn parse_import_skeleton(&mut self) -> Result<(), ParseError> {
        self.advance(); // consume 'import'
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::Semicolon => {
                    self.advance();
                    return Ok(());
                }
                TokenKind::LBrace => self.skip_balanced()?,
                TokenKind::String(_) => {
                    self.advance();
                    return self.consume_semicolon("after import");
                }
                _ => {
                    self.advance();
                }
            }
        }
        Ok(())
    }

    fn parse_export_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();
        self.advance(); // consume 'export'

        let declaration = if self.match_token(&TokenKind::Default) {
            let expr_loc = self.current_location();
            let expr = self.parse_assignment()?;
            self.consume_semicolon("after export default")?;
            Some(Box::new(Stmt::Expression {
                expr,
                location: expr_loc,
            }))
        } else if self.check(&TokenKind::LBrace) || self.check(&TokenKind::Star) {
            if self.check(&TokenKind::LBrace) {
                self.skip_balanced()?;
            } else {
                self.advance();
            }
            if self.check_ident("from") {
                self.advance();
                self.advance(); // module specifier
            }
            self.consume_semicolon("after export")?;
            None
        } else {
            Some(Box::new(self.parse_statement()?))
        };

        Ok(Stmt::Export {
            declaration,
            location: loc,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn parse_ok(source: &str) -> Program {
        Parser::new(source).unwrap().parse_program().unwrap()
    }

    #[test]
    fn test_parse_declarations() {
        let program = parse_ok("let a = 1, b; const c = 'x'; var d;");

        assert_eq!(program.body.len(), 3);
        match &program.body[0] {
            Stmt::VarDecl {
                kind, declarations, ..
            } => {
                assert_eq!(*kind, DeclKind::Let);
                assert_eq!(declarations.len(), 2);
                assert!(declarations[1].init.is_none());
            }
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_const_requires_initializer() {
        let err = Parser::new("let a;\nconst b = 1, c;")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert_eq!(err.message, "Missing initializer in const declaration");
        assert_eq!((err.line, err.column), (2, 14));

        // Iteration bindings take their value from the loop
        parse_ok("for (const x of xs) {}\nfor (const k in obj) {}");
    }

    #[test]
    fn test_parse_for_variants() {
        let program = parse_ok(
            "for (let i = 0; i < 3; i++) {}\nfor (const x of xs) {}\nfor (k in obj) {}\nfor (;;) { break; }",
        );

        assert!(matches!(program.body[0], Stmt::For { .. }));
        assert!(matches!(
            program.body[1],
            Stmt::ForEach {
                iteration: IterationKind::Of,
                ..
            }
        ));
        match &program.body[2] {
            Stmt::ForEach {
                iteration, binding, ..
            } => {
                assert_eq!(*iteration, IterationKind::In);
                assert!(binding.kind.is_none());
                assert_eq!(binding.name, "k");
            }
            other => panic!("Expected for-in, got {:?}", other),
        }
        match &program.body[3] {
            Stmt::For {
                init,
                condition,
                update,
                ..
            } => {
                assert!(init.is_none() && condition.is_none() && update.is_none());
            }
            other => panic!("Expected for loop, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_try_catch_finally() {
        let program = parse_ok("try { f(); } catch (e) { g(e); } finally { h(); }");

        match &program.body[0] {
            Stmt::Try {
                handler, finalizer, ..
            } => {
                assert_eq!(handler.as_ref().and_then(|h| h.param.as_deref()), Some("e"));
                assert!(finalizer.is_some());
            }
            other => panic!("Expected try statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_switch() {
        let program = parse_ok("switch (x) { case 1: a(); case 2: b(); break; default: c(); }");

        match &program.body[0] {
            Stmt::Switch { cases, .. } => {
                assert_eq!(cases.len(), 3);
                assert_eq!(cases[1].body.len(), 2);
                assert!(cases[2].test.is_none());
            }
            other => panic!("Expected switch, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_async_function_declaration() {
        let program = parse_ok("async function load() { const v = await fetch(); return v; }");

        match &program.body[0] {
            Stmt::FunctionDecl { function, .. } => assert!(function.is_async),
            other => panic!("Expected function declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejected_constructs_into_nodes() {
        let program = parse_ok("class A extends B { m() { return 1; } }\nimport x from 'y';\nexport const z = 1;");

        assert!(matches!(program.body[0], Stmt::Class { .. }));
        assert!(matches!(program.body[1], Stmt::Import { .. }));
        assert!(matches!(
            program.body[2],
            Stmt::Export {
                declaration: Some(_),
                ..
            }
        ));
    }
}
