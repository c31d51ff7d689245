//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including the error type, helper methods, and the [`parse`] entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `statements`: Parsing statements and declarations
//! - `expressions`: Parsing expressions with precedence climbing
//! - `validate`: Rejecting unsupported constructs after a successful parse
//! - `source_map`: Node offset → line map built after a successful parse
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser while sharing its state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use crate::parser::source_map::SourceMap;
use crate::parser::validate;
use crate::stack::ensure_sufficient_stack;
use serde::Serialize;

/// Deepest nesting of expressions and statements the parser accepts
pub const MAX_NESTING_DEPTH: usize = 256;

/// Structured parse diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("Parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError {
            line: location.line,
            column: location.column,
            message: message.into(),
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(err.message, err.location)
    }
}

/// Result of [`parse`]: either a program with its source map, or diagnostics.
///
/// A program is only present when `success` is true; no partial AST is ever
/// returned alongside errors.
#[derive(Debug)]
pub struct ParseOutcome {
    pub success: bool,
    pub program: Option<Program>,
    pub errors: Vec<ParseError>,
    pub source_map: SourceMap,
}

impl ParseOutcome {
    fn failed(errors: Vec<ParseError>) -> Self {
        ParseOutcome {
            success: false,
            program: None,
            errors,
            source_map: SourceMap::default(),
        }
    }

    /// Convert into a `Result`, for callers that prefer `?`.
    pub fn into_result(self) -> Result<(Program, SourceMap), Vec<ParseError>> {
        match self.program {
            Some(program) if self.success => Ok((program, self.source_map)),
            _ => Err(self.errors),
        }
    }
}

/// Parse source text into a program, rejecting unsupported constructs.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn parse(source: &str) -> ParseOutcome {
    let program = match Parser::new(source).and_then(|mut parser| parser.parse_program()) {
        Ok(program) => program,
        Err(err) => {
            tracing::debug!(line = err.line, column = err.column, "syntax error");
            return ParseOutcome::failed(vec![err]);
        }
    };

    let errors = validate::unsupported_constructs(&program);
    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), "unsupported constructs rejected");
        return ParseOutcome::failed(errors);
    }

    let source_map = SourceMap::build(&program);
    ParseOutcome {
        success: true,
        program: Some(program),
        errors: Vec::new(),
        source_map,
    }
}

/// Recursive descent parser for the JavaScript subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    /// Whether `await` is currently legal (inside an async function body)
    pub(crate) in_async: bool,
    /// Whether the parser is inside any function body
    pub(crate) in_function: bool,
    /// Current nesting of [`Parser::nested`] productions
    pub(crate) depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        Self::with_origin(source, SourceLocation::new(0, 1, 1))
    }

    pub(crate) fn with_origin(source: &str, origin: SourceLocation) -> Result<Self, ParseError> {
        let mut lexer = Lexer::with_origin(source, origin);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            in_async: false,
            in_function: false,
            depth: 0,
        })
    }

    /// Parse the entire program
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program::new(body))
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    /// Check for a contextual keyword spelled as an identifier (`async`, `of`)
    pub(crate) fn check_ident(&self, text: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name == text)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    pub(crate) fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current_location())
    }

    /// Run a recursive production one level deeper, failing past
    /// [`MAX_NESTING_DEPTH`].
    pub(crate) fn nested<T>(
        &mut self,
        production: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error_here(format!(
                "Nesting is too deep (more than {} levels)",
                MAX_NESTING_DEPTH
            )));
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| production(self));
        self.depth -= 1;
        result
    }

    pub(crate) fn expect_token(&mut self, kind: &TokenKind, message: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(format!("{}, found {}", message, self.peek().kind)))
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::LParen, &format!("Expected '(' {ctx}"))
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::RParen, &format!("Expected ')' {ctx}"))
    }

    pub(crate) fn expect_lbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::LBrace, &format!("Expected '{{' {ctx}"))
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::RBrace, &format!("Expected '}}' {ctx}"))
    }

    /// Consume a statement terminator, applying automatic semicolon insertion:
    /// a `;` is optional before `}`, at end of input, and after a line break.
    pub(crate) fn consume_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(());
        }
        let next = self.peek();
        if matches!(next.kind, TokenKind::RBrace | TokenKind::Eof) || next.newline_before {
            return Ok(());
        }
        Err(self.error_here(format!("Expected ';' {}, found {}", ctx, next.kind)))
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error_here(format!("Expected identifier, found {}", self.peek().kind)))
        }
    }

    /// Identifier or keyword used as a property name (`p.then`, `p.catch`)
    pub(crate) fn expect_property_name(&mut self) -> Result<String, ParseError> {
        let name = match &self.peek().kind {
            TokenKind::Ident(name) => name.clone(),
            kind => match kind.keyword_text() {
                Some(text) => text.to_string(),
                None => {
                    return Err(
                        self.error_here(format!("Expected property name, found {}", kind))
                    );
                }
            },
        };
        self.advance();
        Ok(name)
    }

    /// Skip tokens until the bracket opened by the current token is closed.
    /// Used to step over the bodies of constructs that are only reported.
    pub(crate) fn skip_balanced(&mut self) -> Result<(), ParseError> {
        let start = self.current_location();
        let mut depth = 0usize;
        loop {
            match self.peek().kind {
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return Ok(());
                    }
                }
                TokenKind::Eof => {
                    return Err(ParseError::new("Unbalanced brackets", start));
                }
                _ => {}
            }
            self.advance();
        }
    }
}
