//! Lexer (tokenizer) for the JavaScript subset
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Each token records whether a line break preceded it so the parser can apply
//! automatic semicolon insertion without re-scanning the source.

use super::ast::SourceLocation;
use std::fmt;

/// One piece of a template literal: literal text or an embedded `${...}` source
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expression {
        source: String,
        location: SourceLocation,
    },
}

/// All token variants produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(String),
    Template(Vec<TemplatePart>),

    // Identifiers (includes contextual words such as `async` and `of`)
    Ident(String),

    // Keywords
    Var,
    Let,
    Const,
    Function,
    Return,
    If,
    Else,
    While,
    Do,
    For,
    In,
    Break,
    Continue,
    Throw,
    Try,
    Catch,
    Finally,
    New,
    True,
    False,
    Null,
    Undefined,
    This,
    Typeof,
    Void,
    Switch,
    Case,
    Default,
    Await,
    // Keywords of rejected constructs
    Class,
    Extends,
    Import,
    Export,
    Yield,
    With,

    // Arithmetic
    Plus,     // +
    Minus,    // -
    Star,     // *
    StarStar, // **
    Slash,    // /
    Percent,  // %

    // Equality and comparison
    EqEq,    // ==
    EqEqEq,  // ===
    NotEq,   // !=
    NotEqEq, // !==
    Lt,      // <
    Le,      // <=
    Gt,      // >
    Ge,      // >=

    // Logical
    AndAnd,          // &&
    OrOr,            // ||
    QuestionQuestion, // ??
    Bang,            // !

    // Assignment
    Eq,        // =
    PlusEq,    // +=
    MinusEq,   // -=
    StarEq,    // *=
    SlashEq,   // /=
    PercentEq, // %=

    // Increment/Decrement
    PlusPlus,   // ++
    MinusMinus, // --

    // Functions
    Arrow, // =>

    // Punctuation
    Dot,       // .
    Question,  // ?
    Colon,     // :
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Semicolon, // ;
    Comma,     // ,

    // End of file
    Eof,
}

impl TokenKind {
    /// Source text of a keyword token, so keywords can be used as property names
    /// (`promise.catch`, `promise.finally`).
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            TokenKind::Var => "var",
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Throw => "throw",
            TokenKind::Try => "try",
            TokenKind::Catch => "catch",
            TokenKind::Finally => "finally",
            TokenKind::New => "new",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Undefined => "undefined",
            TokenKind::This => "this",
            TokenKind::Typeof => "typeof",
            TokenKind::Void => "void",
            TokenKind::Switch => "switch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::Await => "await",
            TokenKind::Class => "class",
            TokenKind::Extends => "extends",
            TokenKind::Import => "import",
            TokenKind::Export => "export",
            TokenKind::Yield => "yield",
            TokenKind::With => "with",
            _ => return None,
        };
        Some(text)
    }

    fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "var" => TokenKind::Var,
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "throw" => TokenKind::Throw,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "new" => TokenKind::New,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "this" => TokenKind::This,
            "typeof" => TokenKind::Typeof,
            "void" => TokenKind::Void,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "await" => TokenKind::Await,
            "class" => TokenKind::Class,
            "extends" => TokenKind::Extends,
            "import" => TokenKind::Import,
            "export" => TokenKind::Export,
            "yield" => TokenKind::Yield,
            "with" => TokenKind::With,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(keyword) = self.keyword_text() {
            return write!(f, "'{}'", keyword);
        }
        match self {
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::String(s) => write!(f, "string \"{}\"", s),
            TokenKind::Template(_) => write!(f, "template literal"),
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::StarStar => write!(f, "'**'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::EqEqEq => write!(f, "'==='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::NotEqEq => write!(f, "'!=='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::AndAnd => write!(f, "'&&'"),
            TokenKind::OrOr => write!(f, "'||'"),
            TokenKind::QuestionQuestion => write!(f, "'??'"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::PlusEq => write!(f, "'+='"),
            TokenKind::MinusEq => write!(f, "'-='"),
            TokenKind::StarEq => write!(f, "'*='"),
            TokenKind::SlashEq => write!(f, "'/='"),
            TokenKind::PercentEq => write!(f, "'%='"),
            TokenKind::PlusPlus => write!(f, "'++'"),
            TokenKind::MinusMinus => write!(f, "'--'"),
            TokenKind::Arrow => write!(f, "'=>'"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Question => write!(f, "'?'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Eof => write!(f, "end of input"),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// A token with its position and whether a line break came before it
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
    pub newline_before: bool,
}

/// Lexer error type
#[derive(Debug, thiserror::Error)]
#[error("Lexer error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Lexer for JavaScript source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    /// Offset of `input[0]` within the whole program (non-zero for template
    /// substitutions, which are lexed separately)
    base_offset: usize,
    line: usize,
    column: usize,
    saw_newline: bool,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self::with_origin(input, SourceLocation::new(0, 1, 1))
    }

    /// Create a lexer whose first character sits at `origin` in the enclosing
    /// program. Used for `${...}` substitutions inside template literals.
    pub fn with_origin(input: &str, origin: SourceLocation) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            base_offset: origin.offset,
            line: origin.line,
            column: origin.column,
            saw_newline: false,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.saw_newline = false;
            self.skip_whitespace_and_comments()?;

            let location = self.current_location();
            let newline_before = self.saw_newline;

            if self.is_at_end() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    location,
                    newline_before: true,
                });
                break;
            }

            let kind = self.next_token()?;
            tokens.push(Token {
                kind,
                location,
                newline_before,
            });
        }

        Ok(tokens)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<TokenKind, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of input".to_string(),
            location: loc,
        })?;

        let kind = match ch {
            '"' | '\'' => self.string_literal(ch, loc)?,
            '`' => self.template_literal(loc)?,
            '0'..='9' => self.number_literal(ch, loc)?,
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.number_literal(ch, loc)?
            }
            'a'..='z' | 'A'..='Z' | '_' | '$' => self.identifier_or_keyword(ch),

            '+' => {
                if self.match_char('+') {
                    TokenKind::PlusPlus
                } else if self.match_char('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.match_char('-') {
                    TokenKind::MinusMinus
                } else if self.match_char('=') {
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.match_char('*') {
                    TokenKind::StarStar
                } else if self.match_char('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.match_char('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.match_char('=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            '=' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else if self.match_char('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        TokenKind::NotEqEq
                    } else {
                        TokenKind::NotEq
                    }
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.match_char('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.match_char('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.match_char('&') {
                    TokenKind::AndAnd
                } else {
                    return Err(LexError {
                        message: "Bitwise '&' is not supported".to_string(),
                        location: loc,
                    });
                }
            }
            '|' => {
                if self.match_char('|') {
                    TokenKind::OrOr
                } else {
                    return Err(LexError {
                        message: "Bitwise '|' is not supported".to_string(),
                        location: loc,
                    });
                }
            }
            '?' => {
                if self.match_char('?') {
                    TokenKind::QuestionQuestion
                } else {
                    TokenKind::Question
                }
            }
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,

            _ => {
                return Err(LexError {
                    message: format!("Unexpected character: '{}'", ch),
                    location: loc,
                });
            }
        };

        Ok(kind)
    }

    /// Parse a quoted string literal; the opening quote is already consumed
    fn string_literal(&mut self, quote: char, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let mut string = String::new();

        while let Some(ch) = self.peek() {
            if ch == quote {
                self.advance();
                return Ok(TokenKind::String(string));
            }
            if ch == '\n' {
                break;
            }

            self.advance();
            if ch == '\\' {
                string.push(self.escape_sequence()?);
            } else {
                string.push(ch);
            }
        }

        Err(LexError {
            message: "Unterminated string literal".to_string(),
            location: loc,
        })
    }

    /// Decode the character after a backslash
    fn escape_sequence(&mut self) -> Result<char, LexError> {
        let escaped = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of input in escape sequence".to_string(),
            location: self.current_location(),
        })?;

        let unescaped = match escaped {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'b' => '\u{8}',
            'u' => {
                let mut hex = String::new();
                for _ in 0..4 {
                    match self.advance() {
                        Some(c) if c.is_ascii_hexdigit() => hex.push(c),
                        _ => {
                            return Err(LexError {
                                message: "Invalid unicode escape sequence".to_string(),
                                location: self.current_location(),
                            });
                        }
                    }
                }
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| LexError {
                        message: format!("Invalid unicode escape: \\u{}", hex),
                        location: self.current_location(),
                    })?
            }
            // \\, \', \", \` and any other character escape to themselves
            other => other,
        };
        Ok(unescaped)
    }

    /// Parse a template literal; the opening backtick is already consumed.
    ///
    /// Substitutions are captured as raw source with their origin so the parser
    /// can lex and parse them with correct offsets.
    fn template_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let mut parts = Vec::new();
        let mut text = String::new();

        while let Some(ch) = self.peek() {
            match ch {
                '`' => {
                    self.advance();
                    parts.push(TemplatePart::Text(text));
                    return Ok(TokenKind::Template(parts));
                }
                '\\' => {
                    self.advance();
                    text.push(self.escape_sequence()?);
                }
                '$' if self.peek_ahead(1) == Some('{') => {
                    self.advance();
                    self.advance();
                    parts.push(TemplatePart::Text(std::mem::take(&mut text)));

                    let location = self.current_location();
                    let mut source = String::new();
                    let mut depth = 0usize;
                    loop {
                        let c = self.advance().ok_or_else(|| LexError {
                            message: "Unterminated template substitution".to_string(),
                            location,
                        })?;
                        match c {
                            '{' => depth += 1,
                            '}' if depth == 0 => break,
                            '}' => depth -= 1,
                            _ => {}
                        }
                        source.push(c);
                    }
                    parts.push(TemplatePart::Expression { source, location });
                }
                _ => {
                    self.advance();
                    text.push(ch);
                }
            }
        }

        Err(LexError {
            message: "Unterminated template literal".to_string(),
            location: loc,
        })
    }

    /// Parse numeric literal (decimal with fraction/exponent, or hex)
    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Result<TokenKind, LexError> {
        if first == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            let mut hex = String::new();
            while let Some(ch) = self.peek() {
                if ch.is_ascii_hexdigit() {
                    hex.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            return u64::from_str_radix(&hex, 16)
                .map(|n| TokenKind::Number(n as f64))
                .map_err(|_| LexError {
                    message: format!("Invalid hex literal: 0x{}", hex),
                    location: loc,
                });
        }

        let mut num_str = String::new();
        num_str.push(first);
        let mut seen_dot = first == '.';
        let mut seen_exp = false;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || ch == '_' {
                if ch != '_' {
                    num_str.push(ch);
                }
                self.advance();
            } else if ch == '.'
                && !seen_dot
                && !seen_exp
                && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit())
            {
                seen_dot = true;
                num_str.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E') && !seen_exp {
                seen_exp = true;
                num_str.push(ch);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    num_str.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        let value = num_str.parse::<f64>().map_err(|_| LexError {
            message: format!("Invalid number literal: {}", num_str),
            location: loc,
        })?;

        Ok(TokenKind::Number(value))
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char) -> TokenKind {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::keyword(&ident).unwrap_or(TokenKind::Ident(ident))
    }

    /// Skip whitespace and comments, noting line breaks
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some('\n') => {
                    self.saw_newline = true;
                    self.advance();
                }
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line_comment();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment()?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip single-line comment (// ...)
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            if self.peek() == Some('\n') {
                self.saw_newline = true;
            }
            self.advance();
        }

        Err(LexError {
            message: "Unterminated block comment".to_string(),
            location: start_loc,
        })
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.base_offset + self.position, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = kinds("let x = 42;");

        assert!(matches!(tokens[0], TokenKind::Let));
        assert!(matches!(tokens[1], TokenKind::Ident(ref s) if s == "x"));
        assert!(matches!(tokens[2], TokenKind::Eq));
        assert!(matches!(tokens[3], TokenKind::Number(n) if n == 42.0));
        assert!(matches!(tokens[4], TokenKind::Semicolon));
        assert!(matches!(tokens[5], TokenKind::Eof));
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("=== !== == != => ?? ** ++ -- += &&");

        assert!(matches!(tokens[0], TokenKind::EqEqEq));
        assert!(matches!(tokens[1], TokenKind::NotEqEq));
        assert!(matches!(tokens[2], TokenKind::EqEq));
        assert!(matches!(tokens[3], TokenKind::NotEq));
        assert!(matches!(tokens[4], TokenKind::Arrow));
        assert!(matches!(tokens[5], TokenKind::QuestionQuestion));
        assert!(matches!(tokens[6], TokenKind::StarStar));
        assert!(matches!(tokens[7], TokenKind::PlusPlus));
        assert!(matches!(tokens[8], TokenKind::MinusMinus));
        assert!(matches!(tokens[9], TokenKind::PlusEq));
        assert!(matches!(tokens[10], TokenKind::AndAnd));
    }

    #[test]
    fn test_comments_and_newlines() {
        let tokens = Lexer::new("a // comment\nb /* block\n */ c")
            .tokenize()
            .unwrap();

        assert!(matches!(tokens[0].kind, TokenKind::Ident(ref s) if s == "a"));
        assert!(!tokens[0].newline_before);
        assert!(matches!(tokens[1].kind, TokenKind::Ident(ref s) if s == "b"));
        assert!(tokens[1].newline_before);
        assert!(matches!(tokens[2].kind, TokenKind::Ident(ref s) if s == "c"));
        assert!(tokens[2].newline_before);
    }

    #[test]
    fn test_string_literals() {
        let tokens = kinds(r#"'it\'s' "a\nb""#);

        assert_eq!(tokens[0], TokenKind::String("it's".to_string()));
        assert_eq!(tokens[1], TokenKind::String("a\nb".to_string()));
    }

    #[test]
    fn test_template_literal_parts() {
        let tokens = Lexer::new("`a ${x + 1} b`").tokenize().unwrap();

        match &tokens[0].kind {
            TokenKind::Template(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], TemplatePart::Text("a ".to_string()));
                match &parts[1] {
                    TemplatePart::Expression { source, location } => {
                        assert_eq!(source, "x + 1");
                        assert_eq!(location.offset, 5);
                    }
                    other => panic!("Expected substitution, got {:?}", other),
                }
                assert_eq!(parts[2], TemplatePart::Text(" b".to_string()));
            }
            other => panic!("Expected template literal, got {:?}", other),
        }
    }

    #[test]
    fn test_numbers_and_locations() {
        let tokens = Lexer::new("1.5\n  0x1f 2e3").tokenize().unwrap();

        assert_eq!(tokens[0].kind, TokenKind::Number(1.5));
        assert_eq!(tokens[1].kind, TokenKind::Number(31.0));
        assert_eq!(tokens[1].location, SourceLocation::new(6, 2, 3));
        assert_eq!(tokens[2].kind, TokenKind::Number(2000.0));
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = Lexer::new("'oops").tokenize().unwrap_err();
        assert_eq!(err.location.line, 1);
        assert!(err.message.contains("Unterminated"));
        assert!(err
            .to_string()
            .starts_with("Lexer error at line 1, column 1: Unterminated"));
    }
}
