//! JavaScript subset parser
//!
//! This module transforms source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parsing (tokens → AST), split across `statements` and `expressions`
//! - [`ast`]: AST node definitions
//! - [`visit`]: Read-only traversal shared by every full-tree walk
//! - [`validate`]: Rejection of unsupported constructs
//! - [`source_map`]: Node start offset → source line
//!
//! # Supported Subset
//!
//! - Declarations: `var`, `let`, `const`, function declarations (sync and `async`)
//! - Statements: `if`, `while`, `do/while`, `for`, `for...of`, `for...in`, `switch`,
//!   `try/catch/finally`, `throw`, `return`, `break`, `continue`
//! - Expressions: arithmetic, comparison, logical, ternary, calls, member access,
//!   arrow functions, templates, array and object literals, `new`, `await`
//! - Classes, modules, generators, `with` and meta properties parse but are
//!   reported as unsupported
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser, one method per binary precedence level.
//! No external parser generator dependencies.

pub mod ast;
mod expressions;
pub mod lexer;
pub mod parse;
pub mod source_map;
mod statements;
pub mod validate;
pub mod visit;

pub use parse::{parse, ParseError, ParseOutcome, Parser};
pub use source_map::SourceMap;
