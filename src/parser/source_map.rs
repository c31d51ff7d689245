//! Node start offset → source line.

use super::ast::*;
use super::visit::{walk_expr, walk_function, walk_stmt, Visitor};
use rustc_hash::FxHashMap;

/// Maps every AST node's start offset to the line it begins on.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    lines: FxHashMap<usize, usize>,
}

impl SourceMap {
    /// Build the map with a single traversal of the whole tree.
    pub fn build(program: &Program) -> Self {
        let mut map = SourceMap::default();
        map.visit_program(program);
        map
    }

    fn record(&mut self, location: SourceLocation) {
        self.lines.entry(location.offset).or_insert(location.line);
    }

    pub fn line_of(&self, offset: usize) -> Option<usize> {
        self.lines.get(&offset).copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl<'ast> Visitor<'ast> for SourceMap {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        self.record(stmt.location());
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        self.record(expr.location());
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, function: &'ast FunctionNode) {
        self.record(function.location);
        for param in &function.params {
            self.record(param.location);
        }
        walk_function(self, function);
    }
}
