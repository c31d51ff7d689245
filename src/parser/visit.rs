//! AST Visitor
//!
//! Read-only traversal of the whole tree. Default `visit_*` methods call the
//! matching `walk_*` function, which recurses into children; override a
//! `visit_*` method to act on a node and call `walk_*` to keep descending.
//!
//! Used by the unsupported-construct check and the source map builder, both
//! of which must see every node, including function bodies and template
//! substitutions.

use super::ast::*;

/// AST Visitor trait.
///
/// The visitor can mutate its own state during traversal; the AST itself
/// remains immutable.
pub trait Visitor<'ast> {
    fn visit_program(&mut self, program: &'ast Program) {
        walk_program(self, program);
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, function: &'ast FunctionNode) {
        walk_function(self, function);
    }
}

pub fn walk_program<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, program: &'ast Program) {
    for stmt in program.body.iter() {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_function<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    function: &'ast FunctionNode,
) {
    for param in &function.params {
        if let Some(default) = &param.default {
            visitor.visit_expr(default);
        }
    }
    match &function.body {
        FunctionBody::Block(body) => {
            for stmt in body.iter() {
                visitor.visit_stmt(stmt);
            }
        }
        FunctionBody::Expression(expr) => visitor.visit_expr(expr),
    }
}

fn walk_stmts<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, body: &'ast [Stmt]) {
    for stmt in body {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, stmt: &'ast Stmt) {
    match stmt {
        Stmt::VarDecl { declarations, .. } => {
            for declarator in declarations {
                if let Some(init) = &declarator.init {
                    visitor.visit_expr(init);
                }
            }
        }
        Stmt::FunctionDecl { function, .. } => visitor.visit_function(function),
        Stmt::Expression { expr, .. } => visitor.visit_expr(expr),
        Stmt::Block { body, .. } => walk_stmts(visitor, body),
        Stmt::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            visitor.visit_expr(condition);
            visitor.visit_stmt(then_branch);
            if let Some(else_branch) = else_branch {
                visitor.visit_stmt(else_branch);
            }
        }
        Stmt::While {
            condition, body, ..
        }
        | Stmt::DoWhile {
            condition, body, ..
        } => {
            visitor.visit_expr(condition);
            visitor.visit_stmt(body);
        }
        Stmt::For {
            init,
            condition,
            update,
            body,
            ..
        } => {
            match init {
                Some(ForInit::VarDecl { declarations, .. }) => {
                    for declarator in declarations {
                        if let Some(init) = &declarator.init {
                            visitor.visit_expr(init);
                        }
                    }
                }
                Some(ForInit::Expression(expr)) => visitor.visit_expr(expr),
                None => {}
            }
            if let Some(condition) = condition {
                visitor.visit_expr(condition);
            }
            if let Some(update) = update {
                visitor.visit_expr(update);
            }
            visitor.visit_stmt(body);
        }
        Stmt::ForEach { iterable, body, .. } => {
            visitor.visit_expr(iterable);
            visitor.visit_stmt(body);
        }
        Stmt::Switch {
            discriminant,
            cases,
            ..
        } => {
            visitor.visit_expr(discriminant);
            for case in cases {
                if let Some(test) = &case.test {
                    visitor.visit_expr(test);
                }
                walk_stmts(visitor, &case.body);
            }
        }
        Stmt::Return { argument, .. } => {
            if let Some(argument) = argument {
                visitor.visit_expr(argument);
            }
        }
        Stmt::Throw { argument, .. } => visitor.visit_expr(argument),
        Stmt::Try {
            block,
            handler,
            finalizer,
            ..
        } => {
            walk_stmts(visitor, block);
            if let Some(handler) = handler {
                walk_stmts(visitor, &handler.body);
            }
            if let Some(finalizer) = finalizer {
                walk_stmts(visitor, finalizer);
            }
        }
        Stmt::Export {
            declaration: Some(declaration),
            ..
        } => visitor.visit_stmt(declaration),
        Stmt::With { object, body, .. } => {
            visitor.visit_expr(object);
            visitor.visit_stmt(body);
        }
        Stmt::Break { .. }
        | Stmt::Continue { .. }
        | Stmt::Empty { .. }
        | Stmt::Class { .. }
        | Stmt::Import { .. }
        | Stmt::Export { .. } => {}
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, expr: &'ast Expr) {
    match expr {
        Expr::Template { expressions, .. } => {
            for expr in expressions {
                visitor.visit_expr(expr);
            }
        }
        Expr::Array { elements, .. } => {
            for element in elements {
                visitor.visit_expr(element);
            }
        }
        Expr::Object { properties, .. } => {
            for property in properties {
                visitor.visit_expr(&property.value);
            }
        }
        Expr::Function(function) => visitor.visit_function(function),
        Expr::Unary { argument, .. } | Expr::Await { argument, .. } => visitor.visit_expr(argument),
        Expr::Update { target, .. } => visitor.visit_expr(target),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::Assign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
            ..
        } => {
            visitor.visit_expr(test);
            visitor.visit_expr(consequent);
            visitor.visit_expr(alternate);
        }
        Expr::Call {
            callee, arguments, ..
        }
        | Expr::New {
            callee, arguments, ..
        } => {
            visitor.visit_expr(callee);
            for argument in arguments {
                visitor.visit_expr(argument);
            }
        }
        Expr::Member {
            object, property, ..
        } => {
            visitor.visit_expr(object);
            if let MemberProperty::Computed(index) = property {
                visitor.visit_expr(index);
            }
        }
        Expr::Yield {
            argument: Some(argument),
            ..
        } => visitor.visit_expr(argument),
        Expr::Number(..)
        | Expr::String(..)
        | Expr::Boolean(..)
        | Expr::Null(_)
        | Expr::Undefined(_)
        | Expr::Identifier(..)
        | Expr::This(_)
        | Expr::Yield { .. }
        | Expr::MetaProperty { .. }
        | Expr::Class { .. } => {}
    }
}
