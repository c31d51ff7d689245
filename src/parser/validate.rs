//! Rejection of constructs outside the supported subset.
//!
//! Runs over a syntactically valid program and reports one diagnostic per
//! occurrence, in source order: classes, `import`/`export`, generator
//! functions, `yield`, `with`, and meta properties (`new.target`,
//! `import.meta`).

use super::ast::*;
use super::parse::ParseError;
use super::visit::{walk_expr, walk_function, walk_stmt, Visitor};

/// Collect a diagnostic for every unsupported construct in `program`.
pub fn unsupported_constructs(program: &Program) -> Vec<ParseError> {
    let mut collector = UnsupportedCollector::default();
    collector.visit_program(program);
    collector.errors
}

#[derive(Default)]
struct UnsupportedCollector {
    errors: Vec<ParseError>,
}

impl UnsupportedCollector {
    fn report(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.errors.push(ParseError::new(message, location));
    }
}

impl<'ast> Visitor<'ast> for UnsupportedCollector {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::Class { location, .. } => self.report("Classes are not supported", *location),
            Stmt::Import { location } => {
                self.report("Modules (import) are not supported", *location)
            }
            Stmt::Export { location, .. } => {
                self.report("Modules (export) are not supported", *location)
            }
            Stmt::With { location, .. } => {
                self.report("The 'with' statement is not supported", *location)
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::Class { location, .. } => self.report("Classes are not supported", *location),
            Expr::Yield { location, .. } => {
                self.report("Generators (yield) are not supported", *location)
            }
            Expr::MetaProperty {
                meta,
                property,
                location,
            } => self.report(
                format!("Meta property '{}.{}' is not supported", meta, property),
                *location,
            ),
            _ => {}
        }
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, function: &'ast FunctionNode) {
        if function.is_generator {
            self.report("Generator functions are not supported", function.location);
        }
        walk_function(self, function);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn check(source: &str) -> Vec<ParseError> {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        unsupported_constructs(&program)
    }

    #[test]
    fn test_supported_program_has_no_errors() {
        assert!(check("let x = 1; function f() { return x; } f();").is_empty());
    }

    #[test]
    fn test_each_occurrence_is_reported() {
        let errors = check("class A {}\nfunction* g() { yield 1; }\nwith (o) {}\n");

        let lines: Vec<_> = errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 2, 2, 3]);
        assert!(errors[0].message.contains("Classes"));
        assert!(errors[1].message.contains("Generator"));
        assert!(errors[2].message.contains("yield"));
        assert!(errors[3].message.contains("with"));
    }

    #[test]
    fn test_nested_constructs_are_found() {
        let errors = check("function outer() { const f = () => new.target; }\nexport default 1;");

        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("new.target"));
        assert_eq!(errors[1].line, 2);
        assert_eq!(errors[1].column, 1);
    }
}
