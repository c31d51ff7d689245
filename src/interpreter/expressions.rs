//! Expression evaluation implementation
//!
//! This module handles evaluation of all expression types, including:
//!
//! - Literals, template strings, array and object literals
//! - Identifiers and `this`
//! - Function expressions and arrows (closure creation)
//! - Unary, update, binary, logical and conditional operators
//! - Assignment to variables and properties
//!
//! Calls and `new` live in `calls`, property access in `builtins`.
//!
//! `await` is only legal at statement level (see `statements`); reaching one
//! here means it was nested inside a larger expression.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Eval, RuntimeError};
use crate::interpreter::format::{describe_value, to_js_string};
use crate::parser::ast::*;
use crate::runtime::scope::ScopeKind;
use crate::runtime::value::{Function, Value};
use crate::snapshot::StepKind;
use crate::stack::ensure_sufficient_stack;
use std::rc::Rc;

/// A resolved assignment target
pub(crate) enum Reference {
    Variable(String),
    Property { object: Value, key: Value },
}

impl Interpreter {
    /// Evaluate an expression and return its value
    pub(crate) fn evaluate_expr(&mut self, expr: &Expr) -> Eval<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr_inner(expr))
    }

    fn evaluate_expr_inner(&mut self, expr: &Expr) -> Eval<Value> {
        let line = self.line_at(expr.location());

        match expr {
            Expr::Number(n, _) => Ok(Value::Number(*n)),
            Expr::String(s, _) => Ok(Value::String(s.clone())),
            Expr::Boolean(b, _) => Ok(Value::Boolean(*b)),
            Expr::Null(_) => Ok(Value::Null),
            Expr::Undefined(_) => Ok(Value::Undefined),

            Expr::Template {
                quasis,
                expressions,
                ..
            } => {
                let mut text = String::new();
                for (index, quasi) in quasis.iter().enumerate() {
                    text.push_str(quasi);
                    if let Some(expr) = expressions.get(index) {
                        let value = self.evaluate_expr(expr)?;
                        text.push_str(&to_js_string(&value));
                    }
                }
                Ok(Value::String(text))
            }

            Expr::Identifier(name, _) => Ok(self
                .scopes
                .get_variable(name)
                .map_err(|err| RuntimeError::from_scope(err, line))?),

            Expr::This(_) => Ok(self.scopes.lookup_this()),

            Expr::Array { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate_expr(element)?);
                }
                Ok(Value::array(values))
            }

            Expr::Object { properties, .. } => {
                let mut map = indexmap::IndexMap::with_capacity(properties.len());
                for property in properties {
                    let value = self.evaluate_named(&property.value, &property.key)?;
                    map.insert(property.key.clone(), value);
                }
                Ok(Value::object(map))
            }

            Expr::Function(node) => Ok(self.create_function(node, None)),

            Expr::Unary { op, argument, .. } => self.evaluate_unary(*op, argument),

            Expr::Update {
                op, prefix, target, ..
            } => {
                let reference = self.resolve_reference(target, line)?;
                let old = self.read_reference(&reference, line)?.to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.write_reference(&reference, Value::Number(new), &target.describe(), line)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }

            Expr::Binary {
                op, left, right, ..
            } => {
                let left = self.evaluate_expr(left)?;
                let right = self.evaluate_expr(right)?;
                Ok(binary_operation(*op, &left, &right))
            }

            Expr::Logical {
                op, left, right, ..
            } => {
                let left = self.evaluate_expr(left)?;
                let short_circuits = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate_expr(right)
                }
            }

            Expr::Assign {
                op, target, value, ..
            } => {
                let reference = self.resolve_reference(target, line)?;
                // Compound operators read the target before the right-hand side runs
                let current = match op.binary_op() {
                    Some(_) => Some(self.read_reference(&reference, line)?),
                    None => None,
                };
                let value = match &reference {
                    Reference::Variable(name) => self.evaluate_named(value, name)?,
                    Reference::Property { .. } => self.evaluate_expr(value)?,
                };
                let value = match (op.binary_op(), current) {
                    (Some(binary), Some(current)) => binary_operation(binary, &current, &value),
                    _ => value,
                };
                self.apply_assignment(&reference, AssignOp::Assign, value, &target.describe(), line)
            }

            Expr::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                if self.evaluate_expr(test)?.is_truthy() {
                    self.evaluate_expr(consequent)
                } else {
                    self.evaluate_expr(alternate)
                }
            }

            Expr::Call {
                callee, arguments, ..
            } => self.evaluate_call(callee, arguments, line),

            Expr::New {
                callee, arguments, ..
            } => self.evaluate_new(callee, arguments, line),

            Expr::Member {
                object, property, ..
            } => {
                let object = self.evaluate_expr(object)?;
                let key = self.property_key(property)?;
                Ok(self.get_property(&object, &key, line)?)
            }

            Expr::Await { .. } => Err(RuntimeError::UnsupportedAwait {
                context: "await nested inside an expression".to_string(),
                line,
            }
            .into()),

            Expr::Yield { .. } => Err(RuntimeError::type_error("Generators are not supported", line).into()),
            Expr::MetaProperty { meta, property, .. } => Err(RuntimeError::type_error(
                format!("{}.{} is not supported", meta, property),
                line,
            )
            .into()),
            Expr::Class { .. } => Err(RuntimeError::type_error("Classes are not supported", line).into()),
        }
    }

    /// Evaluate `expr`, naming it `name` if it is an anonymous function
    /// (`const f = () => {}`, `{ handler: function () {} }`).
    pub(crate) fn evaluate_named(&mut self, expr: &Expr, name: &str) -> Eval<Value> {
        match expr {
            Expr::Function(node) if node.name.is_none() => {
                Ok(self.create_function(node, Some(name.to_string())))
            }
            other => self.evaluate_expr(other),
        }
    }

    /// Closure for a function expression. A named function expression sees
    /// its own name through an extra scope between it and its surroundings.
    fn create_function(&mut self, node: &Rc<FunctionNode>, inferred: Option<String>) -> Value {
        let Some(own_name) = node.name.clone() else {
            let closure = self.scopes.create_closure(node.clone(), inferred, node.is_async);
            return Value::function(Function::Closure(closure));
        };

        let previous = self.scopes.current();
        self.scopes.enter_scope(ScopeKind::Block, None);
        let closure = self
            .scopes
            .create_closure(node.clone(), Some(own_name.clone()), node.is_async);
        let value = Value::function(Function::Closure(closure));
        self.scopes.declare_function(&own_name, value.clone());
        self.scopes.switch_to(previous);
        value
    }

    fn evaluate_unary(&mut self, op: UnaryOp, argument: &Expr) -> Eval<Value> {
        if op == UnaryOp::Typeof {
            if let Expr::Identifier(name, _) = argument {
                if !self.scopes.is_declared(name) {
                    return Ok(Value::string("undefined"));
                }
            }
            let value = self.evaluate_expr(argument)?;
            return Ok(Value::string(value.type_of()));
        }

        let value = self.evaluate_expr(argument)?;
        Ok(match op {
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::Not => Value::Boolean(!value.is_truthy()),
            UnaryOp::Void | UnaryOp::Typeof => Value::Undefined,
        })
    }

    /// Key of a member access: the name itself, or the evaluated computed key
    pub(crate) fn property_key(&mut self, property: &MemberProperty) -> Eval<Value> {
        match property {
            MemberProperty::Named(name) => Ok(Value::String(name.clone())),
            MemberProperty::Computed(expr) => self.evaluate_expr(expr),
        }
    }

    // ===== Assignment =====

    pub(crate) fn resolve_reference(&mut self, target: &Expr, line: usize) -> Eval<Reference> {
        match target {
            Expr::Identifier(name, _) => Ok(Reference::Variable(name.clone())),
            Expr::Member {
                object, property, ..
            } => {
                let object = self.evaluate_expr(object)?;
                let key = self.property_key(property)?;
                Ok(Reference::Property { object, key })
            }
            _ => Err(RuntimeError::type_error("Invalid assignment target", line).into()),
        }
    }

    fn read_reference(&mut self, reference: &Reference, line: usize) -> Eval<Value> {
        match reference {
            Reference::Variable(name) => Ok(self
                .scopes
                .get_variable(name)
                .map_err(|err| RuntimeError::from_scope(err, line))?),
            Reference::Property { object, key } => Ok(self.get_property(object, key, line)?),
        }
    }

    /// Store `value` and record an assignment step labelled `label = value`
    fn write_reference(
        &mut self,
        reference: &Reference,
        value: Value,
        label: &str,
        line: usize,
    ) -> Eval<()> {
        let description = format!("{} = {}", label, describe_value(&value));
        match reference {
            Reference::Variable(name) => self
                .scopes
                .set_variable(name, value)
                .map_err(|err| RuntimeError::from_scope(err, line))?,
            Reference::Property { object, key } => self.set_property(object, key, value, line)?,
        }
        self.record(StepKind::Assignment, description, Some(line))?;
        Ok(())
    }

    fn apply_assignment(
        &mut self,
        reference: &Reference,
        op: AssignOp,
        value: Value,
        label: &str,
        line: usize,
    ) -> Eval<Value> {
        let value = match op.binary_op() {
            Some(binary) => {
                let current = self.read_reference(reference, line)?;
                binary_operation(binary, &current, &value)
            }
            None => value,
        };
        self.write_reference(reference, value.clone(), label, line)?;
        Ok(value)
    }

    /// Plain assignment of an already computed value (`for (x of ...)`)
    pub(crate) fn assign_to(&mut self, target: &Expr, value: Value, line: usize) -> Eval<()> {
        self.assign_with_op(target, AssignOp::Assign, value, line)?;
        Ok(())
    }

    /// Assignment of an already computed right-hand side. The target is
    /// resolved (and, for compound operators, read) only now.
    pub(crate) fn assign_with_op(
        &mut self,
        target: &Expr,
        op: AssignOp,
        value: Value,
        line: usize,
    ) -> Eval<Value> {
        let reference = self.resolve_reference(target, line)?;
        self.apply_assignment(&reference, op, value, &target.describe(), line)
    }
}

/// Whether `+` concatenates rather than adds
fn concatenates(value: &Value) -> bool {
    !matches!(
        value,
        Value::Undefined | Value::Null | Value::Boolean(_) | Value::Number(_)
    )
}

/// Apply a binary operator to two evaluated operands
pub(crate) fn binary_operation(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if concatenates(left) || concatenates(right) {
                Value::String(to_js_string(left) + &to_js_string(right))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Mod => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Exp => Value::Number(left.to_number().powf(right.to_number())),

        BinaryOp::StrictEq => Value::Boolean(left.strict_equals(right)),
        BinaryOp::StrictNe => Value::Boolean(!left.strict_equals(right)),
        BinaryOp::LooseEq => Value::Boolean(left.loose_equals(right)),
        BinaryOp::LooseNe => Value::Boolean(!left.loose_equals(right)),

        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let Some(ordering) = ordering else {
                return Value::Boolean(false);
            };
            Value::Boolean(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::simulate;
    use pretty_assertions::assert_eq;

    fn console(source: &str) -> Vec<String> {
        let steps = simulate(source, &InterpreterConfig::default()).unwrap();
        steps
            .last()
            .map(|step| step.state.console.iter().map(|entry| entry.text.clone()).collect())
            .unwrap_or_default()
    }

    fn number(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_addition_and_concatenation() {
        let sum = binary_operation(BinaryOp::Add, &number(1.0), &number(2.0));
        assert_eq!(sum.as_number(), Some(3.0));

        let text = binary_operation(BinaryOp::Add, &Value::string("a"), &number(1.0));
        assert!(matches!(text, Value::String(s) if s == "a1"));

        let array = Value::array(vec![number(1.0), number(2.0)]);
        let joined = binary_operation(BinaryOp::Add, &array, &Value::string("!"));
        assert!(matches!(joined, Value::String(s) if s == "1,2!"));

        let coerced = binary_operation(BinaryOp::Add, &Value::Boolean(true), &Value::Null);
        assert_eq!(coerced.as_number(), Some(1.0));
    }

    #[test]
    fn test_relational_comparisons() {
        let lt = binary_operation(BinaryOp::Lt, &Value::string("apple"), &Value::string("banana"));
        assert!(lt.is_truthy());

        let numeric = binary_operation(BinaryOp::Lt, &Value::string("10"), &number(9.0));
        assert!(!numeric.is_truthy());

        let nan = binary_operation(BinaryOp::Ge, &Value::Undefined, &number(0.0));
        assert!(!nan.is_truthy());
    }

    #[test]
    fn test_modulo_and_exponent() {
        assert_eq!(binary_operation(BinaryOp::Mod, &number(-7.0), &number(3.0)).as_number(), Some(-1.0));
        assert_eq!(binary_operation(BinaryOp::Exp, &number(2.0), &number(10.0)).as_number(), Some(1024.0));
    }

    #[test]
    fn test_template_and_typeof() {
        let output = console("const n = 2; console.log(`n=${n + 1}!`, typeof missing, typeof n);");
        assert_eq!(output, vec!["n=3! undefined number"]);
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let output = console(
            "let hits = 0; function hit() { hits++; return true; }\n\
             const a = false && hit(); const b = true || hit(); const c = null ?? 'fallback';\n\
             console.log(a, b, c, hits);",
        );
        assert_eq!(output, vec!["false true fallback 0"]);
    }

    #[test]
    fn test_update_prefix_and_postfix() {
        let output = console("let i = 1; const a = i++; const b = ++i; console.log(a, b, i);");
        assert_eq!(output, vec!["1 3 3"]);
    }

    #[test]
    fn test_compound_assignment_on_properties() {
        let output = console("const o = { count: 1 }; o.count += 4; o['count'] *= 2; console.log(o.count);");
        assert_eq!(output, vec!["10"]);
    }

    #[test]
    fn test_compound_assignment_reads_target_before_right_side() {
        let output = console(
            "let x = 1; function f() { x = 10; return 1; } x += f();\n\
             const o = { n: 2 }; function g() { o.n = 100; return 3; } o.n *= g();\n\
             console.log(x, o.n);",
        );
        assert_eq!(output, vec!["2 6"]);
    }

    #[test]
    fn test_anonymous_functions_take_binding_names() {
        let output = console("const f = () => 1; const o = { g: function () {} }; console.log(f, o.g);");
        assert_eq!(output, vec!["[Function: f] [Function: g]"]);
    }

    #[test]
    fn test_named_function_expression_sees_itself() {
        let output = console(
            "const fact = function inner(n) { return n <= 1 ? 1 : n * inner(n - 1); };\n\
             console.log(fact(5), typeof inner);",
        );
        assert_eq!(output, vec!["120 undefined"]);
    }

    #[test]
    fn test_assignment_records_a_step() {
        let steps = simulate("let x = 1;\nx = 2;", &InterpreterConfig::default()).unwrap();
        let assignment = steps
            .iter()
            .find(|step| step.kind == StepKind::Assignment)
            .unwrap();
        assert_eq!(assignment.description, "x = 2");
        assert_eq!(assignment.line, Some(2));
    }

    #[test]
    fn test_nested_await_is_rejected() {
        let failure = simulate(
            "async function f() { console.log(await 1); }\nf();",
            &InterpreterConfig::default(),
        )
        .unwrap_err();
        let crate::SimulationError::Execution(failure) = failure else {
            panic!("expected an execution failure");
        };
        assert!(matches!(failure.error, RuntimeError::UnsupportedAwait { line: 1, .. }));
    }
}
