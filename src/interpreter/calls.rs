//! Function calls
//!
//! Every call goes through [`Interpreter::call_function`], which dispatches
//! on the [`Function`] variant. Only user closures push a call-stack frame;
//! builtins, resolvers and bound methods run inside their caller's frame.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::{Eval, RuntimeError};
use crate::interpreter::format::describe_value;
use crate::parser::ast::{Expr, FunctionBody};
use crate::runtime::continuation::AwaitTarget;
use crate::runtime::value::{Builtin, Closure, Function, Value};
use crate::snapshot::StepKind;
use indexmap::IndexMap;
use std::rc::Rc;

impl Interpreter {
    /// `callee(arguments)`. A member callee becomes the receiver (`this`).
    pub(crate) fn evaluate_call(
        &mut self,
        callee: &Expr,
        arguments: &[Expr],
        line: usize,
    ) -> Eval<Value> {
        let (function, this) = match callee {
            Expr::Member {
                object, property, ..
            } => {
                let object = self.evaluate_expr(object)?;
                let key = self.property_key(property)?;
                let function = self.get_property(&object, &key, line)?;
                (function, Some(object))
            }
            other => (self.evaluate_expr(other)?, None),
        };

        let args = self.evaluate_arguments(arguments)?;
        if function.as_function().is_none() {
            return Err(RuntimeError::NotCallable {
                callee: callee.describe(),
                line,
            }
            .into());
        }
        let result = self.call_value(&function, this, args, line);
        self.current_line = line;
        result
    }

    /// `new callee(arguments)`: the `Promise` and `Error` builtins, or a
    /// plain (non-arrow, non-async) function used as a constructor.
    pub(crate) fn evaluate_new(
        &mut self,
        callee: &Expr,
        arguments: &[Expr],
        line: usize,
    ) -> Eval<Value> {
        let constructor = self.evaluate_expr(callee)?;
        let args = self.evaluate_arguments(arguments)?;

        match constructor.as_function().map(|function| &**function) {
            Some(Function::Builtin(Builtin::PromiseConstructor)) => self.construct_promise(args, line),
            Some(Function::Builtin(Builtin::ErrorConstructor)) => Ok(error_object(args)),
            Some(Function::Closure(closure)) if !closure.is_arrow() && !closure.is_async => {
                let instance = Value::object(IndexMap::new());
                let result = self.call_closure(closure, Some(instance.clone()), args, line)?;
                Ok(match result {
                    Value::Object(_) | Value::Array(_) | Value::Function(_) | Value::Promise(_) => result,
                    _ => instance,
                })
            }
            _ => Err(RuntimeError::type_error(
                format!("{} is not a constructor", callee.describe()),
                line,
            )
            .into()),
        }
    }

    fn evaluate_arguments(&mut self, arguments: &[Expr]) -> Eval<Vec<Value>> {
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.evaluate_expr(argument)?);
        }
        Ok(values)
    }

    /// Call any value; non-functions fail with `NotCallable`
    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        this: Option<Value>,
        args: Vec<Value>,
        line: usize,
    ) -> Eval<Value> {
        match callee {
            Value::Function(function) => self.call_function(&function.clone(), this, args, line),
            other => Err(RuntimeError::NotCallable {
                callee: describe_value(other),
                line,
            }
            .into()),
        }
    }

    pub(crate) fn call_function(
        &mut self,
        function: &Rc<Function>,
        this: Option<Value>,
        args: Vec<Value>,
        line: usize,
    ) -> Eval<Value> {
        match function.as_ref() {
            Function::Closure(closure) => self.call_closure(closure, this, args, line),
            Function::Builtin(builtin) => self.call_builtin(*builtin, args, line),
            Function::Method { receiver, method } => self.call_method(receiver, *method, args, line),
            Function::Resolver(resolver) => Ok(self.call_resolver(resolver, args)?),
            Function::Continuation {
                continuation,
                settlement,
            } => {
                let value = args.into_iter().next().unwrap_or_default();
                self.resume_async(continuation, *settlement, value)
            }
            Function::Finally {
                callback,
                settlement,
            } => {
                let value = args.into_iter().next().unwrap_or_default();
                self.call_finally(callback, *settlement, value, line)
            }
        }
    }

    /// Run a user function in a fresh scope parented to its captured scope.
    ///
    /// Async functions run until their first `await`; the suspension is
    /// turned into a continuation and the outer promise is returned.
    pub(crate) fn call_closure(
        &mut self,
        closure: &Closure,
        this: Option<Value>,
        args: Vec<Value>,
        line: usize,
    ) -> Eval<Value> {
        let limit = self.config.max_call_stack_depth;
        if self.event_loop.depth() >= limit {
            return Err(RuntimeError::CallStackOverflow { limit, line }.into());
        }

        let name = closure.label();
        let definition_line = self.line_at(closure.node.location);
        let outer = closure.is_async.then(|| self.new_promise());

        let rendered: Vec<String> = args.iter().map(describe_value).collect();
        self.event_loop.push_frame(name.clone(), Some(definition_line));
        self.record(
            StepKind::Call,
            format!("call {}({})", name, rendered.join(", ")),
            Some(definition_line),
        )?;

        // Arrows see the `this` of their defining scope
        let this = if closure.is_arrow() {
            None
        } else {
            Some(this.unwrap_or_default())
        };
        let previous = self.scopes.enter_closure_scope(closure, this);
        let saved_flow = std::mem::replace(&mut self.control_flow, ControlFlow::Normal);

        let result = self.run_closure_body(closure, args);

        let flow = std::mem::replace(&mut self.control_flow, saved_flow);
        self.scopes.switch_to(previous);
        self.event_loop.pop_frame();

        let value = match outer {
            Some(outer) => {
                self.finish_async(name.clone(), outer.clone(), flow, result)?;
                Value::Promise(outer)
            }
            None => {
                result?;
                match flow {
                    ControlFlow::Return(value) => value,
                    _ => Value::Undefined,
                }
            }
        };

        self.record(
            StepKind::Return,
            format!("{} returned {}", name, describe_value(&value)),
            Some(line),
        )?;
        Ok(value)
    }

    fn run_closure_body(&mut self, closure: &Closure, args: Vec<Value>) -> Eval<()> {
        let node = closure.node.clone();

        let mut args = args.into_iter();
        for param in &node.params {
            let argument = args.next().unwrap_or_default();
            let value = match (&param.default, argument) {
                (Some(default), Value::Undefined) => self.evaluate_named(default, &param.name)?,
                (_, value) => value,
            };
            self.scopes.declare_function(&param.name, value);
        }

        match &node.body {
            FunctionBody::Block(body) => {
                self.hoist_function_declarations(body)?;
                self.execute_statements(body, 0)
            }
            FunctionBody::Expression(expr) => match expr.as_ref() {
                Expr::Await { argument, location } if closure.is_async => {
                    let line = self.line_at(*location);
                    self.begin_await(argument, AwaitTarget::Return, line)
                }
                expr => {
                    let value = self.evaluate_expr(expr)?;
                    self.control_flow = ControlFlow::Return(value);
                    Ok(())
                }
            },
        }
    }
}

/// `new Error(message)` / `Error(message)`
pub(crate) fn error_object(args: Vec<Value>) -> Value {
    let message = match args.into_iter().next() {
        Some(Value::Undefined) | None => String::new(),
        Some(value) => crate::interpreter::format::to_js_string(&value),
    };
    let mut properties = IndexMap::new();
    properties.insert("name".to_string(), Value::string("Error"));
    properties.insert("message".to_string(), Value::String(message));
    Value::object(properties)
}

#[cfg(test)]
mod tests {
    use crate::config::InterpreterConfig;
    use crate::interpreter::errors::RuntimeError;
    use crate::snapshot::StepKind;
    use crate::{simulate, SimulationError};
    use pretty_assertions::assert_eq;

    fn console(source: &str) -> Vec<String> {
        let steps = simulate(source, &InterpreterConfig::default()).unwrap();
        steps
            .last()
            .map(|step| step.state.console.iter().map(|entry| entry.text.clone()).collect())
            .unwrap_or_default()
    }

    fn failure(source: &str, config: InterpreterConfig) -> RuntimeError {
        match simulate(source, &config) {
            Err(SimulationError::Execution(failure)) => failure.error,
            other => panic!("expected an execution failure, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_closure_scope_is_lexical() {
        let output = console(
            "const x = 'global';\n\
             function show() { return x; }\n\
             function caller() { const x = 'local'; return show(); }\n\
             console.log(caller());",
        );
        assert_eq!(output, vec!["global"]);
    }

    #[test]
    fn test_closure_outlives_its_frame() {
        let output = console(
            "function counter() { let n = 0; return () => ++n; }\n\
             const next = counter(); next(); next();\n\
             console.log(next());",
        );
        assert_eq!(output, vec!["3"]);
    }

    #[test]
    fn test_default_parameters() {
        let output = console("function f(a, b = a * 2) { return a + b; } console.log(f(1), f(1, 5), f(1, undefined));");
        assert_eq!(output, vec!["3 6 3"]);
    }

    #[test]
    fn test_method_this_and_arrow_this() {
        let output = console(
            "const o = { name: 'o', plain() { return this.name; }, arrow: () => typeof this };\n\
             console.log(o.plain(), o.arrow());",
        );
        assert_eq!(output, vec!["o undefined"]);
    }

    #[test]
    fn test_constructor_function() {
        let output = console("function Point(x) { this.x = x; } const p = new Point(4); console.log(p.x);");
        assert_eq!(output, vec!["4"]);
    }

    #[test]
    fn test_calling_a_non_function() {
        let error = failure("const n = 1;\nn();", InterpreterConfig::default());
        assert_eq!(
            error,
            RuntimeError::NotCallable {
                callee: "n".to_string(),
                line: 2
            }
        );
    }

    #[test]
    fn test_unbounded_recursion_overflows() {
        let config = InterpreterConfig::default().with_max_call_stack_depth(20);
        let error = failure("function f() { return f(); }\nf();", config);
        assert!(matches!(error, RuntimeError::CallStackOverflow { limit: 20, line: 1 }));
    }

    #[test]
    fn test_call_and_return_steps() {
        let steps = simulate("function add(a, b) {\n  return a + b;\n}\nadd(1, 2);", &InterpreterConfig::default())
            .unwrap();

        let call = steps.iter().find(|step| step.kind == StepKind::Call).unwrap();
        assert_eq!(call.description, "call add(1, 2)");
        assert_eq!(call.line, Some(1));
        let names: Vec<&str> = call.state.call_stack.iter().map(|f| f.function_name.as_str()).collect();
        assert_eq!(names, vec!["(global)", "add"]);

        let ret = steps.iter().find(|step| step.kind == StepKind::Return).unwrap();
        assert_eq!(ret.description, "add returned 3");
        assert_eq!(ret.line, Some(4));
        assert_eq!(ret.state.call_stack.len(), 1);
    }
}
