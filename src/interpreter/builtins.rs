//! Built-in function implementations
//!
//! This module provides the builtins that are handled directly by the
//! interpreter rather than being defined in user code, plus property access
//! on every value type.
//!
//! # Supported Built-ins
//!
//! - `console.log/info/warn/error(...)`: console sink entry at that level
//! - `setTimeout(cb, delay, ...args)` / `clearTimeout(id)`: task queue
//! - `queueMicrotask(cb)`: microtask queue
//! - `Promise` statics and instance methods (see `promises`)
//! - `Math.floor/ceil/round/abs/max/min`, `JSON.stringify`, `Error(message)`
//! - Array `length/push/pop/map/filter/forEach/join/includes/indexOf`
//! - String `length/toUpperCase/toLowerCase/includes/indexOf`
//!
//! # Implementation Notes
//!
//! - Timer delays that are negative or not a number count as `0`
//! - Builtins push no call-stack frame; callbacks they invoke (`map`,
//!   `forEach`, ...) do
//! - All built-ins are implemented as methods on the [`Interpreter`] struct

use crate::event_loop::{TaskRequest, TaskSource};
use crate::interpreter::calls::error_object;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Eval, RuntimeError};
use crate::interpreter::constants::MAX_ARRAY_LENGTH;
use crate::interpreter::format::{
    describe_value, format_console_line, format_number, join_array, stringify, to_js_string,
};
use crate::runtime::value::{Builtin, Function, MathFunction, Method, Value};
use crate::snapshot::StepKind;

/// Array index denoted by a property key, if any
fn array_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
        Value::String(s) => s.parse::<usize>().ok(),
        _ => None,
    }
}

/// Arrays are backed by real storage, so growth past [`MAX_ARRAY_LENGTH`] is refused
fn check_array_length(length: f64, line: usize) -> Result<(), RuntimeError> {
    if length > MAX_ARRAY_LENGTH as f64 {
        return Err(RuntimeError::type_error(
            format!("Invalid array length {} (maximum {})", format_number(length), MAX_ARRAY_LENGTH),
            line,
        ));
    }
    Ok(())
}

/// `SameValueZero`, used by `includes`
fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

fn math(function: MathFunction, args: &[Value]) -> f64 {
    let first = args.first().map(Value::to_number).unwrap_or(f64::NAN);
    match function {
        MathFunction::Floor => first.floor(),
        MathFunction::Ceil => first.ceil(),
        MathFunction::Round => (first + 0.5).floor(),
        MathFunction::Abs => first.abs(),
        MathFunction::Max => args.iter().map(Value::to_number).fold(f64::NEG_INFINITY, |acc, n| {
            if acc.is_nan() || n.is_nan() {
                f64::NAN
            } else {
                acc.max(n)
            }
        }),
        MathFunction::Min => args.iter().map(Value::to_number).fold(f64::INFINITY, |acc, n| {
            if acc.is_nan() || n.is_nan() {
                f64::NAN
            } else {
                acc.min(n)
            }
        }),
    }
}

impl Interpreter {
    // ===== Property access =====

    pub(crate) fn get_property(&self, object: &Value, key: &Value, line: usize) -> Result<Value, RuntimeError> {
        let name = to_js_string(key);
        let method = |method: Option<Method>| {
            method.map(|method| {
                Value::function(Function::Method {
                    receiver: object.clone(),
                    method,
                })
            })
        };

        let value = match object {
            Value::Undefined | Value::Null => {
                return Err(RuntimeError::type_error(
                    format!("Cannot read properties of {} (reading '{}')", to_js_string(object), name),
                    line,
                ))
            }
            Value::Array(elements) => {
                if name == "length" {
                    Some(Value::Number(elements.borrow().len() as f64))
                } else if let Some(index) = array_index(key) {
                    elements.borrow().get(index).cloned()
                } else {
                    method(Method::for_array(&name))
                }
            }
            Value::String(text) => {
                if name == "length" {
                    Some(Value::Number(text.chars().count() as f64))
                } else if let Some(index) = array_index(key) {
                    text.chars().nth(index).map(|c| Value::String(c.to_string()))
                } else {
                    method(Method::for_string(&name))
                }
            }
            Value::Object(properties) => properties.borrow().get(&name).cloned(),
            Value::Promise(_) => method(Method::for_promise(&name)),
            Value::Function(function) => match function.as_ref() {
                Function::Builtin(Builtin::PromiseConstructor) => Builtin::promise_static(&name)
                    .map(|builtin| Value::function(Function::Builtin(builtin))),
                _ if name == "name" => Some(Value::String(function.name().unwrap_or_default())),
                _ => None,
            },
            Value::Boolean(_) | Value::Number(_) => None,
        };
        Ok(value.unwrap_or_default())
    }

    /// Property store. Writes to primitives are silently ignored.
    pub(crate) fn set_property(
        &mut self,
        object: &Value,
        key: &Value,
        value: Value,
        line: usize,
    ) -> Result<(), RuntimeError> {
        match object {
            Value::Undefined | Value::Null => Err(RuntimeError::type_error(
                format!(
                    "Cannot set properties of {} (setting '{}')",
                    to_js_string(object),
                    to_js_string(key)
                ),
                line,
            )),
            Value::Array(elements) => {
                let mut elements = elements.borrow_mut();
                if let Some(index) = array_index(key) {
                    if index >= elements.len() {
                        check_array_length(index as f64 + 1.0, line)?;
                        elements.resize(index + 1, Value::Undefined);
                    }
                    elements[index] = value;
                } else if to_js_string(key) == "length" {
                    let length = value.to_number();
                    if length >= 0.0 && length.fract() == 0.0 {
                        check_array_length(length, line)?;
                        elements.resize(length as usize, Value::Undefined);
                    }
                }
                Ok(())
            }
            Value::Object(properties) => {
                properties.borrow_mut().insert(to_js_string(key), value);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // ===== Global builtins =====

    pub(crate) fn call_builtin(&mut self, builtin: Builtin, args: Vec<Value>, line: usize) -> Eval<Value> {
        match builtin {
            Builtin::Console(level) => {
                let text = format_console_line(&args);
                self.event_loop.log(level, text.clone());
                self.record(
                    StepKind::Console,
                    format!("{}: {}", builtin.name(), text),
                    Some(line),
                )?;
                Ok(Value::Undefined)
            }

            Builtin::SetTimeout => {
                let mut args = args.into_iter();
                let callback = self.require_callback(builtin, args.next(), line)?;
                let delay = args.next().map(|delay| delay.to_number()).unwrap_or(0.0);
                let delay = if delay.is_finite() && delay > 0.0 {
                    delay.floor() as u64
                } else {
                    0
                };

                let label = callback_name(&callback);
                let mut request = TaskRequest::new(callback, TaskSource::SetTimeout, label.clone());
                request.arguments = args.collect();
                let id = self.event_loop.schedule_task(request, delay);
                self.record(
                    StepKind::Enqueue,
                    format!("enqueue task #{} (setTimeout, {}ms): {}", id, delay, label),
                    Some(line),
                )?;
                Ok(Value::Number(id as f64))
            }

            Builtin::ClearTimeout => {
                let id = args.first().and_then(Value::as_number);
                if let Some(id) = id.filter(|id| *id >= 0.0 && id.fract() == 0.0) {
                    if self.event_loop.cancel_task(id as usize) {
                        self.record(
                            StepKind::Cancel,
                            format!("clearTimeout cancelled task #{}", id),
                            Some(line),
                        )?;
                    }
                }
                Ok(Value::Undefined)
            }

            Builtin::QueueMicrotask => {
                let callback = self.require_callback(builtin, args.into_iter().next(), line)?;
                let label = callback_name(&callback);
                let request = TaskRequest::new(callback, TaskSource::QueueMicrotask, label.clone());
                let id = self.event_loop.schedule_microtask(request);
                self.record(
                    StepKind::Enqueue,
                    format!("enqueue microtask #{} (queueMicrotask): {}", id, label),
                    Some(line),
                )?;
                Ok(Value::Undefined)
            }

            Builtin::PromiseConstructor => Err(RuntimeError::type_error(
                "Promise constructor cannot be invoked without 'new'",
                line,
            )
            .into()),

            Builtin::PromiseResolve
            | Builtin::PromiseReject
            | Builtin::PromiseAll
            | Builtin::PromiseRace
            | Builtin::PromiseAllSettled => self.call_promise_static(builtin, args, line),

            Builtin::Math(function) => Ok(Value::Number(math(function, &args))),

            Builtin::JsonStringify => {
                let value = args.into_iter().next().unwrap_or_default();
                match stringify(&value) {
                    Ok(Some(json)) => Ok(Value::String(json)),
                    Ok(None) => Ok(Value::Undefined),
                    Err(_) => Err(RuntimeError::type_error(
                        "Converting circular structure to JSON",
                        line,
                    )
                    .into()),
                }
            }

            Builtin::ErrorConstructor => Ok(error_object(args)),
        }
    }

    fn require_callback(&self, builtin: Builtin, callback: Option<Value>, line: usize) -> Result<Value, RuntimeError> {
        match callback {
            Some(callback) if callback.as_function().is_some() => Ok(callback),
            other => Err(RuntimeError::type_error(
                format!(
                    "{}: callback must be a function, got {}",
                    builtin.name(),
                    describe_value(&other.unwrap_or_default())
                ),
                line,
            )),
        }
    }

    // ===== Methods =====

    pub(crate) fn call_method(
        &mut self,
        receiver: &Value,
        method: Method,
        args: Vec<Value>,
        line: usize,
    ) -> Eval<Value> {
        let first = args.first().cloned().unwrap_or_default();

        match (method, receiver) {
            (Method::Then, Value::Promise(promise)) => {
                let mut args = args.into_iter();
                Ok(self.then_promise(promise, args.next(), args.next())?)
            }
            (Method::Catch, Value::Promise(promise)) => {
                Ok(self.then_promise(promise, None, args.into_iter().next())?)
            }
            (Method::Finally, Value::Promise(promise)) => {
                Ok(self.finally_promise(promise, args.into_iter().next())?)
            }

            (Method::Push, Value::Array(elements)) => {
                let mut elements = elements.borrow_mut();
                elements.extend(args);
                Ok(Value::Number(elements.len() as f64))
            }
            (Method::Pop, Value::Array(elements)) => {
                Ok(elements.borrow_mut().pop().unwrap_or_default())
            }
            (Method::Map | Method::Filter | Method::ForEach, Value::Array(elements)) => {
                let items = elements.borrow().clone();
                let mut mapped = Vec::new();
                for (index, item) in items.into_iter().enumerate() {
                    let arguments = vec![item.clone(), Value::Number(index as f64), receiver.clone()];
                    let result = self.call_value(&first, None, arguments, line)?;
                    match method {
                        Method::Map => mapped.push(result),
                        Method::Filter if result.is_truthy() => mapped.push(item),
                        _ => {}
                    }
                }
                Ok(match method {
                    Method::ForEach => Value::Undefined,
                    _ => Value::array(mapped),
                })
            }
            (Method::Join, Value::Array(elements)) => {
                let separator = match &first {
                    Value::Undefined => ",".to_string(),
                    other => to_js_string(other),
                };
                let joined = join_array(elements, &separator);
                Ok(Value::String(joined))
            }
            (Method::Includes, Value::Array(elements)) => Ok(Value::Boolean(
                elements.borrow().iter().any(|element| same_value_zero(element, &first)),
            )),
            (Method::IndexOf, Value::Array(elements)) => {
                let position = elements
                    .borrow()
                    .iter()
                    .position(|element| element.strict_equals(&first));
                Ok(Value::Number(position.map_or(-1.0, |index| index as f64)))
            }

            (Method::Includes, Value::String(text)) => {
                Ok(Value::Boolean(text.contains(to_js_string(&first).as_str())))
            }
            (Method::IndexOf, Value::String(text)) => {
                let position = text
                    .find(to_js_string(&first).as_str())
                    .map(|byte| text[..byte].chars().count());
                Ok(Value::Number(position.map_or(-1.0, |index| index as f64)))
            }
            (Method::ToUpperCase, Value::String(text)) => Ok(Value::String(text.to_uppercase())),
            (Method::ToLowerCase, Value::String(text)) => Ok(Value::String(text.to_lowercase())),

            (method, receiver) => Err(RuntimeError::NotCallable {
                callee: format!("{}.{}", describe_value(receiver), method.name()),
                line,
            }
            .into()),
        }
    }
}

/// Queue label for a callback
pub(crate) fn callback_name(callback: &Value) -> String {
    callback
        .as_function()
        .map(|function| function.label())
        .unwrap_or_else(|| "(anonymous)".to_string())
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

    #[test]
    fn test_math_functions() {
        let n = |x: f64| Value::Number(x);
        assert_eq!(math(MathFunction::Round, &[n(2.5)]), 3.0);
        assert_eq!(math(MathFunction::Round, &[n(-2.5)]), -2.0);
        assert_eq!(math(MathFunction::Max, &[n(1.0), n(7.0), n(3.0)]), 7.0);
        assert_eq!(math(MathFunction::Max, &[]), f64::NEG_INFINITY);
        assert!(math(MathFunction::Min, &[n(1.0), Value::Undefined]).is_nan());
        assert_eq!(math(MathFunction::Abs, &[Value::string("-4")]), 4.0);
    }

    #[test]
    fn test_same_value_zero() {
        assert!(same_value_zero(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(same_value_zero(&Value::Number(0.0), &Value::Number(-0.0)));
        assert!(!same_value_zero(&Value::Number(1.0), &Value::string("1")));
    }

    #[test]
    fn test_array_methods() {
        let output = console(
            "const xs = [1, 2, 3];\n\
             xs.push(4);\n\
             console.log(xs.length, xs.map(x => x * 2).join('-'), xs.filter(x => x % 2 === 0));\n\
             let sum = 0; xs.forEach((x, i) => { sum += x * i; });\n\
             console.log(sum, xs.pop(), xs.includes(3), xs.indexOf(9), xs[0]);",
        );
        assert_eq!(output, vec!["4 2-4-6-8 [2, 4]", "20 4 true -1 1"]);
    }

    #[test]
    fn test_string_methods() {
        let output = console("const s = 'Hello'; console.log(s.length, s.toUpperCase(), s.includes('ell'), s.indexOf('l'), s[1]);");
        assert_eq!(output, vec!["5 HELLO true 2 e"]);
    }

    #[test]
    fn test_set_timeout_passes_arguments_and_advances_clock() {
        let steps = simulate(
            "setTimeout((a, b) => console.log(a + b), 25, 'x', 'y');",
            &InterpreterConfig::default(),
        )
        .unwrap();
        let last = steps.last().unwrap();
        assert_eq!(last.state.console[0].text, "xy");
        assert_eq!(last.state.clock, 25);
    }

    #[test]
    fn test_clear_timeout_cancels() {
        let steps = simulate(
            "const id = setTimeout(() => console.log('never'), 5);\nclearTimeout(id);\nconsole.log('done');",
            &InterpreterConfig::default(),
        )
        .unwrap();
        assert!(steps.iter().any(|step| step.kind == StepKind::Cancel));
        let output: Vec<&str> = steps.last().unwrap().state.console.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(output, vec!["done"]);
    }

    #[test]
    fn test_reading_property_of_undefined_fails() {
        let result = simulate("const o = {};\nconsole.log(o.missing.deeper);", &InterpreterConfig::default());
        let Err(crate::SimulationError::Execution(failure)) = result else {
            panic!("expected an execution failure");
        };
        assert_eq!(
            failure.error,
            RuntimeError::type_error("Cannot read properties of undefined (reading 'deeper')", 2)
        );
    }

    #[test]
    fn test_json_stringify_and_error() {
        let output = console(
            "const e = new Error('bad'); console.log(JSON.stringify({ a: [1, 'two'], b: undefined }), e.message, Math.floor(2.7));",
        );
        assert_eq!(output, vec![r#"{"a":[1,"two"]} bad 2"#]);
    }
}
