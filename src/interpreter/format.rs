//! Value rendering
//!
//! Three renderings are needed:
//! - [`to_js_string`]: string conversion used by `+`, templates and `join`
//! - [`format_console`]: what `console.*` prints
//! - [`stringify`]: `JSON.stringify`
//!
//! Plain objects in console output go through a `serde_json` rendering. If
//! anything inside cannot be represented exactly (functions, promises,
//! `undefined`, non-finite numbers, nesting past [`CONSOLE_MAX_DEPTH`]) the
//! object prints as `[object Object]` instead.

use crate::interpreter::constants::{CONSOLE_ARRAY_LIMIT, CONSOLE_MAX_DEPTH, STRING_MAX_DEPTH};
use crate::runtime::promise::PromiseState;
use crate::runtime::value::{ArrayRef, Function, Value};
use serde_json::{Map, Number, Value as JsonValue};
use std::cell::RefCell;
use std::rc::Rc;

/// Number to string, following the usual script-engine rules: integral
/// values print without a fraction, very large and very small magnitudes
/// switch to exponent form.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        };
    }

    if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// String conversion (`String(value)`)
pub fn to_js_string(value: &Value) -> String {
    to_js_string_in(value, &mut Vec::new())
}

/// `Array.prototype.join`. An array reached again while it is already being
/// joined contributes an empty string.
pub fn join_array(elements: &ArrayRef, separator: &str) -> String {
    let mut visiting = Vec::new();
    join_elements(elements, separator, &mut visiting)
}

type Visiting = Vec<*const RefCell<Vec<Value>>>;

fn join_elements(elements: &ArrayRef, separator: &str, visiting: &mut Visiting) -> String {
    let pointer = Rc::as_ptr(elements);
    if visiting.contains(&pointer) || visiting.len() >= STRING_MAX_DEPTH {
        return String::new();
    }
    visiting.push(pointer);
    let joined = elements
        .borrow()
        .iter()
        .map(|element| {
            if element.is_nullish() {
                String::new()
            } else {
                to_js_string_in(element, visiting)
            }
        })
        .collect::<Vec<_>>()
        .join(separator);
    visiting.pop();
    joined
}

fn to_js_string_in(value: &Value, visiting: &mut Visiting) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.clone(),
        Value::Function(function) => format!("function {}() {{ [code] }}", function.label()),
        Value::Array(elements) => join_elements(elements, ",", visiting),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Promise(_) => "[object Promise]".to_string(),
    }
}

/// Render the arguments of one `console.*` call as a single line
pub fn format_console_line(arguments: &[Value]) -> String {
    arguments
        .iter()
        .map(format_console)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Console rendering of a top-level value. Strings print verbatim.
pub fn format_console(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => format_nested(other, 0),
    }
}

fn format_nested(value: &Value, depth: usize) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Function(function) => format_function(function),
        Value::Array(elements) => {
            if depth >= CONSOLE_MAX_DEPTH {
                return "[Array]".to_string();
            }
            let elements = elements.borrow();
            let mut parts: Vec<String> = elements
                .iter()
                .take(CONSOLE_ARRAY_LIMIT)
                .map(|element| format_nested(element, depth + 1))
                .collect();
            if elements.len() > CONSOLE_ARRAY_LIMIT {
                parts.push("...".to_string());
            }
            format!("[{}]", parts.join(", "))
        }
        Value::Object(_) => match to_json(value, JsonMode::Exact, depth) {
            Ok(Some(json)) => json.to_string(),
            _ => "[object Object]".to_string(),
        },
        Value::Promise(promise) => format!("Promise {{<{}>}}", promise.borrow().state.label()),
        primitive => to_js_string(primitive),
    }
}

fn format_function(function: &Function) -> String {
    match function.name() {
        Some(name) => format!("[Function: {}]", name),
        None => "[Function (anonymous)]".to_string(),
    }
}

/// One-word summary of a promise state, for step descriptions
pub fn describe_promise_state(state: &PromiseState) -> String {
    match state {
        PromiseState::Pending => "pending".to_string(),
        PromiseState::Fulfilled(value) => format!("fulfilled with {}", format_nested(value, 0)),
        PromiseState::Rejected(reason) => format!("rejected with {}", format_nested(reason, 0)),
    }
}

/// Rendering of a thrown value or rejection reason. Error objects print as
/// `Name: message`.
pub fn describe_thrown(value: &Value) -> String {
    if let Value::Object(properties) = value {
        let properties = properties.borrow();
        if let Some(Value::String(message)) = properties.get("message") {
            let name = match properties.get("name") {
                Some(Value::String(name)) => name.as_str(),
                _ => "Error",
            };
            return format!("{}: {}", name, message);
        }
    }
    format_console(value)
}

/// Short rendering for step descriptions: like console output but strings
/// keep their quotes.
pub fn describe_value(value: &Value) -> String {
    format_nested(value, 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonMode {
    /// Fail on anything that JSON cannot carry
    Exact,
    /// `JSON.stringify` rules: drop or null out what JSON cannot carry
    Lenient,
}

/// Nesting exceeded [`CONSOLE_MAX_DEPTH`] (or the structure is cyclic)
#[derive(Debug)]
pub struct TooDeep;

fn json_number(n: f64) -> Option<JsonValue> {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Some(JsonValue::Number(Number::from(n as i64)))
    } else {
        Number::from_f64(n).map(JsonValue::Number)
    }
}

fn to_json(value: &Value, mode: JsonMode, depth: usize) -> Result<Option<JsonValue>, TooDeep> {
    if depth > CONSOLE_MAX_DEPTH {
        return Err(TooDeep);
    }
    let json = match value {
        Value::Null => Some(JsonValue::Null),
        Value::Boolean(b) => Some(JsonValue::Bool(*b)),
        Value::String(s) => Some(JsonValue::String(s.clone())),
        Value::Number(n) => match (json_number(*n), mode) {
            (Some(json), _) => Some(json),
            (None, JsonMode::Lenient) => Some(JsonValue::Null),
            (None, JsonMode::Exact) => None,
        },
        Value::Undefined | Value::Function(_) => None,
        Value::Promise(_) => match mode {
            JsonMode::Lenient => Some(JsonValue::Object(Map::new())),
            JsonMode::Exact => None,
        },
        Value::Array(elements) => {
            let mut items = Vec::new();
            for element in elements.borrow().iter() {
                match (to_json(element, mode, depth + 1)?, mode) {
                    (Some(json), _) => items.push(json),
                    (None, JsonMode::Lenient) => items.push(JsonValue::Null),
                    (None, JsonMode::Exact) => return Ok(None),
                }
            }
            Some(JsonValue::Array(items))
        }
        Value::Object(properties) => {
            let mut map = Map::new();
            for (key, property) in properties.borrow().iter() {
                match (to_json(property, mode, depth + 1)?, mode) {
                    (Some(json), _) => {
                        map.insert(key.clone(), json);
                    }
                    (None, JsonMode::Lenient) => {}
                    (None, JsonMode::Exact) => return Ok(None),
                }
            }
            Some(JsonValue::Object(map))
        }
    };
    Ok(json)
}

/// `JSON.stringify(value)`; `Ok(None)` means the result is `undefined`
pub fn stringify(value: &Value) -> Result<Option<String>, TooDeep> {
    Ok(to_json(value, JsonMode::Lenient, 0)?.map(|json| json.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::promise::SimulatedPromise;
    use crate::runtime::value::Builtin;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn object(entries: Vec<(&str, Value)>) -> Value {
        let map: IndexMap<String, Value> = entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        Value::object(map)
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(123456789.0), "123456789");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_array_is_capped() {
        let long = Value::array((0..12).map(|n| Value::Number(n as f64)).collect());
        assert_eq!(format_console(&long), "[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, ...]");

        let mixed = Value::array(vec![Value::string("a"), Value::Null, Value::Boolean(true)]);
        assert_eq!(format_console(&mixed), "[\"a\", null, true]");
    }

    #[test]
    fn test_plain_object_uses_json() {
        let value = object(vec![
            ("name", Value::string("x")),
            ("n", Value::Number(2.0)),
            ("list", Value::array(vec![Value::Number(1.5)])),
        ]);
        assert_eq!(format_console(&value), r#"{"name":"x","n":2,"list":[1.5]}"#);
    }

    #[test]
    fn test_unrepresentable_object_falls_back() {
        let value = object(vec![(
            "f",
            Value::function(Function::Builtin(Builtin::SetTimeout)),
        )]);
        assert_eq!(format_console(&value), "[object Object]");
    }

    #[test]
    fn test_functions_and_promises() {
        let builtin = Value::function(Function::Builtin(Builtin::QueueMicrotask));
        assert_eq!(format_console(&builtin), "[Function: queueMicrotask]");

        let promise = Value::Promise(SimulatedPromise::new_ref(1));
        assert_eq!(format_console(&promise), "Promise {<pending>}");
    }

    #[test]
    fn test_describe_thrown() {
        let error = object(vec![
            ("name", Value::string("Error")),
            ("message", Value::string("boom")),
        ]);
        assert_eq!(describe_thrown(&error), "Error: boom");
        assert_eq!(describe_thrown(&Value::string("plain")), "plain");
    }

    #[test]
    fn test_js_string_conversion() {
        let array = Value::array(vec![Value::Number(1.0), Value::Undefined, Value::string("b")]);
        assert_eq!(to_js_string(&array), "1,,b");
        assert_eq!(to_js_string(&object(Vec::new())), "[object Object]");
    }

    #[test]
    fn test_stringify_drops_what_json_cannot_carry() {
        let value = object(vec![
            ("a", Value::Undefined),
            ("b", Value::array(vec![Value::Undefined, Value::Number(f64::NAN)])),
        ]);
        assert_eq!(stringify(&value).unwrap(), Some(r#"{"b":[null,null]}"#.to_string()));
        assert_eq!(stringify(&Value::Undefined).unwrap(), None);
    }

    #[test]
    fn test_cyclic_structure_is_too_deep() {
        let inner = Value::array(Vec::new());
        if let Value::Array(elements) = &inner {
            elements.borrow_mut().push(inner.clone());
        }
        assert!(stringify(&inner).is_err());
        assert!(format_console(&inner).contains("[Array]"));
    }

    #[test]
    fn test_self_containing_array_joins_as_empty() {
        let array = Value::array(vec![Value::Number(1.0)]);
        if let Value::Array(elements) = &array {
            elements.borrow_mut().push(array.clone());
            assert_eq!(join_array(elements, "-"), "1-");
        }
        assert_eq!(to_js_string(&array), "1,");
    }
}
