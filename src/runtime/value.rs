//! Runtime value representation
//!
//! This module defines the [`Value`] enum, which represents all possible runtime
//! values of the simulated language, and [`Function`], the closed set of things
//! that can be called.
//!
//! # Value Types
//!
//! - Primitives: [`Value::Undefined`], [`Value::Null`], [`Value::Boolean`],
//!   [`Value::Number`], [`Value::String`]
//! - [`Value::Function`]: user closures, builtins, bound methods, promise
//!   resolvers and async continuations
//! - [`Value::Array`] / [`Value::Object`]: shared, mutable containers
//! - [`Value::Promise`]: reference to a [`SimulatedPromise`](super::SimulatedPromise)
//!
//! Reference-typed values compare by identity, primitives by value.

use super::continuation::Continuation;
use super::promise::{PromiseRef, Settlement};
use super::scope::ScopeRef;
use crate::event_loop::ConsoleLevel;
use crate::interpreter::format::to_js_string;
use crate::parser::ast::FunctionNode;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;

/// Runtime values in the interpreter
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Function(Rc<Function>),
    Array(ArrayRef),
    Object(ObjectRef),
    Promise(PromiseRef),
}

impl Value {
    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn object(properties: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(properties)))
    }

    pub fn function(function: Function) -> Self {
        Value::Function(Rc::new(function))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Function(_) | Value::Array(_) | Value::Object(_) | Value::Promise(_) => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Result of the `typeof` operator
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Promise(_) => "object",
        }
    }

    pub fn as_promise(&self) -> Option<&PromiseRef> {
        match self {
            Value::Promise(promise) => Some(promise),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric conversion used by arithmetic and relational operators
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) => Value::String(to_js_string(self)).to_number(),
            Value::Function(_) | Value::Object(_) | Value::Promise(_) => f64::NAN,
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Promise(a), Value::Promise(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==`: `null == undefined`, numeric comparison across primitives
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (
                Value::Number(_) | Value::String(_) | Value::Boolean(_),
                Value::Number(_) | Value::String(_) | Value::Boolean(_),
            ) if std::mem::discriminant(self) != std::mem::discriminant(other) => {
                self.to_number() == other.to_number()
            }
            _ => self.strict_equals(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Function(function) => write!(f, "Function({})", function.label()),
            Value::Array(elements) => write!(f, "Array(len={})", elements.borrow().len()),
            Value::Object(properties) => {
                let properties = properties.borrow();
                let keys: Vec<&String> = properties.keys().collect();
                write!(f, "Object({:?})", keys)
            }
            Value::Promise(promise) => {
                let promise = promise.borrow();
                write!(f, "Promise(#{} {})", promise.id, promise.state.label())
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Everything that can be called
pub enum Function {
    /// A user function with its captured scope
    Closure(Closure),
    /// A global builtin (`console.log`, `setTimeout`, `Promise.all`, ...)
    Builtin(Builtin),
    /// A builtin method read off a receiver (`p.then`, `arr.push`)
    Method { receiver: Value, method: Method },
    /// The `resolve` / `reject` functions handed to a promise executor
    Resolver(Resolver),
    /// Resumes a suspended `async` function once its awaited promise settles
    Continuation {
        continuation: Rc<Continuation>,
        settlement: Settlement,
    },
    /// Handler installed by `promise.finally(callback)`
    Finally {
        callback: Value,
        settlement: Settlement,
    },
}

impl Function {
    /// Name used for stack frames and console output
    pub fn label(&self) -> String {
        match self {
            Function::Closure(closure) => closure.label(),
            Function::Builtin(builtin) => builtin.name().to_string(),
            Function::Method { method, .. } => method.name().to_string(),
            Function::Resolver(resolver) => match resolver.settlement {
                Settlement::Fulfilled => "resolve".to_string(),
                Settlement::Rejected => "reject".to_string(),
            },
            Function::Continuation { continuation, .. } => {
                format!("{} (resumed)", continuation.function_name)
            }
            Function::Finally { .. } => "finally".to_string(),
        }
    }

    /// The user-visible name, if the function has one
    pub fn name(&self) -> Option<String> {
        match self {
            Function::Closure(closure) => closure.name.clone(),
            _ => Some(self.label()),
        }
    }
}

/// A function value plus the scope it was defined in
pub struct Closure {
    pub node: Rc<FunctionNode>,
    pub scope: ScopeRef,
    pub name: Option<String>,
    pub is_async: bool,
}

impl Closure {
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| "(anonymous)".to_string())
    }

    pub fn is_arrow(&self) -> bool {
        self.node.is_arrow
    }
}

/// One side of a promise capability. Both sides share `already_resolved`,
/// so only the first call has any effect.
pub struct Resolver {
    pub promise: PromiseRef,
    pub settlement: Settlement,
    pub already_resolved: Rc<Cell<bool>>,
}

/// Global builtin functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Console(ConsoleLevel),
    SetTimeout,
    ClearTimeout,
    QueueMicrotask,
    PromiseConstructor,
    PromiseResolve,
    PromiseReject,
    PromiseAll,
    PromiseRace,
    PromiseAllSettled,
    Math(MathFunction),
    JsonStringify,
    ErrorConstructor,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Console(level) => match level {
                ConsoleLevel::Log => "console.log",
                ConsoleLevel::Info => "console.info",
                ConsoleLevel::Warn => "console.warn",
                ConsoleLevel::Error => "console.error",
            },
            Builtin::SetTimeout => "setTimeout",
            Builtin::ClearTimeout => "clearTimeout",
            Builtin::QueueMicrotask => "queueMicrotask",
            Builtin::PromiseConstructor => "Promise",
            Builtin::PromiseResolve => "Promise.resolve",
            Builtin::PromiseReject => "Promise.reject",
            Builtin::PromiseAll => "Promise.all",
            Builtin::PromiseRace => "Promise.race",
            Builtin::PromiseAllSettled => "Promise.allSettled",
            Builtin::Math(function) => function.name(),
            Builtin::JsonStringify => "JSON.stringify",
            Builtin::ErrorConstructor => "Error",
        }
    }

    /// Static members of the `Promise` constructor
    pub fn promise_static(name: &str) -> Option<Builtin> {
        match name {
            "resolve" => Some(Builtin::PromiseResolve),
            "reject" => Some(Builtin::PromiseReject),
            "all" => Some(Builtin::PromiseAll),
            "race" => Some(Builtin::PromiseRace),
            "allSettled" => Some(Builtin::PromiseAllSettled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFunction {
    Floor,
    Ceil,
    Round,
    Abs,
    Max,
    Min,
}

impl MathFunction {
    pub const ALL: [MathFunction; 6] = [
        MathFunction::Floor,
        MathFunction::Ceil,
        MathFunction::Round,
        MathFunction::Abs,
        MathFunction::Max,
        MathFunction::Min,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MathFunction::Floor => "Math.floor",
            MathFunction::Ceil => "Math.ceil",
            MathFunction::Round => "Math.round",
            MathFunction::Abs => "Math.abs",
            MathFunction::Max => "Math.max",
            MathFunction::Min => "Math.min",
        }
    }

    /// Property name on the `Math` object
    pub fn property(self) -> &'static str {
        self.name().trim_start_matches("Math.")
    }
}

/// Builtin methods available on promises, arrays and strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    // Promise
    Then,
    Catch,
    Finally,
    // Array
    Push,
    Pop,
    Map,
    Filter,
    ForEach,
    Join,
    // Array and string
    Includes,
    IndexOf,
    // String
    ToUpperCase,
    ToLowerCase,
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Then => "then",
            Method::Catch => "catch",
            Method::Finally => "finally",
            Method::Push => "push",
            Method::Pop => "pop",
            Method::Map => "map",
            Method::Filter => "filter",
            Method::ForEach => "forEach",
            Method::Join => "join",
            Method::Includes => "includes",
            Method::IndexOf => "indexOf",
            Method::ToUpperCase => "toUpperCase",
            Method::ToLowerCase => "toLowerCase",
        }
    }

    pub fn for_promise(name: &str) -> Option<Method> {
        match name {
            "then" => Some(Method::Then),
            "catch" => Some(Method::Catch),
            "finally" => Some(Method::Finally),
            _ => None,
        }
    }

    pub fn for_array(name: &str) -> Option<Method> {
        match name {
            "push" => Some(Method::Push),
            "pop" => Some(Method::Pop),
            "map" => Some(Method::Map),
            "filter" => Some(Method::Filter),
            "forEach" => Some(Method::ForEach),
            "join" => Some(Method::Join),
            "includes" => Some(Method::Includes),
            "indexOf" => Some(Method::IndexOf),
            _ => None,
        }
    }

    pub fn for_string(name: &str) -> Option<Method> {
        match name {
            "includes" => Some(Method::Includes),
            "indexOf" => Some(Method::IndexOf),
            "toUpperCase" => Some(Method::ToUpperCase),
            "toLowerCase" => Some(Method::ToLowerCase),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::string("0").is_truthy());
        assert!(Value::array(Vec::new()).is_truthy());
    }

    #[test]
    fn test_strict_equality_uses_identity_for_references() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let b = Value::array(vec![Value::Number(1.0)]);

        assert!(a.strict_equals(&a.clone()));
        assert!(!a.strict_equals(&b));
        assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(Value::Number(1.0).loose_equals(&Value::string("1")));
        assert!(Value::Boolean(true).loose_equals(&Value::Number(1.0)));
        assert!(!Value::Null.loose_equals(&Value::Number(0.0)));
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::string(" 42 ").to_number(), 42.0);
        assert_eq!(Value::string("").to_number(), 0.0);
        assert!(Value::string("abc").to_number().is_nan());
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::Undefined.to_number().is_nan());
        assert_eq!(Value::array(Vec::new()).to_number(), 0.0);
        assert_eq!(Value::array(vec![Value::Number(7.0)]).to_number(), 7.0);
        assert!(Value::array(vec![Value::Number(1.0), Value::Number(2.0)]).to_number().is_nan());

        let cyclic = Value::array(Vec::new());
        if let Value::Array(elements) = &cyclic {
            elements.borrow_mut().push(cyclic.clone());
        }
        assert_eq!(cyclic.to_number(), 0.0);
    }

    #[test]
    fn test_typeof() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::function(Function::Builtin(Builtin::SetTimeout)).type_of(), "function");
        assert_eq!(Value::Undefined.type_of(), "undefined");
    }
}
