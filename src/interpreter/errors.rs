//! Runtime error types for the interpreter
//!
//! This module defines [`RuntimeError`], which represents all faults that can
//! occur during interpretation (as opposed to parse errors), and the internal
//! [`Abrupt`] completion that separates user-level throws from faults.
//!
//! All runtime errors are fatal: they abort `interpret` and are reported with
//! the partial step list. User-thrown values only become a [`RuntimeError`]
//! once they escape every `try`.

use crate::config::ConfigError;
use crate::parser::ParseError;
use crate::runtime::scope::ScopeError;
use crate::runtime::value::Value;
use crate::snapshot::ExecutionStep;
use serde::ser::SerializeStruct;
use serde::Serialize;

/// Broad classification of a [`RuntimeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorClass {
    /// Reference, assignment and type errors
    Runtime,
    /// A configured ceiling was exceeded
    ExecutionLimit,
    /// A user-thrown value escaped every handler
    UncaughtThrow,
}

/// Faults that abort interpretation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("ReferenceError: {name} is not defined (line {line})")]
    UndeclaredVariable { name: String, line: usize },

    #[error("ReferenceError: Cannot access '{name}' before initialization (line {line})")]
    TemporalDeadZoneAccess { name: String, line: usize },

    #[error("TypeError: Assignment to constant variable '{name}' (line {line})")]
    ConstReassignment { name: String, line: usize },

    #[error("SyntaxError: Identifier '{name}' has already been declared (line {line})")]
    DuplicateDeclaration { name: String, line: usize },

    #[error("TypeError: {callee} is not a function (line {line})")]
    NotCallable { callee: String, line: usize },

    #[error("TypeError: {message} (line {line})")]
    TypeError { message: String, line: usize },

    /// `await` in a position the continuation model cannot resume from
    #[error("Unsupported await placement (line {line}): {context}")]
    UnsupportedAwait { context: String, line: usize },

    #[error("Uncaught {message} (line {line})")]
    UncaughtException { message: String, line: usize },

    #[error("Execution limit: more than {limit} steps")]
    StepLimitExceeded { limit: usize },

    #[error("Execution limit: maximum call stack depth of {limit} exceeded (line {line})")]
    CallStackOverflow { limit: usize, line: usize },

    #[error("Execution limit: loop ran more than {limit} iterations (line {line})")]
    LoopLimitExceeded { limit: usize, line: usize },

    #[error("Execution limit: event loop ran more than {limit} callbacks")]
    EventLoopLimit { limit: usize },
}

impl RuntimeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RuntimeError::StepLimitExceeded { .. }
            | RuntimeError::CallStackOverflow { .. }
            | RuntimeError::LoopLimitExceeded { .. }
            | RuntimeError::EventLoopLimit { .. } => ErrorClass::ExecutionLimit,
            RuntimeError::UncaughtException { .. } => ErrorClass::UncaughtThrow,
            _ => ErrorClass::Runtime,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            RuntimeError::UndeclaredVariable { line, .. }
            | RuntimeError::TemporalDeadZoneAccess { line, .. }
            | RuntimeError::ConstReassignment { line, .. }
            | RuntimeError::DuplicateDeclaration { line, .. }
            | RuntimeError::NotCallable { line, .. }
            | RuntimeError::TypeError { line, .. }
            | RuntimeError::UnsupportedAwait { line, .. }
            | RuntimeError::UncaughtException { line, .. }
            | RuntimeError::CallStackOverflow { line, .. }
            | RuntimeError::LoopLimitExceeded { line, .. } => Some(*line),
            RuntimeError::StepLimitExceeded { .. } | RuntimeError::EventLoopLimit { .. } => None,
        }
    }

    /// Attach a line to a scope-manager error
    pub fn from_scope(err: ScopeError, line: usize) -> Self {
        match err {
            ScopeError::UndeclaredVariable(name) => RuntimeError::UndeclaredVariable { name, line },
            ScopeError::TemporalDeadZoneAccess(name) => {
                RuntimeError::TemporalDeadZoneAccess { name, line }
            }
            ScopeError::ConstReassignment(name) => RuntimeError::ConstReassignment { name, line },
            ScopeError::DuplicateDeclaration(name) => {
                RuntimeError::DuplicateDeclaration { name, line }
            }
        }
    }

    pub fn type_error(message: impl Into<String>, line: usize) -> Self {
        RuntimeError::TypeError {
            message: message.into(),
            line,
        }
    }
}

impl Serialize for RuntimeError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RuntimeError", 3)?;
        state.serialize_field("class", &self.class())?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("line", &self.line())?;
        state.end()
    }
}

/// A statement or expression that did not complete normally
#[derive(Debug)]
pub(crate) enum Abrupt {
    /// A user-level `throw` (or a rejection surfaced by the engine); catchable
    Throw { value: Value, line: usize },
    /// An interpreter fault; never catchable
    Fault(RuntimeError),
}

impl From<RuntimeError> for Abrupt {
    fn from(err: RuntimeError) -> Self {
        Abrupt::Fault(err)
    }
}

pub(crate) type Eval<T> = Result<T, Abrupt>;

/// An aborted run: the error plus every step recorded before it, ending with
/// the terminal failure step.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}")]
pub struct ExecutionFailure {
    pub error: RuntimeError,
    pub steps: Vec<ExecutionStep>,
}

/// Top-level failure of [`simulate`](crate::simulate)
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("{} parse error(s); first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
    Parse(Vec<ParseError>),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Execution(#[from] ExecutionFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            RuntimeError::LoopLimitExceeded { limit: 5, line: 1 }.class(),
            ErrorClass::ExecutionLimit
        );
        assert_eq!(
            RuntimeError::UncaughtException {
                message: "boom".into(),
                line: 3
            }
            .class(),
            ErrorClass::UncaughtThrow
        );
        assert_eq!(
            RuntimeError::from_scope(ScopeError::ConstReassignment("x".into()), 2).class(),
            ErrorClass::Runtime
        );
    }

    #[test]
    fn test_serialized_shape() {
        let err = RuntimeError::UndeclaredVariable {
            name: "y".into(),
            line: 4,
        };
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["class"], "runtime");
        assert_eq!(json["line"], 4);
        assert_eq!(json["message"], "ReferenceError: y is not defined (line 4)");
    }
}
