//! Event-loop interpreter
//!
//! This module provides the core execution logic:
//! - [`engine`]: The [`Interpreter`] driver, hoisting and event-loop draining
//! - [`errors`]: Runtime error types
//! - [`format`]: Console, string and JSON rendering of values
//! - `statements`, `loops`, `jumps`: statement execution
//! - `expressions`, `calls`: expression evaluation and function calls
//! - `async_await`, `promises`, `builtins`: the async and builtin runtime
//!
//! # Execution Model
//!
//! The interpreter walks the AST and records an [`ExecutionStep`](crate::snapshot::ExecutionStep)
//! after every observable state change. Once the synchronous script ends,
//! the event loop drains microtasks to a fixed point before each task.

mod async_await;
mod builtins;
mod calls;
pub mod constants;
pub mod engine;
pub mod errors;
mod expressions;
pub mod format;
mod jumps;
mod loops;
mod promises;
mod statements;

pub use engine::{interpret, Interpreter};
pub use errors::{ErrorClass, ExecutionFailure, RuntimeError, SimulationError};
