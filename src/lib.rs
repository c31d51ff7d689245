//! # Introduction
//!
//! loopscope simulates the execution model of a single-threaded JavaScript
//! runtime: lexical scopes and closures, a call stack, and an event loop with
//! a task queue and a microtask queue. Running a program produces an ordered
//! list of immutable [`ExecutionStep`]s that a consumer can play back at any
//! pace.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST + SourceMap → Interpreter → ExecutionSteps
//! ```
//!
//! 1. [`parser`]: tokenises the source, builds the AST, rejects unsupported
//!    constructs and maps node offsets to lines.
//! 2. [`runtime`]: values, the scope chain and simulated promises.
//! 3. [`event_loop`]: call stack, queues, console sink and logical clock.
//! 4. [`interpreter`]: walks the AST, drives the event loop and records
//!    [`snapshot::ExecutionStep`]s.
//!
//! ## Example
//!
//! ```
//! use loopscope::{simulate, InterpreterConfig};
//!
//! let source = "console.log('a');\n\
//!               setTimeout(() => console.log('b'), 0);\n\
//!               Promise.resolve().then(() => console.log('c'));\n\
//!               console.log('d');";
//! let steps = simulate(source, &InterpreterConfig::default()).unwrap();
//! let console: Vec<&str> = steps
//!     .last()
//!     .unwrap()
//!     .state
//!     .console
//!     .iter()
//!     .map(|entry| entry.text.as_str())
//!     .collect();
//! assert_eq!(console, ["a", "d", "c", "b"]);
//! ```

pub mod config;
pub mod event_loop;
pub mod interpreter;
pub mod parser;
pub mod runtime;
pub mod snapshot;
mod stack;

pub use config::{ConfigError, InterpreterConfig};
pub use interpreter::{interpret, ExecutionFailure, RuntimeError, SimulationError};
pub use parser::{parse, ParseError};
pub use snapshot::{ExecutionStep, StepKind};

/// Parse and run `source`, returning every recorded step.
///
/// An invalid configuration and parse diagnostics are returned before
/// anything runs; an aborted run returns its partial steps inside
/// [`ExecutionFailure`].
pub fn simulate(source: &str, config: &InterpreterConfig) -> Result<Vec<ExecutionStep>, SimulationError> {
    config.validate()?;
    let (program, source_map) = parse(source)
        .into_result()
        .map_err(SimulationError::Parse)?;
    Ok(interpret(&program, source_map, config)?)
}
