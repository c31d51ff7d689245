//! Runtime data model for the simulator
//!
//! This module provides the values the interpreter manipulates:
//! - [`value`]: Tagged runtime values and callable function variants
//! - [`scope`]: Lexical scope chain, bindings, and the scope manager
//! - [`promise`]: Simulated promise state, reactions, and combinator bookkeeping
//! - [`continuation`]: Suspended `async` function state captured at an `await`
//!
//! # Ownership
//!
//! Scopes, arrays, objects and promises are shared through `Rc<RefCell<_>>`.
//! A scope stays alive as long as the active call stack or any closure still
//! references it; nothing is freed explicitly.

pub mod continuation;
pub mod promise;
pub mod scope;
pub mod value;

pub use promise::{PromiseRef, PromiseState, Settlement, SimulatedPromise};
pub use scope::{Binding, Scope, ScopeError, ScopeKind, ScopeManager, ScopeRef};
pub use value::{Builtin, Closure, Function, MathFunction, Method, Resolver, Value};
