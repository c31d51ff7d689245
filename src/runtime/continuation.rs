//! Suspended `async` function state
//!
//! When an `await` is reached, the rest of the enclosing block is captured as
//! a [`ResumeFrame::Block`] (statement list + index of the next statement +
//! the scope it ran in). Each enclosing block and `try` on the way out of the
//! function adds its own frame, innermost first. Resuming runs the frames in
//! order, which continues execution outward until the function body ends.

use super::promise::PromiseRef;
use super::scope::ScopeRef;
use super::value::Value;
use crate::parser::ast::{AssignOp, CatchClause, DeclKind, Expr, Stmt};
use std::rc::Rc;

/// What to do with the awaited value once it is available
#[derive(Debug, Clone)]
pub enum AwaitTarget {
    /// `await e;`
    Discard,
    /// `let x = await e;`
    Declare { name: String, kind: DeclKind },
    /// `x = await e;`, `obj.x += await e;`
    Assign { target: Expr, op: AssignOp },
    /// `return await e;` and async arrow expression bodies
    Return,
}

/// How a statement sequence finished
#[derive(Debug, Clone)]
pub enum Completion {
    Normal,
    Break,
    Continue,
    Return(Value),
    Throw { value: Value, line: usize },
}

/// Where a suspended `try` statement was when the `await` happened
#[derive(Debug, Clone)]
pub enum TryStage {
    /// Inside the `try` block: a throw still reaches the handler
    Block,
    /// Inside the `catch` block: only the finalizer is left
    Handler,
    /// Inside the `finally` block; the completion it interrupted is replayed
    /// once the finalizer finishes normally
    Finalizer(Completion),
}

#[derive(Debug, Clone)]
pub enum ResumeFrame {
    Block {
        body: Rc<[Stmt]>,
        next: usize,
        scope: ScopeRef,
    },
    Try {
        handler: Option<CatchClause>,
        finalizer: Option<Rc<[Stmt]>>,
        /// Scope enclosing the `try` statement
        scope: ScopeRef,
        stage: TryStage,
    },
}

/// Produced by an `await`, travels outward through the statement executors
/// collecting frames until the async call boundary turns it into a
/// [`Continuation`].
#[derive(Debug)]
pub struct Suspension {
    pub awaited: PromiseRef,
    pub target: AwaitTarget,
    /// Scope that was current at the `await`
    pub scope: ScopeRef,
    pub frames: Vec<ResumeFrame>,
    pub line: usize,
}

/// Everything needed to resume an async function
#[derive(Debug)]
pub struct Continuation {
    pub function_name: String,
    /// Promise returned to the async function's caller
    pub outer: PromiseRef,
    pub target: AwaitTarget,
    pub scope: ScopeRef,
    pub frames: Vec<ResumeFrame>,
    pub line: usize,
}

impl Continuation {
    pub fn new(function_name: String, outer: PromiseRef, suspension: Suspension) -> Self {
        Continuation {
            function_name,
            outer,
            target: suspension.target,
            scope: suspension.scope,
            frames: suspension.frames,
            line: suspension.line,
        }
    }
}
