//! Loop statement execution (`while`, `do-while`, `for`, `for...of`, `for...in`).
//!
//! Adds `impl Interpreter` methods for the loop forms of the language
//! subset. `break` and `continue` are propagated via `LoopBodyResult` so the
//! loop driver can react without inspecting `control_flow` directly.
//!
//! Every loop instance counts its iterations under its node offset; the
//! previous count is restored on exit so re-entrant instances of the same
//! loop (recursion) each get their own budget. Exceeding
//! `max_loop_iterations` aborts with [`RuntimeError::LoopLimitExceeded`].

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::{Eval, RuntimeError};
use crate::parser::ast::*;
use crate::runtime::scope::ScopeKind;
use crate::runtime::value::Value;

/// Result returned by [`Interpreter::execute_loop_body`] to signal how the body ended.
pub(crate) enum LoopBodyResult {
    /// Body completed normally or via `continue`; the loop should iterate again.
    Continue,
    /// `break` was encountered; the loop should exit cleanly.
    Break,
    /// `return` was executed; the loop driver should unwind and leave
    /// `self.control_flow` for the caller.
    Exit,
}

impl Interpreter {
    /// Executes one iteration of `body`.
    ///
    /// An `await` inside a loop body cannot be resumed and is reported as
    /// [`RuntimeError::UnsupportedAwait`].
    pub(crate) fn execute_loop_body(&mut self, body: &Stmt, line: usize) -> Eval<LoopBodyResult> {
        self.execute_statement(body)?;
        match std::mem::replace(&mut self.control_flow, ControlFlow::Normal) {
            ControlFlow::Normal | ControlFlow::Continue => Ok(LoopBodyResult::Continue),
            ControlFlow::Break => Ok(LoopBodyResult::Break),
            ControlFlow::Return(value) => {
                self.control_flow = ControlFlow::Return(value);
                Ok(LoopBodyResult::Exit)
            }
            ControlFlow::Suspend(_) => Err(RuntimeError::UnsupportedAwait {
                context: "await inside a loop body".to_string(),
                line,
            }
            .into()),
        }
    }

    // ===== Iteration guard =====

    fn enter_loop(&mut self, location: SourceLocation) -> Option<usize> {
        self.loop_counters.insert(location.offset, 0)
    }

    fn exit_loop(&mut self, location: SourceLocation, previous: Option<usize>) {
        match previous {
            Some(count) => {
                self.loop_counters.insert(location.offset, count);
            }
            None => {
                self.loop_counters.remove(&location.offset);
            }
        }
    }

    fn tick_loop(&mut self, location: SourceLocation, line: usize) -> Result<(), RuntimeError> {
        let limit = self.config.max_loop_iterations;
        let count = self.loop_counters.entry(location.offset).or_insert(0);
        *count += 1;
        if *count > limit {
            tracing::debug!(line, limit, "loop iteration ceiling reached");
            return Err(RuntimeError::LoopLimitExceeded { limit, line });
        }
        Ok(())
    }

    /// Run `body` with the loop guard installed for `location` and the
    /// current scope restored afterwards.
    fn guarded_loop<F>(&mut self, location: SourceLocation, body: F) -> Eval<()>
    where
        F: FnOnce(&mut Self) -> Eval<()>,
    {
        let scope = self.scopes.current();
        let previous = self.enter_loop(location);
        let result = body(self);
        self.exit_loop(location, previous);
        self.scopes.switch_to(scope);
        result
    }

    // ===== Loop forms =====

    /// Executes a `while (condition) body` loop.
    pub(crate) fn execute_while(
        &mut self,
        condition: &Expr,
        body: &Stmt,
        location: SourceLocation,
    ) -> Eval<()> {
        let line = self.line_at(location);
        self.guarded_loop(location, |this| {
            while this.evaluate_expr(condition)?.is_truthy() {
                this.tick_loop(location, line)?;
                match this.execute_loop_body(body, line)? {
                    LoopBodyResult::Continue => {}
                    LoopBodyResult::Break | LoopBodyResult::Exit => break,
                }
            }
            Ok(())
        })
    }

    /// Executes a `do body while (condition)` loop. The body runs at least once.
    pub(crate) fn execute_do_while(
        &mut self,
        body: &Stmt,
        condition: &Expr,
        location: SourceLocation,
    ) -> Eval<()> {
        let line = self.line_at(location);
        self.guarded_loop(location, |this| {
            loop {
                this.tick_loop(location, line)?;
                match this.execute_loop_body(body, line)? {
                    LoopBodyResult::Continue => {}
                    LoopBodyResult::Break | LoopBodyResult::Exit => break,
                }
                if !this.evaluate_expr(condition)?.is_truthy() {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Executes a classic `for (init; condition; update) body` loop.
    ///
    /// With a `let`/`const` initializer the loop scope is copied before each
    /// update, so closures created in an iteration keep that iteration's
    /// binding. A `var` initializer shares one binding across iterations.
    pub(crate) fn execute_for(
        &mut self,
        init: Option<&ForInit>,
        condition: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        location: SourceLocation,
    ) -> Eval<()> {
        let line = self.line_at(location);
        let per_iteration = matches!(
            init,
            Some(ForInit::VarDecl {
                kind: DeclKind::Let | DeclKind::Const,
                ..
            })
        );

        self.guarded_loop(location, |this| {
            this.scopes.enter_scope(ScopeKind::Block, None);
            match init {
                Some(ForInit::VarDecl { kind, declarations }) => {
                    if *kind != DeclKind::Var {
                        for declarator in declarations {
                            this.scopes
                                .declare_variable(&declarator.name, *kind)
                                .map_err(|err| RuntimeError::from_scope(err, line))?;
                        }
                    }
                    this.execute_var_decl(*kind, declarations, line)?;
                }
                Some(ForInit::Expression(expr)) => {
                    this.evaluate_expr(expr)?;
                }
                None => {}
            }

            loop {
                if let Some(condition) = condition {
                    if !this.evaluate_expr(condition)?.is_truthy() {
                        break;
                    }
                }
                this.tick_loop(location, line)?;
                match this.execute_loop_body(body, line)? {
                    LoopBodyResult::Continue => {}
                    LoopBodyResult::Break | LoopBodyResult::Exit => break,
                }
                if per_iteration {
                    this.scopes.copy_current();
                }
                if let Some(update) = update {
                    this.evaluate_expr(update)?;
                }
            }
            Ok(())
        })
    }

    /// Executes `for (binding of iterable)` over array elements or string
    /// characters, and `for (binding in object)` over object keys or
    /// array/string indices. The iterable is read once up front.
    pub(crate) fn execute_for_each(
        &mut self,
        iteration: IterationKind,
        binding: &ForBinding,
        iterable: &Expr,
        body: &Stmt,
        location: SourceLocation,
    ) -> Eval<()> {
        let line = self.line_at(location);
        let source = self.evaluate_expr(iterable)?;
        let items = match iteration {
            IterationKind::Of => match &source {
                Value::Array(elements) => elements.borrow().clone(),
                Value::String(text) => text.chars().map(|c| Value::String(c.to_string())).collect(),
                _ => {
                    return Err(RuntimeError::type_error(
                        format!("{} is not iterable", iterable.describe()),
                        line,
                    )
                    .into())
                }
            },
            IterationKind::In => match &source {
                Value::Object(properties) => properties
                    .borrow()
                    .keys()
                    .map(|key| Value::String(key.clone()))
                    .collect(),
                Value::Array(elements) => (0..elements.borrow().len())
                    .map(|index| Value::String(index.to_string()))
                    .collect(),
                Value::String(text) => (0..text.chars().count())
                    .map(|index| Value::String(index.to_string()))
                    .collect(),
                _ => Vec::new(),
            },
        };

        self.guarded_loop(location, |this| {
            for item in items {
                this.tick_loop(location, line)?;
                let iteration_scope = this.scopes.current();
                this.scopes.enter_scope(ScopeKind::Block, None);
                let outcome = this
                    .bind_loop_item(binding, item, line)
                    .and_then(|()| this.execute_loop_body(body, line));
                this.scopes.switch_to(iteration_scope);
                match outcome? {
                    LoopBodyResult::Continue => {}
                    LoopBodyResult::Break | LoopBodyResult::Exit => break,
                }
            }
            Ok(())
        })
    }

    fn bind_loop_item(&mut self, binding: &ForBinding, item: Value, line: usize) -> Eval<()> {
        match binding.kind {
            Some(kind @ (DeclKind::Let | DeclKind::Const)) => {
                self.scopes
                    .declare_variable(&binding.name, kind)
                    .map_err(|err| RuntimeError::from_scope(err, line))?;
                self.initialize_binding(&binding.name, kind, item, line)?;
            }
            Some(DeclKind::Var) => self.initialize_binding(&binding.name, DeclKind::Var, item, line)?,
            None => {
                let target = Expr::Identifier(binding.name.clone(), SourceLocation::default());
                self.assign_to(&target, item, line)?;
            }
        }
        Ok(())
    }
}
