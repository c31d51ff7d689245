//! Statement execution implementation
//!
//! This module handles the execution of all statement types, including:
//!
//! - Variable declarations and initializations
//! - Blocks and statement lists (with suspension frames for `await`)
//! - `if`/`else`, `throw`, and `try/catch/finally`
//!
//! Loops live in `loops`, `return`/`break`/`continue`/`switch` in `jumps`.
//!
//! # Control Flow
//!
//! - `break`, `continue`, `return` and `await` set `self.control_flow`; every
//!   statement list stops at the first statement that leaves it non-normal
//! - User-level throws travel as `Err(Abrupt::Throw)` and are the only
//!   errors `try` can catch
//! - A statement list interrupted by an `await` pushes a
//!   [`ResumeFrame::Block`] pointing at its next statement

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::{Abrupt, Eval, RuntimeError};
use crate::interpreter::format::describe_value;
use crate::parser::ast::*;
use crate::runtime::continuation::{AwaitTarget, Completion, ResumeFrame, TryStage};
use crate::runtime::scope::{ScopeKind, ScopeRef};
use crate::runtime::value::Value;
use crate::snapshot::StepKind;
use crate::stack::ensure_sufficient_stack;
use std::rc::Rc;

impl Interpreter {
    /// Execute `body[start..]` in the current scope
    pub(crate) fn execute_statements(&mut self, body: &Rc<[Stmt]>, start: usize) -> Eval<()> {
        for index in start..body.len() {
            self.execute_statement(&body[index])?;
            match self.control_flow {
                ControlFlow::Normal => {}
                ControlFlow::Suspend(_) => {
                    let scope = self.scopes.current();
                    self.push_resume_frame(ResumeFrame::Block {
                        body: body.clone(),
                        next: index + 1,
                        scope,
                    });
                    return Ok(());
                }
                _ => return Ok(()),
            }
        }
        Ok(())
    }

    /// Execute a block in a fresh block scope. The previous scope is
    /// restored on every exit path.
    pub(crate) fn execute_block(&mut self, body: &Rc<[Stmt]>) -> Eval<()> {
        let previous = self.scopes.current();
        self.scopes.enter_scope(ScopeKind::Block, None);
        let result = self.run_block_body(body);
        self.scopes.switch_to(previous);
        result
    }

    fn run_block_body(&mut self, body: &Rc<[Stmt]>) -> Eval<()> {
        self.hoist_block_declarations(body)?;
        self.execute_statements(body, 0)
    }

    pub(crate) fn execute_statement(&mut self, stmt: &Stmt) -> Eval<()> {
        ensure_sufficient_stack(|| self.execute_statement_inner(stmt))
    }

    fn execute_statement_inner(&mut self, stmt: &Stmt) -> Eval<()> {
        let line = self.line_at(stmt.location());
        self.current_line = line;

        match stmt {
            Stmt::VarDecl {
                kind, declarations, ..
            } => self.execute_var_decl(*kind, declarations, line),

            // Bound when the enclosing block was entered
            Stmt::FunctionDecl { .. } | Stmt::Empty { .. } => Ok(()),

            Stmt::Expression { expr, .. } => match expr {
                Expr::Await { argument, .. } => {
                    self.begin_await(argument, AwaitTarget::Discard, line)
                }
                Expr::Assign {
                    op, target, value, ..
                } => match value.as_ref() {
                    Expr::Await { argument, .. } => {
                        let target = AwaitTarget::Assign {
                            target: target.as_ref().clone(),
                            op: *op,
                        };
                        self.begin_await(argument, target, line)
                    }
                    _ => {
                        self.evaluate_expr(expr)?;
                        Ok(())
                    }
                },
                _ => {
                    self.evaluate_expr(expr)?;
                    Ok(())
                }
            },

            Stmt::Block { body, .. } => self.execute_block(body),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate_expr(condition)?.is_truthy() {
                    self.execute_statement(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch)
                } else {
                    Ok(())
                }
            }

            Stmt::While {
                condition,
                body,
                location,
            } => self.execute_while(condition, body, *location),
            Stmt::DoWhile {
                body,
                condition,
                location,
            } => self.execute_do_while(body, condition, *location),
            Stmt::For {
                init,
                condition,
                update,
                body,
                location,
            } => self.execute_for(
                init.as_ref(),
                condition.as_ref(),
                update.as_ref(),
                body,
                *location,
            ),
            Stmt::ForEach {
                iteration,
                binding,
                iterable,
                body,
                location,
            } => self.execute_for_each(*iteration, binding, iterable, body, *location),

            Stmt::Switch {
                discriminant,
                cases,
                ..
            } => self.execute_switch(discriminant, cases, line),
            Stmt::Return { argument, .. } => self.execute_return(argument.as_ref(), line),
            Stmt::Break { .. } => {
                self.control_flow = ControlFlow::Break;
                Ok(())
            }
            Stmt::Continue { .. } => {
                self.control_flow = ControlFlow::Continue;
                Ok(())
            }

            Stmt::Throw { argument, .. } => {
                let value = self.evaluate_expr(argument)?;
                self.record(
                    StepKind::Throw,
                    format!("throw {}", describe_value(&value)),
                    Some(line),
                )?;
                Err(Abrupt::Throw { value, line })
            }

            Stmt::Try {
                block,
                handler,
                finalizer,
                ..
            } => self.execute_try(block, handler.as_ref(), finalizer.as_ref()),

            Stmt::Class { .. } | Stmt::Import { .. } | Stmt::Export { .. } | Stmt::With { .. } => {
                Err(RuntimeError::type_error("Unsupported statement", line).into())
            }
        }
    }

    pub(crate) fn execute_var_decl(
        &mut self,
        kind: DeclKind,
        declarations: &[Declarator],
        line: usize,
    ) -> Eval<()> {
        let last = declarations.len().saturating_sub(1);
        for (index, declarator) in declarations.iter().enumerate() {
            let value = match &declarator.init {
                Some(Expr::Await { argument, .. }) if index == last => {
                    let target = AwaitTarget::Declare {
                        name: declarator.name.clone(),
                        kind,
                    };
                    return self.begin_await(argument, target, line);
                }
                Some(Expr::Await { .. }) => {
                    return Err(RuntimeError::UnsupportedAwait {
                        context: "only the last declarator may await".to_string(),
                        line,
                    }
                    .into())
                }
                Some(init) => self.evaluate_named(init, &declarator.name)?,
                // `var x;` keeps whatever the hoisted binding holds
                None if kind == DeclKind::Var => continue,
                None => Value::Undefined,
            };
            self.initialize_binding(&declarator.name, kind, value, line)?;
        }
        Ok(())
    }

    /// Initialize an already-declared binding and record the declaration
    pub(crate) fn initialize_binding(
        &mut self,
        name: &str,
        kind: DeclKind,
        value: Value,
        line: usize,
    ) -> Result<(), RuntimeError> {
        let description = format!("{} {} = {}", kind.keyword(), name, describe_value(&value));
        self.scopes
            .initialize_variable(name, value)
            .map_err(|err| RuntimeError::from_scope(err, line))?;
        self.record(StepKind::Declaration, description, Some(line))
    }

    // ===== try / catch / finally =====

    fn execute_try(
        &mut self,
        block: &Rc<[Stmt]>,
        handler: Option<&CatchClause>,
        finalizer: Option<&Rc<[Stmt]>>,
    ) -> Eval<()> {
        let scope = self.scopes.current();
        let result = self.execute_block(block);
        if self.is_suspended() {
            self.push_resume_frame(ResumeFrame::Try {
                handler: handler.cloned(),
                finalizer: finalizer.cloned(),
                scope,
                stage: TryStage::Block,
            });
            return Ok(());
        }

        let completion = self.completion_of(result)?;
        let completion = self.complete_try(handler, finalizer, &scope, TryStage::Block, completion)?;
        if self.is_suspended() {
            return Ok(());
        }
        self.apply_completion(completion)
    }

    /// Run the remaining stages of a `try` statement given how the previous
    /// stage completed. If an `await` suspends the handler or finalizer, a
    /// [`ResumeFrame::Try`] for the next stage is pushed and `Normal` is
    /// returned with `control_flow` left as `Suspend`.
    pub(crate) fn complete_try(
        &mut self,
        handler: Option<&CatchClause>,
        finalizer: Option<&Rc<[Stmt]>>,
        scope: &ScopeRef,
        stage: TryStage,
        mut completion: Completion,
    ) -> Result<Completion, RuntimeError> {
        if let TryStage::Finalizer(interrupted) = stage {
            return Ok(match completion {
                Completion::Normal => interrupted,
                overriding => overriding,
            });
        }

        if matches!(stage, TryStage::Block) {
            if let (Completion::Throw { value, line }, Some(handler)) = (&completion, handler) {
                let (value, line) = (value.clone(), *line);
                self.scopes.switch_to(scope.clone());
                let result = self.execute_catch(handler, value, line);
                if self.is_suspended() {
                    self.push_resume_frame(ResumeFrame::Try {
                        handler: None,
                        finalizer: finalizer.cloned(),
                        scope: scope.clone(),
                        stage: TryStage::Handler,
                    });
                    return Ok(Completion::Normal);
                }
                completion = self.completion_of(result)?;
            }
        }

        if let Some(finalizer) = finalizer {
            self.scopes.switch_to(scope.clone());
            let result = self.execute_block(finalizer);
            if self.is_suspended() {
                self.push_resume_frame(ResumeFrame::Try {
                    handler: None,
                    finalizer: None,
                    scope: scope.clone(),
                    stage: TryStage::Finalizer(completion),
                });
                return Ok(Completion::Normal);
            }
            let after = self.completion_of(result)?;
            if !matches!(after, Completion::Normal) {
                completion = after;
            }
        }
        Ok(completion)
    }

    fn execute_catch(&mut self, handler: &CatchClause, value: Value, line: usize) -> Eval<()> {
        let catch_line = self.line_at(handler.location);
        self.record(
            StepKind::Catch,
            format!("catch {} (thrown at line {})", describe_value(&value), line),
            Some(catch_line),
        )?;

        let previous = self.scopes.current();
        self.scopes.enter_scope(ScopeKind::Block, None);
        let result = self.run_catch_body(handler, value, catch_line);
        self.scopes.switch_to(previous);
        result
    }

    fn run_catch_body(&mut self, handler: &CatchClause, value: Value, line: usize) -> Eval<()> {
        if let Some(param) = &handler.param {
            self.scopes
                .declare_variable(param, DeclKind::Let)
                .and_then(|()| self.scopes.initialize_variable(param, value))
                .map_err(|err| RuntimeError::from_scope(err, line))?;
        }
        self.execute_block(&handler.body)
    }

    /// Fold the result of a statement list and `control_flow` into a
    /// [`Completion`], resetting `control_flow`. Faults pass through.
    pub(crate) fn completion_of(&mut self, result: Eval<()>) -> Result<Completion, RuntimeError> {
        match result {
            Err(Abrupt::Fault(error)) => Err(error),
            Err(Abrupt::Throw { value, line }) => {
                self.control_flow = ControlFlow::Normal;
                Ok(Completion::Throw { value, line })
            }
            Ok(()) => Ok(
                match std::mem::replace(&mut self.control_flow, ControlFlow::Normal) {
                    ControlFlow::Normal => Completion::Normal,
                    ControlFlow::Break => Completion::Break,
                    ControlFlow::Continue => Completion::Continue,
                    ControlFlow::Return(value) => Completion::Return(value),
                    suspended @ ControlFlow::Suspend(_) => {
                        self.control_flow = suspended;
                        Completion::Normal
                    }
                },
            ),
        }
    }

    /// Turn a [`Completion`] back into `control_flow` / a thrown error
    pub(crate) fn apply_completion(&mut self, completion: Completion) -> Eval<()> {
        match completion {
            Completion::Normal => {}
            Completion::Break => self.control_flow = ControlFlow::Break,
            Completion::Continue => self.control_flow = ControlFlow::Continue,
            Completion::Return(value) => self.control_flow = ControlFlow::Return(value),
            Completion::Throw { value, line } => return Err(Abrupt::Throw { value, line }),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::InterpreterConfig;
    use crate::interpreter::errors::RuntimeError;
    use crate::simulate;
    use crate::SimulationError;
    use pretty_assertions::assert_eq;

    fn console(source: &str) -> Vec<String> {
        let steps = simulate(source, &InterpreterConfig::default()).unwrap();
        steps
            .last()
            .map(|step| step.state.console.iter().map(|entry| entry.text.clone()).collect())
            .unwrap_or_default()
    }

    fn runtime_error(source: &str) -> RuntimeError {
        match simulate(source, &InterpreterConfig::default()) {
            Err(SimulationError::Execution(failure)) => failure.error,
            other => panic!("expected a runtime error, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_block_scoping() {
        let output = console("let x = 1; { let x = 2; console.log(x); } console.log(x);");
        assert_eq!(output, vec!["2", "1"]);
    }

    #[test]
    fn test_if_else() {
        let output = console("const n = 3; if (n > 5) { console.log('big'); } else if (n > 1) console.log('mid'); else console.log('small');");
        assert_eq!(output, vec!["mid"]);
    }

    #[test]
    fn test_try_catch_finally_order() {
        let output = console(
            "try { console.log('try'); throw 'oops'; console.log('never'); } \
             catch (e) { console.log('caught ' + e); } \
             finally { console.log('finally'); }",
        );
        assert_eq!(output, vec!["try", "caught oops", "finally"]);
    }

    #[test]
    fn test_finally_runs_on_return() {
        let output = console(
            "function f() { try { return 'value'; } finally { console.log('cleanup'); } } \
             console.log(f());",
        );
        assert_eq!(output, vec!["cleanup", "value"]);
    }

    #[test]
    fn test_rethrow_from_catch_reaches_outer_handler() {
        let output = console(
            "try { try { throw 1; } catch (e) { throw e + 1; } } catch (e) { console.log(e); }",
        );
        assert_eq!(output, vec!["2"]);
    }

    #[test]
    fn test_catch_without_binding() {
        let output = console("try { throw 'x'; } catch { console.log('handled'); }");
        assert_eq!(output, vec!["handled"]);
    }

    #[test]
    fn test_faults_are_not_catchable() {
        let err = runtime_error("try { missing; } catch (e) { console.log('caught'); }");
        assert!(matches!(err, RuntimeError::UndeclaredVariable { ref name, line: 1 } if name == "missing"));
    }

    #[test]
    fn test_only_last_declarator_may_await() {
        let err = runtime_error("async function f() { let a = await 1, b = 2; } f();");
        assert!(matches!(err, RuntimeError::UnsupportedAwait { .. }));
    }
}
