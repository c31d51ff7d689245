//! `async` functions and `await`
//!
//! An `await` evaluates its operand, converts it to a promise and sets
//! `control_flow` to [`ControlFlow::Suspend`]. Statement executors on the
//! way out append [`ResumeFrame`]s describing what was left to run. At the
//! async call boundary the suspension becomes a [`Continuation`] subscribed
//! to the awaited promise; resuming replays the frames innermost first.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::{Abrupt, Eval, RuntimeError};
use crate::interpreter::format::describe_value;
use crate::parser::ast::Expr;
use crate::runtime::continuation::{
    AwaitTarget, Completion, Continuation, ResumeFrame, Suspension,
};
use crate::runtime::promise::{PromiseRef, Settlement};
use crate::runtime::value::{Function, Value};
use crate::snapshot::StepKind;
use std::rc::Rc;

impl Interpreter {
    /// Suspend the running async function on `await argument`
    pub(crate) fn begin_await(
        &mut self,
        argument: &Expr,
        target: AwaitTarget,
        line: usize,
    ) -> Eval<()> {
        let value = self.evaluate_expr(argument)?;
        let awaited = self.promise_resolve(value.clone())?;
        self.record(
            StepKind::Await,
            format!("await {}", describe_value(&value)),
            Some(line),
        )?;

        let scope = self.scopes.current();
        self.control_flow = ControlFlow::Suspend(Suspension {
            awaited,
            target,
            scope,
            frames: Vec::new(),
            line,
        });
        Ok(())
    }

    /// Settle or re-subscribe an async function's outer promise once its
    /// body has run (to completion or to the next `await`).
    pub(crate) fn finish_async(
        &mut self,
        function_name: String,
        outer: PromiseRef,
        flow: ControlFlow,
        result: Eval<()>,
    ) -> Result<(), RuntimeError> {
        match result {
            Err(Abrupt::Fault(error)) => Err(error),
            Err(Abrupt::Throw { value, .. }) => self.reject_promise(&outer, value),
            Ok(()) => match flow {
                ControlFlow::Suspend(suspension) => {
                    let awaited = suspension.awaited.clone();
                    let continuation = Rc::new(Continuation::new(function_name, outer, suspension));
                    let resume = |settlement| {
                        Value::function(Function::Continuation {
                            continuation: continuation.clone(),
                            settlement,
                        })
                    };
                    let on_fulfilled = resume(Settlement::Fulfilled);
                    let on_rejected = resume(Settlement::Rejected);
                    self.subscribe(&awaited, Some(on_fulfilled), Some(on_rejected), None)
                }
                ControlFlow::Return(value) => self.resolve_promise(&outer, value),
                ControlFlow::Normal | ControlFlow::Break | ControlFlow::Continue => {
                    self.resolve_promise(&outer, Value::Undefined)
                }
            },
        }
    }

    /// Continue a suspended async function with the awaited outcome
    pub(crate) fn resume_async(
        &mut self,
        continuation: &Rc<Continuation>,
        settlement: Settlement,
        value: Value,
    ) -> Eval<Value> {
        let name = continuation.function_name.clone();
        self.event_loop.push_frame(name.clone(), Some(continuation.line));
        let previous = self.scopes.switch_to(continuation.scope.clone());
        let saved_flow = std::mem::replace(&mut self.control_flow, ControlFlow::Normal);

        let result = self.run_continuation(continuation, settlement, value);

        let flow = std::mem::replace(&mut self.control_flow, saved_flow);
        self.scopes.switch_to(previous);
        self.event_loop.pop_frame();

        self.finish_async(name, continuation.outer.clone(), flow, result)?;
        Ok(Value::Undefined)
    }

    fn run_continuation(
        &mut self,
        continuation: &Continuation,
        settlement: Settlement,
        value: Value,
    ) -> Eval<()> {
        let line = continuation.line;
        self.current_line = line;
        let outcome = match settlement {
            Settlement::Fulfilled => format!("with {}", describe_value(&value)),
            Settlement::Rejected => format!("by throwing {}", describe_value(&value)),
        };
        self.record(
            StepKind::Resume,
            format!("resume {} {}", continuation.function_name, outcome),
            Some(line),
        )?;

        let first = match settlement {
            Settlement::Fulfilled => self.apply_await_target(&continuation.target, value, line),
            Settlement::Rejected => Err(Abrupt::Throw { value, line }),
        };
        self.run_frames(&continuation.frames, first)
    }

    /// Deliver the awaited value to where the `await` stood
    fn apply_await_target(&mut self, target: &AwaitTarget, value: Value, line: usize) -> Eval<()> {
        match target {
            AwaitTarget::Discard => Ok(()),
            AwaitTarget::Declare { name, kind } => Ok(self.initialize_binding(name, *kind, value, line)?),
            AwaitTarget::Assign { target, op } => {
                self.assign_with_op(target, *op, value, line)?;
                Ok(())
            }
            AwaitTarget::Return => {
                self.control_flow = ControlFlow::Return(value);
                Ok(())
            }
        }
    }

    /// Replay resume frames innermost first. A block frame only runs while
    /// the completion is normal; `try` frames see every completion. Suspending
    /// again hands the frames not yet replayed to the new suspension.
    fn run_frames(&mut self, frames: &[ResumeFrame], first: Eval<()>) -> Eval<()> {
        let mut completion = self.completion_of(first)?;

        for (index, frame) in frames.iter().enumerate() {
            match frame {
                ResumeFrame::Block { body, next, scope } => {
                    if !matches!(completion, Completion::Normal) {
                        continue;
                    }
                    self.scopes.switch_to(scope.clone());
                    let result = self.execute_statements(body, *next);
                    if self.is_suspended() {
                        self.extend_suspension(&frames[index + 1..]);
                        return Ok(());
                    }
                    completion = self.completion_of(result)?;
                }
                ResumeFrame::Try {
                    handler,
                    finalizer,
                    scope,
                    stage,
                } => {
                    completion = self.complete_try(
                        handler.as_ref(),
                        finalizer.as_ref(),
                        scope,
                        stage.clone(),
                        completion,
                    )?;
                    if self.is_suspended() {
                        self.extend_suspension(&frames[index + 1..]);
                        return Ok(());
                    }
                }
            }
        }
        self.apply_completion(completion)
    }

    fn extend_suspension(&mut self, remaining: &[ResumeFrame]) {
        if let ControlFlow::Suspend(suspension) = &mut self.control_flow {
            suspension.frames.extend(remaining.iter().cloned());
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::InterpreterConfig;
    use crate::snapshot::StepKind;
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
    fn test_async_runs_synchronously_until_first_await() {
        let output = console(
            "async function f() { console.log('f start'); await null; console.log('f resumed'); }\n\
             console.log('before'); f(); console.log('after');",
        );
        assert_eq!(output, vec!["before", "f start", "after", "f resumed"]);
    }

    #[test]
    fn test_await_binds_value_and_returns() {
        let output = console(
            "async function load() { const v = await Promise.resolve(21); return v * 2; }\n\
             load().then(result => console.log(result));",
        );
        assert_eq!(output, vec!["42"]);
    }

    #[test]
    fn test_await_inside_if_resumes_outer_block() {
        let output = console(
            "async function f(flag) {\n\
               if (flag) { await 1; console.log('inside'); }\n\
               console.log('outside');\n\
             }\n\
             f(true);",
        );
        assert_eq!(output, vec!["inside", "outside"]);
    }

    #[test]
    fn test_try_catch_around_await() {
        let output = console(
            "async function f() {\n\
               try { await Promise.reject(new Error('nope')); console.log('unreachable'); }\n\
               catch (e) { console.log('caught', e.message); }\n\
               finally { console.log('finally'); }\n\
               return 'done';\n\
             }\n\
             f().then(v => console.log(v));",
        );
        assert_eq!(output, vec!["caught nope", "finally", "done"]);
    }

    #[test]
    fn test_multiple_awaits_and_assignment() {
        let output = console(
            "async function f() { let total = 1; total += await 2; total = await (total * 10); console.log(total); }\n\
             f();",
        );
        assert_eq!(output, vec!["30"]);
    }

    #[test]
    fn test_throw_after_await_rejects_outer_promise() {
        let output = console(
            "async function f() { await null; throw new Error('late'); }\n\
             f().catch(e => console.log('handled', e.message));",
        );
        assert_eq!(output, vec!["handled late"]);
    }

    #[test]
    fn test_async_arrow_expression_body() {
        let output = console("const f = async () => await 5; f().then(console.log);");
        assert_eq!(output, vec!["5"]);
    }

    #[test]
    fn test_resume_steps_carry_function_frame() {
        let steps = simulate(
            "async function f() {\n  await null;\n  console.log('x');\n}\nf();",
            &InterpreterConfig::default(),
        )
        .unwrap();
        let resume = steps.iter().find(|step| step.kind == StepKind::Resume).unwrap();
        assert_eq!(resume.line, Some(2));
        assert_eq!(resume.state.call_stack.len(), 1);
        assert_eq!(resume.state.call_stack[0].function_name, "f");
    }
}
