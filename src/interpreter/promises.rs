//! Promise engine
//!
//! Settlement, reaction scheduling, adoption, the `Promise` statics and the
//! instance methods. User handlers always run as microtasks; only internal
//! reactions (adoption and combinator bookkeeping) run synchronously at
//! settlement.

use crate::event_loop::{ConsoleLevel, TaskRequest, TaskSource};
use crate::interpreter::builtins::callback_name;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Abrupt, Eval, RuntimeError};
use crate::interpreter::format::{describe_promise_state, describe_thrown, describe_value};
use crate::runtime::promise::{
    CombinatorKind, CombinatorState, InternalReaction, PromiseRef, PromiseState, Reaction,
    Settlement, SimulatedPromise,
};
use crate::runtime::value::{Builtin, Function, Resolver, Value};
use crate::snapshot::StepKind;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Keep only callable handler arguments (`then(undefined, f)`)
fn callable(value: Option<Value>) -> Option<Value> {
    value.filter(|value| value.as_function().is_some())
}

impl Interpreter {
    pub(crate) fn new_promise(&mut self) -> PromiseRef {
        let id = self.next_promise_id;
        self.next_promise_id += 1;
        SimulatedPromise::new_ref(id)
    }

    /// `Promise.resolve(value)`: promises pass through unchanged
    pub(crate) fn promise_resolve(&mut self, value: Value) -> Result<PromiseRef, RuntimeError> {
        if let Value::Promise(promise) = value {
            return Ok(promise);
        }
        let promise = self.new_promise();
        self.resolve_promise(&promise, value)?;
        Ok(promise)
    }

    /// Resolve `promise` with `value`, adopting the state of a promise value.
    /// A pending inner promise is followed through an internal reaction; an
    /// already settled one is adopted immediately.
    pub(crate) fn resolve_promise(&mut self, promise: &PromiseRef, value: Value) -> Result<(), RuntimeError> {
        if !promise.borrow().is_pending() {
            return Ok(());
        }
        let Value::Promise(inner) = &value else {
            return self.settle_promise(promise, Settlement::Fulfilled, value);
        };

        if Rc::ptr_eq(inner, promise) {
            let mut error = IndexMap::new();
            error.insert("name".to_string(), Value::string("TypeError"));
            error.insert(
                "message".to_string(),
                Value::string("Chaining cycle detected for promise"),
            );
            return self.reject_promise(promise, Value::object(error));
        }

        let outcome = inner.borrow().outcome();
        match outcome {
            Some((settlement, inner_value)) => {
                inner.borrow_mut().handled = true;
                self.settle_promise(promise, settlement, inner_value)
            }
            None => {
                inner.borrow_mut().add_reactions(
                    Reaction::Internal(InternalReaction::Adopt(promise.clone())),
                    Reaction::Internal(InternalReaction::Adopt(promise.clone())),
                );
                Ok(())
            }
        }
    }

    pub(crate) fn reject_promise(&mut self, promise: &PromiseRef, reason: Value) -> Result<(), RuntimeError> {
        self.settle_promise(promise, Settlement::Rejected, reason)
    }

    /// Transition out of pending and run the reactions of the taken path.
    /// Settling twice is a no-op.
    fn settle_promise(
        &mut self,
        promise: &PromiseRef,
        settlement: Settlement,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let Some(reactions) = promise.borrow_mut().settle(settlement, value.clone()) else {
            return Ok(());
        };

        let (id, handled, description) = {
            let promise = promise.borrow();
            (promise.id, promise.handled, describe_promise_state(&promise.state))
        };
        tracing::debug!(promise = id, ?settlement, "promise settled");
        self.record(
            StepKind::PromiseSettled,
            format!("promise #{} {}", id, description),
            None,
        )?;

        if settlement == Settlement::Rejected && !handled {
            self.pending_rejections.push(promise.clone());
        }
        for reaction in reactions {
            self.run_reaction(reaction, settlement, value.clone())?;
        }
        Ok(())
    }

    fn run_reaction(
        &mut self,
        reaction: Reaction,
        settlement: Settlement,
        value: Value,
    ) -> Result<(), RuntimeError> {
        match reaction {
            Reaction::Handler {
                callback: Some(callback),
                derived,
            } => self.enqueue_reaction(callback, derived, settlement, value),
            // No handler for this path: forward without a microtask turn
            Reaction::Handler {
                callback: None,
                derived: Some(derived),
            } => self.settle_promise(&derived, settlement, value),
            Reaction::Handler {
                callback: None,
                derived: None,
            } => Ok(()),
            Reaction::Internal(InternalReaction::Adopt(target)) => {
                self.settle_promise(&target, settlement, value)
            }
            Reaction::Internal(InternalReaction::Combinator { state, index }) => {
                self.record_combinator(&state, index, settlement, value)
            }
        }
    }

    /// Schedule one microtask running `callback` with the settled value
    fn enqueue_reaction(
        &mut self,
        callback: Value,
        derived: Option<PromiseRef>,
        settlement: Settlement,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let source = match callback.as_function().map(|function| &**function) {
            Some(Function::Continuation { .. }) => TaskSource::AsyncResume,
            _ => TaskSource::PromiseReaction,
        };
        let label = callback_name(&callback);

        let mut request = TaskRequest::new(callback, source, label.clone());
        request.chained_promise = derived;
        request.resolved_value = Some(value);
        request.settlement = settlement;
        let id = self.event_loop.schedule_microtask(request);

        self.record(
            StepKind::Enqueue,
            format!("enqueue microtask #{} ({}): {}", id, source.label(), label),
            None,
        )
    }

    /// Register handlers on `promise`. If it has already settled the
    /// matching reaction runs right away (which still means a microtask for
    /// a user handler).
    pub(crate) fn subscribe(
        &mut self,
        promise: &PromiseRef,
        on_fulfilled: Option<Value>,
        on_rejected: Option<Value>,
        derived: Option<PromiseRef>,
    ) -> Result<(), RuntimeError> {
        let outcome = promise.borrow().outcome();
        match outcome {
            None => {
                promise.borrow_mut().add_reactions(
                    Reaction::Handler {
                        callback: on_fulfilled,
                        derived: derived.clone(),
                    },
                    Reaction::Handler {
                        callback: on_rejected,
                        derived,
                    },
                );
                Ok(())
            }
            Some((settlement, value)) => {
                promise.borrow_mut().handled = true;
                let callback = match settlement {
                    Settlement::Fulfilled => on_fulfilled,
                    Settlement::Rejected => on_rejected,
                };
                self.run_reaction(Reaction::Handler { callback, derived }, settlement, value)
            }
        }
    }

    // ===== Instance methods =====

    /// `promise.then(onFulfilled, onRejected)`; always a new promise
    pub(crate) fn then_promise(
        &mut self,
        promise: &PromiseRef,
        on_fulfilled: Option<Value>,
        on_rejected: Option<Value>,
    ) -> Result<Value, RuntimeError> {
        let derived = self.new_promise();
        self.subscribe(
            promise,
            callable(on_fulfilled),
            callable(on_rejected),
            Some(derived.clone()),
        )?;
        Ok(Value::Promise(derived))
    }

    /// `promise.finally(callback)`: the callback runs on either path and the
    /// original outcome passes through.
    pub(crate) fn finally_promise(
        &mut self,
        promise: &PromiseRef,
        callback: Option<Value>,
    ) -> Result<Value, RuntimeError> {
        let Some(callback) = callable(callback) else {
            return self.then_promise(promise, None, None);
        };
        let handler = |settlement| {
            Value::function(Function::Finally {
                callback: callback.clone(),
                settlement,
            })
        };
        self.then_promise(
            promise,
            Some(handler(Settlement::Fulfilled)),
            Some(handler(Settlement::Rejected)),
        )
    }

    pub(crate) fn call_finally(
        &mut self,
        callback: &Value,
        settlement: Settlement,
        value: Value,
        line: usize,
    ) -> Eval<Value> {
        self.call_value(callback, None, Vec::new(), line)?;
        match settlement {
            Settlement::Fulfilled => Ok(value),
            Settlement::Rejected => Err(Abrupt::Throw { value, line }),
        }
    }

    // ===== Constructor and resolvers =====

    /// `new Promise(executor)`. A throw inside the executor rejects the
    /// promise unless it was already resolved.
    pub(crate) fn construct_promise(&mut self, args: Vec<Value>, line: usize) -> Eval<Value> {
        let executor = args.into_iter().next().unwrap_or_default();
        if executor.as_function().is_none() {
            return Err(RuntimeError::type_error(
                format!("Promise resolver {} is not a function", describe_value(&executor)),
                line,
            )
            .into());
        }

        let promise = self.new_promise();
        let already_resolved = Rc::new(Cell::new(false));
        let [resolve, reject] = [Settlement::Fulfilled, Settlement::Rejected].map(|settlement| {
            Value::function(Function::Resolver(Resolver {
                promise: promise.clone(),
                settlement,
                already_resolved: already_resolved.clone(),
            }))
        });

        match self.call_value(&executor, None, vec![resolve, reject], line) {
            Ok(_) => {}
            Err(Abrupt::Throw { value, .. }) => {
                if !already_resolved.replace(true) {
                    self.reject_promise(&promise, value)?;
                }
            }
            Err(fault) => return Err(fault),
        }
        Ok(Value::Promise(promise))
    }

    /// `resolve(value)` / `reject(reason)`; only the first call of a pair counts
    pub(crate) fn call_resolver(&mut self, resolver: &Resolver, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if resolver.already_resolved.replace(true) {
            return Ok(Value::Undefined);
        }
        let value = args.into_iter().next().unwrap_or_default();
        match resolver.settlement {
            Settlement::Fulfilled => self.resolve_promise(&resolver.promise, value)?,
            Settlement::Rejected => self.reject_promise(&resolver.promise, value)?,
        }
        Ok(Value::Undefined)
    }

    // ===== Statics =====

    pub(crate) fn call_promise_static(&mut self, builtin: Builtin, args: Vec<Value>, line: usize) -> Eval<Value> {
        let argument = args.into_iter().next().unwrap_or_default();
        match builtin {
            Builtin::PromiseResolve => Ok(Value::Promise(self.promise_resolve(argument)?)),
            Builtin::PromiseReject => {
                let promise = self.new_promise();
                self.reject_promise(&promise, argument)?;
                Ok(Value::Promise(promise))
            }
            Builtin::PromiseAll => self.promise_combinator(CombinatorKind::All, argument, line),
            Builtin::PromiseAllSettled => self.promise_combinator(CombinatorKind::AllSettled, argument, line),
            Builtin::PromiseRace => self.promise_race(argument, line),
            other => Err(RuntimeError::type_error(
                format!("{} is not a Promise static", other.name()),
                line,
            )
            .into()),
        }
    }

    fn iterable_items(&self, iterable: &Value, line: usize) -> Result<Vec<Value>, RuntimeError> {
        match iterable {
            Value::Array(elements) => Ok(elements.borrow().clone()),
            other => Err(RuntimeError::type_error(
                format!("{} is not iterable", describe_value(other)),
                line,
            )),
        }
    }

    /// `Promise.all` / `Promise.allSettled`: results land in input order
    fn promise_combinator(&mut self, kind: CombinatorKind, iterable: Value, line: usize) -> Eval<Value> {
        let items = self.iterable_items(&iterable, line)?;
        let result = self.new_promise();
        if items.is_empty() {
            self.resolve_promise(&result, Value::array(Vec::new()))?;
            return Ok(Value::Promise(result));
        }

        let state = Rc::new(RefCell::new(CombinatorState::new(kind, result.clone(), items.len())));
        for (index, item) in items.into_iter().enumerate() {
            let promise = self.promise_resolve(item)?;
            let outcome = promise.borrow().outcome();
            match outcome {
                Some((settlement, value)) => {
                    promise.borrow_mut().handled = true;
                    self.record_combinator(&state, index, settlement, value)?;
                }
                None => {
                    let reaction = || {
                        Reaction::Internal(InternalReaction::Combinator {
                            state: state.clone(),
                            index,
                        })
                    };
                    promise.borrow_mut().add_reactions(reaction(), reaction());
                }
            }
        }
        Ok(Value::Promise(result))
    }

    fn record_combinator(
        &mut self,
        state: &Rc<RefCell<CombinatorState>>,
        index: usize,
        settlement: Settlement,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let (kind, result) = {
            let state = state.borrow();
            (state.kind, state.result.clone())
        };

        let entry = match (kind, settlement) {
            (CombinatorKind::All, Settlement::Rejected) => {
                // First rejection wins; later outcomes are dropped
                let already_finished = std::mem::replace(&mut state.borrow_mut().finished, true);
                if already_finished {
                    return Ok(());
                }
                return self.reject_promise(&result, value);
            }
            (CombinatorKind::All, Settlement::Fulfilled) => value,
            (CombinatorKind::AllSettled, Settlement::Fulfilled) => {
                settled_entry("fulfilled", "value", value)
            }
            (CombinatorKind::AllSettled, Settlement::Rejected) => {
                settled_entry("rejected", "reason", value)
            }
        };

        let complete = state.borrow_mut().record(index, entry);
        if complete {
            let values = state.borrow().values.clone();
            self.resolve_promise(&result, Value::array(values))?;
        }
        Ok(())
    }

    /// `Promise.race`: every input subscribes a shared resolver pair, so
    /// even an already settled input takes one microtask turn.
    fn promise_race(&mut self, iterable: Value, line: usize) -> Eval<Value> {
        let items = self.iterable_items(&iterable, line)?;
        let result = self.new_promise();
        let already_resolved = Rc::new(Cell::new(false));
        let [resolve, reject] = [Settlement::Fulfilled, Settlement::Rejected].map(|settlement| {
            Value::function(Function::Resolver(Resolver {
                promise: result.clone(),
                settlement,
                already_resolved: already_resolved.clone(),
            }))
        });

        for item in items {
            let promise = self.promise_resolve(item)?;
            self.subscribe(&promise, Some(resolve.clone()), Some(reject.clone()), None)?;
        }
        Ok(Value::Promise(result))
    }

    // ===== Unhandled rejections =====

    /// Report rejected promises that are still unhandled at a microtask
    /// checkpoint. Each promise is reported at most once.
    pub(crate) fn report_unhandled_rejections(&mut self) -> Result<(), RuntimeError> {
        let candidates = std::mem::take(&mut self.pending_rejections);
        for promise in candidates {
            let reason = {
                let mut promise = promise.borrow_mut();
                if promise.handled || promise.rejection_reported {
                    continue;
                }
                let PromiseState::Rejected(reason) = &promise.state else {
                    continue;
                };
                let reason = reason.clone();
                promise.rejection_reported = true;
                reason
            };

            let text = format!("Uncaught (in promise) {}", describe_thrown(&reason));
            tracing::debug!(%text, "unhandled rejection");
            self.event_loop.log(ConsoleLevel::Error, text.clone());
            self.record(StepKind::UnhandledRejection, text, None)?;
        }
        Ok(())
    }
}

/// `{ status, value }` / `{ status, reason }` entry of `Promise.allSettled`
fn settled_entry(status: &str, field: &str, value: Value) -> Value {
    let mut entry = IndexMap::new();
    entry.insert("status".to_string(), Value::string(status));
    entry.insert(field.to_string(), value);
    Value::object(entry)
}

#[cfg(test)]
mod tests {
    use crate::config::InterpreterConfig;
    use crate::event_loop::ConsoleLevel;
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
    fn test_then_chain_passes_values() {
        let output = console(
            "Promise.resolve(1).then(v => v + 1).then(v => { console.log(v); return v * 10; }).then(console.log);",
        );
        assert_eq!(output, vec!["2", "20"]);
    }

    #[test]
    fn test_catch_skips_fulfilled_and_then_skips_rejected() {
        let output = console(
            "Promise.resolve('ok').catch(() => console.log('never')).then(v => console.log('then', v));\n\
             Promise.reject('bad').then(() => console.log('never')).catch(r => console.log('catch', r));",
        );
        assert_eq!(output, vec!["then ok", "catch bad"]);
    }

    #[test]
    fn test_handler_throw_rejects_derived() {
        let output = console(
            "Promise.resolve().then(() => { throw new Error('inside'); }).catch(e => console.log(e.message));",
        );
        assert_eq!(output, vec!["inside"]);
    }

    #[test]
    fn test_executor_resolves_once() {
        let output = console(
            "new Promise((resolve, reject) => { resolve('first'); resolve('second'); reject('third'); })\n\
               .then(v => console.log(v), r => console.log('rejected', r));",
        );
        assert_eq!(output, vec!["first"]);
    }

    #[test]
    fn test_executor_throw_rejects() {
        let output = console(
            "new Promise(() => { throw 'boom'; }).catch(r => console.log('caught', r));",
        );
        assert_eq!(output, vec!["caught boom"]);
    }

    #[test]
    fn test_finally_passes_outcome_through() {
        let output = console(
            "Promise.resolve(7).finally(() => console.log('cleanup')).then(v => console.log('value', v));\n\
             Promise.reject('no').finally(() => console.log('cleanup 2')).catch(r => console.log('reason', r));",
        );
        assert_eq!(output, vec!["cleanup", "cleanup 2", "value 7", "reason no"]);
    }

    #[test]
    fn test_all_settled_shapes() {
        let output = console(
            "Promise.allSettled([Promise.resolve(1), Promise.reject('x'), 3]).then(r => console.log(JSON.stringify(r)));",
        );
        assert_eq!(
            output,
            vec![r#"[{"status":"fulfilled","value":1},{"status":"rejected","reason":"x"},{"status":"fulfilled","value":3}]"#]
        );
    }

    #[test]
    fn test_all_rejects_on_first_rejection() {
        let output = console(
            "const slow = new Promise(resolve => setTimeout(() => resolve('slow'), 10));\n\
             Promise.all([slow, Promise.reject('fast')]).then(v => console.log('all', v), r => console.log('rejected', r));",
        );
        assert_eq!(output, vec!["rejected fast"]);
    }

    #[test]
    fn test_empty_all_fulfills_with_empty_array() {
        let output = console("Promise.all([]).then(v => console.log(v.length));");
        assert_eq!(output, vec!["0"]);
    }

    #[test]
    fn test_unhandled_rejection_is_reported_once() {
        let steps = simulate(
            "Promise.reject(new Error('lost'));\nsetTimeout(() => console.log('later'), 0);",
            &InterpreterConfig::default(),
        )
        .unwrap();

        let reports: Vec<_> = steps
            .iter()
            .filter(|step| step.kind == StepKind::UnhandledRejection)
            .collect();
        assert_eq!(reports.len(), 1);

        let last = steps.last().unwrap();
        let console: Vec<(ConsoleLevel, &str)> = last
            .state
            .console
            .iter()
            .map(|entry| (entry.level, entry.text.as_str()))
            .collect();
        assert_eq!(
            console,
            vec![
                (ConsoleLevel::Error, "Uncaught (in promise) Error: lost"),
                (ConsoleLevel::Log, "later"),
            ]
        );
    }

    #[test]
    fn test_self_resolution_rejects() {
        let output = console(
            "let resolveLater;\n\
             const p = new Promise(resolve => { resolveLater = resolve; });\n\
             resolveLater(p);\n\
             p.catch(e => console.log(e.name, e.message));",
        );
        assert_eq!(output, vec!["TypeError Chaining cycle detected for promise"]);
    }
}
