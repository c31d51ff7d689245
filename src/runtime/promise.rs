//! Simulated promise state
//!
//! A [`SimulatedPromise`] settles at most once. Reactions registered while it
//! is pending are handed back by [`SimulatedPromise::settle`] so the caller
//! (the interpreter's promise engine) can run internal reactions inline and
//! schedule one microtask per user handler.

use super::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub type PromiseRef = Rc<RefCell<SimulatedPromise>>;

/// Which way a promise settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Settlement {
    Fulfilled,
    Rejected,
}

#[derive(Debug, Clone)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

impl PromiseState {
    pub fn label(&self) -> &'static str {
        match self {
            PromiseState::Pending => "pending",
            PromiseState::Fulfilled(_) => "fulfilled",
            PromiseState::Rejected(_) => "rejected",
        }
    }
}

/// Work to do when a promise settles
pub enum Reaction {
    /// Registered by `then`: `callback` runs as a microtask and its result
    /// settles `derived`. A missing callback forwards the outcome to
    /// `derived` without a microtask turn.
    Handler {
        callback: Option<Value>,
        derived: Option<PromiseRef>,
    },
    /// Engine bookkeeping, always run synchronously at settlement
    Internal(InternalReaction),
}

pub enum InternalReaction {
    /// Settle the target the same way (promise adoption)
    Adopt(PromiseRef),
    /// Record the outcome of element `index` of a `Promise.all` / `Promise.allSettled`
    Combinator {
        state: Rc<RefCell<CombinatorState>>,
        index: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinatorKind {
    All,
    AllSettled,
}

/// Shared bookkeeping of one `Promise.all` / `Promise.allSettled` call
pub struct CombinatorState {
    pub kind: CombinatorKind,
    pub result: PromiseRef,
    pub values: Vec<Value>,
    pub remaining: usize,
    /// Set once the result promise has been settled; later element outcomes
    /// are ignored.
    pub finished: bool,
}

impl CombinatorState {
    pub fn new(kind: CombinatorKind, result: PromiseRef, len: usize) -> Self {
        CombinatorState {
            kind,
            result,
            values: vec![Value::Undefined; len],
            remaining: len,
            finished: false,
        }
    }

    /// Store one element's outcome. Returns true when every element has
    /// reported and the result can be settled with `values`.
    pub fn record(&mut self, index: usize, value: Value) -> bool {
        if self.finished {
            return false;
        }
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.finished = true;
            return true;
        }
        false
    }
}

pub struct SimulatedPromise {
    pub id: usize,
    pub state: PromiseState,
    pub fulfill_reactions: Vec<Reaction>,
    pub reject_reactions: Vec<Reaction>,
    /// Whether any reaction was ever attached
    pub handled: bool,
    /// Whether an unhandled rejection has already been reported for it
    pub rejection_reported: bool,
}

impl std::fmt::Debug for SimulatedPromise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedPromise")
            .field("id", &self.id)
            .field("state", &self.state.label())
            .field("handled", &self.handled)
            .finish()
    }
}

impl SimulatedPromise {
    pub fn new(id: usize) -> Self {
        SimulatedPromise {
            id,
            state: PromiseState::Pending,
            fulfill_reactions: Vec::new(),
            reject_reactions: Vec::new(),
            handled: false,
            rejection_reported: false,
        }
    }

    pub fn new_ref(id: usize) -> PromiseRef {
        Rc::new(RefCell::new(Self::new(id)))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, PromiseState::Pending)
    }

    /// Settled outcome, if any
    pub fn outcome(&self) -> Option<(Settlement, Value)> {
        match &self.state {
            PromiseState::Pending => None,
            PromiseState::Fulfilled(value) => Some((Settlement::Fulfilled, value.clone())),
            PromiseState::Rejected(reason) => Some((Settlement::Rejected, reason.clone())),
        }
    }

    /// Register one reaction per settlement path
    pub fn add_reactions(&mut self, on_fulfilled: Reaction, on_rejected: Reaction) {
        self.fulfill_reactions.push(on_fulfilled);
        self.reject_reactions.push(on_rejected);
        self.handled = true;
    }

    /// Transition out of `Pending`. Returns the reactions for the taken path,
    /// or `None` if the promise had already settled.
    pub fn settle(&mut self, settlement: Settlement, value: Value) -> Option<Vec<Reaction>> {
        if !self.is_pending() {
            return None;
        }
        let fulfill = std::mem::take(&mut self.fulfill_reactions);
        let reject = std::mem::take(&mut self.reject_reactions);
        match settlement {
            Settlement::Fulfilled => {
                self.state = PromiseState::Fulfilled(value);
                Some(fulfill)
            }
            Settlement::Rejected => {
                self.state = PromiseState::Rejected(value);
                Some(reject)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> Reaction {
        Reaction::Handler {
            callback: None,
            derived: None,
        }
    }

    #[test]
    fn test_settles_once() {
        let mut promise = SimulatedPromise::new(1);
        promise.add_reactions(handler(), handler());

        let reactions = promise.settle(Settlement::Fulfilled, Value::Number(1.0));
        assert_eq!(reactions.map(|r| r.len()), Some(1));
        assert_eq!(promise.state.label(), "fulfilled");

        assert!(promise.settle(Settlement::Rejected, Value::Null).is_none());
        assert!(matches!(promise.outcome(), Some((Settlement::Fulfilled, Value::Number(n))) if n == 1.0));
    }

    #[test]
    fn test_rejection_drops_fulfill_reactions() {
        let mut promise = SimulatedPromise::new(2);
        promise.add_reactions(handler(), handler());
        promise.add_reactions(handler(), handler());

        let reactions = promise.settle(Settlement::Rejected, Value::string("boom")).unwrap();
        assert_eq!(reactions.len(), 2);
        assert!(promise.fulfill_reactions.is_empty());
    }

    #[test]
    fn test_combinator_records_in_input_order() {
        let result = SimulatedPromise::new_ref(3);
        let mut state = CombinatorState::new(CombinatorKind::All, result, 2);

        assert!(!state.record(1, Value::string("second")));
        assert!(state.record(0, Value::string("first")));
        assert!(matches!(&state.values[0], Value::String(s) if s == "first"));
        assert!(matches!(&state.values[1], Value::String(s) if s == "second"));

        // Late outcomes after completion are dropped
        assert!(!state.record(0, Value::Null));
    }
}
