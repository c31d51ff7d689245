// Execution steps recorded for playback

use crate::event_loop::LoopSnapshot;
use crate::interpreter::errors::RuntimeError;
use serde::Serialize;

/// What kind of action produced a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    ProgramStart,
    Declaration,
    Assignment,
    Call,
    Return,
    Throw,
    Catch,
    Console,
    Enqueue,
    Dequeue,
    /// `clearTimeout` removed a pending task
    Cancel,
    PromiseSettled,
    Await,
    Resume,
    UnhandledRejection,
    ScriptEnd,
    ProgramEnd,
    Error,
}

/// One recorded moment. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    pub index: usize,
    pub kind: StepKind,
    pub description: String,
    /// Source line of the node being executed, if any
    pub line: Option<usize>,
    #[serde(flatten)]
    pub state: LoopSnapshot,
}

/// Collects steps and enforces the step ceiling
#[derive(Debug)]
pub struct StepRecorder {
    steps: Vec<ExecutionStep>,
    max_steps: usize,
}

impl StepRecorder {
    pub fn new(max_steps: usize) -> Self {
        StepRecorder {
            steps: Vec::new(),
            max_steps,
        }
    }

    /// Add a step to the history
    pub fn record(
        &mut self,
        kind: StepKind,
        description: String,
        line: Option<usize>,
        state: LoopSnapshot,
    ) -> Result<(), RuntimeError> {
        if self.steps.len() >= self.max_steps {
            return Err(RuntimeError::StepLimitExceeded {
                limit: self.max_steps,
            });
        }
        self.push(kind, description, line, state);
        Ok(())
    }

    /// Record the failure step that ends an aborted run. Ignores the ceiling
    /// so the failure is always visible.
    pub fn record_terminal(&mut self, description: String, line: Option<usize>, state: LoopSnapshot) {
        self.push(StepKind::Error, description, line, state);
    }

    fn push(&mut self, kind: StepKind, description: String, line: Option<usize>, state: LoopSnapshot) {
        tracing::trace!(index = self.steps.len(), ?kind, %description, "step");
        self.steps.push(ExecutionStep {
            index: self.steps.len(),
            kind,
            description,
            line,
            state,
        });
    }

    /// Get a step by index
    pub fn get(&self, index: usize) -> Option<&ExecutionStep> {
        self.steps.get(index)
    }

    pub fn last(&self) -> Option<&ExecutionStep> {
        self.steps.last()
    }

    /// Get the number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<ExecutionStep> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::EventLoop;

    #[test]
    fn test_step_limit() {
        let event_loop = EventLoop::new();
        let mut recorder = StepRecorder::new(2);

        recorder
            .record(StepKind::ProgramStart, "start".into(), Some(1), event_loop.snapshot())
            .unwrap();
        recorder
            .record(StepKind::Call, "call".into(), Some(1), event_loop.snapshot())
            .unwrap();
        let err = recorder
            .record(StepKind::Return, "return".into(), Some(1), event_loop.snapshot())
            .unwrap_err();

        assert!(matches!(err, RuntimeError::StepLimitExceeded { limit: 2 }));
        assert_eq!(recorder.len(), 2);

        recorder.record_terminal(err.to_string(), None, event_loop.snapshot());
        assert_eq!(recorder.len(), 3);
        assert_eq!(recorder.last().map(|s| s.kind), Some(StepKind::Error));
        assert_eq!(recorder.get(2).map(|s| s.index), Some(2));
    }
}
