//! Event-loop simulator
//!
//! Owns the call stack, the task (macrotask) queue, the microtask queue, the
//! console sink, and the logical clock.
//!
//! # Ordering
//!
//! - Microtasks are strict FIFO.
//! - Tasks are kept sorted by due time (`created_at + delay`); tasks due at
//!   the same time keep their insertion order.
//! - The clock never reads wall time. It only moves when a task is dequeued,
//!   jumping forward to that task's due time if it is later than the current
//!   clock.

use crate::runtime::promise::{PromiseRef, Settlement};
use crate::runtime::value::Value;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
}

impl ConsoleLevel {
    pub const ALL: [ConsoleLevel; 4] = [
        ConsoleLevel::Log,
        ConsoleLevel::Info,
        ConsoleLevel::Warn,
        ConsoleLevel::Error,
    ];

    /// Method name on the `console` object
    pub fn method(self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
        }
    }
}

/// One line written to the console
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    pub text: String,
}

/// A call stack entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub function_name: String,
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Task,
    Microtask,
}

/// What scheduled a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskSource {
    SetTimeout,
    QueueMicrotask,
    PromiseReaction,
    AsyncResume,
}

impl TaskSource {
    pub fn label(self) -> &'static str {
        match self {
            TaskSource::SetTimeout => "setTimeout",
            TaskSource::QueueMicrotask => "queueMicrotask",
            TaskSource::PromiseReaction => "promise reaction",
            TaskSource::AsyncResume => "async resume",
        }
    }
}

/// A pending callback. Consumed exactly once when dequeued.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub id: usize,
    pub kind: TaskKind,
    pub callback: Value,
    pub source: TaskSource,
    /// Callback name shown in queue snapshots
    pub label: String,
    pub created_at: u64,
    pub due_time: u64,
    /// Promise settled with the callback's result (promise reactions)
    pub chained_promise: Option<PromiseRef>,
    /// Value the callback receives (promise reactions)
    pub resolved_value: Option<Value>,
    /// Settlement path that produced `resolved_value`
    pub settlement: Settlement,
    /// Extra arguments (`setTimeout(cb, delay, ...args)`)
    pub arguments: Vec<Value>,
}

impl ScheduledTask {
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            kind: self.kind,
            source: self.source,
            label: self.label.clone(),
            created_at: self.created_at,
            due_time: self.due_time,
        }
    }
}

/// Request to schedule a callback, filled in by the caller
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub callback: Value,
    pub source: TaskSource,
    pub label: String,
    pub chained_promise: Option<PromiseRef>,
    pub resolved_value: Option<Value>,
    pub settlement: Settlement,
    pub arguments: Vec<Value>,
}

impl TaskRequest {
    pub fn new(callback: Value, source: TaskSource, label: impl Into<String>) -> Self {
        TaskRequest {
            callback,
            source,
            label: label.into(),
            chained_promise: None,
            resolved_value: None,
            settlement: Settlement::Fulfilled,
            arguments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: usize,
    pub kind: TaskKind,
    pub source: TaskSource,
    pub label: String,
    pub created_at: u64,
    pub due_time: u64,
}

/// Deep copy of the event-loop state at one moment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopSnapshot {
    pub call_stack: Vec<StackFrame>,
    pub task_queue: Vec<TaskSnapshot>,
    pub microtask_queue: Vec<TaskSnapshot>,
    pub console: Vec<ConsoleEntry>,
    pub clock: u64,
}

#[derive(Debug, Default)]
pub struct EventLoop {
    call_stack: Vec<StackFrame>,
    tasks: Vec<ScheduledTask>,
    microtasks: VecDeque<ScheduledTask>,
    console: Vec<ConsoleEntry>,
    clock: u64,
    next_task_id: usize,
}

impl EventLoop {
    pub fn new() -> Self {
        EventLoop {
            next_task_id: 1,
            ..Default::default()
        }
    }

    // ===== Call stack =====

    pub fn push_frame(&mut self, function_name: impl Into<String>, line: Option<usize>) {
        self.call_stack.push(StackFrame {
            function_name: function_name.into(),
            line,
        });
    }

    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        self.call_stack.pop()
    }

    pub fn peek_frame(&self) -> Option<&StackFrame> {
        self.call_stack.last()
    }

    pub fn depth(&self) -> usize {
        self.call_stack.len()
    }

    // ===== Queues =====

    fn fresh_id(&mut self) -> usize {
        let id = self.next_task_id;
        self.next_task_id += 1;
        id
    }

    fn build(&mut self, request: TaskRequest, kind: TaskKind, delay: u64) -> ScheduledTask {
        ScheduledTask {
            id: self.fresh_id(),
            kind,
            callback: request.callback,
            source: request.source,
            label: request.label,
            created_at: self.clock,
            due_time: self.clock.saturating_add(delay),
            chained_promise: request.chained_promise,
            resolved_value: request.resolved_value,
            settlement: request.settlement,
            arguments: request.arguments,
        }
    }

    /// Append a task and keep the queue ordered by due time. Returns the task id.
    pub fn schedule_task(&mut self, request: TaskRequest, delay: u64) -> usize {
        let task = self.build(request, TaskKind::Task, delay);
        let id = task.id;
        self.tasks.push(task);
        // Stable: equal due times keep insertion order
        self.tasks.sort_by_key(|task| task.due_time);
        id
    }

    /// Append a microtask. Returns the microtask id.
    pub fn schedule_microtask(&mut self, request: TaskRequest) -> usize {
        let task = self.build(request, TaskKind::Microtask, 0);
        let id = task.id;
        self.microtasks.push_back(task);
        id
    }

    /// Remove a pending task (`clearTimeout`). Returns whether it was queued.
    pub fn cancel_task(&mut self, id: usize) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    pub fn next_microtask(&mut self) -> Option<ScheduledTask> {
        self.microtasks.pop_front()
    }

    /// Dequeue the earliest task, advancing the clock to its due time.
    pub fn next_task(&mut self) -> Option<ScheduledTask> {
        if self.tasks.is_empty() {
            return None;
        }
        let task = self.tasks.remove(0);
        self.clock = self.clock.max(task.due_time);
        Some(task)
    }

    pub fn has_microtasks(&self) -> bool {
        !self.microtasks.is_empty()
    }

    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    // ===== Console =====

    pub fn log(&mut self, level: ConsoleLevel, text: impl Into<String>) {
        self.console.push(ConsoleEntry {
            level,
            text: text.into(),
        });
    }

    pub fn console(&self) -> &[ConsoleEntry] {
        &self.console
    }

    /// Deep, immutable copy for inclusion in an execution step
    pub fn snapshot(&self) -> LoopSnapshot {
        LoopSnapshot {
            call_stack: self.call_stack.clone(),
            task_queue: self.tasks.iter().map(ScheduledTask::snapshot).collect(),
            microtask_queue: self.microtasks.iter().map(ScheduledTask::snapshot).collect(),
            console: self.console.clone(),
            clock: self.clock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(label: &str) -> TaskRequest {
        TaskRequest::new(Value::Undefined, TaskSource::SetTimeout, label)
    }

    #[test]
    fn test_tasks_ordered_by_due_time_then_insertion() {
        let mut event_loop = EventLoop::new();
        event_loop.schedule_task(request("slow"), 100);
        event_loop.schedule_task(request("first zero"), 0);
        event_loop.schedule_task(request("second zero"), 0);

        let order: Vec<String> = std::iter::from_fn(|| event_loop.next_task())
            .map(|task| task.label)
            .collect();
        assert_eq!(order, vec!["first zero", "second zero", "slow"]);
    }

    #[test]
    fn test_clock_advances_on_task_dequeue_only() {
        let mut event_loop = EventLoop::new();
        event_loop.schedule_task(request("a"), 50);
        event_loop.schedule_microtask(TaskRequest::new(
            Value::Undefined,
            TaskSource::QueueMicrotask,
            "m",
        ));

        assert!(event_loop.has_microtasks());
        event_loop.next_microtask();
        assert!(!event_loop.has_microtasks());
        assert_eq!(event_loop.clock(), 0);

        event_loop.next_task();
        assert_eq!(event_loop.clock(), 50);

        // Scheduled from inside the task: due relative to the new clock
        event_loop.schedule_task(request("b"), 10);
        assert_eq!(event_loop.snapshot().task_queue[0].due_time, 60);
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let mut event_loop = EventLoop::new();
        event_loop.schedule_task(request("a"), 100);
        event_loop.schedule_task(request("b"), 100);

        event_loop.next_task();
        event_loop.next_task();
        assert_eq!(event_loop.clock(), 100);
    }

    #[test]
    fn test_microtasks_are_fifo() {
        let mut event_loop = EventLoop::new();
        for label in ["one", "two", "three"] {
            event_loop.schedule_microtask(TaskRequest::new(
                Value::Undefined,
                TaskSource::PromiseReaction,
                label,
            ));
        }

        let order: Vec<String> = std::iter::from_fn(|| event_loop.next_microtask())
            .map(|task| task.label)
            .collect();
        assert_eq!(order, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_cancel_task() {
        let mut event_loop = EventLoop::new();
        let id = event_loop.schedule_task(request("gone"), 0);

        assert!(event_loop.cancel_task(id));
        assert!(!event_loop.cancel_task(id));
        assert!(!event_loop.has_tasks());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut event_loop = EventLoop::new();
        event_loop.push_frame("global", Some(1));
        event_loop.log(ConsoleLevel::Log, "a");

        let snapshot = event_loop.snapshot();
        event_loop.log(ConsoleLevel::Warn, "b");
        event_loop.pop_frame();

        assert_eq!(snapshot.console.len(), 1);
        assert_eq!(snapshot.call_stack[0].function_name, "global");
        assert_eq!(event_loop.console().len(), 2);
        assert!(event_loop.peek_frame().is_none());
    }
}
