//! Execution engine for the event-loop simulator
//!
//! [`interpret`] drives one run: the synchronous script under the global
//! frame, then the event loop until both queues are empty.

use crate::config::InterpreterConfig;
use crate::event_loop::{ConsoleLevel, EventLoop, ScheduledTask, TaskKind, TaskSource};
use crate::interpreter::constants::{GLOBAL_FRAME, MAX_CALL_STACK_DEPTH_LIMIT};
use crate::interpreter::errors::{Abrupt, ExecutionFailure, RuntimeError};
use crate::interpreter::format::describe_thrown;
use crate::parser::ast::*;
use crate::parser::visit::{walk_stmt, Visitor};
use crate::parser::SourceMap;
use crate::runtime::continuation::{ResumeFrame, Suspension};
use crate::runtime::promise::PromiseRef;
use crate::runtime::scope::{ScopeKind, ScopeManager};
use crate::runtime::value::{Builtin, Function, MathFunction, Value};
use crate::snapshot::{ExecutionStep, StepKind, StepRecorder};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Non-throw completion signal of the statement currently executing
#[derive(Debug)]
pub(crate) enum ControlFlow {
    Normal,
    Break,
    Continue,
    Return(Value),
    /// An `await` was reached; the suspension collects resume frames on its
    /// way out to the async call boundary.
    Suspend(Suspension),
}

/// Run a parsed program to completion and return every recorded step.
///
/// On failure the returned [`ExecutionFailure`] still carries the steps
/// recorded so far, ending with a terminal [`StepKind::Error`] step.
#[tracing::instrument(skip_all, fields(statements = program.body.len()))]
pub fn interpret(
    program: &Program,
    source_map: SourceMap,
    config: &InterpreterConfig,
) -> Result<Vec<ExecutionStep>, ExecutionFailure> {
    let mut interpreter = Interpreter::new(source_map, *config);
    match interpreter.run(program) {
        Ok(()) => Ok(interpreter.recorder.into_steps()),
        Err(error) => Err(interpreter.fail(error)),
    }
}

/// The tree-walking interpreter. One instance per run; nothing is shared
/// between runs.
pub struct Interpreter {
    pub(crate) config: InterpreterConfig,

    /// Node offset → line, from the parser
    source_map: SourceMap,

    /// Scope chain
    pub(crate) scopes: ScopeManager,

    /// Call stack, queues, console and clock
    pub(crate) event_loop: EventLoop,

    /// Recorded execution history
    recorder: StepRecorder,

    /// Source line of the statement being executed
    pub(crate) current_line: usize,

    pub(crate) control_flow: ControlFlow,

    /// Iteration count per loop node (keyed by the loop's source offset)
    pub(crate) loop_counters: FxHashMap<usize, usize>,

    pub(crate) next_promise_id: usize,

    /// Promises rejected without a handler since the last checkpoint
    pub(crate) pending_rejections: Vec<PromiseRef>,
}

impl Interpreter {
    pub fn new(source_map: SourceMap, mut config: InterpreterConfig) -> Self {
        // Configs that skipped `validate` are clamped to the accepted maximum
        config.max_call_stack_depth = config.max_call_stack_depth.min(MAX_CALL_STACK_DEPTH_LIMIT);
        Interpreter {
            config,
            source_map,
            scopes: ScopeManager::new(),
            event_loop: EventLoop::new(),
            recorder: StepRecorder::new(config.max_steps),
            current_line: 1,
            control_flow: ControlFlow::Normal,
            loop_counters: FxHashMap::default(),
            next_promise_id: 1,
            pending_rejections: Vec::new(),
        }
    }

    /// Run the program from start to finish: the synchronous script, then
    /// the event loop until both queues are empty.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        self.install_globals();
        // Script-level let/const/functions live in their own scope so they
        // can shadow builtins; `var` still lands in the global scope.
        self.scopes.enter_scope(ScopeKind::Block, None);

        let first_line = program
            .body
            .first()
            .map(|stmt| self.line_at(stmt.location()))
            .unwrap_or(1);
        self.event_loop.push_frame(GLOBAL_FRAME, Some(first_line));
        self.record(StepKind::ProgramStart, "program start", Some(first_line))?;

        self.hoist_function_declarations(&program.body)?;
        match self.execute_statements(&program.body, 0) {
            Ok(()) => {}
            Err(Abrupt::Throw { value, line }) => {
                return Err(RuntimeError::UncaughtException {
                    message: describe_thrown(&value),
                    line,
                })
            }
            Err(Abrupt::Fault(error)) => return Err(error),
        }
        self.control_flow = ControlFlow::Normal;

        self.event_loop.pop_frame();
        self.record(StepKind::ScriptEnd, "synchronous script finished", None)?;

        self.run_event_loop()?;
        self.record(StepKind::ProgramEnd, "event loop idle, program finished", None)?;
        Ok(())
    }

    fn fail(mut self, error: RuntimeError) -> ExecutionFailure {
        tracing::debug!(%error, "interpretation aborted");
        let state = self.event_loop.snapshot();
        self.recorder.record_terminal(error.to_string(), error.line(), state);
        ExecutionFailure {
            error,
            steps: self.recorder.into_steps(),
        }
    }

    // ===== Steps =====

    /// Record a step carrying a deep copy of the event-loop state
    pub(crate) fn record(
        &mut self,
        kind: StepKind,
        description: impl Into<String>,
        line: Option<usize>,
    ) -> Result<(), RuntimeError> {
        let state = self.event_loop.snapshot();
        self.recorder.record(kind, description.into(), line, state)
    }

    /// Line of a node, resolved through the source map
    pub(crate) fn line_at(&self, location: SourceLocation) -> usize {
        self.source_map
            .line_of(location.offset)
            .unwrap_or(location.line)
    }

    pub(crate) fn is_suspended(&self) -> bool {
        matches!(self.control_flow, ControlFlow::Suspend(_))
    }

    /// Add a frame to the in-flight suspension, if any
    pub(crate) fn push_resume_frame(&mut self, frame: ResumeFrame) {
        if let ControlFlow::Suspend(suspension) = &mut self.control_flow {
            suspension.frames.push(frame);
        }
    }

    // ===== Globals =====

    fn install_globals(&mut self) {
        let builtin = |b: Builtin| Value::function(Function::Builtin(b));

        let console: IndexMap<String, Value> = ConsoleLevel::ALL
            .iter()
            .map(|level| (level.method().to_string(), builtin(Builtin::Console(*level))))
            .collect();
        let math: IndexMap<String, Value> = MathFunction::ALL
            .iter()
            .map(|function| (function.property().to_string(), builtin(Builtin::Math(*function))))
            .chain([
                ("PI".to_string(), Value::Number(std::f64::consts::PI)),
                ("E".to_string(), Value::Number(std::f64::consts::E)),
            ])
            .collect();
        let json: IndexMap<String, Value> =
            [("stringify".to_string(), builtin(Builtin::JsonStringify))]
                .into_iter()
                .collect();

        let globals = [
            ("console", Value::object(console)),
            ("setTimeout", builtin(Builtin::SetTimeout)),
            ("clearTimeout", builtin(Builtin::ClearTimeout)),
            ("queueMicrotask", builtin(Builtin::QueueMicrotask)),
            ("Promise", builtin(Builtin::PromiseConstructor)),
            ("Error", builtin(Builtin::ErrorConstructor)),
            ("Math", Value::object(math)),
            ("JSON", Value::object(json)),
            ("NaN", Value::Number(f64::NAN)),
            ("Infinity", Value::Number(f64::INFINITY)),
        ];
        for (name, value) in globals {
            self.scopes.declare_function(name, value);
        }
    }

    // ===== Hoisting =====

    /// Function-entry hoisting: every `var` in the body (nested blocks
    /// included, nested functions excluded) plus the body's own block-level
    /// declarations.
    pub(crate) fn hoist_function_declarations(&mut self, body: &[Stmt]) -> Result<(), RuntimeError> {
        let mut collector = VarCollector::default();
        for stmt in body {
            collector.visit_stmt(stmt);
        }
        for (name, location) in collector.names {
            self.scopes
                .declare_variable(&name, DeclKind::Var)
                .map_err(|err| RuntimeError::from_scope(err, location.line))?;
        }
        self.hoist_block_declarations(body)
    }

    /// Block-entry hoisting: `let`/`const` enter the temporal dead zone and
    /// function declarations are bound immediately.
    pub(crate) fn hoist_block_declarations(&mut self, body: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in body {
            match stmt {
                Stmt::VarDecl {
                    kind: kind @ (DeclKind::Let | DeclKind::Const),
                    declarations,
                    location,
                } => {
                    let line = self.line_at(*location);
                    for declarator in declarations {
                        self.scopes
                            .declare_variable(&declarator.name, *kind)
                            .map_err(|err| RuntimeError::from_scope(err, line))?;
                    }
                }
                Stmt::FunctionDecl { function, location } => {
                    let Some(name) = function.name.clone() else {
                        continue;
                    };
                    let closure =
                        self.scopes
                            .create_closure(function.clone(), Some(name.clone()), function.is_async);
                    self.scopes
                        .declare_function(&name, Value::function(Function::Closure(closure)));
                    let keyword = if function.is_async { "async function" } else { "function" };
                    let line = self.line_at(*location);
                    self.record(
                        StepKind::Declaration,
                        format!("hoist {} {}", keyword, name),
                        Some(line),
                    )?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ===== Event loop =====

    /// Drain microtasks to a fixed point, report unhandled rejections, run
    /// one task, repeat. Every dequeued callback counts against the
    /// iteration ceiling.
    fn run_event_loop(&mut self) -> Result<(), RuntimeError> {
        let limit = self.config.max_loop_iterations;
        let mut iterations = 0usize;

        loop {
            while let Some(job) = self.event_loop.next_microtask() {
                iterations += 1;
                if iterations > limit {
                    return Err(RuntimeError::EventLoopLimit { limit });
                }
                self.run_job(job)?;
            }
            self.report_unhandled_rejections()?;

            let Some(task) = self.event_loop.next_task() else {
                break;
            };
            iterations += 1;
            if iterations > limit {
                return Err(RuntimeError::EventLoopLimit { limit });
            }
            tracing::debug!(clock = self.event_loop.clock(), task = task.id, "clock advanced");
            self.run_job(task)?;
        }
        Ok(())
    }

    /// Run one dequeued callback with an empty call stack
    fn run_job(&mut self, job: ScheduledTask) -> Result<(), RuntimeError> {
        tracing::debug!(id = job.id, kind = ?job.kind, source = job.source.label(), label = %job.label, "dequeue");
        let kind = match job.kind {
            TaskKind::Task => "task",
            TaskKind::Microtask => "microtask",
        };
        self.record(
            StepKind::Dequeue,
            format!("dequeue {} #{} ({}): {}", kind, job.id, job.source.label(), job.label),
            None,
        )?;

        let line = self.current_line;
        match job.source {
            TaskSource::PromiseReaction | TaskSource::AsyncResume => {
                let argument = job.resolved_value.unwrap_or_default();
                let result = self.call_value(&job.callback, None, vec![argument], line);
                let derived = job.chained_promise;
                match (result, derived) {
                    (Ok(value), Some(derived)) => self.resolve_promise(&derived, value),
                    (Ok(_), None) => Ok(()),
                    (Err(Abrupt::Throw { value, .. }), Some(derived)) => {
                        self.reject_promise(&derived, value)
                    }
                    (Err(Abrupt::Throw { value, line }), None) => {
                        Err(RuntimeError::UncaughtException {
                            message: describe_thrown(&value),
                            line,
                        })
                    }
                    (Err(Abrupt::Fault(error)), _) => Err(error),
                }
            }
            TaskSource::SetTimeout | TaskSource::QueueMicrotask => {
                match self.call_value(&job.callback, None, job.arguments, line) {
                    Ok(_) => Ok(()),
                    Err(Abrupt::Throw { value, line }) => Err(RuntimeError::UncaughtException {
                        message: describe_thrown(&value),
                        line,
                    }),
                    Err(Abrupt::Fault(error)) => Err(error),
                }
            }
        }
    }
}

/// Collects `var` names for function-entry hoisting without descending into
/// nested functions.
#[derive(Default)]
struct VarCollector {
    names: Vec<(String, SourceLocation)>,
}

impl<'ast> Visitor<'ast> for VarCollector {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::VarDecl {
                kind: DeclKind::Var,
                declarations,
                location,
            }
            | Stmt::For {
                init:
                    Some(ForInit::VarDecl {
                        kind: DeclKind::Var,
                        declarations,
                    }),
                location,
                ..
            } => {
                for declarator in declarations {
                    self.names.push((declarator.name.clone(), *location));
                }
            }
            Stmt::ForEach {
                binding:
                    ForBinding {
                        kind: Some(DeclKind::Var),
                        name,
                    },
                location,
                ..
            } => self.names.push((name.clone(), *location)),
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, _expr: &'ast Expr) {}

    fn visit_function(&mut self, _function: &'ast FunctionNode) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> Result<Vec<ExecutionStep>, ExecutionFailure> {
        let (program, source_map) = parse(source).into_result().unwrap();
        interpret(&program, source_map, &InterpreterConfig::default())
    }

    fn console(steps: &[ExecutionStep]) -> Vec<String> {
        steps
            .last()
            .map(|step| step.state.console.iter().map(|entry| entry.text.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_var_collector_skips_nested_functions() {
        let (program, _) = parse(
            "var a = 1; if (a) { var b; } for (var i = 0; i < 1; i++) {} function f() { var hidden; }",
        )
        .into_result()
        .unwrap();
        let mut collector = VarCollector::default();
        for stmt in program.body.iter() {
            collector.visit_stmt(stmt);
        }
        let names: Vec<String> = collector.names.into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b", "i"]);
    }

    #[test]
    fn test_program_frames_and_bookends() {
        let steps = run("console.log('hi');").unwrap();

        assert_eq!(steps[0].kind, StepKind::ProgramStart);
        assert_eq!(steps[0].state.call_stack[0].function_name, GLOBAL_FRAME);
        assert_eq!(steps.last().map(|s| s.kind), Some(StepKind::ProgramEnd));
        assert!(steps.last().unwrap().state.call_stack.is_empty());
        assert_eq!(console(&steps), vec!["hi"]);
    }

    #[test]
    fn test_var_is_hoisted_as_undefined() {
        let steps = run("console.log(x); var x = 5; console.log(x);").unwrap();
        assert_eq!(console(&steps), vec!["undefined", "5"]);
    }

    #[test]
    fn test_function_declarations_are_hoisted() {
        let steps = run("greet(); function greet() { console.log('hello'); }").unwrap();
        assert_eq!(console(&steps), vec!["hello"]);
    }

    #[test]
    fn test_script_let_may_shadow_a_builtin() {
        let steps = run("let setTimeout = 3; console.log(setTimeout);").unwrap();
        assert_eq!(console(&steps), vec!["3"]);
    }

    #[test]
    fn test_uncaught_throw_aborts_with_terminal_step() {
        let failure = run("console.log('a');\nthrow new Error('boom');").unwrap_err();

        assert!(matches!(
            &failure.error,
            RuntimeError::UncaughtException { message, line: 2 } if message == "Error: boom"
        ));
        assert_eq!(failure.steps.last().map(|s| s.kind), Some(StepKind::Error));
        assert_eq!(console(&failure.steps), vec!["a"]);
    }
}
