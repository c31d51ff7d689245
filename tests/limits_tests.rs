// Runtime errors, parse rejections and execution ceilings

use loopscope::{
    simulate, ConfigError, ExecutionFailure, InterpreterConfig, RuntimeError, SimulationError, StepKind,
};
use pretty_assertions::assert_eq;

fn execution_failure(source: &str, config: &InterpreterConfig) -> ExecutionFailure {
    match simulate(source, config) {
        Err(SimulationError::Execution(failure)) => failure,
        Err(SimulationError::Parse(errors)) => panic!("unexpected parse errors: {:?}", errors),
        Err(SimulationError::Config(err)) => panic!("unexpected config error: {}", err),
        Ok(steps) => panic!("expected a failure, run finished with {} steps", steps.len()),
    }
}

fn error_of(source: &str) -> RuntimeError {
    execution_failure(source, &InterpreterConfig::default()).error
}

#[test]
fn test_const_reassignment() {
    assert_eq!(
        error_of("const x = 1;\nx = 2;"),
        RuntimeError::ConstReassignment {
            name: "x".to_string(),
            line: 2
        }
    );
}

#[test]
fn test_let_redeclaration_in_same_block() {
    assert_eq!(
        error_of("let a = 1;\nlet a = 2;"),
        RuntimeError::DuplicateDeclaration {
            name: "a".to_string(),
            line: 2
        }
    );
}

#[test]
fn test_temporal_dead_zone() {
    assert_eq!(
        error_of("console.log(x);\nlet x = 1;"),
        RuntimeError::TemporalDeadZoneAccess {
            name: "x".to_string(),
            line: 1
        }
    );
}

#[test]
fn test_undeclared_variable() {
    assert_eq!(
        error_of("let a = 1;\nconsole.log(missing);"),
        RuntimeError::UndeclaredVariable {
            name: "missing".to_string(),
            line: 2
        }
    );
}

#[test]
fn test_uncaught_throw_in_timer_callback_aborts() {
    let failure = execution_failure(
        "setTimeout(() => {\n  throw new Error('tick failed');\n}, 0);\nsetTimeout(() => console.log('never'), 0);",
        &InterpreterConfig::default(),
    );
    assert_eq!(
        failure.error,
        RuntimeError::UncaughtException {
            message: "Error: tick failed".to_string(),
            line: 2
        }
    );
    let last = failure.steps.last().unwrap();
    assert_eq!(last.kind, StepKind::Error);
    assert!(last.state.console.is_empty());
}

#[test]
fn test_infinite_loop_hits_iteration_ceiling() {
    let config = InterpreterConfig::default().with_max_loop_iterations(100);
    let failure = execution_failure("let n = 0;\nwhile (true) { n++; }", &config);
    assert_eq!(failure.error, RuntimeError::LoopLimitExceeded { limit: 100, line: 2 });
    assert_eq!(failure.steps.last().map(|s| s.kind), Some(StepKind::Error));
}

#[test]
fn test_self_scheduling_microtasks_hit_event_loop_ceiling() {
    let config = InterpreterConfig::default().with_max_loop_iterations(50);
    let failure = execution_failure("function again() { queueMicrotask(again); }\nagain();", &config);
    assert_eq!(failure.error, RuntimeError::EventLoopLimit { limit: 50 });
}

#[test]
fn test_step_ceiling_keeps_partial_trace() {
    let config = InterpreterConfig::default().with_max_steps(5);
    let failure = execution_failure(
        "let a = 1;\nlet b = 2;\nlet c = 3;\nlet d = 4;\nlet e = 5;\nlet f = 6;",
        &config,
    );
    assert_eq!(failure.error, RuntimeError::StepLimitExceeded { limit: 5 });
    assert_eq!(failure.steps.len(), 6);
    let last = failure.steps.last().unwrap();
    assert_eq!(last.kind, StepKind::Error);
    assert_eq!(last.index, 5);
}

#[test]
fn test_unsupported_constructs_are_parse_errors() {
    for source in [
        "class A {}",
        "import x from 'y';",
        "function* gen() { yield 1; }",
        "with (obj) { a = 1; }",
    ] {
        match simulate(source, &InterpreterConfig::default()) {
            Err(SimulationError::Parse(errors)) => {
                assert!(!errors.is_empty(), "no diagnostics for {}", source);
                assert_eq!(errors[0].line, 1);
            }
            other => panic!("{} was accepted: {:?}", source, other.map(|s| s.len())),
        }
    }
}

#[test]
fn test_syntax_error_reports_position() {
    match simulate("let ok = 1;\nlet = ;", &InterpreterConfig::default()) {
        Err(SimulationError::Parse(errors)) => assert_eq!(errors[0].line, 2),
        other => panic!("expected a syntax error, got {:?}", other.map(|s| s.len())),
    }
}

#[test]
fn test_engine_type_errors_are_not_catchable() {
    let failure = execution_failure(
        "try {\n  null.x;\n} catch (e) {\n  console.log('caught');\n}",
        &InterpreterConfig::default(),
    );
    assert_eq!(
        failure.error,
        RuntimeError::TypeError {
            message: "Cannot read properties of null (reading 'x')".to_string(),
            line: 2
        }
    );
    assert!(failure.steps.iter().all(|step| step.kind != StepKind::Console));
}

#[test]
fn test_huge_array_index_is_refused() {
    let error = error_of("const a = [];\na[1e15] = 1;\nconsole.log('unreachable');");
    match error {
        RuntimeError::TypeError { message, line } => {
            assert!(message.starts_with("Invalid array length"), "{}", message);
            assert_eq!(line, 2);
        }
        other => panic!("unexpected error {:?}", other),
    }

    let error = error_of("const b = [1, 2];\nb.length = 4294967295;");
    assert!(matches!(error, RuntimeError::TypeError { line: 2, .. }), "{:?}", error);
}

#[test]
fn test_self_containing_array_converts_to_string() {
    let steps = simulate(
        "const a = [1];\na.push(a);\nconsole.log('' + a, a.join('|'), `${a}`);",
        &InterpreterConfig::default(),
    )
    .unwrap();
    let output = &steps.last().unwrap().state.console;
    assert_eq!(output[0].text, "1, 1| 1,");
}

#[test]
fn test_unbounded_recursion_hits_call_depth_ceiling() {
    let failure = execution_failure(
        "function f() {\n  return f();\n}\nf();",
        &InterpreterConfig::default(),
    );
    assert!(
        matches!(failure.error, RuntimeError::CallStackOverflow { limit: 200, .. }),
        "{:?}",
        failure.error
    );
    assert_eq!(failure.steps.last().map(|s| s.kind), Some(StepKind::Error));
}

#[test]
fn test_deepest_accepted_call_depth_reports_overflow() {
    let config = InterpreterConfig::default()
        .with_max_call_stack_depth(1_000)
        .with_max_steps(100_000);
    let failure = execution_failure("function f(n) {\n  return f(n + 1) + 1;\n}\nf(0);", &config);
    assert!(
        matches!(failure.error, RuntimeError::CallStackOverflow { limit: 1_000, line: 2 }),
        "{:?}",
        failure.error
    );
}

#[test]
fn test_call_depth_above_maximum_is_a_config_error() {
    let config = InterpreterConfig::default().with_max_call_stack_depth(1_000_000);
    match simulate("console.log(1);", &config) {
        Err(SimulationError::Config(ConfigError::AboveMaximum { value, .. })) => {
            assert_eq!(value, 1_000_000)
        }
        other => panic!("expected a config error, got {:?}", other.map(|s| s.len())),
    }
}

#[test]
fn test_deeply_nested_source_is_a_parse_error() {
    let depth = 50_000;
    let source = format!("const x = {}1{};", "(".repeat(depth), ")".repeat(depth));
    match simulate(&source, &InterpreterConfig::default()) {
        Err(SimulationError::Parse(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].line, 1);
        }
        other => panic!("expected a parse error, got {:?}", other.map(|s| s.len())),
    }
}

#[test]
fn test_const_without_initializer_is_a_parse_error() {
    match simulate("const x;\nconsole.log(x);", &InterpreterConfig::default()) {
        Err(SimulationError::Parse(errors)) => {
            assert_eq!(errors[0].message, "Missing initializer in const declaration");
            assert_eq!(errors[0].line, 1);
        }
        other => panic!("expected a parse error, got {:?}", other.map(|s| s.len())),
    }
}
