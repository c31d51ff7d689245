// Integration tests for the event-loop simulator

use loopscope::{simulate, ExecutionStep, InterpreterConfig, StepKind};
use pretty_assertions::assert_eq;

fn run(source: &str) -> Vec<ExecutionStep> {
    simulate(source, &InterpreterConfig::default()).expect("simulation failed")
}

fn console(source: &str) -> Vec<String> {
    run(source)
        .last()
        .map(|step| step.state.console.iter().map(|entry| entry.text.clone()).collect())
        .unwrap_or_default()
}

#[test]
fn test_sync_then_microtasks_then_tasks() {
    let source = r#"
        console.log('a');
        setTimeout(() => console.log('b'), 0);
        Promise.resolve().then(() => console.log('c'));
        console.log('d');
    "#;
    assert_eq!(console(source), vec!["a", "d", "c", "b"]);
}

#[test]
fn test_microtasks_drain_to_fixed_point_before_next_task() {
    let source = r#"
        setTimeout(() => console.log('timeout'), 0);
        Promise.resolve()
            .then(() => console.log('m1'))
            .then(() => console.log('m2'));
        queueMicrotask(() => console.log('q'));
    "#;
    assert_eq!(console(source), vec!["m1", "q", "m2", "timeout"]);
}

#[test]
fn test_microtasks_queued_by_a_task_run_before_the_next_task() {
    let source = r#"
        setTimeout(() => {
            console.log('t1');
            Promise.resolve().then(() => console.log('t1 micro'));
        }, 0);
        setTimeout(() => console.log('t2'), 0);
    "#;
    assert_eq!(console(source), vec!["t1", "t1 micro", "t2"]);
}

#[test]
fn test_timers_run_in_due_order_and_advance_clock() {
    let source = r#"
        setTimeout(() => console.log('slow'), 100);
        setTimeout(() => console.log('fast'), 50);
        setTimeout(() => console.log('also fast'), 50);
    "#;
    let steps = run(source);
    let output: Vec<&str> = steps
        .last()
        .unwrap()
        .state
        .console
        .iter()
        .map(|entry| entry.text.as_str())
        .collect();
    assert_eq!(output, vec!["fast", "also fast", "slow"]);
    assert_eq!(steps.last().unwrap().state.clock, 100);
}

#[test]
fn test_promise_all_keeps_input_order() {
    let source = r#"
        const slow = new Promise(resolve => setTimeout(() => resolve('slow'), 20));
        const fast = new Promise(resolve => setTimeout(() => resolve('fast'), 5));
        Promise.all([slow, fast, 42]).then(values => console.log(values));
    "#;
    assert_eq!(console(source), vec![r#"["slow", "fast", 42]"#]);
}

#[test]
fn test_promise_race_settles_through_a_microtask() {
    let source = r#"
        const pending = new Promise(() => {});
        Promise.race([Promise.resolve('winner'), pending]).then(v => console.log('race', v));
        Promise.resolve().then(() => console.log('tick'));
    "#;
    assert_eq!(console(source), vec!["tick", "race winner"]);
}

#[test]
fn test_returning_a_promise_from_then_adopts_it() {
    let source = r#"
        Promise.resolve()
            .then(() => Promise.resolve('inner'))
            .then(v => console.log(v));
    "#;
    assert_eq!(console(source), vec!["inner"]);
}

#[test]
fn test_async_await_interleaving() {
    let source = r#"
        async function worker(name, delay) {
            console.log(name, 'start');
            await new Promise(resolve => setTimeout(resolve, delay));
            console.log(name, 'done');
            return name;
        }
        Promise.all([worker('a', 30), worker('b', 10)]).then(names => console.log(names.join('+')));
        console.log('sync end');
    "#;
    assert_eq!(
        console(source),
        vec!["a start", "b start", "sync end", "b done", "a done", "a+b"]
    );
}

#[test]
fn test_block_scoping_and_closures_in_loops() {
    let source = r#"
        for (let i = 0; i < 3; i++) {
            setTimeout(() => console.log(i), 0);
        }
        var total = 0;
        for (const n of [1, 2, 3]) { total += n; }
        console.log('total', total);
    "#;
    assert_eq!(console(source), vec!["total 6", "0", "1", "2"]);
}

#[test]
fn test_step_trace_shape() {
    let steps = run("console.log('x');\nsetTimeout(() => {}, 0);");

    for (position, step) in steps.iter().enumerate() {
        assert_eq!(step.index, position);
    }
    assert_eq!(steps.first().map(|s| s.kind), Some(StepKind::ProgramStart));
    assert_eq!(steps.last().map(|s| s.kind), Some(StepKind::ProgramEnd));

    let script_end = steps.iter().find(|s| s.kind == StepKind::ScriptEnd).unwrap();
    assert!(script_end.state.call_stack.is_empty());
    assert_eq!(script_end.state.task_queue.len(), 1);

    let console_step = steps.iter().find(|s| s.kind == StepKind::Console).unwrap();
    assert_eq!(console_step.line, Some(1));
    assert_eq!(console_step.state.console.len(), 1);

    let ending = steps.last().unwrap();
    assert!(ending.state.task_queue.is_empty());
    assert!(ending.state.microtask_queue.is_empty());
}

#[test]
fn test_steps_serialize_with_camel_case_fields() {
    let steps = run("console.log(1);");
    let json = serde_json::to_value(&steps[0]).unwrap();
    assert_eq!(json["kind"], "programStart");
    assert!(json["callStack"].is_array());
    assert!(json["microtaskQueue"].is_array());
    assert_eq!(json["clock"], 0);
}

#[test]
fn test_runs_do_not_share_state() {
    assert_eq!(console("var leaked = 1; console.log(leaked);"), vec!["1"]);
    assert_eq!(console("console.log(typeof leaked);"), vec!["undefined"]);
}

#[test]
fn test_unhandled_rejection_is_reported_without_aborting() {
    let source = r#"
        Promise.reject(new Error('lost'));
        setTimeout(() => console.log('still running'), 0);
    "#;
    let steps = run(source);
    assert_eq!(
        steps.iter().filter(|s| s.kind == StepKind::UnhandledRejection).count(),
        1
    );
    let output: Vec<&str> = steps
        .last()
        .unwrap()
        .state
        .console
        .iter()
        .map(|entry| entry.text.as_str())
        .collect();
    assert_eq!(output, vec!["Uncaught (in promise) Error: lost", "still running"]);
}
