// loopscope: step-by-step JavaScript event-loop simulator

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use loopscope::{parse, ExecutionStep, InterpreterConfig, RuntimeError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

struct Options {
    file: String,
    config: InterpreterConfig,
    format: OutputFormat,
}

fn usage(program_name: &str) {
    eprintln!("Usage: {} <file.js> [options]", program_name);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --max-steps <n>            Maximum number of recorded steps");
    eprintln!("  --max-depth <n>            Maximum call stack depth");
    eprintln!("  --max-loop-iterations <n>  Maximum iterations per loop and event loop");
    eprintln!("  --config <file.json>       Read limits from a JSON file");
    eprintln!("  --format <text|json>       Output format (default: text)");
}

fn parse_limit(flag: &str, value: Option<&String>) -> Result<usize, String> {
    let value = value.ok_or_else(|| format!("{} requires a value", flag))?;
    match value.parse::<usize>() {
        Ok(0) | Err(_) => Err(format!("{} expects a positive integer, got '{}'", flag, value)),
        Ok(n) => Ok(n),
    }
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut file = None;
    let mut config_file = None;
    let mut max_steps = None;
    let mut max_depth = None;
    let mut max_loop_iterations = None;
    let mut format = OutputFormat::Text;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--max-steps" => max_steps = Some(parse_limit(arg, iter.next())?),
            "--max-depth" => max_depth = Some(parse_limit(arg, iter.next())?),
            "--max-loop-iterations" => max_loop_iterations = Some(parse_limit(arg, iter.next())?),
            "--config" => {
                config_file = Some(iter.next().ok_or("--config requires a file")?.clone());
            }
            "--format" => {
                format = match iter.next().map(String::as_str) {
                    Some("text") => OutputFormat::Text,
                    Some("json") => OutputFormat::Json,
                    other => return Err(format!("unknown format {:?}", other.unwrap_or(""))),
                }
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option '{}'", flag)),
            path if file.is_none() => file = Some(path.to_string()),
            extra => return Err(format!("unexpected argument '{}'", extra)),
        }
    }

    let file = file.ok_or("no input file provided")?;

    // Command-line limits override the config file
    let mut config = match config_file {
        Some(path) => {
            let text = fs::read_to_string(&path).map_err(|e| format!("cannot read '{}': {}", path, e))?;
            InterpreterConfig::from_json(&text).map_err(|e| e.to_string())?
        }
        None => InterpreterConfig::default(),
    };
    if let Some(n) = max_steps {
        config = config.with_max_steps(n);
    }
    if let Some(n) = max_depth {
        config = config.with_max_call_stack_depth(n);
    }
    if let Some(n) = max_loop_iterations {
        config = config.with_max_loop_iterations(n);
    }
    config.validate().map_err(|e| e.to_string())?;

    Ok(Options { file, config, format })
}

/// Logging goes to stderr and only when `RUST_LOG` is set
fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn render_step(step: &ExecutionStep) -> String {
    let line = step
        .line
        .map(|line| format!("L{}", line))
        .unwrap_or_else(|| "--".to_string());
    let stack: Vec<&str> = step
        .state
        .call_stack
        .iter()
        .map(|frame| frame.function_name.as_str())
        .collect();
    let tasks: Vec<String> = step
        .state
        .task_queue
        .iter()
        .map(|task| format!("#{}@{}", task.id, task.due_time))
        .collect();
    let microtasks: Vec<String> = step
        .state
        .microtask_queue
        .iter()
        .map(|task| format!("#{}", task.id))
        .collect();

    format!(
        "{:>4} {:>5} t={:<5} {:<40} stack=[{}] tasks=[{}] microtasks=[{}]",
        step.index,
        line,
        step.state.clock,
        step.description,
        stack.join(" > "),
        tasks.join(" "),
        microtasks.join(" ")
    )
}

fn print_steps(steps: &[ExecutionStep], format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Text => {
            for step in steps {
                println!("{}", render_step(step));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(steps)?),
    }
    Ok(())
}

fn print_error(error: &RuntimeError, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Text => eprintln!("Runtime error: {}", error),
        OutputFormat::Json => eprintln!("{}", serde_json::to_string(error)?),
    }
    Ok(())
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(String::as_str).unwrap_or("loopscope");

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!();
            usage(program_name);
            return Ok(ExitCode::from(1));
        }
    };

    if !Path::new(&options.file).exists() {
        eprintln!("Error: File '{}' not found", options.file);
        return Ok(ExitCode::from(1));
    }
    let source = fs::read_to_string(&options.file)?;

    let (program, source_map) = match parse(&source).into_result() {
        Ok(parsed) => parsed,
        Err(errors) => {
            for error in &errors {
                eprintln!("{}:{}:{}: {}", options.file, error.line, error.column, error.message);
            }
            return Ok(ExitCode::from(1));
        }
    };

    match loopscope::interpret(&program, source_map, &options.config) {
        Ok(steps) => {
            print_steps(&steps, options.format)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            print_steps(&failure.steps, options.format)?;
            print_error(&failure.error, options.format)?;
            Ok(ExitCode::from(2))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("loopscope")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_args_limits_and_format() {
        let options = parse_args(&args(&["demo.js", "--max-steps", "50", "--format", "json"])).unwrap();
        assert_eq!(options.file, "demo.js");
        assert_eq!(options.config.max_steps, 50);
        assert_eq!(options.config.max_call_stack_depth, InterpreterConfig::default().max_call_stack_depth);
        assert_eq!(options.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_args_rejects_bad_input() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["a.js", "--max-depth", "0"])).is_err());
        assert!(parse_args(&args(&["a.js", "--format", "xml"])).is_err());
        assert!(parse_args(&args(&["a.js", "b.js"])).is_err());
        assert!(parse_args(&args(&["a.js", "--max-depth", "100000"])).is_err());
    }
}
