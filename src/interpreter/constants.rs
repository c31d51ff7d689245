// Default resource ceilings for the interpreter

/// Maximum number of recorded execution steps
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Maximum call-stack depth, counting the global frame
pub const DEFAULT_MAX_CALL_STACK_DEPTH: usize = 200;

/// Maximum iterations of a single loop instance, and of the event loop as a whole
pub const DEFAULT_MAX_LOOP_ITERATIONS: usize = 10_000;

/// Arrays longer than this are truncated with an ellipsis in console output
pub const CONSOLE_ARRAY_LIMIT: usize = 10;

/// Nesting depth beyond which console rendering stops descending
pub const CONSOLE_MAX_DEPTH: usize = 8;

/// Nested arrays deeper than this convert to an empty string
pub const STRING_MAX_DEPTH: usize = 256;

/// Largest array length a script may create by index or `length` writes
pub const MAX_ARRAY_LENGTH: usize = 1 << 20;

/// Upper bound accepted for `max_call_stack_depth`
pub const MAX_CALL_STACK_DEPTH_LIMIT: usize = 1_000;

/// Name of the root stack frame
pub const GLOBAL_FRAME: &str = "(global)";
