//! Interpreter configuration
//!
//! The three resource ceilings are the whole configuration surface. They can
//! be built in code, read from JSON (`{"maxSteps": 500}`; missing fields keep
//! their defaults), or overridden from the command line.
//!
//! `max_call_stack_depth` may not exceed [`MAX_CALL_STACK_DEPTH_LIMIT`].

use crate::interpreter::constants::{
    DEFAULT_MAX_CALL_STACK_DEPTH, DEFAULT_MAX_LOOP_ITERATIONS, DEFAULT_MAX_STEPS,
    MAX_CALL_STACK_DEPTH_LIMIT,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct InterpreterConfig {
    pub max_steps: usize,
    pub max_call_stack_depth: usize,
    pub max_loop_iterations: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_steps: DEFAULT_MAX_STEPS,
            max_call_stack_depth: DEFAULT_MAX_CALL_STACK_DEPTH,
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },
    #[error("{field} must be at most {maximum}, got {value}")]
    AboveMaximum {
        field: &'static str,
        value: usize,
        maximum: usize,
    },
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl InterpreterConfig {
    /// Parse a (possibly partial) JSON configuration and validate it
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: InterpreterConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_call_stack_depth(mut self, depth: usize) -> Self {
        self.max_call_stack_depth = depth;
        self
    }

    pub fn with_max_loop_iterations(mut self, iterations: usize) -> Self {
        self.max_loop_iterations = iterations;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("maxSteps", self.max_steps),
            ("maxCallStackDepth", self.max_call_stack_depth),
            ("maxLoopIterations", self.max_loop_iterations),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(ConfigError::ZeroLimit { field });
            }
        }
        if self.max_call_stack_depth > MAX_CALL_STACK_DEPTH_LIMIT {
            return Err(ConfigError::AboveMaximum {
                field: "maxCallStackDepth",
                value: self.max_call_stack_depth,
                maximum: MAX_CALL_STACK_DEPTH_LIMIT,
            });
        }
        Ok(())
    }
}
