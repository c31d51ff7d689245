use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::{Eval, RuntimeError};
use crate::parser::ast::{Expr, SwitchCase};
use crate::runtime::continuation::AwaitTarget;
use crate::runtime::scope::ScopeKind;
use crate::runtime::value::Value;

impl Interpreter {
    pub(crate) fn execute_return(&mut self, argument: Option<&Expr>, line: usize) -> Eval<()> {
        let value = match argument {
            Some(Expr::Await { argument, .. }) => {
                return self.begin_await(argument, AwaitTarget::Return, line);
            }
            Some(expr) => self.evaluate_expr(expr)?,
            None => Value::Undefined,
        };
        self.control_flow = ControlFlow::Return(value);
        Ok(())
    }

    /// `switch` with strict-equality case matching and fall-through. All
    /// case bodies share one block scope.
    pub(crate) fn execute_switch(
        &mut self,
        discriminant: &Expr,
        cases: &[SwitchCase],
        line: usize,
    ) -> Eval<()> {
        let value = self.evaluate_expr(discriminant)?;

        let mut match_index: Option<usize> = None;
        let mut default_index: Option<usize> = None;
        for (index, case) in cases.iter().enumerate() {
            match &case.test {
                Some(test) => {
                    if self.evaluate_expr(test)?.strict_equals(&value) {
                        match_index = Some(index);
                        break;
                    }
                }
                None => default_index = Some(index),
            }
        }
        let Some(start) = match_index.or(default_index) else {
            return Ok(());
        };

        let previous = self.scopes.current();
        self.scopes.enter_scope(ScopeKind::Block, None);
        let result = self.run_switch_cases(&cases[start..], cases, line);
        self.scopes.switch_to(previous);
        result
    }

    fn run_switch_cases(&mut self, from: &[SwitchCase], all: &[SwitchCase], line: usize) -> Eval<()> {
        for case in all {
            self.hoist_block_declarations(&case.body)?;
        }
        for case in from {
            for stmt in &case.body {
                self.execute_statement(stmt)?;
                match self.control_flow {
                    ControlFlow::Normal => {}
                    ControlFlow::Break => {
                        self.control_flow = ControlFlow::Normal;
                        return Ok(());
                    }
                    ControlFlow::Suspend(_) => {
                        return Err(RuntimeError::UnsupportedAwait {
                            context: "await inside a switch case".to_string(),
                            line,
                        }
                        .into())
                    }
                    ControlFlow::Continue | ControlFlow::Return(_) => return Ok(()),
                }
            }
        }
        Ok(())
    }
}
