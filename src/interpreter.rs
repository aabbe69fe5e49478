use crate::ast::{Program, Statement};

mod error;
mod runtime;
mod trace;
mod value;

pub use error::RuntimeError;

use runtime::{ExecResult, InterpreterRuntime};

/// Registered function: ordered parameter names plus the parsed body.
#[derive(Debug, Clone)]
struct Function {
    params: Vec<String>,
    body: Vec<Statement>,
}

/// Tree-walking interpreter. Each `run` builds its environment, function
/// table, and trace buffers from scratch, so runs never contaminate each
/// other.
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, program: &Program) -> Result<RunOutput, RuntimeError> {
        let mut runtime = InterpreterRuntime::new();
        match runtime.exec_block(&program.statements)? {
            ExecResult::Continue => {}
            ExecResult::Return(_) => return Err(RuntimeError::ReturnOutsideFunction),
        }
        Ok(runtime.into_output())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Successful run artifact: the program's print output and the TAC trace,
/// both in emission order. A failed run produces neither — the error
/// message is all that surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub result: String,
    pub tac: String,
}

impl RunOutput {
    /// The user-visible two-part artifact: print output, a literal
    /// separator, then the trace.
    pub fn render(&self) -> String {
        format!("{}\n--- TAC ---\n{}", self.result, self.tac)
    }
}
