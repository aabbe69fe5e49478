use thiserror::Error;

/// Typed runtime errors. Every one of these is fatal to the run: the first
/// error aborts execution and the accumulated result/TAC buffers are
/// discarded, leaving only the message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Variable '{name}' not declared")]
    UndeclaredVariable { name: String },
    #[error("Function '{name}' is not defined")]
    UndefinedFunction { name: String },
    #[error("Function '{name}' expects {expected} arguments, got {found}")]
    FunctionArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    /// An expression could not be evaluated; the message carries the fully
    /// substituted expression text.
    #[error("Error evaluating expression: {expr}")]
    Expression { expr: String },
    #[error("Return outside of function")]
    ReturnOutsideFunction,
}
