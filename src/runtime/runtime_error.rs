use thiserror::Error;

use crate::error::InternalError;

/// Failures while executing a program, in either the bytecode VM or the TAC
/// interpreter.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime error: division by zero at {at}")]
    DivisionByZero { at: usize },

    #[error("runtime error: input exhausted")]
    InputExhausted,

    #[error("runtime error: step limit of {0} exceeded")]
    StepLimit(usize),

    #[error("runtime error: stack overflow (limit {0})")]
    StackOverflow(usize),

    #[error("runtime error: i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl RuntimeError {
    pub fn internal(message: impl Into<String>) -> Self {
        RuntimeError::Internal(InternalError::new(message))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, RuntimeError::Internal(_))
    }
}
