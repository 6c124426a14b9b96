use thiserror::Error;

use crate::error::InternalError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Internal compiler error (shouldn't happen for a program that parsed)
    #[error("compile error: {0}")]
    Internal(#[from] InternalError),

    /// A count or offset doesn't fit the artifact's 16-bit fields
    #[error("compile error: {what} exceeds the 16-bit limit of the bytecode format")]
    TooLarge { what: &'static str },
}

impl CompileError {
    /// Create an internal compiler error
    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(InternalError::new(msg))
    }

    pub fn too_large(what: &'static str) -> Self {
        CompileError::TooLarge { what }
    }
}
