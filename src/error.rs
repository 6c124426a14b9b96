use thiserror::Error;

use crate::asm::AsmError;
use crate::bytecode::artifact::ArtifactError;
use crate::bytecode::compile_error::CompileError;
use crate::frontend::parser_error::ParserError;
use crate::runtime::runtime_error::RuntimeError;
use crate::tac::image::ImageError;

/// A compiler defect: something a well-formed program can never trigger.
///
/// Raised instead of panicking when an invariant between pipeline stages
/// breaks (an unresolved label, a stack discipline violation, an unknown
/// opcode).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    pub fn new(message: impl Into<String>) -> Self {
        InternalError {
            message: message.into(),
        }
    }
}

/// Every failure the pipeline can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] ParserError),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Asm(#[from] AsmError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Bad command-line input, such as a file with the wrong extension.
    #[error("{0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
