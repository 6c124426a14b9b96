//! Native backend: TAC to 32-bit x86 assembly text.
//!
//! The output links against a small C runtime (`print_int`, `print_str`,
//! `input_int`, `input_str`, `concat_str`, `eq_str`) that is not part of
//! this crate.

use thiserror::Error;

use crate::error::InternalError;

pub mod codegen;
pub mod emitter;

pub use codegen::compile_to_asm;
pub use emitter::{AsmConfig, AsmSyntax};

#[derive(Debug, Error)]
pub enum AsmError {
    #[error("assembly error: {0}")]
    Internal(#[from] InternalError),
    #[error("assembly error: failed to format output")]
    Fmt(#[from] std::fmt::Error),
}
