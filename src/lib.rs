//! # tacbasic
//!
//! A compiler for a small line-numbered BASIC dialect. Source is scanned and
//! parsed into a typed program, lowered to three-address code (TAC), then
//! handed to one of two backends: a compact bytecode format with its own
//! stack VM, or 32-bit x86 assembly text.
//!
//! ```text
//! source -> frontend -> lang::Program -> tac::TacProgram -> bytecode::Artifact -> runtime::VmBc
//!                                                          \-> asm (GAS / NASM text)
//! ```
//!
//! Both backends, and the TAC interpreter, print the same output for the
//! same program and input.

pub mod asm;
pub mod bytecode;
pub mod error;
pub mod frontend;
pub mod lang;
pub mod runtime;
pub mod tac;

pub use asm::{AsmConfig, AsmSyntax};
pub use bytecode::Artifact;
pub use error::{Error, InternalError, Result};
pub use runtime::{BufferConsole, Console, StdConsole, VmBcConfig};
pub use tac::TacProgram;

/// Source text to TAC.
pub fn compile_to_tac(source: &str) -> Result<TacProgram> {
    let program = frontend::parser::parse_program(source)?;
    Ok(tac::lower_program(&program)?)
}

/// Source text to a bytecode artifact.
pub fn compile_to_bytecode(source: &str) -> Result<Artifact> {
    let tac = compile_to_tac(source)?;
    Ok(bytecode::compile::compile_tac(&tac)?)
}

/// Source text to the serialized artifact bytes.
pub fn compile_to_bytes(source: &str) -> Result<Vec<u8>> {
    Ok(compile_to_bytecode(source)?.to_bytes()?)
}

/// Execute an artifact on the bytecode VM.
pub fn run_bytecode(artifact: &Artifact, console: &mut dyn Console, config: VmBcConfig) -> Result<()> {
    Ok(runtime::vm_bc::run_bytecode(artifact, console, config)?)
}

/// Execute TAC directly.
pub fn run_tac(program: &TacProgram, console: &mut dyn Console, config: VmBcConfig) -> Result<()> {
    Ok(tac::interp::run_tac(program, console, config)?)
}

/// Source text to assembly text.
pub fn compile_to_asm(source: &str, config: &AsmConfig) -> Result<String> {
    let tac = compile_to_tac(source)?;
    Ok(asm::compile_to_asm(&tac, config)?)
}
