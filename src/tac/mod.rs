//! Three-address code: the instruction set both backends consume, the
//! lowering from the AST, a direct interpreter and a persisted image form.

pub mod image;
pub mod instr;
pub mod interp;
pub mod lower;

pub use instr::{Instr, Label, LibFunc, Operand, TacProgram};
pub use lower::lower_program;
