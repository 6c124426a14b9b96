pub mod artifact;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod op;
pub mod stack_check;

pub use artifact::Artifact;
pub use op::Op;
