pub mod console;
pub mod runtime_error;
pub mod vm_bc;

pub use console::{BufferConsole, Console, StdConsole};
pub use runtime_error::RuntimeError;
pub use vm_bc::{VmBc, VmBcConfig};
