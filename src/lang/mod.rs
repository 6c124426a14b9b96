//! # Language model
//!
//! Types shared by every stage after scanning: value types, the typed AST
//! produced by the parser, the program context (symbols, constant pools,
//! line labels) and runtime values.

pub mod node;
pub mod program;
pub mod types;
pub mod value;
