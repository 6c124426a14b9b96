//! # Frontend
//!
//! Scanner, parser and the CLI token dump. Parsing builds the program
//! context and checks types as it goes; the first error stops it.

pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod token;
pub mod token_dumper;
