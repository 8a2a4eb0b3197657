//! Parses shell input into statements.
pub mod ast;
mod lexer;
mod parser;

pub use lexer::{is_incomplete, Lexer, Token};
pub use parser::Parser;
