//! Command language module
//!
//! This module contains the lexer, parser and AST for the command language.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::Statement;
pub use parser::Parser;
