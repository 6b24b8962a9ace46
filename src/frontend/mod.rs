//! Frontend module - Lexer, Parser, Semantic Analysis

pub mod lexicon;
pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
mod parser_expr;
mod parser_message;
pub mod grammar;
pub mod semantic;

pub use parser_message::field_specified;
