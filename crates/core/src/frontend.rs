//! Front end: source text -> token stream -> [`Program`].
//!
//! Each call builds fresh lexer and parser state, so backends that want an
//! independent tree just call [`parse_source`] again.

use crate::ast::Program;
use crate::error::CompileError;
use crate::lexer;
use crate::parser;

/// Tokenize and parse one source text.
pub fn parse_source(src: &str) -> Result<Program, CompileError> {
    let tokens = lexer::lex(src)?;
    let program = parser::parse(&tokens)?;
    tracing::info!(rules = program.rules.len(), "front end complete");
    Ok(program)
}
