#![allow(clippy::result_large_err)]
//! causal-core: front end of the causal-mapping compiler.
//!
//! Turns rule source text into an immutable [`Program`] that both code
//! generation backends walk.
//!
//! # Public API
//!
//! - [`parse_source()`] -- tokenize and parse in one step
//! - [`lexer::lex()`] / [`parser::parse()`] -- the two stages separately
//! - [`CompileError`] -- every compile-time failure
//! - AST types: [`Program`], [`Rule`], [`Act`], [`Expr`], [`Guard`],
//!   [`GuardUnit`], and the normalized [`Condition`]

pub mod ast;
pub mod error;
pub mod frontend;
pub mod lexer;
pub mod normalize;
pub mod parser;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::{Act, Causation, CmpOp, Expr, Guard, GuardUnit, Program, Rule};
pub use error::CompileError;
pub use frontend::parse_source;
pub use normalize::Condition;
