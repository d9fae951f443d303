//! Argument lists for script commands, recognized by an embedded ATN grammar.
//!
//! ```text
//! (1, "two", mode=fast, points=[1, 2], ease=out(0.5))
//! ```
//!
//! The lexer and parser grammars are assembled with the runtime's
//! [`builder`](atn_runtime::builder) and loaded like any serialized grammar,
//! so parsing goes through the same DFA cache and adaptive prediction as a
//! grammar shipped as a blob.
//!
//! # Architecture
//!
//! - [`grammar`] -- Token and rule constants, lexer / parser definitions
//! - [`parser`] -- [`ArgListParser`]: text -> parse tree -> [`Arg`]s
//! - [`value`] -- [`Arg`], [`Value`] and their canonical text form

pub mod grammar;
pub mod parser;
pub mod value;

pub use parser::ArgListParser;
pub use value::{Arg, Value, format_args};

use atn_runtime::builder::BuildError;
use atn_runtime::{DecodeError, LexerError, ParseError};

/// Error type for argument-list parsing.
#[derive(Debug, thiserror::Error)]
pub enum ArgListError {
    #[error("failed to build the argument-list grammar: {0}")]
    Build(#[from] BuildError),
    #[error("failed to load the argument-list grammar: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Lex(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid number literal `{0}`")]
    InvalidNumber(String),
    #[error("invalid string literal {0}")]
    InvalidString(String),
    #[error("unexpected parse tree: {0}")]
    UnexpectedTree(String),
}
