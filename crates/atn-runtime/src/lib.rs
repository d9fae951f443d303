//! ATN (augmented transition network) runtime for embedded grammars.
//!
//! A grammar ships as a compact serialized ATN. This crate decodes it,
//! builds lookahead DFAs lazily while input is being recognized, and answers
//! "which alternative comes next" for parser decisions and "which token is
//! this" for lexer modes.
//!
//! # Architecture
//!
//! - [`format`] -- Binary header, word reader / writer
//! - [`state`], [`transition`], [`atn`] -- The immutable network
//! - [`deserialize`], [`serialize`] -- Blob <-> [`Atn`]
//! - [`builder`] -- Combinator front end that emits serialized grammars
//! - [`ll1`] -- LL(1) lookahead sets and expected-token computation
//! - [`context`], [`semantic`], [`alt_set`] -- Values carried by configurations
//! - [`config`], [`config_set`] -- ATN configurations and their sets
//! - [`dfa`] -- Lazily built, shared DFA cache
//! - [`prediction_mode`] -- SLL / LL termination and conflict analysis
//! - [`parser_sim`] -- Adaptive prediction for parser decisions
//! - [`lexer_action`], [`lexer_sim`], [`lexer`] -- Tokenization
//! - [`stream`] -- Character and token streams
//! - [`grammar`] -- Owns an [`Atn`] plus its DFA cache
//! - [`interpreter`] -- Drives a parser ATN into a parse tree

pub mod alt_set;
pub mod atn;
pub mod builder;
pub mod config;
pub mod config_set;
pub mod context;
pub mod deserialize;
pub mod dfa;
pub mod format;
pub mod grammar;
pub mod interpreter;
pub mod lexer;
pub mod lexer_action;
pub mod lexer_sim;
pub mod ll1;
pub mod parser_sim;
pub mod prediction_mode;
pub mod semantic;
pub mod serialize;
pub mod state;
pub mod stream;
pub mod transition;

pub use atn::{Atn, GrammarType};
pub use atn_core::IntervalSet;
pub use grammar::{CacheStats, Grammar, PredictionOptions};
pub use interpreter::{ParseTree, ParserInterpreter, RuleNode};
pub use lexer::Lexer;
pub use parser_sim::{AmbiguityReport, NoViableAlternative, Prediction};
pub use prediction_mode::PredictionMode;
pub use semantic::{AcceptAll, SemanticContext, SemanticEvaluator};
pub use state::StateId;

/// Error type for decoding a serialized ATN.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid magic number in ATN header")]
    InvalidMagic,
    #[error("data too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("header declares {declared} payload bytes but {actual} follow")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("unsupported serialization version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },
    #[error("unexpected end of data at word {offset}")]
    UnexpectedEnd { offset: usize },
    #[error("{words} trailing words after the last section")]
    TrailingData { words: usize },
    #[error("unknown grammar type {0}")]
    UnknownGrammarType(u16),
    #[error("state {state}: unknown state kind {kind}")]
    UnknownStateKind { state: usize, kind: u16 },
    #[error("edge {edge}: unknown transition kind {kind}")]
    UnknownTransitionKind { edge: usize, kind: u16 },
    #[error("lexer action {index}: unknown action kind {kind}")]
    UnknownLexerAction { index: usize, kind: u16 },
    #[error("state index {index} out of bounds ({count} states)")]
    StateOutOfBounds { index: usize, count: usize },
    #[error("{what} index {index} out of bounds ({count} entries)")]
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        count: usize,
    },
    #[error("invalid name table entry: {0}")]
    InvalidName(String),
    #[error("malformed ATN: {0}")]
    Malformed(String),
    #[error("grammar type mismatch: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        expected: GrammarType,
        actual: GrammarType,
    },
}

/// Error type for encoding an ATN as a blob.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("string of {0} UTF-16 units is longer than the 65534 a blob can hold")]
    StringTooLong(usize),
}

/// Error type for a single parser prediction.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    /// A lookahead symbol outside `EOF` and `0..=max_token_type`. Raised before
    /// anything is added to the DFA cache.
    #[error(
        "invalid symbol {symbol} at input index {index} in decision {decision} \
         (max token type {max_token_type})"
    )]
    InvalidSymbol {
        symbol: i32,
        index: usize,
        decision: usize,
        max_token_type: i32,
    },
    #[error(
        "no viable alternative in decision {} at input index {}",
        .0.decision,
        .0.offending_index
    )]
    NoViableAlt(Box<NoViableAlternative>),
    #[error("decision {decision} does not exist ({count} decisions)")]
    UnknownDecision { decision: usize, count: usize },
}

/// Error type for tokenization.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LexerError {
    /// No token rule matches the input at `index`. `text` runs from the
    /// token start through the first character that could not be matched.
    #[error("{line}:{column}: token recognition error at: '{text}'")]
    NoViableToken {
        index: usize,
        line: usize,
        column: usize,
        text: String,
    },
    #[error("lexer mode {mode} does not exist ({count} modes)")]
    UnknownMode { mode: usize, count: usize },
    #[error("expected a lexer grammar")]
    NotALexer,
}

/// Error type for the parser interpreter. Parsing stops at the first error.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{line}:{column}: mismatched input '{found}' expecting {expected_names}")]
    MismatchedToken {
        index: usize,
        line: usize,
        column: usize,
        found: String,
        expected: IntervalSet,
        expected_names: String,
    },
    #[error("{line}:{column}: rule {rule} failed predicate {predicate}")]
    FailedPredicate {
        rule: String,
        predicate: String,
        index: usize,
        line: usize,
        column: usize,
    },
    #[error(transparent)]
    Prediction(#[from] PredictionError),
    #[error("unknown rule `{0}`")]
    UnknownRule(String),
    #[error("expected a parser grammar")]
    NotAParser,
}

/// Version word expected at the start of the payload.
pub const SERIALIZED_VERSION: u16 = 4;

/// Word used for "none" in optional 16-bit fields (rule index, action index,
/// lexer token type EOF).
pub const NONE_WORD: u16 = 0xFFFF;
