//! Shared leaf types for the ATN runtime.
//!
//! - [`token`] -- `Token` and the reserved token-type / channel constants
//! - [`interval`] -- `IntervalSet`, the label type of set transitions
//! - [`vocabulary`] -- token type to name mapping used in diagnostics

pub mod interval;
pub mod token;
pub mod vocabulary;

pub use interval::{Interval, IntervalSet};
pub use token::Token;
pub use vocabulary::{Vocabulary, VocabularyError};
