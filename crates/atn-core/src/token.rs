// Token public API type and reserved token-type / channel constants.

// ---------------------------------------------------------------------------
// Reserved symbols
// ---------------------------------------------------------------------------

/// End of input. Used both as a token type and as the lookahead symbol
/// returned by a stream that has been fully consumed.
pub const EOF: i32 = -1;

/// Internal marker used by LL(1) analysis for "falls off the end of the rule".
/// Never appears in a token stream.
pub const EPSILON: i32 = -2;

/// Token type 0 is never assigned to a real token.
pub const INVALID_TYPE: i32 = 0;

/// First token type available to grammars.
pub const MIN_USER_TOKEN_TYPE: i32 = 1;

/// Largest code point a lexer automaton can match.
pub const MAX_CHAR_VALUE: i32 = 0x10_FFFF;

/// Channel the parser reads from.
pub const DEFAULT_CHANNEL: u32 = 0;

/// Conventional channel for whitespace and comments kept in the stream.
pub const HIDDEN_CHANNEL: u32 = 1;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A token produced by a lexer and consumed by the parser-side simulators.
///
/// `start` and `stop` are inclusive code-point offsets into the lexer input;
/// an EOF token has `stop == start - 1` (an empty span), matching how the
/// lexer reports zero-width matches.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    /// Token type (symbol id). `EOF` for the end-of-input token.
    pub token_type: i32,

    /// Channel the token was emitted on.
    pub channel: u32,

    /// Offset of the first code point of the token.
    pub start: usize,

    /// Offset of the last code point of the token (inclusive).
    /// For an empty token this is `start.wrapping_sub(1)`; use [`Token::len`].
    pub stop: usize,

    /// Matched text.
    pub text: String,

    /// 1-based line of the first character.
    pub line: usize,

    /// 0-based column (code points) of the first character.
    pub column: usize,

    /// Position of this token in its token stream, assigned when buffered.
    pub token_index: Option<usize>,
}

impl Token {
    /// Create a new token on the default channel.
    pub fn new(token_type: i32, text: impl Into<String>, start: usize) -> Self {
        let text = text.into();
        let len = text.chars().count();
        Self {
            token_type,
            channel: DEFAULT_CHANNEL,
            start,
            stop: (start + len).wrapping_sub(1),
            text,
            line: 1,
            column: start,
            token_index: None,
        }
    }

    /// Create the end-of-input token at the given offset.
    pub fn eof(start: usize, line: usize, column: usize) -> Self {
        Self {
            token_type: EOF,
            channel: DEFAULT_CHANNEL,
            start,
            stop: start.wrapping_sub(1),
            text: String::new(),
            line,
            column,
            token_index: None,
        }
    }

    /// Builder-style channel override.
    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = channel;
        self
    }

    /// Builder-style position override.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Whether this is the end-of-input token.
    pub fn is_eof(&self) -> bool {
        self.token_type == EOF
    }

    /// Number of code points covered by the token.
    pub fn len(&self) -> usize {
        self.stop.wrapping_add(1).wrapping_sub(self.start)
    }

    /// Whether the token covers no input.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::eof(0, 1, 0)
    }
}
