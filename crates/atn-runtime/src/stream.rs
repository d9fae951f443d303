// Input streams: code points for lexers, tokens for parsers.

use atn_core::Token;
use atn_core::token::{DEFAULT_CHANNEL, EOF};

use crate::LexerError;

/// A seekable stream of integer symbols.
///
/// `la(1)` is the current symbol, `la(2)` the one after it and `la(-1)` the
/// one before. Past the end every lookahead yields [`EOF`].
pub trait IntStream {
    fn consume(&mut self);

    fn la(&mut self, offset: isize) -> i32;

    /// Pin the buffer so that positions from here on stay seekable. Returns
    /// a marker to hand back to [`release`](Self::release).
    fn mark(&mut self) -> isize;

    fn release(&mut self, marker: isize);

    /// Index of the current symbol.
    fn index(&self) -> usize;

    fn seek(&mut self, index: usize);

    /// Total number of symbols, if known.
    fn size(&self) -> Option<usize>;

    fn source_name(&self) -> &str {
        "<unknown>"
    }
}

/// A stream of Unicode code points.
pub trait CharStream: IntStream {
    /// Text of the code points `start..=stop`.
    fn text(&self, start: usize, stop: usize) -> String;
}

/// Produces tokens until an EOF token.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Token, LexerError>;

    fn source_name(&self) -> &str {
        "<unknown>"
    }
}

/// A stream of tokens. Symbols are token types.
pub trait TokenStream: IntStream {
    /// Token at lookahead `offset` (`1` = current).
    fn lt(&mut self, offset: isize) -> Option<&Token>;

    /// Buffered token by index.
    fn get(&self, index: usize) -> Option<&Token>;

    /// Concatenated text of the tokens `start..=stop`.
    fn text_range(&self, start: usize, stop: usize) -> String;
}

/// A fully buffered string, indexed by code point.
#[derive(Debug, Clone)]
pub struct CodePointCharStream {
    data: Vec<char>,
    pos: usize,
    name: String,
}

impl CodePointCharStream {
    pub fn new(text: &str) -> Self {
        Self::with_name(text, "<string>")
    }

    pub fn with_name(text: &str, name: &str) -> Self {
        Self {
            data: text.chars().collect(),
            pos: 0,
            name: name.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl IntStream for CodePointCharStream {
    fn consume(&mut self) {
        if self.pos < self.data.len() {
            self.pos += 1;
        }
    }

    fn la(&mut self, offset: isize) -> i32 {
        let i = match offset {
            0 => return 0,
            o if o > 0 => self.pos as isize + o - 1,
            o => self.pos as isize + o,
        };
        if i < 0 {
            return 0;
        }
        self.data.get(i as usize).map_or(EOF, |&c| c as i32)
    }

    fn mark(&mut self) -> isize {
        -1
    }

    fn release(&mut self, _marker: isize) {}

    fn index(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, index: usize) {
        self.pos = index.min(self.data.len());
    }

    fn size(&self) -> Option<usize> {
        Some(self.data.len())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

impl CharStream for CodePointCharStream {
    fn text(&self, start: usize, stop: usize) -> String {
        if start > stop || start >= self.data.len() {
            return String::new();
        }
        let stop = stop.min(self.data.len() - 1);
        self.data[start..=stop].iter().collect()
    }
}

/// Replays a list of tokens, appending an EOF token if the list lacks one.
#[derive(Debug, Clone)]
pub struct ListTokenSource {
    tokens: Vec<Token>,
    pos: usize,
}

impl ListTokenSource {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| !t.is_eof()) {
            let (start, line, column) = tokens.last().map_or((0, 1, 0), |t| {
                (t.stop.wrapping_add(1), t.line, t.column + t.len())
            });
            tokens.push(Token::eof(start, line, column));
        }
        Self { tokens, pos: 0 }
    }

    /// Tokens of the given types, each with its symbol number as text.
    pub fn from_types(types: &[i32]) -> Self {
        let tokens = types
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                if t == EOF {
                    Token::eof(i, 1, i)
                } else {
                    Token::new(t, t.to_string(), i)
                }
            })
            .collect();
        Self::new(tokens)
    }
}

impl TokenSource for ListTokenSource {
    fn next_token(&mut self) -> Result<Token, LexerError> {
        let i = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        Ok(self.tokens[i].clone())
    }
}

/// Buffers the on-channel tokens of a [`TokenSource`], fetching lazily as
/// lookahead demands.
///
/// A lexer error ends the stream: it is recorded, an EOF token takes the
/// failing token's place, and [`take_error`](Self::take_error) hands the
/// error to the caller.
#[derive(Debug)]
pub struct CommonTokenStream<S> {
    source: S,
    tokens: Vec<Token>,
    pos: usize,
    channel: u32,
    fetched_eof: bool,
    error: Option<LexerError>,
}

impl<S: TokenSource> CommonTokenStream<S> {
    pub fn new(source: S) -> Self {
        Self::with_channel(source, DEFAULT_CHANNEL)
    }

    /// Stream that keeps only tokens on `channel`.
    pub fn with_channel(source: S, channel: u32) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            pos: 0,
            channel,
            fetched_eof: false,
            error: None,
        }
    }

    /// Make sure token `i` is buffered, unless the stream ends first.
    fn sync(&mut self, i: usize) {
        while self.tokens.len() <= i && !self.fetched_eof {
            let mut token = match self.source.next_token() {
                Ok(t) => t,
                Err(e) => {
                    let (start, line, column) = self.tokens.last().map_or((0, 1, 0), |t| {
                        (t.stop.wrapping_add(1), t.line, t.column + t.len())
                    });
                    log::debug!("token stream ended by lexer error: {e}");
                    self.error = Some(e);
                    Token::eof(start, line, column)
                }
            };
            if token.is_eof() {
                self.fetched_eof = true;
            } else if token.channel != self.channel {
                continue;
            }
            token.token_index = Some(self.tokens.len());
            self.tokens.push(token);
        }
    }

    /// Buffer everything up to EOF.
    pub fn fill(&mut self) {
        while !self.fetched_eof {
            let n = self.tokens.len();
            self.sync(n);
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The lexer error that ended the stream, if any.
    pub fn take_error(&mut self) -> Option<LexerError> {
        self.error.take()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }
}

impl<S: TokenSource> IntStream for CommonTokenStream<S> {
    fn consume(&mut self) {
        self.sync(self.pos);
        if self.tokens.get(self.pos).is_some_and(|t| !t.is_eof()) {
            self.pos += 1;
        }
    }

    fn la(&mut self, offset: isize) -> i32 {
        self.lt(offset).map_or(EOF, |t| t.token_type)
    }

    fn mark(&mut self) -> isize {
        0
    }

    fn release(&mut self, _marker: isize) {}

    fn index(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, index: usize) {
        self.sync(index);
        self.pos = index.min(self.tokens.len().saturating_sub(1));
    }

    fn size(&self) -> Option<usize> {
        self.fetched_eof.then_some(self.tokens.len())
    }

    fn source_name(&self) -> &str {
        self.source.source_name()
    }
}

impl<S: TokenSource> TokenStream for CommonTokenStream<S> {
    fn lt(&mut self, offset: isize) -> Option<&Token> {
        let i = match offset {
            0 => return None,
            o if o > 0 => self.pos + (o as usize) - 1,
            o => self.pos.checked_sub(o.unsigned_abs())?,
        };
        self.sync(i);
        // Past the end, every lookahead is the EOF token.
        self.tokens.get(i).or_else(|| self.tokens.last())
    }

    fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    fn text_range(&self, start: usize, stop: usize) -> String {
        self.tokens
            .iter()
            .skip(start)
            .take(stop.saturating_add(1).saturating_sub(start))
            .filter(|t| !t.is_eof())
            .map(|t| t.text.as_str())
            .collect()
    }
}
