// Token source driven by a lexer ATN.

use atn_core::Token;
use atn_core::token::{DEFAULT_CHANNEL, EOF, INVALID_TYPE};

use crate::LexerError;
use crate::atn::Atn;
use crate::dfa::Dfa;
use crate::lexer_action::LexerCommands;
use crate::lexer_sim::{LexMatch, LexerAtnSimulator};
use crate::semantic::{AcceptAll, SemanticEvaluator};
use crate::stream::{CharStream, TokenSource};

/// Splits a character stream into tokens.
///
/// Commands attached to token rules (`skip`, `more`, `type`, `channel`,
/// `mode`, `pushMode`, `popMode`) are honored; custom actions and predicates
/// go to the [`SemanticEvaluator`]. After [`next_token`](TokenSource::next_token)
/// fails, [`recover`](Self::recover) drops one character so that lexing can
/// go on.
pub struct Lexer<'g, I> {
    atn: &'g Atn,
    input: I,
    sim: LexerAtnSimulator<'g>,
    commands: LexerCommands,
    evaluator: &'g dyn SemanticEvaluator,
    hit_eof: bool,
    token_start: usize,
    token_line: usize,
    token_column: usize,
}

impl<'g, I: CharStream> Lexer<'g, I> {
    /// `mode_dfas` holds one DFA per mode of `atn`.
    pub fn new(atn: &'g Atn, mode_dfas: &'g [Dfa], input: I) -> Self {
        Self {
            atn,
            input,
            sim: LexerAtnSimulator::new(atn, mode_dfas),
            commands: LexerCommands {
                token_type: INVALID_TYPE,
                channel: DEFAULT_CHANNEL,
                mode: 0,
                mode_stack: Vec::new(),
                skip: false,
                more: false,
            },
            evaluator: &AcceptAll,
            hit_eof: false,
            token_start: 0,
            token_line: 1,
            token_column: 0,
        }
    }

    pub fn with_evaluator(mut self, evaluator: &'g dyn SemanticEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn atn(&self) -> &'g Atn {
        self.atn
    }

    pub fn mode(&self) -> usize {
        self.commands.mode
    }

    pub fn set_mode(&mut self, mode: usize) {
        self.commands.mode = mode;
    }

    pub fn mode_stack(&self) -> &[usize] {
        &self.commands.mode_stack
    }

    pub fn line(&self) -> usize {
        self.sim.line
    }

    pub fn column(&self) -> usize {
        self.sim.column
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn into_input(self) -> I {
        self.input
    }

    /// Skip the character that stopped the last failed match.
    pub fn recover(&mut self) {
        if self.input.la(1) != EOF {
            self.sim.consume(&mut self.input);
        }
    }

    /// Every remaining token, ending with EOF. Stops at the first error.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let eof = token.is_eof();
            tokens.push(token);
            if eof {
                return Ok(tokens);
            }
        }
    }

    /// Like [`tokenize`](Self::tokenize), but recovers from each error and
    /// returns the errors alongside the tokens.
    pub fn tokenize_all(&mut self) -> (Vec<Token>, Vec<LexerError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        loop {
            match self.next_token() {
                Ok(token) => {
                    let eof = token.is_eof();
                    tokens.push(token);
                    if eof {
                        return (tokens, errors);
                    }
                }
                Err(e) => {
                    log::debug!("{e}");
                    errors.push(e);
                    self.recover();
                }
            }
        }
    }

    fn emit(&self, token_type: i32) -> Token {
        let stop = self.input.index().wrapping_sub(1);
        Token {
            token_type,
            channel: self.commands.channel,
            start: self.token_start,
            stop,
            text: self.input.text(self.token_start, stop),
            line: self.token_line,
            column: self.token_column,
            token_index: None,
        }
    }

    fn emit_eof(&self) -> Token {
        Token::eof(self.input.index(), self.sim.line, self.sim.column)
    }
}

impl<I: CharStream> TokenSource for Lexer<'_, I> {
    fn next_token(&mut self) -> Result<Token, LexerError> {
        'token: loop {
            if self.hit_eof {
                return Ok(self.emit_eof());
            }
            self.token_start = self.input.index();
            self.token_line = self.sim.line;
            self.token_column = self.sim.column;
            self.commands.channel = DEFAULT_CHANNEL;
            // `more` keeps the token start and matches again.
            loop {
                self.commands.token_type = INVALID_TYPE;
                self.commands.skip = false;
                self.commands.more = false;
                let mode = self.commands.mode;
                let matched = self.sim.match_token(&mut self.input, mode, self.evaluator)?;
                let (rule_index, actions) = match matched {
                    LexMatch::Eof => {
                        self.hit_eof = true;
                        return Ok(self.emit_eof());
                    }
                    LexMatch::Token {
                        rule_index,
                        actions,
                    } => (rule_index, actions),
                };
                if let Some(actions) = actions {
                    actions.execute(&mut self.commands, self.evaluator);
                }
                if self.input.la(1) == EOF {
                    self.hit_eof = true;
                }
                if self.commands.skip {
                    continue 'token;
                }
                if self.commands.more {
                    continue;
                }
                let token_type = if self.commands.token_type != INVALID_TYPE {
                    self.commands.token_type
                } else {
                    self.atn.rule_to_token_type[rule_index]
                };
                return Ok(self.emit(token_type));
            }
        }
    }

    fn source_name(&self) -> &str {
        self.input.source_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;
    use crate::lexer_action::LexerAction;
    use crate::stream::CodePointCharStream;
    use atn_core::token::HIDDEN_CHANNEL;

    fn mode_dfas(atn: &Atn) -> Vec<Dfa> {
        atn.mode_to_start_state
            .iter()
            .enumerate()
            .map(|(m, &s)| Dfa::new(m, s, false))
            .collect()
    }

    fn summary(tokens: &[Token]) -> Vec<(i32, String)> {
        tokens
            .iter()
            .map(|t| (t.token_type, t.text.clone()))
            .collect()
    }

    #[test]
    fn skip_and_eof() {
        let mut g = GrammarBuilder::lexer("l");
        let id = g.lexer_rule("ID", plus(range('a', 'z')));
        g.lexer_rule("WS", seq([plus(one_of(" \n")), skip()]));
        let atn = g.build_atn().unwrap();
        let dfas = mode_dfas(&atn);
        let mut lexer = Lexer::new(&atn, &dfas, CodePointCharStream::new("ab\n cd "));
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(
            summary(&tokens),
            vec![(id, "ab".into()), (id, "cd".into()), (EOF, String::new())]
        );
        assert_eq!((tokens[1].line, tokens[1].column), (2, 1));
        assert_eq!((tokens[1].start, tokens[1].stop), (4, 5));
        assert_eq!(tokens[2].start, 7);
        // EOF keeps coming.
        assert!(lexer.next_token().unwrap().is_eof());
    }

    #[test]
    fn modes_push_and_pop() {
        let mut g = GrammarBuilder::lexer("str");
        let id = g.lexer_rule("ID", plus(range('a', 'z')));
        let open = g.lexer_rule("OPEN", seq([chr('"'), push_mode(1)]));
        g.mode("STRING");
        let text = g.lexer_rule("TEXT", plus(none_of("\"")));
        let close = g.lexer_rule("CLOSE", seq([chr('"'), pop_mode()]));
        let atn = g.build_atn().unwrap();
        let dfas = mode_dfas(&atn);
        let mut lexer = Lexer::new(&atn, &dfas, CodePointCharStream::new("a\"b c\"d"));
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(
            summary(&tokens),
            vec![
                (id, "a".into()),
                (open, "\"".into()),
                (text, "b c".into()),
                (close, "\"".into()),
                (id, "d".into()),
                (EOF, String::new()),
            ]
        );
        assert_eq!(lexer.mode(), 0);
        assert!(lexer.mode_stack().is_empty());
    }

    #[test]
    fn more_extends_the_token() {
        let mut g = GrammarBuilder::lexer("m");
        g.lexer_rule("HASH", seq([chr('#'), more()]));
        let id = g.lexer_rule("ID", plus(range('a', 'z')));
        let atn = g.build_atn().unwrap();
        let dfas = mode_dfas(&atn);
        let mut lexer = Lexer::new(&atn, &dfas, CodePointCharStream::new("#ab"));
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].token_type, id);
        assert_eq!(tokens[0].text, "#ab");
        assert_eq!(tokens[0].start, 0);
    }

    #[test]
    fn channel_and_type_commands() {
        let mut g = GrammarBuilder::lexer("c");
        let kw = g.token("KW", None);
        g.lexer_rule("WS", seq([chr(' '), channel(HIDDEN_CHANNEL)]));
        g.lexer_rule(
            "ID",
            seq([plus(range('a', 'z')), chr('!'), command(LexerAction::Type(kw))]),
        );
        let atn = g.build_atn().unwrap();
        let dfas = mode_dfas(&atn);
        let mut lexer = Lexer::new(&atn, &dfas, CodePointCharStream::new(" go!"));
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].channel, HIDDEN_CHANNEL);
        assert_eq!(tokens[1].token_type, kw);
        assert_eq!(tokens[1].channel, DEFAULT_CHANNEL);
    }

    #[test]
    fn recover_skips_bad_input() {
        let mut g = GrammarBuilder::lexer("r");
        let id = g.lexer_rule("ID", plus(range('a', 'z')));
        let atn = g.build_atn().unwrap();
        let dfas = mode_dfas(&atn);
        let mut lexer = Lexer::new(&atn, &dfas, CodePointCharStream::new("ab%cd"));
        let (tokens, errors) = lexer.tokenize_all();
        assert_eq!(
            summary(&tokens),
            vec![(id, "ab".into()), (id, "cd".into()), (EOF, String::new())]
        );
        assert_eq!(
            errors,
            vec![LexerError::NoViableToken {
                index: 2,
                line: 1,
                column: 2,
                text: "%".into(),
            }]
        );
    }
}
