// Grammar: one decoded ATN plus the DFA cache that grows over it.

use atn_core::Vocabulary;

use crate::atn::{Atn, GrammarType};
use crate::deserialize::deserialize;
use crate::dfa::Dfa;
use crate::interpreter::ParserInterpreter;
use crate::lexer::Lexer;
use crate::parser_sim::{ParserAtnSimulator, Prediction};
use crate::prediction_mode::PredictionMode;
use crate::semantic::SemanticEvaluator;
use crate::state::StateId;
use crate::stream::{CharStream, IntStream};
use crate::{DecodeError, LexerError, PredictionError};

/// Knobs for parser prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictionOptions {
    pub mode: PredictionMode,
    /// Attach an [`AmbiguityReport`](crate::AmbiguityReport) to predictions
    /// that chose among several viable alternatives.
    pub report_ambiguities: bool,
}

/// Size of the DFA cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CacheStats {
    pub dfas: usize,
    pub states: usize,
    pub edges: usize,
}

/// A loaded grammar and its prediction cache.
///
/// Parser grammars get one DFA per decision, lexer grammars one per mode.
/// The ATN never changes after loading. DFAs only grow, under their own
/// locks, so one `Grammar` can serve any number of threads through `&self`.
/// Dropping the grammar (or [`clear_dfa_cache`](Self::clear_dfa_cache)) is
/// the only way to release cached states.
#[derive(Debug)]
pub struct Grammar {
    atn: Atn,
    dfas: Vec<Dfa>,
    options: PredictionOptions,
}

impl Grammar {
    pub fn new(atn: Atn) -> Self {
        let dfas = Self::empty_dfas(&atn);
        Self {
            atn,
            dfas,
            options: PredictionOptions::default(),
        }
    }

    /// Decode a serialized grammar of either type.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::new(deserialize(data)?))
    }

    /// Decode a serialized parser grammar.
    pub fn parser_from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        Self::typed_from_bytes(data, GrammarType::Parser)
    }

    /// Decode a serialized lexer grammar.
    pub fn lexer_from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        Self::typed_from_bytes(data, GrammarType::Lexer)
    }

    fn typed_from_bytes(data: &[u8], expected: GrammarType) -> Result<Self, DecodeError> {
        let atn = deserialize(data)?;
        if atn.grammar_type != expected {
            return Err(DecodeError::TypeMismatch {
                expected,
                actual: atn.grammar_type,
            });
        }
        Ok(Self::new(atn))
    }

    fn empty_dfas(atn: &Atn) -> Vec<Dfa> {
        if atn.is_lexer() {
            atn.mode_to_start_state
                .iter()
                .enumerate()
                .map(|(mode, &s)| Dfa::new(mode, s, false))
                .collect()
        } else {
            (0..atn.num_decisions())
                .map(|d| Dfa::for_decision(atn, d))
                .collect()
        }
    }

    pub fn atn(&self) -> &Atn {
        &self.atn
    }

    pub fn grammar_type(&self) -> GrammarType {
        self.atn.grammar_type
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.atn.vocabulary
    }

    pub fn rule_names(&self) -> &[String] {
        &self.atn.rule_names
    }

    /// DFAs by decision (parser) or mode (lexer).
    pub fn dfas(&self) -> &[Dfa] {
        &self.dfas
    }

    pub fn options(&self) -> PredictionOptions {
        self.options
    }

    /// Switch the prediction mode. DFAs built under another mode are not
    /// valid for this one, so a change empties the cache.
    pub fn set_prediction_mode(&mut self, mode: PredictionMode) {
        if self.options.mode != mode {
            self.options.mode = mode;
            self.clear_dfa_cache();
        }
    }

    pub fn set_report_ambiguities(&mut self, value: bool) {
        self.options.report_ambiguities = value;
    }

    /// Prediction over this grammar's cache with the current options.
    pub fn simulator(&self) -> ParserAtnSimulator<'_> {
        ParserAtnSimulator::new(&self.atn, self.parser_dfas(), self.options)
    }

    /// Lexer grammars have no parser decisions.
    fn parser_dfas(&self) -> &[Dfa] {
        if self.atn.is_lexer() { &[] } else { &self.dfas }
    }

    /// See [`ParserAtnSimulator::adaptive_predict`].
    pub fn adaptive_predict<S: IntStream + ?Sized>(
        &self,
        input: &mut S,
        decision: usize,
        invoking_states: &[StateId],
        evaluator: &dyn SemanticEvaluator,
    ) -> Result<Prediction, PredictionError> {
        self.simulator()
            .adaptive_predict(input, decision, invoking_states, evaluator)
    }

    /// Tokenizer over `input`. Fails for parser grammars.
    pub fn lexer<I: CharStream>(&self, input: I) -> Result<Lexer<'_, I>, LexerError> {
        if !self.atn.is_lexer() {
            return Err(LexerError::NotALexer);
        }
        Ok(Lexer::new(&self.atn, &self.dfas, input))
    }

    /// Parse-tree builder over this grammar.
    pub fn interpreter(&self) -> ParserInterpreter<'_> {
        ParserInterpreter::new(self)
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            dfas: self.dfas.len(),
            states: self.dfas.iter().map(Dfa::len).sum(),
            edges: self.dfas.iter().map(Dfa::edge_count).sum(),
        }
    }

    /// Drop every cached DFA state. The next predictions rebuild them.
    pub fn clear_dfa_cache(&mut self) {
        for dfa in &mut self.dfas {
            dfa.clear();
        }
        log::debug!("cleared {} DFAs", self.dfas.len());
    }

    /// Text dump of the DFA for decision or mode `index`, edges labelled
    /// with token names (parser) or characters (lexer).
    pub fn dump_dfa(&self, index: usize) -> Option<String> {
        let dfa = self.dfas.get(index)?;
        let vocabulary = (!self.atn.is_lexer()).then_some(&self.atn.vocabulary);
        Some(dfa.dump(vocabulary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;
    use crate::serialize::serialize;
    use crate::semantic::AcceptAll;
    use crate::stream::{CodePointCharStream, CommonTokenStream, ListTokenSource, TokenSource};
    use atn_core::token::EOF;

    fn prefix_parser() -> (Grammar, i32, i32) {
        let mut g = GrammarBuilder::parser("p");
        let a = g.token("A", None);
        let b = g.token("B", None);
        g.rule("x", alts([tok(a), seq([tok(a), tok(b)])]));
        (g.build_grammar().unwrap(), a, b)
    }

    #[test]
    fn typed_loading() {
        let (grammar, _, _) = prefix_parser();
        let blob = serialize(grammar.atn()).unwrap();
        assert!(Grammar::parser_from_bytes(&blob).is_ok());
        assert_eq!(
            Grammar::lexer_from_bytes(&blob).unwrap_err(),
            DecodeError::TypeMismatch {
                expected: GrammarType::Lexer,
                actual: GrammarType::Parser,
            }
        );
    }

    #[test]
    fn stats_and_clear() {
        let (mut grammar, a, b) = prefix_parser();
        assert_eq!(grammar.cache_stats().states, 0);
        let mut input = CommonTokenStream::new(ListTokenSource::from_types(&[a, b]));
        let p = grammar.adaptive_predict(&mut input, 0, &[], &AcceptAll).unwrap();
        assert_eq!(p.alt, 2);
        let stats = grammar.cache_stats();
        assert_eq!(stats.dfas, 1);
        assert!(stats.states > 0);
        assert!(stats.edges > 0);
        assert!(grammar.dump_dfa(0).unwrap().contains("-B->"));

        grammar.clear_dfa_cache();
        assert_eq!(grammar.cache_stats().states, 0);
        assert_eq!(grammar.cache_stats().edges, 0);
    }

    #[test]
    fn mode_change_clears_cache() {
        let (mut grammar, a, _) = prefix_parser();
        let mut input = CommonTokenStream::new(ListTokenSource::from_types(&[a, EOF]));
        grammar.adaptive_predict(&mut input, 0, &[], &AcceptAll).unwrap();
        grammar.set_prediction_mode(PredictionMode::Ll);
        assert!(grammar.cache_stats().states > 0);
        grammar.set_prediction_mode(PredictionMode::Sll);
        assert_eq!(grammar.cache_stats().states, 0);
        assert_eq!(grammar.options().mode, PredictionMode::Sll);
    }

    #[test]
    fn lexer_grammar_tokenizes() {
        let mut g = GrammarBuilder::lexer("l");
        let id = g.lexer_rule("ID", plus(range('a', 'z')));
        g.lexer_rule("WS", seq([chr(' '), skip()]));
        let grammar = g.build_grammar().unwrap();
        let mut lexer = grammar.lexer(CodePointCharStream::new("ab cd")).unwrap();
        assert_eq!(lexer.next_token().unwrap().token_type, id);
        assert_eq!(lexer.next_token().unwrap().text, "cd");
        assert!(lexer.next_token().unwrap().is_eof());
        assert_eq!(grammar.cache_stats().dfas, 1);

        let mut input = CodePointCharStream::new("ab");
        assert!(matches!(
            grammar.adaptive_predict(&mut input, 0, &[], &AcceptAll),
            Err(PredictionError::UnknownDecision { count: 0, .. })
        ));
    }

    #[test]
    fn parser_grammar_has_no_lexer() {
        let (grammar, _, _) = prefix_parser();
        assert!(matches!(
            grammar.lexer(CodePointCharStream::new("a")),
            Err(LexerError::NotALexer)
        ));
    }

    #[test]
    fn grammar_is_shareable() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<Grammar>();
    }
}
