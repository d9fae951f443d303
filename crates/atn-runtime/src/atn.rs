// The decoded network: states, rule / decision / mode tables and names.

use atn_core::token::{EOF, EPSILON, MAX_CHAR_VALUE, MIN_USER_TOKEN_TYPE};
use atn_core::{IntervalSet, Vocabulary};

use crate::context::{CallContext, ContextRef};
use crate::lexer_action::LexerAction;
use crate::ll1::Ll1Analyzer;
use crate::state::{AtnState, StateId};
use crate::transition::TransitionKind;

/// Whether the network recognizes characters (lexer) or tokens (parser).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarType {
    Lexer = 0,
    Parser = 1,
}

/// Immutable ATN. Built once by the deserializer and shared read-only.
#[derive(Debug, Clone)]
pub struct Atn {
    pub grammar_type: GrammarType,
    /// Grammar identity from the blob; two blobs of the same grammar share it.
    pub uuid: u128,
    pub max_token_type: i32,
    pub states: Vec<AtnState>,
    pub decision_to_state: Vec<StateId>,
    pub rule_to_start_state: Vec<StateId>,
    pub rule_to_stop_state: Vec<StateId>,
    /// Lexer only: token type emitted by each rule (`0` for fragments).
    pub rule_to_token_type: Vec<i32>,
    /// Lexer only: `TokenStart` state of each mode.
    pub mode_to_start_state: Vec<StateId>,
    pub lexer_actions: Vec<LexerAction>,
    pub vocabulary: Vocabulary,
    pub rule_names: Vec<String>,
}

impl Atn {
    pub fn is_lexer(&self) -> bool {
        self.grammar_type == GrammarType::Lexer
    }

    pub fn state(&self, id: StateId) -> &AtnState {
        &self.states[id]
    }

    pub fn num_decisions(&self) -> usize {
        self.decision_to_state.len()
    }

    pub fn num_rules(&self) -> usize {
        self.rule_to_start_state.len()
    }

    pub fn decision_state(&self, decision: usize) -> Option<&AtnState> {
        self.decision_to_state
            .get(decision)
            .map(|&s| &self.states[s])
    }

    /// Largest symbol the network can consume: the max token type for a
    /// parser, the largest code point for a lexer.
    pub fn max_symbol(&self) -> i32 {
        match self.grammar_type {
            GrammarType::Lexer => MAX_CHAR_VALUE,
            GrammarType::Parser => self.max_token_type,
        }
    }

    /// Smallest symbol matched by wildcard and not-set edges.
    pub fn min_symbol(&self) -> i32 {
        match self.grammar_type {
            GrammarType::Lexer => 0,
            GrammarType::Parser => MIN_USER_TOKEN_TYPE,
        }
    }

    pub fn rule_name(&self, rule_index: usize) -> String {
        self.rule_names
            .get(rule_index)
            .cloned()
            .unwrap_or_else(|| format!("rule{rule_index}"))
    }

    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.rule_names.iter().position(|n| n == name)
    }

    /// Symbols that can follow `state` within its rule. Contains
    /// [`EPSILON`] if the end of the rule is reachable without consuming
    /// input. Computed once per state.
    pub fn next_tokens(&self, state: StateId) -> &IntervalSet {
        self.states[state]
            .next_tokens
            .get_or_init(|| Ll1Analyzer::new(self).look(state, None, None))
    }

    /// Symbols that can follow `state` given the call context `ctx`.
    pub fn next_tokens_in_context(&self, state: StateId, ctx: &ContextRef) -> IntervalSet {
        Ll1Analyzer::new(self).look(state, None, Some(ctx))
    }

    /// Symbols a parser could accept in `state`, following returns through
    /// `invoking_states` (outermost first) when the rule can end here.
    /// Contains [`EOF`] when the outermost rule can end.
    pub fn expected_tokens(&self, state: StateId, invoking_states: &[StateId]) -> IntervalSet {
        let mut following = self.next_tokens(state).clone();
        if !following.contains(EPSILON) {
            return following;
        }
        let mut expected = IntervalSet::new();
        expected.add_set(&following);
        expected.remove(EPSILON);
        for &invoking in invoking_states.iter().rev() {
            if !following.contains(EPSILON) {
                break;
            }
            let follow = match self.states[invoking].transitions.first().map(|t| &t.kind) {
                Some(TransitionKind::Rule { follow_state, .. }) => *follow_state,
                _ => break,
            };
            following = self.next_tokens(follow).clone();
            expected.add_set(&following);
            expected.remove(EPSILON);
        }
        if following.contains(EPSILON) {
            expected.add(EOF);
        }
        expected
    }

    /// Context for the given invocation stack; see
    /// [`CallContext::from_invoking_states`].
    pub fn context_for(&self, invoking_states: &[StateId]) -> ContextRef {
        CallContext::from_invoking_states(self, invoking_states)
    }
}
