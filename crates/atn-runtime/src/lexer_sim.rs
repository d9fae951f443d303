// Lexer simulation: longest match over a mode's ATN, cached in the mode's DFA.
//
// Each mode start state has one transition per token rule, in declaration
// order, and the transition number is the config's alternative. The first
// config to reach a rule stop state decides the token, so on equal length
// the rule declared first wins. Input is consumed greedily; the last accept
// state seen is remembered and the input rewound to it when the DFA runs out.

use std::sync::Arc;

use atn_core::token::EOF;
use hashbrown::HashSet;

use crate::LexerError;
use crate::atn::Atn;
use crate::config::AtnConfig;
use crate::config_set::{AtnConfigSet, MergePolicy};
use crate::context::CallContext;
use crate::dfa::{Dfa, DfaEdge, DfaState};
use crate::lexer_action::LexerActionExecutor;
use crate::semantic::SemanticEvaluator;
use crate::state::StateId;
use crate::stream::CharStream;
use crate::transition::{Transition, TransitionKind};

/// Result of one [`LexerAtnSimulator::match_token`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexMatch {
    /// A token rule matched; the input sits just past it.
    Token {
        rule_index: usize,
        actions: Option<Arc<LexerActionExecutor>>,
    },
    /// The input was already exhausted.
    Eof,
}

/// Position to rewind to when the DFA walk overshoots.
#[derive(Debug)]
struct SimState {
    index: usize,
    line: usize,
    column: usize,
    state: Arc<DfaState>,
}

/// Matches tokens for a lexer ATN, tracking line and column as it consumes.
#[derive(Debug, Clone)]
pub struct LexerAtnSimulator<'a> {
    atn: &'a Atn,
    dfas: &'a [Dfa],
    /// 1-based line of the current input position.
    pub line: usize,
    /// 0-based column of the current input position, in code points.
    pub column: usize,
    start_index: usize,
    start_line: usize,
    start_column: usize,
}

impl<'a> LexerAtnSimulator<'a> {
    /// `dfas` holds one DFA per mode.
    pub fn new(atn: &'a Atn, dfas: &'a [Dfa]) -> Self {
        Self {
            atn,
            dfas,
            line: 1,
            column: 0,
            start_index: 0,
            start_line: 1,
            start_column: 0,
        }
    }

    /// Match one token in `mode` starting at the current input position.
    ///
    /// On success the input is left just past the token. On failure it is
    /// left where matching stopped, which [`consume`](Self::consume) can then
    /// step past.
    pub fn match_token<I: CharStream + ?Sized>(
        &mut self,
        input: &mut I,
        mode: usize,
        evaluator: &dyn SemanticEvaluator,
    ) -> Result<LexMatch, LexerError> {
        let dfa = self.dfas.get(mode).ok_or(LexerError::UnknownMode {
            mode,
            count: self.dfas.len(),
        })?;
        let marker = input.mark();
        self.start_index = input.index();
        self.start_line = self.line;
        self.start_column = self.column;
        let result = match dfa.start_state() {
            Some(s0) => self.exec(input, dfa, s0, evaluator),
            None => self.match_atn(input, dfa, mode, evaluator),
        };
        input.release(marker);
        result
    }

    /// Advance one code point, keeping line and column current.
    pub fn consume<I: CharStream + ?Sized>(&mut self, input: &mut I) {
        if input.la(1) == '\n' as i32 {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        input.consume();
    }

    fn match_atn<I: CharStream + ?Sized>(
        &mut self,
        input: &mut I,
        dfa: &Dfa,
        mode: usize,
        evaluator: &dyn SemanticEvaluator,
    ) -> Result<LexMatch, LexerError> {
        let start = self.atn.mode_to_start_state[mode];
        let mut s0_closure = self.start_state(input, start, evaluator);
        // A start state that went through predicates depends on them, so it
        // is registered but not remembered as the mode's start.
        let suppress = s0_closure.has_semantic_context;
        s0_closure.has_semantic_context = false;
        let s0 = self.add_dfa_state(dfa, s0_closure);
        if !suppress {
            dfa.set_start_state(&s0);
        }
        self.exec(input, dfa, s0, evaluator)
    }

    fn exec<I: CharStream + ?Sized>(
        &mut self,
        input: &mut I,
        dfa: &Dfa,
        s0: Arc<DfaState>,
        evaluator: &dyn SemanticEvaluator,
    ) -> Result<LexMatch, LexerError> {
        let mut prev_accept = None;
        if s0.is_accept {
            prev_accept = Some(self.capture(input, &s0));
        }
        let mut t = input.la(1);
        let mut s = s0;
        loop {
            let cached = match s.edge(t) {
                Some(DfaEdge::Error) => break,
                Some(DfaEdge::State(id)) => dfa.state(id),
                None => None,
            };
            let target = match cached {
                Some(target) => target,
                None => match self.compute_target_state(input, dfa, &s, t, evaluator) {
                    Some(target) => target,
                    None => break,
                },
            };
            if t != EOF {
                self.consume(input);
            }
            if target.is_accept {
                prev_accept = Some(self.capture(input, &target));
                if t == EOF {
                    break;
                }
            }
            if t == EOF && Arc::ptr_eq(&target, &s) {
                break;
            }
            t = input.la(1);
            s = target;
        }
        self.fail_or_accept(prev_accept, input, t)
    }

    fn capture<I: CharStream + ?Sized>(&self, input: &I, state: &Arc<DfaState>) -> SimState {
        SimState {
            index: input.index(),
            line: self.line,
            column: self.column,
            state: Arc::clone(state),
        }
    }

    fn fail_or_accept<I: CharStream + ?Sized>(
        &mut self,
        prev_accept: Option<SimState>,
        input: &mut I,
        t: i32,
    ) -> Result<LexMatch, LexerError> {
        if let Some(accept) = prev_accept {
            input.seek(accept.index);
            self.line = accept.line;
            self.column = accept.column;
            if let Some(rule_index) = accept.state.prediction {
                return Ok(LexMatch::Token {
                    rule_index,
                    actions: accept.state.lexer_actions.clone(),
                });
            }
        }
        if t == EOF && input.index() == self.start_index {
            return Ok(LexMatch::Eof);
        }
        Err(LexerError::NoViableToken {
            index: self.start_index,
            line: self.start_line,
            column: self.start_column,
            text: input.text(self.start_index, input.index()),
        })
    }

    fn compute_target_state<I: CharStream + ?Sized>(
        &mut self,
        input: &mut I,
        dfa: &Dfa,
        from: &DfaState,
        t: i32,
        evaluator: &dyn SemanticEvaluator,
    ) -> Option<Arc<DfaState>> {
        let mut reach = AtnConfigSet::new(false, MergePolicy::FirstAltWins);
        self.reachable_config_set(input, &from.configs, &mut reach, t, evaluator);
        if reach.is_empty() {
            // A predicate may have killed every path; that is not cacheable.
            if !reach.has_semantic_context {
                dfa.add_edge(from, t, DfaEdge::Error);
            }
            return None;
        }
        let suppress = reach.has_semantic_context;
        reach.has_semantic_context = false;
        let to = self.add_dfa_state(dfa, reach);
        if suppress {
            log::trace!("mode {}: edge on {t} depends on predicates, not cached", dfa.decision);
        } else {
            dfa.add_edge(from, t, DfaEdge::State(to.id));
        }
        Some(to)
    }

    fn reachable_config_set<I: CharStream + ?Sized>(
        &mut self,
        input: &mut I,
        closure: &AtnConfigSet,
        reach: &mut AtnConfigSet,
        t: i32,
        evaluator: &dyn SemanticEvaluator,
    ) {
        let atn = self.atn;
        // Once an alternative reaches a rule stop, its other paths past a
        // non-greedy decision are dropped.
        let mut skip_alt: Option<usize> = None;
        for c in closure {
            let reached_accept = skip_alt == Some(c.alt);
            if reached_accept && c.passed_non_greedy {
                continue;
            }
            for trans in &atn.states[c.state].transitions {
                if !trans.matches(t, atn.min_symbol(), atn.max_symbol()) {
                    continue;
                }
                let actions = c
                    .lexer_actions
                    .as_ref()
                    .map(|a| a.fix_offset_before_match(input.index() - self.start_index));
                let mut next = step(atn, c, trans.target);
                next.lexer_actions = actions;
                let mut busy = HashSet::new();
                if self.closure(
                    input,
                    next,
                    reach,
                    &mut busy,
                    reached_accept,
                    true,
                    t == EOF,
                    evaluator,
                ) {
                    skip_alt = Some(c.alt);
                    break;
                }
            }
        }
    }

    fn start_state<I: CharStream + ?Sized>(
        &mut self,
        input: &mut I,
        start: StateId,
        evaluator: &dyn SemanticEvaluator,
    ) -> AtnConfigSet {
        let atn = self.atn;
        let mut configs = AtnConfigSet::new(false, MergePolicy::FirstAltWins);
        for (i, trans) in atn.states[start].transitions.iter().enumerate() {
            let c = AtnConfig::start(trans.target, i + 1);
            let mut busy = HashSet::new();
            self.closure(
                input,
                c,
                &mut configs,
                &mut busy,
                false,
                false,
                false,
                evaluator,
            );
        }
        configs
    }

    /// Epsilon closure of `config` into `configs`. Returns whether this
    /// alternative has reached a token rule's stop state.
    #[allow(clippy::too_many_arguments)]
    fn closure<I: CharStream + ?Sized>(
        &mut self,
        input: &mut I,
        config: AtnConfig,
        configs: &mut AtnConfigSet,
        busy: &mut HashSet<AtnConfig>,
        mut reached_accept: bool,
        speculative: bool,
        treat_eof_as_epsilon: bool,
        evaluator: &dyn SemanticEvaluator,
    ) -> bool {
        if !busy.insert(config.clone()) {
            return reached_accept;
        }
        let atn = self.atn;
        let state = &atn.states[config.state];
        if state.is_rule_stop() {
            if config.context.is_empty() {
                configs.add(config);
                return true;
            }
            // Return from a fragment rule.
            if let (Some(parent), Some(ret)) = (config.context.parent(), config.context.return_state()) {
                let mut popped = step(atn, &config, ret);
                popped.context = parent.clone();
                reached_accept = self.closure(
                    input,
                    popped,
                    configs,
                    busy,
                    reached_accept,
                    speculative,
                    treat_eof_as_epsilon,
                    evaluator,
                );
            }
            return reached_accept;
        }

        if !state.epsilon_only && (!reached_accept || !config.passed_non_greedy) {
            configs.add(config.clone());
        }
        for trans in &state.transitions {
            if let Some(next) = self.epsilon_target(
                input,
                &config,
                trans,
                configs,
                speculative,
                treat_eof_as_epsilon,
                evaluator,
            ) {
                reached_accept = self.closure(
                    input,
                    next,
                    configs,
                    busy,
                    reached_accept,
                    speculative,
                    treat_eof_as_epsilon,
                    evaluator,
                );
            }
        }
        reached_accept
    }

    #[allow(clippy::too_many_arguments)]
    fn epsilon_target<I: CharStream + ?Sized>(
        &mut self,
        input: &mut I,
        config: &AtnConfig,
        trans: &Transition,
        configs: &mut AtnConfigSet,
        speculative: bool,
        treat_eof_as_epsilon: bool,
        evaluator: &dyn SemanticEvaluator,
    ) -> Option<AtnConfig> {
        let atn = self.atn;
        match &trans.kind {
            TransitionKind::Rule { follow_state, .. } => {
                let mut next = step(atn, config, trans.target);
                next.context = CallContext::push(&config.context, *follow_state);
                Some(next)
            }
            TransitionKind::Precedence(p) => {
                log::warn!("precedence predicate {p} in a lexer rule is ignored");
                None
            }
            TransitionKind::Predicate {
                rule_index,
                pred_index,
                ..
            } => {
                configs.has_semantic_context = true;
                self.eval_predicate(input, *rule_index, *pred_index, speculative, evaluator)
                    .then(|| step(atn, config, trans.target))
            }
            TransitionKind::Action { action_index, .. } => {
                let mut next = step(atn, config, trans.target);
                // Actions inside fragment rules do not run.
                if config.context.is_empty() {
                    if let Some(action) = action_index.and_then(|i| atn.lexer_actions.get(i)) {
                        next.lexer_actions = Some(LexerActionExecutor::append(
                            config.lexer_actions.as_ref(),
                            action.clone(),
                        ));
                    }
                }
                Some(next)
            }
            TransitionKind::Epsilon { .. } => Some(step(atn, config, trans.target)),
            TransitionKind::Atom(_) | TransitionKind::Range { .. } | TransitionKind::Set(_) => {
                (treat_eof_as_epsilon && trans.matches(EOF, atn.min_symbol(), atn.max_symbol()))
                    .then(|| step(atn, config, trans.target))
            }
            TransitionKind::NotSet(_) | TransitionKind::Wildcard => None,
        }
    }

    /// Speculative evaluation happens one character ahead of the match, as
    /// if the predicate sat after the character being tested.
    fn eval_predicate<I: CharStream + ?Sized>(
        &mut self,
        input: &mut I,
        rule_index: usize,
        pred_index: usize,
        speculative: bool,
        evaluator: &dyn SemanticEvaluator,
    ) -> bool {
        if !speculative {
            return evaluator.predicate(rule_index, pred_index);
        }
        let (line, column, index) = (self.line, self.column, input.index());
        let marker = input.mark();
        self.consume(input);
        let result = evaluator.predicate(rule_index, pred_index);
        self.line = line;
        self.column = column;
        input.seek(index);
        input.release(marker);
        result
    }

    fn add_dfa_state(&self, dfa: &Dfa, configs: AtnConfigSet) -> Arc<DfaState> {
        let atn = self.atn;
        let mut proposed = DfaState::new(configs);
        let accept = proposed
            .configs
            .iter()
            .find(|c| atn.states[c.state].is_rule_stop())
            .map(|c| (atn.states[c.state].rule_index, c.lexer_actions.clone()));
        if let Some((rule_index, actions)) = accept {
            proposed.is_accept = true;
            proposed.prediction = rule_index;
            proposed.lexer_actions = actions;
        }
        dfa.add_state(proposed)
    }
}

/// `config` moved to `target`, noting when it enters a non-greedy decision.
fn step(atn: &Atn, config: &AtnConfig, target: StateId) -> AtnConfig {
    let mut next = config.moved_to(target);
    let st = &atn.states[target];
    next.passed_non_greedy |= st.kind.is_decision() && st.non_greedy;
    next
}
