// Adaptive prediction for parser decisions.
//
// Prediction first runs SLL: the decision's DFA is followed as far as cached
// edges go, and missing edges are computed from the ATN by closure-over-
// symbol, turned into DFA states and published. An SLL conflict marks the
// DFA state `requires_full_context`; unless the mode is `Sll`, prediction
// then restarts from the decision with the real call stack (full context),
// whose results are never cached.

use std::sync::Arc;

use atn_core::token::EOF;
use hashbrown::{HashMap, HashSet};

use crate::PredictionError;
use crate::alt_set::AltSet;
use crate::atn::Atn;
use crate::config::AtnConfig;
use crate::config_set::{AtnConfigSet, MergePolicy};
use crate::context::{CallContext, ContextRef};
use crate::dfa::{Dfa, DfaEdge, DfaState, PredPrediction};
use crate::grammar::PredictionOptions;
use crate::prediction_mode::{
    PredictionMode, all_subsets_conflict, all_subsets_equal, conflicting_alt_subsets,
    has_sll_conflict_terminating_prediction, resolves_to_just_one_viable_alt, single_viable_alt,
    union_of,
};
use crate::semantic::{SemanticContext, SemanticEvaluator};
use crate::state::StateId;
use crate::stream::IntStream;
use crate::transition::{Transition, TransitionKind};

/// Outcome of one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    /// Chosen alternative, 1-based.
    pub alt: usize,
    /// The choice needed full-context prediction.
    pub full_context: bool,
    /// Set when ambiguity reporting is on and several alternatives remained
    /// viable; `alt` is then the lowest of them.
    pub ambiguity: Option<AmbiguityReport>,
}

/// Informational: the input between `start_index` and `stop_index` matched
/// several alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguityReport {
    pub decision: usize,
    pub start_index: usize,
    pub stop_index: usize,
    pub alts: AltSet,
    pub chosen: usize,
    /// Full-context prediction proved the alternatives indistinguishable.
    /// `false` for an SLL conflict resolved without full context.
    pub exact: bool,
}

/// Payload of [`PredictionError::NoViableAlt`].
#[derive(Debug, Clone)]
pub struct NoViableAlternative {
    pub decision: usize,
    pub start_index: usize,
    pub offending_index: usize,
    pub offending_symbol: i32,
    /// Configurations still alive before the offending symbol.
    pub configs: AtnConfigSet,
}

/// Prediction over one ATN and its per-decision DFAs.
#[derive(Debug, Clone, Copy)]
pub struct ParserAtnSimulator<'a> {
    atn: &'a Atn,
    dfas: &'a [Dfa],
    options: PredictionOptions,
}

impl<'a> ParserAtnSimulator<'a> {
    pub fn new(atn: &'a Atn, dfas: &'a [Dfa], options: PredictionOptions) -> Self {
        Self { atn, dfas, options }
    }

    /// Predict the alternative taken at `decision` for the input at the
    /// stream's current position.
    ///
    /// `invoking_states` is the parser's call stack, outermost first: the
    /// states holding the rule transitions that are currently active. It is
    /// only consulted by full-context prediction. The stream is returned to
    /// its starting position whatever the outcome.
    pub fn adaptive_predict<S: IntStream + ?Sized>(
        &self,
        input: &mut S,
        decision: usize,
        invoking_states: &[StateId],
        evaluator: &dyn SemanticEvaluator,
    ) -> Result<Prediction, PredictionError> {
        let dfa = self
            .dfas
            .get(decision)
            .ok_or(PredictionError::UnknownDecision {
                decision,
                count: self.dfas.len(),
            })?;
        let marker = input.mark();
        let start_index = input.index();
        let mut run = Run {
            atn: self.atn,
            options: self.options,
            dfa,
            input,
            start_index,
            invoking_states,
            evaluator,
        };
        let result = run.predict();
        run.input.seek(start_index);
        run.input.release(marker);
        result
    }
}

/// Flags threaded through one closure descent.
#[derive(Debug, Clone, Copy)]
struct Walk {
    collect_predicates: bool,
    full_context: bool,
    treat_eof_as_epsilon: bool,
    /// Rule nesting relative to the descent's start; negative once the
    /// descent has left the decision rule.
    depth: i32,
    /// Frames pushed by this descent that are still on the context.
    pushed: usize,
}

struct Run<'r, S: ?Sized> {
    atn: &'r Atn,
    options: PredictionOptions,
    dfa: &'r Dfa,
    input: &'r mut S,
    start_index: usize,
    invoking_states: &'r [StateId],
    evaluator: &'r dyn SemanticEvaluator,
}

impl<S: IntStream + ?Sized> Run<'_, S> {
    fn predict(&mut self) -> Result<Prediction, PredictionError> {
        self.lookahead()?;
        let dfa = self.dfa;
        let cached = if dfa.is_precedence_dfa() {
            dfa.precedence_start_state(self.evaluator.precedence())
        } else {
            dfa.start_state()
        };
        let s0 = match cached {
            Some(s0) => s0,
            None => {
                let closure = self.start_state(CallContext::empty(), false);
                if dfa.is_precedence_dfa() {
                    let precedence = self.evaluator.precedence();
                    let filtered = self.apply_precedence_filter(&closure);
                    let s0 = dfa.add_state(DfaState::new(filtered));
                    dfa.set_precedence_start_state(precedence, &s0);
                    s0
                } else {
                    let s0 = dfa.add_state(DfaState::new(closure));
                    dfa.set_start_state(&s0);
                    s0
                }
            }
        };
        self.exec_sll(s0)
    }

    fn policy(&self, full_context: bool) -> MergePolicy {
        if self.options.mode == PredictionMode::Sll && !full_context {
            MergePolicy::FirstAltWins
        } else {
            MergePolicy::RetainAll
        }
    }

    /// Current symbol, rejecting anything outside the vocabulary.
    fn lookahead(&mut self) -> Result<i32, PredictionError> {
        let t = self.input.la(1);
        if t != EOF && !(self.atn.min_symbol()..=self.atn.max_token_type).contains(&t) {
            return Err(PredictionError::InvalidSymbol {
                symbol: t,
                index: self.input.index(),
                decision: self.dfa.decision,
                max_token_type: self.atn.max_token_type,
            });
        }
        Ok(t)
    }

    fn exec_sll(&mut self, s0: Arc<DfaState>) -> Result<Prediction, PredictionError> {
        let dfa = self.dfa;
        let mut previous = s0;
        let mut t = self.lookahead()?;
        loop {
            let target = match previous.edge(t) {
                Some(DfaEdge::Error) => None,
                Some(DfaEdge::State(id)) => match dfa.state(id) {
                    Some(d) => Some(d),
                    None => self.compute_target_state(&previous, t),
                },
                None => self.compute_target_state(&previous, t),
            };
            let Some(d) = target else {
                return self.no_viable_or_fallback(&previous.configs, t);
            };

            if d.requires_full_context && self.options.mode != PredictionMode::Sll {
                if let Some(preds) = &d.predicates {
                    let conflict_index = self.input.index();
                    self.input.seek(self.start_index);
                    let alts = self.eval_predicates(preds, true);
                    if let (1, Some(alt)) = (alts.len(), alts.min()) {
                        return Ok(Prediction {
                            alt,
                            full_context: false,
                            ambiguity: None,
                        });
                    }
                    self.input.seek(conflict_index);
                }
                return self.exec_full_context();
            }

            if d.is_accept {
                return self.accept(&d);
            }

            previous = d;
            if t != EOF {
                self.input.consume();
                t = self.lookahead()?;
            }
        }
    }

    fn accept(&mut self, d: &DfaState) -> Result<Prediction, PredictionError> {
        if let Some(preds) = &d.predicates {
            let stop_index = self.input.index();
            self.input.seek(self.start_index);
            let alts = self.eval_predicates(preds, true);
            let Some(alt) = alts.min() else {
                let symbol = self.input_symbol_at(stop_index);
                return Err(self.no_viable(&d.configs, stop_index, symbol));
            };
            let ambiguity = (alts.len() > 1).then(|| self.report(stop_index, alts, alt, false));
            return Ok(Prediction {
                alt,
                full_context: false,
                ambiguity: ambiguity.flatten(),
            });
        }
        // A full-context state carries no prediction; SLL mode settles its
        // conflict on the lowest alternative.
        let conflict = d
            .requires_full_context
            .then(|| d.configs.conflicting_alts.clone())
            .flatten();
        let Some(alt) = d.prediction.or_else(|| conflict.as_ref().and_then(AltSet::min)) else {
            let index = self.input.index();
            let symbol = self.input_symbol_at(index);
            return Err(self.no_viable(&d.configs, index, symbol));
        };
        let ambiguity = conflict.and_then(|alts| self.report(self.input.index(), alts, alt, false));
        Ok(Prediction {
            alt,
            full_context: false,
            ambiguity,
        })
    }

    fn input_symbol_at(&mut self, index: usize) -> i32 {
        let here = self.input.index();
        self.input.seek(index);
        let t = self.input.la(1);
        self.input.seek(here);
        t
    }

    fn report(
        &self,
        stop_index: usize,
        alts: AltSet,
        chosen: usize,
        exact: bool,
    ) -> Option<AmbiguityReport> {
        log::debug!(
            "decision {}: ambiguity {} at input {}..={}, choosing {}",
            self.dfa.decision,
            alts,
            self.start_index,
            stop_index,
            chosen
        );
        self.options.report_ambiguities.then(|| AmbiguityReport {
            decision: self.dfa.decision,
            start_index: self.start_index,
            stop_index,
            alts,
            chosen,
            exact,
        })
    }

    fn no_viable(
        &self,
        configs: &AtnConfigSet,
        offending_index: usize,
        offending_symbol: i32,
    ) -> PredictionError {
        PredictionError::NoViableAlt(Box::new(NoViableAlternative {
            decision: self.dfa.decision,
            start_index: self.start_index,
            offending_index,
            offending_symbol,
            configs: configs.clone(),
        }))
    }

    /// No alternative survives `t`. An alternative that already finished
    /// the decision rule still wins; the caller reports the error where the
    /// enclosing rule fails to match.
    fn no_viable_or_fallback(
        &mut self,
        configs: &AtnConfigSet,
        t: i32,
    ) -> Result<Prediction, PredictionError> {
        let error = self.no_viable(configs, self.input.index(), t);
        self.input.seek(self.start_index);
        match self.alt_that_finished_decision_rule(configs) {
            Some(alt) => Ok(Prediction {
                alt,
                full_context: configs.full_context(),
                ambiguity: None,
            }),
            None => Err(error),
        }
    }

    /// Prefer configurations whose predicates hold; fall back to those whose
    /// predicates fail.
    fn alt_that_finished_decision_rule(&self, configs: &AtnConfigSet) -> Option<usize> {
        let (valid, invalid): (Vec<&AtnConfig>, Vec<&AtnConfig>) = configs
            .iter()
            .partition(|c| c.semantic.is_always() || c.semantic.eval(self.evaluator));
        let finished = |set: &[&AtnConfig]| {
            set.iter()
                .filter(|c| {
                    c.dips_into_outer_context()
                        || (self.atn.states[c.state].is_rule_stop() && c.context.is_empty())
                })
                .map(|c| c.alt)
                .min()
        };
        finished(&valid).or_else(|| finished(&invalid))
    }

    fn compute_target_state(&mut self, previous: &DfaState, t: i32) -> Option<Arc<DfaState>> {
        let dfa = self.dfa;
        let Some(reach) = self.compute_reach_set(&previous.configs, t, false) else {
            log::trace!(
                "decision {}: s{} --{}--> error",
                dfa.decision,
                previous.id,
                t
            );
            dfa.add_edge(previous, t, DfaEdge::Error);
            return None;
        };

        let mut d = DfaState::new(reach);
        if let Some(alt) = d.configs.single_alt() {
            d.is_accept = true;
            d.configs.unique_alt = Some(alt);
            d.prediction = Some(alt);
        } else if has_sll_conflict_terminating_prediction(self.options.mode, self.atn, &d.configs) {
            let conflicting = union_of(&conflicting_alt_subsets(&d.configs));
            log::debug!(
                "decision {}: SLL conflict {} at input {}",
                dfa.decision,
                conflicting,
                self.input.index()
            );
            d.configs.conflicting_alts = Some(conflicting);
            d.requires_full_context = true;
            d.is_accept = true;
        }
        if d.is_accept && d.configs.has_semantic_context {
            self.predicate_dfa_state(&mut d);
        }

        let d = dfa.add_state(d);
        log::trace!(
            "decision {}: s{} --{}--> s{}",
            dfa.decision,
            previous.id,
            t,
            d.id
        );
        dfa.add_edge(previous, t, DfaEdge::State(d.id));
        Some(d)
    }

    /// Attach (predicate, alt) pairs to an accept state whose alternatives
    /// are guarded by predicates.
    fn predicate_dfa_state(&self, d: &mut DfaState) {
        let decision_state = &self.atn.states[self.dfa.atn_start_state];
        let alts: AltSet = match d.configs.unique_alt {
            Some(alt) => [alt].into_iter().collect(),
            None => d.configs.conflicting_alts.clone().unwrap_or_default(),
        };
        let nalts = decision_state
            .transitions
            .len()
            .max(alts.iter().last().unwrap_or(0));

        let mut alt_to_pred: Vec<Option<SemanticContext>> = vec![None; nalts + 1];
        for c in &d.configs {
            if alts.contains(c.alt) {
                let merged = match &alt_to_pred[c.alt] {
                    Some(prev) => SemanticContext::or(prev, &c.semantic),
                    None => c.semantic.clone(),
                };
                alt_to_pred[c.alt] = Some(merged);
            }
        }
        let has_predicate = alt_to_pred
            .iter()
            .any(|p| p.as_ref().is_some_and(|p| !p.is_always()));
        if !has_predicate {
            if !d.requires_full_context {
                d.prediction = alts.min();
            }
            return;
        }
        let pairs = alt_to_pred
            .into_iter()
            .enumerate()
            .skip(1)
            .filter(|(alt, _)| alts.contains(*alt))
            .map(|(alt, pred)| PredPrediction {
                predicate: pred.unwrap_or(SemanticContext::Always),
                alt,
            })
            .collect();
        d.predicates = Some(pairs);
        d.prediction = None;
    }

    /// Alternatives whose predicate holds. With `complete == false` the
    /// first success ends the evaluation.
    fn eval_predicates(&self, preds: &[PredPrediction], complete: bool) -> AltSet {
        let mut alts = AltSet::new();
        for pair in preds {
            if pair.predicate.eval(self.evaluator) {
                alts.insert(pair.alt);
                if !complete {
                    break;
                }
            }
        }
        alts
    }

    fn exec_full_context(&mut self) -> Result<Prediction, PredictionError> {
        log::debug!(
            "decision {}: full-context prediction at input {}",
            self.dfa.decision,
            self.start_index
        );
        let outer = CallContext::from_invoking_states(self.atn, self.invoking_states);
        self.input.seek(self.start_index);
        let mut previous = self.start_state(outer, true);
        let mut t = self.lookahead()?;
        let (alt, reach, exact) = loop {
            let Some(mut reach) = self.compute_reach_set(&previous, t, true) else {
                return self.no_viable_or_fallback(&previous, t);
            };
            let subsets = conflicting_alt_subsets(&reach);
            reach.unique_alt = reach.single_alt();
            if let Some(alt) = reach.unique_alt {
                break (alt, reach, false);
            }
            if self.options.mode != PredictionMode::LlExactAmbiguity {
                if let Some(alt) = resolves_to_just_one_viable_alt(&subsets) {
                    break (alt, reach, false);
                }
            } else if all_subsets_conflict(&subsets) && all_subsets_equal(&subsets) {
                if let Some(alt) = single_viable_alt(&subsets) {
                    break (alt, reach, true);
                }
            }
            if t == EOF && reach == previous {
                // Nothing left to consume and nothing changes.
                let alt = reach.alts().min().unwrap_or(1);
                break (alt, reach, false);
            }
            previous = reach;
            if t != EOF {
                self.input.consume();
                t = self.lookahead()?;
            }
        };

        if reach.unique_alt.is_some() {
            log::debug!(
                "decision {}: context-sensitive, full context chose {}",
                self.dfa.decision,
                alt
            );
            return Ok(Prediction {
                alt,
                full_context: true,
                ambiguity: None,
            });
        }
        let ambiguity = self.report(self.input.index(), reach.alts(), alt, exact);
        Ok(Prediction {
            alt,
            full_context: true,
            ambiguity,
        })
    }

    /// Closure of the decision state's alternatives under `context`.
    fn start_state(&mut self, context: ContextRef, full_context: bool) -> AtnConfigSet {
        let atn = self.atn;
        let mut configs = AtnConfigSet::new(full_context, self.policy(full_context));
        let decision_state = &atn.states[self.dfa.atn_start_state];
        for (i, trans) in decision_state.transitions.iter().enumerate() {
            let config = AtnConfig::new(trans.target, i + 1, context.clone());
            let mut busy = HashSet::new();
            let walk = Walk {
                collect_predicates: true,
                full_context,
                treat_eof_as_epsilon: false,
                depth: 0,
                pushed: 0,
            };
            self.closure(config, &mut configs, &mut busy, walk);
        }
        configs
    }

    /// Left-recursive decisions: drop alternative-2+ configurations that
    /// alternative 1 also reaches with the same context, and resolve
    /// precedence predicates for the current precedence.
    fn apply_precedence_filter(&self, configs: &AtnConfigSet) -> AtnConfigSet {
        let mut states_from_alt1: HashMap<StateId, ContextRef> = HashMap::new();
        let mut filtered = configs.empty_like();
        for c in configs.iter().filter(|c| c.alt == 1) {
            let Some(updated) = c.semantic.eval_precedence(self.evaluator) else {
                continue;
            };
            states_from_alt1.insert(c.state, c.context.clone());
            if updated != c.semantic {
                filtered.add(c.with_semantic(c.state, updated));
            } else {
                filtered.add(c.clone());
            }
        }
        for c in configs.iter().filter(|c| c.alt != 1) {
            if !c.precedence_filter_suppressed
                && states_from_alt1.get(&c.state) == Some(&c.context)
            {
                continue;
            }
            filtered.add(c.clone());
        }
        filtered
    }

    fn compute_reach_set(
        &mut self,
        closure: &AtnConfigSet,
        t: i32,
        full_context: bool,
    ) -> Option<AtnConfigSet> {
        let atn = self.atn;
        let policy = self.policy(full_context);
        let mut intermediate = AtnConfigSet::new(full_context, policy);
        let mut skipped_stop_states = Vec::new();

        for c in closure {
            let state = &atn.states[c.state];
            if state.is_rule_stop() {
                if full_context || t == EOF {
                    skipped_stop_states.push(c.clone());
                }
                continue;
            }
            for trans in &state.transitions {
                if trans.matches(t, atn.min_symbol(), atn.max_token_type) {
                    intermediate.add(c.moved_to(trans.target));
                }
            }
        }

        // A single surviving alternative needs no closure: the state is an
        // accept state either way.
        let skip_closure = skipped_stop_states.is_empty()
            && t != EOF
            && (intermediate.len() == 1 || intermediate.single_alt().is_some());
        let mut reach = if skip_closure {
            intermediate
        } else {
            let mut reach = AtnConfigSet::new(full_context, policy);
            let mut busy = HashSet::new();
            let walk = Walk {
                collect_predicates: false,
                full_context,
                treat_eof_as_epsilon: t == EOF,
                depth: 0,
                pushed: 0,
            };
            for c in intermediate.iter() {
                self.closure(c.clone(), &mut reach, &mut busy, walk);
            }
            reach
        };

        if t == EOF && !reach.all_configs_in_rule_stop(atn) {
            let mut at_stop = reach.empty_like();
            for c in reach.iter().filter(|c| atn.states[c.state].is_rule_stop()) {
                at_stop.add(c.clone());
            }
            reach = at_stop;
        }

        if !skipped_stop_states.is_empty() && (!full_context || !reach.has_config_in_rule_stop(atn))
        {
            for c in skipped_stop_states {
                reach.add(c);
            }
        }

        (!reach.is_empty()).then_some(reach)
    }

    fn closure(
        &mut self,
        config: AtnConfig,
        configs: &mut AtnConfigSet,
        busy: &mut HashSet<AtnConfig>,
        walk: Walk,
    ) {
        let state = &self.atn.states[config.state];
        if state.is_rule_stop() {
            if let (Some(ret), Some(parent)) =
                (config.context.return_state(), config.context.parent())
            {
                let popped = config.with_context(ret, Arc::clone(parent));
                let walk = Walk {
                    depth: walk.depth - 1,
                    pushed: walk.pushed.saturating_sub(1),
                    ..walk
                };
                self.closure(popped, configs, busy, walk);
                return;
            }
            if walk.full_context {
                configs.add(config);
                return;
            }
            // SLL without context: follow every return edge of the rule.
        }
        self.closure_inner(config, configs, busy, walk);
    }

    fn closure_inner(
        &mut self,
        config: AtnConfig,
        configs: &mut AtnConfigSet,
        busy: &mut HashSet<AtnConfig>,
        walk: Walk,
    ) {
        if !busy.insert(config.clone()) {
            return;
        }
        let atn = self.atn;
        let state = &atn.states[config.state];
        if !state.epsilon_only {
            configs.add(config.clone());
        }

        for trans in &state.transitions {
            let collect =
                walk.collect_predicates && !matches!(trans.kind, TransitionKind::Action { .. });
            let Some(mut next) = self.epsilon_target(&config, trans, collect, walk) else {
                continue;
            };
            let mut inner = Walk {
                collect_predicates: collect,
                ..walk
            };
            if state.is_rule_stop() {
                // Fell off the end of the decision rule.
                if self.dfa.is_precedence_dfa() {
                    if let TransitionKind::Epsilon {
                        outermost_precedence_return: Some(rule),
                    } = trans.kind
                    {
                        let decision_rule = atn.states[self.dfa.atn_start_state].rule_index;
                        if decision_rule == Some(rule) {
                            next.precedence_filter_suppressed = true;
                        }
                    }
                }
                next.reaches_into_outer_context += 1;
                configs.dips_into_outer_context = true;
                inner.depth -= 1;
            } else if let TransitionKind::Rule { follow_state, .. } = trans.kind {
                if is_left_recursive_entry(&config.context, walk.pushed, follow_state) {
                    log::warn!(
                        "decision {}: rule {} re-entered without consuming input; not followed",
                        self.dfa.decision,
                        atn.rule_name(state.rule_index.unwrap_or_default())
                    );
                    continue;
                }
                if inner.depth >= 0 {
                    inner.depth += 1;
                }
                inner.pushed += 1;
            }
            self.closure(next, configs, busy, inner);
        }
    }

    fn epsilon_target(
        &mut self,
        config: &AtnConfig,
        trans: &Transition,
        collect_predicates: bool,
        walk: Walk,
    ) -> Option<AtnConfig> {
        let in_context = walk.depth == 0;
        match &trans.kind {
            TransitionKind::Rule { follow_state, .. } => Some(config.with_context(
                trans.target,
                CallContext::push(&config.context, *follow_state),
            )),
            TransitionKind::Precedence(p) => {
                let predicate = SemanticContext::Precedence(*p);
                self.predicate_target(config, trans, predicate, collect_predicates && in_context, walk)
            }
            TransitionKind::Predicate {
                rule_index,
                pred_index,
                ctx_dependent,
            } => {
                let predicate = SemanticContext::Predicate {
                    rule_index: *rule_index,
                    pred_index: *pred_index,
                    ctx_dependent: *ctx_dependent,
                };
                let collect = collect_predicates && (!ctx_dependent || in_context);
                self.predicate_target(config, trans, predicate, collect, walk)
            }
            TransitionKind::Action { .. } | TransitionKind::Epsilon { .. } => {
                Some(config.moved_to(trans.target))
            }
            TransitionKind::Atom(_) | TransitionKind::Range { .. } | TransitionKind::Set(_) => {
                (walk.treat_eof_as_epsilon && trans.matches(EOF, 0, 1))
                    .then(|| config.moved_to(trans.target))
            }
            TransitionKind::NotSet(_) | TransitionKind::Wildcard => None,
        }
    }

    /// Full context evaluates the predicate now, at the decision's start;
    /// SLL records it in the configuration's semantic context.
    fn predicate_target(
        &mut self,
        config: &AtnConfig,
        trans: &Transition,
        predicate: SemanticContext,
        collect: bool,
        walk: Walk,
    ) -> Option<AtnConfig> {
        if !collect {
            return Some(config.moved_to(trans.target));
        }
        if walk.full_context {
            let here = self.input.index();
            self.input.seek(self.start_index);
            let holds = predicate.eval(self.evaluator);
            self.input.seek(here);
            return holds.then(|| config.moved_to(trans.target));
        }
        let semantic = SemanticContext::and(&config.semantic, &predicate);
        Some(config.with_semantic(trans.target, semantic))
    }
}

/// Taking a rule transition whose follow state is already among the frames
/// this descent pushed would recurse forever without consuming input.
fn is_left_recursive_entry(context: &ContextRef, pushed: usize, follow_state: StateId) -> bool {
    context
        .return_states()
        .take(pushed)
        .any(|s| s == follow_state)
}
