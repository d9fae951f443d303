// LL(1) lookahead: symbols reachable from a state before consuming input.

use atn_core::IntervalSet;
use atn_core::token::{EOF, EPSILON, INVALID_TYPE};
use hashbrown::HashSet;

use crate::atn::Atn;
use crate::context::{CallContext, ContextRef};
use crate::state::StateId;
use crate::transition::TransitionKind;

/// Marker added to a lookahead set when a predicate blocks the analysis.
const HIT_PRED: i32 = INVALID_TYPE;

pub struct Ll1Analyzer<'a> {
    atn: &'a Atn,
}

struct Walk {
    stop: Option<StateId>,
    /// No caller context was supplied: reaching the end of the rule yields
    /// `EPSILON` instead of `EOF`.
    open: bool,
    see_thru_preds: bool,
    busy: HashSet<(StateId, ContextRef)>,
    called: Vec<bool>,
    look: IntervalSet,
}

impl<'a> Ll1Analyzer<'a> {
    pub fn new(atn: &'a Atn) -> Self {
        Self { atn }
    }

    /// Symbols that can be matched starting at `state`.
    ///
    /// Without `ctx` the walk stops at the rule end and records [`EPSILON`].
    /// With `ctx` it follows return states, recording [`EOF`] once the
    /// context is exhausted. Reaching `stop` counts as reaching the end.
    pub fn look(
        &self,
        state: StateId,
        stop: Option<StateId>,
        ctx: Option<&ContextRef>,
    ) -> IntervalSet {
        let mut walk = Walk {
            stop,
            open: ctx.is_none(),
            see_thru_preds: true,
            busy: HashSet::new(),
            called: vec![false; self.atn.num_rules()],
            look: IntervalSet::new(),
        };
        let ctx = ctx.cloned().unwrap_or_else(CallContext::empty);
        self.walk(state, ctx, &mut walk);
        walk.look
    }

    /// Per-alternative LL(1) sets of a decision state. An entry is `None`
    /// when the alternative is guarded by a predicate or matches nothing.
    pub fn decision_lookahead(&self, state: StateId) -> Vec<Option<IntervalSet>> {
        self.atn.states[state]
            .transitions
            .iter()
            .map(|t| {
                let mut walk = Walk {
                    stop: None,
                    open: true,
                    see_thru_preds: false,
                    busy: HashSet::new(),
                    called: vec![false; self.atn.num_rules()],
                    look: IntervalSet::new(),
                };
                self.walk(t.target, CallContext::empty(), &mut walk);
                (!walk.look.is_empty() && !walk.look.contains(HIT_PRED)).then_some(walk.look)
            })
            .collect()
    }

    fn walk(&self, s: StateId, ctx: ContextRef, w: &mut Walk) {
        if !w.busy.insert((s, ctx.clone())) {
            return;
        }
        let state = &self.atn.states[s];

        if Some(s) == w.stop || state.is_rule_stop() {
            if ctx.is_empty() {
                w.look.add(if w.open { EPSILON } else { EOF });
                return;
            }
            if Some(s) == w.stop {
                return;
            }
        }

        if state.is_rule_stop() {
            // Return into the caller; the rule may be re-entered from there.
            let rule = state.rule_index.unwrap_or(0);
            let was_called = std::mem::replace(&mut w.called[rule], false);
            if let (Some(ret), Some(parent)) = (ctx.return_state(), ctx.parent()) {
                self.walk(ret, parent.clone(), w);
            }
            w.called[rule] = was_called;
            return;
        }

        for t in &state.transitions {
            match &t.kind {
                TransitionKind::Rule {
                    rule_index,
                    follow_state,
                    ..
                } => {
                    if w.called[*rule_index] {
                        continue;
                    }
                    let pushed = CallContext::push(&ctx, *follow_state);
                    w.called[*rule_index] = true;
                    self.walk(t.target, pushed, w);
                    w.called[*rule_index] = false;
                }
                TransitionKind::Predicate { .. } | TransitionKind::Precedence(_) => {
                    if w.see_thru_preds {
                        self.walk(t.target, ctx.clone(), w);
                    } else {
                        w.look.add(HIT_PRED);
                    }
                }
                _ if t.is_epsilon() => self.walk(t.target, ctx.clone(), w),
                TransitionKind::Wildcard => {
                    w.look
                        .add_range(self.atn.min_symbol(), self.atn.max_symbol());
                }
                TransitionKind::NotSet(set) => {
                    w.look.add_set(
                        &set.complement(self.atn.min_symbol(), self.atn.max_symbol()),
                    );
                }
                _ => {
                    if let Some(label) = t.label() {
                        w.look.add_set(&label);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GrammarBuilder, alts, eof, opt, rule, seq, star, tok};

    // s : A b? EOF ; b : B | C ;
    fn sample() -> Atn {
        let mut g = GrammarBuilder::parser("sample");
        let a = g.token("A", None);
        let b = g.token("B", None);
        let c = g.token("C", None);
        g.rule("s", seq([tok(a), opt(rule("b")), eof()]));
        g.rule("b", alts([tok(b), tok(c)]));
        g.build_atn().unwrap()
    }

    #[test]
    fn first_set_of_rule() {
        let atn = sample();
        let start = atn.rule_to_start_state[1];
        assert_eq!(atn.next_tokens(start).to_string(), "{2, 3}");
    }

    #[test]
    fn rule_end_reports_epsilon() {
        let atn = sample();
        let stop = atn.rule_to_stop_state[1];
        assert_eq!(atn.next_tokens(stop), &IntervalSet::of(EPSILON));
    }

    #[test]
    fn optional_rule_falls_through_to_eof() {
        let atn = sample();
        // After A in `s`: B, C (from b) or the EOF atom.
        let start = atn.rule_to_start_state[0];
        let after_a = atn
            .states
            .iter()
            .find(|st| {
                st.rule_index == Some(0)
                    && st.transitions.iter().any(|t| t.kind == TransitionKind::Atom(1))
            })
            .map(|st| st.transitions[0].target)
            .unwrap();
        assert_ne!(after_a, start);
        let set = atn.next_tokens(after_a);
        assert!(set.contains(2));
        assert!(set.contains(3));
        assert!(set.contains(EOF));
    }

    #[test]
    fn decision_lookahead_per_alt() {
        let mut g = GrammarBuilder::parser("loop");
        let a = g.token("A", None);
        let b = g.token("B", None);
        g.rule("s", seq([star(tok(a)), tok(b)]));
        let atn = g.build_atn().unwrap();
        let decision = atn.decision_to_state[0];
        let sets = Ll1Analyzer::new(&atn).decision_lookahead(decision);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0], Some(IntervalSet::of(a)));
        assert_eq!(sets[1], Some(IntervalSet::of(b)));
    }

    #[test]
    fn context_follows_return_states() {
        let atn = sample();
        // Invoke `b` from `s` and look past its end.
        let invoking = atn
            .states
            .iter()
            .find(|st| {
                st.transitions
                    .iter()
                    .any(|t| matches!(t.kind, TransitionKind::Rule { .. }))
            })
            .unwrap()
            .index;
        let ctx = atn.context_for(&[invoking]);
        let stop = atn.rule_to_stop_state[1];
        assert_eq!(atn.next_tokens_in_context(stop, &ctx), IntervalSet::of(EOF));
    }
}
