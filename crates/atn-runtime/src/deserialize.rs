// Serialized ATN -> `Atn`: section decoding, derived links, verification.
//
// Payload sections, in order (all 16-bit words):
//   version, uuid (8), grammar type, max token type,
//   states      count, then per state: kind [rule] [extra]
//   non-greedy  count, state...
//   precedence  count, rule start state...
//   rules       count, then per rule: start state [token type (lexer)]
//   modes       count, start state...
//   sets        16-bit sets, then 32-bit sets; each: intervals, has-EOF, bounds
//   edges       count, then per edge: src trg kind arg1 arg2 arg3
//   decisions   count, state...
//   actions     (lexer) count, then per action: kind data1 data2
//   names       literal names, symbolic names, rule names

use atn_core::token::EOF;
use atn_core::{IntervalSet, Vocabulary};

use crate::atn::{Atn, GrammarType};
use crate::format::{self, WordReader};
use crate::lexer_action::LexerAction;
use crate::state::{AtnState, StateId, StateKind};
use crate::transition::{self, Transition, TransitionKind};
use crate::{DecodeError, NONE_WORD, SERIALIZED_VERSION};

/// Decode a serialized ATN.
///
/// Fails on any structural problem; a successful result has every derived
/// link (rule returns, block ends, loop backs, decisions) filled in.
pub fn deserialize(data: &[u8]) -> Result<Atn, DecodeError> {
    let header = format::parse_header(data)?;
    let words = format::payload_words(data, header);
    let mut r = WordReader::new(&words);

    let version = r.read()?;
    if version != SERIALIZED_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: version,
            expected: SERIALIZED_VERSION,
        });
    }
    let uuid = r.read_u128()?;
    let grammar_type = match r.read()? {
        0 => GrammarType::Lexer,
        1 => GrammarType::Parser,
        other => return Err(DecodeError::UnknownGrammarType(other)),
    };
    let max_token_type = r.read()? as i32;

    let mut states = read_states(&mut r)?;
    let count = states.len();

    for _ in 0..r.read_usize()? {
        let s = state_index(r.read_usize()?, count)?;
        states[s].non_greedy = true;
    }
    for _ in 0..r.read_usize()? {
        let s = state_index(r.read_usize()?, count)?;
        if states[s].kind != StateKind::RuleStart {
            return Err(DecodeError::Malformed(format!(
                "precedence entry {s} is not a rule start"
            )));
        }
        states[s].left_recursive = true;
    }

    let nrules = r.read_usize()?;
    let mut rule_to_start_state = Vec::with_capacity(nrules);
    let mut rule_to_token_type = Vec::new();
    for _ in 0..nrules {
        rule_to_start_state.push(state_index(r.read_usize()?, count)?);
        if grammar_type == GrammarType::Lexer {
            let t = r.read()?;
            rule_to_token_type.push(if t == NONE_WORD { EOF } else { t as i32 });
        }
    }
    let mut rule_to_stop_state = vec![usize::MAX; nrules];
    for s in &states {
        if s.kind == StateKind::RuleStop {
            let rule = s.rule_index.unwrap_or(usize::MAX);
            if rule >= nrules {
                return Err(DecodeError::IndexOutOfBounds {
                    what: "rule",
                    index: rule,
                    count: nrules,
                });
            }
            rule_to_stop_state[rule] = s.index;
        }
    }
    for (rule, &start) in rule_to_start_state.iter().enumerate() {
        if rule_to_stop_state[rule] == usize::MAX {
            return Err(DecodeError::Malformed(format!("rule {rule} has no stop state")));
        }
        states[start].stop_state = Some(rule_to_stop_state[rule]);
    }

    let nmodes = r.read_usize()?;
    let mut mode_to_start_state = Vec::with_capacity(nmodes);
    for _ in 0..nmodes {
        mode_to_start_state.push(state_index(r.read_usize()?, count)?);
    }

    let mut sets = read_sets(&mut r, false)?;
    sets.extend(read_sets(&mut r, true)?);

    read_edges(&mut r, &mut states, &sets, &rule_to_start_state)?;
    derive_rule_returns(&mut states, &rule_to_stop_state);
    derive_block_links(&mut states)?;

    let ndecisions = r.read_usize()?;
    let mut decision_to_state = Vec::with_capacity(ndecisions);
    for d in 0..ndecisions {
        let s = state_index(r.read_usize()?, count)?;
        if !states[s].kind.is_decision() {
            return Err(DecodeError::Malformed(format!(
                "decision {d} refers to non-decision state {s}"
            )));
        }
        states[s].decision = Some(d);
        decision_to_state.push(s);
    }

    let mut lexer_actions = Vec::new();
    if grammar_type == GrammarType::Lexer {
        for index in 0..r.read_usize()? {
            let kind = r.read()?;
            let (d1, d2) = (r.read()?, r.read()?);
            let action = LexerAction::from_words(kind, d1, d2)
                .ok_or(DecodeError::UnknownLexerAction { index, kind })?;
            lexer_actions.push(action);
        }
    }

    let literal_names = read_names(&mut r)?;
    let symbolic_names = read_names(&mut r)?;
    let rule_names: Vec<String> = read_names(&mut r)?
        .into_iter()
        .enumerate()
        .map(|(i, n)| n.unwrap_or_else(|| format!("rule{i}")))
        .collect();
    r.finish()?;

    mark_precedence_decisions(&mut states, &rule_to_start_state);

    let atn = Atn {
        grammar_type,
        uuid,
        max_token_type,
        states,
        decision_to_state,
        rule_to_start_state,
        rule_to_stop_state,
        rule_to_token_type,
        mode_to_start_state,
        lexer_actions,
        vocabulary: Vocabulary::new(literal_names, symbolic_names),
        rule_names,
    };
    verify(&atn)?;
    log::debug!(
        "decoded {:?} ATN: {} states, {} rules, {} decisions",
        atn.grammar_type,
        atn.states.len(),
        atn.num_rules(),
        atn.num_decisions()
    );
    Ok(atn)
}

fn state_index(index: usize, count: usize) -> Result<StateId, DecodeError> {
    if index < count {
        Ok(index)
    } else {
        Err(DecodeError::StateOutOfBounds { index, count })
    }
}

fn read_states(r: &mut WordReader<'_>) -> Result<Vec<AtnState>, DecodeError> {
    let n = r.read_usize()?;
    let mut states = Vec::with_capacity(n);
    let mut loop_backs = Vec::new();
    let mut end_states = Vec::new();
    for i in 0..n {
        let code = r.read()?;
        let kind =
            StateKind::from_u16(code).ok_or(DecodeError::UnknownStateKind { state: i, kind: code })?;
        if kind == StateKind::Invalid {
            states.push(AtnState::new(i, kind, None));
            continue;
        }
        let rule_index = r.read_opt()?;
        match kind {
            StateKind::LoopEnd => loop_backs.push((i, r.read_usize()?)),
            k if k.is_block_start() => end_states.push((i, r.read_usize()?)),
            _ => {}
        }
        states.push(AtnState::new(i, kind, rule_index));
    }
    for (s, target) in loop_backs {
        states[s].loop_back = Some(state_index(target, n)?);
    }
    for (s, target) in end_states {
        states[s].end_state = Some(state_index(target, n)?);
    }
    Ok(states)
}

fn read_sets(r: &mut WordReader<'_>, wide: bool) -> Result<Vec<IntervalSet>, DecodeError> {
    let n = r.read_usize()?;
    let mut sets = Vec::with_capacity(n);
    for _ in 0..n {
        let intervals = r.read_usize()?;
        let mut set = IntervalSet::new();
        if r.read()? != 0 {
            set.add(EOF);
        }
        for _ in 0..intervals {
            let (a, b) = if wide {
                (r.read_u32()? as i32, r.read_u32()? as i32)
            } else {
                (r.read()? as i32, r.read()? as i32)
            };
            set.add_range(a, b);
        }
        sets.push(set);
    }
    Ok(sets)
}

fn read_edges(
    r: &mut WordReader<'_>,
    states: &mut [AtnState],
    sets: &[IntervalSet],
    rule_to_start_state: &[StateId],
) -> Result<(), DecodeError> {
    let count = states.len();
    let nedges = r.read_usize()?;
    for edge in 0..nedges {
        let src = state_index(r.read_usize()?, count)?;
        let trg = state_index(r.read_usize()?, count)?;
        let code = r.read()?;
        let (a1, a2, a3) = (r.read()?, r.read()?, r.read()?);
        let set = |i: u16| {
            sets.get(i as usize).cloned().ok_or(DecodeError::IndexOutOfBounds {
                what: "set",
                index: i as usize,
                count: sets.len(),
            })
        };
        let symbol = |v: u16, eof_flag: u16| if eof_flag != 0 { EOF } else { v as i32 };
        let t = match code {
            transition::EPSILON => Transition::epsilon(trg),
            transition::RANGE => Transition::new(
                trg,
                TransitionKind::Range {
                    from: symbol(a1, a3),
                    to: a2 as i32,
                },
            ),
            transition::RULE => {
                let rule_start = state_index(a1 as usize, count)?;
                let rule_index = a2 as usize;
                if rule_to_start_state.get(rule_index) != Some(&rule_start) {
                    return Err(DecodeError::Malformed(format!(
                        "edge {edge}: rule transition to {rule_start} does not start rule {rule_index}"
                    )));
                }
                Transition::new(
                    rule_start,
                    TransitionKind::Rule {
                        rule_index,
                        precedence: a3 as i32,
                        follow_state: trg,
                    },
                )
            }
            transition::PREDICATE => Transition::new(
                trg,
                TransitionKind::Predicate {
                    rule_index: a1 as usize,
                    pred_index: a2 as usize,
                    ctx_dependent: a3 != 0,
                },
            ),
            transition::ATOM => Transition::new(trg, TransitionKind::Atom(symbol(a1, a3))),
            transition::ACTION => Transition::new(
                trg,
                TransitionKind::Action {
                    rule_index: a1 as usize,
                    action_index: (a2 != NONE_WORD).then_some(a2 as usize),
                    ctx_dependent: a3 != 0,
                },
            ),
            transition::SET => Transition::new(trg, TransitionKind::Set(set(a1)?)),
            transition::NOT_SET => Transition::new(trg, TransitionKind::NotSet(set(a1)?)),
            transition::WILDCARD => Transition::new(trg, TransitionKind::Wildcard),
            transition::PRECEDENCE => Transition::new(trg, TransitionKind::Precedence(a1 as i32)),
            kind => return Err(DecodeError::UnknownTransitionKind { edge, kind }),
        };
        if states[src].kind == StateKind::Invalid {
            return Err(DecodeError::Malformed(format!(
                "edge {edge} leaves invalid state {src}"
            )));
        }
        states[src].add_transition(t);
    }
    Ok(())
}

/// Add an epsilon edge from each rule's stop state to every follow state of
/// an invocation of that rule.
fn derive_rule_returns(states: &mut [AtnState], rule_to_stop_state: &[StateId]) {
    let mut returns = Vec::new();
    for s in states.iter() {
        for t in &s.transitions {
            if let TransitionKind::Rule {
                rule_index,
                precedence,
                follow_state,
            } = t.kind
            {
                let outermost = (states[t.target].left_recursive && precedence == 0)
                    .then_some(rule_index);
                returns.push((rule_to_stop_state[rule_index], follow_state, outermost));
            }
        }
    }
    for (stop, follow, outermost) in returns {
        states[stop].add_transition(Transition::new(
            follow,
            TransitionKind::Epsilon {
                outermost_precedence_return: outermost,
            },
        ));
    }
}

fn derive_block_links(states: &mut [AtnState]) -> Result<(), DecodeError> {
    for i in 0..states.len() {
        let kind = states[i].kind;
        if kind.is_block_start() {
            let Some(end) = states[i].end_state else {
                continue;
            };
            if states[end].kind != StateKind::BlockEnd {
                return Err(DecodeError::Malformed(format!(
                    "block start {i} ends in non-block-end state {end}"
                )));
            }
            if states[end].start_state.is_some() {
                return Err(DecodeError::Malformed(format!(
                    "block end {end} is shared by several block starts"
                )));
            }
            states[end].start_state = Some(i);
        }
        let loop_target = match kind {
            StateKind::PlusLoopBack => Some(StateKind::PlusBlockStart),
            StateKind::StarLoopBack => Some(StateKind::StarLoopEntry),
            _ => None,
        };
        if let Some(wanted) = loop_target {
            let targets: Vec<StateId> = states[i]
                .transitions
                .iter()
                .map(|t| t.target)
                .filter(|&t| states[t].kind == wanted)
                .collect();
            for t in targets {
                states[t].loop_back = Some(i);
            }
        }
    }
    Ok(())
}

/// A `StarLoopEntry` in a left-recursive rule whose exit branch leads
/// straight to the rule end decides whether the rule iterates again.
fn mark_precedence_decisions(states: &mut [AtnState], rule_to_start_state: &[StateId]) {
    for i in 0..states.len() {
        let s = &states[i];
        if s.kind != StateKind::StarLoopEntry {
            continue;
        }
        let Some(rule) = s.rule_index else {
            continue;
        };
        if !rule_to_start_state
            .get(rule)
            .is_some_and(|&start| states[start].left_recursive)
        {
            continue;
        }
        let Some(exit) = s.transitions.last().map(|t| t.target) else {
            continue;
        };
        if states[exit].kind != StateKind::LoopEnd || !states[exit].epsilon_only {
            continue;
        }
        let after = states[exit].transitions[0].target;
        if states[after].kind == StateKind::RuleStop {
            states[i].precedence_decision = true;
        }
    }
}

fn read_names(r: &mut WordReader<'_>) -> Result<Vec<Option<String>>, DecodeError> {
    let n = r.read_usize()?;
    (0..n).map(|_| r.read_opt_string()).collect()
}

fn verify(atn: &Atn) -> Result<(), DecodeError> {
    let fail = |msg: String| Err(DecodeError::Malformed(msg));
    for s in &atn.states {
        let i = s.index;
        if s.has_mixed_transitions() {
            return fail(format!("state {i} mixes epsilon and symbol transitions"));
        }
        let ok = match s.kind {
            StateKind::Invalid => s.transitions.is_empty(),
            StateKind::PlusBlockStart => s.loop_back.is_some() && s.end_state.is_some(),
            StateKind::StarLoopEntry => s.loop_back.is_some() && s.transitions.len() == 2,
            StateKind::LoopEnd => s.loop_back.is_some(),
            StateKind::RuleStart => s.stop_state.is_some(),
            StateKind::BlockStart | StateKind::StarBlockStart => s.end_state.is_some(),
            StateKind::BlockEnd => s.start_state.is_some(),
            StateKind::StarLoopBack => {
                s.transitions.len() == 1
                    && atn.states[s.transitions[0].target].kind == StateKind::StarLoopEntry
            }
            StateKind::PlusLoopBack => s.transitions.len() == 2,
            StateKind::RuleStop => true,
            StateKind::Basic | StateKind::TokenStart => true,
        };
        if !ok {
            return fail(format!("state {i} ({:?}) is incomplete", s.kind));
        }
        if s.decision.is_some() && s.transitions.is_empty() {
            return fail(format!("decision state {i} has no transitions"));
        }
        if s.transitions.len() > 1 {
            let may_branch = s.kind == StateKind::RuleStop || s.decision.is_some();
            if !may_branch {
                return fail(format!(
                    "state {i} ({:?}) has {} transitions but no decision",
                    s.kind,
                    s.transitions.len()
                ));
            }
        }
    }
    for (mode, &s) in atn.mode_to_start_state.iter().enumerate() {
        if atn.states[s].kind != StateKind::TokenStart {
            return fail(format!("mode {mode} does not start at a token start state"));
        }
    }
    for (rule, &s) in atn.rule_to_start_state.iter().enumerate() {
        if atn.states[s].kind != StateKind::RuleStart || atn.states[s].rule_index != Some(rule) {
            return fail(format!("rule {rule} does not start at its rule start state"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GrammarBuilder, alts, eof, opt, plus, rule, seq, star, tok};
    use crate::format::WordWriter;

    fn sample_blob() -> Vec<u8> {
        let mut g = GrammarBuilder::parser("decode");
        let a = g.token("A", Some("'a'"));
        let b = g.token("B", None);
        g.rule("s", seq([plus(rule("x")), opt(tok(b)), eof()]));
        g.rule("x", alts([tok(a), seq([tok(b), star(tok(a))])]));
        g.build().unwrap()
    }

    #[test]
    fn decode_builder_output() {
        let atn = deserialize(&sample_blob()).unwrap();
        assert_eq!(atn.grammar_type, GrammarType::Parser);
        assert_eq!(atn.max_token_type, 2);
        assert_eq!(atn.num_rules(), 2);
        assert_eq!(atn.rule_names, vec!["s", "x"]);
        assert_eq!(atn.vocabulary.display_name(1), "'a'");
        assert_eq!(atn.vocabulary.display_name(2), "B");
        // plus loop back, optional block, x block, star loop entry
        assert_eq!(atn.num_decisions(), 4);
        for (d, &s) in atn.decision_to_state.iter().enumerate() {
            assert_eq!(atn.states[s].decision, Some(d));
        }
    }

    #[test]
    fn rule_stop_gets_return_edges() {
        let atn = deserialize(&sample_blob()).unwrap();
        let stop = &atn.states[atn.rule_to_stop_state[1]];
        assert_eq!(stop.transitions.len(), 1);
        assert!(stop.epsilon_only);
    }

    #[test]
    fn loop_links_are_derived() {
        let atn = deserialize(&sample_blob()).unwrap();
        for s in &atn.states {
            match s.kind {
                StateKind::PlusBlockStart | StateKind::StarLoopEntry | StateKind::LoopEnd => {
                    assert!(s.loop_back.is_some(), "state {} lacks loop back", s.index)
                }
                StateKind::BlockEnd => assert!(s.start_state.is_some()),
                _ => {}
            }
        }
    }

    #[test]
    fn deterministic_decode() {
        let blob = sample_blob();
        let a = deserialize(&blob).unwrap();
        let b = deserialize(&blob).unwrap();
        assert_eq!(a.states.len(), b.states.len());
        for (x, y) in a.states.iter().zip(&b.states) {
            assert_eq!(x.kind, y.kind);
            assert_eq!(x.transitions, y.transitions);
            assert_eq!(x.decision, y.decision);
        }
    }

    #[test]
    fn rejects_bad_version() {
        let mut blob = sample_blob();
        blob[8] = 3;
        assert_eq!(
            deserialize(&blob).unwrap_err(),
            DecodeError::UnsupportedVersion {
                found: 3,
                expected: 4
            }
        );
    }

    #[test]
    fn rejects_truncated_and_trailing() {
        let blob = sample_blob();
        let mut words = format::payload_words(&blob, format::parse_header(&blob).unwrap());

        let mut w = WordWriter::new();
        for &x in &words[..words.len() - 1] {
            w.push(x);
        }
        assert!(matches!(
            deserialize(&w.into_bytes()),
            Err(DecodeError::UnexpectedEnd { .. })
        ));

        words.push(0);
        let mut w = WordWriter::new();
        for &x in &words {
            w.push(x);
        }
        assert_eq!(
            deserialize(&w.into_bytes()).unwrap_err(),
            DecodeError::TrailingData { words: 1 }
        );
    }

    fn minimal(states: &[u16], edges: &[[u16; 6]]) -> Vec<u8> {
        let mut w = WordWriter::new();
        w.push(SERIALIZED_VERSION);
        w.push_u128(7);
        w.push(1);
        w.push(1);
        w.push((states.len() / 2) as u16);
        for pair in states.chunks(2) {
            w.push(pair[0]);
            w.push(pair[1]);
        }
        w.push(0); // non-greedy
        w.push(0); // precedence
        w.push(1); // rules
        w.push(0);
        w.push(0); // modes
        w.push(0); // sets
        w.push(0);
        w.push(edges.len() as u16);
        for e in edges {
            for &x in e {
                w.push(x);
            }
        }
        w.push(0); // decisions
        w.push(0); // names
        w.push(0);
        w.push(0);
        w.into_bytes()
    }

    #[test]
    fn minimal_rule_decodes() {
        // RuleStart(0) --atom 1--> RuleStop(1)
        let blob = minimal(&[2, 0, 7, 0], &[[0, 1, transition::ATOM, 1, 0, 0]]);
        let atn = deserialize(&blob).unwrap();
        assert_eq!(atn.rule_to_stop_state, vec![1]);
        assert_eq!(atn.rule_name(0), "rule0");
    }

    #[test]
    fn rejects_state_out_of_bounds() {
        let blob = minimal(&[2, 0, 7, 0], &[[0, 9, transition::ATOM, 1, 0, 0]]);
        assert_eq!(
            deserialize(&blob).unwrap_err(),
            DecodeError::StateOutOfBounds { index: 9, count: 2 }
        );
    }

    #[test]
    fn rejects_unknown_kinds() {
        let blob = minimal(&[2, 0, 99, 0], &[]);
        assert_eq!(
            deserialize(&blob).unwrap_err(),
            DecodeError::UnknownStateKind { state: 1, kind: 99 }
        );
        let blob = minimal(&[2, 0, 7, 0], &[[0, 1, 42, 0, 0, 0]]);
        assert_eq!(
            deserialize(&blob).unwrap_err(),
            DecodeError::UnknownTransitionKind { edge: 0, kind: 42 }
        );
    }

    #[test]
    fn rejects_unknown_set_and_mixed_state() {
        let blob = minimal(&[2, 0, 7, 0], &[[0, 1, transition::SET, 3, 0, 0]]);
        assert!(matches!(
            deserialize(&blob),
            Err(DecodeError::IndexOutOfBounds { what: "set", .. })
        ));

        // Basic state with both an atom and an epsilon edge.
        let blob = minimal(
            &[2, 0, 1, 0, 7, 0],
            &[
                [0, 1, transition::EPSILON, 0, 0, 0],
                [1, 2, transition::ATOM, 1, 0, 0],
                [1, 2, transition::EPSILON, 0, 0, 0],
            ],
        );
        assert!(matches!(deserialize(&blob), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn rejects_missing_stop_state() {
        let blob = minimal(&[2, 0, 1, 0], &[]);
        assert!(matches!(deserialize(&blob), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn rejects_decision_without_transitions() {
        let mut g = GrammarBuilder::parser("empty");
        let a = g.token("A", None);
        let b = g.token("B", None);
        g.rule("s", alts([tok(a), seq([tok(a), tok(b)])]));
        let mut atn = g.build_atn().unwrap();
        let decision = atn.decision_to_state[0];
        assert_eq!(atn.states[decision].kind, StateKind::BlockStart);
        atn.states[decision].transitions.clear();

        match deserialize(&crate::serialize::serialize(&atn).unwrap()) {
            Err(DecodeError::Malformed(msg)) => {
                assert_eq!(msg, format!("decision state {decision} has no transitions"));
            }
            other => panic!("expected a malformed ATN, got {other:?}"),
        }
    }
}
