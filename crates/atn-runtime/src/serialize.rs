// `Atn` -> serialized blob. Inverse of `deserialize`; derived links (rule
// return edges, block end back links, loop-back targets other than LoopEnd's)
// are not written.

use atn_core::IntervalSet;
use atn_core::token::EOF;

use crate::atn::{Atn, GrammarType};
use crate::format::WordWriter;
use crate::state::{StateId, StateKind};
use crate::transition::{self, Transition, TransitionKind};
use crate::{EncodeError, NONE_WORD, SERIALIZED_VERSION};

/// Encode `atn` in the blob format read by
/// [`deserialize`](crate::deserialize::deserialize).
///
/// Atoms and ranges above `0xFFFF` are written as set edges, since edge
/// arguments are 16 bits wide. Names longer than a length word can count
/// are rejected.
pub fn serialize(atn: &Atn) -> Result<Vec<u8>, EncodeError> {
    let mut w = WordWriter::new();
    w.push(SERIALIZED_VERSION);
    w.push_u128(atn.uuid);
    w.push(atn.grammar_type as u16);
    w.push(atn.max_token_type as u16);

    w.push(atn.states.len() as u16);
    for s in &atn.states {
        w.push(s.kind.code());
        if s.kind == StateKind::Invalid {
            continue;
        }
        w.push_opt(s.rule_index);
        if s.kind == StateKind::LoopEnd {
            w.push(s.loop_back.unwrap_or(0) as u16);
        } else if s.kind.is_block_start() {
            w.push(s.end_state.unwrap_or(0) as u16);
        }
    }

    let non_greedy: Vec<StateId> = atn
        .states
        .iter()
        .filter(|s| s.non_greedy)
        .map(|s| s.index)
        .collect();
    push_list(&mut w, &non_greedy);
    let precedence: Vec<StateId> = atn
        .states
        .iter()
        .filter(|s| s.kind == StateKind::RuleStart && s.left_recursive)
        .map(|s| s.index)
        .collect();
    push_list(&mut w, &precedence);

    w.push(atn.num_rules() as u16);
    for (rule, &start) in atn.rule_to_start_state.iter().enumerate() {
        w.push(start as u16);
        if atn.grammar_type == GrammarType::Lexer {
            let t = atn.rule_to_token_type.get(rule).copied().unwrap_or(0);
            w.push(if t == EOF { NONE_WORD } else { t as u16 });
        }
    }
    push_list(&mut w, &atn.mode_to_start_state);

    let edges = collect_edges(atn);
    let mut narrow: Vec<&IntervalSet> = Vec::new();
    let mut wide: Vec<&IntervalSet> = Vec::new();
    for set in edges.iter().filter_map(|e| e.set.as_ref()) {
        let table = if fits_narrow(set) { &mut narrow } else { &mut wide };
        if !table.contains(&set) {
            table.push(set);
        }
    }
    push_sets(&mut w, &narrow, false);
    push_sets(&mut w, &wide, true);

    w.push(edges.len() as u16);
    for e in &edges {
        let a1 = match &e.set {
            Some(set) => narrow
                .iter()
                .position(|s| *s == set)
                .or_else(|| wide.iter().position(|s| *s == set).map(|i| i + narrow.len()))
                .unwrap_or(0) as u16,
            None => e.args[0],
        };
        for x in [e.src, e.trg, e.code, a1, e.args[1], e.args[2]] {
            w.push(x);
        }
    }

    push_list(&mut w, &atn.decision_to_state);

    if atn.grammar_type == GrammarType::Lexer {
        w.push(atn.lexer_actions.len() as u16);
        for a in &atn.lexer_actions {
            let (k, d1, d2) = a.to_words();
            w.push(k);
            w.push(d1);
            w.push(d2);
        }
    }

    push_names(&mut w, atn.vocabulary.literal_names())?;
    push_names(&mut w, atn.vocabulary.symbolic_names())?;
    let rule_names: Vec<Option<String>> = atn.rule_names.iter().cloned().map(Some).collect();
    push_names(&mut w, &rule_names)?;

    Ok(w.into_bytes())
}

/// One serialized edge. Set-labelled edges carry their set until the set
/// tables are laid out.
struct Edge {
    src: u16,
    trg: u16,
    code: u16,
    args: [u16; 3],
    set: Option<IntervalSet>,
}

fn collect_edges(atn: &Atn) -> Vec<Edge> {
    let mut edges = Vec::new();
    for s in &atn.states {
        if s.kind == StateKind::RuleStop {
            continue;
        }
        for t in &s.transitions {
            edges.push(encode_edge(s.index, t));
        }
    }
    edges
}

fn fits_narrow(set: &IntervalSet) -> bool {
    set.intervals()
        .iter()
        .all(|iv| (iv.a == EOF || iv.a >= 0) && iv.b <= 0xFFFF)
}

fn encode_edge(src: StateId, t: &Transition) -> Edge {
    let edge = |trg: StateId, code: u16, args: [u16; 3]| Edge {
        src: src as u16,
        trg: trg as u16,
        code,
        args,
        set: None,
    };
    let as_set = |set: IntervalSet| Edge {
        src: src as u16,
        trg: t.target as u16,
        code: transition::SET,
        args: [0; 3],
        set: Some(set),
    };
    let eof = |v: i32| if v == EOF { (0, 1) } else { (v as u16, 0) };
    let code = t.code();
    match &t.kind {
        TransitionKind::Epsilon { .. } | TransitionKind::Wildcard => edge(t.target, code, [0; 3]),
        TransitionKind::Range { to, .. } | TransitionKind::Atom(to) if *to > 0xFFFF => {
            as_set(t.label().unwrap_or_default())
        }
        TransitionKind::Range { from, to } => {
            let (a, flag) = eof(*from);
            edge(t.target, code, [a, *to as u16, flag])
        }
        TransitionKind::Atom(a) => {
            let (a, flag) = eof(*a);
            edge(t.target, code, [a, 0, flag])
        }
        TransitionKind::Rule {
            rule_index,
            precedence,
            follow_state,
        } => edge(
            *follow_state,
            code,
            [t.target as u16, *rule_index as u16, *precedence as u16],
        ),
        TransitionKind::Predicate {
            rule_index,
            pred_index,
            ctx_dependent,
        } => edge(
            t.target,
            code,
            [*rule_index as u16, *pred_index as u16, *ctx_dependent as u16],
        ),
        TransitionKind::Action {
            rule_index,
            action_index,
            ctx_dependent,
        } => edge(
            t.target,
            code,
            [
                *rule_index as u16,
                action_index.map_or(NONE_WORD, |i| i as u16),
                *ctx_dependent as u16,
            ],
        ),
        TransitionKind::Set(set) | TransitionKind::NotSet(set) => Edge {
            set: Some(set.clone()),
            ..edge(t.target, code, [0; 3])
        },
        TransitionKind::Precedence(p) => edge(t.target, code, [*p as u16, 0, 0]),
    }
}

fn push_list(w: &mut WordWriter, items: &[StateId]) {
    w.push(items.len() as u16);
    for &i in items {
        w.push(i as u16);
    }
}

fn push_sets(w: &mut WordWriter, sets: &[&IntervalSet], wide: bool) {
    w.push(sets.len() as u16);
    for set in sets {
        let has_eof = set.contains(EOF);
        let mut body = (*set).clone();
        body.remove(EOF);
        w.push(body.intervals().len() as u16);
        w.push(has_eof as u16);
        for iv in body.intervals() {
            if wide {
                w.push_u32(iv.a as u32);
                w.push_u32(iv.b as u32);
            } else {
                w.push(iv.a as u16);
                w.push(iv.b as u16);
            }
        }
    }
}

fn push_names(w: &mut WordWriter, names: &[Option<String>]) -> Result<(), EncodeError> {
    w.push(names.len() as u16);
    for n in names {
        w.push_opt_string(n.as_deref())?;
    }
    Ok(())
}
