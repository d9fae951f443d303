//! End-to-end prediction scenarios over grammars loaded from serialized blobs.
//!
//! Run: cargo test -p atn-runtime --test prediction

use std::sync::Arc;

use atn_core::token::EOF;
use atn_runtime::builder::{GrammarBuilder, alts, eof, rule, seq, tok};
use atn_runtime::dfa::DfaState;
use atn_runtime::stream::{CommonTokenStream, IntStream, ListTokenSource};
use atn_runtime::transition::TransitionKind;
use atn_runtime::{AcceptAll, Grammar, PredictionError, PredictionMode, StateId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn stream(types: &[i32]) -> CommonTokenStream<ListTokenSource> {
    CommonTokenStream::new(ListTokenSource::from_types(types))
}

/// Round-trip through bytes so every scenario exercises the decoder.
fn load(builder: &GrammarBuilder) -> Grammar {
    let blob = builder.build().unwrap();
    Grammar::from_bytes(&blob).unwrap()
}

/// s : x EOF ;  x : 'a' | 'a' 'b' ;
fn prefix_grammar() -> (Grammar, i32, i32) {
    let mut g = GrammarBuilder::parser("prefix");
    let a = g.token("A", Some("'a'"));
    let b = g.token("B", Some("'b'"));
    g.rule("s", seq([rule("x"), eof()]));
    g.rule("x", alts([tok(a), seq([tok(a), tok(b)])]));
    (load(&g), a, b)
}

/// s : X r A B EOF | Y r B EOF ;  r : A | ;
fn context_grammar() -> (Grammar, [i32; 4]) {
    let mut g = GrammarBuilder::parser("ctx");
    let x = g.token("X", None);
    let y = g.token("Y", None);
    let a = g.token("A", None);
    let b = g.token("B", None);
    g.rule(
        "s",
        alts([
            seq([tok(x), rule("r"), tok(a), tok(b), eof()]),
            seq([tok(y), rule("r"), tok(b), eof()]),
        ]),
    );
    g.rule("r", alts([tok(a), seq([])]));
    (load(&g), [x, y, a, b])
}

fn decision_in_rule(grammar: &Grammar, name: &str) -> usize {
    let atn = grammar.atn();
    let rule_index = atn.rule_index(name).unwrap();
    (0..atn.num_decisions())
        .find(|&d| atn.states[atn.decision_to_state[d]].rule_index == Some(rule_index))
        .unwrap()
}

fn call_sites(grammar: &Grammar, name: &str) -> Vec<StateId> {
    let atn = grammar.atn();
    let rule_index = atn.rule_index(name).unwrap();
    atn.states
        .iter()
        .filter(|s| {
            s.transitions.first().is_some_and(|t| {
                matches!(t.kind, TransitionKind::Rule { rule_index: r, .. } if r == rule_index)
            })
        })
        .map(|s| s.index)
        .collect()
}

fn assert_unique_states(states: &[Arc<DfaState>]) {
    for (i, a) in states.iter().enumerate() {
        for b in &states[i + 1..] {
            assert_ne!(a.configs, b.configs, "states {} and {} share a config set", a.id, b.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn shared_prefix_resolves_to_lowest_alternative() {
    let (grammar, a, b) = prefix_grammar();
    let decision = decision_in_rule(&grammar, "x");

    let mut input = stream(&[a, EOF]);
    let p = grammar
        .adaptive_predict(&mut input, decision, &[], &AcceptAll)
        .unwrap();
    assert_eq!(p.alt, 1);
    assert!(!p.full_context);
    assert!(p.ambiguity.is_none());
    // Prediction leaves the stream where it found it.
    assert_eq!(input.index(), 0);

    let mut input = stream(&[a, b, EOF]);
    let p = grammar
        .adaptive_predict(&mut input, decision, &[], &AcceptAll)
        .unwrap();
    assert_eq!(p.alt, 2);
}

#[test]
fn repeated_prediction_is_a_cache_hit() {
    let (grammar, a, b) = prefix_grammar();
    let decision = decision_in_rule(&grammar, "x");
    for input in [[a, b], [a, EOF]] {
        grammar
            .adaptive_predict(&mut stream(&input), decision, &[], &AcceptAll)
            .unwrap();
    }
    let before = grammar.cache_stats();
    for (input, alt) in [([a, b], 2), ([a, EOF], 1)] {
        let p = grammar
            .adaptive_predict(&mut stream(&input), decision, &[], &AcceptAll)
            .unwrap();
        assert_eq!(p.alt, alt);
    }
    assert_eq!(grammar.cache_stats(), before);
    assert_unique_states(&grammar.dfas()[decision].states());
}

#[test]
fn escalation_is_cached_and_sticky() {
    let (grammar, [_, _, a, b]) = context_grammar();
    let decision = decision_in_rule(&grammar, "r");
    let from_x = call_sites(&grammar, "r")[0];

    let first = grammar
        .adaptive_predict(&mut stream(&[a, b, EOF]), decision, &[from_x], &AcceptAll)
        .unwrap();
    assert_eq!(first.alt, 2);
    assert!(first.full_context);

    let dfa = &grammar.dfas()[decision];
    let flagged: Vec<_> = dfa
        .states()
        .iter()
        .filter(|s| s.requires_full_context)
        .map(|s| s.id)
        .collect();
    assert!(!flagged.is_empty());
    for s in dfa.states().iter().filter(|s| s.requires_full_context) {
        assert!(s.prediction.is_none());
    }

    let stats = grammar.cache_stats();
    let second = grammar
        .adaptive_predict(&mut stream(&[a, b, EOF]), decision, &[from_x], &AcceptAll)
        .unwrap();
    assert_eq!(second.alt, first.alt);
    assert!(second.full_context);
    assert_eq!(grammar.cache_stats(), stats);

    // Once flagged, a state stays flagged.
    for id in flagged {
        assert!(dfa.state(id).unwrap().requires_full_context);
    }
}

#[test]
fn call_site_changes_the_answer() {
    let (grammar, [_, _, a, b]) = context_grammar();
    let decision = decision_in_rule(&grammar, "r");
    let sites = call_sites(&grammar, "r");
    let (from_x, from_y) = (sites[0], sites[1]);

    // Called from the Y branch, "a b" means r matched the A.
    let p = grammar
        .adaptive_predict(&mut stream(&[a, b, EOF]), decision, &[from_y], &AcceptAll)
        .unwrap();
    assert_eq!(p.alt, 1);
    let p = grammar
        .adaptive_predict(&mut stream(&[a, b, EOF]), decision, &[from_x], &AcceptAll)
        .unwrap();
    assert_eq!(p.alt, 2);
}

#[test]
fn sll_mode_never_escalates() {
    let (mut grammar, [_, _, a, b]) = context_grammar();
    grammar.set_prediction_mode(PredictionMode::Sll);
    let decision = decision_in_rule(&grammar, "r");
    let from_x = call_sites(&grammar, "r")[0];
    let p = grammar
        .adaptive_predict(&mut stream(&[a, b, EOF]), decision, &[from_x], &AcceptAll)
        .unwrap();
    assert!(!p.full_context);
    assert_eq!(p.alt, 1);
}

#[test]
fn errors_leave_the_cache_consistent() {
    let (grammar, a, b) = prefix_grammar();
    let decision = decision_in_rule(&grammar, "x");

    let err = grammar
        .adaptive_predict(&mut stream(&[b]), decision, &[], &AcceptAll)
        .unwrap_err();
    match err {
        PredictionError::NoViableAlt(e) => {
            assert_eq!(e.decision, decision);
            assert_eq!(e.offending_index, 0);
            assert_eq!(e.offending_symbol, b);
        }
        other => panic!("expected no viable alternative, got {other}"),
    }

    grammar
        .adaptive_predict(&mut stream(&[a, b]), decision, &[], &AcceptAll)
        .unwrap();
    let stats = grammar.cache_stats();
    assert!(matches!(
        grammar.adaptive_predict(&mut stream(&[a, 99]), decision, &[], &AcceptAll),
        Err(PredictionError::InvalidSymbol { symbol: 99, index: 1, .. })
    ));
    assert_eq!(grammar.cache_stats(), stats);

    // The cache still answers correctly afterwards.
    let p = grammar
        .adaptive_predict(&mut stream(&[a, b]), decision, &[], &AcceptAll)
        .unwrap();
    assert_eq!(p.alt, 2);
    assert_unique_states(&grammar.dfas()[decision].states());
}

#[test]
fn clearing_the_cache_rebuilds_the_same_automaton() {
    let (mut grammar, a, b) = prefix_grammar();
    let decision = decision_in_rule(&grammar, "x");
    grammar
        .adaptive_predict(&mut stream(&[a, b]), decision, &[], &AcceptAll)
        .unwrap();
    let warm = grammar.cache_stats();
    grammar.clear_dfa_cache();
    assert_eq!(grammar.cache_stats().states, 0);
    grammar
        .adaptive_predict(&mut stream(&[a, b]), decision, &[], &AcceptAll)
        .unwrap();
    assert_eq!(grammar.cache_stats(), warm);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_predictions_share_one_cache() {
    let (grammar, a, b) = prefix_grammar();
    let decision = decision_in_rule(&grammar, "x");

    let alts: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    grammar
                        .adaptive_predict(&mut stream(&[a, b]), decision, &[], &AcceptAll)
                        .unwrap()
                        .alt
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(alts.iter().all(|&alt| alt == 2));

    let (reference, _, _) = prefix_grammar();
    reference
        .adaptive_predict(&mut stream(&[a, b]), decision, &[], &AcceptAll)
        .unwrap();
    assert_eq!(grammar.cache_stats(), reference.cache_stats());
    assert_unique_states(&grammar.dfas()[decision].states());
}

#[test]
fn concurrent_full_context_predictions() {
    let (grammar, [_, _, a, b]) = context_grammar();
    let decision = decision_in_rule(&grammar, "r");
    let sites = call_sites(&grammar, "r");

    std::thread::scope(|scope| {
        for i in 0..8 {
            let (site, expected) = if i % 2 == 0 { (sites[0], 2) } else { (sites[1], 1) };
            let grammar = &grammar;
            scope.spawn(move || {
                let p = grammar
                    .adaptive_predict(&mut stream(&[a, b, EOF]), decision, &[site], &AcceptAll)
                    .unwrap();
                assert_eq!(p.alt, expected);
            });
        }
    });
    assert_unique_states(&grammar.dfas()[decision].states());
}
