//! Property tests for configuration sets, the DFA cache and the decoder.
//!
//! Run: cargo test -p atn-runtime --test properties

use std::hash::{DefaultHasher, Hash, Hasher};

use atn_core::token::EOF;
use atn_runtime::builder::{GrammarBuilder, alts, eof, plus, rule, seq, star, tok};
use atn_runtime::config::AtnConfig;
use atn_runtime::config_set::{AtnConfigSet, MergePolicy};
use atn_runtime::context::{CallContext, ContextRef};
use atn_runtime::deserialize::deserialize;
use atn_runtime::serialize::serialize;
use atn_runtime::stream::{CommonTokenStream, ListTokenSource};
use atn_runtime::{AcceptAll, Grammar};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type RawConfig = (usize, usize, Vec<usize>);

fn context(return_states: &[usize]) -> ContextRef {
    return_states
        .iter()
        .fold(CallContext::empty(), |ctx, &s| CallContext::push(&ctx, s))
}

fn config_set(raw: &[RawConfig]) -> AtnConfigSet {
    let mut set = AtnConfigSet::new(false, MergePolicy::RetainAll);
    for (state, alt, stack) in raw {
        set.add(AtnConfig::new(*state, *alt, context(stack)));
    }
    set
}

fn hash_of(set: &AtnConfigSet) -> u64 {
    let mut h = DefaultHasher::new();
    set.hash(&mut h);
    h.finish()
}

fn raw_configs() -> impl Strategy<Value = Vec<RawConfig>> {
    prop::collection::vec(
        (0usize..12, 1usize..4, prop::collection::vec(20usize..24, 0..3)),
        0..24,
    )
}

/// s : x EOF | y EOF ;  x : A B* C | A B* D | B+ ;  y : A C | D ;
fn loop_grammar() -> (GrammarBuilder, [i32; 4]) {
    let mut g = GrammarBuilder::parser("loops");
    let a = g.token("A", Some("'a'"));
    let b = g.token("B", Some("'b'"));
    let c = g.token("C", Some("'c'"));
    let d = g.token("D", Some("'d'"));
    g.rule("s", alts([seq([rule("x"), eof()]), seq([rule("y"), eof()])]));
    g.rule(
        "x",
        alts([
            seq([tok(a), star(tok(b)), tok(c)]),
            seq([tok(a), star(tok(b)), tok(d)]),
            plus(tok(b)),
        ]),
    );
    g.rule("y", alts([seq([tok(a), tok(c)]), tok(d)]));
    (g, [a, b, c, d])
}

fn symbols() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(prop_oneof![Just(1), Just(2), Just(3), Just(4), Just(EOF)], 0..10)
}

fn stream(types: &[i32]) -> CommonTokenStream<ListTokenSource> {
    CommonTokenStream::new(ListTokenSource::from_types(types))
}

/// Predict every decision of `grammar` on `input`, keeping only the
/// outcome shape so errors compare too.
fn predict_all(grammar: &Grammar, input: &[i32]) -> Vec<Result<usize, String>> {
    (0..grammar.atn().num_decisions())
        .map(|d| {
            grammar
                .adaptive_predict(&mut stream(input), d, &[], &AcceptAll)
                .map(|p| p.alt)
                .map_err(|e| e.to_string())
        })
        .collect()
}

fn assert_unique_states(grammar: &Grammar) {
    for dfa in grammar.dfas() {
        let states = dfa.states();
        for (i, a) in states.iter().enumerate() {
            for b in &states[i + 1..] {
                assert_ne!(a.configs, b.configs);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn config_set_equality_ignores_order(
        (raw, shuffled) in raw_configs().prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let a = config_set(&raw);
        let b = config_set(&shuffled);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn frozen_hash_matches_live_hash(raw in raw_configs()) {
        let live = config_set(&raw);
        let mut frozen = config_set(&raw);
        frozen.freeze();
        prop_assert_eq!(hash_of(&live), hash_of(&frozen));
        prop_assert_eq!(&live, &frozen);
    }

    #[test]
    fn dfa_states_stay_unique(inputs in prop::collection::vec(symbols(), 1..8)) {
        let (builder, _) = loop_grammar();
        let grammar = builder.build_grammar().unwrap();
        for input in &inputs {
            predict_all(&grammar, input);
        }
        assert_unique_states(&grammar);
    }

    #[test]
    fn prediction_is_idempotent(input in symbols()) {
        let (builder, _) = loop_grammar();
        let grammar = builder.build_grammar().unwrap();
        let first = predict_all(&grammar, &input);
        let stats = grammar.cache_stats();
        let second = predict_all(&grammar, &input);
        prop_assert_eq!(first, second);
        prop_assert_eq!(grammar.cache_stats(), stats);
    }

    #[test]
    fn warm_and_cold_caches_agree(warmup in prop::collection::vec(symbols(), 0..6), input in symbols()) {
        let (builder, _) = loop_grammar();
        let warm = builder.build_grammar().unwrap();
        for w in &warmup {
            predict_all(&warm, w);
        }
        let cold = builder.build_grammar().unwrap();
        prop_assert_eq!(predict_all(&warm, &input), predict_all(&cold, &input));
    }
}

// ---------------------------------------------------------------------------
// Decoder determinism
// ---------------------------------------------------------------------------

#[test]
fn decoding_is_deterministic() {
    let (builder, _) = loop_grammar();
    let blob = builder.build().unwrap();
    let first = deserialize(&blob).unwrap();
    let second = deserialize(&blob).unwrap();
    assert_eq!(first.states.len(), second.states.len());
    for (a, b) in first.states.iter().zip(&second.states) {
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.rule_index, b.rule_index);
        assert_eq!(a.decision, b.decision);
        assert_eq!(a.transitions, b.transitions);
    }
    assert_eq!(first.decision_to_state, second.decision_to_state);
    assert_eq!(first.uuid, second.uuid);
}

#[test]
fn serialize_inverts_deserialize() {
    let (builder, _) = loop_grammar();
    let blob = builder.build().unwrap();
    let atn = deserialize(&blob).unwrap();
    assert_eq!(serialize(&atn).unwrap(), blob);
}
