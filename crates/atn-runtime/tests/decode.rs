//! Loading grammars from bytes: malformed blobs are refused whole.
//!
//! Run: cargo test -p atn-runtime --test decode

use atn_runtime::atn::GrammarType;
use atn_runtime::builder::{GrammarBuilder, alts, chr, eof, plus, range, rule, seq, skip, tok};
use atn_runtime::deserialize::deserialize;
use atn_runtime::format::{HEADER_SIZE, MAGIC};
use atn_runtime::serialize::serialize;
use atn_runtime::stream::{CodePointCharStream, CommonTokenStream, TokenSource};
use atn_runtime::transition::TransitionKind;
use atn_runtime::{DecodeError, Grammar};

fn parser_blob() -> Vec<u8> {
    let mut g = GrammarBuilder::parser("p");
    let a = g.token("A", Some("'a'"));
    let b = g.token("B", Some("'b'"));
    g.rule("s", seq([rule("x"), eof()]));
    g.rule("x", alts([tok(a), seq([tok(a), tok(b)])]));
    g.build().unwrap()
}

fn lexer_builder() -> GrammarBuilder {
    let mut g = GrammarBuilder::lexer("l");
    g.lexer_rule("ID", plus(range('a', 'z')));
    g.lexer_rule("INT", plus(range('0', '9')));
    g.lexer_rule("WS", seq([plus(chr(' ')), skip()]));
    g
}

#[test]
fn transition_past_the_last_state_is_rejected() {
    let mut atn = deserialize(&parser_blob()).unwrap();
    let count = atn.states.len();
    let source = atn
        .states
        .iter()
        .position(|s| {
            s.transitions
                .first()
                .is_some_and(|t| matches!(t.kind, TransitionKind::Atom(_)))
        })
        .unwrap();
    atn.states[source].transitions[0].target = count + 3;
    let blob = serialize(&atn).unwrap();

    assert_eq!(
        deserialize(&blob).unwrap_err(),
        DecodeError::StateOutOfBounds {
            index: count + 3,
            count,
        }
    );
    // Nothing to cache: no grammar comes out of a bad blob.
    assert!(Grammar::from_bytes(&blob).is_err());
}

#[test]
fn header_problems() {
    let blob = parser_blob();

    let mut bad_magic = blob.clone();
    bad_magic[0] ^= 0xFF;
    assert_eq!(deserialize(&bad_magic).unwrap_err(), DecodeError::InvalidMagic);

    assert!(matches!(
        deserialize(&blob[..HEADER_SIZE - 1]),
        Err(DecodeError::TooShort { .. })
    ));

    assert!(matches!(
        deserialize(&blob[..blob.len() - 2]),
        Err(DecodeError::LengthMismatch { .. })
    ));

    assert_eq!(u32::from_le_bytes(blob[..4].try_into().unwrap()), MAGIC);
}

#[test]
fn unknown_versions_are_refused() {
    let mut blob = parser_blob();
    blob[HEADER_SIZE] = 5;
    assert!(matches!(
        deserialize(&blob),
        Err(DecodeError::UnsupportedVersion { found: 5, .. })
    ));
}

#[test]
fn typed_loaders_check_the_grammar_type() {
    let blob = parser_blob();
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
fn lexer_blob_round_trip() {
    let blob = lexer_builder().build().unwrap();
    let grammar = Grammar::lexer_from_bytes(&blob).unwrap();
    assert_eq!(serialize(grammar.atn()).unwrap(), blob);
    assert_eq!(grammar.rule_names(), ["ID", "INT", "WS"]);

    let mut lexer = grammar.lexer(CodePointCharStream::new("abc 42 x")).unwrap();
    let texts: Vec<String> = lexer
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|t| t.text)
        .collect();
    assert_eq!(texts, ["abc", "42", "x", ""]);
}

#[test]
fn lexer_feeds_token_stream() {
    use atn_runtime::stream::{IntStream, TokenStream};

    let grammar = lexer_builder().build_grammar().unwrap();
    let lexer = grammar.lexer(CodePointCharStream::new("a 1")).unwrap();
    assert_eq!(lexer.source_name(), "<string>");
    let mut tokens = CommonTokenStream::new(lexer);
    assert_eq!(tokens.la(1), 1);
    assert_eq!(tokens.la(2), 2);
    assert_eq!(tokens.lt(2).unwrap().text, "1");
    assert!(tokens.lt(3).unwrap().is_eof());
    assert!(tokens.take_error().is_none());
}
