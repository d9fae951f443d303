// Criterion benchmarks for atn-runtime.
//
// Compares prediction and lexing against an empty DFA cache (every edge is a
// closure computation) with the same work against a warm cache (every edge is
// a lookup).
//
// Run:
//   cargo bench -p atn-runtime

use std::hint::black_box;

use atn_runtime::builder::{
    GrammarBuilder, alts, chr, eof, lit, one_of, opt, plus, prec, range, rule, rule_prec, seq,
    skip, star, tok,
};
use atn_runtime::stream::{CodePointCharStream, CommonTokenStream, ListTokenSource};
use atn_runtime::{Grammar, PredictionMode};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

// ---------------------------------------------------------------------------
// Grammars
// ---------------------------------------------------------------------------

struct Expr {
    lexer: Grammar,
    parser: Grammar,
}

/// Arithmetic expressions with calls: `f(1, 2 * (3 + x))`.
fn expr_grammars() -> Expr {
    let mut l = GrammarBuilder::lexer("ExprLexer");
    l.lexer_rule("ID", seq([range('a', 'z'), star(alts([range('a', 'z'), range('0', '9')]))]));
    l.lexer_rule("INT", plus(range('0', '9')));
    l.lexer_rule("PLUS", chr('+'));
    l.lexer_rule("STAR", chr('*'));
    l.lexer_rule("LPAREN", chr('('));
    l.lexer_rule("RPAREN", chr(')'));
    l.lexer_rule("COMMA", chr(','));
    l.lexer_rule("ARROW", lit("->"));
    l.lexer_rule("WS", seq([plus(one_of(" \t\n")), skip()]));
    let lexer = l.build_grammar().unwrap();

    let mut p = GrammarBuilder::parser("ExprParser");
    p.import_tokens(lexer.vocabulary());
    let t = |name: &str| {
        lexer
            .vocabulary()
            .token_type(name)
            .unwrap_or_else(|| panic!("no token {name}"))
    };
    p.rule("prog", seq([rule("e"), star(seq([tok(t("COMMA")), rule("e")])), eof()]));
    p.precedence_rule(
        "e",
        [
            seq([tok(t("ID")), tok(t("LPAREN")), opt(rule("args")), tok(t("RPAREN"))]),
            tok(t("ID")),
            tok(t("INT")),
            seq([tok(t("LPAREN")), rule("e"), tok(t("RPAREN"))]),
        ],
        [
            seq([prec(2), tok(t("STAR")), rule_prec("e", 3)]),
            seq([prec(1), tok(t("PLUS")), rule_prec("e", 2)]),
        ],
    );
    p.rule("args", seq([rule("e"), star(seq([tok(t("COMMA")), rule("e")]))]));
    let parser = p.build_grammar().unwrap();
    Expr { lexer, parser }
}

fn source_text() -> String {
    (0..200)
        .map(|i| format!("f{i}(1, 2 * (x + {i})) + g(y) * 3"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_lexing(c: &mut Criterion) {
    let Expr { lexer, .. } = expr_grammars();
    let text = source_text();

    c.bench_function("lex_warm", |b| {
        b.iter(|| {
            let mut l = lexer.lexer(CodePointCharStream::new(&text)).unwrap();
            black_box(l.tokenize().unwrap().len())
        });
    });

    c.bench_function("lex_cold", |b| {
        b.iter_batched_ref(
            || expr_grammars().lexer,
            |grammar| {
                let mut l = grammar.lexer(CodePointCharStream::new(&text)).unwrap();
                black_box(l.tokenize().unwrap().len())
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_parsing(c: &mut Criterion) {
    let Expr { lexer, parser } = expr_grammars();
    let text = source_text();
    let tokens = lexer
        .lexer(CodePointCharStream::new(&text))
        .unwrap()
        .tokenize()
        .unwrap();

    let parse = |grammar: &Grammar| {
        let mut input = CommonTokenStream::new(ListTokenSource::new(tokens.clone()));
        black_box(grammar.interpreter().parse(&mut input, 0).unwrap())
    };

    c.bench_function("parse_warm_ll", |b| b.iter(|| parse(&parser)));

    let mut sll = expr_grammars().parser;
    sll.set_prediction_mode(PredictionMode::Sll);
    c.bench_function("parse_warm_sll", |b| b.iter(|| parse(&sll)));

    c.bench_function("parse_cold", |b| {
        b.iter_batched_ref(|| expr_grammars().parser, |g| parse(&*g), BatchSize::SmallInput);
    });
}

criterion_group!(benches, bench_lexing, bench_parsing);
criterion_main!(benches);
