// The argument-list grammar, expressed with the runtime's grammar builder.
//
//   args  : '(' (arg (',' arg)*)? ')' EOF ;
//   arg   : IDENT '=' value | value ;
//   value : NUMBER | STRING | 'true' | 'false' | 'null' | list | call | IDENT ;
//   list  : '[' (value (',' value)*)? ']' ;
//   call  : IDENT '(' (arg (',' arg)*)? ')' ;
//
// `arg` and `value` both need two tokens of lookahead to tell a name from
// the start of a value.

use atn_core::token::HIDDEN_CHANNEL;
use atn_runtime::builder::{
    BuildError, GrammarBuilder, alts, channel, chr, eof, lit, none_of, one_of, opt, plus, range,
    rule, seq, skip, star, tok,
};

/// Token types shared by the lexer and parser grammars.
pub mod tokens {
    pub const LPAREN: i32 = 1;
    pub const RPAREN: i32 = 2;
    pub const LBRACK: i32 = 3;
    pub const RBRACK: i32 = 4;
    pub const COMMA: i32 = 5;
    pub const EQUALS: i32 = 6;
    pub const TRUE: i32 = 7;
    pub const FALSE: i32 = 8;
    pub const NULL: i32 = 9;
    pub const NUMBER: i32 = 10;
    pub const STRING: i32 = 11;
    pub const IDENT: i32 = 12;
    pub const WS: i32 = 13;
    pub const COMMENT: i32 = 14;
}

/// Parser rule indices.
pub mod rules {
    pub const ARGS: usize = 0;
    pub const ARG: usize = 1;
    pub const VALUE: usize = 2;
    pub const LIST: usize = 3;
    pub const CALL: usize = 4;
}

/// Token declarations in type order.
const TOKENS: [(&str, Option<&str>); 14] = [
    ("LPAREN", Some("'('")),
    ("RPAREN", Some("')'")),
    ("LBRACK", Some("'['")),
    ("RBRACK", Some("']'")),
    ("COMMA", Some("','")),
    ("EQUALS", Some("'='")),
    ("TRUE", Some("'true'")),
    ("FALSE", Some("'false'")),
    ("NULL", Some("'null'")),
    ("NUMBER", None),
    ("STRING", None),
    ("IDENT", None),
    ("WS", None),
    ("COMMENT", None),
];

fn declare_tokens(g: &mut GrammarBuilder) {
    for (name, literal) in TOKENS {
        g.token(name, literal);
    }
}

pub fn lexer_builder() -> GrammarBuilder {
    let mut g = GrammarBuilder::lexer("ArgListLexer");
    declare_tokens(&mut g);
    for (name, c) in [
        ("LPAREN", '('),
        ("RPAREN", ')'),
        ("LBRACK", '['),
        ("RBRACK", ']'),
        ("COMMA", ','),
        ("EQUALS", '='),
    ] {
        g.lexer_rule(name, chr(c));
    }
    // Keywords come before IDENT: on equal length the first rule wins.
    g.lexer_rule("TRUE", lit("true"));
    g.lexer_rule("FALSE", lit("false"));
    g.lexer_rule("NULL", lit("null"));
    g.lexer_rule(
        "NUMBER",
        seq([
            opt(chr('-')),
            plus(rule("DIGIT")),
            opt(seq([chr('.'), plus(rule("DIGIT"))])),
        ]),
    );
    g.lexer_rule(
        "STRING",
        seq([
            chr('"'),
            star(alts([rule("ESC"), none_of("\"\\\n")])),
            chr('"'),
        ]),
    );
    let ident_start = || alts([range('a', 'z'), range('A', 'Z'), chr('_')]);
    g.lexer_rule(
        "IDENT",
        seq([
            ident_start(),
            star(alts([ident_start(), range('0', '9')])),
        ]),
    );
    g.lexer_rule("WS", seq([plus(one_of(" \t\r\n")), skip()]));
    g.lexer_rule(
        "COMMENT",
        seq([chr('#'), star(none_of("\n")), channel(HIDDEN_CHANNEL)]),
    );
    g.fragment("DIGIT", range('0', '9'));
    g.fragment("ESC", seq([chr('\\'), one_of("\"\\nt")]));
    g
}

pub fn parser_builder() -> GrammarBuilder {
    use tokens::*;

    let mut g = GrammarBuilder::parser("ArgListParser");
    declare_tokens(&mut g);
    let arg_list = || opt(seq([rule("arg"), star(seq([tok(COMMA), rule("arg")]))]));
    g.rule(
        "args",
        seq([tok(LPAREN), arg_list(), tok(RPAREN), eof()]),
    );
    g.rule(
        "arg",
        alts([seq([tok(IDENT), tok(EQUALS), rule("value")]), rule("value")]),
    );
    g.rule(
        "value",
        alts([
            tok(NUMBER),
            tok(STRING),
            tok(TRUE),
            tok(FALSE),
            tok(NULL),
            rule("list"),
            rule("call"),
            tok(IDENT),
        ]),
    );
    g.rule(
        "list",
        seq([
            tok(LBRACK),
            opt(seq([rule("value"), star(seq([tok(COMMA), rule("value")]))])),
            tok(RBRACK),
        ]),
    );
    g.rule("call", seq([tok(IDENT), tok(LPAREN), arg_list(), tok(RPAREN)]));
    g
}

/// Serialized lexer grammar.
pub fn lexer_blob() -> Result<Vec<u8>, BuildError> {
    lexer_builder().build()
}

/// Serialized parser grammar.
pub fn parser_blob() -> Result<Vec<u8>, BuildError> {
    parser_builder().build()
}
