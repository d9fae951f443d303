// atn-tokenize: Tokenize text with a lexer grammar.
//
// Reads text from the command line or stdin (one input per line) and prints
// one token per line as `LINE:COLUMN TYPE 'TEXT'`. Without `-g` the embedded
// argument-list lexer is used. Unrecognized characters are reported on
// stderr and skipped.
//
// Usage:
//   atn-tokenize [-g LEXER] [--json] [--all-channels] [TEXT...]
//
// Options:
//   -g, --grammar LEXER   Serialized lexer grammar (path or name)
//   --json                Print one JSON token per line
//   --all-channels        Also print tokens on hidden channels
//   -h, --help            Print help

use std::io::{self, Write};

use atn_arglist::grammar::lexer_blob;
use atn_core::token::DEFAULT_CHANNEL;
use atn_runtime::stream::CodePointCharStream;
use atn_runtime::{Grammar, GrammarType};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if atn_cli::wants_help(&args) {
        println!("atn-tokenize: Tokenize text with a serialized lexer grammar.");
        println!();
        println!("Usage: atn-tokenize [-g LEXER] [--json] [--all-channels] [TEXT...]");
        println!();
        println!("If TEXT arguments are given, tokenizes each one.");
        println!("Otherwise reads inputs from stdin (one per line).");
        println!();
        println!("Options:");
        println!("  -g, --grammar LEXER   Serialized lexer grammar (default: argument lists)");
        println!("  --json                Print one JSON token per line");
        println!("  --all-channels        Also print tokens on hidden channels");
        println!("  -h, --help            Print this help");
        return;
    }

    let (grammar_name, args) = atn_cli::parse_option(&args, "--grammar", "-g");
    let (json, args) = atn_cli::take_flag(&args, "--json");
    let (all_channels, args) = atn_cli::take_flag(&args, "--all-channels");

    let grammar = match grammar_name {
        Some(name) => atn_cli::load_grammar(&name, Some(GrammarType::Lexer)),
        None => lexer_blob()
            .map_err(|e| e.to_string())
            .and_then(|b| Grammar::lexer_from_bytes(&b).map_err(|e| e.to_string())),
    }
    .unwrap_or_else(|e| atn_cli::fatal(&e));

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let vocabulary = grammar.vocabulary();
    let mut failed = false;

    for text in atn_cli::inputs(&args) {
        let mut lexer = grammar
            .lexer(CodePointCharStream::new(&text))
            .unwrap_or_else(|e| atn_cli::fatal(&e.to_string()));
        let (tokens, errors) = lexer.tokenize_all();
        for e in &errors {
            eprintln!("{e}");
        }
        failed |= !errors.is_empty();

        for token in tokens
            .iter()
            .filter(|t| all_channels || t.channel == DEFAULT_CHANNEL)
        {
            if json {
                match serde_json::to_string(token) {
                    Ok(line) => {
                        let _ = writeln!(out, "{line}");
                    }
                    Err(e) => atn_cli::fatal(&e.to_string()),
                }
            } else {
                let _ = writeln!(
                    out,
                    "{}:{} {} '{}'",
                    token.line,
                    token.column,
                    vocabulary.display_name(token.token_type),
                    token.text.escape_debug()
                );
            }
        }
    }

    let _ = out.flush();
    if failed {
        std::process::exit(2);
    }
}
