// atn-dump: Describe serialized grammars.
//
// Prints grammar type, sizes, rule names and the token vocabulary of each
// grammar blob. `--arglist` describes the embedded argument-list grammars,
// and `--export DIR` writes them out as blobs for the other tools.
//
// Usage:
//   atn-dump [--json] [--tokens] GRAMMAR...
//   atn-dump [--json] --arglist
//   atn-dump --export DIR
//
// Options:
//   --json         Print one JSON object per grammar
//   --tokens       Print the vocabulary in .tokens file form
//   --arglist      Describe the embedded argument-list grammars
//   --export DIR   Write arglist-lexer.atn and arglist-parser.atn to DIR
//   -h, --help     Print help

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use atn_arglist::grammar::{lexer_blob, parser_blob};
use atn_cli::GrammarSummary;
use atn_runtime::Grammar;
use atn_runtime::builder::BuildError;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if atn_cli::wants_help(&args) {
        println!("atn-dump: Describe serialized ATN grammars.");
        println!();
        println!("Usage: atn-dump [--json] [--tokens] GRAMMAR...");
        println!("       atn-dump [--json] --arglist");
        println!("       atn-dump --export DIR");
        println!();
        println!("GRAMMAR is a file path, or a name looked up in ATN_GRAMMAR_PATH,");
        println!("~/.atn/grammars and the current directory.");
        println!();
        println!("Options:");
        println!("  --json         Print one JSON object per grammar");
        println!("  --tokens       Print the vocabulary in .tokens file form");
        println!("  --arglist      Describe the embedded argument-list grammars");
        println!("  --export DIR   Write arglist-lexer.atn and arglist-parser.atn to DIR");
        println!("  -h, --help     Print this help");
        return;
    }

    let (export, args) = atn_cli::parse_option(&args, "--export", "--export");
    let (json, args) = atn_cli::take_flag(&args, "--json");
    let (tokens, args) = atn_cli::take_flag(&args, "--tokens");
    let (arglist, args) = atn_cli::take_flag(&args, "--arglist");

    if let Some(dir) = export {
        export_arglist(&PathBuf::from(dir));
        return;
    }

    let grammars: Vec<(String, Grammar)> = if arglist {
        vec![
            ("arglist-lexer".to_string(), embedded(lexer_blob())),
            ("arglist-parser".to_string(), embedded(parser_blob())),
        ]
    } else {
        let names: Vec<&String> = args.iter().filter(|a| !a.starts_with('-')).collect();
        if names.is_empty() {
            atn_cli::fatal("no grammar given (see --help)");
        }
        names
            .into_iter()
            .map(|name| {
                let grammar = atn_cli::load_grammar(name, None)
                    .unwrap_or_else(|e| atn_cli::fatal(&e));
                (name.clone(), grammar)
            })
            .collect()
    };

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for (name, grammar) in &grammars {
        if tokens {
            let _ = write!(out, "{}", grammar.vocabulary().to_tokens_file());
            continue;
        }
        let summary = GrammarSummary::of(grammar);
        if json {
            match serde_json::to_string(&summary) {
                Ok(line) => {
                    let _ = writeln!(out, "{line}");
                }
                Err(e) => atn_cli::fatal(&e.to_string()),
            }
            continue;
        }
        let _ = writeln!(out, "{name}:");
        let _ = writeln!(out, "  type:           {}", summary.grammar_type);
        let _ = writeln!(out, "  uuid:           {}", summary.uuid);
        let _ = writeln!(out, "  states:         {}", summary.states);
        let _ = writeln!(out, "  decisions:      {}", summary.decisions);
        let _ = writeln!(out, "  modes:          {}", summary.modes);
        let _ = writeln!(out, "  max token type: {}", summary.max_token_type);
        let _ = writeln!(out, "  rules:          {}", summary.rules.join(" "));
        let _ = writeln!(out, "  tokens:");
        for t in &summary.tokens {
            let _ = writeln!(out, "    {:>4} {}", t.token_type, t.display);
        }
    }
}

fn embedded(blob: Result<Vec<u8>, BuildError>) -> Grammar {
    blob.map_err(|e| e.to_string())
        .and_then(|b| Grammar::from_bytes(&b).map_err(|e| e.to_string()))
        .unwrap_or_else(|e| atn_cli::fatal(&e))
}

fn export_arglist(dir: &Path) {
    for (file, blob) in [
        ("arglist-lexer.atn", lexer_blob()),
        ("arglist-parser.atn", parser_blob()),
    ] {
        let blob = blob.unwrap_or_else(|e| atn_cli::fatal(&e.to_string()));
        let path = dir.join(file);
        std::fs::write(&path, blob)
            .unwrap_or_else(|e| atn_cli::fatal(&format!("failed to write {}: {e}", path.display())));
        println!("wrote {}", path.display());
    }
}
