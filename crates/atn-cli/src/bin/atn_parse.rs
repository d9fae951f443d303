// atn-parse: Parse text with a lexer/parser grammar pair.
//
// Without grammars, each input is parsed as a script argument list and
// printed in canonical form. With `-l` and `-p`, each input is parsed from
// the start rule (or `-r RULE`) and printed as an s-expression tree.
//
// Usage:
//   atn-parse [OPTIONS] [TEXT...]
//
// Options:
//   -l, --lexer LEXER     Serialized lexer grammar
//   -p, --parser PARSER   Serialized parser grammar
//   -r, --rule RULE       Start rule (default: the first rule)
//   -m, --mode MODE       Prediction mode: ll (default), sll or ll-exact
//   --json                Print JSON instead of text
//   --ambiguities         Report ambiguous decisions on stderr
//   --dfa                 Dump the warmed DFA cache after parsing
//   -h, --help            Print help

use std::io::{self, BufWriter, StdoutLock, Write};

use atn_arglist::{ArgListParser, format_args};
use atn_runtime::stream::{CodePointCharStream, CommonTokenStream};
use atn_runtime::{Grammar, GrammarType, PredictionMode};

struct Options {
    json: bool,
    ambiguities: bool,
    dfa: bool,
    mode: PredictionMode,
}

type Out<'a> = BufWriter<StdoutLock<'a>>;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if atn_cli::wants_help(&args) {
        println!("atn-parse: Parse text with serialized ATN grammars.");
        println!();
        println!("Usage: atn-parse [OPTIONS] [TEXT...]");
        println!();
        println!("Without -l/-p, inputs are parsed as script argument lists.");
        println!("If TEXT arguments are given, parses each one.");
        println!("Otherwise reads inputs from stdin (one per line).");
        println!();
        println!("Options:");
        println!("  -l, --lexer LEXER     Serialized lexer grammar");
        println!("  -p, --parser PARSER   Serialized parser grammar");
        println!("  -r, --rule RULE       Start rule (default: the first rule)");
        println!("  -m, --mode MODE       Prediction mode: ll (default), sll or ll-exact");
        println!("  --json                Print JSON instead of text");
        println!("  --ambiguities         Report ambiguous decisions on stderr");
        println!("  --dfa                 Dump the warmed DFA cache after parsing");
        println!("  -h, --help            Print this help");
        return;
    }

    let (lexer_name, args) = atn_cli::parse_option(&args, "--lexer", "-l");
    let (parser_name, args) = atn_cli::parse_option(&args, "--parser", "-p");
    let (rule, args) = atn_cli::parse_option(&args, "--rule", "-r");
    let (mode, args) = atn_cli::parse_option(&args, "--mode", "-m");
    let (json, args) = atn_cli::take_flag(&args, "--json");
    let (ambiguities, args) = atn_cli::take_flag(&args, "--ambiguities");
    let (dfa, args) = atn_cli::take_flag(&args, "--dfa");

    let options = Options {
        json,
        ambiguities,
        dfa,
        mode: mode
            .as_deref()
            .map(atn_cli::parse_mode)
            .transpose()
            .unwrap_or_else(|e| atn_cli::fatal(&e))
            .unwrap_or_default(),
    };
    let inputs = atn_cli::inputs(&args);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let ok = match (lexer_name, parser_name) {
        (None, None) => {
            if rule.is_some() {
                atn_cli::fatal("--rule needs --lexer and --parser");
            }
            parse_arglists(&inputs, &options, &mut out)
        }
        (Some(lexer), Some(parser)) => {
            let lexer = atn_cli::load_grammar(&lexer, Some(GrammarType::Lexer))
                .unwrap_or_else(|e| atn_cli::fatal(&e));
            let parser = atn_cli::load_grammar(&parser, Some(GrammarType::Parser))
                .unwrap_or_else(|e| atn_cli::fatal(&e));
            parse_with(lexer, parser, rule.as_deref(), &inputs, &options, &mut out)
        }
        _ => atn_cli::fatal("--lexer and --parser go together"),
    };

    let _ = out.flush();
    if !ok {
        std::process::exit(2);
    }
}

fn parse_arglists(inputs: &[String], options: &Options, out: &mut Out<'_>) -> bool {
    let mut parser = ArgListParser::new().unwrap_or_else(|e| atn_cli::fatal(&e.to_string()));
    parser.set_prediction_mode(options.mode);
    let mut ok = true;

    for text in inputs {
        match parser.parse(text) {
            Ok(args) if options.json => match serde_json::to_string(&args) {
                Ok(line) => {
                    let _ = writeln!(out, "{line}");
                }
                Err(e) => atn_cli::fatal(&e.to_string()),
            },
            Ok(args) => {
                let _ = writeln!(out, "{}", format_args(&args));
            }
            Err(e) => {
                eprintln!("{text}: {e}");
                ok = false;
            }
        }
    }

    if options.dfa {
        dump_cache(parser.parser_grammar(), out);
    }
    ok
}

fn parse_with(
    lexer: Grammar,
    mut parser: Grammar,
    rule: Option<&str>,
    inputs: &[String],
    options: &Options,
    out: &mut Out<'_>,
) -> bool {
    parser.set_prediction_mode(options.mode);
    parser.set_report_ambiguities(options.ambiguities);
    let start_rule = match rule {
        Some(name) => parser
            .atn()
            .rule_index(name)
            .unwrap_or_else(|| atn_cli::fatal(&format!("unknown rule `{name}`"))),
        None => 0,
    };
    let rule_names = parser.rule_names();
    let mut ok = true;

    for text in inputs {
        let lex = lexer
            .lexer(CodePointCharStream::new(text))
            .unwrap_or_else(|e| atn_cli::fatal(&e.to_string()));
        let mut tokens = CommonTokenStream::new(lex);
        let result = parser
            .interpreter()
            .parse_with_diagnostics(&mut tokens, start_rule);
        if let Some(e) = tokens.take_error() {
            eprintln!("{text}: {e}");
            ok = false;
            continue;
        }
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("{text}: {e}");
                ok = false;
                continue;
            }
        };
        for report in &outcome.ambiguities {
            eprintln!(
                "{text}: decision {} ambiguous over tokens {}..={}: alternatives {}, chose {}{}",
                report.decision,
                report.start_index,
                report.stop_index,
                report.alts,
                report.chosen,
                if report.exact { " (exact)" } else { "" }
            );
        }
        if outcome.full_context_decisions > 0 {
            log::info!(
                "{text}: {} decisions needed full context",
                outcome.full_context_decisions
            );
        }
        if options.json {
            match serde_json::to_string(&outcome.tree) {
                Ok(line) => {
                    let _ = writeln!(out, "{line}");
                }
                Err(e) => atn_cli::fatal(&e.to_string()),
            }
        } else {
            let _ = writeln!(out, "{}", outcome.tree.to_sexpr(rule_names));
        }
    }

    if options.dfa {
        dump_cache(&parser, out);
    }
    ok
}

fn dump_cache(grammar: &Grammar, out: &mut Out<'_>) {
    let stats = grammar.cache_stats();
    let _ = writeln!(
        out,
        "# {} DFAs, {} states, {} edges",
        stats.dfas, stats.states, stats.edges
    );
    for (i, dfa) in grammar.dfas().iter().enumerate() {
        if dfa.is_empty() {
            continue;
        }
        if let Some(dump) = grammar.dump_dfa(i) {
            let _ = writeln!(out, "# decision {i}");
            let _ = write!(out, "{dump}");
        }
    }
}
