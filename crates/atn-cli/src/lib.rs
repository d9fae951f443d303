// atn-cli: shared utilities for CLI tools.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;

use atn_runtime::{Grammar, GrammarType, PredictionMode};
use serde::Serialize;

/// Directory searched under `$HOME` for grammar blobs.
const HOME_SUBDIR: &str = ".atn/grammars";

/// Extension tried when a grammar name is given without one.
const BLOB_EXT: &str = "atn";

/// Locate a grammar blob by path or by name.
///
/// Search order:
/// 1. `name` itself, if it names an existing file
/// 2. each directory in the `ATN_GRAMMAR_PATH` environment variable
/// 3. `~/.atn/grammars`
/// 4. Current working directory
///
/// In each directory both `name` and `name.atn` are tried.
pub fn find_grammar(name: &str) -> Result<PathBuf, String> {
    let direct = PathBuf::from(name);
    if direct.is_file() {
        return Ok(direct);
    }
    let search_paths = build_search_paths();
    for dir in &search_paths {
        for candidate in [dir.join(name), dir.join(name).with_extension(BLOB_EXT)] {
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(format!(
        "could not find grammar {name} in any of the search paths:\n{}",
        search_paths
            .iter()
            .map(|p| format!("  - {}", p.display()))
            .collect::<Vec<_>>()
            .join("\n")
    ))
}

fn build_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(env_path) = std::env::var_os("ATN_GRAMMAR_PATH") {
        paths.extend(std::env::split_paths(&env_path));
    }
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(HOME_SUBDIR));
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd);
    }
    paths
}

/// Read and decode a grammar blob, checking its type when `expected` is set.
pub fn load_grammar(name: &str, expected: Option<GrammarType>) -> Result<Grammar, String> {
    let path = find_grammar(name)?;
    read_grammar(&path, expected)
}

fn read_grammar(path: &Path, expected: Option<GrammarType>) -> Result<Grammar, String> {
    let data =
        std::fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let grammar = match expected {
        Some(GrammarType::Lexer) => Grammar::lexer_from_bytes(&data),
        Some(GrammarType::Parser) => Grammar::parser_from_bytes(&data),
        None => Grammar::from_bytes(&data),
    }
    .map_err(|e| format!("failed to load {}: {e}", path.display()))?;
    log::debug!(
        "loaded {} ({:?}, {} states)",
        path.display(),
        grammar.grammar_type(),
        grammar.atn().states.len()
    );
    Ok(grammar)
}

/// Remove `--long=VALUE`, `--long VALUE` or `-s VALUE` from `args`.
///
/// Returns `(value, remaining_args)`. The last occurrence wins.
pub fn parse_option(args: &[String], long: &str, short: &str) -> (Option<String>, Vec<String>) {
    let mut value = None;
    let mut remaining = Vec::new();
    let mut skip_next = false;
    let long_eq = format!("{long}=");

    for (i, arg) in args.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if let Some(val) = arg.strip_prefix(&long_eq) {
            value = Some(val.to_string());
        } else if arg == long || arg == short {
            match args.get(i + 1) {
                Some(next) => {
                    value = Some(next.clone());
                    skip_next = true;
                }
                None => fatal(&format!("{arg} requires a value")),
            }
        } else {
            remaining.push(arg.clone());
        }
    }

    (value, remaining)
}

/// Remove every occurrence of `flag` from `args`, reporting whether it was present.
pub fn take_flag(args: &[String], flag: &str) -> (bool, Vec<String>) {
    let remaining: Vec<String> = args.iter().filter(|a| *a != flag).cloned().collect();
    (remaining.len() != args.len(), remaining)
}

/// `sll`, `ll` or `ll-exact`, case-insensitive.
pub fn parse_mode(value: &str) -> Result<PredictionMode, String> {
    PredictionMode::from_name(&value.to_ascii_lowercase()).ok_or_else(|| {
        format!("unknown prediction mode `{value}` (expected sll, ll or ll-exact)")
    })
}

/// Inputs named on the command line, or stdin lines when there are none.
pub fn inputs(args: &[String]) -> Vec<String> {
    let positional: Vec<String> = args.iter().filter(|a| !a.starts_with('-')).cloned().collect();
    if !positional.is_empty() {
        return positional;
    }
    let mut lines = Vec::new();
    for line in io::stdin().lock().lines() {
        match line {
            Ok(l) if l.trim().is_empty() => {}
            Ok(l) => lines.push(l),
            Err(e) => {
                eprintln!("error reading stdin: {e}");
                break;
            }
        }
    }
    lines
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}

/// What `atn-dump` prints about a grammar.
#[derive(Debug, Serialize)]
pub struct GrammarSummary {
    pub grammar_type: &'static str,
    pub uuid: String,
    pub max_token_type: i32,
    pub states: usize,
    pub decisions: usize,
    pub rules: Vec<String>,
    pub modes: usize,
    pub tokens: Vec<TokenName>,
}

#[derive(Debug, Serialize)]
pub struct TokenName {
    pub token_type: i32,
    pub display: String,
}

impl GrammarSummary {
    pub fn of(grammar: &Grammar) -> Self {
        let atn = grammar.atn();
        let vocabulary = grammar.vocabulary();
        Self {
            grammar_type: match atn.grammar_type {
                GrammarType::Lexer => "lexer",
                GrammarType::Parser => "parser",
            },
            uuid: format!("{:032x}", atn.uuid),
            max_token_type: atn.max_token_type,
            states: atn.states.len(),
            decisions: atn.num_decisions(),
            rules: atn.rule_names.clone(),
            modes: atn.mode_to_start_state.len(),
            tokens: (1..=vocabulary.max_token_type())
                .map(|t| TokenName {
                    token_type: t,
                    display: vocabulary.display_name(t),
                })
                .collect(),
        }
    }
}
