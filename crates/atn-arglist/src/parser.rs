// ArgListParser: owns the two argument-list grammars and their DFA caches.
//
// Each parser instance is self-contained. Its caches warm up as it parses
// and go away with it; two instances never share state.

use atn_core::Token;
use atn_runtime::stream::{CodePointCharStream, CommonTokenStream};
use atn_runtime::{Grammar, ParseTree, PredictionMode, RuleNode};

use crate::ArgListError;
use crate::grammar::{self, rules, tokens};
use crate::value::{Arg, Value, unescape};

/// Parses script argument lists such as `(1, "two", mode=fast, [a, b])`.
///
/// Parsing only needs `&self`, so one parser can serve many threads.
#[derive(Debug)]
pub struct ArgListParser {
    lexer: Grammar,
    parser: Grammar,
}

impl ArgListParser {
    /// Build the embedded grammars.
    pub fn new() -> Result<Self, ArgListError> {
        Self::from_blobs(&grammar::lexer_blob()?, &grammar::parser_blob()?)
    }

    /// Load the grammars from serialized blobs.
    pub fn from_blobs(lexer: &[u8], parser: &[u8]) -> Result<Self, ArgListError> {
        let lexer = Grammar::lexer_from_bytes(lexer)?;
        let parser = Grammar::parser_from_bytes(parser)?;
        log::debug!(
            "arg-list grammars loaded: {} lexer states, {} parser states, {} decisions",
            lexer.atn().states.len(),
            parser.atn().states.len(),
            parser.atn().num_decisions()
        );
        Ok(Self { lexer, parser })
    }

    pub fn lexer_grammar(&self) -> &Grammar {
        &self.lexer
    }

    pub fn parser_grammar(&self) -> &Grammar {
        &self.parser
    }

    /// Prediction mode of the parser grammar. Changing it drops the parser's
    /// DFA cache.
    pub fn set_prediction_mode(&mut self, mode: PredictionMode) {
        self.parser.set_prediction_mode(mode);
    }

    /// Tokens of `text` on every channel, ending with EOF.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, ArgListError> {
        let mut lexer = self.lexer.lexer(CodePointCharStream::new(text))?;
        Ok(lexer.tokenize()?)
    }

    /// Raw parse tree of `text`.
    pub fn parse_tree(&self, text: &str) -> Result<ParseTree, ArgListError> {
        let lexer = self.lexer.lexer(CodePointCharStream::new(text))?;
        let mut input = CommonTokenStream::new(lexer);
        let result = self.parser.interpreter().parse(&mut input, rules::ARGS);
        // A lexer error truncates the stream, so it explains any parse error.
        if let Some(e) = input.take_error() {
            return Err(e.into());
        }
        Ok(result?)
    }

    /// Parse `text` into typed arguments.
    pub fn parse(&self, text: &str) -> Result<Vec<Arg>, ArgListError> {
        let tree = self.parse_tree(text)?;
        let root = rule_node(&tree, rules::ARGS)?;
        rule_children(root, rules::ARG).map(arg).collect()
    }
}

fn rule_node(tree: &ParseTree, rule_index: usize) -> Result<&RuleNode, ArgListError> {
    match tree.as_rule() {
        Some(node) if node.rule_index == rule_index => Ok(node),
        _ => Err(ArgListError::UnexpectedTree(format!(
            "expected rule {rule_index}, found {tree:?}"
        ))),
    }
}

fn rule_children(node: &RuleNode, rule_index: usize) -> impl Iterator<Item = &RuleNode> {
    node.children
        .iter()
        .filter_map(ParseTree::as_rule)
        .filter(move |n| n.rule_index == rule_index)
}

fn terminal(tree: Option<&ParseTree>) -> Option<&Token> {
    match tree {
        Some(ParseTree::Terminal(t)) => Some(t),
        _ => None,
    }
}

fn arg(node: &RuleNode) -> Result<Arg, ArgListError> {
    let value_node = rule_children(node, rules::VALUE)
        .next()
        .ok_or_else(|| ArgListError::UnexpectedTree("argument without a value".into()))?;
    let name = match terminal(node.children.first()) {
        Some(t) if t.token_type == tokens::IDENT => Some(t.text.clone()),
        _ => None,
    };
    Ok(Arg {
        name,
        value: value(value_node)?,
    })
}

fn value(node: &RuleNode) -> Result<Value, ArgListError> {
    let first = node
        .children
        .first()
        .ok_or_else(|| ArgListError::UnexpectedTree("empty value".into()))?;
    let token = match first {
        ParseTree::Rule(inner) if inner.rule_index == rules::LIST => {
            return rule_children(inner, rules::VALUE)
                .map(value)
                .collect::<Result<_, _>>()
                .map(Value::List);
        }
        ParseTree::Rule(inner) if inner.rule_index == rules::CALL => {
            let name = terminal(inner.children.first())
                .map(|t| t.text.clone())
                .ok_or_else(|| ArgListError::UnexpectedTree("call without a name".into()))?;
            let args = rule_children(inner, rules::ARG)
                .map(arg)
                .collect::<Result<_, _>>()?;
            return Ok(Value::Call { name, args });
        }
        ParseTree::Rule(inner) => {
            return Err(ArgListError::UnexpectedTree(format!(
                "unexpected rule {} in value",
                inner.rule_index
            )));
        }
        ParseTree::Terminal(t) => t,
    };
    match token.token_type {
        tokens::NUMBER => token
            .text
            .parse()
            .map(Value::Number)
            .map_err(|_| ArgListError::InvalidNumber(token.text.clone())),
        tokens::STRING => unescape(&token.text)
            .map(Value::Str)
            .ok_or_else(|| ArgListError::InvalidString(token.text.clone())),
        tokens::TRUE => Ok(Value::Bool(true)),
        tokens::FALSE => Ok(Value::Bool(false)),
        tokens::NULL => Ok(Value::Null),
        tokens::IDENT => Ok(Value::Ident(token.text.clone())),
        other => Err(ArgListError::UnexpectedTree(format!(
            "unexpected token type {other} in value"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atn_runtime::{LexerError, ParseError};
    use atn_core::token::HIDDEN_CHANNEL;

    fn parser() -> ArgListParser {
        ArgListParser::new().unwrap()
    }

    #[test]
    fn positional_and_named() {
        let args = parser().parse(r#"(1, -2.5, "hi", flag=true, none=null)"#).unwrap();
        assert_eq!(
            args,
            vec![
                Arg::positional(Value::Number(1.0)),
                Arg::positional(Value::Number(-2.5)),
                Arg::positional(Value::Str("hi".into())),
                Arg::named("flag", Value::Bool(true)),
                Arg::named("none", Value::Null),
            ]
        );
    }

    #[test]
    fn name_versus_value_needs_two_tokens() {
        let p = parser();
        let args = p.parse("(speed, speed=fast, speed(2))").unwrap();
        assert_eq!(args[0], Arg::positional(Value::Ident("speed".into())));
        assert_eq!(args[1], Arg::named("speed", Value::Ident("fast".into())));
        assert_eq!(
            args[2],
            Arg::positional(Value::Call {
                name: "speed".into(),
                args: vec![Arg::positional(Value::Number(2.0))],
            })
        );
    }

    #[test]
    fn nesting() {
        let args = parser()
            .parse("(move(to=[1, 2, [3]], ease=out()), [])")
            .unwrap();
        assert_eq!(
            args[0].value,
            Value::Call {
                name: "move".into(),
                args: vec![
                    Arg::named(
                        "to",
                        Value::List(vec![
                            Value::Number(1.0),
                            Value::Number(2.0),
                            Value::List(vec![Value::Number(3.0)]),
                        ])
                    ),
                    Arg::named(
                        "ease",
                        Value::Call {
                            name: "out".into(),
                            args: vec![],
                        }
                    ),
                ],
            }
        );
        assert_eq!(args[1].value, Value::List(vec![]));
    }

    #[test]
    fn keywords_and_identifiers() {
        let args = parser().parse("(true, trueish, null_value, false)").unwrap();
        let values: Vec<_> = args.into_iter().map(|a| a.value).collect();
        assert_eq!(
            values,
            vec![
                Value::Bool(true),
                Value::Ident("trueish".into()),
                Value::Ident("null_value".into()),
                Value::Bool(false),
            ]
        );
    }

    #[test]
    fn comments_and_whitespace() {
        let p = parser();
        let text = "( 1 , # the first\n 2 )";
        assert_eq!(p.parse(text).unwrap().len(), 2);
        let tokens = p.tokenize(text).unwrap();
        assert!(tokens.iter().any(|t| t.channel == HIDDEN_CHANNEL && t.text == "# the first"));
        assert!(tokens.last().unwrap().is_eof());
    }

    #[test]
    fn lexer_errors_win() {
        match parser().parse("(1, $)") {
            Err(ArgListError::Lex(LexerError::NoViableToken { index, text, .. })) => {
                assert_eq!(index, 4);
                assert_eq!(text, "$");
            }
            other => panic!("expected a lexer error, got {other:?}"),
        }
    }

    #[test]
    fn syntax_errors() {
        let p = parser();
        assert!(matches!(
            p.parse("(1, 2"),
            Err(ArgListError::Parse(ParseError::MismatchedToken { .. }))
                | Err(ArgListError::Parse(ParseError::Prediction(_)))
        ));
        assert!(matches!(
            p.parse("(a=)"),
            Err(ArgListError::Parse(_))
        ));
        assert!(p.parse("()").unwrap().is_empty());
    }

    #[test]
    fn parse_tree_shape() {
        let p = parser();
        let tree = p.parse_tree("(x=1)").unwrap();
        assert_eq!(
            tree.to_sexpr(p.parser_grammar().rule_names()),
            "(args ( (arg x = (value 1)) ) <EOF>)"
        );
    }

    #[test]
    fn caches_warm_up() {
        let p = parser();
        assert_eq!(p.parser_grammar().cache_stats().states, 0);
        p.parse("(a, b=1)").unwrap();
        let warm = p.parser_grammar().cache_stats();
        assert!(warm.states > 0);
        p.parse("(a, b=1)").unwrap();
        assert_eq!(p.parser_grammar().cache_stats(), warm);
        assert!(p.lexer_grammar().cache_stats().states > 0);
    }
}
