// Grammar construction: element combinators compiled into ATN fragments.
//
// The builder never hands out an `Atn` directly. It serializes what it
// compiled and decodes the blob again, so every grammar goes through the same
// derivation and verification steps as one loaded from disk.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use atn_core::token::EOF;
use atn_core::{IntervalSet, Vocabulary};
use hashbrown::HashMap;

use crate::atn::{Atn, GrammarType};
use crate::deserialize::deserialize;
use crate::grammar::Grammar;
use crate::lexer_action::LexerAction;
use crate::serialize::serialize;
use crate::state::{AtnState, StateId, StateKind};
use crate::transition::{Transition, TransitionKind};
use crate::{DecodeError, EncodeError, NONE_WORD};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("unknown rule `{0}`")]
    UnknownRule(String),
    #[error("rule `{0}` is defined twice")]
    DuplicateRule(String),
    #[error("rule `{0}`: lexer commands are only valid in lexer grammars")]
    CommandInParser(String),
    #[error("grammar needs {0} states; the format holds at most 65534")]
    TooManyStates(usize),
    #[error("compiled grammar failed to encode: {0}")]
    Encode(#[from] EncodeError),
    #[error("compiled grammar failed to decode: {0}")]
    Decode(#[from] DecodeError),
}

/// A grammar element. Build these with the free functions of this module.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Atom(i32),
    Range(i32, i32),
    Set(IntervalSet),
    NotSet(IntervalSet),
    Wildcard,
    Rule { name: String, precedence: i32 },
    Seq(Vec<Element>),
    Alts(Vec<Element>),
    Optional { body: Box<Element>, greedy: bool },
    Star { body: Box<Element>, greedy: bool },
    Plus { body: Box<Element>, greedy: bool },
    Predicate(usize),
    Precedence(i32),
    Action(usize),
    Command(LexerAction),
}

pub fn tok(token_type: i32) -> Element {
    Element::Atom(token_type)
}

pub fn eof() -> Element {
    Element::Atom(EOF)
}

pub fn chr(c: char) -> Element {
    Element::Atom(c as i32)
}

/// A literal string, one atom per code point.
pub fn lit(s: &str) -> Element {
    let mut chars: Vec<Element> = s.chars().map(chr).collect();
    if chars.len() == 1 {
        chars.remove(0)
    } else {
        Element::Seq(chars)
    }
}

pub fn range(from: char, to: char) -> Element {
    Element::Range(from as i32, to as i32)
}

pub fn set(values: impl IntoIterator<Item = i32>) -> Element {
    Element::Set(values.into_iter().collect())
}

/// Any of the given characters.
pub fn one_of(chars: &str) -> Element {
    set(chars.chars().map(|c| c as i32))
}

/// Anything except the given characters.
pub fn none_of(chars: &str) -> Element {
    Element::NotSet(chars.chars().map(|c| c as i32).collect())
}

pub fn not_set(set: IntervalSet) -> Element {
    Element::NotSet(set)
}

pub fn any() -> Element {
    Element::Wildcard
}

pub fn rule(name: &str) -> Element {
    rule_prec(name, 0)
}

/// Invocation of a precedence rule at the given precedence level.
pub fn rule_prec(name: &str, precedence: i32) -> Element {
    Element::Rule {
        name: name.to_string(),
        precedence,
    }
}

pub fn seq(items: impl IntoIterator<Item = Element>) -> Element {
    Element::Seq(items.into_iter().collect())
}

pub fn alts(items: impl IntoIterator<Item = Element>) -> Element {
    Element::Alts(items.into_iter().collect())
}

pub fn opt(body: Element) -> Element {
    Element::Optional {
        body: Box::new(body),
        greedy: true,
    }
}

pub fn star(body: Element) -> Element {
    Element::Star {
        body: Box::new(body),
        greedy: true,
    }
}

pub fn plus(body: Element) -> Element {
    Element::Plus {
        body: Box::new(body),
        greedy: true,
    }
}

pub fn lazy_opt(body: Element) -> Element {
    Element::Optional {
        body: Box::new(body),
        greedy: false,
    }
}

pub fn lazy_star(body: Element) -> Element {
    Element::Star {
        body: Box::new(body),
        greedy: false,
    }
}

pub fn lazy_plus(body: Element) -> Element {
    Element::Plus {
        body: Box::new(body),
        greedy: false,
    }
}

pub fn pred(pred_index: usize) -> Element {
    Element::Predicate(pred_index)
}

pub fn prec(precedence: i32) -> Element {
    Element::Precedence(precedence)
}

pub fn action(action_index: usize) -> Element {
    Element::Action(action_index)
}

pub fn command(action: LexerAction) -> Element {
    Element::Command(action)
}

pub fn skip() -> Element {
    command(LexerAction::Skip)
}

pub fn channel(channel: u32) -> Element {
    command(LexerAction::Channel(channel))
}

pub fn push_mode(mode: usize) -> Element {
    command(LexerAction::PushMode(mode))
}

pub fn pop_mode() -> Element {
    command(LexerAction::PopMode)
}

pub fn more() -> Element {
    command(LexerAction::More)
}

#[derive(Debug, Clone)]
struct RuleDef {
    name: String,
    body: Element,
    /// Lexer: emitted token type, `0` for fragments.
    token_type: i32,
    fragment: bool,
    mode: usize,
    left_recursive: bool,
}

/// Builder for lexer and parser grammars.
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    name: String,
    grammar_type: GrammarType,
    literal_names: Vec<Option<String>>,
    symbolic_names: Vec<Option<String>>,
    rules: Vec<RuleDef>,
    modes: Vec<String>,
    current_mode: usize,
}

impl GrammarBuilder {
    pub fn parser(name: &str) -> Self {
        Self::new(name, GrammarType::Parser)
    }

    pub fn lexer(name: &str) -> Self {
        Self::new(name, GrammarType::Lexer)
    }

    fn new(name: &str, grammar_type: GrammarType) -> Self {
        Self {
            name: name.to_string(),
            grammar_type,
            literal_names: vec![None],
            symbolic_names: vec![None],
            rules: Vec::new(),
            modes: vec!["DEFAULT_MODE".to_string()],
            current_mode: 0,
        }
    }

    /// Declare a token, or return the type of an already declared one.
    /// `literal` is the quoted form, e.g. `Some("'('")`.
    pub fn token(&mut self, symbolic: &str, literal: Option<&str>) -> i32 {
        if let Some(t) = self
            .symbolic_names
            .iter()
            .position(|n| n.as_deref() == Some(symbolic))
        {
            if let Some(lit) = literal {
                self.literal_names[t] = Some(lit.to_string());
            }
            return t as i32;
        }
        self.symbolic_names.push(Some(symbolic.to_string()));
        self.literal_names.push(literal.map(str::to_string));
        (self.symbolic_names.len() - 1) as i32
    }

    /// Declare every token of `vocabulary` with the same types, so that a
    /// parser built here reads the tokens of a lexer built elsewhere.
    pub fn import_tokens(&mut self, vocabulary: &Vocabulary) {
        let max = vocabulary.max_token_type().max(0) as usize;
        self.literal_names.resize(max + 1, None);
        self.symbolic_names.resize(max + 1, None);
        for t in 1..=max {
            self.literal_names[t] = vocabulary.literal_name(t as i32).map(str::to_string);
            self.symbolic_names[t] = vocabulary.symbolic_name(t as i32).map(str::to_string);
        }
    }

    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::new(self.literal_names.clone(), self.symbolic_names.clone())
    }

    /// Add a parser rule. Returns its rule index.
    pub fn rule(&mut self, name: &str, body: Element) -> usize {
        self.push_rule(name, body, 0, false, false)
    }

    /// Add a left-recursive rule in its expanded form:
    /// `name : (primary alternatives) (operator alternatives)*`.
    ///
    /// Operator alternatives normally start with [`prec`] and invoke `name`
    /// through [`rule_prec`] at the next level.
    pub fn precedence_rule(
        &mut self,
        name: &str,
        primary: impl IntoIterator<Item = Element>,
        operators: impl IntoIterator<Item = Element>,
    ) -> usize {
        let body = seq([alts(primary), star(alts(operators))]);
        self.push_rule(name, body, 0, false, true)
    }

    /// Start a new lexer mode; following lexer rules belong to it.
    pub fn mode(&mut self, name: &str) -> usize {
        self.modes.push(name.to_string());
        self.current_mode = self.modes.len() - 1;
        self.current_mode
    }

    /// Add a token rule to the current mode. The token type is the declared
    /// token of the same name, created if needed.
    pub fn lexer_rule(&mut self, name: &str, body: Element) -> i32 {
        let token_type = self.token(name, None);
        self.push_rule(name, body, token_type, false, false);
        token_type
    }

    /// Add a helper rule that is only invoked by other lexer rules.
    pub fn fragment(&mut self, name: &str, body: Element) -> usize {
        self.push_rule(name, body, 0, true, false)
    }

    fn push_rule(
        &mut self,
        name: &str,
        body: Element,
        token_type: i32,
        fragment: bool,
        left_recursive: bool,
    ) -> usize {
        self.rules.push(RuleDef {
            name: name.to_string(),
            body,
            token_type,
            fragment,
            mode: self.current_mode,
            left_recursive,
        });
        self.rules.len() - 1
    }

    /// Serialized grammar.
    pub fn build(&self) -> Result<Vec<u8>, BuildError> {
        let atn = Compiler::new(self).compile()?;
        Ok(serialize(&atn)?)
    }

    /// The grammar as decoded from [`build`](Self::build)'s output.
    pub fn build_atn(&self) -> Result<Atn, BuildError> {
        Ok(deserialize(&self.build()?)?)
    }

    pub fn build_grammar(&self) -> Result<Grammar, BuildError> {
        Ok(Grammar::new(self.build_atn()?))
    }

    fn uuid(&self) -> u128 {
        let half = |salt: u64| {
            let mut h = DefaultHasher::new();
            salt.hash(&mut h);
            self.name.hash(&mut h);
            h.finish() as u128
        };
        (half(0) << 64) | half(1)
    }
}

#[derive(Clone, Copy)]
struct Handle {
    left: StateId,
    right: StateId,
}

struct Compiler<'a> {
    b: &'a GrammarBuilder,
    states: Vec<AtnState>,
    decisions: Vec<StateId>,
    lexer_actions: Vec<LexerAction>,
    rule_index: HashMap<&'a str, usize>,
    rule_starts: Vec<StateId>,
    rule_stops: Vec<StateId>,
    current_rule: usize,
}

impl<'a> Compiler<'a> {
    fn new(b: &'a GrammarBuilder) -> Self {
        Self {
            b,
            states: Vec::new(),
            decisions: Vec::new(),
            lexer_actions: Vec::new(),
            rule_index: HashMap::new(),
            rule_starts: Vec::new(),
            rule_stops: Vec::new(),
            current_rule: 0,
        }
    }

    fn compile(mut self) -> Result<Atn, BuildError> {
        let b = self.b;
        let is_lexer = b.grammar_type == GrammarType::Lexer;

        let mut mode_starts = Vec::new();
        if is_lexer {
            for _ in &b.modes {
                let s = self.new_state(StateKind::TokenStart);
                self.states[s].rule_index = None;
                mode_starts.push(s);
            }
        }

        for (i, r) in b.rules.iter().enumerate() {
            if self.rule_index.insert(r.name.as_str(), i).is_some() {
                return Err(BuildError::DuplicateRule(r.name.clone()));
            }
            self.current_rule = i;
            let start = self.new_state(StateKind::RuleStart);
            let stop = self.new_state(StateKind::RuleStop);
            self.states[start].left_recursive = r.left_recursive;
            self.rule_starts.push(start);
            self.rule_stops.push(stop);
        }

        for (i, r) in b.rules.iter().enumerate() {
            self.current_rule = i;
            let h = self.element(&r.body)?;
            self.epsilon(self.rule_starts[i], h.left);
            self.epsilon(h.right, self.rule_stops[i]);
        }

        if is_lexer {
            for (mode, &start) in mode_starts.iter().enumerate() {
                for (i, r) in b.rules.iter().enumerate() {
                    if !r.fragment && r.mode == mode {
                        self.epsilon(start, self.rule_starts[i]);
                    }
                }
                self.decisions.push(start);
            }
        }

        if self.states.len() >= NONE_WORD as usize {
            return Err(BuildError::TooManyStates(self.states.len()));
        }

        // Decisions are numbered by state index for a stable order.
        self.decisions.sort_unstable();
        let max_token_type = (b.symbolic_names.len().max(b.literal_names.len()) - 1) as i32;
        Ok(Atn {
            grammar_type: b.grammar_type,
            uuid: b.uuid(),
            max_token_type,
            states: self.states,
            decision_to_state: self.decisions,
            rule_to_start_state: self.rule_starts,
            rule_to_stop_state: self.rule_stops,
            rule_to_token_type: if is_lexer {
                b.rules.iter().map(|r| r.token_type).collect()
            } else {
                Vec::new()
            },
            mode_to_start_state: mode_starts,
            lexer_actions: self.lexer_actions,
            vocabulary: b.vocabulary(),
            rule_names: b.rules.iter().map(|r| r.name.clone()).collect(),
        })
    }

    fn new_state(&mut self, kind: StateKind) -> StateId {
        let id = self.states.len();
        self.states
            .push(AtnState::new(id, kind, Some(self.current_rule)));
        id
    }

    fn epsilon(&mut self, from: StateId, to: StateId) {
        self.states[from].add_transition(Transition::epsilon(to));
    }

    fn edge(&mut self, kind: TransitionKind) -> Handle {
        let left = self.new_state(StateKind::Basic);
        let right = self.new_state(StateKind::Basic);
        self.states[left].add_transition(Transition::new(right, kind));
        Handle { left, right }
    }

    fn rule_name(&self) -> String {
        self.b.rules[self.current_rule].name.clone()
    }

    fn element(&mut self, e: &Element) -> Result<Handle, BuildError> {
        Ok(match e {
            Element::Atom(t) => self.edge(TransitionKind::Atom(*t)),
            Element::Range(a, z) => self.edge(TransitionKind::Range { from: *a, to: *z }),
            Element::Set(s) => self.edge(TransitionKind::Set(s.clone())),
            Element::NotSet(s) => self.edge(TransitionKind::NotSet(s.clone())),
            Element::Wildcard => self.edge(TransitionKind::Wildcard),
            Element::Rule { name, precedence } => {
                let idx = *self
                    .rule_index
                    .get(name.as_str())
                    .ok_or_else(|| BuildError::UnknownRule(name.clone()))?;
                let left = self.new_state(StateKind::Basic);
                let right = self.new_state(StateKind::Basic);
                let target = self.rule_starts[idx];
                self.states[left].add_transition(Transition::new(
                    target,
                    TransitionKind::Rule {
                        rule_index: idx,
                        precedence: *precedence,
                        follow_state: right,
                    },
                ));
                Handle { left, right }
            }
            Element::Predicate(p) => self.edge(TransitionKind::Predicate {
                rule_index: self.current_rule,
                pred_index: *p,
                ctx_dependent: false,
            }),
            Element::Precedence(p) => self.edge(TransitionKind::Precedence(*p)),
            Element::Action(a) => self.edge(TransitionKind::Action {
                rule_index: self.current_rule,
                action_index: Some(*a),
                ctx_dependent: false,
            }),
            Element::Command(action) => {
                if self.b.grammar_type != GrammarType::Lexer {
                    return Err(BuildError::CommandInParser(self.rule_name()));
                }
                let idx = match self.lexer_actions.iter().position(|a| a == action) {
                    Some(i) => i,
                    None => {
                        self.lexer_actions.push(action.clone());
                        self.lexer_actions.len() - 1
                    }
                };
                self.edge(TransitionKind::Action {
                    rule_index: self.current_rule,
                    action_index: Some(idx),
                    ctx_dependent: false,
                })
            }
            Element::Seq(items) => self.sequence(items)?,
            Element::Alts(items) => match items.len() {
                0 => self.sequence(&[])?,
                1 => self.element(&items[0])?,
                _ => self.block(items, None)?,
            },
            Element::Optional { body, greedy } => self.block(alternatives(body), Some(*greedy))?,
            Element::Star { body, greedy } => self.star(alternatives(body), *greedy)?,
            Element::Plus { body, greedy } => self.plus(alternatives(body), *greedy)?,
        })
    }

    fn sequence(&mut self, items: &[Element]) -> Result<Handle, BuildError> {
        if items.is_empty() {
            let s = self.new_state(StateKind::Basic);
            return Ok(Handle { left: s, right: s });
        }
        let first = self.element(&items[0])?;
        let mut right = first.right;
        for item in &items[1..] {
            let h = self.element(item)?;
            self.epsilon(right, h.left);
            right = h.right;
        }
        Ok(Handle {
            left: first.left,
            right,
        })
    }

    /// Compile each alternative between `from` and `to`.
    fn branch(&mut self, from: StateId, to: StateId, alts: &[Element]) -> Result<(), BuildError> {
        for alt in alts {
            let h = self.element(alt)?;
            self.epsilon(from, h.left);
            self.epsilon(h.right, to);
        }
        Ok(())
    }

    /// Plain block; with `bypass` it is an optional block whose exit branch
    /// comes last when greedy and first otherwise.
    fn block(&mut self, alts: &[Element], bypass: Option<bool>) -> Result<Handle, BuildError> {
        let start = self.new_state(StateKind::BlockStart);
        let end = self.new_state(StateKind::BlockEnd);
        self.states[start].end_state = Some(end);
        if bypass == Some(false) {
            self.epsilon(start, end);
            self.states[start].non_greedy = true;
        }
        self.branch(start, end, alts)?;
        if bypass == Some(true) {
            self.epsilon(start, end);
        }
        if self.states[start].transitions.len() > 1 {
            self.decisions.push(start);
        }
        Ok(Handle {
            left: start,
            right: end,
        })
    }

    fn star(&mut self, alts: &[Element], greedy: bool) -> Result<Handle, BuildError> {
        let entry = self.new_state(StateKind::StarLoopEntry);
        let start = self.new_state(StateKind::StarBlockStart);
        let end = self.new_state(StateKind::BlockEnd);
        let back = self.new_state(StateKind::StarLoopBack);
        let exit = self.new_state(StateKind::LoopEnd);
        self.states[start].end_state = Some(end);
        self.states[exit].loop_back = Some(back);

        self.branch(start, end, alts)?;
        self.epsilon(end, back);
        self.epsilon(back, entry);
        if greedy {
            self.epsilon(entry, start);
            self.epsilon(entry, exit);
        } else {
            self.epsilon(entry, exit);
            self.epsilon(entry, start);
            self.states[entry].non_greedy = true;
        }
        self.decisions.push(entry);
        if alts.len() > 1 {
            self.decisions.push(start);
        }
        Ok(Handle {
            left: entry,
            right: exit,
        })
    }

    fn plus(&mut self, alts: &[Element], greedy: bool) -> Result<Handle, BuildError> {
        let start = self.new_state(StateKind::PlusBlockStart);
        let end = self.new_state(StateKind::BlockEnd);
        let back = self.new_state(StateKind::PlusLoopBack);
        let exit = self.new_state(StateKind::LoopEnd);
        self.states[start].end_state = Some(end);
        self.states[exit].loop_back = Some(back);

        self.branch(start, end, alts)?;
        self.epsilon(end, back);
        if greedy {
            self.epsilon(back, start);
            self.epsilon(back, exit);
        } else {
            self.epsilon(back, exit);
            self.epsilon(back, start);
            self.states[back].non_greedy = true;
        }
        self.decisions.push(back);
        if alts.len() > 1 {
            self.decisions.push(start);
        }
        Ok(Handle {
            left: start,
            right: exit,
        })
    }
}

/// The alternatives of a loop or optional body.
fn alternatives(body: &Element) -> &[Element] {
    match body {
        Element::Alts(items) if !items.is_empty() => items,
        other => std::slice::from_ref(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_alternative_rule_has_no_block() {
        let mut g = GrammarBuilder::parser("t");
        let a = g.token("A", None);
        g.rule("s", seq([tok(a), eof()]));
        let atn = g.build_atn().unwrap();
        assert_eq!(atn.num_decisions(), 0);
        assert!(
            atn.states
                .iter()
                .all(|s| !s.kind.is_block_start() && s.kind != StateKind::BlockEnd)
        );
    }

    #[test]
    fn star_loop_shape() {
        let mut g = GrammarBuilder::parser("t");
        let a = g.token("A", None);
        g.rule("s", star(tok(a)));
        let atn = g.build_atn().unwrap();
        let entry = &atn.states[atn.decision_to_state[0]];
        assert_eq!(entry.kind, StateKind::StarLoopEntry);
        let [into, out] = [entry.transitions[0].target, entry.transitions[1].target];
        assert_eq!(atn.states[into].kind, StateKind::StarBlockStart);
        assert_eq!(atn.states[out].kind, StateKind::LoopEnd);
        let back = entry.loop_back.unwrap();
        assert_eq!(atn.states[back].kind, StateKind::StarLoopBack);
        assert_eq!(atn.states[out].loop_back, Some(back));
        assert!(!entry.precedence_decision);
    }

    #[test]
    fn non_greedy_loop_exits_first() {
        let mut g = GrammarBuilder::parser("t");
        let a = g.token("A", None);
        g.rule("s", lazy_star(tok(a)));
        let atn = g.build_atn().unwrap();
        let entry = &atn.states[atn.decision_to_state[0]];
        assert!(entry.non_greedy);
        assert_eq!(
            atn.states[entry.transitions[0].target].kind,
            StateKind::LoopEnd
        );
    }

    #[test]
    fn optional_of_alternatives_is_one_block() {
        let mut g = GrammarBuilder::parser("t");
        let a = g.token("A", None);
        let b = g.token("B", None);
        g.rule("s", opt(alts([tok(a), tok(b)])));
        let atn = g.build_atn().unwrap();
        assert_eq!(atn.num_decisions(), 1);
        assert_eq!(atn.states[atn.decision_to_state[0]].transitions.len(), 3);
    }

    #[test]
    fn precedence_rule_marks_decision() {
        let mut g = GrammarBuilder::parser("expr");
        let int = g.token("INT", None);
        let star_tok = g.token("STAR", Some("'*'"));
        g.precedence_rule(
            "e",
            [tok(int)],
            [seq([prec(2), tok(star_tok), rule_prec("e", 3)])],
        );
        let atn = g.build_atn().unwrap();
        assert!(atn.states[atn.rule_to_start_state[0]].left_recursive);
        let marked: Vec<_> = atn
            .states
            .iter()
            .filter(|s| s.precedence_decision)
            .collect();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].kind, StateKind::StarLoopEntry);
    }

    #[test]
    fn lexer_modes_and_commands() {
        let mut g = GrammarBuilder::lexer("lex");
        let id = g.lexer_rule("ID", plus(range('a', 'z')));
        g.lexer_rule("WS", seq([plus(one_of(" \t")), skip()]));
        g.lexer_rule("QUOTE", seq([chr('"'), push_mode(1)]));
        g.mode("STRING");
        g.lexer_rule("TEXT", plus(none_of("\"")));
        g.lexer_rule("END", seq([chr('"'), pop_mode()]));
        let atn = g.build_atn().unwrap();

        assert_eq!(atn.grammar_type, GrammarType::Lexer);
        assert_eq!(atn.mode_to_start_state.len(), 2);
        assert_eq!(atn.rule_to_token_type[0], id);
        assert_eq!(
            atn.lexer_actions,
            vec![LexerAction::Skip, LexerAction::PushMode(1), LexerAction::PopMode]
        );
        let default_mode = &atn.states[atn.mode_to_start_state[0]];
        assert_eq!(default_mode.transitions.len(), 3);
        assert!(default_mode.decision.is_some());
    }

    #[test]
    fn fragments_are_not_mode_alternatives() {
        let mut g = GrammarBuilder::lexer("lex");
        g.fragment("DIGIT", range('0', '9'));
        g.lexer_rule("INT", plus(rule("DIGIT")));
        let atn = g.build_atn().unwrap();
        assert_eq!(atn.states[atn.mode_to_start_state[0]].transitions.len(), 1);
        assert_eq!(atn.rule_to_token_type, vec![0, 1]);
    }

    #[test]
    fn errors() {
        let mut g = GrammarBuilder::parser("t");
        g.rule("s", rule("missing"));
        assert!(matches!(g.build(), Err(BuildError::UnknownRule(n)) if n == "missing"));

        let mut g = GrammarBuilder::parser("t");
        g.rule("s", eof());
        g.rule("s", eof());
        assert!(matches!(g.build(), Err(BuildError::DuplicateRule(_))));

        let mut g = GrammarBuilder::parser("t");
        g.rule("s", skip());
        assert!(matches!(g.build(), Err(BuildError::CommandInParser(_))));

        let mut g = GrammarBuilder::parser("t");
        let name = "T".repeat(70_000);
        let t = g.token(&name, None);
        g.rule("s", tok(t));
        assert!(matches!(
            g.build(),
            Err(BuildError::Encode(EncodeError::StringTooLong(70_000)))
        ));
    }

    #[test]
    fn same_name_same_uuid() {
        let a = GrammarBuilder::parser("g").uuid();
        let b = GrammarBuilder::parser("g").uuid();
        let c = GrammarBuilder::parser("h").uuid();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn import_tokens_keeps_types() {
        let mut lex = GrammarBuilder::lexer("l");
        lex.token("LP", Some("'('"));
        lex.lexer_rule("ID", plus(range('a', 'z')));
        let mut p = GrammarBuilder::parser("p");
        p.import_tokens(&lex.vocabulary());
        assert_eq!(p.token("ID", None), 2);
        assert_eq!(p.vocabulary().display_name(1), "'('");
    }
}
