// Parser interpreter: walks a parser ATN over a token stream, asking the
// prediction engine at every decision, and records the walk as a parse tree.
//
// Rule invocations live in an arena of frames addressed by index. Entering a
// left-recursive rule pushes its precedence and remembers the caller; each
// further trip around the operator loop wraps the frame built so far in a
// fresh frame for the same rule, so `1 + 2` becomes `(e (e 1) + (e 2))`.

use std::fmt::Write as _;

use atn_core::Token;
use atn_core::token::MIN_USER_TOKEN_TYPE;

use crate::atn::Atn;
use crate::grammar::Grammar;
use crate::parser_sim::{AmbiguityReport, ParserAtnSimulator};
use crate::semantic::{AcceptAll, SemanticContext, SemanticEvaluator};
use crate::state::{StateId, StateKind};
use crate::stream::TokenStream;
use crate::transition::TransitionKind;
use crate::ParseError;

/// A node of a parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ParseTree {
    Rule(RuleNode),
    Terminal(Token),
}

/// One rule invocation and what it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RuleNode {
    pub rule_index: usize,
    /// State holding the rule transition that invoked this rule; `None` for
    /// the start rule.
    pub invoking_state: Option<StateId>,
    /// Index of the first token.
    pub start: usize,
    /// Index of the last token, `None` if the rule matched nothing.
    pub stop: Option<usize>,
    pub children: Vec<ParseTree>,
}

impl ParseTree {
    pub fn as_rule(&self) -> Option<&RuleNode> {
        match self {
            Self::Rule(node) => Some(node),
            Self::Terminal(_) => None,
        }
    }

    pub fn children(&self) -> &[ParseTree] {
        match self {
            Self::Rule(node) => &node.children,
            Self::Terminal(_) => &[],
        }
    }

    /// Concatenated text of the matched tokens, EOF excluded.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) {
        match self {
            Self::Terminal(t) if !t.is_eof() => out.push_str(&t.text),
            Self::Terminal(_) => {}
            Self::Rule(node) => node.children.iter().for_each(|c| c.write_text(out)),
        }
    }

    /// LISP-style rendering: `(s (e (e 1) + (e 2)) <EOF>)`. A rule that
    /// matched nothing prints as its bare name.
    pub fn to_sexpr(&self, rule_names: &[String]) -> String {
        let mut out = String::new();
        self.write_sexpr(rule_names, &mut out);
        out
    }

    fn write_sexpr(&self, rule_names: &[String], out: &mut String) {
        match self {
            Self::Terminal(t) if t.is_eof() => out.push_str("<EOF>"),
            Self::Terminal(t) => {
                for c in t.text.chars() {
                    match c {
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        c => out.push(c),
                    }
                }
            }
            Self::Rule(node) => {
                let name = rule_names
                    .get(node.rule_index)
                    .map_or_else(|| node.rule_index.to_string(), String::clone);
                if node.children.is_empty() {
                    out.push_str(&name);
                    return;
                }
                let _ = write!(out, "({name}");
                for child in &node.children {
                    out.push(' ');
                    child.write_sexpr(rule_names, out);
                }
                out.push(')');
            }
        }
    }
}

/// A parse tree plus what prediction noticed along the way.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub tree: ParseTree,
    /// Reported only when the grammar's options ask for them.
    pub ambiguities: Vec<AmbiguityReport>,
    /// Decisions that needed full-context prediction.
    pub full_context_decisions: usize,
}

/// Builds parse trees for a parser [`Grammar`]. No error recovery: the
/// first mismatch, failed predicate or prediction error ends the parse.
#[derive(Clone, Copy)]
pub struct ParserInterpreter<'g> {
    grammar: &'g Grammar,
    evaluator: &'g dyn SemanticEvaluator,
}

impl<'g> ParserInterpreter<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            evaluator: &AcceptAll,
        }
    }

    pub fn with_evaluator(mut self, evaluator: &'g dyn SemanticEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Parse `input` starting at `start_rule`.
    pub fn parse<S: TokenStream + ?Sized>(
        &self,
        input: &mut S,
        start_rule: usize,
    ) -> Result<ParseTree, ParseError> {
        Ok(self.parse_with_diagnostics(input, start_rule)?.tree)
    }

    /// Parse `input` starting at the rule called `name`.
    pub fn parse_rule<S: TokenStream + ?Sized>(
        &self,
        input: &mut S,
        name: &str,
    ) -> Result<ParseTree, ParseError> {
        let rule = self
            .grammar
            .atn()
            .rule_index(name)
            .ok_or_else(|| ParseError::UnknownRule(name.to_string()))?;
        self.parse(input, rule)
    }

    pub fn parse_with_diagnostics<S: TokenStream + ?Sized>(
        &self,
        input: &mut S,
        start_rule: usize,
    ) -> Result<ParseOutcome, ParseError> {
        let atn = self.grammar.atn();
        if atn.is_lexer() {
            return Err(ParseError::NotAParser);
        }
        if start_rule >= atn.num_rules() {
            return Err(ParseError::UnknownRule(start_rule.to_string()));
        }
        let mut walker = Walker {
            atn,
            sim: self.grammar.simulator(),
            evaluator: self.evaluator,
            input,
            frames: Vec::new(),
            ctx: 0,
            state: 0,
            precedence_stack: vec![0],
            parent_stack: Vec::new(),
            ambiguities: Vec::new(),
            full_context_decisions: 0,
        };
        let root = walker.run(start_rule)?;
        let tree = ParseTree::Rule(walker.build(root));
        Ok(ParseOutcome {
            tree,
            ambiguities: walker.ambiguities,
            full_context_decisions: walker.full_context_decisions,
        })
    }
}

/// Forwards to the caller's evaluator, answering precedence queries from
/// the interpreter's precedence stack.
struct AtPrecedence<'e> {
    inner: &'e dyn SemanticEvaluator,
    precedence: i32,
}

impl SemanticEvaluator for AtPrecedence<'_> {
    fn predicate(&self, rule_index: usize, pred_index: usize) -> bool {
        self.inner.predicate(rule_index, pred_index)
    }

    fn precedence(&self) -> i32 {
        self.precedence
    }

    fn action(&self, rule_index: usize, action_index: usize) {
        self.inner.action(rule_index, action_index);
    }
}

#[derive(Debug)]
enum Child {
    Rule(usize),
    Token(Token),
}

#[derive(Debug)]
struct Frame {
    rule_index: usize,
    invoking_state: Option<StateId>,
    follow_state: Option<StateId>,
    parent: Option<usize>,
    start: usize,
    stop: Option<usize>,
    children: Vec<Child>,
}

/// Where to go back to when a left-recursive invocation finishes.
#[derive(Debug, Clone, Copy, Default)]
struct Caller {
    frame: Option<usize>,
    invoking_state: Option<StateId>,
    follow_state: Option<StateId>,
}

struct Walker<'w, S: ?Sized> {
    atn: &'w Atn,
    sim: ParserAtnSimulator<'w>,
    evaluator: &'w dyn SemanticEvaluator,
    input: &'w mut S,
    frames: Vec<Frame>,
    ctx: usize,
    state: StateId,
    precedence_stack: Vec<i32>,
    parent_stack: Vec<Caller>,
    ambiguities: Vec<AmbiguityReport>,
    full_context_decisions: usize,
}

impl<S: TokenStream + ?Sized> Walker<'_, S> {
    /// Returns the frame at the root of the finished tree.
    fn run(&mut self, start_rule: usize) -> Result<usize, ParseError> {
        let atn = self.atn;
        let start_state = atn.rule_to_start_state[start_rule];
        let root = self.new_frame(Caller::default(), start_rule);
        if atn.states[start_state].left_recursive {
            self.enter_recursion_rule(root, Caller::default(), start_state, 0);
        } else {
            self.enter_rule(root, start_state);
        }
        loop {
            let p = &atn.states[self.state];
            if p.is_rule_stop() {
                if let Some(done) = self.return_from_rule(p.rule_index.unwrap_or(start_rule)) {
                    return Ok(done);
                }
            } else {
                self.visit_state(self.state)?;
            }
        }
    }

    fn new_frame(&mut self, caller: Caller, rule_index: usize) -> usize {
        self.frames.push(Frame {
            rule_index,
            invoking_state: caller.invoking_state,
            follow_state: caller.follow_state,
            parent: caller.frame,
            start: self.input.index(),
            stop: None,
            children: Vec::new(),
        });
        self.frames.len() - 1
    }

    fn last_token_index(&self) -> Option<usize> {
        self.input.index().checked_sub(1)
    }

    fn enter_rule(&mut self, frame: usize, state: StateId) {
        self.state = state;
        self.ctx = frame;
        self.frames[frame].start = self.input.index();
        if let Some(parent) = self.frames[frame].parent {
            self.frames[parent].children.push(Child::Rule(frame));
        }
    }

    fn enter_recursion_rule(&mut self, frame: usize, caller: Caller, state: StateId, precedence: i32) {
        self.parent_stack.push(caller);
        self.state = state;
        self.precedence_stack.push(precedence);
        self.ctx = frame;
        self.frames[frame].start = self.input.index();
    }

    /// Wrap the current frame in `frame`, which becomes the current one.
    fn push_new_recursion_context(&mut self, frame: usize, rule_start: StateId) {
        let previous = self.ctx;
        let stop = self.last_token_index();
        let prev = &mut self.frames[previous];
        prev.parent = Some(frame);
        prev.invoking_state = Some(rule_start);
        prev.stop = stop;
        let start = prev.start;
        self.ctx = frame;
        let cur = &mut self.frames[frame];
        cur.start = start;
        cur.children.push(Child::Rule(previous));
    }

    fn unroll_recursion_contexts(&mut self, parent: Option<usize>) {
        self.precedence_stack.pop();
        let finished = self.ctx;
        self.frames[finished].stop = self.last_token_index();
        self.frames[finished].parent = parent;
        if let Some(parent) = parent {
            self.frames[parent].children.push(Child::Rule(finished));
            self.ctx = parent;
        }
    }

    /// Leave the current rule. Returns the root frame once the start rule
    /// itself has finished.
    fn return_from_rule(&mut self, rule_index: usize) -> Option<usize> {
        let atn = self.atn;
        let rule_start = atn.rule_to_start_state[rule_index];
        let follow = if atn.states[rule_start].left_recursive {
            let caller = self.parent_stack.pop().unwrap_or_default();
            let finished = self.ctx;
            self.unroll_recursion_contexts(caller.frame);
            match caller.follow_state {
                Some(follow) => follow,
                None => return Some(finished),
            }
        } else {
            let finished = self.ctx;
            self.frames[finished].stop = self.last_token_index();
            let frame = &self.frames[finished];
            match (frame.parent, frame.follow_state) {
                (Some(parent), Some(follow)) => {
                    self.ctx = parent;
                    follow
                }
                _ => return Some(finished),
            }
        };
        self.state = follow;
        None
    }

    fn visit_state(&mut self, p: StateId) -> Result<(), ParseError> {
        let atn = self.atn;
        let state = &atn.states[p];
        let alt = match state.decision {
            Some(decision) if state.transitions.len() > 1 => self.visit_decision(decision)?,
            _ => 1,
        };
        let Some(trans) = state.transitions.get(alt - 1) else {
            return Err(self.mismatch(p));
        };
        match &trans.kind {
            TransitionKind::Epsilon { .. } => {
                if state.kind == StateKind::StarLoopEntry
                    && state.precedence_decision
                    && atn.states[trans.target].kind != StateKind::LoopEnd
                {
                    let caller = self.parent_stack.last().copied().unwrap_or_default();
                    let rule_index = self.frames[self.ctx].rule_index;
                    let frame = self.new_frame(caller, rule_index);
                    self.push_new_recursion_context(frame, atn.rule_to_start_state[rule_index]);
                }
            }
            TransitionKind::Atom(_)
            | TransitionKind::Range { .. }
            | TransitionKind::Set(_)
            | TransitionKind::NotSet(_)
            | TransitionKind::Wildcard => {
                let t = self.input.la(1);
                if !trans.matches(t, MIN_USER_TOKEN_TYPE, atn.max_token_type) {
                    return Err(self.mismatch(p));
                }
                self.consume();
            }
            TransitionKind::Rule {
                rule_index,
                precedence,
                follow_state,
            } => {
                let caller = Caller {
                    frame: Some(self.ctx),
                    invoking_state: Some(p),
                    follow_state: Some(*follow_state),
                };
                let frame = self.new_frame(caller, *rule_index);
                if atn.states[trans.target].left_recursive {
                    self.enter_recursion_rule(frame, caller, trans.target, *precedence);
                } else {
                    self.enter_rule(frame, trans.target);
                }
                return Ok(());
            }
            TransitionKind::Predicate {
                rule_index,
                pred_index,
                ctx_dependent,
            } => {
                if !self.evaluator.predicate(*rule_index, *pred_index) {
                    let predicate = SemanticContext::Predicate {
                        rule_index: *rule_index,
                        pred_index: *pred_index,
                        ctx_dependent: *ctx_dependent,
                    };
                    return Err(self.failed_predicate(predicate));
                }
            }
            TransitionKind::Action {
                rule_index,
                action_index,
                ..
            } => {
                if let Some(action) = action_index {
                    self.evaluator.action(*rule_index, *action);
                }
            }
            TransitionKind::Precedence(precedence) => {
                if !self.scoped_evaluator().precedence_predicate(*precedence) {
                    return Err(self.failed_predicate(SemanticContext::Precedence(*precedence)));
                }
            }
        }
        self.state = trans.target;
        Ok(())
    }

    fn scoped_evaluator(&self) -> AtPrecedence<'_> {
        AtPrecedence {
            inner: self.evaluator,
            precedence: self.precedence_stack.last().copied().unwrap_or(0),
        }
    }

    fn visit_decision(&mut self, decision: usize) -> Result<usize, ParseError> {
        let invoking = self.invoking_states();
        let evaluator = AtPrecedence {
            inner: self.evaluator,
            precedence: self.precedence_stack.last().copied().unwrap_or(0),
        };
        let prediction = self
            .sim
            .adaptive_predict(&mut *self.input, decision, &invoking, &evaluator)?;
        if prediction.full_context {
            self.full_context_decisions += 1;
        }
        if let Some(report) = prediction.ambiguity {
            self.ambiguities.push(report);
        }
        Ok(prediction.alt)
    }

    /// The call stack, outermost first.
    fn invoking_states(&self) -> Vec<StateId> {
        let mut states = Vec::new();
        let mut frame = Some(self.ctx);
        while let Some(i) = frame {
            let Some(s) = self.frames[i].invoking_state else {
                break;
            };
            states.push(s);
            frame = self.frames[i].parent;
        }
        states.reverse();
        states
    }

    fn consume(&mut self) {
        let token = self.input.lt(1).cloned().unwrap_or_default();
        if !token.is_eof() {
            self.input.consume();
        }
        self.frames[self.ctx].children.push(Child::Token(token));
    }

    fn mismatch(&mut self, state: StateId) -> ParseError {
        let expected = self.atn.expected_tokens(state, &self.invoking_states());
        let token = self.input.lt(1).cloned().unwrap_or_default();
        ParseError::MismatchedToken {
            index: self.input.index(),
            line: token.line,
            column: token.column,
            found: if token.is_eof() {
                "<EOF>".to_string()
            } else {
                token.text
            },
            expected_names: self.atn.vocabulary.format_set(&expected),
            expected,
        }
    }

    fn failed_predicate(&mut self, predicate: SemanticContext) -> ParseError {
        let token = self.input.lt(1).cloned().unwrap_or_default();
        ParseError::FailedPredicate {
            rule: self.atn.rule_name(self.frames[self.ctx].rule_index),
            predicate: predicate.to_string(),
            index: self.input.index(),
            line: token.line,
            column: token.column,
        }
    }

    /// Move frame `i` and its descendants out of the arena into a tree.
    fn build(&mut self, i: usize) -> RuleNode {
        let children = std::mem::take(&mut self.frames[i].children);
        let frame = &self.frames[i];
        let (rule_index, invoking_state, start, stop) =
            (frame.rule_index, frame.invoking_state, frame.start, frame.stop);
        RuleNode {
            rule_index,
            invoking_state,
            start,
            stop,
            children: children
                .into_iter()
                .map(|c| match c {
                    Child::Rule(j) => ParseTree::Rule(self.build(j)),
                    Child::Token(t) => ParseTree::Terminal(t),
                })
                .collect(),
        }
    }
}
