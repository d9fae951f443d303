// ATN transitions (edges) and their serialized kind codes.

use atn_core::IntervalSet;
use atn_core::token::EOF;

use crate::state::StateId;

pub const EPSILON: u16 = 1;
pub const RANGE: u16 = 2;
pub const RULE: u16 = 3;
pub const PREDICATE: u16 = 4;
pub const ATOM: u16 = 5;
pub const ACTION: u16 = 6;
pub const SET: u16 = 7;
pub const NOT_SET: u16 = 8;
pub const WILDCARD: u16 = 9;
pub const PRECEDENCE: u16 = 10;

/// Edge label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionKind {
    /// Unlabeled edge. `outermost_precedence_return` is set on the return
    /// edges of a precedence rule invoked with precedence 0 and names that rule.
    Epsilon {
        outermost_precedence_return: Option<usize>,
    },
    Range {
        from: i32,
        to: i32,
    },
    /// Rule invocation. The transition target is the callee's start state;
    /// `follow_state` is where matching resumes after the callee returns.
    Rule {
        rule_index: usize,
        precedence: i32,
        follow_state: StateId,
    },
    Predicate {
        rule_index: usize,
        pred_index: usize,
        ctx_dependent: bool,
    },
    Atom(i32),
    Action {
        rule_index: usize,
        action_index: Option<usize>,
        ctx_dependent: bool,
    },
    Set(IntervalSet),
    NotSet(IntervalSet),
    Wildcard,
    /// Precedence predicate `precedence >= p` in a left-recursive rule.
    Precedence(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target: StateId,
    pub kind: TransitionKind,
}

impl Transition {
    pub fn new(target: StateId, kind: TransitionKind) -> Self {
        Self { target, kind }
    }

    pub fn epsilon(target: StateId) -> Self {
        Self::new(
            target,
            TransitionKind::Epsilon {
                outermost_precedence_return: None,
            },
        )
    }

    pub fn code(&self) -> u16 {
        match self.kind {
            TransitionKind::Epsilon { .. } => EPSILON,
            TransitionKind::Range { .. } => RANGE,
            TransitionKind::Rule { .. } => RULE,
            TransitionKind::Predicate { .. } => PREDICATE,
            TransitionKind::Atom(_) => ATOM,
            TransitionKind::Action { .. } => ACTION,
            TransitionKind::Set(_) => SET,
            TransitionKind::NotSet(_) => NOT_SET,
            TransitionKind::Wildcard => WILDCARD,
            TransitionKind::Precedence(_) => PRECEDENCE,
        }
    }

    /// Edges that consume no input.
    pub fn is_epsilon(&self) -> bool {
        matches!(
            self.kind,
            TransitionKind::Epsilon { .. }
                | TransitionKind::Rule { .. }
                | TransitionKind::Predicate { .. }
                | TransitionKind::Action { .. }
                | TransitionKind::Precedence(_)
        )
    }

    /// Explicit label set, if the edge has one. For `NotSet` this is the
    /// excluded set; callers complement it against the vocabulary.
    pub fn label(&self) -> Option<IntervalSet> {
        match &self.kind {
            TransitionKind::Atom(a) => Some(IntervalSet::of(*a)),
            TransitionKind::Range { from, to } => Some(IntervalSet::of_range(*from, *to)),
            TransitionKind::Set(set) | TransitionKind::NotSet(set) => Some(set.clone()),
            _ => None,
        }
    }

    /// Whether the edge consumes `symbol`, given the symbol space
    /// `min_vocab..=max_vocab` used by wildcard and not-set edges.
    pub fn matches(&self, symbol: i32, min_vocab: i32, max_vocab: i32) -> bool {
        match &self.kind {
            TransitionKind::Atom(a) => *a == symbol,
            TransitionKind::Range { from, to } => *from <= symbol && symbol <= *to,
            TransitionKind::Set(set) => set.contains(symbol),
            TransitionKind::NotSet(set) => {
                symbol >= min_vocab && symbol <= max_vocab && !set.contains(symbol)
            }
            TransitionKind::Wildcard => symbol >= min_vocab && symbol <= max_vocab,
            _ => false,
        }
    }

    pub fn is_eof_atom(&self) -> bool {
        matches!(self.kind, TransitionKind::Atom(EOF))
    }
}
