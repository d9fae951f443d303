// ATN states: kinds, per-kind links and the cached LL(1) follow set.

use std::sync::OnceLock;

use atn_core::IntervalSet;

use crate::transition::Transition;

/// Index of a state in [`Atn::states`](crate::Atn::states).
pub type StateId = usize;

/// State kind. Discriminants are the serialized codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StateKind {
    /// Placeholder for a removed state; keeps indices stable.
    Invalid = 0,
    Basic = 1,
    RuleStart = 2,
    BlockStart = 3,
    PlusBlockStart = 4,
    StarBlockStart = 5,
    /// Lexer mode entry; one alternative per token rule of the mode.
    TokenStart = 6,
    RuleStop = 7,
    BlockEnd = 8,
    StarLoopBack = 9,
    StarLoopEntry = 10,
    PlusLoopBack = 11,
    LoopEnd = 12,
}

impl StateKind {
    pub fn from_u16(code: u16) -> Option<Self> {
        Some(match code {
            0 => Self::Invalid,
            1 => Self::Basic,
            2 => Self::RuleStart,
            3 => Self::BlockStart,
            4 => Self::PlusBlockStart,
            5 => Self::StarBlockStart,
            6 => Self::TokenStart,
            7 => Self::RuleStop,
            8 => Self::BlockEnd,
            9 => Self::StarLoopBack,
            10 => Self::StarLoopEntry,
            11 => Self::PlusLoopBack,
            12 => Self::LoopEnd,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    /// Kinds that open a block and carry a link to their `BlockEnd`.
    pub fn is_block_start(self) -> bool {
        matches!(
            self,
            Self::BlockStart | Self::PlusBlockStart | Self::StarBlockStart
        )
    }

    /// Kinds that may own a decision number.
    pub fn is_decision(self) -> bool {
        self.is_block_start()
            || matches!(
                self,
                Self::TokenStart | Self::StarLoopEntry | Self::PlusLoopBack
            )
    }
}

/// One node of the network.
#[derive(Debug, Clone)]
pub struct AtnState {
    pub index: StateId,
    pub kind: StateKind,
    pub rule_index: Option<usize>,
    pub transitions: Vec<Transition>,
    /// True when the state has transitions and all of them are epsilon.
    pub epsilon_only: bool,
    /// Decision number for decision-kind states that own one.
    pub decision: Option<usize>,
    pub non_greedy: bool,
    /// Block starts: matching `BlockEnd`.
    pub end_state: Option<StateId>,
    /// `BlockEnd`: matching block start.
    pub start_state: Option<StateId>,
    /// `LoopEnd`, `StarLoopEntry`, `PlusBlockStart`: the loop-back state.
    pub loop_back: Option<StateId>,
    /// `RuleStart`: the rule's stop state.
    pub stop_state: Option<StateId>,
    /// `RuleStart` of a precedence (left-recursive) rule.
    pub left_recursive: bool,
    /// `StarLoopEntry` that decides whether a left-recursive rule iterates.
    pub precedence_decision: bool,
    pub(crate) next_tokens: OnceLock<IntervalSet>,
}

impl AtnState {
    pub fn new(index: StateId, kind: StateKind, rule_index: Option<usize>) -> Self {
        Self {
            index,
            kind,
            rule_index,
            transitions: Vec::new(),
            epsilon_only: false,
            decision: None,
            non_greedy: false,
            end_state: None,
            start_state: None,
            loop_back: None,
            stop_state: None,
            left_recursive: false,
            precedence_decision: false,
            next_tokens: OnceLock::new(),
        }
    }

    pub fn add_transition(&mut self, t: Transition) {
        self.transitions.push(t);
        self.epsilon_only = self.transitions.iter().all(Transition::is_epsilon);
    }

    /// True if some transitions are epsilon and some are not.
    pub fn has_mixed_transitions(&self) -> bool {
        let eps = self.transitions.iter().filter(|t| t.is_epsilon()).count();
        eps != 0 && eps != self.transitions.len()
    }

    pub fn is_rule_stop(&self) -> bool {
        self.kind == StateKind::RuleStop
    }
}
