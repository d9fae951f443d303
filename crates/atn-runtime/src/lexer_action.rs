// Lexer commands (skip, channel, mode, ...) and the per-token executor that
// applies them once a token is accepted.

use std::sync::Arc;

use crate::semantic::SemanticEvaluator;

pub const CHANNEL: u16 = 0;
pub const CUSTOM: u16 = 1;
pub const MODE: u16 = 2;
pub const MORE: u16 = 3;
pub const POP_MODE: u16 = 4;
pub const PUSH_MODE: u16 = 5;
pub const SKIP: u16 = 6;
pub const TYPE: u16 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LexerAction {
    Channel(u32),
    Custom {
        rule_index: usize,
        action_index: usize,
    },
    Mode(usize),
    More,
    PopMode,
    PushMode(usize),
    Skip,
    Type(i32),
    /// A position-dependent action pinned to `offset` code points after the
    /// token start. Never serialized.
    Indexed {
        offset: usize,
        action: Box<LexerAction>,
    },
}

impl LexerAction {
    /// Decode `(kind, data1, data2)` from the serialized action table.
    pub fn from_words(kind: u16, data1: u16, data2: u16) -> Option<Self> {
        Some(match kind {
            CHANNEL => Self::Channel(data1 as u32),
            CUSTOM => Self::Custom {
                rule_index: data1 as usize,
                action_index: data2 as usize,
            },
            MODE => Self::Mode(data1 as usize),
            MORE => Self::More,
            POP_MODE => Self::PopMode,
            PUSH_MODE => Self::PushMode(data1 as usize),
            SKIP => Self::Skip,
            TYPE => Self::Type(data1 as i32),
            _ => return None,
        })
    }

    /// Inverse of [`from_words`](Self::from_words). `Indexed` encodes as
    /// its inner action.
    pub fn to_words(&self) -> (u16, u16, u16) {
        match self {
            Self::Channel(c) => (CHANNEL, *c as u16, 0),
            Self::Custom {
                rule_index,
                action_index,
            } => (CUSTOM, *rule_index as u16, *action_index as u16),
            Self::Mode(m) => (MODE, *m as u16, 0),
            Self::More => (MORE, 0, 0),
            Self::PopMode => (POP_MODE, 0, 0),
            Self::PushMode(m) => (PUSH_MODE, *m as u16, 0),
            Self::Skip => (SKIP, 0, 0),
            Self::Type(t) => (TYPE, *t as u16, 0),
            Self::Indexed { action, .. } => action.to_words(),
        }
    }

    /// Actions whose effect depends on the input position at which they run.
    pub fn is_position_dependent(&self) -> bool {
        matches!(self, Self::Custom { .. } | Self::Indexed { .. })
    }
}

/// Mutable lexer state the actions operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerCommands {
    pub token_type: i32,
    pub channel: u32,
    pub mode: usize,
    pub mode_stack: Vec<usize>,
    pub skip: bool,
    pub more: bool,
}

/// The ordered actions to run when a token is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LexerActionExecutor {
    actions: Vec<LexerAction>,
}

impl LexerActionExecutor {
    pub fn new(actions: Vec<LexerAction>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[LexerAction] {
        &self.actions
    }

    /// `executor` followed by `action`.
    pub fn append(executor: Option<&Arc<Self>>, action: LexerAction) -> Arc<Self> {
        let mut actions = executor.map(|e| e.actions.clone()).unwrap_or_default();
        actions.push(action);
        Arc::new(Self::new(actions))
    }

    /// Pin every position-dependent action to `offset` so that a DFA state
    /// reached by different input lengths still runs it at the right place.
    pub fn fix_offset_before_match(self: &Arc<Self>, offset: usize) -> Arc<Self> {
        if !self
            .actions
            .iter()
            .any(|a| matches!(a, LexerAction::Custom { .. }))
        {
            return Arc::clone(self);
        }
        let actions = self
            .actions
            .iter()
            .map(|a| match a {
                LexerAction::Custom { .. } => LexerAction::Indexed {
                    offset,
                    action: Box::new(a.clone()),
                },
                other => other.clone(),
            })
            .collect();
        Arc::new(Self::new(actions))
    }

    /// Apply the actions in order. Custom actions are handed to `evaluator`.
    pub fn execute(&self, commands: &mut LexerCommands, evaluator: &dyn SemanticEvaluator) {
        for action in &self.actions {
            apply(action, commands, evaluator);
        }
    }
}

fn apply(action: &LexerAction, commands: &mut LexerCommands, evaluator: &dyn SemanticEvaluator) {
    match action {
        LexerAction::Channel(c) => commands.channel = *c,
        LexerAction::Custom {
            rule_index,
            action_index,
        } => evaluator.action(*rule_index, *action_index),
        LexerAction::Mode(m) => commands.mode = *m,
        LexerAction::More => commands.more = true,
        LexerAction::PopMode => {
            if let Some(m) = commands.mode_stack.pop() {
                commands.mode = m;
            }
        }
        LexerAction::PushMode(m) => {
            commands.mode_stack.push(commands.mode);
            commands.mode = *m;
        }
        LexerAction::Skip => commands.skip = true,
        LexerAction::Type(t) => commands.token_type = *t,
        LexerAction::Indexed { action, .. } => apply(action, commands, evaluator),
    }
}
