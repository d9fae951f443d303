// ATN configuration: (state, alternative, call context, semantic context).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::context::{CallContext, ContextRef};
use crate::lexer_action::LexerActionExecutor;
use crate::semantic::SemanticContext;
use crate::state::StateId;

/// One point of a simulation: "alternative `alt` could be at `state` with
/// this call stack if `semantic` holds".
///
/// Equality and hashing cover state, alternative, context, semantic context,
/// lexer actions and the non-greedy flag. The outer-context depth and the
/// precedence-filter flag are bookkeeping and do not distinguish configs.
#[derive(Debug, Clone)]
pub struct AtnConfig {
    pub state: StateId,
    pub alt: usize,
    pub context: ContextRef,
    pub semantic: SemanticContext,
    /// How many times the closure left the decision rule through an empty
    /// context (SLL only). Non-zero means "dips into outer context".
    pub reaches_into_outer_context: u32,
    /// Set on configs reached through an outermost precedence return; such
    /// configs survive the precedence filter.
    pub precedence_filter_suppressed: bool,
    pub lexer_actions: Option<Arc<LexerActionExecutor>>,
    pub passed_non_greedy: bool,
}

impl AtnConfig {
    pub fn new(state: StateId, alt: usize, context: ContextRef) -> Self {
        Self {
            state,
            alt,
            context,
            semantic: SemanticContext::Always,
            reaches_into_outer_context: 0,
            precedence_filter_suppressed: false,
            lexer_actions: None,
            passed_non_greedy: false,
        }
    }

    /// Same config with an empty context, used at decision starts.
    pub fn start(state: StateId, alt: usize) -> Self {
        Self::new(state, alt, CallContext::empty())
    }

    /// Copy moved to `state`; everything else carries over.
    pub fn moved_to(&self, state: StateId) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn with_context(&self, state: StateId, context: ContextRef) -> Self {
        Self {
            state,
            context,
            ..self.clone()
        }
    }

    pub fn with_semantic(&self, state: StateId, semantic: SemanticContext) -> Self {
        Self {
            state,
            semantic,
            ..self.clone()
        }
    }

    pub fn with_actions(&self, state: StateId, actions: Option<Arc<LexerActionExecutor>>) -> Self {
        Self {
            state,
            lexer_actions: actions,
            ..self.clone()
        }
    }

    pub fn dips_into_outer_context(&self) -> bool {
        self.reaches_into_outer_context > 0
    }
}

impl PartialEq for AtnConfig {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
            && self.alt == other.alt
            && self.passed_non_greedy == other.passed_non_greedy
            && self.context == other.context
            && self.semantic == other.semantic
            && self.lexer_actions == other.lexer_actions
    }
}

impl Eq for AtnConfig {}

impl Hash for AtnConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.state.hash(state);
        self.alt.hash(state);
        self.context.hash(state);
        self.semantic.hash(state);
        self.lexer_actions.hash(state);
        self.passed_non_greedy.hash(state);
    }
}

impl fmt::Display for AtnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{}", self.state, self.alt, self.context)?;
        if !self.semantic.is_always() {
            write!(f, ",{}", self.semantic)?;
        }
        if self.reaches_into_outer_context > 0 {
            write!(f, ",up={}", self.reaches_into_outer_context)?;
        }
        f.write_str(")")
    }
}
