// Call contexts: immutable, shared stacks of rule return states.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use crate::atn::Atn;
use crate::state::StateId;
use crate::transition::TransitionKind;

/// Shared handle to a call context.
pub type ContextRef = Arc<CallContext>;

static EMPTY: LazyLock<ContextRef> = LazyLock::new(|| {
    Arc::new(CallContext {
        frame: None,
        hash: 1,
        depth: 0,
    })
});

#[derive(Debug)]
struct Frame {
    parent: ContextRef,
    return_state: StateId,
}

/// A stack of return states, innermost first. The empty context stands for
/// "outside the decision's rule" during SLL prediction and for the outermost
/// invocation during full-context prediction.
///
/// Contexts are immutable and structurally compared; the hash is computed
/// once at construction.
#[derive(Debug)]
pub struct CallContext {
    frame: Option<Frame>,
    hash: u64,
    depth: usize,
}

impl CallContext {
    pub fn empty() -> ContextRef {
        Arc::clone(&EMPTY)
    }

    /// Push `return_state` on top of `parent`.
    pub fn push(parent: &ContextRef, return_state: StateId) -> ContextRef {
        let mut h = DefaultHasher::new();
        parent.hash.hash(&mut h);
        return_state.hash(&mut h);
        Arc::new(CallContext {
            frame: Some(Frame {
                parent: Arc::clone(parent),
                return_state,
            }),
            hash: h.finish(),
            depth: parent.depth + 1,
        })
    }

    /// Build the context for a parser invocation stack. `invoking_states`
    /// lists the states holding each active rule transition, outermost first.
    /// Each frame stores the follow state of that rule transition.
    pub fn from_invoking_states(atn: &Atn, invoking_states: &[StateId]) -> ContextRef {
        let mut ctx = Self::empty();
        for &s in invoking_states {
            let follow = atn.states.get(s).and_then(|st| {
                st.transitions.first().and_then(|t| match t.kind {
                    TransitionKind::Rule { follow_state, .. } => Some(follow_state),
                    _ => None,
                })
            });
            if let Some(follow) = follow {
                ctx = Self::push(&ctx, follow);
            }
        }
        ctx
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<&ContextRef> {
        self.frame.as_ref().map(|f| &f.parent)
    }

    pub fn return_state(&self) -> Option<StateId> {
        self.frame.as_ref().map(|f| f.return_state)
    }

    /// Return states from innermost to outermost.
    pub fn return_states(&self) -> ReturnStates<'_> {
        ReturnStates { cur: self }
    }
}

pub struct ReturnStates<'a> {
    cur: &'a CallContext,
}

impl Iterator for ReturnStates<'_> {
    type Item = StateId;

    fn next(&mut self) -> Option<StateId> {
        let frame = self.cur.frame.as_ref()?;
        self.cur = &frame.parent;
        Some(frame.return_state)
    }
}

impl PartialEq for CallContext {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            if std::ptr::eq(a, b) {
                return true;
            }
            if a.hash != b.hash || a.depth != b.depth {
                return false;
            }
            match (&a.frame, &b.frame) {
                (None, None) => return true,
                (Some(fa), Some(fb)) => {
                    if fa.return_state != fb.return_state {
                        return false;
                    }
                    a = &fa.parent;
                    b = &fb.parent;
                }
                _ => return false,
            }
        }
    }
}

impl Eq for CallContext {}

impl Hash for CallContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for s in self.return_states() {
            write!(f, "{s} ")?;
        }
        f.write_str("$]")
    }
}
