// Lazily built DFA for one decision (parser) or one mode (lexer).
//
// States are owned by the DFA's registry and addressed by index; edges are
// indices too. Lookups take read locks only. A missing edge is computed by
// the caller outside any lock and then published with `add_state` /
// `add_edge`; two threads racing on the same edge compute the same target
// and whichever publishes second finds the first's state already registered.

use std::fmt::Write as _;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use atn_core::Vocabulary;
use hashbrown::{HashMap, HashTable};

use crate::atn::Atn;
use crate::config_set::AtnConfigSet;
use crate::lexer_action::LexerActionExecutor;
use crate::semantic::SemanticContext;
use crate::state::{StateId, StateKind};

pub type DfaStateId = usize;

/// Result of following a DFA edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfaEdge {
    State(DfaStateId),
    /// Memoized "no alternative is viable after this symbol".
    Error,
}

/// An alternative guarded by a predicate in an accept state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredPrediction {
    pub predicate: SemanticContext,
    pub alt: usize,
}

/// One DFA state. Everything except the edge map is fixed once the state is
/// registered.
#[derive(Debug)]
pub struct DfaState {
    pub id: DfaStateId,
    pub configs: AtnConfigSet,
    pub is_accept: bool,
    /// Predicted alternative (parser) or matched rule index (lexer) of an
    /// accept state. `None` when the state requires full context or resolves
    /// through predicates.
    pub prediction: Option<usize>,
    /// SLL found a conflict here; full-context prediction must decide.
    pub requires_full_context: bool,
    pub predicates: Option<Vec<PredPrediction>>,
    pub lexer_actions: Option<Arc<LexerActionExecutor>>,
    edges: RwLock<HashMap<i32, DfaEdge>>,
}

impl DfaState {
    /// Unregistered state; `configs` is frozen here.
    pub fn new(mut configs: AtnConfigSet) -> Self {
        configs.freeze();
        Self {
            id: usize::MAX,
            configs,
            is_accept: false,
            prediction: None,
            requires_full_context: false,
            predicates: None,
            lexer_actions: None,
            edges: RwLock::new(HashMap::new()),
        }
    }

    pub fn edge(&self, symbol: i32) -> Option<DfaEdge> {
        read(&self.edges).get(&symbol).copied()
    }

    pub fn edge_count(&self) -> usize {
        read(&self.edges).len()
    }

    /// Edges sorted by symbol.
    pub fn edges(&self) -> Vec<(i32, DfaEdge)> {
        let mut edges: Vec<_> = read(&self.edges).iter().map(|(&k, &v)| (k, v)).collect();
        edges.sort_unstable_by_key(|(k, _)| *k);
        edges
    }
}

#[derive(Debug, Default)]
struct Registry {
    states: Vec<Arc<DfaState>>,
    index: HashTable<DfaStateId>,
    start: Option<DfaStateId>,
    precedence_starts: HashMap<i32, DfaStateId>,
}

/// DFA for one decision or lexer mode.
#[derive(Debug)]
pub struct Dfa {
    pub decision: usize,
    pub atn_start_state: StateId,
    precedence_dfa: bool,
    registry: RwLock<Registry>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Dfa {
    pub fn new(decision: usize, atn_start_state: StateId, precedence_dfa: bool) -> Self {
        Self {
            decision,
            atn_start_state,
            precedence_dfa,
            registry: RwLock::new(Registry::default()),
        }
    }

    /// DFA for parser decision `decision`. Precedence decisions get
    /// per-precedence start states.
    pub fn for_decision(atn: &Atn, decision: usize) -> Self {
        let s = atn.decision_to_state[decision];
        let st = &atn.states[s];
        let precedence = st.kind == StateKind::StarLoopEntry && st.precedence_decision;
        Self::new(decision, s, precedence)
    }

    pub fn is_precedence_dfa(&self) -> bool {
        self.precedence_dfa
    }

    pub fn start_state(&self) -> Option<Arc<DfaState>> {
        let reg = read(&self.registry);
        reg.start.map(|id| Arc::clone(&reg.states[id]))
    }

    pub fn set_start_state(&self, state: &DfaState) {
        write(&self.registry).start = Some(state.id);
    }

    pub fn precedence_start_state(&self, precedence: i32) -> Option<Arc<DfaState>> {
        let reg = read(&self.registry);
        reg.precedence_starts
            .get(&precedence)
            .map(|&id| Arc::clone(&reg.states[id]))
    }

    pub fn set_precedence_start_state(&self, precedence: i32, state: &DfaState) {
        write(&self.registry)
            .precedence_starts
            .insert(precedence, state.id);
    }

    pub fn state(&self, id: DfaStateId) -> Option<Arc<DfaState>> {
        read(&self.registry).states.get(id).cloned()
    }

    /// Register `candidate`, or return the existing state with equal configs.
    pub fn add_state(&self, mut candidate: DfaState) -> Arc<DfaState> {
        let hash = candidate.configs.content_hash();
        {
            let reg = read(&self.registry);
            if let Some(&id) = reg
                .index
                .find(hash, |&id| reg.states[id].configs == candidate.configs)
            {
                return Arc::clone(&reg.states[id]);
            }
        }
        let mut guard = write(&self.registry);
        let Registry { states, index, .. } = &mut *guard;
        if let Some(&id) = index.find(hash, |&id| states[id].configs == candidate.configs) {
            return Arc::clone(&states[id]);
        }
        candidate.id = states.len();
        let state = Arc::new(candidate);
        states.push(Arc::clone(&state));
        index.insert_unique(hash, state.id, |&id| states[id].configs.content_hash());
        log::debug!(
            "decision {}: new DFA state {} ({} configs)",
            self.decision,
            state.id,
            state.configs.len()
        );
        state
    }

    pub fn add_edge(&self, from: &DfaState, symbol: i32, to: DfaEdge) {
        write(&from.edges).insert(symbol, to);
    }

    /// Follow an edge to its state. `None` if the edge is missing or is the
    /// error edge.
    pub fn target(&self, from: &DfaState, symbol: i32) -> Option<Arc<DfaState>> {
        match from.edge(symbol)? {
            DfaEdge::State(id) => self.state(id),
            DfaEdge::Error => None,
        }
    }

    pub fn len(&self) -> usize {
        read(&self.registry).states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn edge_count(&self) -> usize {
        read(&self.registry)
            .states
            .iter()
            .map(|s| s.edge_count())
            .sum()
    }

    /// Snapshot of the registered states in id order.
    pub fn states(&self) -> Vec<Arc<DfaState>> {
        read(&self.registry).states.clone()
    }

    /// Drop every state and edge.
    pub fn clear(&mut self) {
        let reg = self
            .registry
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        *reg = Registry::default();
    }

    /// Text dump, one edge per line: `s0-'a'->:s1=>2`.
    pub fn dump(&self, vocabulary: Option<&Vocabulary>) -> String {
        let name = |symbol: i32| match vocabulary {
            Some(v) => v.display_name(symbol),
            None if symbol >= 0 => match char::from_u32(symbol as u32) {
                Some(c) if !c.is_control() => format!("'{c}'"),
                _ => symbol.to_string(),
            },
            None => "EOF".to_string(),
        };
        let label = |s: &DfaState| {
            let mut out = String::new();
            if s.is_accept {
                out.push(':');
            }
            let _ = write!(out, "s{}", s.id);
            if s.requires_full_context {
                out.push('^');
            }
            if s.is_accept {
                match (&s.predicates, s.prediction) {
                    (Some(preds), _) => {
                        let alts: Vec<String> = preds
                            .iter()
                            .map(|p| format!("({}, {})", p.predicate, p.alt))
                            .collect();
                        let _ = write!(out, "=>[{}]", alts.join(", "));
                    }
                    (None, Some(alt)) => {
                        let _ = write!(out, "=>{alt}");
                    }
                    (None, None) => {}
                }
            }
            out
        };
        let states = self.states();
        let mut out = String::new();
        for s in &states {
            for (symbol, edge) in s.edges() {
                let target = match edge {
                    DfaEdge::State(id) => states.get(id).map_or("?".to_string(), |t| label(t)),
                    DfaEdge::Error => "ERROR".to_string(),
                };
                let _ = writeln!(out, "{}-{}->{}", label(s), name(symbol), target);
            }
        }
        out
    }
}
