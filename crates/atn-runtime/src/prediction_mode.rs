// Prediction modes and the conflict analysis that decides when SLL stops.
//
// Conflict analysis groups configurations by (state, context): alternatives
// sharing a group can never be told apart by more lookahead, because from
// that point on they follow identical paths.

use hashbrown::HashMap;

use crate::alt_set::AltSet;
use crate::atn::Atn;
use crate::config::AtnConfig;
use crate::config_set::AtnConfigSet;
use crate::context::ContextRef;
use crate::semantic::SemanticContext;
use crate::state::StateId;

/// How much effort prediction spends before committing to an alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionMode {
    /// Stop at the first SLL conflict and take the lowest conflicting
    /// alternative. Fastest; may reject input a full LL parser accepts.
    Sll,
    /// SLL first, escalating to full-context prediction on a conflict.
    #[default]
    Ll,
    /// Like [`Ll`](Self::Ll), but full-context prediction continues until the
    /// ambiguity is exact. Only useful for grammar diagnostics.
    LlExactAmbiguity,
}

impl PredictionMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sll => "sll",
            Self::Ll => "ll",
            Self::LlExactAmbiguity => "ll-exact",
        }
    }

    /// Parse a mode name as printed by [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sll" => Some(Self::Sll),
            "ll" => Some(Self::Ll),
            "ll-exact" => Some(Self::LlExactAmbiguity),
            _ => None,
        }
    }
}

/// Alternatives per (state, context) group, in first-seen group order.
pub fn conflicting_alt_subsets(configs: &AtnConfigSet) -> Vec<AltSet> {
    let mut index: HashMap<(StateId, &ContextRef), usize> = HashMap::new();
    let mut subsets: Vec<AltSet> = Vec::new();
    for c in configs {
        let i = *index.entry((c.state, &c.context)).or_insert_with(|| {
            subsets.push(AltSet::new());
            subsets.len() - 1
        });
        subsets[i].insert(c.alt);
    }
    subsets
}

/// Alternatives per ATN state.
pub fn state_to_alts(configs: &AtnConfigSet) -> HashMap<StateId, AltSet> {
    let mut map: HashMap<StateId, AltSet> = HashMap::new();
    for c in configs {
        map.entry(c.state).or_default().insert(c.alt);
    }
    map
}

/// Some state is reached by exactly one alternative; more lookahead may
/// still separate the alternatives.
pub fn has_state_associated_with_one_alt(configs: &AtnConfigSet) -> bool {
    state_to_alts(configs).values().any(|alts| alts.len() == 1)
}

pub fn has_conflicting_alt_set(subsets: &[AltSet]) -> bool {
    subsets.iter().any(|alts| alts.len() > 1)
}

pub fn has_non_conflicting_alt_set(subsets: &[AltSet]) -> bool {
    subsets.iter().any(|alts| alts.len() == 1)
}

pub fn all_subsets_conflict(subsets: &[AltSet]) -> bool {
    !has_non_conflicting_alt_set(subsets)
}

pub fn all_subsets_equal(subsets: &[AltSet]) -> bool {
    match subsets.split_first() {
        Some((first, rest)) => rest.iter().all(|s| s == first),
        None => true,
    }
}

/// Union of every group.
pub fn union_of(subsets: &[AltSet]) -> AltSet {
    let mut all = AltSet::new();
    for s in subsets {
        all.union_with(s);
    }
    all
}

/// The alternative every group would pick if each resolved to its minimum,
/// when they all agree.
pub fn single_viable_alt(subsets: &[AltSet]) -> Option<usize> {
    let mut viable: Option<usize> = None;
    for alts in subsets {
        let min = alts.min()?;
        match viable {
            None => viable = Some(min),
            Some(v) if v != min => return None,
            Some(_) => {}
        }
    }
    viable
}

/// Full-context termination: every group resolves to the same minimum.
pub fn resolves_to_just_one_viable_alt(subsets: &[AltSet]) -> Option<usize> {
    single_viable_alt(subsets)
}

/// SLL termination: the reach set conflicts in a way more lookahead cannot
/// fix, or every configuration has finished the decision rule.
pub fn has_sll_conflict_terminating_prediction(
    mode: PredictionMode,
    atn: &Atn,
    configs: &AtnConfigSet,
) -> bool {
    if configs.all_configs_in_rule_stop(atn) {
        return true;
    }
    // Pure SLL ignores predicates when looking for conflicts; they are
    // evaluated afterwards at the accept state.
    let stripped;
    let configs = if mode == PredictionMode::Sll && configs.has_semantic_context {
        let mut dup = configs.empty_like();
        for c in configs {
            dup.add(AtnConfig {
                semantic: SemanticContext::Always,
                ..c.clone()
            });
        }
        stripped = dup;
        &stripped
    } else {
        configs
    };
    let subsets = conflicting_alt_subsets(configs);
    has_conflicting_alt_set(&subsets) && !has_state_associated_with_one_alt(configs)
}
