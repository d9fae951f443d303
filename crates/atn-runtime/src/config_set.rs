// Ordered, deduplicated set of ATN configurations with prediction metadata.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use hashbrown::{HashMap, HashSet};

use crate::alt_set::AltSet;
use crate::atn::Atn;
use crate::config::AtnConfig;
use crate::context::ContextRef;
use crate::semantic::SemanticContext;
use crate::state::StateId;

/// How [`AtnConfigSet::add`] treats configs that differ only in alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Keep every distinct config. Conflicts stay visible, which the SLL
    /// stage of two-stage prediction needs to decide when to escalate.
    #[default]
    RetainAll,
    /// Keep only the lowest alternative per (state, context, semantic
    /// context). Lexer closures and pure SLL prediction use this.
    FirstAltWins,
}

type CollapseKey = (StateId, ContextRef, SemanticContext, bool);

/// Configurations in insertion order.
///
/// Equality and hashing are order-independent: two sets holding the same
/// configs compare equal whatever order they were built in. Once frozen (when
/// it becomes a DFA state's key) a set rejects further additions and caches
/// its hash.
#[derive(Debug, Clone)]
pub struct AtnConfigSet {
    configs: Vec<AtnConfig>,
    exact: HashMap<AtnConfig, usize>,
    collapse: HashMap<CollapseKey, usize>,
    /// First config seen at each (state, alt, context).
    positions: HashMap<(StateId, usize, ContextRef), usize>,
    policy: MergePolicy,
    full_context: bool,
    /// Some config carries a non-trivial semantic context.
    pub has_semantic_context: bool,
    /// Some config left the decision rule through an empty context.
    pub dips_into_outer_context: bool,
    /// The single alternative predicted by every config, when there is one.
    pub unique_alt: Option<usize>,
    /// Alternatives in conflict, once the simulator has detected a conflict.
    pub conflicting_alts: Option<AltSet>,
    semantic_ambiguities: Vec<(StateId, usize)>,
    frozen_hash: Option<u64>,
}

impl AtnConfigSet {
    pub fn new(full_context: bool, policy: MergePolicy) -> Self {
        Self {
            configs: Vec::new(),
            exact: HashMap::new(),
            collapse: HashMap::new(),
            positions: HashMap::new(),
            policy,
            full_context,
            has_semantic_context: false,
            dips_into_outer_context: false,
            unique_alt: None,
            conflicting_alts: None,
            semantic_ambiguities: Vec::new(),
            frozen_hash: None,
        }
    }

    /// Empty set with the same mode and policy.
    pub fn empty_like(&self) -> Self {
        Self::new(self.full_context, self.policy)
    }

    /// Add `config`. Returns `true` if the set changed.
    ///
    /// An exact duplicate only merges bookkeeping (outer-context depth and the
    /// precedence-filter flag). Under [`MergePolicy::FirstAltWins`] a config
    /// with a lower alternative replaces the one already at its key.
    pub fn add(&mut self, config: AtnConfig) -> bool {
        if self.frozen_hash.is_some() {
            log::warn!("ignoring add to a frozen configuration set");
            return false;
        }
        if !config.semantic.is_always() {
            self.has_semantic_context = true;
        }
        if config.dips_into_outer_context() {
            self.dips_into_outer_context = true;
        }

        if let Some(&i) = self.exact.get(&config) {
            let existing = &mut self.configs[i];
            existing.reaches_into_outer_context = existing
                .reaches_into_outer_context
                .max(config.reaches_into_outer_context);
            existing.precedence_filter_suppressed |= config.precedence_filter_suppressed;
            return false;
        }

        if self.policy == MergePolicy::FirstAltWins {
            let key = (
                config.state,
                config.context.clone(),
                config.semantic.clone(),
                config.passed_non_greedy,
            );
            if let Some(&i) = self.collapse.get(&key) {
                if self.configs[i].alt <= config.alt {
                    return false;
                }
                let old = std::mem::replace(&mut self.configs[i], config);
                self.exact.remove(&old);
                self.exact.insert(self.configs[i].clone(), i);
                self.release_position(old, i);
                self.track_position(i);
                return true;
            }
            self.collapse.insert(key, self.configs.len());
        }

        self.exact.insert(config.clone(), self.configs.len());
        self.configs.push(config);
        self.track_position(self.configs.len() - 1);
        true
    }

    /// Index the config at `i` by position, noting a semantic mismatch with
    /// the config already there.
    fn track_position(&mut self, i: usize) {
        let config = &self.configs[i];
        let position = (config.state, config.alt, config.context.clone());
        match self.positions.get(&position) {
            Some(&j) if j != i => {
                let other = &self.configs[j];
                if other.semantic != config.semantic
                    && !self
                        .semantic_ambiguities
                        .contains(&(config.state, config.alt))
                {
                    self.semantic_ambiguities.push((config.state, config.alt));
                }
            }
            Some(_) => {}
            None => {
                self.positions.insert(position, i);
            }
        }
    }

    /// `old` no longer sits at index `i`; repoint its position at the next
    /// config sharing it, or drop it.
    fn release_position(&mut self, old: AtnConfig, i: usize) {
        let position = (old.state, old.alt, old.context);
        if self.positions.get(&position) != Some(&i) {
            return;
        }
        let next = self
            .configs
            .iter()
            .position(|c| c.state == position.0 && c.alt == position.1 && c.context == position.2);
        match next {
            Some(j) => {
                self.positions.insert(position, j);
            }
            None => {
                self.positions.remove(&position);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AtnConfig> {
        self.configs.iter()
    }

    pub fn configs(&self) -> &[AtnConfig] {
        &self.configs
    }

    pub fn full_context(&self) -> bool {
        self.full_context
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Positions revisited with a different semantic context: candidates for
    /// a predicate ambiguity.
    pub fn semantic_ambiguities(&self) -> &[(StateId, usize)] {
        &self.semantic_ambiguities
    }

    pub fn alts(&self) -> AltSet {
        self.configs.iter().map(|c| c.alt).collect()
    }

    pub fn states(&self) -> HashSet<StateId> {
        self.configs.iter().map(|c| c.state).collect()
    }

    /// The alternative shared by every config, if there is exactly one.
    pub fn single_alt(&self) -> Option<usize> {
        let first = self.configs.first()?.alt;
        self.configs
            .iter()
            .all(|c| c.alt == first)
            .then_some(first)
    }

    pub fn has_config_in_rule_stop(&self, atn: &Atn) -> bool {
        self.configs.iter().any(|c| atn.states[c.state].is_rule_stop())
    }

    pub fn all_configs_in_rule_stop(&self, atn: &Atn) -> bool {
        self.configs.iter().all(|c| atn.states[c.state].is_rule_stop())
    }

    /// Stop accepting configs and cache the hash.
    pub fn freeze(&mut self) {
        if self.frozen_hash.is_none() {
            self.frozen_hash = Some(self.content_hash());
            self.exact = HashMap::new();
            self.collapse = HashMap::new();
            self.positions = HashMap::new();
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_hash.is_some()
    }

    /// Order-independent hash of the config contents.
    pub fn content_hash(&self) -> u64 {
        if let Some(h) = self.frozen_hash {
            return h;
        }
        self.configs.iter().fold(self.configs.len() as u64, |acc, c| {
            let mut h = DefaultHasher::new();
            c.hash(&mut h);
            acc.wrapping_add(h.finish())
        })
    }
}

impl PartialEq for AtnConfigSet {
    fn eq(&self, other: &Self) -> bool {
        if self.configs.len() != other.configs.len()
            || self.full_context != other.full_context
            || self.content_hash() != other.content_hash()
        {
            return false;
        }
        let theirs: HashSet<&AtnConfig> = other.configs.iter().collect();
        self.configs.iter().all(|c| theirs.contains(c))
    }
}

impl Eq for AtnConfigSet {}

impl Hash for AtnConfigSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.content_hash());
    }
}

impl<'a> IntoIterator for &'a AtnConfigSet {
    type Item = &'a AtnConfig;
    type IntoIter = std::slice::Iter<'a, AtnConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.configs.iter()
    }
}

impl fmt::Display for AtnConfigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, c) in self.configs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str("]")?;
        if let Some(alt) = self.unique_alt {
            write!(f, ",uniqueAlt={alt}")?;
        }
        if let Some(alts) = &self.conflicting_alts {
            write!(f, ",conflictingAlts={alts}")?;
        }
        if self.dips_into_outer_context {
            f.write_str(",dipsIntoOuterContext")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CallContext;

    fn cfg(state: StateId, alt: usize) -> AtnConfig {
        AtnConfig::start(state, alt)
    }

    #[test]
    fn dedups_exact_configs() {
        let mut s = AtnConfigSet::new(false, MergePolicy::RetainAll);
        assert!(s.add(cfg(1, 1)));
        assert!(!s.add(cfg(1, 1)));
        assert!(s.add(cfg(1, 2)));
        assert_eq!(s.len(), 2);
        assert_eq!(s.alts().to_string(), "{1, 2}");
        assert_eq!(s.single_alt(), None);
    }

    #[test]
    fn duplicate_merges_outer_depth() {
        let mut s = AtnConfigSet::new(false, MergePolicy::RetainAll);
        s.add(cfg(1, 1));
        let mut dipped = cfg(1, 1);
        dipped.reaches_into_outer_context = 2;
        s.add(dipped);
        assert_eq!(s.len(), 1);
        assert_eq!(s.configs()[0].reaches_into_outer_context, 2);
        assert!(s.dips_into_outer_context);
    }

    #[test]
    fn first_alt_wins_keeps_lowest() {
        let mut s = AtnConfigSet::new(false, MergePolicy::FirstAltWins);
        assert!(s.add(cfg(1, 2)));
        assert!(!s.add(cfg(1, 3)));
        assert!(s.add(cfg(1, 1)));
        assert_eq!(s.len(), 1);
        assert_eq!(s.configs()[0].alt, 1);
        // A different context is a different key.
        let other = AtnConfig::new(1, 3, CallContext::push(&CallContext::empty(), 4));
        assert!(s.add(other));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn order_independent_equality() {
        let mut a = AtnConfigSet::new(false, MergePolicy::RetainAll);
        let mut b = AtnConfigSet::new(false, MergePolicy::RetainAll);
        for (st, alt) in [(1, 1), (2, 1), (3, 2)] {
            a.add(cfg(st, alt));
        }
        for (st, alt) in [(3, 2), (1, 1), (2, 1)] {
            b.add(cfg(st, alt));
        }
        assert_eq!(a, b);
        assert_eq!(a.content_hash(), b.content_hash());
        b.freeze();
        assert_eq!(a, b);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn frozen_rejects_adds() {
        let mut s = AtnConfigSet::new(false, MergePolicy::RetainAll);
        s.add(cfg(1, 1));
        s.freeze();
        assert!(s.is_frozen());
        assert!(!s.add(cfg(2, 1)));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn records_semantic_inconsistency() {
        let mut s = AtnConfigSet::new(false, MergePolicy::RetainAll);
        s.add(cfg(5, 1));
        s.add(cfg(5, 1).with_semantic(5, SemanticContext::Precedence(2)));
        assert!(s.has_semantic_context);
        assert_eq!(s.semantic_ambiguities(), &[(5, 1)]);
    }

    #[test]
    fn replaced_config_moves_its_position() {
        let mut s = AtnConfigSet::new(false, MergePolicy::FirstAltWins);
        s.add(cfg(5, 2));
        assert!(s.add(cfg(5, 1)));
        assert_eq!(s.len(), 1);

        // The slot now holds alt 1, so a predicated alt 1 is the mismatch and
        // a predicated alt 2 has no unpredicated counterpart left.
        s.add(cfg(5, 1).with_semantic(5, SemanticContext::Precedence(2)));
        s.add(cfg(5, 2).with_semantic(5, SemanticContext::Precedence(3)));
        assert_eq!(s.len(), 3);
        assert_eq!(s.semantic_ambiguities(), &[(5, 1)]);
    }

    #[test]
    fn full_context_flag_distinguishes() {
        let mut a = AtnConfigSet::new(false, MergePolicy::RetainAll);
        let mut b = AtnConfigSet::new(true, MergePolicy::RetainAll);
        a.add(cfg(1, 1));
        b.add(cfg(1, 1));
        assert_ne!(a, b);
    }
}
