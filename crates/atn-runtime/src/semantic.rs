// Semantic contexts: predicate trees carried by configurations.

use std::fmt;
use std::sync::Arc;

/// Host callbacks for predicates, precedence and custom actions.
///
/// Predicates are identified by `(rule_index, pred_index)` as serialized in
/// the grammar. Implementations must be deterministic for a given input
/// position.
pub trait SemanticEvaluator {
    fn predicate(&self, rule_index: usize, pred_index: usize) -> bool;

    /// `precedence >= p` for precedence predicates.
    fn precedence_predicate(&self, precedence: i32) -> bool {
        precedence >= self.precedence()
    }

    /// Current precedence level of the innermost left-recursive rule.
    fn precedence(&self) -> i32 {
        0
    }

    /// Custom lexer or parser action.
    fn action(&self, rule_index: usize, action_index: usize) {
        let _ = (rule_index, action_index);
    }
}

/// Evaluator for grammars without user predicates: every predicate holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SemanticEvaluator for AcceptAll {
    fn predicate(&self, _rule_index: usize, _pred_index: usize) -> bool {
        true
    }
}

/// A boolean combination of predicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticContext {
    /// Always true.
    Always,
    Predicate {
        rule_index: usize,
        pred_index: usize,
        ctx_dependent: bool,
    },
    /// `precedence >= p`.
    Precedence(i32),
    And(Arc<[SemanticContext]>),
    Or(Arc<[SemanticContext]>),
    Not(Arc<SemanticContext>),
}

impl SemanticContext {
    pub fn is_always(&self) -> bool {
        matches!(self, Self::Always)
    }

    pub fn and(a: &Self, b: &Self) -> Self {
        if a.is_always() {
            return b.clone();
        }
        if b.is_always() {
            return a.clone();
        }
        let mut operands = Vec::new();
        for ctx in [a, b] {
            match ctx {
                Self::And(ops) => operands.extend(ops.iter().cloned()),
                other => operands.push(other.clone()),
            }
        }
        // Only the strictest precedence predicate matters under AND.
        let min_prec = operands
            .iter()
            .filter_map(|c| match c {
                Self::Precedence(p) => Some(*p),
                _ => None,
            })
            .min();
        Self::combine(operands, min_prec, Self::And)
    }

    pub fn or(a: &Self, b: &Self) -> Self {
        if a.is_always() || b.is_always() {
            return Self::Always;
        }
        let mut operands = Vec::new();
        for ctx in [a, b] {
            match ctx {
                Self::Or(ops) => operands.extend(ops.iter().cloned()),
                other => operands.push(other.clone()),
            }
        }
        // Under OR the weakest precedence predicate subsumes the others.
        let max_prec = operands
            .iter()
            .filter_map(|c| match c {
                Self::Precedence(p) => Some(*p),
                _ => None,
            })
            .max();
        Self::combine(operands, max_prec, Self::Or)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(a: &Self) -> Self {
        match a {
            Self::Not(inner) => (**inner).clone(),
            other => Self::Not(Arc::new(other.clone())),
        }
    }

    fn combine(
        operands: Vec<Self>,
        keep_prec: Option<i32>,
        make: fn(Arc<[Self]>) -> Self,
    ) -> Self {
        let mut unique: Vec<Self> = Vec::with_capacity(operands.len());
        for op in operands {
            if let Self::Precedence(p) = op {
                if Some(p) != keep_prec {
                    continue;
                }
            }
            if !unique.contains(&op) {
                unique.push(op);
            }
        }
        if unique.len() == 1 {
            return unique.remove(0);
        }
        make(unique.into())
    }

    /// Evaluate against the host.
    pub fn eval(&self, evaluator: &dyn SemanticEvaluator) -> bool {
        match self {
            Self::Always => true,
            Self::Predicate {
                rule_index,
                pred_index,
                ..
            } => evaluator.predicate(*rule_index, *pred_index),
            Self::Precedence(p) => evaluator.precedence_predicate(*p),
            Self::And(ops) => ops.iter().all(|c| c.eval(evaluator)),
            Self::Or(ops) => ops.iter().any(|c| c.eval(evaluator)),
            Self::Not(inner) => !inner.eval(evaluator),
        }
    }

    /// Evaluate only the precedence predicates, leaving ordinary predicates
    /// in place. Returns `None` if the context became false, `Some(Always)`
    /// if it became true.
    pub fn eval_precedence(&self, evaluator: &dyn SemanticEvaluator) -> Option<Self> {
        match self {
            Self::Always | Self::Predicate { .. } => Some(self.clone()),
            Self::Precedence(p) => evaluator
                .precedence_predicate(*p)
                .then_some(Self::Always),
            Self::And(ops) => {
                let mut differs = false;
                let mut remaining = Vec::new();
                for op in ops.iter() {
                    let evaluated = op.eval_precedence(evaluator)?;
                    differs |= evaluated != *op;
                    if !evaluated.is_always() {
                        remaining.push(evaluated);
                    }
                }
                if !differs {
                    return Some(self.clone());
                }
                Some(
                    remaining
                        .iter()
                        .fold(Self::Always, |acc, c| Self::and(&acc, c)),
                )
            }
            Self::Or(ops) => {
                let mut differs = false;
                let mut remaining = Vec::new();
                for op in ops.iter() {
                    let evaluated = op.eval_precedence(evaluator);
                    differs |= evaluated.as_ref() != Some(op);
                    match evaluated {
                        Some(Self::Always) => return Some(Self::Always),
                        Some(c) => remaining.push(c),
                        None => {}
                    }
                }
                if !differs {
                    return Some(self.clone());
                }
                let mut iter = remaining.into_iter();
                let first = iter.next()?;
                Some(iter.fold(first, |acc, c| Self::or(&acc, &c)))
            }
            Self::Not(inner) => match inner.eval_precedence(evaluator) {
                None => Some(Self::Always),
                Some(Self::Always) => None,
                Some(c) => Some(Self::not(&c)),
            },
        }
    }
}

impl fmt::Display for SemanticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, ops: &[Self], sep: &str| {
            for (i, op) in ops.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{op}")?;
            }
            Ok(())
        };
        match self {
            Self::Always => f.write_str("true"),
            Self::Predicate {
                rule_index,
                pred_index,
                ..
            } => write!(f, "{{{rule_index}:{pred_index}}}?"),
            Self::Precedence(p) => write!(f, "{{{p}>=prec}}?"),
            Self::And(ops) => join(f, ops, "&&"),
            Self::Or(ops) => join(f, ops, "||"),
            Self::Not(inner) => write!(f, "!({inner})"),
        }
    }
}
