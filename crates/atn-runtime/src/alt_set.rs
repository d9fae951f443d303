// Small bitset of alternative numbers (1-based).

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AltSet {
    words: Vec<u64>,
}

impl AltSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alt: usize) {
        let (w, b) = (alt / 64, alt % 64);
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        self.words[w] |= 1 << b;
    }

    pub fn contains(&self, alt: usize) -> bool {
        self.words
            .get(alt / 64)
            .is_some_and(|w| w & (1 << (alt % 64)) != 0)
    }

    pub fn union_with(&mut self, other: &AltSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= b;
        }
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Lowest alternative in the set.
    pub fn min(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &w)| {
            (0..64).filter(move |b| w & (1 << b) != 0).map(move |b| i * 64 + b)
        })
    }
}

impl FromIterator<usize> for AltSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut s = AltSet::new();
        for alt in iter {
            s.insert(alt);
        }
        s
    }
}

impl fmt::Display for AltSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, alt) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{alt}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_query() {
        let mut s = AltSet::new();
        assert!(s.is_empty());
        s.insert(3);
        s.insert(1);
        s.insert(70);
        assert_eq!(s.len(), 3);
        assert!(s.contains(70));
        assert!(!s.contains(2));
        assert_eq!(s.min(), Some(1));
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![1, 3, 70]);
        assert_eq!(s.to_string(), "{1, 3, 70}");
    }

    #[test]
    fn union() {
        let mut a: AltSet = [1, 2].into_iter().collect();
        let b: AltSet = [2, 100].into_iter().collect();
        a.union_with(&b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2, 100]);
    }

    #[test]
    fn equality_ignores_insert_order() {
        let a: AltSet = [5, 1].into_iter().collect();
        let b: AltSet = [1, 5].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(AltSet::new().min(), None);
    }
}
