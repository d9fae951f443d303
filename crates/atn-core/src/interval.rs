// IntervalSet: sorted, disjoint, inclusive integer intervals.
//
// Used for set / not-set transition labels (token types or code points) and
// for expected-token sets reported with syntax errors.

use std::fmt;

/// An inclusive integer interval `a..=b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub a: i32,
    pub b: i32,
}

impl Interval {
    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// Number of values covered. Zero for an inverted interval.
    #[inline]
    pub fn len(&self) -> usize {
        if self.b < self.a {
            0
        } else {
            (self.b as i64 - self.a as i64 + 1) as usize
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.b < self.a
    }

    #[inline]
    pub fn contains(&self, v: i32) -> bool {
        self.a <= v && v <= self.b
    }

    /// True if the two intervals overlap or touch (`[1,3]` and `[4,6]` are adjacent).
    #[inline]
    fn mergeable(&self, other: &Interval) -> bool {
        (self.a as i64) <= (other.b as i64) + 1 && (other.a as i64) <= (self.b as i64) + 1
    }
}

/// A set of integers stored as sorted, non-overlapping, non-adjacent intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    /// A set holding a single value.
    pub fn of(v: i32) -> Self {
        let mut s = Self::new();
        s.add(v);
        s
    }

    /// A set holding `a..=b`.
    pub fn of_range(a: i32, b: i32) -> Self {
        let mut s = Self::new();
        s.add_range(a, b);
        s
    }

    pub fn add(&mut self, v: i32) {
        self.add_range(v, v);
    }

    /// Insert `a..=b`, merging with any overlapping or adjacent intervals.
    /// An inverted range is ignored.
    pub fn add_range(&mut self, a: i32, b: i32) {
        if b < a {
            return;
        }
        let mut added = Interval::new(a, b);
        // First interval that could merge with or follow the new one.
        let start = self
            .intervals
            .partition_point(|iv| (iv.b as i64) + 1 < added.a as i64);
        let mut end = start;
        while end < self.intervals.len() && self.intervals[end].mergeable(&added) {
            added.a = added.a.min(self.intervals[end].a);
            added.b = added.b.max(self.intervals[end].b);
            end += 1;
        }
        self.intervals.splice(start..end, std::iter::once(added));
    }

    /// Union `other` into `self`.
    pub fn add_set(&mut self, other: &IntervalSet) {
        for iv in &other.intervals {
            self.add_range(iv.a, iv.b);
        }
    }

    /// Remove a single value, splitting an interval if needed.
    pub fn remove(&mut self, v: i32) {
        let Some(idx) = self.intervals.iter().position(|iv| iv.contains(v)) else {
            return;
        };
        let iv = self.intervals[idx];
        let mut replacement = Vec::with_capacity(2);
        if iv.a < v {
            replacement.push(Interval::new(iv.a, v - 1));
        }
        if v < iv.b {
            replacement.push(Interval::new(v + 1, iv.b));
        }
        self.intervals.splice(idx..=idx, replacement);
    }

    pub fn contains(&self, v: i32) -> bool {
        // Intervals are sorted; binary search on the upper bound.
        let idx = self.intervals.partition_point(|iv| iv.b < v);
        idx < self.intervals.len() && self.intervals[idx].a <= v
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of values in the set.
    pub fn len(&self) -> usize {
        self.intervals.iter().map(Interval::len).sum()
    }

    pub fn min(&self) -> Option<i32> {
        self.intervals.first().map(|iv| iv.a)
    }

    pub fn max(&self) -> Option<i32> {
        self.intervals.last().map(|iv| iv.b)
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Iterate over every value in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.intervals.iter().flat_map(|iv| iv.a..=iv.b)
    }

    /// Values in `min..=max` that are not in `self`.
    pub fn complement(&self, min: i32, max: i32) -> IntervalSet {
        let mut result = IntervalSet::new();
        let mut next = min as i64;
        for iv in &self.intervals {
            if (iv.b as i64) < next {
                continue;
            }
            if iv.a as i64 > max as i64 {
                break;
            }
            if (iv.a as i64) > next {
                result.add_range(next as i32, iv.a - 1);
            }
            next = iv.b as i64 + 1;
        }
        if next <= max as i64 {
            result.add_range(next as i32, max);
        }
        result
    }

    /// Values in `self` that are not in `other`.
    pub fn subtract(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = self.clone();
        for iv in &other.intervals {
            let mut kept = Vec::with_capacity(result.intervals.len() + 1);
            for cur in &result.intervals {
                if cur.b < iv.a || cur.a > iv.b {
                    kept.push(*cur);
                    continue;
                }
                if cur.a < iv.a {
                    kept.push(Interval::new(cur.a, iv.a - 1));
                }
                if cur.b > iv.b {
                    kept.push(Interval::new(iv.b + 1, cur.b));
                }
            }
            result.intervals = kept;
        }
        result
    }

    /// Render the set using a custom element formatter.
    pub fn to_string_with(&self, mut name: impl FnMut(i32) -> String) -> String {
        if self.is_empty() {
            return "{}".to_string();
        }
        let mut parts = Vec::new();
        for iv in &self.intervals {
            if iv.a == iv.b {
                parts.push(name(iv.a));
            } else if iv.len() <= 3 {
                for v in iv.a..=iv.b {
                    parts.push(name(v));
                }
            } else {
                parts.push(format!("{}..{}", name(iv.a), name(iv.b)));
            }
        }
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            format!("{{{}}}", parts.join(", "))
        }
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(|v| v.to_string()))
    }
}

impl FromIterator<i32> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = i32>>(iter: T) -> Self {
        let mut s = IntervalSet::new();
        for v in iter {
            s.add(v);
        }
        s
    }
}
