//! Sets of literals in natural order.
//!
//! A literal is a non-zero signed integer: the magnitude is the (1-based) variable,
//! the sign is the polarity. [`LiteralSet`] keeps its literals sorted ascending and
//! deduplicated at all times, so subset tests are a single linear merge and membership
//! is a binary search.
//!
//! Every derived operation (`retain_all`, `remove_all`, `union`, ...) builds a new set;
//! a `LiteralSet` is never mutated after construction and can be shared freely between
//! threads.
//!
//! # Example
//!
//! ```
//! use interaction_rs::literal::LiteralSet;
//!
//! let config = LiteralSet::from([1, 2, -3, 4]);
//! let interaction = LiteralSet::from([2, 1]);
//!
//! assert!(config.contains_all(&interaction));
//! assert_eq!(config.retain_all(&LiteralSet::from([1, 3, 4])), LiteralSet::from([1, 4]));
//! assert_eq!(interaction.to_string(), "{1, 2}");
//! ```

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// An immutable, sorted set of literals.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct LiteralSet {
    literals: Box<[i32]>,
}

impl LiteralSet {
    /// Creates a set from arbitrary literals, sorting and deduplicating them.
    ///
    /// # Panics
    ///
    /// Panics if any literal is `0`.
    pub fn new(literals: impl IntoIterator<Item = i32>) -> Self {
        let mut literals: Vec<i32> = literals.into_iter().collect();
        assert!(!literals.contains(&0), "Literal 0 is not a valid literal");
        literals.sort_unstable();
        literals.dedup();
        Self::from_sorted(literals)
    }

    /// Wraps literals that are already sorted and deduplicated.
    fn from_sorted(literals: Vec<i32>) -> Self {
        debug_assert!(literals.windows(2).all(|w| w[0] < w[1]));
        Self {
            literals: literals.into_boxed_slice(),
        }
    }

    /// The empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// The literals in ascending order.
    pub fn literals(&self) -> &[i32] {
        &self.literals
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.literals.iter().copied()
    }

    pub fn contains(&self, literal: i32) -> bool {
        self.literals.binary_search(&literal).is_ok()
    }

    /// Returns `true` if every literal of `other` is in `self`.
    pub fn contains_all(&self, other: &LiteralSet) -> bool {
        if other.len() > self.len() {
            return false;
        }
        let mut mine = self.literals.iter();
        'outer: for &lit in other.literals.iter() {
            for &candidate in mine.by_ref() {
                match candidate.cmp(&lit) {
                    Ordering::Less => continue,
                    Ordering::Equal => continue 'outer,
                    Ordering::Greater => return false,
                }
            }
            return false;
        }
        true
    }

    /// Returns `true` if `self` and `other` share at least one literal.
    pub fn contains_any(&self, other: &LiteralSet) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            match self.literals[i].cmp(&other.literals[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => return true,
            }
        }
        false
    }

    /// Intersection: the literals of `self` that are also in `other`.
    pub fn retain_all(&self, other: &LiteralSet) -> LiteralSet {
        let mut result = Vec::with_capacity(self.len().min(other.len()));
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            match self.literals[i].cmp(&other.literals[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    result.push(self.literals[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        Self::from_sorted(result)
    }

    /// Difference: the literals of `self` that are not in `other`.
    pub fn remove_all(&self, other: &LiteralSet) -> LiteralSet {
        let mut result = Vec::with_capacity(self.len());
        let mut j = 0;
        for &lit in self.literals.iter() {
            while j < other.len() && other.literals[j] < lit {
                j += 1;
            }
            if j < other.len() && other.literals[j] == lit {
                continue;
            }
            result.push(lit);
        }
        Self::from_sorted(result)
    }

    /// Union of `self` and `other`.
    pub fn union(&self, other: &LiteralSet) -> LiteralSet {
        let mut result = Vec::with_capacity(self.len() + other.len());
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            match self.literals[i].cmp(&other.literals[j]) {
                Ordering::Less => {
                    result.push(self.literals[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    result.push(other.literals[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    result.push(self.literals[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        result.extend_from_slice(&self.literals[i..]);
        result.extend_from_slice(&other.literals[j..]);
        Self::from_sorted(result)
    }

    /// Union of all given sets.
    pub fn union_all<'a>(sets: impl IntoIterator<Item = &'a LiteralSet>) -> LiteralSet {
        sets.into_iter().fold(LiteralSet::empty(), |acc, set| acc.union(set))
    }

    /// Flips the polarity of every literal.
    pub fn negate(&self) -> LiteralSet {
        LiteralSet::new(self.iter().map(|lit| -lit))
    }

    /// The variables mentioned by this set, ascending, without duplicates.
    pub fn variables(&self) -> Vec<u32> {
        let mut vars: Vec<u32> = self.iter().map(|lit| lit.unsigned_abs()).collect();
        vars.sort_unstable();
        vars.dedup();
        vars
    }

    /// The largest variable mentioned, or `0` for the empty set.
    pub fn max_variable(&self) -> u32 {
        self.iter().map(|lit| lit.unsigned_abs()).max().unwrap_or(0)
    }

    /// Returns `true` if some variable occurs with both polarities.
    pub fn has_conflict(&self) -> bool {
        // Negative literals come first, so each one is checked against the positive tail.
        self.iter().take_while(|&lit| lit < 0).any(|lit| self.contains(-lit))
    }
}

impl Display for LiteralSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, lit) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", lit)?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<i32> for LiteralSet {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        LiteralSet::new(iter)
    }
}

impl<const N: usize> From<[i32; N]> for LiteralSet {
    fn from(literals: [i32; N]) -> Self {
        LiteralSet::new(literals)
    }
}

impl From<Vec<i32>> for LiteralSet {
    fn from(literals: Vec<i32>) -> Self {
        LiteralSet::new(literals)
    }
}

impl From<&[i32]> for LiteralSet {
    fn from(literals: &[i32]) -> Self {
        LiteralSet::new(literals.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_sorted_and_deduplicated() {
        let set = LiteralSet::new([3, -1, 2, 3, -1]);
        assert_eq!(set.literals(), &[-1, 2, 3]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    #[should_panic(expected = "Literal 0 is not a valid literal")]
    fn test_zero_literal_panics() {
        LiteralSet::new([1, 0, 2]);
    }

    #[test]
    fn test_contains_all() {
        let config = LiteralSet::from([1, 2, -3, 4, -5]);

        assert!(config.contains_all(&LiteralSet::from([1, 2])));
        assert!(config.contains_all(&LiteralSet::from([-5, -3])));
        assert!(config.contains_all(&LiteralSet::empty()));
        assert!(!config.contains_all(&LiteralSet::from([1, 3])));
        assert!(!config.contains_all(&LiteralSet::from([6])));
        assert!(!LiteralSet::from([1]).contains_all(&LiteralSet::from([1, 2])));
    }

    #[test]
    fn test_contains_any() {
        let a = LiteralSet::from([1, -2, 3]);
        assert!(a.contains_any(&LiteralSet::from([-2, 5])));
        assert!(!a.contains_any(&LiteralSet::from([2, -3])));
        assert!(!a.contains_any(&LiteralSet::empty()));
    }

    #[test]
    fn test_set_algebra() {
        let a = LiteralSet::from([1, 2, -3, 4]);
        let b = LiteralSet::from([2, 3, 4, -5]);

        assert_eq!(a.retain_all(&b), LiteralSet::from([2, 4]));
        assert_eq!(a.remove_all(&b), LiteralSet::from([1, -3]));
        assert_eq!(a.union(&b), LiteralSet::from([1, 2, 3, -3, 4, -5]));
        assert_eq!(a.negate(), LiteralSet::from([-1, -2, 3, -4]));
    }

    #[test]
    fn test_union_all() {
        let sets = [
            LiteralSet::from([1, 2]),
            LiteralSet::from([2, 3]),
            LiteralSet::from([-4]),
        ];
        assert_eq!(LiteralSet::union_all(&sets), LiteralSet::from([1, 2, 3, -4]));
        assert_eq!(LiteralSet::union_all(&[]), LiteralSet::empty());
    }

    #[test]
    fn test_variables_and_conflicts() {
        let set = LiteralSet::from([-3, 1, 3, 7]);
        assert_eq!(set.variables(), vec![1, 3, 7]);
        assert_eq!(set.max_variable(), 7);
        assert!(set.has_conflict());
        assert!(!LiteralSet::from([-3, 1, 7]).has_conflict());
        assert_eq!(LiteralSet::empty().max_variable(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(LiteralSet::from([2, -1]).to_string(), "{-1, 2}");
        assert_eq!(LiteralSet::empty().to_string(), "{}");
    }
}
