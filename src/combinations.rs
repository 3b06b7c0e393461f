//! Lexicographic enumeration of `t`-element index combinations.
//!
//! For a universe of `n` elements and arity `t`, [`CombinationEnumerator`] produces all
//! `C(n, t)` index tuples `i_1 < i_2 < ... < i_t` in lexicographic order. Tuples can be
//! ranked and unranked, so a contiguous block of ranks can be handed to a worker thread
//! which then walks its block sequentially. [`CombinationEnumerator::par_filter_map`]
//! does exactly that on top of rayon and returns results in lexicographic order.
//!
//! # Example
//!
//! ```
//! use interaction_rs::combinations::CombinationEnumerator;
//!
//! let e = CombinationEnumerator::new(4, 2);
//! let all: Vec<_> = e.iter().collect();
//! assert_eq!(all.len(), 6);
//! assert_eq!(all[0], vec![0, 1]);
//! assert_eq!(all[5], vec![2, 3]);
//! assert_eq!(e.unrank(3), Some(vec![1, 2]));
//! ```

use log::debug;
use num_bigint::BigUint;
use rayon::prelude::*;

/// Binomial coefficient `C(n, k)`.
pub fn binomial(n: usize, k: usize) -> BigUint {
    if k > n {
        return BigUint::ZERO;
    }
    let k = k.min(n - k);
    let mut result = BigUint::from(1u32);
    for i in 0..k {
        result *= BigUint::from(n - i);
        result /= BigUint::from(i + 1);
    }
    result
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CombinationEnumerator {
    n: usize,
    t: usize,
}

impl CombinationEnumerator {
    pub fn new(n: usize, t: usize) -> Self {
        Self { n, t }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn t(&self) -> usize {
        self.t
    }

    /// Number of tuples, `C(n, t)`.
    pub fn count(&self) -> BigUint {
        binomial(self.n, self.t)
    }

    /// Iterates over all tuples in lexicographic order.
    pub fn iter(&self) -> Combinations {
        if self.t > self.n {
            return Combinations::exhausted(self.n);
        }
        Combinations {
            n: self.n,
            indices: (0..self.t).collect(),
            fresh: true,
            done: false,
        }
    }

    /// Iterates over the tuples starting at the given lexicographic rank.
    pub fn iter_from(&self, rank: u64) -> Combinations {
        match self.unrank(rank) {
            Some(indices) => Combinations {
                n: self.n,
                indices,
                fresh: true,
                done: false,
            },
            None => Combinations::exhausted(self.n),
        }
    }

    /// The tuple with the given lexicographic rank, or `None` if `rank >= C(n, t)`.
    pub fn unrank(&self, rank: u64) -> Option<Vec<usize>> {
        let total = self.count();
        if BigUint::from(rank) >= total {
            return None;
        }

        let mut rank = BigUint::from(rank);
        let mut indices = Vec::with_capacity(self.t);
        let mut next = 0;
        for i in 0..self.t {
            let remaining = self.t - i;
            let mut c = next;
            loop {
                // Number of tuples whose i-th index is exactly `c`.
                let block = binomial(self.n - c - 1, remaining - 1);
                if rank < block {
                    break;
                }
                rank -= block;
                c += 1;
            }
            indices.push(c);
            next = c + 1;
        }
        Some(indices)
    }

    /// Applies `f` to every tuple and collects the `Some` results in lexicographic order.
    ///
    /// When there are at least `threshold` tuples, the rank space is split into
    /// contiguous chunks that are processed on the rayon thread pool.
    pub fn par_filter_map<R, F>(&self, threshold: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(&[usize]) -> Option<R> + Sync + Send,
    {
        let total = match u64::try_from(&self.count()) {
            Ok(total) if total >= threshold as u64 && total > 1 => total,
            _ => return self.iter().filter_map(|c| f(&c)).collect(),
        };

        let chunks = (rayon::current_num_threads() * 4) as u64;
        let chunk_len = total.div_ceil(chunks).max(1);
        debug!(
            "par_filter_map: C({}, {}) = {} tuples in chunks of {}",
            self.n, self.t, total, chunk_len
        );

        let starts: Vec<u64> = (0..total).step_by(chunk_len as usize).collect();
        let parts: Vec<Vec<R>> = starts
            .into_par_iter()
            .map(|start| {
                let len = chunk_len.min(total - start) as usize;
                self.iter_from(start).take(len).filter_map(|c| f(&c)).collect()
            })
            .collect();
        parts.into_iter().flatten().collect()
    }
}

/// Iterator over index tuples, see [`CombinationEnumerator::iter`].
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    fresh: bool,
    done: bool,
}

impl Combinations {
    fn exhausted(n: usize) -> Self {
        Self {
            n,
            indices: Vec::new(),
            fresh: false,
            done: true,
        }
    }

    fn advance(&mut self) -> bool {
        let t = self.indices.len();
        let mut i = t;
        loop {
            if i == 0 {
                return false;
            }
            i -= 1;
            if self.indices[i] < self.n - t + i {
                break;
            }
        }
        self.indices[i] += 1;
        for j in (i + 1)..t {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        true
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.fresh {
            self.fresh = false;
            return Some(self.indices.clone());
        }
        if self.advance() {
            Some(self.indices.clone())
        } else {
            self.done = true;
            None
        }
    }
}
