//! Configuration-selection strategies.
//!
//! In every iteration the search asks a strategy for the next configuration to verify.
//! A good configuration contains roughly half of the remaining candidates: whatever the
//! verdict, half of the candidates are ruled out.
//!
//! - [`Selection::Random`] asks the oracle for any valid configuration.
//! - [`Selection::RatioOptimizing`] builds a small pool of configurations (some forced to
//!   contain a candidate, some random) and picks the one whose containment ratio over the
//!   candidates is closest to `0.5`.
//! - [`Selection::BinarySplit`] splits the candidates into two groups and asks for a
//!   configuration containing one group but none of the other.
//! - [`Selection::Delegate`] leaves the choice to [`ConfigurationOracle::choose`].
//!
//! Ratio-optimizing and binary-split selections only ever return configurations that
//! contain some but not all candidates, so each verification strictly shrinks the
//! candidate set.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::literal::LiteralSet;
use crate::oracle::ConfigurationOracle;
use crate::search::containment_ratio;
use crate::session::Session;

/// How [`Selection::BinarySplit`] divides the candidates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SplitHeuristic {
    /// Sort by largest variable and cut at the median.
    MedianVariable,
    /// Candidates built only from the most referenced variables go left, the rest right.
    /// `share` is the fraction of variables considered "most referenced".
    FrequentVariables { share: f64 },
}

impl SplitHeuristic {
    /// Divides `candidates` into two non-empty groups, if there are at least two.
    pub fn split(&self, candidates: &[LiteralSet]) -> (Vec<LiteralSet>, Vec<LiteralSet>) {
        match *self {
            SplitHeuristic::MedianVariable => split_at_median(candidates),
            SplitHeuristic::FrequentVariables { share } => {
                let (left, right) = split_by_frequency(candidates, share);
                if left.is_empty() || right.is_empty() {
                    split_at_median(candidates)
                } else {
                    (left, right)
                }
            }
        }
    }
}

fn split_at_median(candidates: &[LiteralSet]) -> (Vec<LiteralSet>, Vec<LiteralSet>) {
    let mut sorted = candidates.to_vec();
    sorted.sort_by(|a, b| a.max_variable().cmp(&b.max_variable()).then_with(|| a.cmp(b)));
    let right = sorted.split_off(sorted.len() / 2);
    (sorted, right)
}

fn split_by_frequency(candidates: &[LiteralSet], share: f64) -> (Vec<LiteralSet>, Vec<LiteralSet>) {
    let mut references: HashMap<u32, usize> = HashMap::new();
    for candidate in candidates {
        for var in candidate.variables() {
            *references.entry(var).or_default() += 1;
        }
    }

    let mut ranked: Vec<(u32, usize)> = references.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let keep = ((ranked.len() as f64) * share.clamp(0.0, 1.0)).ceil() as usize;
    let frequent: HashSet<u32> = ranked.iter().take(keep).map(|&(var, _)| var).collect();

    candidates
        .iter()
        .cloned()
        .partition(|candidate| candidate.variables().iter().all(|var| frequent.contains(var)))
}

/// A configuration-selection strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Random,
    RatioOptimizing {
        /// Configurations forced to contain one candidate each.
        samples: usize,
        /// Unconstrained random configurations.
        random_samples: usize,
    },
    BinarySplit(SplitHeuristic),
    Delegate,
}

/// Access to the configuration oracle that books every created configuration
/// against the session's creation budget.
pub(crate) struct Creator<'a, O> {
    pub(crate) oracle: &'a mut O,
    pub(crate) session: &'a mut Session,
    pub(crate) limit: usize,
}

impl<O: ConfigurationOracle> Creator<'_, O> {
    pub(crate) fn is_exhausted(&self) -> bool {
        self.session.counters().creations >= self.limit
    }

    pub(crate) fn complete(&mut self, include: &LiteralSet, exclude: &[LiteralSet]) -> Option<LiteralSet> {
        if self.is_exhausted() {
            return None;
        }
        let configuration = self.oracle.complete(include, exclude)?;
        self.session.count_creation();
        Some(configuration)
    }

    pub(crate) fn choose(&mut self, candidates: &[LiteralSet]) -> Option<LiteralSet> {
        if self.is_exhausted() {
            return None;
        }
        let configuration = self.oracle.choose(candidates)?;
        self.session.count_creation();
        Some(configuration)
    }
}

impl Selection {
    pub(crate) fn select<O: ConfigurationOracle>(
        &self,
        creator: &mut Creator<'_, O>,
        candidates: &[LiteralSet],
        parallel_threshold: usize,
    ) -> Option<LiteralSet> {
        match *self {
            Selection::Random => creator.complete(&LiteralSet::empty(), &[]),
            Selection::RatioOptimizing { samples, random_samples } => {
                select_by_ratio(creator, candidates, samples, random_samples, parallel_threshold)
            }
            Selection::BinarySplit(heuristic) => select_by_split(creator, candidates, heuristic),
            Selection::Delegate => creator.choose(candidates),
        }
    }
}

fn select_by_ratio<O: ConfigurationOracle>(
    creator: &mut Creator<'_, O>,
    candidates: &[LiteralSet],
    samples: usize,
    random_samples: usize,
    parallel_threshold: usize,
) -> Option<LiteralSet> {
    let mut pool = Vec::with_capacity(samples + random_samples);

    // At least one interaction present: spread the forced candidates over the list.
    if samples > 0 && !candidates.is_empty() {
        let step = (candidates.len() / samples).max(1);
        for candidate in candidates.iter().step_by(step).take(samples) {
            if let Some(configuration) = creator.complete(candidate, &[]) {
                pool.push(configuration);
            } else if creator.is_exhausted() {
                break;
            }
        }
    }

    for _ in 0..random_samples {
        match creator.complete(&LiteralSet::empty(), &[]) {
            Some(configuration) => pool.push(configuration),
            None => break,
        }
    }

    best_split(pool, candidates, parallel_threshold)
}

/// Picks the configuration whose containment ratio is closest to `0.5`.
///
/// Configurations containing none or all candidates (distance `0.5`) never qualify.
pub fn best_split(
    pool: impl IntoIterator<Item = LiteralSet>,
    candidates: &[LiteralSet],
    parallel_threshold: usize,
) -> Option<LiteralSet> {
    let mut best: Option<(f64, LiteralSet)> = None;
    for configuration in pool {
        let distance = (containment_ratio(&configuration, candidates, parallel_threshold) - 0.5).abs();
        if distance < best.as_ref().map_or(0.5, |(d, _)| *d) {
            best = Some((distance, configuration));
        }
    }
    if let Some((distance, configuration)) = &best {
        debug!("best_split: {} at distance {:.3}", configuration, distance);
    }
    best.map(|(_, configuration)| configuration)
}

fn select_by_split<O: ConfigurationOracle>(
    creator: &mut Creator<'_, O>,
    candidates: &[LiteralSet],
    heuristic: SplitHeuristic,
) -> Option<LiteralSet> {
    if candidates.len() < 2 {
        return None;
    }
    let (left, right) = heuristic.split(candidates);
    debug!("select_by_split: {} left, {} right", left.len(), right.len());

    // Bulk split: one whole group present, the other one absent.
    for (present, absent) in [(&left, &right), (&right, &left)] {
        let include = LiteralSet::union_all(present.iter());
        if include.has_conflict() {
            continue;
        }
        if let Some(configuration) = creator.complete(&include, absent) {
            return Some(configuration);
        }
        if creator.is_exhausted() {
            return None;
        }
    }

    // Per-combination split: a single candidate against the other group.
    for (present, absent) in [(&left, &right), (&right, &left)] {
        for candidate in present.iter() {
            if let Some(configuration) = creator.complete(candidate, absent) {
                return Some(configuration);
            }
            if creator.is_exhausted() {
                return None;
            }
        }
    }

    // Pairwise split: the first candidate against each other one, both ways round.
    let first = &candidates[0];
    for other in &candidates[1..] {
        for (present, absent) in [(first, other), (other, first)] {
            if let Some(configuration) = creator.complete(present, std::slice::from_ref(absent)) {
                return Some(configuration);
            }
            if creator.is_exhausted() {
                return None;
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::model::{FeatureModel, ModelOracle};

    fn singletons(vars: impl IntoIterator<Item = i32>) -> Vec<LiteralSet> {
        vars.into_iter().map(|v| LiteralSet::from([v])).collect()
    }

    fn splits(configuration: &LiteralSet, candidates: &[LiteralSet]) -> bool {
        let hits = candidates.iter().filter(|c| configuration.contains_all(c)).count();
        hits > 0 && hits < candidates.len()
    }

    #[test]
    fn test_median_split() {
        let candidates = singletons([5, 1, 4, 2, 3]);
        let (left, right) = SplitHeuristic::MedianVariable.split(&candidates);
        assert_eq!(left, singletons([1, 2]));
        assert_eq!(right, singletons([3, 4, 5]));
    }

    #[test]
    fn test_frequency_split() {
        let candidates = vec![
            LiteralSet::from([1, 2]),
            LiteralSet::from([1, 3]),
            LiteralSet::from([2, 4]),
            LiteralSet::from([1, 5]),
        ];
        // 1 is referenced three times, 2 twice; the top half of the variables is {1, 2, 3}.
        let (left, right) = SplitHeuristic::FrequentVariables { share: 0.5 }.split(&candidates);
        assert_eq!(left, vec![LiteralSet::from([1, 2]), LiteralSet::from([1, 3])]);
        assert_eq!(right, vec![LiteralSet::from([2, 4]), LiteralSet::from([1, 5])]);
    }

    #[test]
    fn test_frequency_split_falls_back_to_median() {
        let candidates = singletons([1, 2, 3, 4]);
        let (left, right) = SplitHeuristic::FrequentVariables { share: 1.0 }.split(&candidates);
        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 2);
    }

    #[test]
    fn test_best_split() {
        let candidates = singletons([1, 2, 3, 4]);
        let pool = vec![
            LiteralSet::from([1, 2, 3, 4]),
            LiteralSet::from([1, -2, -3, -4]),
            LiteralSet::from([1, 2, -3, -4]),
            LiteralSet::from([-1, -2, -3, -4]),
        ];
        assert_eq!(best_split(pool, &candidates, 16), Some(LiteralSet::from([1, 2, -3, -4])));

        let useless = vec![LiteralSet::from([1, 2, 3, 4]), LiteralSet::from([-1, -2, -3, -4])];
        assert_eq!(best_split(useless, &candidates, 16), None);
    }

    #[test]
    fn test_strategies_split_candidates() {
        let model = FeatureModel::new(8);
        let candidates = singletons(1..=8);
        let strategies = [
            Selection::BinarySplit(SplitHeuristic::MedianVariable),
            Selection::BinarySplit(SplitHeuristic::FrequentVariables { share: 0.7 }),
            Selection::RatioOptimizing {
                samples: 4,
                random_samples: 4,
            },
            Selection::Delegate,
        ];

        for strategy in strategies {
            let mut oracle = ModelOracle::new(&model, 9);
            let mut session = Session::new();
            let mut creator = Creator {
                oracle: &mut oracle,
                session: &mut session,
                limit: usize::MAX,
            };
            let configuration = strategy.select(&mut creator, &candidates, 16).unwrap();
            assert!(splits(&configuration, &candidates), "{:?} did not split", strategy);
            assert!(session.counters().creations >= 1);
        }
    }

    #[test]
    fn test_binary_split_with_infeasible_group() {
        // 1 and 2 exclude each other, so {1} and {2} can never be present together.
        let mut model = FeatureModel::new(4);
        model.add_clause([-1, -2]);
        let candidates = singletons([1, 2, 3, 4]);

        let mut oracle = ModelOracle::new(&model, 3);
        let mut session = Session::new();
        let mut creator = Creator {
            oracle: &mut oracle,
            session: &mut session,
            limit: usize::MAX,
        };
        let configuration = Selection::BinarySplit(SplitHeuristic::MedianVariable)
            .select(&mut creator, &candidates, 16)
            .unwrap();
        assert!(splits(&configuration, &candidates));
    }

    #[test]
    fn test_creation_limit() {
        let model = FeatureModel::new(4);
        let mut oracle = ModelOracle::new(&model, 3);
        let mut session = Session::new();
        let mut creator = Creator {
            oracle: &mut oracle,
            session: &mut session,
            limit: 0,
        };
        assert!(creator.is_exhausted());
        assert_eq!(Selection::Random.select(&mut creator, &singletons([1, 2]), 16), None);
    }
}
