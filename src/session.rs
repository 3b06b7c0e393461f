//! State of one search session.
//!
//! A [`Session`] owns everything a search accumulates: the verified sample (split into
//! succeeding and failing configurations), the per-search budget counters, and the
//! statistics history. Creating a fresh session is how a finder is reset.

use std::collections::HashMap;

use crate::literal::LiteralSet;
use crate::oracle::Verdict;
use crate::stats::Statistic;

/// Budget counters of the current search.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Counters {
    pub creations: usize,
    pub verifications: usize,
    pub iterations: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    sample: Vec<LiteralSet>,
    succeeding: Vec<LiteralSet>,
    failing: Vec<LiteralSet>,
    verdicts: HashMap<LiteralSet, Verdict>,
    counters: Counters,
    statistics: Vec<Statistic>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// All verified configurations, in verification order.
    pub fn sample(&self) -> &[LiteralSet] {
        &self.sample
    }

    pub fn succeeding(&self) -> &[LiteralSet] {
        &self.succeeding
    }

    pub fn failing(&self) -> &[LiteralSet] {
        &self.failing
    }

    pub fn statistics(&self) -> &[Statistic] {
        &self.statistics
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// The verdict of an already verified configuration.
    pub fn verdict(&self, configuration: &LiteralSet) -> Option<Verdict> {
        self.verdicts.get(configuration).copied()
    }

    /// Stores a freshly verified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration was already recorded: every configuration
    /// is verified at most once per session.
    pub(crate) fn record(&mut self, configuration: LiteralSet, verdict: Verdict) {
        let previous = self.verdicts.insert(configuration.clone(), verdict);
        assert!(previous.is_none(), "Configuration {} was verified twice", configuration);

        self.counters.verifications += 1;
        self.sample.push(configuration.clone());
        match verdict {
            Verdict::Pass => self.succeeding.push(configuration),
            Verdict::Fail(_) => self.failing.push(configuration),
        }
    }

    pub(crate) fn count_creation(&mut self) {
        self.counters.creations += 1;
    }

    pub(crate) fn count_iteration(&mut self) {
        self.counters.iterations += 1;
    }

    /// Starts a new search: budget counters go back to zero, the sample is kept.
    pub(crate) fn reset_counters(&mut self) {
        self.counters = Counters::default();
    }

    pub(crate) fn push_statistic(&mut self, t: usize, candidates: usize) {
        self.statistics.push(Statistic {
            t,
            candidates,
            creations: self.counters.creations,
            verifications: self.counters.verifications,
            iteration: self.counters.iterations,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_classifies() {
        let mut session = Session::new();
        session.record(LiteralSet::from([1, 2]), Verdict::Fail(1));
        session.record(LiteralSet::from([-1, 2]), Verdict::Pass);
        session.record(LiteralSet::from([1, -2]), Verdict::Fail(2));

        assert_eq!(session.sample().len(), 3);
        assert_eq!(session.failing(), &[LiteralSet::from([1, 2]), LiteralSet::from([1, -2])]);
        assert_eq!(session.succeeding(), &[LiteralSet::from([-1, 2])]);
        assert_eq!(session.verdict(&LiteralSet::from([-1, 2])), Some(Verdict::Pass));
        assert_eq!(session.verdict(&LiteralSet::from([3])), None);
        assert_eq!(session.counters().verifications, 3);
    }

    #[test]
    #[should_panic(expected = "verified twice")]
    fn test_record_twice_panics() {
        let mut session = Session::new();
        session.record(LiteralSet::from([1]), Verdict::Pass);
        session.record(LiteralSet::from([1]), Verdict::Pass);
    }

    #[test]
    fn test_counters_and_statistics() {
        let mut session = Session::new();
        session.count_creation();
        session.count_iteration();
        session.record(LiteralSet::from([1]), Verdict::Pass);
        session.push_statistic(2, 7);

        assert_eq!(
            session.statistics(),
            &[Statistic {
                t: 2,
                candidates: 7,
                creations: 1,
                verifications: 1,
                iteration: 1,
            }]
        );

        session.reset_counters();
        assert_eq!(session.counters(), Counters::default());
        assert_eq!(session.sample().len(), 1);
        assert_eq!(session.statistics().len(), 1);
    }
}
