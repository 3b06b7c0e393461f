//! The interaction search engine.
//!
//! # Theory
//!
//! A *candidate* is a set of `t` literals hypothesised to be the interaction that makes
//! verification fail. Every verified configuration `c` narrows the candidates:
//!
//! - if `c` **passes**, no candidate contained in `c` can be the cause;
//! - if `c` **fails**, the cause is present in `c`, so only candidates contained in `c`
//!   survive.
//!
//! The engine starts from the candidates consistent with the sample collected so far
//! (see [`compute_candidates`]) and repeatedly asks a [`Selection`] strategy for a
//! configuration that contains some but not all candidates, verifies it and partitions.
//! The candidate set never grows.
//!
//! # States
//!
//! ```text
//!              candidates > 1, budget left
//!            +-----------------------------+
//!            v                             |
//!   --> Searching ---------------------------+
//!            |  candidates <= 1         |  budget spent / no configuration
//!            v                          v
//!        Converged                  Exhausted
//! ```
//!
//! Exhaustion is not an error: [`InteractionFinder::find`] simply returns more than one
//! candidate and the caller decides what to make of it.
//!
//! # Example
//!
//! ```
//! use interaction_rs::literal::LiteralSet;
//! use interaction_rs::model::{FeatureModel, ModelOracle};
//! use interaction_rs::search::InteractionFinder;
//!
//! // Verification fails whenever features 2 and 5 are both selected.
//! let verifier = |c: &LiteralSet| c.contains_all(&LiteralSet::from([2, 5])) as i32;
//! let oracle = ModelOracle::new(&FeatureModel::new(6), 1);
//!
//! let mut finder = InteractionFinder::new(verifier, oracle);
//! finder.add_configurations([LiteralSet::from([1, 2, 3, 4, 5, 6])]).unwrap();
//!
//! let found = finder.find(2).unwrap();
//! assert_eq!(found, vec![LiteralSet::from([2, 5])]);
//! ```

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::candidates::{compute_candidates, UnknownPolicy};
use crate::error::{Error, Result};
use crate::literal::LiteralSet;
use crate::oracle::{ConfigurationOracle, Verdict, Verifier};
use crate::session::{Counters, Session};
use crate::stats::Statistic;
use crate::strategy::{Creator, Selection, SplitHeuristic};

/// Tuning knobs of the search engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FinderConfig {
    /// Maximum number of verifications per search.
    pub verification_limit: usize,
    /// Maximum number of configurations created per search.
    pub creation_limit: usize,
    /// Selection strategies, tried in order until one yields a new configuration.
    pub strategies: Vec<Selection>,
    /// Treatment of combinations without evidence either way.
    pub unknown_policy: UnknownPolicy,
    /// Whether [`InteractionFinder::find`] verifies a completion of the final candidate.
    pub confirm: bool,
    /// Minimum number of work items before rayon is used.
    pub parallel_threshold: usize,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            verification_limit: usize::MAX,
            creation_limit: usize::MAX,
            strategies: vec![
                Selection::BinarySplit(SplitHeuristic::MedianVariable),
                Selection::RatioOptimizing {
                    samples: 8,
                    random_samples: 4,
                },
            ],
            unknown_policy: UnknownPolicy::Discard,
            confirm: true,
            parallel_threshold: 1024,
        }
    }
}

impl FinderConfig {
    pub fn with_verification_limit(mut self, limit: usize) -> Self {
        self.verification_limit = limit;
        self
    }

    pub fn with_creation_limit(mut self, limit: usize) -> Self {
        self.creation_limit = limit;
        self
    }

    pub fn with_strategies(mut self, strategies: impl IntoIterator<Item = Selection>) -> Self {
        self.strategies = strategies.into_iter().collect();
        self
    }

    pub fn with_unknown_policy(mut self, policy: UnknownPolicy) -> Self {
        self.unknown_policy = policy;
        self
    }

    pub fn with_confirm(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SearchState {
    Searching,
    Converged,
    Exhausted,
}

/// Result of one arity's search, before confirmation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SearchOutcome {
    pub t: usize,
    pub candidates: Vec<LiteralSet>,
    pub state: SearchState,
}

/// Removes the candidates ruled out by verifying `configuration`.
///
/// A passing configuration rules out every candidate it contains; a failing one rules
/// out every candidate it does not contain. The result is a fresh vector, so callers
/// never observe a half-partitioned candidate list.
pub fn partition(
    candidates: Vec<LiteralSet>,
    configuration: &LiteralSet,
    verdict: Verdict,
    parallel_threshold: usize,
) -> Vec<LiteralSet> {
    let keep_contained = verdict.is_fail();
    if candidates.len() < parallel_threshold {
        candidates
            .into_iter()
            .filter(|candidate| configuration.contains_all(candidate) == keep_contained)
            .collect()
    } else {
        candidates
            .into_par_iter()
            .filter(|candidate| configuration.contains_all(candidate) == keep_contained)
            .collect()
    }
}

/// Fraction of `candidates` contained in `configuration` (`0` for no candidates).
pub fn containment_ratio(configuration: &LiteralSet, candidates: &[LiteralSet], parallel_threshold: usize) -> f64 {
    if candidates.is_empty() {
        return 0.0;
    }
    let hits = if candidates.len() < parallel_threshold {
        candidates.iter().filter(|c| configuration.contains_all(c)).count()
    } else {
        candidates.par_iter().filter(|c| configuration.contains_all(c)).count()
    };
    hits as f64 / candidates.len() as f64
}

/// Adaptive search for a faulty `t`-wise interaction.
pub struct InteractionFinder<V, O> {
    verifier: V,
    oracle: O,
    config: FinderConfig,
    core: LiteralSet,
    session: Session,
}

impl<V, O> InteractionFinder<V, O>
where
    V: Verifier,
    O: ConfigurationOracle,
{
    pub fn new(verifier: V, oracle: O) -> Self {
        Self {
            verifier,
            oracle,
            config: FinderConfig::default(),
            core: LiteralSet::empty(),
            session: Session::new(),
        }
    }

    pub fn with_config(mut self, config: FinderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_core(mut self, core: LiteralSet) -> Self {
        self.core = core;
        self
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut FinderConfig {
        &mut self.config
    }

    /// Forgets the sample, the counters and the statistics.
    pub fn reset(&mut self) {
        self.session = Session::new();
    }

    pub fn set_core(&mut self, core: LiteralSet) {
        self.core = core;
    }

    pub fn set_verifier(&mut self, verifier: V) {
        self.verifier = verifier;
    }

    pub fn set_oracle(&mut self, oracle: O) {
        self.oracle = oracle;
    }

    pub fn set_configuration_verification_limit(&mut self, limit: usize) {
        self.config.verification_limit = limit;
    }

    pub fn set_configuration_creation_limit(&mut self, limit: usize) {
        self.config.creation_limit = limit;
    }

    pub fn core(&self) -> &LiteralSet {
        &self.core
    }

    pub fn verifier_mut(&mut self) -> &mut V {
        &mut self.verifier
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn statistics(&self) -> &[Statistic] {
        self.session.statistics()
    }

    /// All verified configurations, in verification order.
    pub fn sample(&self) -> &[LiteralSet] {
        self.session.sample()
    }

    pub fn succeeding(&self) -> &[LiteralSet] {
        self.session.succeeding()
    }

    pub fn failing(&self) -> &[LiteralSet] {
        self.session.failing()
    }

    pub fn configuration_count(&self) -> usize {
        self.session.sample().len()
    }

    /// Budget counters of the most recent search.
    pub fn counters(&self) -> Counters {
        self.session.counters()
    }

    /// Verifies and records pre-existing configurations.
    ///
    /// Each configuration is re-grounded through [`ConfigurationOracle::update`] first;
    /// configurations the oracle rejects are skipped, and configurations already in the
    /// sample are not verified again.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if a configuration assigns some variable both ways.
    pub fn add_configurations(&mut self, configurations: impl IntoIterator<Item = LiteralSet>) -> Result<()> {
        for configuration in configurations {
            if configuration.has_conflict() {
                return Err(Error::InvalidState(format!(
                    "configuration {} assigns a variable both ways",
                    configuration
                )));
            }
            let Some(grounded) = self.oracle.update(&configuration) else {
                warn!("Skipping configuration {} rejected by the oracle", configuration);
                continue;
            };
            self.verify(grounded);
        }
        Ok(())
    }

    /// Verifies `configuration` unless it is already in the sample.
    pub(crate) fn verify(&mut self, configuration: LiteralSet) -> Verdict {
        if let Some(verdict) = self.session.verdict(&configuration) {
            return verdict;
        }
        let verdict = Verdict::from_status(self.verifier.test(&configuration));
        debug!("verify: {} -> {:?}", configuration, verdict);
        self.session.record(configuration, verdict);
        verdict
    }

    /// Asks the oracle for a configuration outside of the search loop's budget.
    pub(crate) fn complete(&mut self, include: &LiteralSet, exclude: &[LiteralSet]) -> Option<LiteralSet> {
        let configuration = self.oracle.complete(include, exclude)?;
        self.session.count_creation();
        Some(configuration)
    }

    /// Runs the strategies in order until one proposes an unverified configuration.
    fn select(&mut self, candidates: &[LiteralSet]) -> Option<LiteralSet> {
        let mut creator = Creator {
            oracle: &mut self.oracle,
            session: &mut self.session,
            limit: self.config.creation_limit,
        };
        for strategy in &self.config.strategies {
            match strategy.select(&mut creator, candidates, self.config.parallel_threshold) {
                Some(configuration) if creator.session.verdict(&configuration).is_none() => {
                    return Some(configuration);
                }
                Some(configuration) => debug!("select: {:?} proposed known {}", strategy, configuration),
                None => debug!("select: {:?} produced nothing", strategy),
            }
        }
        None
    }

    fn budget_left(&self) -> bool {
        let counters = self.session.counters();
        counters.verifications < self.config.verification_limit && counters.creations < self.config.creation_limit
    }

    /// Narrows the `t`-wise candidates until at most one is left or the budget is spent.
    ///
    /// The remaining candidates are returned as they are, without confirmation.
    ///
    /// # Errors
    ///
    /// [`Error::NoFailingConfigurations`] if `t > 0` and no failing configuration
    /// has been recorded.
    pub fn search(&mut self, t: usize) -> Result<SearchOutcome> {
        self.session.reset_counters();

        if t == 0 {
            self.session.push_statistic(0, 0);
            return Ok(SearchOutcome {
                t,
                candidates: Vec::new(),
                state: SearchState::Converged,
            });
        }

        let mut candidates = compute_candidates(
            self.session.failing(),
            self.session.succeeding(),
            &self.core,
            t,
            self.config.unknown_policy,
            self.config.parallel_threshold,
        )?;
        info!("t={}: searching among {} candidates", t, candidates.len());

        let mut state = SearchState::Searching;
        while state == SearchState::Searching {
            if candidates.len() <= 1 {
                state = SearchState::Converged;
                break;
            }
            if !self.budget_left() {
                info!("t={}: budget spent with {} candidates left", t, candidates.len());
                state = SearchState::Exhausted;
                break;
            }

            self.session.push_statistic(t, candidates.len());
            self.session.count_iteration();

            let Some(configuration) = self.select(&candidates) else {
                info!("t={}: no configuration splits the {} remaining candidates", t, candidates.len());
                state = SearchState::Exhausted;
                break;
            };

            let verdict = self.verify(configuration.clone());
            let before = candidates.len();
            candidates = partition(candidates, &configuration, verdict, self.config.parallel_threshold);
            debug!(
                "t={}: {:?} on {} narrowed {} -> {} candidates",
                t,
                verdict,
                configuration,
                before,
                candidates.len()
            );
        }

        self.session.push_statistic(t, candidates.len());
        if state == SearchState::Converged {
            info!("t={}: converged to {:?}", t, candidates.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        }
        Ok(SearchOutcome { t, candidates, state })
    }

    /// Searches for a `t`-wise interaction and confirms it.
    ///
    /// Returns a single interaction on success, an empty list if no interaction could
    /// be told apart, or several candidates if the budget ran out first.
    pub fn find(&mut self, t: usize) -> Result<Vec<LiteralSet>> {
        let outcome = self.search(t)?;
        if outcome.candidates.len() != 1 {
            return Ok(outcome.candidates);
        }

        let Some(candidate) = outcome.candidates.into_iter().next() else {
            return Ok(Vec::new());
        };
        if candidate.is_empty() {
            info!("t={}: failing configurations share no literals, no interaction", t);
            return Ok(Vec::new());
        }
        if self.config.confirm && !self.confirm(&candidate) {
            warn!("t={}: candidate {} was not confirmed", t, candidate);
            return Ok(Vec::new());
        }
        Ok(vec![candidate])
    }

    /// Completes `interaction` into a configuration and checks that it fails.
    fn confirm(&mut self, interaction: &LiteralSet) -> bool {
        match self.complete(interaction, &[]) {
            Some(configuration) => self.verify(configuration).is_fail(),
            None => {
                debug!("confirm: {} cannot be completed", interaction);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use std::time::Duration;

    use super::*;
    use crate::model::{FeatureModel, ModelOracle};
    use crate::oracle::Deadline;

    fn finder_for(
        num_vars: u32,
        interaction: LiteralSet,
    ) -> InteractionFinder<impl FnMut(&LiteralSet) -> i32, ModelOracle> {
        let verifier = move |c: &LiteralSet| c.contains_all(&interaction) as i32;
        InteractionFinder::new(verifier, ModelOracle::new(&FeatureModel::new(num_vars), 17))
    }

    #[test]
    fn test_partition() {
        let candidates = vec![LiteralSet::from([1]), LiteralSet::from([2]), LiteralSet::from([3])];
        let configuration = LiteralSet::from([1, 2, -3]);

        let passed = partition(candidates.clone(), &configuration, Verdict::Pass, 16);
        assert_eq!(passed, vec![LiteralSet::from([3])]);

        let failed = partition(candidates.clone(), &configuration, Verdict::Fail(1), 16);
        assert_eq!(failed, vec![LiteralSet::from([1]), LiteralSet::from([2])]);

        let parallel = partition(candidates, &configuration, Verdict::Fail(1), 1);
        assert_eq!(parallel, failed);
    }

    #[test]
    fn test_containment_ratio() {
        let candidates = vec![LiteralSet::from([1]), LiteralSet::from([2]), LiteralSet::from([3, 4])];
        let configuration = LiteralSet::from([1, 2, 3, -4]);
        assert!((containment_ratio(&configuration, &candidates, 16) - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(containment_ratio(&configuration, &[], 16), 0.0);
    }

    #[test]
    fn test_find_single_literal() {
        let mut finder = finder_for(10, LiteralSet::from([-7]));
        finder
            .add_configurations([LiteralSet::from([1, 2, 3, 4, 5, 6, -7, 8, 9, 10])])
            .unwrap();
        assert_eq!(finder.find(1).unwrap(), vec![LiteralSet::from([-7])]);
    }

    #[test]
    fn test_find_pair() {
        let mut finder = finder_for(8, LiteralSet::from([3, -6]));
        finder
            .add_configurations([LiteralSet::from([1, 2, 3, 4, 5, -6, 7, 8])])
            .unwrap();
        assert_eq!(finder.find(2).unwrap(), vec![LiteralSet::from([3, -6])]);
    }

    #[test]
    fn test_find_requires_failing_configuration() {
        let mut finder = finder_for(4, LiteralSet::from([1]));
        assert_eq!(finder.find(1), Err(Error::NoFailingConfigurations));

        finder.add_configurations([LiteralSet::from([-1, 2, 3, 4])]).unwrap();
        assert_eq!(finder.failing().len(), 0);
        assert_eq!(finder.find(1), Err(Error::NoFailingConfigurations));
    }

    #[test]
    fn test_conflicting_seed_rejected() {
        let mut finder = finder_for(4, LiteralSet::from([1]));
        let result = finder.add_configurations([LiteralSet::from([1, -1, 2])]);
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_seeds_are_verified_once() {
        let mut finder = finder_for(4, LiteralSet::from([1]));
        let seed = LiteralSet::from([1, 2, 3, 4]);
        finder.add_configurations([seed.clone(), seed.clone()]).unwrap();
        assert_eq!(finder.configuration_count(), 1);
        assert_eq!(finder.failing(), &[seed]);
    }

    #[test]
    fn test_zero_arity_is_noop() {
        let mut finder = finder_for(4, LiteralSet::from([1]));
        assert_eq!(finder.find(0).unwrap(), Vec::<LiteralSet>::new());
        assert_eq!(finder.statistics().len(), 1);
        assert_eq!(finder.statistics()[0].candidates, 0);
        assert_eq!(finder.statistics()[0].t, 0);
    }

    #[test]
    fn test_candidates_never_grow() {
        let mut finder = finder_for(12, LiteralSet::from([2, 9]));
        finder
            .add_configurations([LiteralSet::from([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12])])
            .unwrap();
        let outcome = finder.search(2).unwrap();
        assert_eq!(outcome.state, SearchState::Converged);
        assert_eq!(outcome.candidates, vec![LiteralSet::from([2, 9])]);

        let counts: Vec<usize> = finder.statistics().iter().map(|s| s.candidates).collect();
        assert_eq!(counts.first(), Some(&66));
        assert!(counts.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_sample_is_classified() {
        let mut finder = finder_for(6, LiteralSet::from([4]));
        finder.add_configurations([LiteralSet::from([1, 2, 3, 4, 5, 6])]).unwrap();
        assert_eq!(finder.find(1).unwrap(), vec![LiteralSet::from([4])]);

        assert!(finder.failing().iter().all(|c| c.contains(4)));
        assert!(finder.succeeding().iter().all(|c| !c.contains(4)));
    }

    #[test]
    fn test_unconfirmable_candidate_is_dropped() {
        let verifier = |c: &LiteralSet| c.contains(1) as i32;
        let oracle = Deadline::new(ModelOracle::new(&FeatureModel::new(1), 3), Duration::from_secs(3600));
        let mut finder = InteractionFinder::new(verifier, oracle);
        finder.add_configurations([LiteralSet::from([1])]).unwrap();

        // The oracle has run out of time, so the lone candidate cannot be completed.
        finder.set_oracle(Deadline::new(ModelOracle::new(&FeatureModel::new(1), 3), Duration::ZERO));
        assert_eq!(finder.find(1).unwrap(), Vec::<LiteralSet>::new());

        finder.config_mut().confirm = false;
        assert_eq!(finder.find(1).unwrap(), vec![LiteralSet::from([1])]);
    }
}
