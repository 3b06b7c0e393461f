//! Feature models and a configuration oracle backed by them.
//!
//! A [`FeatureModel`] is a set of CNF constraints over variables `1..=n`. The
//! [`ModelOracle`] encodes the model into a [`Bdd`] once and then answers every
//! configuration query by conjoining the query constraints and sampling a model
//! uniformly at random.
//!
//! # Example
//!
//! ```
//! use interaction_rs::literal::LiteralSet;
//! use interaction_rs::model::{FeatureModel, ModelOracle};
//! use interaction_rs::oracle::ConfigurationOracle;
//!
//! // Feature 2 requires feature 1, feature 3 is mandatory.
//! let mut model = FeatureModel::new(3);
//! model.add_clause([-2, 1]);
//! model.add_clause([3]);
//!
//! let mut oracle = ModelOracle::new(&model, 42);
//! assert_eq!(oracle.core(), LiteralSet::from([3]));
//!
//! let config = oracle.complete(&LiteralSet::from([2]), &[]).unwrap();
//! assert!(config.contains_all(&LiteralSet::from([1, 2, 3])));
//! assert_eq!(oracle.complete(&LiteralSet::from([2, -1]), &[]), None);
//! ```

pub mod bdd;

use std::cell::Cell;

use log::{debug, info};
use num_bigint::BigUint;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::literal::LiteralSet;
use crate::oracle::ConfigurationOracle;
use crate::strategy::best_split;

use self::bdd::{Bdd, Ref};

/// CNF constraints over variables `1..=num_variables`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FeatureModel {
    num_variables: u32,
    clauses: Vec<LiteralSet>,
}

impl FeatureModel {
    pub fn new(num_variables: u32) -> Self {
        Self {
            num_variables,
            clauses: Vec::new(),
        }
    }

    pub fn from_clauses(num_variables: u32, clauses: impl IntoIterator<Item = LiteralSet>) -> Self {
        let mut model = Self::new(num_variables);
        for clause in clauses {
            model.push_clause(clause);
        }
        model
    }

    pub fn num_variables(&self) -> u32 {
        self.num_variables
    }

    pub fn clauses(&self) -> &[LiteralSet] {
        &self.clauses
    }

    /// Adds the clause `l_1 | l_2 | ... | l_k`.
    ///
    /// # Panics
    ///
    /// Panics if a literal mentions a variable outside `1..=num_variables`.
    pub fn add_clause(&mut self, literals: impl IntoIterator<Item = i32>) {
        self.push_clause(LiteralSet::new(literals));
    }

    fn push_clause(&mut self, clause: LiteralSet) {
        assert!(
            clause.max_variable() <= self.num_variables,
            "Clause {} mentions a variable outside 1..={}",
            clause,
            self.num_variables
        );
        self.clauses.push(clause);
    }

    /// Encodes the conjunction of all clauses.
    pub fn encode(&self, bdd: &Bdd) -> Ref {
        bdd.apply_and_many(self.clauses.iter().map(|clause| bdd.mk_clause(clause.iter())))
    }
}

/// Node count below which queries never trigger garbage collection.
const MIN_GC_THRESHOLD: usize = 1 << 12;

/// A [`ConfigurationOracle`] answering queries against a [`FeatureModel`].
///
/// Every query builds a few temporary nodes. Once the manager grows past twice its
/// live size, everything but the encoded model is collected.
pub struct ModelOracle {
    bdd: Bdd,
    root: Cell<Ref>,
    gc_threshold: Cell<usize>,
    num_variables: u32,
    rng: ChaCha8Rng,
    choose_samples: usize,
}

impl ModelOracle {
    pub fn new(model: &FeatureModel, seed: u64) -> Self {
        let bdd = Bdd::default();
        let root = model.encode(&bdd);
        info!(
            "Encoded feature model with {} variables and {} clauses into {} BDD nodes",
            model.num_variables(),
            model.clauses().len(),
            bdd.num_nodes()
        );
        let gc_threshold = (2 * bdd.num_nodes()).max(MIN_GC_THRESHOLD);
        Self {
            bdd,
            root: Cell::new(root),
            gc_threshold: Cell::new(gc_threshold),
            num_variables: model.num_variables(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            choose_samples: 16,
        }
    }

    /// Sets how many random configurations [`choose`][ConfigurationOracle::choose] inspects.
    pub fn with_choose_samples(mut self, samples: usize) -> Self {
        self.choose_samples = samples;
        self
    }

    /// Restarts the random generator, making subsequent answers reproducible.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn num_variables(&self) -> u32 {
        self.num_variables
    }

    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }

    /// Returns `true` if the model has at least one valid configuration.
    pub fn is_satisfiable(&self) -> bool {
        !self.bdd.is_zero(self.root.get())
    }

    /// Number of valid configurations.
    pub fn count(&self) -> BigUint {
        self.bdd.sat_count(self.root.get(), self.num_variables)
    }

    /// Returns `true` if `configuration` can be extended to a valid configuration.
    pub fn is_valid(&self, configuration: &LiteralSet) -> bool {
        if configuration.max_variable() > self.num_variables {
            return false;
        }
        let cube = self.bdd.mk_cube(configuration.iter());
        let valid = !self.bdd.is_zero(self.bdd.apply_and(self.root.get(), cube));
        self.reclaim();
        valid
    }

    /// Literals fixed in every valid configuration: core features (positive)
    /// and dead features (negative).
    pub fn core(&self) -> LiteralSet {
        if !self.is_satisfiable() {
            return LiteralSet::empty();
        }
        let root = self.root.get();
        let mut core = Vec::new();
        for v in 1..=self.num_variables {
            let lit = v as i32;
            if self.bdd.is_zero(self.bdd.apply_and(root, self.bdd.mk_literal(-lit))) {
                core.push(lit);
            } else if self.bdd.is_zero(self.bdd.apply_and(root, self.bdd.mk_literal(lit))) {
                core.push(-lit);
            }
        }
        self.reclaim();
        LiteralSet::new(core)
    }

    fn constrain(&self, include: &LiteralSet, exclude: &[LiteralSet]) -> Ref {
        if include.has_conflict() || include.max_variable() > self.num_variables {
            return self.bdd.zero();
        }
        let mut f = self.bdd.apply_and(self.root.get(), self.bdd.mk_cube(include.iter()));
        for set in exclude {
            if self.bdd.is_zero(f) {
                break;
            }
            // No configuration contains a set outside the universe or with both `l` and `-l`.
            if set.has_conflict() || set.max_variable() > self.num_variables {
                continue;
            }
            let blocked = self.bdd.apply_not(self.bdd.mk_cube(set.iter()));
            f = self.bdd.apply_and(f, blocked);
        }
        f
    }

    /// Collects the nodes of finished queries once the manager has grown enough.
    fn reclaim(&self) {
        if self.bdd.num_nodes() <= self.gc_threshold.get() {
            return;
        }
        let roots = self.bdd.collect_garbage(&[self.root.get()]);
        if let Some(&root) = roots.first() {
            self.root.set(root);
        }
        self.gc_threshold.set((2 * self.bdd.num_nodes()).max(MIN_GC_THRESHOLD));
    }

    fn sample(&mut self, f: Ref) -> Option<LiteralSet> {
        let assignment = self.bdd.random_sat(f, self.num_variables, &mut self.rng)?;
        Some(assignment.to_literal_set())
    }
}

impl ConfigurationOracle for ModelOracle {
    fn complete(&mut self, include: &LiteralSet, exclude: &[LiteralSet]) -> Option<LiteralSet> {
        let f = self.constrain(include, exclude);
        let result = self.sample(f);
        self.reclaim();
        if result.is_none() {
            debug!("complete: no configuration with {} excluding {} sets", include, exclude.len());
        }
        result
    }

    fn update(&mut self, partial: &LiteralSet) -> Option<LiteralSet> {
        let grounded: LiteralSet = partial
            .iter()
            .filter(|lit| lit.unsigned_abs() <= self.num_variables)
            .collect();
        if grounded.has_conflict() || !self.is_valid(&grounded) {
            return None;
        }
        Some(grounded)
    }

    fn choose(&mut self, candidates: &[LiteralSet]) -> Option<LiteralSet> {
        let root = self.root.get();
        let pool: Vec<LiteralSet> = (0..self.choose_samples).map_while(|_| self.sample(root)).collect();
        best_split(pool, candidates, usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use test_log::test;

    use super::*;

    fn chain_model() -> FeatureModel {
        // 1 is the root feature; 2 and 3 require 1; 2 and 3 exclude each other; 5 is dead.
        FeatureModel::from_clauses(
            5,
            [
                LiteralSet::from([1]),
                LiteralSet::from([-2, 1]),
                LiteralSet::from([-3, 1]),
                LiteralSet::from([-2, -3]),
                LiteralSet::from([-5]),
            ],
        )
    }

    #[test]
    fn test_core_and_count() {
        let oracle = ModelOracle::new(&chain_model(), 0);
        assert!(oracle.is_satisfiable());
        assert_eq!(oracle.core(), LiteralSet::from([1, -5]));
        // Three choices for {2, 3}, two for 4.
        assert_eq!(oracle.count(), BigUint::from(6u32));
    }

    #[test]
    fn test_complete_respects_constraints() {
        let mut oracle = ModelOracle::new(&chain_model(), 1);

        for _ in 0..20 {
            let config = oracle.complete(&LiteralSet::from([2]), &[]).unwrap();
            assert_eq!(config.len(), 5);
            assert!(config.contains_all(&LiteralSet::from([1, 2, -3, -5])));
            assert!(oracle.is_valid(&config));
        }

        assert_eq!(oracle.complete(&LiteralSet::from([2, 3]), &[]), None);
        assert_eq!(oracle.complete(&LiteralSet::from([5]), &[]), None);
    }

    #[test]
    fn test_complete_with_exclusions() {
        let mut oracle = ModelOracle::new(&chain_model(), 2);
        let exclude = [LiteralSet::from([4]), LiteralSet::from([-2, -3])];

        for _ in 0..20 {
            let config = oracle.complete(&LiteralSet::empty(), &exclude).unwrap();
            assert!(config.contains(-4));
            assert!(config.contains(2) || config.contains(3));
        }

        let impossible = [LiteralSet::from([1])];
        assert_eq!(oracle.complete(&LiteralSet::empty(), &impossible), None);
    }

    #[test]
    fn test_update() {
        let mut oracle = ModelOracle::new(&chain_model(), 3);
        assert_eq!(oracle.update(&LiteralSet::from([2, 4, 9])), Some(LiteralSet::from([2, 4])));
        assert_eq!(oracle.update(&LiteralSet::from([2, 3])), None);
        assert_eq!(oracle.update(&LiteralSet::from([4, -4])), None);
    }

    #[test]
    fn test_choose_splits_candidates() {
        let mut oracle = ModelOracle::new(&FeatureModel::new(4), 4);
        let candidates = vec![
            LiteralSet::from([1]),
            LiteralSet::from([2]),
            LiteralSet::from([3]),
            LiteralSet::from([4]),
        ];
        let config = oracle.choose(&candidates).unwrap();
        let hits = candidates.iter().filter(|c| config.contains_all(c)).count();
        assert!(hits > 0 && hits < 4);

        // Nothing can split a single candidate.
        assert_eq!(oracle.choose(&candidates[..1]), None);
    }

    #[test]
    fn test_reseed_is_reproducible() {
        let mut oracle = ModelOracle::new(&FeatureModel::new(8), 5);
        oracle.reseed(11);
        let first: Vec<_> = (0..5).map(|_| oracle.complete(&LiteralSet::empty(), &[])).collect();
        oracle.reseed(11);
        let second: Vec<_> = (0..5).map(|_| oracle.complete(&LiteralSet::empty(), &[])).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_exclusions_outside_the_universe_are_ignored() {
        let mut oracle = ModelOracle::new(&FeatureModel::new(3), 1);
        let exclude = [LiteralSet::from([9]), LiteralSet::from([2, -9]), LiteralSet::from([1, -1])];

        let config = oracle.complete(&LiteralSet::empty(), &exclude).unwrap();
        assert_eq!(config.len(), 3);
        assert_eq!(config.max_variable(), 3);

        let config = oracle.complete(&LiteralSet::from([2]), &[LiteralSet::from([-3, 7])]).unwrap();
        assert!(config.contains(2));
    }

    #[test]
    fn test_repeated_queries_reclaim_nodes() {
        // Feature v requires feature v - 1.
        let model = FeatureModel::from_clauses(40, (2..=40).map(|v| LiteralSet::from([-v, v - 1])));
        let mut oracle = ModelOracle::new(&model, 6);
        let count = oracle.count();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut literal = || {
            let v = rng.random_range(1..=40);
            if rng.random_bool(0.5) { v } else { -v }
        };

        for _ in 0..3000 {
            let include = LiteralSet::from([literal()]);
            let exclude = [LiteralSet::from([literal(), literal()]), LiteralSet::from([literal(), literal()])];
            if let Some(config) = oracle.complete(&include, &exclude) {
                assert!(config.contains_all(&include));
                assert!(exclude.iter().all(|set| !config.contains_all(set)));
            }
            assert!(oracle.bdd().num_nodes() <= 2 * MIN_GC_THRESHOLD);
        }

        assert_eq!(oracle.count(), count);
        assert_eq!(oracle.core(), LiteralSet::empty());
        let config = oracle.complete(&LiteralSet::from([40]), &[]).unwrap();
        assert_eq!(config, (1..=40).collect::<LiteralSet>());
    }
}
