//! Candidate interactions implied by a verified sample.
//!
//! Under the assumption that a single `t`-wise interaction causes every failure, the
//! interaction must be a subset of the literals shared by all failing configurations,
//! and it must not be a subset of any succeeding configuration. Core literals are
//! present in every valid configuration and so can never discriminate between pass and
//! fail; they are removed from the universe up front.
//!
//! # Example
//!
//! ```
//! use interaction_rs::candidates::{compute_candidates, UnknownPolicy};
//! use interaction_rs::literal::LiteralSet;
//!
//! let failing = [LiteralSet::from([1, 2, -3]), LiteralSet::from([1, 2, 3])];
//! let succeeding = [LiteralSet::from([1, -2, 3])];
//!
//! let candidates =
//!     compute_candidates(&failing, &succeeding, &LiteralSet::empty(), 1, UnknownPolicy::Discard, 1024)
//!         .unwrap();
//! // {1} occurs in a passing run, so only {2} remains.
//! assert_eq!(candidates, vec![LiteralSet::from([2])]);
//! ```

use log::debug;

use crate::combinations::CombinationEnumerator;
use crate::error::{Error, Result};
use crate::literal::LiteralSet;

/// What to do with a combination that is neither contained in a failing nor in a
/// succeeding configuration.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum UnknownPolicy {
    /// Drop it: only combinations seen in some failing run survive.
    #[default]
    Discard,
    /// Keep it as a possible cause.
    Keep,
}

/// Literals shared by every failing configuration, minus `core`.
pub fn common_literals(failing: &[LiteralSet], core: &LiteralSet) -> Result<LiteralSet> {
    let (first, rest) = failing.split_first().ok_or(Error::NoFailingConfigurations)?;
    let common = rest.iter().fold(first.clone(), |acc, config| acc.retain_all(config));
    Ok(common.remove_all(core))
}

/// Computes the `t`-wise candidate interactions consistent with the sample.
///
/// If fewer than `t` literals are shared by all failing configurations, the shared
/// literals themselves are returned as the only (degenerate) candidate.
///
/// # Errors
///
/// [`Error::NoFailingConfigurations`] if `failing` is empty.
pub fn compute_candidates(
    failing: &[LiteralSet],
    succeeding: &[LiteralSet],
    core: &LiteralSet,
    t: usize,
    policy: UnknownPolicy,
    parallel_threshold: usize,
) -> Result<Vec<LiteralSet>> {
    let common = common_literals(failing, core)?;
    if t == 0 {
        return Ok(Vec::new());
    }
    if common.len() < t {
        debug!("compute_candidates: only {} common literals for t={}, returning {}", common.len(), t, common);
        return Ok(vec![common]);
    }

    let candidates = filter_combinations(&common, t, failing, succeeding, policy, parallel_threshold);
    debug!(
        "compute_candidates: {} of C({}, {}) combinations survive",
        candidates.len(),
        common.len(),
        t
    );
    Ok(candidates)
}

/// Enumerates all `t`-subsets of `universe` and keeps those consistent with the sample.
///
/// A combination is dropped if it is contained in a succeeding configuration or if it
/// assigns both polarities to a variable. Combinations contained in no failing
/// configuration are handled according to `policy`.
pub fn filter_combinations(
    universe: &LiteralSet,
    t: usize,
    failing: &[LiteralSet],
    succeeding: &[LiteralSet],
    policy: UnknownPolicy,
    parallel_threshold: usize,
) -> Vec<LiteralSet> {
    let literals = universe.literals();
    CombinationEnumerator::new(literals.len(), t).par_filter_map(parallel_threshold, |indices| {
        let combination = LiteralSet::new(indices.iter().map(|&i| literals[i]));
        is_consistent(&combination, failing, succeeding, policy).then_some(combination)
    })
}

fn is_consistent(
    combination: &LiteralSet,
    failing: &[LiteralSet],
    succeeding: &[LiteralSet],
    policy: UnknownPolicy,
) -> bool {
    if combination.has_conflict() {
        return false;
    }
    if succeeding.iter().any(|config| config.contains_all(combination)) {
        return false;
    }
    match policy {
        UnknownPolicy::Keep => true,
        UnknownPolicy::Discard => failing.iter().any(|config| config.contains_all(combination)),
    }
}
