//! Non-adaptive interaction ranking by statistical support.
//!
//! Where [`InteractionFinder`][crate::search::InteractionFinder] asks for new
//! configurations, this finder only looks at a fixed sample. Every `t`-wise
//! combination of literals seen in a failing configuration is scored by
//!
//! ```text
//! support(x) = |{f in F : x ⊆ f}| / |F|  -  |{s in S : x ⊆ s}| / |S|
//! ```
//!
//! (the second term is `0` without succeeding configurations). Combinations that
//! occur in many failing and few succeeding runs rank first.

use log::debug;
use rayon::prelude::*;

use crate::candidates::{filter_combinations, UnknownPolicy};
use crate::error::{Error, Result};
use crate::literal::LiteralSet;

/// Thresholds applied to support scores.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SupportRanking {
    /// Only combinations with support strictly above this survive.
    pub min_support: f64,
    /// Of those, only combinations with support strictly above
    /// `relative_cutoff * max_support` are reported.
    pub relative_cutoff: f64,
}

impl Default for SupportRanking {
    fn default() -> Self {
        Self {
            min_support: 0.0,
            relative_cutoff: 0.5,
        }
    }
}

impl SupportRanking {
    pub fn with_min_support(mut self, min_support: f64) -> Self {
        self.min_support = min_support;
        self
    }

    pub fn with_relative_cutoff(mut self, relative_cutoff: f64) -> Self {
        self.relative_cutoff = relative_cutoff;
        self
    }
}

/// A combination with its support score.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub interaction: LiteralSet,
    pub support: f64,
}

pub fn support(interaction: &LiteralSet, failing: &[LiteralSet], succeeding: &[LiteralSet]) -> f64 {
    fn share(interaction: &LiteralSet, configurations: &[LiteralSet]) -> f64 {
        if configurations.is_empty() {
            return 0.0;
        }
        let hits = configurations.iter().filter(|c| c.contains_all(interaction)).count();
        hits as f64 / configurations.len() as f64
    }
    share(interaction, failing) - share(interaction, succeeding)
}

/// Ranks the `t`-wise combinations of failing literals (minus `core`) by support.
///
/// # Errors
///
/// [`Error::NoFailingConfigurations`] if `failing` is empty.
pub fn find_by_support(
    failing: &[LiteralSet],
    succeeding: &[LiteralSet],
    core: &LiteralSet,
    t: usize,
    ranking: &SupportRanking,
    parallel_threshold: usize,
) -> Result<Vec<Ranked>> {
    if failing.is_empty() {
        return Err(Error::NoFailingConfigurations);
    }
    if t == 0 {
        return Ok(Vec::new());
    }

    let universe = LiteralSet::union_all(failing).remove_all(core);
    let combinations = filter_combinations(&universe, t, failing, succeeding, UnknownPolicy::Keep, parallel_threshold);

    let score = |interaction: LiteralSet| {
        let support = support(&interaction, failing, succeeding);
        (support > ranking.min_support).then_some(Ranked { interaction, support })
    };
    let mut ranked: Vec<Ranked> = if combinations.len() < parallel_threshold {
        combinations.into_iter().filter_map(score).collect()
    } else {
        combinations.into_par_iter().filter_map(score).collect()
    };

    let max_support = ranked.iter().map(|r| r.support).fold(f64::NEG_INFINITY, f64::max);
    ranked.retain(|r| r.support > ranking.relative_cutoff * max_support);
    ranked.sort_by(|a, b| {
        b.support
            .total_cmp(&a.support)
            .then_with(|| a.interaction.cmp(&b.interaction))
    });

    debug!(
        "find_by_support: {} of the t={} combinations over {} literals ranked",
        ranked.len(),
        t,
        universe.len()
    );
    Ok(ranked)
}
