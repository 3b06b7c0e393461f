//! Searching across several arities.
//!
//! A single-arity search answers "which `t` literals explain the failures?" but the
//! right `t` is rarely known up front. [`InteractionFinder::find_across_arities`] runs
//! [`find`][InteractionFinder::find] for a sequence of arities and reconciles the
//! results by their *footprint*, the union of the literals of an arity's surviving
//! candidates:
//!
//! - an empty result carries no information and is skipped;
//! - a footprint equal to the previous one adds nothing;
//! - if one footprint contains the other, one extra configuration decides whether the
//!   larger footprint is really needed;
//! - if neither contains the other, the evidence contradicts itself and the chain stops.
//!
//! The last accepted result must then pass [`is_potential_interaction`]; if it does
//! not, earlier accepted results are tried, newest first.
//!
//! [`is_potential_interaction`]: InteractionFinder::is_potential_interaction

use log::{debug, info, warn};

use crate::error::Result;
use crate::literal::LiteralSet;
use crate::oracle::{ConfigurationOracle, Verifier};
use crate::search::InteractionFinder;

/// Order in which arities are searched.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ArityPolicy {
    /// `1, 2, ..., t_max`.
    #[default]
    Forward,
    /// `t_max, ..., 2, 1`.
    Backward,
    /// `1, ..., t_max` and back down to `1`, so later searches profit from the
    /// configurations verified on the way up.
    ForwardBackward,
}

impl ArityPolicy {
    pub fn arities(self, t_max: usize) -> Vec<usize> {
        match self {
            ArityPolicy::Forward => (1..=t_max).collect(),
            ArityPolicy::Backward => (1..=t_max).rev().collect(),
            ArityPolicy::ForwardBackward => (1..=t_max).chain((1..t_max).rev()).collect(),
        }
    }
}

/// The outcome of one arity, together with its literal footprint.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ArityResult {
    pub t: usize,
    pub candidates: Vec<LiteralSet>,
    pub footprint: LiteralSet,
}

impl ArityResult {
    pub fn new(t: usize, candidates: Vec<LiteralSet>) -> Self {
        let footprint = LiteralSet::union_all(&candidates);
        Self {
            t,
            candidates,
            footprint,
        }
    }

    /// Whether either footprint contains the other.
    pub fn is_compatible(&self, other: &ArityResult) -> bool {
        self.footprint.contains_all(&other.footprint) || other.footprint.contains_all(&self.footprint)
    }
}

impl<V, O> InteractionFinder<V, O>
where
    V: Verifier,
    O: ConfigurationOracle,
{
    /// Searches the arities given by `policy` up to `t_max` and returns the most specific
    /// consistent result with its arity, or `(vec![], 0)` if nothing was confirmed.
    ///
    /// # Errors
    ///
    /// Propagates [`find`][InteractionFinder::find] errors.
    pub fn find_across_arities(&mut self, t_max: usize, policy: ArityPolicy) -> Result<(Vec<LiteralSet>, usize)> {
        let mut accepted: Vec<ArityResult> = Vec::new();

        for t in policy.arities(t_max) {
            let candidates = self.find(t)?;
            if candidates.is_empty() {
                info!("find_across_arities: t={} found nothing", t);
                continue;
            }
            if !self.absorb(&mut accepted, ArityResult::new(t, candidates)) {
                break;
            }
        }

        Ok(self.first_potential(accepted))
    }

    /// Reconciles `current` with the last accepted result, pushing it if it is kept.
    ///
    /// Returns `false` if the two footprints are incompatible and the chain must stop.
    fn absorb(&mut self, accepted: &mut Vec<ArityResult>, current: ArityResult) -> bool {
        let Some(last) = accepted.last() else {
            accepted.push(current);
            return true;
        };
        if last.footprint == current.footprint {
            debug!("absorb: t={} repeats {}", current.t, current.footprint);
            return true;
        }
        if !last.is_compatible(&current) {
            info!(
                "absorb: t={} result {} contradicts t={} result {}, stopping",
                current.t, current.footprint, last.t, last.footprint
            );
            return false;
        }

        let current_is_larger = current.footprint.len() > last.footprint.len();
        let (smaller, larger) = if current_is_larger {
            (&last.footprint, &current.footprint)
        } else {
            (&current.footprint, &last.footprint)
        };
        let keep_larger = self.prefers_larger(smaller, larger);
        info!(
            "absorb: {} vs {}, keeping the {} one",
            smaller,
            larger,
            if keep_larger { "larger" } else { "smaller" }
        );
        if keep_larger == current_is_larger {
            accepted.push(current);
        }
        true
    }

    /// Returns the newest accepted result that passes [`is_potential_interaction`],
    /// or `(vec![], 0)` if none does.
    ///
    /// [`is_potential_interaction`]: InteractionFinder::is_potential_interaction
    fn first_potential(&mut self, accepted: Vec<ArityResult>) -> (Vec<LiteralSet>, usize) {
        for result in accepted.into_iter().rev() {
            if self.is_potential_interaction(&result.footprint) {
                info!("find_across_arities: t={} gives {}", result.t, result.footprint);
                return (result.candidates, result.t);
            }
            warn!("find_across_arities: t={} result {} rejected", result.t, result.footprint);
        }
        (Vec::new(), 0)
    }

    /// Decides between two nested footprints with one extra configuration.
    ///
    /// The configuration contains `smaller` but none of the literals only `larger` has.
    /// A failing or infeasible configuration keeps `smaller`, since it explains the
    /// failure without the extra literals; only a passing one keeps `larger`.
    fn prefers_larger(&mut self, smaller: &LiteralSet, larger: &LiteralSet) -> bool {
        let exclude: Vec<LiteralSet> = larger.remove_all(smaller).iter().map(|l| LiteralSet::from([l])).collect();
        match self.complete(smaller, &exclude) {
            Some(configuration) => self.verify(configuration).is_pass(),
            None => {
                debug!("prefers_larger: {} without {} is infeasible", smaller, larger);
                false
            }
        }
    }

    /// Checks `literals` against two fresh configurations.
    ///
    /// A configuration containing `literals` must fail and a configuration avoiding
    /// them must pass. An infeasible request does not count against the interaction.
    pub fn is_potential_interaction(&mut self, literals: &LiteralSet) -> bool {
        if literals.is_empty() {
            return false;
        }

        if let Some(configuration) = self.complete(literals, &[]) {
            if self.verify(configuration).is_pass() {
                debug!("is_potential_interaction: {} present but passed", literals);
                return false;
            }
        }

        if let Some(configuration) = self.complete(&LiteralSet::empty(), std::slice::from_ref(literals)) {
            if self.verify(configuration).is_fail() {
                debug!("is_potential_interaction: {} absent but failed", literals);
                return false;
            }
        }

        true
    }
}
