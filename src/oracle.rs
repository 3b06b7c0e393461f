//! Ports to the outside world: verification and configuration oracles.
//!
//! The search engine never decides on its own whether a configuration is valid or
//! whether it passes verification. It asks two oracles:
//!
//! - a [`Verifier`] runs the system under test on a configuration and reports a status
//!   (`0` = pass, anything else = fail);
//! - a [`ConfigurationOracle`] produces configurations that satisfy the system's
//!   constraints, optionally forced to contain or avoid given literals.
//!
//! Infeasibility is always `None`, never an error: the caller tries another strategy
//! or stops.

use std::time::{Duration, Instant};

use log::debug;

use crate::literal::LiteralSet;

/// Outcome of verifying one configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Verdict {
    Pass,
    /// Failure with the raw (non-zero) status reported by the verifier.
    Fail(i32),
}

impl Verdict {
    pub fn from_status(status: i32) -> Self {
        if status == 0 {
            Verdict::Pass
        } else {
            Verdict::Fail(status)
        }
    }

    pub fn is_pass(self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn is_fail(self) -> bool {
        !self.is_pass()
    }
}

/// Decides whether a configuration passes.
pub trait Verifier {
    /// Returns `0` if `configuration` passes, a non-zero failure class otherwise.
    fn test(&mut self, configuration: &LiteralSet) -> i32;
}

impl<F> Verifier for F
where
    F: FnMut(&LiteralSet) -> i32,
{
    fn test(&mut self, configuration: &LiteralSet) -> i32 {
        self(configuration)
    }
}

/// Produces configurations consistent with the constraints of the system under test.
pub trait ConfigurationOracle {
    /// Returns a configuration containing all of `include` and, for every set in
    /// `exclude`, not all of its literals. `None` if no such configuration exists.
    fn complete(&mut self, include: &LiteralSet, exclude: &[LiteralSet]) -> Option<LiteralSet>;

    /// Re-grounds a (possibly partial) literal set against the current variable universe.
    fn update(&mut self, partial: &LiteralSet) -> Option<LiteralSet>;

    /// Picks a configuration expected to split `candidates` well.
    fn choose(&mut self, candidates: &[LiteralSet]) -> Option<LiteralSet>;
}

impl<O: ConfigurationOracle + ?Sized> ConfigurationOracle for &mut O {
    fn complete(&mut self, include: &LiteralSet, exclude: &[LiteralSet]) -> Option<LiteralSet> {
        (**self).complete(include, exclude)
    }

    fn update(&mut self, partial: &LiteralSet) -> Option<LiteralSet> {
        (**self).update(partial)
    }

    fn choose(&mut self, candidates: &[LiteralSet]) -> Option<LiteralSet> {
        (**self).choose(candidates)
    }
}

/// Wraps an oracle so that it stops producing configurations after a deadline.
///
/// A call that is already running is not interrupted; calls made after the deadline
/// answer `None` straight away, which the search treats like infeasibility.
#[derive(Debug)]
pub struct Deadline<O> {
    inner: O,
    deadline: Instant,
}

impl<O> Deadline<O> {
    pub fn new(inner: O, budget: Duration) -> Self {
        Self {
            inner,
            deadline: Instant::now() + budget,
        }
    }

    pub fn at(inner: O, deadline: Instant) -> Self {
        Self { inner, deadline }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn into_inner(self) -> O {
        self.inner
    }

    fn check(&self) -> bool {
        if self.is_expired() {
            debug!("oracle deadline passed, refusing request");
            return false;
        }
        true
    }
}

impl<O: ConfigurationOracle> ConfigurationOracle for Deadline<O> {
    fn complete(&mut self, include: &LiteralSet, exclude: &[LiteralSet]) -> Option<LiteralSet> {
        if !self.check() {
            return None;
        }
        self.inner.complete(include, exclude)
    }

    fn update(&mut self, partial: &LiteralSet) -> Option<LiteralSet> {
        if !self.check() {
            return None;
        }
        self.inner.update(partial)
    }

    fn choose(&mut self, candidates: &[LiteralSet]) -> Option<LiteralSet> {
        if !self.check() {
            return None;
        }
        self.inner.choose(candidates)
    }
}
