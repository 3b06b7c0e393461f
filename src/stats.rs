use std::fmt::{Display, Formatter};

/// Snapshot of a running search, taken once per loop iteration.
///
/// Statistics are telemetry only: the search never reads them back to make decisions.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Statistic {
    /// Arity being searched.
    pub t: usize,
    /// Number of remaining candidate interactions.
    pub candidates: usize,
    /// Configurations created by the oracle so far in this search.
    pub creations: usize,
    /// Configurations verified so far in this search.
    pub verifications: usize,
    /// Loop iteration the snapshot was taken in.
    pub iteration: usize,
}

impl Display for Statistic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "t={} candidates={} created={} verified={} iteration={}",
            self.t, self.candidates, self.creations, self.verifications, self.iteration
        )
    }
}
