use thiserror::Error;

/// Caller misuse of the search engine.
///
/// Infeasible oracle requests and exhausted budgets are not errors: the former are
/// `None`, the latter a [`SearchState::Exhausted`][crate::search::SearchState] outcome.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum Error {
    #[error("no failing configuration has been recorded yet")]
    NoFailingConfigurations,

    #[error("invalid state: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, Error>;
