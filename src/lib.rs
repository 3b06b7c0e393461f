//! # interaction-rs: Finding faulty feature interactions
//!
//! **`interaction-rs`** locates the small set of literals (a *`t`-wise interaction*) that makes
//! the configurations of a configurable system fail verification.
//! It needs two collaborators: a *verifier* that runs a configuration and reports pass or fail,
//! and a *configuration oracle* that builds valid configurations on request.
//!
//! ## How does it work?
//!
//! Every failing configuration contains the faulty interaction, and no passing one does.
//! The search keeps the `t`-literal combinations consistent with this evidence and, in each
//! round, verifies a new configuration that contains about half of them.
//! Whatever the outcome, about half of the remaining candidates are ruled out, so
//! a handful of verifications usually suffices.
//!
//! ## Key Features
//!
//! - **Adaptive search**: [`InteractionFinder`][crate::search::InteractionFinder] narrows the
//!   candidates until one is left, then confirms it with one more configuration.
//! - **Pluggable strategies**: random, ratio-optimizing, binary-split and oracle-delegated
//!   [selection][crate::strategy::Selection] of the next configuration.
//! - **Budgets, not errors**: verification and creation limits end a search gracefully with
//!   the candidates left so far.
//! - **Multiple arities**: [`find_across_arities`][crate::search::InteractionFinder::find_across_arities]
//!   reconciles searches for several `t`.
//! - **Feature models built in**: [`ModelOracle`][crate::model::ModelOracle] answers oracle
//!   queries from CNF constraints by uniform sampling on a BDD.
//! - **Parallel where it pays**: candidate enumeration and partitioning fan out over `rayon`.
//!
//! ## Basic Usage
//!
//! ```rust
//! use interaction_rs::literal::LiteralSet;
//! use interaction_rs::model::{FeatureModel, ModelOracle};
//! use interaction_rs::search::InteractionFinder;
//!
//! // 1. Describe the valid configurations: feature 3 requires feature 1.
//! let mut model = FeatureModel::new(5);
//! model.add_clause([-3, 1]);
//!
//! // 2. The system under test breaks whenever features 3 and 4 are both selected.
//! let verifier = |c: &LiteralSet| if c.contains_all(&LiteralSet::from([3, 4])) { 1 } else { 0 };
//!
//! // 3. Seed the finder with a known failure.
//! let mut finder = InteractionFinder::new(verifier, ModelOracle::new(&model, 7));
//! finder.add_configurations([LiteralSet::from([1, 2, 3, 4, 5])]).unwrap();
//!
//! // 4. Search for a pairwise interaction.
//! let found = finder.find(2).unwrap();
//! assert_eq!(found, vec![LiteralSet::from([3, 4])]);
//! ```
//!
//! ## Core Components
//!
//! - **[`search`]**: the search engine and its configuration.
//! - **[`candidates`]**: candidate interactions implied by a sample.
//! - **[`strategy`]**: configuration-selection strategies.
//! - **[`coordinator`]**: reconciling several arities.
//! - **[`support`]**: non-adaptive ranking of a fixed sample.
//! - **[`model`]**: feature models and the BDD-backed oracle.
//! - **[`oracle`]**: the verifier and configuration-oracle interfaces.

pub mod assignment;
pub mod candidates;
pub mod combinations;
pub mod coordinator;
pub mod error;
pub mod literal;
pub mod model;
pub mod oracle;
pub mod search;
pub mod session;
pub mod stats;
pub mod strategy;
pub mod support;
