//! # cmend-search
//!
//! The genetic search over patch-based variants.
//!
//! This crate provides:
//! - `FitnessEvaluator` — compile a candidate, run the good/bad harnesses,
//!   score it, memoised by source digest
//! - `sample_universal` — stochastic universal sampling over a population
//! - `mutate` / `crossover` — the path-weighted variation operators
//! - `RepairEngine` — the per-generation pipeline and termination logic
//! - `RunLog` — diagnostics tee'd to stderr and the `.debug` file
//!
//! Candidate-level failures (a variant that does not compile, a harness
//! that dies) are scored `0.0` and the search moves on; everything else
//! propagates as [`SearchError`].

pub mod engine;
pub mod fitness;
pub mod logger;
pub mod operators;
pub mod sample;

pub use engine::{EngineConfig, RepairEngine, RunReport};
pub use fitness::{BestRepair, FitnessConfig, FitnessEvaluator};
pub use logger::RunLog;
pub use operators::{crossover, mutate, MutationWeights};
pub use sample::sample_universal;

use cmend_repr::ReprError;
use thiserror::Error;

/// Errors that abort the search (candidate failures never surface here).
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Repr(#[from] ReprError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("population is empty")]
    EmptyPopulation,

    #[error("total fitness is zero; nothing to sample")]
    ZeroTotalFitness,

    #[error("parents disagree on path length ({0} vs {1})")]
    PathMismatch(usize, usize),

    #[error("no variant with positive fitness survived generation {0}")]
    Extinct(u32),
}
