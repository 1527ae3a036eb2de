//! Compute module - Numerical machinery of the optimizer.

pub mod evolution;

pub use evolution::{
    BorgError, BorgMoea, EpsBoxArchive, EvaluationError, Evaluator, Population, Problem,
    SearchSpace,
};
