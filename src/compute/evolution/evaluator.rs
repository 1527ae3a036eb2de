//! Problem interface and fitness evaluation.

use rayon::prelude::*;

use super::archive::{ArchiveOutcome, EpsBoxArchive};
use super::fitness::{EpsBoxScheme, ParetoFitness};
use super::population::Candidate;
use super::space::SearchSpace;

/// Error raised while evaluating a candidate.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Fitness function failed: {0}")]
    Failed(String),
    #[error("Expected {expected} objectives, got {got}")]
    ObjectiveCount { expected: usize, got: usize },
    #[error("Objective {index} is not finite")]
    NonFinite { index: usize },
    #[error("Expected {expected} parameters, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// A multi-objective minimization problem.
pub trait Problem: Sync {
    /// Human-readable problem name.
    fn name(&self) -> &str;

    /// Number of objectives returned by [`evaluate`](Self::evaluate).
    fn num_objectives(&self) -> usize;

    /// Feasible region of the parameters.
    fn search_space(&self) -> SearchSpace;

    /// Compute the objective values of a parameter vector.
    fn evaluate(&self, params: &[f64]) -> Result<Vec<f64>, EvaluationError>;
}

impl<P: Problem + ?Sized> Problem for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn num_objectives(&self) -> usize {
        (**self).num_objectives()
    }

    fn search_space(&self) -> SearchSpace {
        (**self).search_space()
    }

    fn evaluate(&self, params: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        (**self).evaluate(params)
    }
}

/// Evaluates candidates and feeds the results into the archive.
pub struct Evaluator<P> {
    problem: P,
    dimensions: usize,
    archive: EpsBoxArchive,
    num_evals: u64,
}

impl<P: Problem> Evaluator<P> {
    /// Create an evaluator with an empty archive.
    pub fn new(problem: P, scheme: EpsBoxScheme) -> Self {
        let dimensions = problem.search_space().dimensions();
        Self {
            problem,
            dimensions,
            archive: EpsBoxArchive::new(scheme),
            num_evals: 0,
        }
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn archive(&self) -> &EpsBoxArchive {
        &self.archive
    }

    pub(crate) fn archive_mut(&mut self) -> &mut EpsBoxArchive {
        &mut self.archive
    }

    /// Fitness function calls so far.
    pub fn num_evals(&self) -> u64 {
        self.num_evals
    }

    /// Call the fitness function and validate its output.
    fn compute_fitness(&self, params: &[f64]) -> Result<ParetoFitness, EvaluationError> {
        if params.len() != self.dimensions {
            return Err(EvaluationError::DimensionMismatch {
                expected: self.dimensions,
                got: params.len(),
            });
        }
        let values = self.problem.evaluate(params)?;
        let scheme = self.archive.scheme();
        if values.len() != scheme.num_objectives() {
            return Err(EvaluationError::ObjectiveCount {
                expected: scheme.num_objectives(),
                got: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(EvaluationError::NonFinite { index });
        }
        Ok(scheme.make_fitness(values))
    }

    /// Fitness of several parameter vectors, optionally on the rayon pool.
    ///
    /// Stops at the first failure; nothing is returned for the rest.
    fn compute_batch(
        &self,
        individuals: &[&[f64]],
        parallel: bool,
    ) -> Result<Vec<ParetoFitness>, EvaluationError> {
        if parallel {
            individuals
                .par_iter()
                .map(|params| self.compute_fitness(params))
                .collect()
        } else {
            individuals
                .iter()
                .map(|params| self.compute_fitness(params))
                .collect()
        }
    }

    /// Evaluate a parameter vector and offer it to the archive.
    pub fn evaluate(
        &mut self,
        params: &[f64],
        tag: Option<usize>,
    ) -> Result<(ParetoFitness, ArchiveOutcome), EvaluationError> {
        let fitness = self.compute_fitness(params)?;
        self.num_evals += 1;
        let outcome = self.archive.insert(params, &fitness, tag);
        Ok((fitness, outcome))
    }

    /// Evaluate a candidate, cache its fitness and offer it to the archive.
    pub fn update_fitness(
        &mut self,
        candidate: &mut Candidate,
    ) -> Result<ArchiveOutcome, EvaluationError> {
        let (fitness, outcome) = self.evaluate(&candidate.params, candidate.tag)?;
        candidate.fitness = Some(fitness);
        Ok(outcome)
    }

    /// Evaluate several candidates.
    ///
    /// Fitness calls may run in parallel; archive insertion happens serially
    /// in candidate order once every call has succeeded. A failed batch
    /// leaves the archive untouched.
    pub fn update_fitness_batch(
        &mut self,
        candidates: &mut [Candidate],
        parallel: bool,
    ) -> Result<Vec<ArchiveOutcome>, EvaluationError> {
        let fitness = {
            let individuals: Vec<&[f64]> = candidates.iter().map(|c| c.params.as_slice()).collect();
            self.compute_batch(&individuals, parallel)?
        };

        let mut outcomes = Vec::with_capacity(candidates.len());
        for (candidate, fitness) in candidates.iter_mut().zip(fitness) {
            self.num_evals += 1;
            outcomes.push(self.archive.insert(&candidate.params, &fitness, candidate.tag));
            candidate.fitness = Some(fitness);
        }
        Ok(outcomes)
    }

    /// Evaluate untagged parameter vectors, e.g. a fresh population.
    pub fn evaluate_batch(
        &mut self,
        individuals: &[&[f64]],
        parallel: bool,
    ) -> Result<Vec<ParetoFitness>, EvaluationError> {
        let fitness = self.compute_batch(individuals, parallel)?;
        for (params, f) in individuals.iter().zip(&fitness) {
            self.num_evals += 1;
            self.archive.insert(params, f, None);
        }
        Ok(fitness)
    }
}
