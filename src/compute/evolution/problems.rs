//! Standard multi-objective benchmark problems.

use std::f64::consts::FRAC_PI_2;

use crate::schema::{ConfigError, ProblemConfig};

use super::evaluator::{EvaluationError, Problem};
use super::space::SearchSpace;

/// Schaffer's function N.1: `(x², (x - 2)²)`. Pareto set `x ∈ [0, 2]`.
#[derive(Debug, Clone)]
pub struct Schaffer1 {
    space: SearchSpace,
}

impl Schaffer1 {
    pub fn new(bound: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            space: SearchSpace::uniform(1, (-bound, bound))?,
        })
    }
}

impl Problem for Schaffer1 {
    fn name(&self) -> &str {
        "schaffer1"
    }

    fn num_objectives(&self) -> usize {
        2
    }

    fn search_space(&self) -> SearchSpace {
        self.space.clone()
    }

    fn evaluate(&self, params: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        let x = params[0];
        Ok(vec![x * x, (x - 2.0) * (x - 2.0)])
    }
}

/// ZDT1: convex front `f2 = 1 - sqrt(f1)` reached when `x[1..] = 0`.
#[derive(Debug, Clone)]
pub struct Zdt1 {
    space: SearchSpace,
}

impl Zdt1 {
    pub fn new(dimensions: usize) -> Result<Self, ConfigError> {
        if dimensions < 2 {
            return Err(ConfigError::InvalidBounds(
                "ZDT1 needs at least 2 dimensions".into(),
            ));
        }
        Ok(Self {
            space: SearchSpace::uniform(dimensions, (0.0, 1.0))?,
        })
    }
}

impl Problem for Zdt1 {
    fn name(&self) -> &str {
        "zdt1"
    }

    fn num_objectives(&self) -> usize {
        2
    }

    fn search_space(&self) -> SearchSpace {
        self.space.clone()
    }

    fn evaluate(&self, params: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        let f1 = params[0];
        let tail = &params[1..];
        let g = 1.0 + 9.0 * tail.iter().sum::<f64>() / tail.len() as f64;
        let f2 = g * (1.0 - (f1 / g).sqrt());
        Ok(vec![f1, f2])
    }
}

/// DTLZ2: spherical front `Σ f² = 1` reached when the last `k` variables
/// equal 0.5.
#[derive(Debug, Clone)]
pub struct Dtlz2 {
    space: SearchSpace,
    objectives: usize,
}

impl Dtlz2 {
    pub fn new(dimensions: usize, objectives: usize) -> Result<Self, ConfigError> {
        if objectives < 2 {
            return Err(ConfigError::NotMultiObjective { objectives });
        }
        if dimensions < objectives {
            return Err(ConfigError::InvalidBounds(format!(
                "DTLZ2 needs at least {} dimensions for {} objectives",
                objectives, objectives
            )));
        }
        Ok(Self {
            space: SearchSpace::uniform(dimensions, (0.0, 1.0))?,
            objectives,
        })
    }
}

impl Problem for Dtlz2 {
    fn name(&self) -> &str {
        "dtlz2"
    }

    fn num_objectives(&self) -> usize {
        self.objectives
    }

    fn search_space(&self) -> SearchSpace {
        self.space.clone()
    }

    fn evaluate(&self, params: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        let m = self.objectives;
        let g: f64 = params[m - 1..].iter().map(|x| (x - 0.5).powi(2)).sum();
        let mut values = vec![1.0 + g; m];
        for (i, value) in values.iter_mut().enumerate() {
            for x in &params[..m - 1 - i] {
                *value *= (x * FRAC_PI_2).cos();
            }
            if i > 0 {
                *value *= (params[m - 1 - i] * FRAC_PI_2).sin();
            }
        }
        Ok(values)
    }
}

/// Instantiate a configured benchmark problem.
pub fn build_problem(config: &ProblemConfig) -> Result<Box<dyn Problem>, ConfigError> {
    Ok(match *config {
        ProblemConfig::Schaffer1 { bound } => Box::new(Schaffer1::new(bound)?),
        ProblemConfig::Zdt1 { dimensions } => Box::new(Zdt1::new(dimensions)?),
        ProblemConfig::Dtlz2 {
            dimensions,
            objectives,
        } => Box::new(Dtlz2::new(dimensions, objectives)?),
    })
}
