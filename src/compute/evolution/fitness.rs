//! Epsilon-box fitness scheme and Pareto dominance primitives.
//!
//! All objectives are minimized.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::schema::ConfigError;

/// Outcome of comparing two objective vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    /// The left operand dominates the right.
    Dominates,
    /// The right operand dominates the left.
    Dominated,
    /// Neither dominates and they differ.
    NonDominated,
    /// Component-wise equal.
    Equal,
}

impl Dominance {
    /// Swap the roles of the operands.
    pub fn reverse(self) -> Self {
        match self {
            Self::Dominates => Self::Dominated,
            Self::Dominated => Self::Dominates,
            other => other,
        }
    }
}

/// Compare two slices component-wise under minimization.
fn dominance_by<T: PartialOrd>(a: &[T], b: &[T]) -> Dominance {
    debug_assert_eq!(a.len(), b.len());
    let mut a_better = false;
    let mut b_better = false;
    for (x, y) in a.iter().zip(b) {
        match x.partial_cmp(y) {
            Some(Ordering::Less) => a_better = true,
            Some(Ordering::Greater) => b_better = true,
            _ => {}
        }
        if a_better && b_better {
            return Dominance::NonDominated;
        }
    }
    match (a_better, b_better) {
        (true, false) => Dominance::Dominates,
        (false, true) => Dominance::Dominated,
        _ => Dominance::Equal,
    }
}

/// Pareto dominance between two objective vectors.
pub fn pareto_dominance(a: &[f64], b: &[f64]) -> Dominance {
    dominance_by(a, b)
}

/// Dominance between two epsilon-box indices.
pub fn box_dominance(a: &[i64], b: &[i64]) -> Dominance {
    dominance_by(a, b)
}

/// Objective values annotated with their epsilon box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoFitness {
    /// Raw objective values.
    pub values: Vec<f64>,
    /// Epsilon-box index, `floor(value / ϵ)` per objective.
    pub index: Vec<i64>,
    /// Distance from the box's lower corner in ϵ units. Breaks ties
    /// between members of the same box.
    pub distance: f64,
}

impl ParetoFitness {
    /// Number of objectives.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Scalar used to rank archive members: the sum of objectives.
    pub fn aggregate(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Pareto dominance against another fitness.
    pub fn dominance(&self, other: &ParetoFitness) -> Dominance {
        pareto_dominance(&self.values, &other.values)
    }

    /// Epsilon-box dominance against another fitness.
    pub fn box_dominance(&self, other: &ParetoFitness) -> Dominance {
        box_dominance(&self.index, &other.index)
    }
}

/// Epsilon-box dominance fitness scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct EpsBoxScheme {
    epsilon: Vec<f64>,
}

impl EpsBoxScheme {
    /// Create a scheme with one epsilon width per objective.
    pub fn new(epsilon: Vec<f64>) -> Result<Self, ConfigError> {
        if epsilon.len() < 2 {
            return Err(ConfigError::NotMultiObjective {
                objectives: epsilon.len(),
            });
        }
        if epsilon.iter().any(|&e| !(e > 0.0) || !e.is_finite()) {
            return Err(ConfigError::NonPositiveEpsilon);
        }
        Ok(Self { epsilon })
    }

    /// Number of objectives.
    pub fn num_objectives(&self) -> usize {
        self.epsilon.len()
    }

    /// Epsilon widths.
    pub fn epsilon(&self) -> &[f64] {
        &self.epsilon
    }

    /// Epsilon-box index of an objective vector.
    pub fn box_index(&self, values: &[f64]) -> Vec<i64> {
        values
            .iter()
            .zip(&self.epsilon)
            .map(|(v, e)| (v / e).floor() as i64)
            .collect()
    }

    /// Annotate raw objective values with their box and tie-break key.
    pub fn make_fitness(&self, values: Vec<f64>) -> ParetoFitness {
        debug_assert_eq!(values.len(), self.epsilon.len());
        let index = self.box_index(&values);
        let distance = values
            .iter()
            .zip(&self.epsilon)
            .zip(&index)
            .map(|((v, e), &i)| {
                let offset = v / e - i as f64;
                offset * offset
            })
            .sum::<f64>()
            .sqrt();
        ParetoFitness {
            values,
            index,
            distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pareto_dominance() {
        assert_eq!(pareto_dominance(&[1.0, 2.0], &[2.0, 3.0]), Dominance::Dominates);
        assert_eq!(pareto_dominance(&[1.0, 3.0], &[1.0, 2.0]), Dominance::Dominated);
        assert_eq!(
            pareto_dominance(&[1.0, 3.0], &[2.0, 2.0]),
            Dominance::NonDominated
        );
        assert_eq!(pareto_dominance(&[1.0, 2.0], &[1.0, 2.0]), Dominance::Equal);
        assert_eq!(Dominance::Dominates.reverse(), Dominance::Dominated);
    }

    #[test]
    fn test_box_index() {
        let scheme = EpsBoxScheme::new(vec![0.1, 0.1]).unwrap();
        let fitness = scheme.make_fitness(vec![1.0, 2.0]);
        assert_eq!(fitness.index, vec![10, 20]);
        assert!(fitness.distance < 1e-9);

        let inner = scheme.make_fitness(vec![1.05, 2.05]);
        assert_eq!(inner.index, vec![10, 20]);
        assert!((inner.distance - (0.5f64 * 0.5 * 2.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_negative_values_floor() {
        let scheme = EpsBoxScheme::new(vec![0.5, 1.0]).unwrap();
        assert_eq!(scheme.box_index(&[-0.1, -2.0]), vec![-1, -2]);
    }

    #[test]
    fn test_scheme_validation() {
        assert!(matches!(
            EpsBoxScheme::new(vec![0.1]),
            Err(ConfigError::NotMultiObjective { objectives: 1 })
        ));
        assert!(matches!(
            EpsBoxScheme::new(vec![0.1, -0.1]),
            Err(ConfigError::NonPositiveEpsilon)
        ));
    }
}
