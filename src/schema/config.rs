//! Configuration types for the Borg MOEA.

use serde::{Deserialize, Serialize};

/// Top-level optimizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorgConfig {
    /// Epsilon-box widths, one per objective. A single value is broadcast
    /// to every objective.
    #[serde(default = "default_epsilon")]
    pub epsilon: Vec<f64>,
    /// Tournament size as a fraction of the population (τ).
    #[serde(default = "default_tournament_fraction")]
    pub tournament_fraction: f64,
    /// Target population-to-archive size ratio (γ).
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Tolerated relative drift from the γ ratio before restarting (γ_δ).
    #[serde(default = "default_gamma_delta")]
    pub gamma_delta: f64,
    /// Laplace smoothing constant for operator weights (ζ).
    #[serde(default = "default_zeta")]
    pub zeta: f64,
    /// Minimum population size, also the initial size.
    #[serde(default = "default_min_population_size")]
    pub min_population_size: usize,
    /// Steps between restart checks.
    #[serde(default = "default_restart_check_period")]
    pub restart_check_period: usize,
    /// Steps between operator weight updates.
    #[serde(default = "default_operators_update_period")]
    pub operators_update_period: usize,
    /// Archive insertions without progress that force a restart.
    #[serde(default = "default_max_steps_without_progress")]
    pub max_steps_without_progress: usize,
    /// Variation operators competing for selection.
    #[serde(default = "default_operators")]
    pub operators: Vec<OperatorConfig>,
    /// Polynomial mutation applied after every recombination.
    #[serde(default)]
    pub mutation: PolynomialMutationConfig,
    /// Mutation used to inject diversity on restart.
    #[serde(default)]
    pub restart_mutation: UniformMutationConfig,
    /// Evaluate the offspring of a step on the rayon pool.
    #[serde(default)]
    pub parallel_evaluation: bool,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for BorgConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            tournament_fraction: default_tournament_fraction(),
            gamma: default_gamma(),
            gamma_delta: default_gamma_delta(),
            zeta: default_zeta(),
            min_population_size: default_min_population_size(),
            restart_check_period: default_restart_check_period(),
            operators_update_period: default_operators_update_period(),
            max_steps_without_progress: default_max_steps_without_progress(),
            operators: default_operators(),
            mutation: PolynomialMutationConfig::default(),
            restart_mutation: UniformMutationConfig::default(),
            parallel_evaluation: false,
            random_seed: None,
        }
    }
}

fn default_epsilon() -> Vec<f64> {
    vec![0.1]
}
fn default_tournament_fraction() -> f64 {
    0.02
}
fn default_gamma() -> f64 {
    4.0
}
fn default_gamma_delta() -> f64 {
    0.25
}
fn default_zeta() -> f64 {
    1.0
}
fn default_min_population_size() -> usize {
    100
}
fn default_restart_check_period() -> usize {
    1000
}
fn default_operators_update_period() -> usize {
    100
}
fn default_max_steps_without_progress() -> usize {
    100
}

fn default_operators() -> Vec<OperatorConfig> {
    vec![
        OperatorConfig::SimulatedBinary {
            rate: 1.0,
            distribution_index: 15.0,
        },
        OperatorConfig::DifferentialEvolution {
            crossover_rate: 0.1,
            step_size: 0.5,
        },
        OperatorConfig::ParentCentric {
            parents: 10,
            children: 2,
            eta: 0.1,
            zeta: 0.1,
        },
        OperatorConfig::UnimodalNormal {
            parents: 10,
            children: 2,
            zeta: 0.5,
            eta: 0.35,
        },
        OperatorConfig::Simplex {
            parents: 10,
            children: 2,
            expansion: 3.0,
        },
        OperatorConfig::UniformMutation { rate: None },
    ]
}

/// A variation operator and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperatorConfig {
    /// Simulated binary crossover (SBX).
    SimulatedBinary {
        /// Probability of recombining a parent pair.
        rate: f64,
        /// Crossover distribution index (η_c).
        distribution_index: f64,
    },
    /// DE/rand/1/bin differential evolution.
    DifferentialEvolution {
        /// Binomial crossover probability (CR).
        crossover_rate: f64,
        /// Differential weight (F).
        step_size: f64,
    },
    /// Parent-centric crossover (PCX).
    ParentCentric {
        parents: usize,
        children: usize,
        /// Spread along the index-parent direction.
        eta: f64,
        /// Spread across the orthogonal directions.
        zeta: f64,
    },
    /// Unimodal normal distribution crossover (UNDX).
    UnimodalNormal {
        parents: usize,
        children: usize,
        /// Spread along the primary search directions.
        zeta: f64,
        /// Spread across the orthogonal complement.
        eta: f64,
    },
    /// Simplex crossover (SPX).
    Simplex {
        parents: usize,
        children: usize,
        /// Simplex expansion factor.
        expansion: f64,
    },
    /// Uniform mutation of a single parent.
    UniformMutation {
        /// Per-coordinate probability; `None` means `1 / dimensions`.
        #[serde(default)]
        rate: Option<f64>,
    },
}

impl OperatorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::InvalidOperator(msg));
        match *self {
            Self::SimulatedBinary {
                rate,
                distribution_index,
            } => {
                if !(0.0..=1.0).contains(&rate) {
                    return invalid(format!("SBX rate {} outside [0, 1]", rate));
                }
                if distribution_index < 0.0 {
                    return invalid("SBX distribution index must be non-negative".into());
                }
            }
            Self::DifferentialEvolution {
                crossover_rate,
                step_size,
            } => {
                if !(0.0..=1.0).contains(&crossover_rate) {
                    return invalid(format!("DE crossover rate {} outside [0, 1]", crossover_rate));
                }
                if step_size <= 0.0 {
                    return invalid("DE step size must be positive".into());
                }
            }
            Self::ParentCentric {
                parents, children, ..
            }
            | Self::UnimodalNormal {
                parents, children, ..
            }
            | Self::Simplex {
                parents, children, ..
            } => {
                if parents < 2 {
                    return invalid(format!("{} needs at least 2 parents", self.label()));
                }
                if children == 0 {
                    return invalid(format!("{} must produce children", self.label()));
                }
            }
            Self::UniformMutation { rate } => {
                if let Some(rate) = rate
                    && !(0.0..=1.0).contains(&rate)
                {
                    return invalid(format!("Uniform mutation rate {} outside [0, 1]", rate));
                }
            }
        }
        Ok(())
    }

    /// Short operator name used in traces.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SimulatedBinary { .. } => "SBX",
            Self::DifferentialEvolution { .. } => "DE",
            Self::ParentCentric { .. } => "PCX",
            Self::UnimodalNormal { .. } => "UNDX",
            Self::Simplex { .. } => "SPX",
            Self::UniformMutation { .. } => "UM",
        }
    }
}

/// Polynomial mutation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialMutationConfig {
    /// Per-coordinate probability; `None` means `1 / dimensions`.
    #[serde(default)]
    pub rate: Option<f64>,
    /// Mutation distribution index (η_m).
    #[serde(default = "default_pm_distribution_index")]
    pub distribution_index: f64,
}

impl Default for PolynomialMutationConfig {
    fn default() -> Self {
        Self {
            rate: None,
            distribution_index: default_pm_distribution_index(),
        }
    }
}

fn default_pm_distribution_index() -> f64 {
    20.0
}

/// Uniform mutation parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniformMutationConfig {
    /// Per-coordinate probability; `None` means `1 / dimensions`.
    #[serde(default)]
    pub rate: Option<f64>,
}

impl BorgConfig {
    /// Validate optimizer configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epsilon.is_empty() || self.epsilon.iter().any(|&e| !(e > 0.0) || !e.is_finite()) {
            return Err(ConfigError::NonPositiveEpsilon);
        }
        if !(self.tournament_fraction > 0.0 && self.tournament_fraction <= 1.0) {
            return Err(ConfigError::InvalidTournamentFraction(self.tournament_fraction));
        }
        if !(self.gamma > 0.0 && self.gamma.is_finite()) {
            return Err(ConfigError::InvalidGamma(self.gamma));
        }
        if !(self.gamma_delta >= 0.0 && self.gamma_delta.is_finite()) {
            return Err(ConfigError::InvalidGammaDelta(self.gamma_delta));
        }
        if !(self.zeta > 0.0 && self.zeta.is_finite()) {
            return Err(ConfigError::InvalidZeta(self.zeta));
        }
        if self.min_population_size < 2 {
            return Err(ConfigError::PopulationTooSmall);
        }
        if self.restart_check_period == 0 {
            return Err(ConfigError::InvalidPeriod("restart_check_period"));
        }
        if self.operators_update_period == 0 {
            return Err(ConfigError::InvalidPeriod("operators_update_period"));
        }
        if self.operators.is_empty() {
            return Err(ConfigError::NoOperators);
        }
        for op in &self.operators {
            op.validate()?;
        }
        if self.mutation.distribution_index < 0.0 {
            return Err(ConfigError::InvalidOperator(
                "Polynomial mutation distribution index must be non-negative".into(),
            ));
        }
        for rate in [self.mutation.rate, self.restart_mutation.rate]
            .into_iter()
            .flatten()
        {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::InvalidOperator(format!(
                    "Mutation rate {} outside [0, 1]",
                    rate
                )));
            }
        }
        Ok(())
    }

    /// Epsilon widths expanded to `num_objectives` entries.
    pub fn epsilon_for(&self, num_objectives: usize) -> Result<Vec<f64>, ConfigError> {
        match self.epsilon.len() {
            1 => Ok(vec![self.epsilon[0]; num_objectives]),
            n if n == num_objectives => Ok(self.epsilon.clone()),
            n => Err(ConfigError::EpsilonLength {
                expected: num_objectives,
                got: n,
            }),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Epsilon widths must be positive and finite")]
    NonPositiveEpsilon,
    #[error("Expected {expected} epsilon widths, got {got}")]
    EpsilonLength { expected: usize, got: usize },
    #[error("Tournament fraction {0} must be in (0, 1]")]
    InvalidTournamentFraction(f64),
    #[error("Gamma {0} must be positive and finite")]
    InvalidGamma(f64),
    #[error("Gamma tolerance {0} must be non-negative and finite")]
    InvalidGammaDelta(f64),
    #[error("Zeta {0} must be positive and finite")]
    InvalidZeta(f64),
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("No variation operators specified")]
    NoOperators,
    #[error("Period {0} must be non-zero")]
    InvalidPeriod(&'static str),
    #[error("Borg requires a multi-objective problem, got {objectives} objective(s)")]
    NotMultiObjective { objectives: usize },
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),
    #[error("Invalid parameter bounds: {0}")]
    InvalidBounds(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = BorgConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.operators.len(), 6);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let config = BorgConfig {
            epsilon: vec![0.1, 0.0],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveEpsilon)
        ));

        let config = BorgConfig {
            operators: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoOperators)));

        let config = BorgConfig {
            tournament_fraction: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTournamentFraction(_))
        ));

        let config = BorgConfig {
            gamma: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGamma(_))));

        let config = BorgConfig {
            operators: vec![OperatorConfig::Simplex {
                parents: 1,
                children: 1,
                expansion: 3.0,
            }],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOperator(_))
        ));
    }

    #[test]
    fn test_rejects_non_finite_parameters() {
        for gamma in [f64::INFINITY, f64::NAN] {
            let config = BorgConfig {
                gamma,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidGamma(_))));
        }

        let config = BorgConfig {
            gamma_delta: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGammaDelta(_))
        ));

        for zeta in [f64::INFINITY, f64::NAN] {
            let config = BorgConfig {
                zeta,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidZeta(_))));
        }
    }

    #[test]
    fn test_epsilon_broadcast() {
        let config = BorgConfig::default();
        assert_eq!(config.epsilon_for(3).unwrap(), vec![0.1, 0.1, 0.1]);

        let config = BorgConfig {
            epsilon: vec![0.1, 0.2],
            ..Default::default()
        };
        assert_eq!(config.epsilon_for(2).unwrap(), vec![0.1, 0.2]);
        assert!(matches!(
            config.epsilon_for(3),
            Err(ConfigError::EpsilonLength {
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn test_serialization() {
        let config = BorgConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: BorgConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.operators, config.operators);
        assert_eq!(parsed.min_population_size, config.min_population_size);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: BorgConfig =
            serde_json::from_str(r#"{ "epsilon": [0.05], "min_population_size": 20 }"#).unwrap();
        assert_eq!(parsed.epsilon, vec![0.05]);
        assert_eq!(parsed.min_population_size, 20);
        assert_eq!(parsed.restart_check_period, 1000);
        assert_eq!(parsed.operators.len(), 6);
    }
}
