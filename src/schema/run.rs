//! Run configuration consumed by the command-line driver.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::BorgConfig;

/// Built-in benchmark problem selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProblemConfig {
    /// Schaffer's function N.1: `(x², (x - 2)²)` on `[-bound, bound]`.
    Schaffer1 {
        #[serde(default = "default_schaffer_bound")]
        bound: f64,
    },
    /// ZDT1 with a convex front.
    Zdt1 {
        #[serde(default = "default_zdt_dimensions")]
        dimensions: usize,
    },
    /// DTLZ2 with a spherical front.
    Dtlz2 {
        #[serde(default = "default_dtlz_dimensions")]
        dimensions: usize,
        #[serde(default = "default_dtlz_objectives")]
        objectives: usize,
    },
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self::Zdt1 {
            dimensions: default_zdt_dimensions(),
        }
    }
}

fn default_schaffer_bound() -> f64 {
    10.0
}
fn default_zdt_dimensions() -> usize {
    30
}
fn default_dtlz_dimensions() -> usize {
    12
}
fn default_dtlz_objectives() -> usize {
    3
}

/// A complete optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Problem to optimize.
    #[serde(default)]
    pub problem: ProblemConfig,
    /// Optimizer settings.
    #[serde(default)]
    pub borg: BorgConfig,
    /// Number of optimizer steps to perform.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Steps between progress traces.
    #[serde(default = "default_trace_interval")]
    pub trace_interval: usize,
    /// Where to write the final frontier as JSON.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            problem: ProblemConfig::default(),
            borg: BorgConfig::default(),
            max_steps: default_max_steps(),
            trace_interval: default_trace_interval(),
            output: None,
        }
    }
}

fn default_max_steps() -> usize {
    25_000
}
fn default_trace_interval() -> usize {
    1000
}
