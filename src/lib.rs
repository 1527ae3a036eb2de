//! Borg MOEA - Auto-adaptive multi-objective evolutionary optimization.
//!
//! This crate implements the Borg multi-objective evolutionary algorithm:
//! a steady-state optimizer that keeps an epsilon-box dominance archive of
//! the best solutions found, adapts the probability of each variation
//! operator to how many archive members it produced, and restarts its
//! population around the archive when search stagnates.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Serializable configuration types and validation
//! - `compute`: The optimizer (archive, population, operators, stepping)
//!
//! # Example
//!
//! ```rust,no_run
//! use borg_moea::{
//!     compute::{BorgMoea, evolution::Schaffer1},
//!     schema::BorgConfig,
//! };
//!
//! let mut borg = BorgMoea::new(Schaffer1::new(10.0)?, BorgConfig::default())?;
//! for _ in 0..5_000 {
//!     borg.step()?;
//! }
//!
//! for member in borg.archive().frontier() {
//!     println!("{:?} -> {:?}", member.params, member.fitness.values);
//! }
//! # Ok::<(), borg_moea::compute::BorgError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{BorgError, BorgMoea, EpsBoxArchive, Problem};
pub use schema::{BorgConfig, OperatorConfig, RunConfig};
