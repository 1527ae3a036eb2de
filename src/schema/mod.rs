//! Schema module - Configuration types for Borg MOEA runs.

mod config;
mod run;

pub use config::*;
pub use run::*;
