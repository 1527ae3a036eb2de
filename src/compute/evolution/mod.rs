//! The Borg multi-objective evolutionary algorithm.
//!
//! # Overview
//!
//! - **Fitness** (`fitness`): Pareto and epsilon-box dominance
//! - **Search space** (`space`): bounds, sampling and repair
//! - **Archive** (`archive`): epsilon-box dominance archive of the best
//!   solutions found so far
//! - **Population** (`population`): fixed-capacity arena with scratch slots
//!   for offspring
//! - **Evaluator** (`evaluator`): the [`Problem`] trait and fitness
//!   evaluation feeding the archive
//! - **Operators** (`operators`): SBX, DE, PCX, UNDX, SPX, uniform and
//!   polynomial mutation, random-bound repair
//! - **Search** (`search`): the [`BorgMoea`] stepping algorithm
//!
//! # Example
//!
//! ```rust,no_run
//! use borg_moea::compute::evolution::{BorgMoea, Zdt1};
//! use borg_moea::schema::BorgConfig;
//!
//! let config = BorgConfig {
//!     random_seed: Some(1),
//!     ..Default::default()
//! };
//! let mut borg = BorgMoea::new(Zdt1::new(30)?, config)?;
//! for _ in 0..10_000 {
//!     borg.step()?;
//! }
//! println!("{}", borg.trace_state());
//! println!("Frontier size: {}", borg.archive().len());
//! # Ok::<(), borg_moea::compute::evolution::BorgError>(())
//! ```

mod archive;
mod evaluator;
mod fitness;
mod operators;
mod population;
mod problems;
mod search;
mod space;

pub use archive::{
    ArchiveOutcome, ArchivedMember, EpsBoxArchive, FrontierExport, load_frontier,
};
pub use evaluator::{EvaluationError, Evaluator, Problem};
pub use fitness::{Dominance, EpsBoxScheme, ParetoFitness, box_dominance, pareto_dominance};
pub use operators::{PolynomialMutation, RandomBound, UniformMutation, VariationOperator};
pub use population::{Candidate, Population};
pub use problems::{Dtlz2, Schaffer1, Zdt1, build_problem};
pub use search::{Acceptance, AcceptanceStats, BorgError, BorgMoea, RestartReport};
pub use space::SearchSpace;
