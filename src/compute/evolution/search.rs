//! The Borg MOEA stepping algorithm.
//!
//! Each step picks a variation operator by its adaptive weight, breeds
//! offspring from tournament winners plus one archive member, repairs and
//! evaluates them (which offers them to the archive) and finally lets each
//! offspring challenge the population. Periodic checks restart the
//! population around the archive and re-weight the operators by how many
//! archive members each one produced.

use std::collections::HashMap;
use std::fmt::Write;

use rand::prelude::*;

use crate::schema::{BorgConfig, ConfigError};

use super::archive::{ArchivedMember, EpsBoxArchive};
use super::evaluator::{EvaluationError, Evaluator, Problem};
use super::fitness::{Dominance, EpsBoxScheme};
use super::operators::{RandomBound, UniformMutation, VariationOperator};
use super::population::{Candidate, Population};
use super::space::SearchSpace;

/// What happened to an offspring challenging the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Replaced the first scanned member it dominates.
    ReplacedDominated(usize),
    /// Non-dominated against the population; replaced a random member.
    ReplacedRandom(usize),
    /// A scanned member dominates it.
    Rejected,
}

/// Population acceptance counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptanceStats {
    /// Offspring that went through acceptance.
    pub offspring: u64,
    pub replaced_dominated: u64,
    pub replaced_random: u64,
    pub rejected: u64,
}

impl AcceptanceStats {
    fn record(&mut self, acceptance: Acceptance) {
        self.offspring += 1;
        match acceptance {
            Acceptance::ReplacedDominated(_) => self.replaced_dominated += 1,
            Acceptance::ReplacedRandom(_) => self.replaced_random += 1,
            Acceptance::Rejected => self.rejected += 1,
        }
    }
}

/// Summary of a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartReport {
    /// Population size before the restart.
    pub old_size: usize,
    /// Population size after the restart.
    pub new_size: usize,
    /// Archive size when the restart began.
    pub archive_size: usize,
    /// Slots filled by copying archive members.
    pub archive_copies: usize,
    /// Slots filled by mutated archive members.
    pub mutants: usize,
}

/// Any failure of a Borg run.
#[derive(Debug, thiserror::Error)]
pub enum BorgError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Laplace-smoothed operator probabilities from per-operator archive counts.
fn operator_weights(counts: &HashMap<usize, usize>, n_ops: usize, zeta: f64) -> Vec<f64> {
    let tagged: usize = (0..n_ops).map(|i| counts.get(&i).copied().unwrap_or(0)).sum();
    let denominator = tagged as f64 + n_ops as f64 * zeta;
    (0..n_ops)
        .map(|i| (counts.get(&i).copied().unwrap_or(0) as f64 + zeta) / denominator)
        .collect()
}

/// Tournament size for a population.
fn tournament_size(fraction: f64, popsize: usize) -> usize {
    ((fraction * popsize as f64).floor() as usize).max(2)
}

/// Auto-adaptive multi-objective optimizer.
pub struct BorgMoea<P: Problem> {
    config: BorgConfig,
    space: SearchSpace,
    evaluator: Evaluator<P>,
    population: Population,
    operators: Vec<VariationOperator>,
    restart_mutation: UniformMutation,
    embedding: RandomBound,
    weights: Vec<f64>,
    tournament_size: usize,
    /// Lazily shuffled scan order for population acceptance.
    pop_perm: Vec<usize>,
    rng: StdRng,
    n_steps: usize,
    last_restart_check: usize,
    last_weights_update: usize,
    n_restarts: usize,
    initialized: bool,
    stats: AcceptanceStats,
}

impl<P: Problem> BorgMoea<P> {
    /// Create an optimizer with an unevaluated Latin hypercube population.
    pub fn new(problem: P, config: BorgConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let objectives = problem.num_objectives();
        if objectives < 2 {
            return Err(ConfigError::NotMultiObjective { objectives });
        }
        let scheme = EpsBoxScheme::new(config.epsilon_for(objectives)?)?;
        let space = problem.search_space();

        let operators: Vec<VariationOperator> = config
            .operators
            .iter()
            .map(|kind| VariationOperator::new(kind.clone(), &config.mutation))
            .collect();
        // One reserved slot for the archive parent plus the largest brood.
        let scratch = 1 + operators
            .iter()
            .map(VariationOperator::num_children)
            .max()
            .unwrap_or(1);

        let seed = config.random_seed.unwrap_or_else(rand::random::<u64>);
        let mut rng = StdRng::seed_from_u64(seed);
        let population = Population::new(space.sample(config.min_population_size, &mut rng), scratch);

        let n_ops = operators.len();
        Ok(Self {
            restart_mutation: UniformMutation::new(&config.restart_mutation),
            tournament_size: tournament_size(config.tournament_fraction, population.len()),
            evaluator: Evaluator::new(problem, scheme),
            weights: vec![1.0 / n_ops as f64; n_ops],
            embedding: RandomBound,
            pop_perm: Vec::new(),
            n_steps: 0,
            last_restart_check: 0,
            last_weights_update: 0,
            n_restarts: 0,
            initialized: false,
            stats: AcceptanceStats::default(),
            config,
            space,
            population,
            operators,
            rng,
        })
    }

    /// Evaluate the initial population. Called by the first [`step`](Self::step).
    pub fn initialize(&mut self) -> Result<(), EvaluationError> {
        if self.initialized {
            return Ok(());
        }
        let n = self.population.len();
        let fitness = {
            let rows: Vec<&[f64]> = (0..n).map(|i| self.population.params(i)).collect();
            self.evaluator
                .evaluate_batch(&rows, self.config.parallel_evaluation)?
        };
        for (i, f) in fitness.into_iter().enumerate() {
            self.population.set_fitness(i, f);
        }
        self.initialized = true;
        Ok(())
    }

    /// Perform one generation step.
    pub fn step(&mut self) -> Result<(), EvaluationError> {
        self.initialize()?;
        self.n_steps += 1;

        if self.n_steps >= self.last_restart_check + self.config.restart_check_period {
            self.last_restart_check = self.n_steps;
            if self.needs_restart() {
                self.restart()?;
            }
        }

        if self.n_steps >= self.last_weights_update + self.config.operators_update_period {
            self.update_operator_weights();
        }

        let op_ix = self.select_operator();
        self.recombinate(op_ix)
    }

    /// Population/archive ratio drifted or the archive stagnated.
    fn needs_restart(&self) -> bool {
        let archive = self.evaluator.archive();
        let archive_size = archive.len() as f64;
        let popsize = self.population.len() as f64;
        let ratio_drifted = !archive.is_empty()
            && (popsize - self.config.gamma * archive_size).abs()
                >= self.config.gamma_delta * archive_size;
        ratio_drifted
            || archive.candidates_without_progress() >= self.config.max_steps_without_progress
    }

    /// Resize the population to `γ ·` archive size and refill it from the
    /// archive.
    ///
    /// Mutants are evaluated before the population is touched, so a failed
    /// evaluation leaves the previous population in place.
    pub fn restart(&mut self) -> Result<RestartReport, EvaluationError> {
        self.initialize()?;
        let archive = self.evaluator.archive();
        let archive_size = archive.len();
        let old_size = self.population.len();
        let new_size = self
            .config
            .min_population_size
            .max((self.config.gamma * archive_size as f64).ceil() as usize);

        let archive_copies = archive_size.min(new_size);
        let copies: Vec<ArchivedMember> =
            rand::seq::index::sample(&mut self.rng, archive_size, archive_copies)
                .into_iter()
                .map(|ix| archive.frontier()[ix].clone())
                .collect();

        let mut mutants = Vec::with_capacity(new_size - archive_copies);
        for _ in archive_copies..new_size {
            if archive.is_empty() {
                mutants.push(self.space.random_individual(&mut self.rng));
                continue;
            }
            let source = &archive.frontier()[self.rng.gen_range(0..archive_size)];
            let mut params = source.params.clone();
            self.restart_mutation
                .apply(&mut params, &self.space, &mut self.rng);
            let reference = &archive.frontier()[self.rng.gen_range(0..archive_size)];
            self.embedding
                .apply(&mut params, &reference.params, &self.space, &mut self.rng);
            mutants.push(params);
        }

        let fitness = {
            let rows: Vec<&[f64]> = mutants.iter().map(Vec::as_slice).collect();
            self.evaluator
                .evaluate_batch(&rows, self.config.parallel_evaluation)?
        };

        self.population.resize(new_size);
        for (slot, member) in copies.into_iter().enumerate() {
            self.population
                .set_member(slot, &member.params, Some(member.fitness), member.tag);
        }
        for (offset, (params, f)) in mutants.iter().zip(fitness).enumerate() {
            self.population
                .set_member(archive_copies + offset, params, Some(f), None);
        }
        debug_assert!(self.population.is_evaluated());

        self.tournament_size = tournament_size(self.config.tournament_fraction, new_size);
        self.evaluator.archive_mut().reset_progress();
        self.last_restart_check = self.n_steps;
        self.n_restarts += 1;

        let report = RestartReport {
            old_size,
            new_size,
            archive_size,
            archive_copies,
            mutants: new_size - archive_copies,
        };
        log::debug!(
            "restart #{}: population {} -> {}, archive {}",
            self.n_restarts,
            old_size,
            new_size,
            archive_size
        );
        Ok(report)
    }

    /// Re-weight operators by their share of archive members.
    pub fn update_operator_weights(&mut self) {
        self.last_weights_update = self.n_steps;
        let counts = self.evaluator.archive().tag_counts();
        self.weights = operator_weights(&counts, self.operators.len(), self.config.zeta);
        log::debug!("operator weights at step {}: {:?}", self.n_steps, self.weights);
    }

    /// Sample an operator index from the current weights.
    fn select_operator(&mut self) -> usize {
        let target = self.rng.r#gen::<f64>() * self.weights.iter().sum::<f64>();
        let mut cumulative = 0.0;
        for (i, weight) in self.weights.iter().enumerate() {
            cumulative += weight;
            if cumulative > target {
                return i;
            }
        }
        self.weights.len() - 1
    }

    /// Dominance tournament over distinct population members; the current
    /// winner keeps its place unless a challenger dominates it.
    fn tournament(&mut self) -> usize {
        let n = self.population.len();
        let entrants = rand::seq::index::sample(&mut self.rng, n, self.tournament_size.min(n));
        let mut entrants = entrants.into_iter();
        let mut winner = entrants.next().unwrap_or(0);
        for challenger in entrants {
            let relation = self
                .population
                .fitness(challenger)
                .dominance(self.population.fitness(winner));
            if relation == Dominance::Dominates {
                winner = challenger;
            }
        }
        winner
    }

    /// Breed, evaluate and place the offspring of one operator application.
    fn recombinate(&mut self, op_ix: usize) -> Result<(), EvaluationError> {
        let n_parents = self.operators[op_ix].num_parents();
        let n_children = self.operators[op_ix].num_children();
        let from_archive = !self.evaluator.archive().is_empty();

        let n_tournament = if from_archive { n_parents - 1 } else { n_parents };
        let mut parent_ixs: Vec<usize> = (0..n_tournament).map(|_| self.tournament()).collect();
        if from_archive {
            let archive = self.evaluator.archive();
            let member = &archive.frontier()[self.rng.gen_range(0..archive.len())];
            let slot = self.population.archive_slot();
            self.population
                .set_member(slot, &member.params, Some(member.fitness.clone()), member.tag);
            parent_ixs.push(slot);
        }

        let mut children: Vec<Candidate> = (0..n_children)
            .map(|_| self.population.acquire_candidate())
            .collect();
        {
            let parents: Vec<&[f64]> = parent_ixs
                .iter()
                .map(|&i| self.population.params(i))
                .collect();
            let mut buffers: Vec<&mut [f64]> =
                children.iter_mut().map(|c| c.params.as_mut_slice()).collect();
            self.operators[op_ix].apply(&parents, &mut buffers, &self.space, &mut self.rng);
        }

        let reference = parent_ixs[0];
        for child in &mut children {
            self.embedding.apply(
                &mut child.params,
                self.population.params(reference),
                &self.space,
                &mut self.rng,
            );
            child.tag = Some(op_ix);
        }

        if let Err(e) = self
            .evaluator
            .update_fitness_batch(&mut children, self.config.parallel_evaluation)
        {
            for child in children {
                self.population.release(child);
            }
            return Err(e);
        }

        for child in children {
            let acceptance = self.accept_offspring(child);
            self.stats.record(acceptance);
        }
        Ok(())
    }

    /// Let an evaluated offspring challenge the population.
    ///
    /// The population is scanned in random order until a member dominates
    /// the offspring (rejected) or the offspring dominates a member (that
    /// member is replaced). An offspring non-dominated by everyone replaces a
    /// random member.
    fn accept_offspring(&mut self, child: Candidate) -> Acceptance {
        let n = self.population.len();
        if self.pop_perm.len() != n {
            self.pop_perm = (0..n).collect();
        }

        for i in 0..n {
            // Incremental Fisher-Yates: fix position i only when reached.
            let j = self.rng.gen_range(i..n);
            self.pop_perm.swap(i, j);
            let slot = self.pop_perm[i];

            let relation = match &child.fitness {
                Some(fitness) => fitness.dominance(self.population.fitness(slot)),
                None => unreachable!("offspring accepted before evaluation"),
            };
            match relation {
                Dominance::Dominated => {
                    self.population.release(child);
                    return Acceptance::Rejected;
                }
                Dominance::Dominates => {
                    self.population.accept(child, slot);
                    return Acceptance::ReplacedDominated(slot);
                }
                Dominance::NonDominated | Dominance::Equal => {}
            }
        }

        let slot = self.rng.gen_range(0..n);
        self.population.accept(child, slot);
        Acceptance::ReplacedRandom(slot)
    }

    /// Steps performed.
    pub fn num_steps(&self) -> usize {
        self.n_steps
    }

    pub fn num_restarts(&self) -> usize {
        self.n_restarts
    }

    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }

    /// Current operator selection probabilities.
    pub fn operator_weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn operators(&self) -> &[VariationOperator] {
        &self.operators
    }

    pub fn archive(&self) -> &EpsBoxArchive {
        self.evaluator.archive()
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn evaluator(&self) -> &Evaluator<P> {
        &self.evaluator
    }

    pub fn config(&self) -> &BorgConfig {
        &self.config
    }

    /// Acceptance counters since construction.
    pub fn stats(&self) -> AcceptanceStats {
        self.stats
    }

    /// Best archived member by objective sum.
    pub fn best(&self) -> Option<&ArchivedMember> {
        self.evaluator.archive().best_candidate()
    }

    /// One-line summary of the optimizer state.
    pub fn trace_state(&self) -> String {
        let mut out = format!(
            "step {}: population {}, archive {}, restarts {}, evals {}, weights [",
            self.n_steps,
            self.population.len(),
            self.evaluator.archive().len(),
            self.n_restarts,
            self.evaluator.num_evals(),
        );
        for (i, (op, weight)) in self.operators.iter().zip(&self.weights).enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}={:.3}", op.name(), weight);
        }
        out.push(']');
        out
    }
}
