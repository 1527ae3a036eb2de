//! Epsilon-box dominance archive.
//!
//! The archive holds the best known epsilon-approximate Pareto set. Objective
//! space is gridded into boxes of width ϵ; at most one member occupies a box
//! and no member's box dominates another's. Occupied boxes are indexed so the
//! common case (a challenger landing in an occupied box) is resolved against
//! the incumbent alone; only a challenger for a fresh box needs a sweep of the
//! whole archive.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::fitness::{Dominance, EpsBoxScheme, ParetoFitness};

/// Result of an archive insertion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The candidate took a previously unoccupied box.
    Added,
    /// The candidate displaced the incumbent of its box.
    Replaced,
    /// The candidate was dominated or lost the tie-break.
    Rejected,
}

impl ArchiveOutcome {
    /// Whether the archive changed.
    pub fn is_progress(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// An archived solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedMember {
    /// Parameter vector.
    pub params: Vec<f64>,
    /// Fitness including the epsilon box.
    pub fitness: ParetoFitness,
    /// Index of the variation operator that produced the member.
    pub tag: Option<usize>,
    /// Value of the archive's candidate counter at insertion.
    pub inserted_at: u64,
}

/// Bounded-resolution non-dominated archive.
#[derive(Debug, Clone)]
pub struct EpsBoxArchive {
    scheme: EpsBoxScheme,
    members: Vec<ArchivedMember>,
    /// Box index to position in `members`.
    boxes: HashMap<Vec<i64>, usize>,
    num_candidates: u64,
    candidates_without_progress: usize,
}

impl EpsBoxArchive {
    /// Create an empty archive.
    pub fn new(scheme: EpsBoxScheme) -> Self {
        Self {
            scheme,
            members: Vec::new(),
            boxes: HashMap::new(),
            num_candidates: 0,
            candidates_without_progress: 0,
        }
    }

    pub fn scheme(&self) -> &EpsBoxScheme {
        &self.scheme
    }

    /// Number of archived members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Alias of [`len`](Self::len).
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Total insertion attempts.
    pub fn num_candidates(&self) -> u64 {
        self.num_candidates
    }

    /// Consecutive rejected insertions.
    pub fn candidates_without_progress(&self) -> usize {
        self.candidates_without_progress
    }

    /// Clear the stagnation counter after a restart.
    pub fn reset_progress(&mut self) {
        self.candidates_without_progress = 0;
    }

    /// Member at `ix` in insertion-independent storage order.
    pub fn get(&self, ix: usize) -> Option<&ArchivedMember> {
        self.members.get(ix)
    }

    /// Whether a member occupies the given box.
    pub fn contains_box(&self, index: &[i64]) -> bool {
        self.boxes.contains_key(index)
    }

    /// All archived members.
    pub fn frontier(&self) -> &[ArchivedMember] {
        &self.members
    }

    /// Try to add a solution to the archive.
    pub fn insert(
        &mut self,
        params: &[f64],
        fitness: &ParetoFitness,
        tag: Option<usize>,
    ) -> ArchiveOutcome {
        self.num_candidates += 1;

        let outcome = match self.boxes.get(&fitness.index).copied() {
            Some(slot) => self.challenge_incumbent(slot, params, fitness, tag),
            None => self.claim_box(params, fitness, tag),
        };

        if outcome.is_progress() {
            self.candidates_without_progress = 0;
        } else {
            self.candidates_without_progress += 1;
        }
        log::trace!(
            "archive insert {:?} -> {:?} (size {})",
            fitness.index,
            outcome,
            self.members.len()
        );
        outcome
    }

    /// Resolve a candidate landing in an occupied box.
    fn challenge_incumbent(
        &mut self,
        slot: usize,
        params: &[f64],
        fitness: &ParetoFitness,
        tag: Option<usize>,
    ) -> ArchiveOutcome {
        let incumbent = &self.members[slot];
        debug_assert_eq!(incumbent.fitness.index, fitness.index);

        let wins = match fitness.dominance(&incumbent.fitness) {
            Dominance::Dominates => true,
            Dominance::Dominated | Dominance::Equal => false,
            // Exact ties keep the incumbent.
            Dominance::NonDominated => fitness.distance < incumbent.fitness.distance,
        };
        if !wins {
            return ArchiveOutcome::Rejected;
        }

        self.members[slot] = ArchivedMember {
            params: params.to_vec(),
            fitness: fitness.clone(),
            tag,
            inserted_at: self.num_candidates,
        };
        ArchiveOutcome::Replaced
    }

    /// Resolve a candidate for an unoccupied box.
    fn claim_box(
        &mut self,
        params: &[f64],
        fitness: &ParetoFitness,
        tag: Option<usize>,
    ) -> ArchiveOutcome {
        let mut dominated = Vec::new();
        for (ix, member) in self.members.iter().enumerate() {
            match fitness.box_dominance(&member.fitness) {
                Dominance::Dominated => return ArchiveOutcome::Rejected,
                Dominance::Dominates => dominated.push(ix),
                Dominance::NonDominated => {}
                Dominance::Equal => unreachable!("box {:?} is not indexed", member.fitness.index),
            }
        }

        // Remove from the back so earlier positions stay valid.
        for &ix in dominated.iter().rev() {
            self.remove_member(ix);
        }

        self.boxes
            .insert(fitness.index.clone(), self.members.len());
        self.members.push(ArchivedMember {
            params: params.to_vec(),
            fitness: fitness.clone(),
            tag,
            inserted_at: self.num_candidates,
        });
        ArchiveOutcome::Added
    }

    /// Swap-remove a member and keep the box index consistent.
    fn remove_member(&mut self, ix: usize) {
        let removed = self.members.swap_remove(ix);
        let was_indexed = self.boxes.remove(&removed.fitness.index);
        assert_eq!(was_indexed, Some(ix), "archive box index out of sync");
        if let Some(moved) = self.members.get(ix) {
            self.boxes.insert(moved.fitness.index.clone(), ix);
        }
    }

    /// Number of archived members per producing operator.
    pub fn tag_counts(&self) -> HashMap<usize, usize> {
        let mut counts = HashMap::new();
        for tag in self.members.iter().filter_map(|m| m.tag) {
            *counts.entry(tag).or_insert(0) += 1;
        }
        counts
    }

    /// Member with the lowest objective sum; ties broken lexicographically.
    pub fn best_candidate(&self) -> Option<&ArchivedMember> {
        self.members.iter().min_by(|a, b| {
            a.fitness
                .aggregate()
                .total_cmp(&b.fitness.aggregate())
                .then_with(|| {
                    a.fitness
                        .values
                        .iter()
                        .zip(&b.fitness.values)
                        .map(|(x, y)| x.total_cmp(y))
                        .find(|o| o.is_ne())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        })
    }

    /// Fitness of [`best_candidate`](Self::best_candidate).
    pub fn best_fitness(&self) -> Option<&ParetoFitness> {
        self.best_candidate().map(|m| &m.fitness)
    }

    /// Serializable snapshot of the frontier.
    pub fn export(&self) -> FrontierExport {
        FrontierExport {
            epsilon: self.scheme.epsilon().to_vec(),
            num_candidates: self.num_candidates,
            members: self.members.clone(),
        }
    }

    /// Write the frontier as pretty-printed JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(&self.export())?;
        fs::write(path, json)
    }
}

/// Exported frontier format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierExport {
    /// Epsilon widths the frontier was built with.
    pub epsilon: Vec<f64>,
    /// Insertion attempts over the run.
    pub num_candidates: u64,
    /// Archived members.
    pub members: Vec<ArchivedMember>,
}

/// Load a frontier export from file.
pub fn load_frontier<P: AsRef<Path>>(path: P) -> io::Result<FrontierExport> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::fitness::pareto_dominance;
    use proptest::prelude::*;

    fn archive(eps: f64) -> EpsBoxArchive {
        EpsBoxArchive::new(EpsBoxScheme::new(vec![eps, eps]).unwrap())
    }

    fn insert(archive: &mut EpsBoxArchive, values: [f64; 2]) -> ArchiveOutcome {
        let fitness = archive.scheme().make_fitness(values.to_vec());
        archive.insert(&values, &fitness, None)
    }

    #[test]
    fn test_add_to_empty_box() {
        let mut archive = archive(0.1);
        assert_eq!(insert(&mut archive, [1.0, 2.0]), ArchiveOutcome::Added);
        assert_eq!(archive.len(), 1);
        assert!(archive.contains_box(&[10, 20]));
    }

    #[test]
    fn test_same_box_tie_break() {
        let mut archive = archive(0.1);
        insert(&mut archive, [1.0, 2.0]);

        // Dominated by the corner incumbent.
        assert_eq!(insert(&mut archive, [1.05, 2.05]), ArchiveOutcome::Rejected);
        assert_eq!(archive.candidates_without_progress(), 1);

        let mut archive = self::archive(0.1);
        insert(&mut archive, [1.05, 2.05]);
        assert_eq!(insert(&mut archive, [1.01, 2.01]), ArchiveOutcome::Replaced);
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.frontier()[0].fitness.values, vec![1.01, 2.01]);

        // Mutually non-dominated inside the box: closer to the corner wins.
        assert_eq!(insert(&mut archive, [1.0, 2.08]), ArchiveOutcome::Rejected);
        assert_eq!(insert(&mut archive, [1.0, 2.011]), ArchiveOutcome::Replaced);
        assert_eq!(archive.candidates_without_progress(), 0);
    }

    #[test]
    fn test_exact_tie_keeps_incumbent() {
        let mut archive = archive(0.5);
        insert(&mut archive, [1.25, 1.375]);
        assert_eq!(insert(&mut archive, [1.25, 1.375]), ArchiveOutcome::Rejected);
        // Same box, mutually non-dominated, identical distance.
        assert_eq!(insert(&mut archive, [1.375, 1.25]), ArchiveOutcome::Rejected);
        assert_eq!(archive.frontier()[0].fitness.values, vec![1.25, 1.375]);
    }

    #[test]
    fn test_box_dominated_rejected() {
        let mut archive = archive(0.1);
        insert(&mut archive, [1.0, 1.0]);
        assert_eq!(insert(&mut archive, [1.5, 1.5]), ArchiveOutcome::Rejected);
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_new_box_evicts_dominated_members() {
        let mut archive = archive(0.5);
        insert(&mut archive, [1.0, 3.0]);
        insert(&mut archive, [2.0, 2.0]);
        insert(&mut archive, [3.0, 1.0]);
        assert_eq!(archive.len(), 3);

        assert_eq!(insert(&mut archive, [0.5, 1.5]), ArchiveOutcome::Added);
        assert_eq!(archive.len(), 2);
        assert!(archive.contains_box(&[1, 3]));
        assert!(archive.contains_box(&[6, 2]));
        assert!(!archive.contains_box(&[2, 6]));
        assert!(!archive.contains_box(&[4, 4]));
    }

    #[test]
    fn test_progress_counter() {
        let mut archive = archive(0.1);
        insert(&mut archive, [1.0, 1.0]);
        for i in 1..=5 {
            insert(&mut archive, [2.0, 2.0]);
            assert_eq!(archive.candidates_without_progress(), i);
        }
        insert(&mut archive, [0.0, 5.0]);
        assert_eq!(archive.candidates_without_progress(), 0);
        assert_eq!(archive.num_candidates(), 7);

        insert(&mut archive, [9.0, 9.0]);
        archive.reset_progress();
        assert_eq!(archive.candidates_without_progress(), 0);
    }

    #[test]
    fn test_tag_counts() {
        let mut archive = archive(0.1);
        let scheme = archive.scheme().clone();
        archive.insert(&[0.0], &scheme.make_fitness(vec![1.0, 3.0]), Some(0));
        archive.insert(&[0.0], &scheme.make_fitness(vec![2.0, 2.0]), Some(2));
        archive.insert(&[0.0], &scheme.make_fitness(vec![3.0, 1.0]), Some(2));
        archive.insert(&[0.0], &scheme.make_fitness(vec![0.0, 4.0]), None);

        let counts = archive.tag_counts();
        assert_eq!(counts.get(&0), Some(&1));
        assert_eq!(counts.get(&2), Some(&2));
        assert_eq!(counts.get(&1), None);
    }

    #[test]
    fn test_best_candidate() {
        let mut archive = archive(0.1);
        assert!(archive.best_candidate().is_none());
        assert!(archive.best_fitness().is_none());

        insert(&mut archive, [1.0, 3.0]);
        insert(&mut archive, [2.5, 1.0]);
        insert(&mut archive, [3.0, 0.5]);
        assert_eq!(archive.best_fitness().unwrap().values, vec![2.5, 1.0]);
    }

    #[test]
    fn test_export_roundtrip() {
        let mut archive = archive(0.1);
        insert(&mut archive, [1.0, 3.0]);
        insert(&mut archive, [3.0, 1.0]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frontier.json");
        archive.save_json(&path).unwrap();

        let loaded = load_frontier(&path).unwrap();
        assert_eq!(loaded.members.len(), 2);
        assert_eq!(loaded.epsilon, vec![0.1, 0.1]);
        assert_eq!(loaded.num_candidates, 2);
    }

    proptest! {
        #[test]
        fn prop_archive_invariants(
            points in prop::collection::vec((0.0f64..5.0, 0.0f64..5.0), 1..200)
        ) {
            let mut archive = archive(0.25);
            for (a, b) in points {
                let before = archive.len();
                let stagnation = archive.candidates_without_progress();
                let outcome = insert(&mut archive, [a, b]);
                match outcome {
                    ArchiveOutcome::Rejected => {
                        prop_assert_eq!(archive.len(), before);
                        prop_assert_eq!(archive.candidates_without_progress(), stagnation + 1);
                    }
                    _ => {
                        prop_assert_eq!(archive.candidates_without_progress(), 0);
                    }
                }
            }

            let members = archive.frontier();
            let mut seen = std::collections::HashSet::new();
            for (i, a) in members.iter().enumerate() {
                prop_assert!(seen.insert(a.fitness.index.clone()));
                prop_assert!(archive.contains_box(&a.fitness.index));
                for b in &members[i + 1..] {
                    let relation = pareto_dominance(&a.fitness.values, &b.fitness.values);
                    prop_assert!(
                        !matches!(relation, Dominance::Dominates | Dominance::Dominated)
                    );
                }
            }
        }
    }
}
