//! Fixed-capacity population arena.
//!
//! Slots `0..len` hold the live population. Slots `len..capacity` are scratch
//! space for offspring under construction: the first scratch slot is reserved
//! for the parent drawn from the archive, the rest form the transient pool
//! handed out by [`Population::acquire_candidate`].

use std::mem;

use super::fitness::ParetoFitness;

/// An offspring under construction.
///
/// Owns the parameter buffer of a scratch slot until it is either committed
/// with [`Population::accept`] or returned with [`Population::release`].
#[derive(Debug)]
pub struct Candidate {
    /// Scratch slot the buffer was taken from.
    pub index: usize,
    /// Parameter vector.
    pub params: Vec<f64>,
    /// Cached fitness, `None` until evaluated.
    pub fitness: Option<ParetoFitness>,
    /// Index of the operator that produced the candidate.
    pub tag: Option<usize>,
    /// Not yet committed into the population.
    pub is_new: bool,
}

/// Population storage with per-slot fitness and operator tags.
#[derive(Debug, Clone)]
pub struct Population {
    individuals: Vec<Vec<f64>>,
    fitness: Vec<Option<ParetoFitness>>,
    tags: Vec<Option<usize>>,
    dimensions: usize,
    size: usize,
    scratch: usize,
    free: Vec<usize>,
}

impl Population {
    /// Create a population from unevaluated individuals.
    ///
    /// `scratch` counts the reserved archive-parent slot, so it must be at
    /// least one more than the largest number of offspring built per step.
    pub fn new(individuals: Vec<Vec<f64>>, scratch: usize) -> Self {
        assert!(scratch >= 2, "population needs at least two scratch slots");
        let size = individuals.len();
        let dimensions = individuals.first().map_or(0, Vec::len);
        assert!(
            individuals.iter().all(|x| x.len() == dimensions),
            "individuals must share a dimension"
        );

        let mut population = Self {
            individuals,
            fitness: Vec::new(),
            tags: Vec::new(),
            dimensions,
            size,
            scratch,
            free: Vec::new(),
        };
        population.rebuild_scratch();
        population
    }

    /// Lay out scratch rows after the live range and refill the free list.
    fn rebuild_scratch(&mut self) {
        let capacity = self.size + self.scratch;
        self.individuals
            .resize(capacity, vec![0.0; self.dimensions]);
        self.fitness.resize(capacity, None);
        self.tags.resize(capacity, None);
        for ix in self.size..capacity {
            self.individuals[ix].resize(self.dimensions, 0.0);
            self.fitness[ix] = None;
            self.tags[ix] = None;
        }
        // Popped from the back, so the lowest free slot is handed out first.
        self.free = (self.size + 1..capacity).rev().collect();
    }

    /// Number of live members.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Live plus scratch slots.
    pub fn capacity(&self) -> usize {
        self.size + self.scratch
    }

    /// Transient slots currently available.
    pub fn free_scratch(&self) -> usize {
        self.free.len()
    }

    /// Slot reserved for the parent copied from the archive.
    pub fn archive_slot(&self) -> usize {
        self.size
    }

    /// Parameters of a slot.
    pub fn params(&self, ix: usize) -> &[f64] {
        &self.individuals[ix]
    }

    /// Fitness of an evaluated slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot has not been evaluated; live slots always are
    /// between steps.
    pub fn fitness(&self, ix: usize) -> &ParetoFitness {
        match &self.fitness[ix] {
            Some(fitness) => fitness,
            None => panic!("population slot {} is not evaluated", ix),
        }
    }

    /// Fitness of a slot, `None` if unevaluated.
    pub fn try_fitness(&self, ix: usize) -> Option<&ParetoFitness> {
        self.fitness[ix].as_ref()
    }

    /// Operator tag of a slot.
    pub fn tag(&self, ix: usize) -> Option<usize> {
        self.tags[ix]
    }

    /// Whether every live slot carries a fitness.
    pub fn is_evaluated(&self) -> bool {
        self.fitness[..self.size].iter().all(Option::is_some)
    }

    /// Overwrite a live slot or the archive-parent slot.
    pub fn set_member(
        &mut self,
        ix: usize,
        params: &[f64],
        fitness: Option<ParetoFitness>,
        tag: Option<usize>,
    ) {
        assert!(ix <= self.size, "slot {} is a transient slot", ix);
        debug_assert_eq!(params.len(), self.dimensions);
        self.individuals[ix].clear();
        self.individuals[ix].extend_from_slice(params);
        self.fitness[ix] = fitness;
        self.tags[ix] = tag;
    }

    /// Store the fitness of an evaluated slot.
    pub fn set_fitness(&mut self, ix: usize, fitness: ParetoFitness) {
        self.fitness[ix] = Some(fitness);
    }

    /// Take a transient candidate from the scratch pool.
    ///
    /// # Panics
    ///
    /// Panics if the pool is exhausted, meaning the population was built
    /// with fewer scratch slots than offspring per step.
    pub fn acquire_candidate(&mut self) -> Candidate {
        let index = match self.free.pop() {
            Some(index) => index,
            None => panic!("transient candidate pool exhausted"),
        };
        Candidate {
            index,
            params: mem::take(&mut self.individuals[index]),
            fitness: None,
            tag: None,
            is_new: true,
        }
    }

    /// Commit a candidate into a live slot, replacing the occupant.
    pub fn accept(&mut self, mut candidate: Candidate, slot: usize) {
        assert!(slot < self.size, "cannot accept into transient slot {}", slot);
        assert!(candidate.fitness.is_some(), "accepted candidate is not evaluated");
        candidate.is_new = false;
        let replaced = mem::replace(&mut self.individuals[slot], candidate.params);
        // The replaced buffer becomes the scratch row.
        self.individuals[candidate.index] = replaced;
        self.fitness[slot] = candidate.fitness;
        self.tags[slot] = candidate.tag;
        self.free.push(candidate.index);
    }

    /// Discard a candidate and return its buffer to the pool.
    pub fn release(&mut self, candidate: Candidate) {
        debug_assert!(candidate.index > self.size && candidate.index < self.capacity());
        self.individuals[candidate.index] = candidate.params;
        self.free.push(candidate.index);
    }

    /// Grow or shrink the live range.
    ///
    /// Surviving slots keep their contents; new slots are unevaluated and
    /// must be filled by the caller. No candidate may be in flight.
    pub fn resize(&mut self, new_size: usize) {
        assert_eq!(
            self.free.len(),
            self.scratch - 1,
            "cannot resize with candidates in flight"
        );
        self.individuals.truncate(self.size.min(new_size));
        self.fitness.truncate(self.size.min(new_size));
        self.tags.truncate(self.size.min(new_size));
        self.size = new_size;
        self.rebuild_scratch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::fitness::EpsBoxScheme;

    fn evaluated(size: usize) -> Population {
        let scheme = EpsBoxScheme::new(vec![0.1, 0.1]).unwrap();
        let individuals = (0..size).map(|i| vec![i as f64, 0.0]).collect();
        let mut population = Population::new(individuals, 3);
        for i in 0..size {
            population.set_fitness(i, scheme.make_fitness(vec![i as f64, 1.0]));
        }
        population
    }

    #[test]
    fn test_layout() {
        let population = evaluated(4);
        assert_eq!(population.len(), 4);
        assert_eq!(population.capacity(), 7);
        assert_eq!(population.archive_slot(), 4);
        assert_eq!(population.free_scratch(), 2);
        assert!(population.is_evaluated());
    }

    #[test]
    fn test_acquire_accept_release() {
        let scheme = EpsBoxScheme::new(vec![0.1, 0.1]).unwrap();
        let mut population = evaluated(4);

        let mut a = population.acquire_candidate();
        let b = population.acquire_candidate();
        assert_eq!(a.index, 5);
        assert_eq!(b.index, 6);
        assert_eq!(a.params.len(), 2);
        assert_eq!(population.free_scratch(), 0);

        a.params.copy_from_slice(&[9.0, 9.0]);
        a.fitness = Some(scheme.make_fitness(vec![0.0, 0.0]));
        a.tag = Some(3);
        population.accept(a, 1);
        assert_eq!(population.params(1), &[9.0, 9.0]);
        assert_eq!(population.tag(1), Some(3));
        assert_eq!(population.fitness(1).values, vec![0.0, 0.0]);
        // The replaced buffer now backs the scratch slot.
        assert_eq!(population.params(5), &[1.0, 0.0]);

        population.release(b);
        assert_eq!(population.free_scratch(), 2);
    }

    #[test]
    #[should_panic(expected = "exhausted")]
    fn test_exhausted_pool_panics() {
        let mut population = evaluated(2);
        let _a = population.acquire_candidate();
        let _b = population.acquire_candidate();
        let _c = population.acquire_candidate();
    }

    #[test]
    fn test_resize() {
        let mut population = evaluated(4);
        population.resize(2);
        assert_eq!(population.len(), 2);
        assert_eq!(population.capacity(), 5);
        assert_eq!(population.params(1), &[1.0, 0.0]);
        assert!(population.is_evaluated());

        population.resize(6);
        assert_eq!(population.len(), 6);
        assert!(!population.is_evaluated());
        assert!(population.try_fitness(5).is_none());
        assert_eq!(population.params(5).len(), 2);
        assert_eq!(population.free_scratch(), 2);
    }

    #[test]
    fn test_set_archive_slot() {
        let mut population = evaluated(3);
        let slot = population.archive_slot();
        population.set_member(slot, &[7.0, 7.0], None, Some(1));
        assert_eq!(population.params(slot), &[7.0, 7.0]);
        assert_eq!(population.tag(slot), Some(1));
    }
}
