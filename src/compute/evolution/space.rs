//! Box-bounded continuous search space.

use rand::prelude::*;

use crate::schema::ConfigError;

/// Axis-aligned box of feasible parameter vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    bounds: Vec<(f64, f64)>,
}

impl SearchSpace {
    /// Create a space from per-dimension `(min, max)` bounds.
    pub fn new(bounds: Vec<(f64, f64)>) -> Result<Self, ConfigError> {
        if bounds.is_empty() {
            return Err(ConfigError::InvalidBounds(
                "search space has no dimensions".into(),
            ));
        }
        for (i, &(lo, hi)) in bounds.iter().enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(ConfigError::InvalidBounds(format!(
                    "dimension {} min ({}) must be below max ({})",
                    i, lo, hi
                )));
            }
        }
        Ok(Self { bounds })
    }

    /// Same bounds repeated over `dimensions` coordinates.
    pub fn uniform(dimensions: usize, range: (f64, f64)) -> Result<Self, ConfigError> {
        Self::new(vec![range; dimensions])
    }

    pub fn dimensions(&self) -> usize {
        self.bounds.len()
    }

    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    /// Bounds of a single dimension.
    pub fn range(&self, dim: usize) -> (f64, f64) {
        self.bounds[dim]
    }

    /// Width of a single dimension.
    pub fn delta(&self, dim: usize) -> f64 {
        let (lo, hi) = self.bounds[dim];
        hi - lo
    }

    /// Check whether every coordinate lies within bounds.
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.bounds.len()
            && x
                .iter()
                .zip(&self.bounds)
                .all(|(v, &(lo, hi))| *v >= lo && *v <= hi)
    }

    /// Clamp every coordinate into bounds.
    pub fn feasible_projection(&self, x: &mut [f64]) {
        for (v, &(lo, hi)) in x.iter_mut().zip(&self.bounds) {
            *v = v.clamp(lo, hi);
        }
    }

    /// Sample a single point uniformly.
    pub fn random_individual<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.bounds
            .iter()
            .map(|&(lo, hi)| rng.gen_range(lo..=hi))
            .collect()
    }

    /// Latin hypercube sample of `count` points.
    ///
    /// Every dimension is split into `count` equal strata and each stratum
    /// holds exactly one point.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Vec<f64>> {
        let mut points = vec![vec![0.0; self.dimensions()]; count];
        if count == 0 {
            return points;
        }
        let mut strata: Vec<usize> = (0..count).collect();
        for (dim, &(lo, hi)) in self.bounds.iter().enumerate() {
            strata.shuffle(rng);
            let width = (hi - lo) / count as f64;
            for (point, &stratum) in points.iter_mut().zip(&strata) {
                let offset: f64 = rng.r#gen();
                point[dim] = (lo + (stratum as f64 + offset) * width).min(hi);
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_bounds() {
        assert!(SearchSpace::new(Vec::new()).is_err());
        assert!(SearchSpace::new(vec![(1.0, 1.0)]).is_err());
        assert!(SearchSpace::new(vec![(0.0, f64::INFINITY)]).is_err());
    }

    #[test]
    fn test_projection() {
        let space = SearchSpace::new(vec![(0.0, 1.0), (-2.0, 2.0)]).unwrap();
        let mut x = vec![1.5, -3.0];
        space.feasible_projection(&mut x);
        assert_eq!(x, vec![1.0, -2.0]);
        assert!(space.contains(&x));
    }

    #[test]
    fn test_latin_hypercube_strata() {
        let space = SearchSpace::uniform(3, (0.0, 10.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let points = space.sample(10, &mut rng);
        assert_eq!(points.len(), 10);

        for dim in 0..3 {
            let mut strata: Vec<usize> = points.iter().map(|p| p[dim] as usize).collect();
            strata.sort_unstable();
            assert_eq!(strata, (0..10).collect::<Vec<_>>());
        }
        assert!(points.iter().all(|p| space.contains(p)));
    }
}
