//! Variation and embedding operators.
//!
//! Recombination operators follow their published real-coded forms. Every
//! recombination except uniform mutation is followed by polynomial mutation.
//! Offspring may leave the search space; [`RandomBound`] repairs them.

use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::schema::{OperatorConfig, PolynomialMutationConfig, UniformMutationConfig};

use super::space::SearchSpace;

/// Resolve an optional per-coordinate rate, defaulting to `1 / dimensions`.
fn coordinate_rate(rate: Option<f64>, dimensions: usize) -> f64 {
    rate.unwrap_or(1.0 / dimensions.max(1) as f64)
}

/// Bounded polynomial mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialMutation {
    rate: Option<f64>,
    distribution_index: f64,
}

impl PolynomialMutation {
    pub fn new(config: &PolynomialMutationConfig) -> Self {
        Self {
            rate: config.rate,
            distribution_index: config.distribution_index,
        }
    }

    pub fn apply<R: Rng + ?Sized>(&self, x: &mut [f64], space: &SearchSpace, rng: &mut R) {
        let rate = coordinate_rate(self.rate, x.len());
        let power = 1.0 / (self.distribution_index + 1.0);
        for (dim, value) in x.iter_mut().enumerate() {
            if !rng.gen_bool(rate) {
                continue;
            }
            let (lo, hi) = space.range(dim);
            let y = value.clamp(lo, hi);
            let delta1 = (y - lo) / (hi - lo);
            let delta2 = (hi - y) / (hi - lo);
            let u: f64 = rng.r#gen();
            let deltaq = if u < 0.5 {
                let xy = 1.0 - delta1;
                let val = 2.0 * u + (1.0 - 2.0 * u) * xy.powf(self.distribution_index + 1.0);
                val.powf(power) - 1.0
            } else {
                let xy = 1.0 - delta2;
                let val =
                    2.0 * (1.0 - u) + 2.0 * (u - 0.5) * xy.powf(self.distribution_index + 1.0);
                1.0 - val.powf(power)
            };
            *value = (y + deltaq * (hi - lo)).clamp(lo, hi);
        }
    }
}

/// Uniform resampling of individual coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformMutation {
    rate: Option<f64>,
}

impl UniformMutation {
    pub fn new(config: &UniformMutationConfig) -> Self {
        Self { rate: config.rate }
    }

    pub fn apply<R: Rng + ?Sized>(&self, x: &mut [f64], space: &SearchSpace, rng: &mut R) {
        let rate = coordinate_rate(self.rate, x.len());
        for (dim, value) in x.iter_mut().enumerate() {
            if rng.gen_bool(rate) {
                let (lo, hi) = space.range(dim);
                *value = rng.gen_range(lo..=hi);
            }
        }
    }
}

/// Repairs infeasible coordinates by resampling between the violated bound
/// and a reference individual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomBound;

impl RandomBound {
    pub fn apply<R: Rng + ?Sized>(
        &self,
        x: &mut [f64],
        reference: &[f64],
        space: &SearchSpace,
        rng: &mut R,
    ) {
        for (dim, (value, r)) in x.iter_mut().zip(reference).enumerate() {
            let (lo, hi) = space.range(dim);
            let r = r.clamp(lo, hi);
            if *value < lo {
                *value = lo + rng.r#gen::<f64>() * (r - lo);
            } else if *value > hi {
                *value = hi - rng.r#gen::<f64>() * (hi - r);
            } else if value.is_nan() {
                *value = r;
            }
        }
    }
}

/// A recombination operator with its follow-up mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct VariationOperator {
    kind: OperatorConfig,
    mutation: Option<PolynomialMutation>,
}

impl VariationOperator {
    /// Build an operator; uniform mutation skips the polynomial follow-up.
    pub fn new(kind: OperatorConfig, mutation: &PolynomialMutationConfig) -> Self {
        let mutation = match kind {
            OperatorConfig::UniformMutation { .. } => None,
            _ => Some(PolynomialMutation::new(mutation)),
        };
        Self { kind, mutation }
    }

    pub fn name(&self) -> &'static str {
        self.kind.label()
    }

    pub fn kind(&self) -> &OperatorConfig {
        &self.kind
    }

    /// Parents consumed per application.
    pub fn num_parents(&self) -> usize {
        match self.kind {
            OperatorConfig::SimulatedBinary { .. } => 2,
            OperatorConfig::DifferentialEvolution { .. } => 4,
            OperatorConfig::ParentCentric { parents, .. }
            | OperatorConfig::UnimodalNormal { parents, .. }
            | OperatorConfig::Simplex { parents, .. } => parents,
            OperatorConfig::UniformMutation { .. } => 1,
        }
    }

    /// Offspring produced per application.
    pub fn num_children(&self) -> usize {
        match self.kind {
            OperatorConfig::SimulatedBinary { .. } => 2,
            OperatorConfig::DifferentialEvolution { .. } => 1,
            OperatorConfig::ParentCentric { children, .. }
            | OperatorConfig::UnimodalNormal { children, .. }
            | OperatorConfig::Simplex { children, .. } => children,
            OperatorConfig::UniformMutation { .. } => 1,
        }
    }

    /// Fill `children` from `parents`.
    ///
    /// Expects exactly [`num_parents`](Self::num_parents) parents and
    /// [`num_children`](Self::num_children) child buffers of the space's
    /// dimension.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        parents: &[&[f64]],
        children: &mut [&mut [f64]],
        space: &SearchSpace,
        rng: &mut R,
    ) {
        assert_eq!(parents.len(), self.num_parents(), "{} parent count", self.name());
        assert_eq!(children.len(), self.num_children(), "{} child count", self.name());

        match self.kind {
            OperatorConfig::SimulatedBinary {
                rate,
                distribution_index,
            } => {
                let (first, second) = children.split_at_mut(1);
                simulated_binary(
                    parents[0],
                    parents[1],
                    &mut *first[0],
                    &mut *second[0],
                    rate,
                    distribution_index,
                    space,
                    rng,
                );
            }
            OperatorConfig::DifferentialEvolution {
                crossover_rate,
                step_size,
            } => differential_evolution(parents, &mut *children[0], crossover_rate, step_size, rng),
            OperatorConfig::ParentCentric { eta, zeta, .. } => {
                for child in children.iter_mut() {
                    parent_centric(parents, child, eta, zeta, rng);
                }
            }
            OperatorConfig::UnimodalNormal { zeta, eta, .. } => {
                for child in children.iter_mut() {
                    unimodal_normal(parents, child, zeta, eta, rng);
                }
            }
            OperatorConfig::Simplex { expansion, .. } => {
                for child in children.iter_mut() {
                    simplex(parents, child, expansion, rng);
                }
            }
            OperatorConfig::UniformMutation { rate } => {
                children[0].copy_from_slice(parents[0]);
                UniformMutation { rate }.apply(&mut *children[0], space, rng);
            }
        }

        if let Some(mutation) = &self.mutation {
            for child in children.iter_mut() {
                mutation.apply(child, space, rng);
            }
        }
    }
}

/// Spread factor of bounded SBX for one side of the parent pair.
fn sbx_beta_q<R: Rng + ?Sized>(beta: f64, eta: f64, rng: &mut R) -> f64 {
    let alpha = 2.0 - beta.powf(-(eta + 1.0));
    let u: f64 = rng.r#gen();
    if u <= 1.0 / alpha {
        (u * alpha).powf(1.0 / (eta + 1.0))
    } else {
        (1.0 / (2.0 - u * alpha)).powf(1.0 / (eta + 1.0))
    }
}

#[allow(clippy::too_many_arguments)]
fn simulated_binary<R: Rng + ?Sized>(
    p1: &[f64],
    p2: &[f64],
    c1: &mut [f64],
    c2: &mut [f64],
    rate: f64,
    eta: f64,
    space: &SearchSpace,
    rng: &mut R,
) {
    c1.copy_from_slice(p1);
    c2.copy_from_slice(p2);
    if !rng.gen_bool(rate) {
        return;
    }

    for dim in 0..p1.len() {
        if !rng.gen_bool(0.5) || (p1[dim] - p2[dim]).abs() <= 1e-14 {
            continue;
        }
        let (lo, hi) = space.range(dim);
        let y1 = p1[dim].min(p2[dim]).clamp(lo, hi);
        let y2 = p1[dim].max(p2[dim]).clamp(lo, hi);
        if y2 - y1 <= 1e-14 {
            continue;
        }

        let beta = 1.0 + 2.0 * (y1 - lo) / (y2 - y1);
        let betaq = sbx_beta_q(beta, eta, rng);
        let mut v1 = 0.5 * ((y1 + y2) - betaq * (y2 - y1));

        let beta = 1.0 + 2.0 * (hi - y2) / (y2 - y1);
        let betaq = sbx_beta_q(beta, eta, rng);
        let mut v2 = 0.5 * ((y1 + y2) + betaq * (y2 - y1));

        v1 = v1.clamp(lo, hi);
        v2 = v2.clamp(lo, hi);
        if rng.gen_bool(0.5) {
            std::mem::swap(&mut v1, &mut v2);
        }
        c1[dim] = v1;
        c2[dim] = v2;
    }
}

/// DE/rand/1/bin: `parents[1] + F (parents[2] - parents[3])` crossed with
/// `parents[0]`.
fn differential_evolution<R: Rng + ?Sized>(
    parents: &[&[f64]],
    child: &mut [f64],
    crossover_rate: f64,
    step_size: f64,
    rng: &mut R,
) {
    let n = child.len();
    let forced = rng.gen_range(0..n);
    for dim in 0..n {
        child[dim] = if dim == forced || rng.gen_bool(crossover_rate) {
            parents[1][dim] + step_size * (parents[2][dim] - parents[3][dim])
        } else {
            parents[0][dim]
        };
    }
}

fn centroid(points: &[&[f64]]) -> Vec<f64> {
    let n = points[0].len();
    let mut g = vec![0.0; n];
    for p in points {
        for (gi, pi) in g.iter_mut().zip(p.iter()) {
            *gi += pi;
        }
    }
    for gi in &mut g {
        *gi /= points.len() as f64;
    }
    g
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Remove the components of `v` along an orthonormal `basis`.
fn orthogonalize(v: &mut [f64], basis: &[Vec<f64>]) {
    for e in basis {
        let proj = dot(v, e);
        for (vi, ei) in v.iter_mut().zip(e) {
            *vi -= proj * ei;
        }
    }
}

/// Orthogonalize `v` and append it to `basis` if anything is left.
/// Returns the norm of the residual.
fn extend_basis(mut v: Vec<f64>, basis: &mut Vec<Vec<f64>>) -> f64 {
    orthogonalize(&mut v, basis);
    let length = norm(&v);
    if length > 1e-12 {
        for vi in &mut v {
            *vi /= length;
        }
        basis.push(v);
    }
    length
}

fn difference(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Parent-centric crossover around the last parent.
fn parent_centric<R: Rng + ?Sized>(
    parents: &[&[f64]],
    child: &mut [f64],
    eta: f64,
    zeta: f64,
    rng: &mut R,
) {
    let k = parents.len();
    let g = centroid(parents);
    // The last parent is the archive member when one was drawn.
    let index = k - 1;
    let xp = parents[index];
    let d = difference(xp, &g);
    let d_norm = norm(&d);

    let mut basis = Vec::with_capacity(k);
    if d_norm > 1e-12 {
        basis.push(d.iter().map(|v| v / d_norm).collect::<Vec<_>>());
    }
    let primary = basis.len();

    let mut mean_distance = 0.0;
    for (i, parent) in parents.iter().enumerate() {
        if i == index {
            continue;
        }
        let v = difference(parent, &g);
        let mut perpendicular = v.clone();
        orthogonalize(&mut perpendicular, &basis[..primary]);
        mean_distance += norm(&perpendicular);
        extend_basis(v, &mut basis);
    }
    mean_distance /= (k - 1) as f64;

    child.copy_from_slice(xp);
    let w: f64 = rng.sample::<f64, _>(StandardNormal) * eta;
    for (ci, di) in child.iter_mut().zip(&d) {
        *ci += w * di;
    }
    for e in &basis[primary..] {
        let w: f64 = rng.sample::<f64, _>(StandardNormal) * zeta * mean_distance;
        for (ci, ei) in child.iter_mut().zip(e) {
            *ci += w * ei;
        }
    }
}

/// Unimodal normal distribution crossover; the last parent sets the spread
/// across the complement of the space spanned by the others.
fn unimodal_normal<R: Rng + ?Sized>(
    parents: &[&[f64]],
    child: &mut [f64],
    zeta: f64,
    eta: f64,
    rng: &mut R,
) {
    let k = parents.len();
    let n = child.len();
    let primary = &parents[..k - 1];
    let g = centroid(primary);

    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(n);
    let directions: Vec<Vec<f64>> = primary.iter().map(|p| difference(p, &g)).collect();
    for d in &directions {
        extend_basis(d.clone(), &mut basis);
    }

    let mut residual = difference(parents[k - 1], &g);
    orthogonalize(&mut residual, &basis);
    let distance = norm(&residual);

    // Complete the basis with random directions.
    let spanned = basis.len();
    let mut attempts = 0;
    while basis.len() < n && attempts < 4 * n {
        let v: Vec<f64> = (0..n).map(|_| rng.sample(StandardNormal)).collect();
        extend_basis(v, &mut basis);
        attempts += 1;
    }

    child.copy_from_slice(&g);
    for d in &directions {
        let w: f64 = rng.sample::<f64, _>(StandardNormal) * zeta;
        for (ci, di) in child.iter_mut().zip(d) {
            *ci += w * di;
        }
    }
    let sigma = eta / (n as f64).sqrt();
    for e in &basis[spanned..] {
        let w: f64 = rng.sample::<f64, _>(StandardNormal) * sigma * distance;
        for (ci, ei) in child.iter_mut().zip(e) {
            *ci += w * ei;
        }
    }
}

/// Simplex crossover inside the parents' simplex scaled by `expansion`.
fn simplex<R: Rng + ?Sized>(parents: &[&[f64]], child: &mut [f64], expansion: f64, rng: &mut R) {
    let k = parents.len();
    let g = centroid(parents);
    let expanded: Vec<Vec<f64>> = parents
        .iter()
        .map(|p| {
            p.iter()
                .zip(&g)
                .map(|(pi, gi)| gi + expansion * (pi - gi))
                .collect()
        })
        .collect();

    let mut c = vec![0.0; child.len()];
    for i in 1..k {
        let r = rng.r#gen::<f64>().powf(1.0 / i as f64);
        for (dim, ci) in c.iter_mut().enumerate() {
            *ci = r * (expanded[i - 1][dim] - expanded[i][dim] + *ci);
        }
    }
    for (dim, value) in child.iter_mut().enumerate() {
        *value = expanded[k - 1][dim] + c[dim];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BorgConfig;

    fn space() -> SearchSpace {
        SearchSpace::uniform(5, (0.0, 1.0)).unwrap()
    }

    fn run(kind: OperatorConfig, parents: &[Vec<f64>], seed: u64) -> Vec<Vec<f64>> {
        let op = VariationOperator::new(kind, &PolynomialMutationConfig::default());
        let mut rng = StdRng::seed_from_u64(seed);
        let parents: Vec<&[f64]> = parents.iter().map(Vec::as_slice).collect();
        let mut buffers = vec![vec![0.0; 5]; op.num_children()];
        let mut children: Vec<&mut [f64]> = buffers.iter_mut().map(Vec::as_mut_slice).collect();
        op.apply(&parents, &mut children, &space(), &mut rng);
        buffers
    }

    fn random_parents(count: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        space().sample(count, &mut rng)
    }

    #[test]
    fn test_arities() {
        let config = BorgConfig::default();
        let arities: Vec<(usize, usize)> = config
            .operators
            .iter()
            .map(|k| {
                let op = VariationOperator::new(k.clone(), &config.mutation);
                (op.num_parents(), op.num_children())
            })
            .collect();
        assert_eq!(arities, vec![(2, 2), (4, 1), (10, 2), (10, 2), (10, 2), (1, 1)]);
    }

    #[test]
    fn test_all_operators_produce_finite_children() {
        for (seed, kind) in BorgConfig::default().operators.into_iter().enumerate() {
            let op = VariationOperator::new(kind.clone(), &PolynomialMutationConfig::default());
            let parents = random_parents(op.num_parents(), seed as u64);
            let children = run(kind, &parents, 42 + seed as u64);
            assert_eq!(children.len(), op.num_children());
            for child in children {
                assert!(child.iter().all(|v| v.is_finite()), "{}: {:?}", op.name(), child);
            }
        }
    }

    #[test]
    fn test_sbx_stays_in_bounds() {
        let kind = OperatorConfig::SimulatedBinary {
            rate: 1.0,
            distribution_index: 15.0,
        };
        for seed in 0..50 {
            let parents = random_parents(2, seed);
            for child in run(kind.clone(), &parents, seed) {
                assert!(space().contains(&child));
            }
        }
    }

    #[test]
    fn test_identical_parents_collapse() {
        let parents = vec![vec![0.5; 5]; 3];
        let kind = OperatorConfig::Simplex {
            parents: 3,
            children: 1,
            expansion: 3.0,
        };
        let op = VariationOperator {
            kind,
            mutation: None,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let refs: Vec<&[f64]> = parents.iter().map(Vec::as_slice).collect();
        let mut child = vec![0.0; 5];
        op.apply(&refs, &mut [child.as_mut_slice()], &space(), &mut rng);
        for v in child {
            assert!((v - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_differential_evolution_forced_coordinate() {
        let parents = vec![
            vec![0.0; 5],
            vec![0.5; 5],
            vec![0.75; 5],
            vec![0.25; 5],
        ];
        let op = VariationOperator {
            kind: OperatorConfig::DifferentialEvolution {
                crossover_rate: 0.0,
                step_size: 0.5,
            },
            mutation: None,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let refs: Vec<&[f64]> = parents.iter().map(Vec::as_slice).collect();
        let mut child = vec![0.0; 5];
        op.apply(&refs, &mut [child.as_mut_slice()], &space(), &mut rng);
        let mutated: Vec<f64> = child.iter().copied().filter(|v| *v != 0.0).collect();
        assert_eq!(mutated, vec![0.75]);
    }

    #[test]
    fn test_random_bound_repairs_towards_reference() {
        let space = space();
        let mut rng = StdRng::seed_from_u64(9);
        let reference = vec![0.5; 5];
        for _ in 0..20 {
            let mut x = vec![-1.0, 2.0, 0.3, -0.1, 1.1];
            RandomBound.apply(&mut x, &reference, &space, &mut rng);
            assert!(space.contains(&x));
            assert!(x[0] <= 0.5 && x[3] <= 0.5);
            assert!(x[1] >= 0.5 && x[4] >= 0.5);
            assert_eq!(x[2], 0.3);
        }
    }

    #[test]
    fn test_uniform_mutation_rate() {
        let space = space();
        let mut rng = StdRng::seed_from_u64(5);
        let mut x = vec![0.5; 5];
        UniformMutation { rate: Some(0.0) }.apply(&mut x, &space, &mut rng);
        assert_eq!(x, vec![0.5; 5]);
        UniformMutation { rate: Some(1.0) }.apply(&mut x, &space, &mut rng);
        assert!(x.iter().all(|v| *v != 0.5));
    }

    #[test]
    fn test_polynomial_mutation_in_bounds() {
        let space = space();
        let mut rng = StdRng::seed_from_u64(11);
        let pm = PolynomialMutation {
            rate: Some(1.0),
            distribution_index: 20.0,
        };
        for _ in 0..100 {
            let mut x = vec![0.0, 1.0, 0.5, 0.999, 0.001];
            pm.apply(&mut x, &space, &mut rng);
            assert!(space.contains(&x));
        }
    }
}
