//! Crossover strategies: two parents in, two children out.
//!
//! Children start with empty caches. Parents with fewer than two polygons
//! produce plain clones. Unequal polygon counts are tolerated: cut points and
//! exchanged slots stay inside the shorter parent.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use rand_pcg::Pcg32;

use crate::dna::Polygon;
use crate::error::{Error, Result};
use crate::individual::Individual;

pub trait CrossoverStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn crossover(
        &self,
        parent1: &Individual,
        parent2: &Individual,
        rng: &mut Pcg32,
    ) -> (Individual, Individual);
}

/// resolve a crossover strategy by its configuration name
pub fn by_name(name: &str) -> Result<Arc<dyn CrossoverStrategy>> {
    let strategy: Arc<dyn CrossoverStrategy> = match name {
        "single_point" => Arc::new(SinglePoint),
        "two_point" => Arc::new(TwoPoint),
        "uniform" => Arc::new(UniformCrossover),
        "anular" | "annular" => Arc::new(Annular),
        "artistic" => Arc::new(Artistic),
        other => {
            return Err(Error::UnknownStrategy { role: "crossover", name: other.to_string() });
        }
    };
    Ok(strategy)
}

#[inline]
fn shared_len(p1: &Individual, p2: &Individual) -> usize {
    p1.polygons().len().min(p2.polygons().len())
}

/// splice two polygon lists: child1 = p1[..split] + p2[split..], child2 the complement
fn splice(p1: &[Polygon], p2: &[Polygon], split: usize) -> (Vec<Polygon>, Vec<Polygon>) {
    let split = split.min(p1.len()).min(p2.len());
    let c1 = p1[..split].iter().chain(&p2[split..]).cloned().collect();
    let c2 = p2[..split].iter().chain(&p1[split..]).cloned().collect();
    (c1, c2)
}

/// one cut in [1, len - 1]
#[derive(Clone, Copy, Debug, Default)]
pub struct SinglePoint;

impl SinglePoint {
    /// crossover at a caller-chosen cut. cuts at 0 or at the end reproduce the parents.
    pub fn split_at(parent1: &Individual, parent2: &Individual, index: usize) -> (Individual, Individual) {
        let (c1, c2) = splice(parent1.polygons(), parent2.polygons(), index);
        // at 0 the children swap roles, so hand them back in parent order
        if index == 0 {
            (parent1.with_polygons(c2), parent2.with_polygons(c1))
        } else {
            (parent1.with_polygons(c1), parent2.with_polygons(c2))
        }
    }
}

impl CrossoverStrategy for SinglePoint {
    fn name(&self) -> &'static str {
        "single_point"
    }

    fn crossover(&self, parent1: &Individual, parent2: &Individual, rng: &mut Pcg32) -> (Individual, Individual) {
        let n = shared_len(parent1, parent2);
        if n < 2 {
            return (parent1.clone(), parent2.clone());
        }
        let cut = rng.random_range(1..n);
        Self::split_at(parent1, parent2, cut)
    }
}

/// the middle segment [a, b) is exchanged
#[derive(Clone, Copy, Debug, Default)]
pub struct TwoPoint;

impl CrossoverStrategy for TwoPoint {
    fn name(&self) -> &'static str {
        "two_point"
    }

    fn crossover(&self, parent1: &Individual, parent2: &Individual, rng: &mut Pcg32) -> (Individual, Individual) {
        let n = shared_len(parent1, parent2);
        if n < 2 {
            return (parent1.clone(), parent2.clone());
        }
        // two distinct cuts from 1..n; with n == 2 only the tail can move
        let (a, b) = if n == 2 {
            (1, 2)
        } else {
            let picks = rand::seq::index::sample(rng, n - 1, 2);
            let (x, y) = (picks.index(0) + 1, picks.index(1) + 1);
            (x.min(y), x.max(y))
        };

        let (p1, p2) = (parent1.polygons(), parent2.polygons());
        let mut c1 = p1.to_vec();
        let mut c2 = p2.to_vec();
        c1[a..b].clone_from_slice(&p2[a..b]);
        c2[a..b].clone_from_slice(&p1[a..b]);
        (parent1.with_polygons(c1), parent2.with_polygons(c2))
    }
}

/// per-slot coin flip decides which parent feeds which child
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformCrossover;

impl CrossoverStrategy for UniformCrossover {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn crossover(&self, parent1: &Individual, parent2: &Individual, rng: &mut Pcg32) -> (Individual, Individual) {
        let n = shared_len(parent1, parent2);
        if n < 2 {
            return (parent1.clone(), parent2.clone());
        }
        let mut c1 = parent1.polygons().to_vec();
        let mut c2 = parent2.polygons().to_vec();
        for i in 0..n {
            if rng.random::<f64>() >= 0.5 {
                std::mem::swap(&mut c1[i], &mut c2[i]);
            }
        }
        (parent1.with_polygons(c1), parent2.with_polygons(c2))
    }
}

/// a contiguous run, wrapping past the end, is exchanged between the children
#[derive(Clone, Copy, Debug, Default)]
pub struct Annular;

impl CrossoverStrategy for Annular {
    fn name(&self) -> &'static str {
        "anular"
    }

    fn crossover(&self, parent1: &Individual, parent2: &Individual, rng: &mut Pcg32) -> (Individual, Individual) {
        let n = shared_len(parent1, parent2);
        if n < 2 {
            return (parent1.clone(), parent2.clone());
        }
        let start = rng.random_range(0..n);
        let length = rng.random_range(1..=(n / 2).max(1));

        let mut c1 = parent1.polygons().to_vec();
        let mut c2 = parent2.polygons().to_vec();
        for i in 0..length {
            let idx = (start + i) % n;
            std::mem::swap(&mut c1[idx], &mut c2[idx]);
        }
        (parent1.with_polygons(c1), parent2.with_polygons(c2))
    }
}

/// per slot, either blend both polygons into one shared polygon or swap them
#[derive(Clone, Copy, Debug, Default)]
pub struct Artistic;

impl Artistic {
    /// vertex-wise and channel-wise integer average; extra vertices are dropped
    pub fn blend(a: &Polygon, b: &Polygon) -> Polygon {
        let vertices = a
            .vertices
            .iter()
            .zip(&b.vertices)
            .map(|(p, q)| ((p.0 + q.0) / 2, (p.1 + q.1) / 2))
            .collect();
        let mut color = [0u8; 4];
        for (c, (x, y)) in color.iter_mut().zip(a.color.iter().zip(&b.color)) {
            *c = ((*x as u16 + *y as u16) / 2) as u8;
        }
        Polygon { vertices, color }
    }
}

impl CrossoverStrategy for Artistic {
    fn name(&self) -> &'static str {
        "artistic"
    }

    fn crossover(&self, parent1: &Individual, parent2: &Individual, rng: &mut Pcg32) -> (Individual, Individual) {
        let n = shared_len(parent1, parent2);
        if n < 2 {
            return (parent1.clone(), parent2.clone());
        }
        let (p1, p2) = (parent1.polygons(), parent2.polygons());
        let mut c1 = p1.to_vec();
        let mut c2 = p2.to_vec();
        for i in 0..n {
            if rng.random::<f64>() < 0.5 {
                let blended = Self::blend(&p1[i], &p2[i]);
                c1[i] = blended.clone();
                c2[i] = blended;
            } else {
                c1[i] = p2[i].clone();
                c2[i] = p1[i].clone();
            }
        }
        (parent1.with_polygons(c1), parent2.with_polygons(c2))
    }
}
