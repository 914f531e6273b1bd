use std::sync::Arc;

use rand::Rng;
use rand_pcg::Pcg32;

use crate::dna::Genome;
use crate::preprocessing::SeedStore;

use super::{MutationContext, MutationStrategy};

/// Decorator: runs the base strategy, then lets each polygon adopt the colour
/// of the tile seed under its centroid with probability `rate * adopt_probability`.
/// Alpha is kept. Polygons over no seed are skipped.
#[derive(Debug)]
pub struct SeedGuided {
    base: Arc<dyn MutationStrategy>,
    seeds: Arc<SeedStore>,
    adopt_probability: f64,
}

impl SeedGuided {
    pub fn new(base: Arc<dyn MutationStrategy>, seeds: Arc<SeedStore>, adopt_probability: f64) -> Self {
        Self { base, seeds, adopt_probability }
    }

    pub fn base(&self) -> &dyn MutationStrategy {
        self.base.as_ref()
    }
}

impl MutationStrategy for SeedGuided {
    fn name(&self) -> &'static str {
        "seed_guided"
    }

    fn mutate(&self, genome: &mut Genome, ctx: &MutationContext<'_>, rng: &mut Pcg32) {
        profiling::scope!("SeedGuided::mutate");
        self.base.mutate(genome, ctx, rng);

        let p = ctx.rate * self.adopt_probability;
        for poly in &mut genome.polygons {
            if rng.random::<f64>() >= p {
                continue;
            }
            let Some((cx, cy)) = poly.centroid() else {
                continue;
            };
            if let Some((_, seed)) = self.seeds.find_seed_by_point(cx, cy) {
                let [r, g, b] = seed.mean_color;
                poly.color = [r, g, b, poly.color[3]];
            }
        }
    }
}
