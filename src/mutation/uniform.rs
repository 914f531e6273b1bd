use rand::Rng;
use rand_pcg::Pcg32;

use crate::dna::Genome;

use super::gene::mutate_one_polygon;
use super::{MutationContext, MutationStrategy};

/// every polygon independently gets a one-polygon edit with probability `rate`
#[derive(Clone, Copy, Debug, Default)]
pub struct Uniform;

impl MutationStrategy for Uniform {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn mutate(&self, genome: &mut Genome, ctx: &MutationContext<'_>, rng: &mut Pcg32) {
        profiling::scope!("Uniform::mutate");
        let (w, h) = (genome.width, genome.height);
        for poly in &mut genome.polygons {
            if rng.random::<f64>() < ctx.rate {
                mutate_one_polygon(poly, w, h, ctx.reference, rng);
            }
        }
    }
}
