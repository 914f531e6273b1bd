use rand::Rng;
use rand_pcg::Pcg32;

use crate::dna::Genome;

use super::gene::{
    perturb_alpha, pick_weighted, recolor_from_reference, sample_distinct, shift_vertex,
    subset_size, GeneKind,
};
use super::{MutationContext, MutationStrategy};

const WEIGHTS: [(GeneKind, f64); 5] = [
    (GeneKind::Vertex, 0.50),
    (GeneKind::ImageColor, 0.20),
    (GeneKind::Alpha, 0.15),
    (GeneKind::RandomColor, 0.05),
    (GeneKind::Swap, 0.10),
];

/// multi-gene mutation whose vertex and alpha step sizes shrink as
/// `(1 - generation / max_generations) ^ decay_factor`
#[derive(Clone, Copy, Debug)]
pub struct NonUniform {
    pub decay_factor: f64,
}

impl Default for NonUniform {
    fn default() -> Self {
        Self { decay_factor: 2.0 }
    }
}

impl NonUniform {
    #[inline]
    pub fn scale(&self, ctx: &MutationContext<'_>) -> f64 {
        (1.0 - ctx.progress()).powf(self.decay_factor)
    }

    /// largest vertex step at the given scale: 15 px at the start, 1 px at the end
    #[inline]
    pub fn max_shift(scale: f64) -> i32 {
        (1.0 + 14.0 * scale) as i32
    }
}

impl MutationStrategy for NonUniform {
    fn name(&self) -> &'static str {
        "non_uniform_multigen"
    }

    fn mutate(&self, genome: &mut Genome, ctx: &MutationContext<'_>, rng: &mut Pcg32) {
        profiling::scope!("NonUniform::mutate");
        if rng.random::<f64>() >= ctx.rate || genome.is_empty() {
            return;
        }

        let scale = self.scale(ctx);
        let n = genome.polygons.len();
        let (w, h) = (genome.width, genome.height);
        let k = subset_size(n, 0.1, 0.25, rng);

        for idx in sample_distinct(n, k, rng) {
            let poly = &mut genome.polygons[idx];
            match pick_weighted(&WEIGHTS, rng) {
                Some(GeneKind::Vertex) => shift_vertex(poly, w, h, Self::max_shift(scale), rng),
                Some(GeneKind::ImageColor) => recolor_from_reference(poly, ctx.reference, rng),
                Some(GeneKind::Alpha) => perturb_alpha(poly, scale, rng),
                // full RGBA here, alpha included
                Some(GeneKind::RandomColor) => poly.color = rng.random::<[u8; 4]>(),
                Some(GeneKind::Swap) if n > 1 => {
                    let other = rng.random_range(0..n);
                    genome.polygons.swap(idx, other);
                }
                Some(GeneKind::Swap) | None => {}
            }
        }
    }
}
