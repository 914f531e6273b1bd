use rand::Rng;
use rand_pcg::Pcg32;

use crate::dna::Genome;

use super::gene::{
    perturb_alpha, pick_weighted, recolor_from_reference, sample_distinct, shift_vertex,
    subset_size, GeneKind, GeneWeights, VERTEX_SHIFT,
};
use super::{MutationContext, MutationStrategy};

/// with probability `rate`, edit a random 10-25% subset of the polygons.
/// each picked polygon gets one edit drawn from `weights`.
#[derive(Clone, Copy, Debug)]
pub struct MultiGene {
    pub min_fraction: f64,
    pub max_fraction: f64,
    pub weights: GeneWeights,
}

impl Default for MultiGene {
    fn default() -> Self {
        Self { min_fraction: 0.1, max_fraction: 0.25, weights: GeneWeights::default() }
    }
}

impl MultiGene {
    pub fn with_weights(weights: GeneWeights) -> Self {
        Self { weights, ..Self::default() }
    }
}

impl MutationStrategy for MultiGene {
    fn name(&self) -> &'static str {
        "multi_gene"
    }

    fn mutate(&self, genome: &mut Genome, ctx: &MutationContext<'_>, rng: &mut Pcg32) {
        profiling::scope!("MultiGene::mutate");
        if rng.random::<f64>() >= ctx.rate || genome.is_empty() {
            return;
        }

        let table = self.weights.table();
        let n = genome.polygons.len();
        let (w, h) = (genome.width, genome.height);
        let k = subset_size(n, self.min_fraction, self.max_fraction, rng);
        for idx in sample_distinct(n, k, rng) {
            match pick_weighted(&table, rng) {
                Some(GeneKind::Vertex) => {
                    shift_vertex(&mut genome.polygons[idx], w, h, VERTEX_SHIFT, rng)
                }
                Some(GeneKind::ImageColor) => {
                    recolor_from_reference(&mut genome.polygons[idx], ctx.reference, rng)
                }
                Some(GeneKind::Alpha) => perturb_alpha(&mut genome.polygons[idx], 1.0, rng),
                Some(GeneKind::Swap) if n > 1 => {
                    let other = rng.random_range(0..n);
                    genome.polygons.swap(idx, other);
                }
                Some(GeneKind::Swap | GeneKind::RandomColor) | None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::gene::GeneWeights;
    use crate::raster::Raster;
    use rand::SeedableRng;

    #[test]
    fn test_keeps_polygon_count_and_bounds() {
        let mut rng = Pcg32::seed_from_u64(21);
        let reference = Raster::filled(20, 20, &[9, 9, 9]);
        let ctx = MutationContext::new(1.0, &reference);
        let mut g = Genome::random(20, 20, 40, 3, Some(&reference), &mut rng);
        for _ in 0..200 {
            MultiGene::default().mutate(&mut g, &ctx, &mut rng);
            assert_eq!(g.len(), 40);
            assert!(g.polygons.iter().flat_map(|p| &p.vertices).all(|&(x, y)| (0..=20).contains(&x) && (0..=20).contains(&y)));
        }
    }

    #[test]
    fn test_touches_a_bounded_subset() {
        let mut rng = Pcg32::seed_from_u64(22);
        let reference = Raster::filled(20, 20, &[9, 9, 9]);
        let ctx = MutationContext::new(1.0, &reference);
        let strategy = MultiGene::with_weights(GeneWeights { swap: 0.0, ..GeneWeights::default() });
        for _ in 0..50 {
            let original = Genome::random(20, 20, 40, 3, None, &mut rng);
            let mut g = original.clone();
            strategy.mutate(&mut g, &ctx, &mut rng);
            let changed = g.polygons.iter().zip(&original.polygons).filter(|(a, b)| a != b).count();
            // at most 25% of 40
            assert!(changed <= 10);
        }
    }

    // one polygon: no subset choice, and a swap has nothing to swap with
    fn edit_counts(weights: GeneWeights, trials: usize) -> (usize, usize, usize) {
        let mut rng = Pcg32::seed_from_u64(23);
        let reference = Raster::filled(30, 30, &[0, 0, 0]);
        let ctx = MutationContext::new(1.0, &reference);
        let strategy = MultiGene::with_weights(weights);
        let (mut vertex, mut color, mut alpha) = (0, 0, 0);
        for _ in 0..trials {
            let mut g = Genome::random(30, 30, 1, 3, None, &mut rng);
            g.polygons[0].color = [255, 255, 255, 128];
            let before = g.polygons[0].clone();
            strategy.mutate(&mut g, &ctx, &mut rng);
            let after = &g.polygons[0];
            if after.vertices != before.vertices {
                vertex += 1;
            } else if after.color[..3] != before.color[..3] {
                color += 1;
            } else if after.color[3] != before.color[3] {
                alpha += 1;
            }
        }
        (vertex, color, alpha)
    }

    #[test]
    fn test_default_lottery_frequencies() {
        let (vertex, color, alpha) = edit_counts(GeneWeights::default(), 20_000);
        // expected 12000 / 4000 / 2000, minus the odd no-op vertex or alpha draw
        assert!((11_000..12_600).contains(&vertex), "vertex {vertex}");
        assert!((3_700..4_300).contains(&color), "color {color}");
        assert!((1_500..2_300).contains(&alpha), "alpha {alpha}");
    }

    #[test]
    fn test_configured_weights_are_used() {
        let only_color = GeneWeights { vertex: 0.0, color: 1.0, alpha: 0.0, swap: 0.0 };
        let (vertex, color, alpha) = edit_counts(only_color, 500);
        assert_eq!((vertex, alpha), (0, 0));
        assert_eq!(color, 500);
    }

    #[test]
    fn test_inverted_fraction_range_does_not_panic() {
        let mut rng = Pcg32::seed_from_u64(24);
        let reference = Raster::filled(20, 20, &[9, 9, 9]);
        let ctx = MutationContext::new(1.0, &reference);
        let strategy = MultiGene { min_fraction: 0.3, max_fraction: 0.3, ..MultiGene::default() };
        let mut g = Genome::random(20, 20, 10, 3, None, &mut rng);
        strategy.mutate(&mut g, &ctx, &mut rng);
        let strategy = MultiGene { min_fraction: 0.5, max_fraction: 0.2, ..strategy };
        strategy.mutate(&mut g, &ctx, &mut rng);
        assert_eq!(g.len(), 10);
    }
}
