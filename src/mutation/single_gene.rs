use rand::Rng;
use rand_pcg::Pcg32;

use crate::dna::Genome;

use super::gene::mutate_one_polygon;
use super::{MutationContext, MutationStrategy};

/// with probability `rate`, one random polygon gets one lottery-picked edit
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleGene;

impl MutationStrategy for SingleGene {
    fn name(&self) -> &'static str {
        "single_gene"
    }

    fn mutate(&self, genome: &mut Genome, ctx: &MutationContext<'_>, rng: &mut Pcg32) {
        profiling::scope!("SingleGene::mutate");
        if rng.random::<f64>() >= ctx.rate || genome.is_empty() {
            return;
        }
        let (w, h) = (genome.width, genome.height);
        let idx = rng.random_range(0..genome.polygons.len());
        mutate_one_polygon(&mut genome.polygons[idx], w, h, ctx.reference, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use rand::SeedableRng;

    #[test]
    fn test_rate_zero_never_mutates() {
        let mut rng = Pcg32::seed_from_u64(9);
        let reference = Raster::filled(16, 16, &[0, 0, 0]);
        let original = Genome::random(16, 16, 5, 3, Some(&reference), &mut rng);
        let mut g = original.clone();
        let ctx = MutationContext::new(0.0, &reference);
        for _ in 0..100 {
            SingleGene.mutate(&mut g, &ctx, &mut rng);
        }
        assert_eq!(g, original);
    }

    #[test]
    fn test_changes_at_most_one_polygon() {
        let mut rng = Pcg32::seed_from_u64(10);
        let reference = Raster::filled(16, 16, &[255, 0, 0]);
        let ctx = MutationContext::new(1.0, &reference);
        for _ in 0..50 {
            let original = Genome::random(16, 16, 6, 3, None, &mut rng);
            let mut g = original.clone();
            SingleGene.mutate(&mut g, &ctx, &mut rng);
            let changed = g.polygons.iter().zip(&original.polygons).filter(|(a, b)| a != b).count();
            assert!(changed <= 1);
        }
    }

    #[test]
    fn test_empty_genome_is_noop() {
        let mut rng = Pcg32::seed_from_u64(11);
        let reference = Raster::filled(4, 4, &[0, 0, 0]);
        let mut g = Genome::new_blank(4, 4);
        SingleGene.mutate(&mut g, &MutationContext::new(1.0, &reference), &mut rng);
        assert!(g.is_empty());
    }
}
