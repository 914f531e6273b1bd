use rand::Rng;
use rand_pcg::Pcg32;

use crate::dna::{Genome, Polygon};

use super::gene::sample_distinct;
use super::{MutationContext, MutationStrategy};

const RESPAWN_PROBABILITY: f64 = 0.2;
const VERTEX_JITTER: i32 = 30;
const COLOR_JITTER: i32 = 64;

/// catastrophic mutation for escaping stagnation. every call respawns or
/// shakes hard 50-80% of the polygons; the mutation rate is not consulted.
#[derive(Clone, Copy, Debug, Default)]
pub struct Doomsday;

impl MutationStrategy for Doomsday {
    fn name(&self) -> &'static str {
        "doomsday"
    }

    fn mutate(&self, genome: &mut Genome, ctx: &MutationContext<'_>, rng: &mut Pcg32) {
        profiling::scope!("Doomsday::mutate");
        if genome.is_empty() {
            return;
        }

        let n = genome.polygons.len();
        let (w, h) = (genome.width, genome.height);
        let k = (n as f64 * rng.random_range(0.5..0.8)) as usize;

        for idx in sample_distinct(n, k, rng) {
            let poly = &mut genome.polygons[idx];
            if rng.random::<f64>() < RESPAWN_PROBABILITY {
                *poly = Polygon::random(w, h, poly.vertices.len(), Some(ctx.reference), rng);
                continue;
            }

            for v in &mut poly.vertices {
                let dx = rng.random_range(-VERTEX_JITTER..=VERTEX_JITTER);
                let dy = rng.random_range(-VERTEX_JITTER..=VERTEX_JITTER);
                *v = ((v.0 + dx).clamp(0, w as i32), (v.1 + dy).clamp(0, h as i32));
            }
            for c in &mut poly.color {
                let d = rng.random_range(-COLOR_JITTER..=COLOR_JITTER);
                *c = (*c as i32 + d).clamp(0, 255) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use rand::SeedableRng;

    #[test]
    fn test_rewrites_a_large_share() {
        let mut rng = Pcg32::seed_from_u64(51);
        let reference = Raster::filled(40, 40, &[128, 128, 128]);
        let ctx = MutationContext::new(1.0, &reference);
        let original = Genome::random(40, 40, 50, 3, None, &mut rng);
        let mut g = original.clone();
        Doomsday.mutate(&mut g, &ctx, &mut rng);

        assert_eq!(g.len(), 50);
        let changed = g.polygons.iter().zip(&original.polygons).filter(|(a, b)| a != b).count();
        assert!(changed >= 20, "only {changed} polygons changed");
        assert!(changed <= 40);
        assert!(g.polygons.iter().all(|p| p.vertices.len() == 3));
    }

    #[test]
    fn test_ignores_mutation_rate() {
        let mut rng = Pcg32::seed_from_u64(52);
        let reference = Raster::filled(40, 40, &[128, 128, 128]);
        let ctx = MutationContext::new(0.0, &reference);
        for _ in 0..20 {
            let original = Genome::random(40, 40, 50, 3, None, &mut rng);
            let mut g = original.clone();
            Doomsday.mutate(&mut g, &ctx, &mut rng);
            let changed = g.polygons.iter().zip(&original.polygons).filter(|(a, b)| a != b).count();
            assert!(changed >= 25, "only {changed} of 50 polygons changed at rate 0");
        }

        let mut empty = Genome::new_blank(40, 40);
        Doomsday.mutate(&mut empty, &ctx, &mut rng);
        assert!(empty.is_empty());
    }
}
