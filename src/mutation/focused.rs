use rand::Rng;
use rand_pcg::Pcg32;

use crate::dna::Genome;
use crate::raster::Raster;
use crate::render::render_genome;

use super::gene::mutate_one_polygon;
use super::{MutationContext, MutationStrategy};

/// error-guided mutation: edit the topmost polygon covering the worst pixel's centre,
/// or a random polygon when none covers it
#[derive(Clone, Copy, Debug, Default)]
pub struct Focused;

impl MutationStrategy for Focused {
    fn name(&self) -> &'static str {
        "focused"
    }

    fn mutate(&self, genome: &mut Genome, ctx: &MutationContext<'_>, rng: &mut Pcg32) {
        profiling::scope!("Focused::mutate");
        if rng.random::<f64>() >= ctx.rate || genome.is_empty() {
            return;
        }

        let rendered = render_genome(genome);
        let idx = worst_pixel(ctx.reference, &rendered)
            .and_then(|(x, y)| topmost_polygon_at(genome, x as f64 + 0.5, y as f64 + 0.5))
            .unwrap_or_else(|| rng.random_range(0..genome.polygons.len()));

        let (w, h) = (genome.width, genome.height);
        mutate_one_polygon(&mut genome.polygons[idx], w, h, ctx.reference, rng);
    }
}

/// first pixel (row-major) with the largest squared RGB error
pub fn worst_pixel(reference: &Raster, rendered: &Raster) -> Option<(u32, u32)> {
    let w = reference.width().min(rendered.width());
    let h = reference.height().min(rendered.height());
    let mut best: Option<((u32, u32), u32)> = None;
    for y in 0..h {
        for x in 0..w {
            let a = reference.rgb_at(x, y);
            let b = rendered.rgb_at(x, y);
            let err: u32 = (0..3)
                .map(|c| {
                    let d = a[c] as i32 - b[c] as i32;
                    (d * d) as u32
                })
                .sum();
            if best.map_or(true, |(_, e)| err > e) {
                best = Some(((x, y), err));
            }
        }
    }
    best.map(|(p, _)| p)
}

/// index of the last-drawn polygon strictly containing the point
pub fn topmost_polygon_at(genome: &Genome, x: f64, y: f64) -> Option<usize> {
    genome.polygons.iter().rposition(|p| p.contains(x, y))
}
