//! Gene-level edits shared by the mutation strategies, plus the weighted
//! lottery that picks which edit to apply.

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::dna::Polygon;
use crate::geom::clamped_bounds;
use crate::raster::Raster;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneKind {
    /// move one vertex
    Vertex,
    /// copy RGB from a reference pixel under the polygon, keep alpha
    ImageColor,
    /// nudge opacity
    Alpha,
    /// fresh random RGB, keep alpha
    RandomColor,
    /// exchange draw order with another polygon
    Swap,
}

/// lottery used whenever a single polygon is mutated on its own
pub const ONE_POLYGON_WEIGHTS: [(GeneKind, f64); 4] = [
    (GeneKind::Vertex, 0.50),
    (GeneKind::ImageColor, 0.23),
    (GeneKind::Alpha, 0.20),
    (GeneKind::RandomColor, 0.07),
];

/// lottery weights for the multi-polygon strategy, one per edit.
/// only the ratios matter; negative weights count as zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneWeights {
    pub vertex: f64,
    /// recolor from a reference pixel
    pub color: f64,
    pub alpha: f64,
    pub swap: f64,
}

impl Default for GeneWeights {
    fn default() -> Self {
        Self { vertex: 0.6, color: 0.2, alpha: 0.1, swap: 0.1 }
    }
}

impl GeneWeights {
    pub fn table(&self) -> [(GeneKind, f64); 4] {
        [
            (GeneKind::Vertex, self.vertex),
            (GeneKind::ImageColor, self.color),
            (GeneKind::Alpha, self.alpha),
            (GeneKind::Swap, self.swap),
        ]
    }

    /// at least one finite positive weight, none negative or NaN
    pub fn is_valid(&self) -> bool {
        let weights = [self.vertex, self.color, self.alpha, self.swap];
        weights.iter().all(|w| w.is_finite() && *w >= 0.0) && weights.iter().any(|w| *w > 0.0)
    }
}

pub const VERTEX_SHIFT: i32 = 10;
pub const ALPHA_SHIFT: f64 = 0.3;

/// cumulative scan over non-negative weights. None when nothing has weight.
pub fn pick_weighted<T: Copy>(choices: &[(T, f64)], rng: &mut Pcg32) -> Option<T> {
    let total: f64 = choices.iter().map(|(_, w)| w.max(0.0)).sum();
    if total.is_nan() || total <= 0.0 {
        return None;
    }

    let threshold = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for &(choice, weight) in choices {
        cumulative += weight.max(0.0);
        if cumulative > threshold {
            return Some(choice);
        }
    }

    // rounding left the threshold past the last bucket
    choices.iter().rev().find(|(_, w)| *w > 0.0).map(|(c, _)| *c)
}

/// apply one lottery-picked edit to a single polygon (no swaps at this level)
pub fn mutate_one_polygon(
    poly: &mut Polygon,
    width: u32,
    height: u32,
    reference: &Raster,
    rng: &mut Pcg32,
) {
    match pick_weighted(&ONE_POLYGON_WEIGHTS, rng) {
        Some(GeneKind::Vertex) => shift_vertex(poly, width, height, VERTEX_SHIFT, rng),
        Some(GeneKind::ImageColor) => recolor_from_reference(poly, reference, rng),
        Some(GeneKind::Alpha) => perturb_alpha(poly, 1.0, rng),
        Some(GeneKind::RandomColor) => randomize_rgb(poly, rng),
        Some(GeneKind::Swap) | None => {}
    }
}

/// move one random vertex by up to `max_shift` px per axis, clamped to [0, w] x [0, h]
pub fn shift_vertex(poly: &mut Polygon, width: u32, height: u32, max_shift: i32, rng: &mut Pcg32) {
    if poly.vertices.is_empty() {
        return;
    }
    let idx = rng.random_range(0..poly.vertices.len());
    let (x, y) = poly.vertices[idx];
    let dx = rng.random_range(-max_shift..=max_shift);
    let dy = rng.random_range(-max_shift..=max_shift);
    poly.vertices[idx] = (
        (x + dx).clamp(0, width as i32),
        (y + dy).clamp(0, height as i32),
    );
}

/// RGB of a random reference pixel inside the polygon's clamped bounding box.
/// alpha is kept; a box entirely off the reference leaves the polygon as is.
pub fn recolor_from_reference(poly: &mut Polygon, reference: &Raster, rng: &mut Pcg32) {
    let Some((x0, y0, x1, y1)) = clamped_bounds(&poly.vertices, reference.width(), reference.height()) else {
        return;
    };
    let x = rng.random_range(x0..=x1);
    let y = rng.random_range(y0..=y1);
    let [r, g, b] = reference.rgb_at(x, y);
    poly.color = [r, g, b, poly.color[3]];
}

/// add `uniform(-0.3, 0.3) * scale` to the opacity in [0, 1] space, truncating back to u8
pub fn perturb_alpha(poly: &mut Polygon, scale: f64, rng: &mut Pcg32) {
    let change = rng.random_range(-ALPHA_SHIFT..=ALPHA_SHIFT) * scale;
    let alpha = (poly.color[3] as f64 / 255.0 + change).clamp(0.0, 1.0);
    poly.color[3] = (alpha * 255.0) as u8;
}

pub fn randomize_rgb(poly: &mut Polygon, rng: &mut Pcg32) {
    let [r, g, b] = rng.random::<[u8; 3]>();
    poly.color = [r, g, b, poly.color[3]];
}

/// `k` distinct indices out of `0..n`, in random order
pub fn sample_distinct(n: usize, k: usize, rng: &mut Pcg32) -> Vec<usize> {
    rand::seq::index::sample(rng, n, k.min(n)).into_vec()
}

/// `max(1, floor(n * uniform(lo, hi)))`, never more than `n`.
/// bounds are clamped to [0, 1]; an empty or inverted range uses `lo`.
pub fn subset_size(n: usize, lo: f64, hi: f64, rng: &mut Pcg32) -> usize {
    let (lo, hi) = (lo.clamp(0.0, 1.0), hi.clamp(0.0, 1.0));
    let frac = if hi > lo { rng.random_range(lo..hi) } else { lo };
    ((n as f64 * frac) as usize).max(1).min(n)
}
