use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geom::{self, Point};
use crate::preprocessing::SeedStore;
use crate::raster::Raster;

/// alpha range for freshly spawned polygons; low-to-mid so layers stay visible
pub const SPAWN_ALPHA_MIN: u8 = 30;
pub const SPAWN_ALPHA_MAX: u8 = 100;

/// a polygon with a fixed vertex count and straight (non-premultiplied) RGBA color
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Point>,
    pub color: [u8; 4],
}

impl Polygon {
    /// uniform vertices over [0, width] x [0, height].
    /// with a reference the color is the mean of the pixels under the bounding box
    /// (one sampled pixel when the box has no area); otherwise fully random RGBA.
    pub fn random<R: Rng + ?Sized>(
        width: u32,
        height: u32,
        n_vertices: usize,
        reference: Option<&Raster>,
        rng: &mut R,
    ) -> Self {
        profiling::scope!("Polygon::random");
        let vertices = random_vertices(width, height, n_vertices, rng);

        let color = match reference {
            Some(img) => {
                let [r, g, b] = reference_color(&vertices, img, rng);
                [r, g, b, rng.random_range(SPAWN_ALPHA_MIN..=SPAWN_ALPHA_MAX)]
            }
            None => rng.random::<[u8; 4]>(),
        };

        Self { vertices, color }
    }

    /// like `random`, but the color comes from the tile seed under the centroid.
    /// falls back to the reference (or a random color) when no seed covers it.
    pub fn random_seeded<R: Rng + ?Sized>(
        width: u32,
        height: u32,
        n_vertices: usize,
        seeds: &SeedStore,
        reference: Option<&Raster>,
        rng: &mut R,
    ) -> Self {
        let mut poly = Self::random(width, height, n_vertices, reference, rng);
        if let Some((_, seed)) = poly.centroid().and_then(|(x, y)| seeds.find_seed_by_point(x, y)) {
            let [r, g, b] = seed.mean_color;
            poly.color = [r, g, b, rng.random_range(SPAWN_ALPHA_MIN..=SPAWN_ALPHA_MAX)];
        }
        poly
    }

    #[inline]
    pub fn centroid(&self) -> Option<Point> {
        geom::centroid(&self.vertices)
    }

    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        geom::contains_point(&self.vertices, x, y)
    }
}

pub(crate) fn random_vertices<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    n_vertices: usize,
    rng: &mut R,
) -> Vec<Point> {
    let (w, h) = (width as i32, height as i32);
    (0..n_vertices)
        .map(|_| (rng.random_range(0..=w), rng.random_range(0..=h)))
        .collect()
}

/// mean color of the reference under the vertices' bounding box, clamped to the image.
/// the box is half-open, so a polygon squeezed onto one row or column has no area
/// and a single random pixel is sampled instead.
fn reference_color<R: Rng + ?Sized>(vertices: &[Point], img: &Raster, rng: &mut R) -> [u8; 3] {
    let (w, h) = (img.width() as i32, img.height() as i32);
    let min_x = vertices.iter().map(|p| p.0).min().unwrap_or(0).clamp(0, w);
    let max_x = vertices.iter().map(|p| p.0).max().unwrap_or(0).clamp(0, w);
    let min_y = vertices.iter().map(|p| p.1).min().unwrap_or(0).clamp(0, h);
    let max_y = vertices.iter().map(|p| p.1).max().unwrap_or(0).clamp(0, h);

    if min_x < max_x && min_y < max_y {
        mean_rgb(&img.crop(min_x as u32, min_y as u32, max_x as u32, max_y as u32))
    } else {
        random_pixel(img, rng)
    }
}

fn random_pixel<R: Rng + ?Sized>(img: &Raster, rng: &mut R) -> [u8; 3] {
    if img.pixel_count() == 0 {
        return rng.random::<[u8; 3]>();
    }
    let x = rng.random_range(0..img.width());
    let y = rng.random_range(0..img.height());
    img.rgb_at(x, y)
}

/// per-channel mean, truncated
pub fn mean_rgb(img: &Raster) -> [u8; 3] {
    let n = img.pixel_count() as u64;
    if n == 0 {
        return [0, 0, 0];
    }
    let mut sum = [0u64; 3];
    for y in 0..img.height() {
        for x in 0..img.width() {
            let px = img.rgb_at(x, y);
            for c in 0..3 {
                sum[c] += px[c] as u64;
            }
        }
    }
    [(sum[0] / n) as u8, (sum[1] / n) as u8, (sum[2] / n) as u8]
}

/// ordered polygon list on a fixed canvas; later polygons paint over earlier ones
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genome {
    pub width: u32,
    pub height: u32,
    pub polygons: Vec<Polygon>,
}

impl Genome {
    pub fn new_blank(width: u32, height: u32) -> Self {
        Self { width, height, polygons: Vec::new() }
    }

    pub fn random<R: Rng + ?Sized>(
        width: u32,
        height: u32,
        n_polygons: usize,
        n_vertices: usize,
        reference: Option<&Raster>,
        rng: &mut R,
    ) -> Self {
        profiling::scope!("Genome::random");
        let polygons = (0..n_polygons)
            .map(|_| Polygon::random(width, height, n_vertices, reference, rng))
            .collect();
        Self { width, height, polygons }
    }

    pub fn random_seeded<R: Rng + ?Sized>(
        width: u32,
        height: u32,
        n_polygons: usize,
        n_vertices: usize,
        seeds: &SeedStore,
        reference: Option<&Raster>,
        rng: &mut R,
    ) -> Self {
        profiling::scope!("Genome::random_seeded");
        let polygons = (0..n_polygons)
            .map(|_| Polygon::random_seeded(width, height, n_vertices, seeds, reference, rng))
            .collect();
        Self { width, height, polygons }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}
