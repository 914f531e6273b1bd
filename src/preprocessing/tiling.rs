// ---- tile grid ------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::Raster;

/// half-open pixel box (x0, y0, x1, y1)
pub type TileBox = (u32, u32, u32, u32);

/// divides a width x height image into square tiles, row by row.
/// tiles on the right and bottom edges may be smaller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub tile: u32,    // tile size in pixels
    pub tiles_x: u32, // number of tiles horizontally
    pub tiles_y: u32, // number of tiles vertically
    pub width: u32,
    pub height: u32,
}

impl TileGrid {
    pub fn new(tile: u32, width: u32, height: u32) -> Result<Self> {
        if tile == 0 {
            return Err(Error::InvalidConfig("tile size must be positive".to_string()));
        }
        let tiles_x = width.div_ceil(tile);
        let tiles_y = height.div_ceil(tile);
        Ok(Self { tile, tiles_x, tiles_y, width, height })
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.tiles_x * self.tiles_y) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// box of tile `idx` in row-major order
    pub fn tile_box(&self, idx: usize) -> TileBox {
        let tx = idx as u32 % self.tiles_x.max(1);
        let ty = idx as u32 / self.tiles_x.max(1);
        let x0 = tx * self.tile;
        let y0 = ty * self.tile;
        (x0, y0, (x0 + self.tile).min(self.width), (y0 + self.tile).min(self.height))
    }

    pub fn boxes(&self) -> impl Iterator<Item = TileBox> + '_ {
        (0..self.len()).map(move |i| self.tile_box(i))
    }
}

/// flat-colour summary of one tile of the reference
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileSeed {
    pub id: usize,
    pub bbox: TileBox,
    pub centroid: (u32, u32),
    pub mean_color: [u8; 3],
    /// mean squared error of painting the tile with `mean_color`
    pub mse: f64,
    pub pixel_count: usize,
}

/// partition the reference into `tile_size` tiles and summarise each one
pub fn compute_tile_seeds(reference: &Raster, tile_size: u32) -> Result<Vec<TileSeed>> {
    profiling::scope!("compute_tile_seeds");
    let grid = TileGrid::new(tile_size, reference.width(), reference.height())?;
    let rgb = reference.to_rgb();

    let seeds = grid
        .boxes()
        .enumerate()
        .map(|(id, (x0, y0, x1, y1))| {
            let patch = rgb.crop(x0, y0, x1, y1);
            let mean_color = crate::dna::mean_rgb(&patch);
            let mse = flat_color_mse(&patch, mean_color);
            TileSeed {
                id,
                bbox: (x0, y0, x1, y1),
                centroid: ((x0 + x1) / 2, (y0 + y1) / 2),
                mean_color,
                mse,
                pixel_count: patch.pixel_count(),
            }
        })
        .collect();
    Ok(seeds)
}

fn flat_color_mse(patch: &Raster, color: [u8; 3]) -> f64 {
    if patch.data().is_empty() {
        return 0.0;
    }
    let sum: f64 = patch
        .data()
        .chunks_exact(3)
        .flat_map(|px| (0..3).map(move |c| (px[c] as f64 - color[c] as f64).powi(2)))
        .sum();
    sum / patch.data().len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_edges_are_smaller() {
        let grid = TileGrid::new(16, 40, 20).unwrap();
        assert_eq!((grid.tiles_x, grid.tiles_y), (3, 2));
        assert_eq!(grid.tile_box(2), (32, 0, 40, 16));
        assert_eq!(grid.tile_box(5), (32, 16, 40, 20));
    }

    #[test]
    fn test_zero_tile_is_rejected() {
        assert!(TileGrid::new(0, 10, 10).is_err());
    }

    #[test]
    fn test_flat_tile_has_zero_mse() {
        let img = Raster::filled(8, 8, &[10, 20, 30]);
        let seeds = compute_tile_seeds(&img, 4).unwrap();
        assert_eq!(seeds.len(), 4);
        assert!(seeds.iter().all(|s| s.mse == 0.0 && s.mean_color == [10, 20, 30]));
        assert_eq!(seeds[3].centroid, (6, 6));
    }

    #[test]
    fn test_two_tone_tile_mse() {
        // half black, half white in one tile: mean 127, error ~127.5^2
        let mut img = Raster::filled(2, 1, &[0, 0, 0]);
        img.paste(&Raster::filled(1, 1, &[255, 255, 255]), 1, 0);
        let seeds = compute_tile_seeds(&img, 2).unwrap();
        assert_eq!(seeds[0].mean_color, [127, 127, 127]);
        let expected = (127.0f64.powi(2) + 128.0f64.powi(2)) / 2.0;
        assert!((seeds[0].mse - expected).abs() < 1e-9);
    }
}
