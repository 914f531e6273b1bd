// Reference preprocessing: tile seeds and the store that shares them

pub mod seed_store;
pub mod tiling;

pub use seed_store::{SeedEntry, SeedStore};
pub use tiling::{compute_tile_seeds, TileBox, TileGrid, TileSeed};
