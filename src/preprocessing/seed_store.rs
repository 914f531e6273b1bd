use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::tiling::{TileBox, TileSeed};

/// A tile's current colour estimate.
///
/// Entries created by `update_seed_if_better` for an unknown tile carry no
/// geometry and are invisible to point lookups.
#[derive(Clone, Debug, PartialEq)]
pub struct SeedEntry {
    pub bbox: Option<TileBox>,
    pub centroid: Option<(u32, u32)>,
    pub mean_color: [u8; 3],
    /// None means "no estimate yet"; any candidate beats it
    pub mse: Option<f64>,
    pub pixel_count: Option<usize>,
}

impl From<&TileSeed> for SeedEntry {
    fn from(seed: &TileSeed) -> Self {
        Self {
            bbox: Some(seed.bbox),
            centroid: Some(seed.centroid),
            mean_color: seed.mean_color,
            mse: Some(seed.mse),
            pixel_count: Some(seed.pixel_count),
        }
    }
}

impl SeedEntry {
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        match self.bbox {
            Some((x0, y0, x1, y1)) => {
                x >= x0 as i32 && x < x1 as i32 && y >= y0 as i32 && y < y1 as i32
            }
            None => false,
        }
    }
}

/// Tile id -> colour estimate, shared between worker threads.
///
/// Writers go through [`SeedStore::update_seed_if_better`], which holds the
/// write lock across the compare and the store so concurrent improvements never
/// clobber each other. Readers may see a slightly older colour, which only
/// weakens a hint.
#[derive(Debug, Default)]
pub struct SeedStore {
    seeds: RwLock<BTreeMap<usize, SeedEntry>>,
}

impl SeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: &[TileSeed]) -> Self {
        let store = Self::new();
        store.insert_all(seeds);
        store
    }

    // a panicking writer cannot leave an entry half-written, so poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<usize, SeedEntry>> {
        self.seeds.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<usize, SeedEntry>> {
        self.seeds.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// insert or overwrite every seed by id
    pub fn insert_all(&self, seeds: &[TileSeed]) {
        let mut map = self.write();
        for seed in seeds {
            map.insert(seed.id, SeedEntry::from(seed));
        }
    }

    /// Store `color` for `tile_id` if `mse` beats the current estimate by more
    /// than `min_improvement` (a fraction, 0.01 = 1%). Unknown tiles and tiles
    /// without an estimate always accept. Returns whether the store changed.
    pub fn update_seed_if_better(
        &self,
        tile_id: usize,
        color: [u8; 3],
        mse: f64,
        min_improvement: f64,
    ) -> bool {
        let mut map = self.write();
        match map.get_mut(&tile_id) {
            None => {
                map.insert(
                    tile_id,
                    SeedEntry { bbox: None, centroid: None, mean_color: color, mse: Some(mse), pixel_count: None },
                );
                true
            }
            Some(entry) => {
                let better = match entry.mse {
                    None => true,
                    Some(current) => mse < current * (1.0 - min_improvement),
                };
                if better {
                    entry.mean_color = color;
                    entry.mse = Some(mse);
                }
                better
            }
        }
    }

    /// first tile (by id) whose box holds the point
    pub fn find_seed_by_point(&self, x: i32, y: i32) -> Option<(usize, SeedEntry)> {
        self.read()
            .iter()
            .find(|(_, entry)| entry.contains(x, y))
            .map(|(&id, entry)| (id, entry.clone()))
    }

    pub fn get(&self, tile_id: usize) -> Option<SeedEntry> {
        self.read().get(&tile_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
