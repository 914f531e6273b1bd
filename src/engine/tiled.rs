//! Tiled mode: the reference is cut into tiles and every tile evolves its own
//! population on a tile-sized canvas. All tiles advance one generation per
//! step, in parallel. The output is the composite of each tile's best render.

use std::sync::Arc;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use super::{build_seed_store, RunSummary, StopConditions, StopReason};
use crate::dna::Genome;
use crate::error::{Error, Result};
use crate::population::{Operators, Population, PopulationConfig};
use crate::preprocessing::{TileBox, TileGrid};
use crate::raster::Raster;
use crate::settings::RunSettings;
use crate::stagnation::StagnationMonitor;

const WHITE: [u8; 3] = [255, 255, 255];

#[derive(Debug)]
pub struct TileRun {
    bbox: TileBox,
    population: Population,
    stagnation: StagnationMonitor,
}

impl TileRun {
    pub fn bbox(&self) -> TileBox {
        self.bbox
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    fn step(&mut self) -> f64 {
        let stats = self.population.step();
        let rate = self.stagnation.observe(stats.best_fitness);
        self.population.set_mutation_rate(rate);
        stats.best_fitness
    }

    /// best-ever render, or white when nothing was scored yet
    fn best_render(&self) -> Raster {
        match self.population.best_individual() {
            Some(best) => best.render_image(),
            None => {
                let (x0, y0, x1, y1) = self.bbox;
                Raster::filled(x1 - x0, y1 - y0, &WHITE)
            }
        }
    }
}

/// one line of tiled progress
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TiledStats {
    pub generation: u64,
    pub tiles: usize,
    /// mean over tiles of each tile's best-ever fitness
    pub average_best: f64,
    /// weakest tile's best-ever fitness
    pub min_best: f64,
}

/// the best genome of one tile, placed on the full canvas by `bbox`
#[derive(Clone, Debug, Serialize)]
pub struct TileGenome {
    pub bbox: TileBox,
    pub genome: Genome,
}

#[derive(Debug)]
pub struct TiledEngine {
    width: u32,
    height: u32,
    tiles: Vec<TileRun>,
    stop: StopConditions,
    generation: u64,
}

impl TiledEngine {
    /// one population per tile; `settings.tile_size` must be set
    pub fn new(settings: &RunSettings, reference: &Raster) -> Result<Self> {
        profiling::scope!("TiledEngine::new");
        settings.validate()?;
        let Some(tile_size) = settings.tile_size else {
            return Err(Error::MissingInput("tiled mode needs tile_size".to_string()));
        };
        let grid = TileGrid::new(tile_size, reference.width(), reference.height())?;

        let mut tiles = Vec::with_capacity(grid.len());
        for (idx, bbox) in grid.boxes().enumerate() {
            let (x0, y0, x1, y1) = bbox;
            let tile_ref = Arc::new(reference.crop(x0, y0, x1, y1));
            let seeds = build_seed_store(settings, &tile_ref)?;
            let operators = Operators::from_settings(settings, seeds.clone())?;
            // tiles already run in parallel with each other
            let config = PopulationConfig {
                parallel_evaluation: false,
                ..PopulationConfig::from_settings(settings, x1 - x0, y1 - y0)
            };
            let rng = Pcg32::seed_from_u64(settings.rng_seed.wrapping_add(idx as u64));
            let population = Population::new(config, operators, tile_ref, seeds, rng)?;
            let stagnation = StagnationMonitor::new(
                settings.stagnation_threshold,
                settings.mutation_rate,
                settings.escalated_mutation_rate(),
            );
            tiles.push(TileRun { bbox, population, stagnation });
        }

        Ok(Self {
            width: reference.width(),
            height: reference.height(),
            tiles,
            stop: StopConditions::from_settings(settings),
            generation: 0,
        })
    }

    pub fn tiles(&self) -> &[TileRun] {
        &self.tiles
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// score every tile's current population
    pub fn evaluate(&mut self) {
        self.tiles.par_iter_mut().for_each(|t| t.population.evaluate());
    }

    /// advance every tile by one generation
    pub fn step(&mut self) -> TiledStats {
        profiling::scope!("TiledEngine::step");
        self.tiles.par_iter_mut().for_each(|t| {
            t.step();
        });
        self.generation += 1;
        self.statistics()
    }

    pub fn statistics(&self) -> TiledStats {
        let bests: Vec<f64> = self.tiles.iter().map(|t| t.population.best_fitness()).collect();
        let n = bests.len();
        let average_best = if n == 0 { 0.0 } else { bests.iter().sum::<f64>() / n as f64 };
        let min_best = bests.iter().copied().fold(f64::INFINITY, f64::min);
        TiledStats {
            generation: self.generation,
            tiles: n,
            average_best,
            min_best: if n == 0 { f64::NEG_INFINITY } else { min_best },
        }
    }

    /// full-size image assembled from each tile's best render
    pub fn compose(&self) -> Raster {
        let mut canvas = Raster::filled(self.width, self.height, &WHITE);
        for tile in &self.tiles {
            let (x0, y0, _, _) = tile.bbox;
            canvas.paste(&tile.best_render(), x0, y0);
        }
        canvas
    }

    /// best genome of every tile that has one
    pub fn best_genomes(&self) -> Vec<TileGenome> {
        self.tiles
            .iter()
            .filter_map(|t| {
                t.population
                    .best_individual()
                    .map(|best| TileGenome { bbox: t.bbox, genome: best.genome().clone() })
            })
            .collect()
    }

    /// step until the weakest tile reaches the target or the generation limit
    pub fn run<F>(&mut self, log_every: u64, mut on_generation: F) -> RunSummary
    where
        F: FnMut(&TiledStats),
    {
        profiling::scope!("TiledEngine::run");
        self.evaluate();
        let mut stats = self.statistics();
        on_generation(&stats);
        info!(tiles = self.tiles.len(), "tiled evolution started");

        let stop_reason: StopReason = loop {
            if let Some(reason) = self.stop.check(self.generation, stats.min_best) {
                break reason;
            }
            stats = self.step();
            if log_every > 0 && stats.generation % log_every == 0 {
                info!(
                    generation = stats.generation,
                    avg_best = stats.average_best,
                    min_best = stats.min_best,
                    "progress"
                );
            }
            on_generation(&stats);
        };

        info!(generations = self.generation, min_best = stats.min_best, "tiled evolution stopped: {stop_reason}");
        RunSummary { generations: self.generation, best_fitness: stats.min_best, stop_reason }
    }
}
