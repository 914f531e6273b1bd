// Run engine
// Drives a Population until a stop condition holds, steering the mutation
// rate with the stagnation monitor. Tiled mode lives in `tiled`.

pub mod tiled;

use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::individual::Individual;
use crate::population::{GenerationStats, Operators, Population, PopulationConfig};
use crate::preprocessing::{compute_tile_seeds, SeedStore};
use crate::raster::Raster;
use crate::settings::RunSettings;
use crate::stagnation::StagnationMonitor;

pub use tiled::TiledEngine;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// the generation's best fitness reached `stop_fitness`
    TargetReached,
    MaxGenerations,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TargetReached => f.write_str("target fitness reached"),
            StopReason::MaxGenerations => f.write_str("generation limit reached"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub generations: u64,
    pub best_fitness: f64,
    pub stop_reason: StopReason,
}

/// stop conditions shared by both engines
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StopConditions {
    pub max_generations: u64,
    pub stop_fitness: f64,
}

impl StopConditions {
    pub fn from_settings(settings: &RunSettings) -> Self {
        Self { max_generations: settings.max_generations, stop_fitness: settings.stop_fitness }
    }

    #[inline]
    pub fn check(&self, generation: u64, best: f64) -> Option<StopReason> {
        if best >= self.stop_fitness {
            Some(StopReason::TargetReached)
        } else if generation >= self.max_generations {
            Some(StopReason::MaxGenerations)
        } else {
            None
        }
    }
}

/// tile seeds for the whole reference, when a seed tile size is configured
pub fn build_seed_store(settings: &RunSettings, reference: &Raster) -> Result<Option<Arc<SeedStore>>> {
    let Some(tile) = settings.seed_tile_size else {
        return Ok(None);
    };
    let seeds = compute_tile_seeds(reference, tile)?;
    info!(tiles = seeds.len(), tile, "seed store ready");
    Ok(Some(Arc::new(SeedStore::from_seeds(&seeds))))
}

#[derive(Debug)]
pub struct Engine {
    population: Population,
    stagnation: StagnationMonitor,
    stop: StopConditions,
    seeds: Option<Arc<SeedStore>>,
    last_stats: Option<GenerationStats>,
}

impl Engine {
    pub fn new(population: Population, stagnation: StagnationMonitor, stop: StopConditions) -> Self {
        Self { population, stagnation, stop, seeds: None, last_stats: None }
    }

    /// resolve operators, build seeds if asked for, and initialise the population
    pub fn from_settings(settings: &RunSettings, reference: Arc<Raster>) -> Result<Self> {
        profiling::scope!("Engine::from_settings");
        settings.validate()?;
        let seeds = build_seed_store(settings, &reference)?;
        let operators = Operators::from_settings(settings, seeds.clone())?;
        let config = PopulationConfig::from_settings(settings, reference.width(), reference.height());
        let rng = Pcg32::seed_from_u64(settings.rng_seed);
        let population = Population::new(config, operators, reference, seeds.clone(), rng)?;

        let stagnation = StagnationMonitor::new(
            settings.stagnation_threshold,
            settings.mutation_rate,
            settings.escalated_mutation_rate(),
        );
        let mut engine = Self::new(population, stagnation, StopConditions::from_settings(settings));
        engine.seeds = seeds;
        Ok(engine)
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn seeds(&self) -> Option<&Arc<SeedStore>> {
        self.seeds.as_ref()
    }

    pub fn best_individual(&self) -> Option<&Individual> {
        self.population.best_individual()
    }

    pub fn last_stats(&self) -> Option<&GenerationStats> {
        self.last_stats.as_ref()
    }

    /// one generation plus the mutation-rate update for the next one
    pub fn step(&mut self) -> GenerationStats {
        let stats = self.population.step();

        let was_escalated = self.stagnation.is_escalated();
        let rate = self.stagnation.observe(stats.best_fitness);
        if self.stagnation.is_escalated() && !was_escalated {
            warn!(generation = stats.generation, rate, "stagnation detected, raising mutation rate");
        }
        self.population.set_mutation_rate(rate);

        self.last_stats = Some(stats.clone());
        stats
    }

    /// stop reason for the current state, if any
    pub fn should_stop(&self) -> Option<StopReason> {
        let best = self.last_stats.as_ref().map_or(f64::NEG_INFINITY, |s| s.best_fitness);
        self.stop.check(self.population.generation(), best)
    }

    /// evaluate the initial population, then step until a stop condition holds.
    /// `on_generation` sees every generation's statistics, generation 0 included.
    pub fn run<F>(&mut self, log_every: u64, mut on_generation: F) -> RunSummary
    where
        F: FnMut(&GenerationStats),
    {
        profiling::scope!("Engine::run");
        self.population.evaluate();
        let initial = self.population.statistics();
        on_generation(&initial);
        self.last_stats = Some(initial);
        info!(
            population = self.population.individuals().len(),
            max_generations = self.stop.max_generations,
            stop_fitness = self.stop.stop_fitness,
            "evolution started"
        );

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            let stats = self.step();
            if log_every > 0 && stats.generation % log_every == 0 {
                info!(
                    generation = stats.generation,
                    best = stats.best_fitness,
                    average = stats.average_fitness,
                    "progress"
                );
            }
            on_generation(&stats);
        };

        let summary = RunSummary {
            generations: self.population.generation(),
            best_fitness: self.population.best_fitness(),
            stop_reason,
        };
        info!(
            generations = summary.generations,
            best = summary.best_fitness,
            "evolution stopped: {stop_reason}"
        );
        summary
    }
}
