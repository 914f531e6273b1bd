//! One generation of individuals and the step that turns it into the next.
//!
//! A step evaluates everything still unscored, records the best-ever
//! individual by value, selects `population_size - elite_size` parents, pairs
//! them in order (a trailing odd parent is dropped), applies crossover with
//! probability `crossover_rate`, mutates both children, scores the offspring
//! and hands old + offspring to the replacement strategy.
//!
//! Scoring can also happen outside: `prepare_fitness_tasks` produces
//! self-contained tasks and `update_fitness_from_results` writes the scores
//! back by position.

use std::sync::Arc;

use rand::Rng;
use rand_pcg::Pcg32;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::crossover::{self, CrossoverStrategy};
use crate::dna::Genome;
use crate::error::{Error, Result};
use crate::fitness::{self, FitnessStrategy};
use crate::individual::Individual;
use crate::mutation::{self, MutationContext, MutationParams, MutationStrategy};
use crate::preprocessing::SeedStore;
use crate::raster::Raster;
use crate::render::render_genome;
use crate::replacement::{self, ReplacementStrategy};
use crate::selection::{self, by_fitness_desc, SelectionParams, SelectionStrategy};
use crate::settings::RunSettings;

/// the five pluggable roles, resolved once before the loop starts
#[derive(Clone, Debug)]
pub struct Operators {
    pub fitness: Arc<dyn FitnessStrategy>,
    pub selection: Arc<dyn SelectionStrategy>,
    pub crossover: Arc<dyn CrossoverStrategy>,
    pub mutation: Arc<dyn MutationStrategy>,
    pub replacement: Arc<dyn ReplacementStrategy>,
}

impl Operators {
    /// resolve by name with default operator parameters
    pub fn from_names(
        fitness: &str,
        selection: &str,
        crossover: &str,
        mutation: &str,
        replacement: &str,
    ) -> Result<Self> {
        Ok(Self {
            fitness: fitness::by_name(fitness)?,
            selection: selection::by_name(selection, &SelectionParams::default())?,
            crossover: crossover::by_name(crossover)?,
            mutation: mutation::by_name(mutation, &MutationParams::default())?,
            replacement: replacement::by_name(replacement)?,
        })
    }

    pub fn from_settings(settings: &RunSettings, seeds: Option<Arc<SeedStore>>) -> Result<Self> {
        let selection_params = SelectionParams {
            tournament_size: settings.tournament_size,
            tournament_replacement: settings.tournament_replacement,
            temperature: settings.boltzmann_temperature,
        };
        let mutation_params = MutationParams {
            decay_factor: settings.decay_factor,
            gene_weights: settings.multi_gene_weights,
            adopt_probability: settings.adopt_probability,
            seed_base: settings.seed_base_mutation.clone(),
            seeds,
        };
        Ok(Self {
            fitness: fitness::by_name(&settings.fitness)?,
            selection: selection::by_name(&settings.selection, &selection_params)?,
            crossover: crossover::by_name(&settings.crossover)?,
            mutation: mutation::by_name(&settings.mutation, &mutation_params)?,
            replacement: replacement::by_name(&settings.replacement)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PopulationConfig {
    pub width: u32,
    pub height: u32,
    pub population_size: usize,
    pub n_polygons: usize,
    pub n_vertices: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub elite_size: usize,
    /// horizon for schedule-aware mutations; 0 = unknown
    pub max_generations: u64,
    /// share of the initial population coloured from tile seeds
    pub seed_fraction: f64,
    pub parallel_evaluation: bool,
}

impl PopulationConfig {
    /// defaults for a `width` x `height` canvas
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            population_size: 100,
            n_polygons: 100,
            n_vertices: 3,
            mutation_rate: 0.1,
            crossover_rate: 0.7,
            elite_size: 7,
            max_generations: 10_000,
            seed_fraction: 0.0,
            parallel_evaluation: true,
        }
    }

    pub fn from_settings(settings: &RunSettings, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            population_size: settings.population_size,
            n_polygons: settings.n_polygons,
            n_vertices: settings.n_vertices,
            mutation_rate: settings.mutation_rate,
            crossover_rate: settings.crossover_rate,
            elite_size: settings.elite_size,
            max_generations: settings.max_generations,
            seed_fraction: settings.seed_fraction,
            parallel_evaluation: settings.parallel_evaluation,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg)) };
        if self.width == 0 || self.height == 0 {
            return invalid(format!("canvas {}x{} has no pixels", self.width, self.height));
        }
        if self.population_size == 0 {
            return invalid("population_size must be positive".into());
        }
        if self.n_vertices < 3 {
            return invalid(format!("n_vertices must be at least 3, got {}", self.n_vertices));
        }
        if self.elite_size > self.population_size {
            return invalid(format!(
                "elite_size {} exceeds population_size {}",
                self.elite_size, self.population_size
            ));
        }
        for (name, value) in [
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
            ("seed_fraction", self.seed_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} must lie in [0, 1], got {value}"));
            }
        }
        Ok(())
    }
}

/// per-generation summary handed to metrics sinks
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerationStats {
    pub generation: u64,
    pub population_size: usize,
    pub best_fitness: f64,
    pub worst_fitness: f64,
    pub average_fitness: f64,
    pub std_deviation: f64,
    /// index of the current best in `Population::individuals`
    pub best_index: Option<usize>,
}

/// a scoring job that owns everything it needs, so it can run on any thread
#[derive(Clone, Debug)]
pub struct FitnessTask {
    pub genome: Genome,
    pub fitness: Arc<dyn FitnessStrategy>,
    pub reference: Arc<Raster>,
}

impl FitnessTask {
    pub fn evaluate(&self) -> f64 {
        let img = render_genome(&self.genome);
        self.fitness.score(&self.reference, &img)
    }
}

/// score every individual that has no cached fitness
fn evaluate_all(individuals: &mut [Individual], reference: &Raster, parallel: bool) {
    profiling::scope!("evaluate_all");
    if parallel {
        individuals.par_iter_mut().for_each(|ind| {
            ind.calculate_fitness(reference, true);
        });
    } else {
        for ind in individuals.iter_mut() {
            ind.calculate_fitness(reference, true);
        }
    }
}

#[derive(Debug)]
pub struct Population {
    config: PopulationConfig,
    operators: Operators,
    reference: Arc<Raster>,
    individuals: Vec<Individual>,
    generation: u64,
    best_individual: Option<Individual>,
    best_fitness: f64,
    mutation_rate: f64,
    rng: Pcg32,
}

impl Population {
    /// build and randomly initialise a population. the reference must match the canvas.
    pub fn new(
        config: PopulationConfig,
        operators: Operators,
        reference: Arc<Raster>,
        seeds: Option<Arc<SeedStore>>,
        mut rng: Pcg32,
    ) -> Result<Self> {
        profiling::scope!("Population::new");
        config.validate()?;
        if reference.width() != config.width || reference.height() != config.height {
            return Err(Error::DimensionMismatch {
                expected_width: config.width,
                expected_height: config.height,
                width: reference.width(),
                height: reference.height(),
            });
        }

        let n_seeded = match &seeds {
            Some(_) => (config.seed_fraction * config.population_size as f64).round() as usize,
            None => 0,
        };
        let (w, h) = (config.width, config.height);
        let individuals = (0..config.population_size)
            .map(|i| match seeds.as_deref() {
                Some(store) if i < n_seeded => Individual::seeded(
                    w,
                    h,
                    config.n_polygons,
                    config.n_vertices,
                    store,
                    Some(reference.as_ref()),
                    Arc::clone(&operators.fitness),
                    Arc::clone(&operators.mutation),
                    &mut rng,
                ),
                _ => Individual::random(
                    w,
                    h,
                    config.n_polygons,
                    config.n_vertices,
                    Some(reference.as_ref()),
                    Arc::clone(&operators.fitness),
                    Arc::clone(&operators.mutation),
                    &mut rng,
                ),
            })
            .collect();

        Ok(Self {
            mutation_rate: config.mutation_rate,
            config,
            operators,
            reference,
            individuals,
            generation: 0,
            best_individual: None,
            best_fitness: f64::NEG_INFINITY,
            rng,
        })
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    pub fn operators(&self) -> &Operators {
        &self.operators
    }

    pub fn reference(&self) -> &Arc<Raster> {
        &self.reference
    }

    /// best individual seen so far (a snapshot, unaffected by later steps)
    pub fn best_individual(&self) -> Option<&Individual> {
        self.best_individual.as_ref()
    }

    /// negative infinity until something has been scored
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    pub fn set_mutation_rate(&mut self, rate: f64) {
        self.mutation_rate = rate.clamp(0.0, 1.0);
    }

    /// score everything still unscored, then refresh the best-ever record
    pub fn evaluate(&mut self) {
        evaluate_all(&mut self.individuals, &self.reference, self.config.parallel_evaluation);
        self.update_best();
    }

    /// one task per individual, in population order
    pub fn prepare_fitness_tasks(&self) -> Vec<FitnessTask> {
        self.individuals
            .iter()
            .map(|ind| FitnessTask {
                genome: ind.genome().clone(),
                fitness: Arc::clone(ind.fitness_strategy()),
                reference: Arc::clone(&self.reference),
            })
            .collect()
    }

    /// write scores back by position; the count must match the population
    pub fn update_fitness_from_results(&mut self, results: &[f64]) -> Result<()> {
        if results.len() != self.individuals.len() {
            return Err(Error::ResultCountMismatch {
                expected: self.individuals.len(),
                got: results.len(),
            });
        }
        for (ind, &fitness) in self.individuals.iter_mut().zip(results) {
            ind.set_fitness(fitness);
        }
        self.update_best();
        Ok(())
    }

    fn update_best(&mut self) {
        let Some(current) = self.individuals.iter().min_by(|a, b| by_fitness_desc(a, b)) else {
            return;
        };
        let fitness = current.fitness();
        if fitness > self.best_fitness {
            // the clone drops its caches, so carry the score over by hand
            let mut snapshot = current.clone();
            snapshot.set_fitness(fitness);
            self.best_individual = Some(snapshot);
            self.best_fitness = fitness;
        }
    }

    /// advance one generation and report the statistics of the new one
    pub fn step(&mut self) -> GenerationStats {
        profiling::scope!("Population::step");
        self.evaluate();

        let n_parents = self.config.population_size - self.config.elite_size.min(self.config.population_size);
        let ctx = MutationContext {
            rate: self.mutation_rate,
            reference: &self.reference,
            generation: self.generation,
            max_generations: self.config.max_generations,
        };

        let mut offspring = Vec::with_capacity(n_parents);
        {
            let parents = self.operators.selection.select(&self.individuals, n_parents, &mut self.rng);
            for pair in parents.chunks_exact(2) {
                let (mut c1, mut c2) = if self.rng.random::<f64>() < self.config.crossover_rate {
                    self.operators.crossover.crossover(pair[0], pair[1], &mut self.rng)
                } else {
                    (pair[0].clone(), pair[1].clone())
                };
                c1.mutate(&ctx, &mut self.rng);
                c2.mutate(&ctx, &mut self.rng);
                offspring.push(c1);
                offspring.push(c2);
            }
        }
        evaluate_all(&mut offspring, &self.reference, self.config.parallel_evaluation);

        let old = std::mem::take(&mut self.individuals);
        self.individuals = self.operators.replacement.replace(old, offspring, self.config.population_size);
        self.generation += 1;
        self.update_best();

        let stats = self.statistics();
        debug!(
            generation = stats.generation,
            best = stats.best_fitness,
            average = stats.average_fitness,
            rate = self.mutation_rate,
            "generation complete"
        );
        stats
    }

    /// summary of the current individuals' cached fitness
    pub fn statistics(&self) -> GenerationStats {
        let fitness: Vec<f64> = self.individuals.iter().map(Individual::fitness).collect();
        let n = fitness.len();
        let best_index = self
            .individuals
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| by_fitness_desc(a, b))
            .map(|(i, _)| i);

        let (best, worst, average, std) = if n == 0 {
            (f64::NEG_INFINITY, f64::NEG_INFINITY, 0.0, 0.0)
        } else {
            let best = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let worst = fitness.iter().copied().fold(f64::INFINITY, f64::min);
            let average = fitness.iter().sum::<f64>() / n as f64;
            let std = if n > 1 {
                (fitness.iter().map(|f| (f - average).powi(2)).sum::<f64>() / n as f64).sqrt()
            } else {
                0.0
            };
            (best, worst, average, std)
        };

        GenerationStats {
            generation: self.generation,
            population_size: n,
            best_fitness: best,
            worst_fitness: worst,
            average_fitness: average,
            std_deviation: std,
            best_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn small_config() -> PopulationConfig {
        PopulationConfig {
            population_size: 10,
            n_polygons: 5,
            elite_size: 2,
            parallel_evaluation: false,
            ..PopulationConfig::new(16, 16)
        }
    }

    fn reference() -> Arc<Raster> {
        let mut img = Raster::filled(16, 16, &[255, 255, 255]);
        img.paste(&Raster::filled(8, 16, &[20, 40, 200]), 0, 0);
        Arc::new(img)
    }

    fn population(config: PopulationConfig, ops: Operators) -> Population {
        Population::new(config, ops, reference(), None, Pcg32::seed_from_u64(9)).unwrap()
    }

    fn default_ops() -> Operators {
        Operators::from_names("mse", "tournament", "two_point", "multi_gene", "traditional").unwrap()
    }

    #[test]
    fn test_size_preserved_across_steps() {
        for replacement in ["traditional", "young_bias"] {
            let ops = Operators::from_names("mse", "roulette", "uniform", "single_gene", replacement).unwrap();
            // an odd parent count drops one parent per step
            let config = PopulationConfig { elite_size: 3, ..small_config() };
            let mut pop = population(config, ops);
            for g in 1..=4 {
                let stats = pop.step();
                assert_eq!(pop.individuals().len(), 10, "{replacement}");
                assert_eq!(stats.generation, g);
            }
        }
    }

    #[test]
    fn test_best_is_monotone_and_a_snapshot() {
        let mut pop = population(small_config(), default_ops());
        let mut last = f64::NEG_INFINITY;
        for _ in 0..5 {
            pop.step();
            assert!(pop.best_fitness() >= last);
            last = pop.best_fitness();
        }
        let best = pop.best_individual().unwrap();
        assert_eq!(best.fitness(), pop.best_fitness());
        let rescored = pop.operators().fitness.score(pop.reference(), &render_genome(best.genome()));
        assert!((rescored - pop.best_fitness()).abs() < 1e-12);
    }

    #[test]
    fn test_external_evaluation_seam() {
        let mut pop = population(small_config(), default_ops());
        let tasks = pop.prepare_fitness_tasks();
        assert_eq!(tasks.len(), 10);
        let results: Vec<f64> = tasks.par_iter().map(FitnessTask::evaluate).collect();
        pop.update_fitness_from_results(&results).unwrap();
        assert!(pop.individuals().iter().all(Individual::is_evaluated));
        let max = results.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(pop.best_fitness(), max);

        assert!(matches!(
            pop.update_fitness_from_results(&results[..3]),
            Err(Error::ResultCountMismatch { expected: 10, got: 3 })
        ));
    }

    #[test]
    fn test_statistics() {
        let mut pop = population(small_config(), default_ops());
        pop.update_fitness_from_results(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]).unwrap();
        let stats = pop.statistics();
        assert_eq!(stats.best_fitness, 1.0);
        assert_eq!(stats.worst_fitness, 0.1);
        assert!((stats.average_fitness - 0.55).abs() < 1e-12);
        assert!((stats.std_deviation - 0.287_228_132).abs() < 1e-6);
        assert_eq!(stats.best_index, Some(9));
    }

    #[test]
    fn test_invalid_configs() {
        let bad = [
            PopulationConfig { population_size: 0, ..small_config() },
            PopulationConfig { n_vertices: 2, ..small_config() },
            PopulationConfig { elite_size: 11, ..small_config() },
            PopulationConfig { mutation_rate: 1.5, ..small_config() },
            PopulationConfig { crossover_rate: -0.1, ..small_config() },
        ];
        for config in bad {
            let err = Population::new(config, default_ops(), reference(), None, Pcg32::seed_from_u64(1));
            assert!(matches!(err, Err(Error::InvalidConfig(_))));
        }

        let wrong_size = PopulationConfig { width: 8, ..small_config() };
        let err = Population::new(wrong_size, default_ops(), reference(), None, Pcg32::seed_from_u64(1));
        assert!(matches!(err, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_seeded_initialisation_uses_tile_colours() {
        let reference = reference();
        let seeds = crate::preprocessing::compute_tile_seeds(&reference, 8).unwrap();
        let store = Arc::new(SeedStore::from_seeds(&seeds));
        let config = PopulationConfig { seed_fraction: 1.0, ..small_config() };
        let pop = Population::new(config, default_ops(), reference, Some(store), Pcg32::seed_from_u64(2)).unwrap();
        let palette = [[20u8, 40, 200], [255, 255, 255]];
        let mut checked = 0;
        for ind in pop.individuals() {
            for poly in ind.polygons() {
                // a centroid on the far edge sits outside every half-open tile
                let Some((x, y)) = poly.centroid() else { continue };
                if x >= 16 || y >= 16 {
                    continue;
                }
                checked += 1;
                assert!(palette.iter().any(|c| c[..] == poly.color[..3]), "{:?}", poly.color);
            }
        }
        assert!(checked > 40);
    }

    #[test]
    fn test_set_mutation_rate_clamps() {
        let mut pop = population(small_config(), default_ops());
        pop.set_mutation_rate(3.0);
        assert_eq!(pop.mutation_rate(), 1.0);
        pop.set_mutation_rate(0.25);
        assert_eq!(pop.mutation_rate(), 0.25);
    }
}
