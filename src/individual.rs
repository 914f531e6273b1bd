use std::sync::Arc;

use rand_pcg::Pcg32;

use crate::dna::{Genome, Polygon};
use crate::fitness::FitnessStrategy;
use crate::mutation::{MutationContext, MutationStrategy};
use crate::preprocessing::SeedStore;
use crate::raster::Raster;
use crate::render::render_genome;

/// Cache state of an individual. Any genome edit drops back to `Unevaluated`.
#[derive(Clone, Debug, Default)]
pub enum Evaluation {
    #[default]
    Unevaluated,
    Rendered(Arc<Raster>),
    Scored {
        fitness: f64,
        rendered: Option<Arc<Raster>>,
    },
}

/// One candidate solution: a genome plus the strategies that score and mutate it.
#[derive(Debug)]
pub struct Individual {
    genome: Genome,
    fitness_strategy: Arc<dyn FitnessStrategy>,
    mutation_strategy: Arc<dyn MutationStrategy>,
    evaluation: Evaluation,
}

// clones are headed for mutation, so the caches stay behind
impl Clone for Individual {
    fn clone(&self) -> Self {
        Self {
            genome: self.genome.clone(),
            fitness_strategy: Arc::clone(&self.fitness_strategy),
            mutation_strategy: Arc::clone(&self.mutation_strategy),
            evaluation: Evaluation::Unevaluated,
        }
    }
}

impl Individual {
    pub fn new(
        genome: Genome,
        fitness_strategy: Arc<dyn FitnessStrategy>,
        mutation_strategy: Arc<dyn MutationStrategy>,
    ) -> Self {
        Self { genome, fitness_strategy, mutation_strategy, evaluation: Evaluation::Unevaluated }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn random(
        width: u32,
        height: u32,
        n_polygons: usize,
        n_vertices: usize,
        reference: Option<&Raster>,
        fitness_strategy: Arc<dyn FitnessStrategy>,
        mutation_strategy: Arc<dyn MutationStrategy>,
        rng: &mut Pcg32,
    ) -> Self {
        let genome = Genome::random(width, height, n_polygons, n_vertices, reference, rng);
        Self::new(genome, fitness_strategy, mutation_strategy)
    }

    /// random geometry with colours taken from the tile seeds
    #[allow(clippy::too_many_arguments)]
    pub fn seeded(
        width: u32,
        height: u32,
        n_polygons: usize,
        n_vertices: usize,
        seeds: &SeedStore,
        reference: Option<&Raster>,
        fitness_strategy: Arc<dyn FitnessStrategy>,
        mutation_strategy: Arc<dyn MutationStrategy>,
        rng: &mut Pcg32,
    ) -> Self {
        let genome =
            Genome::random_seeded(width, height, n_polygons, n_vertices, seeds, reference, rng);
        Self::new(genome, fitness_strategy, mutation_strategy)
    }

    /// sibling on the same canvas with the same strategies and a new polygon list
    pub fn with_polygons(&self, polygons: Vec<Polygon>) -> Self {
        let genome = Genome { width: self.genome.width, height: self.genome.height, polygons };
        Self::new(genome, Arc::clone(&self.fitness_strategy), Arc::clone(&self.mutation_strategy))
    }

    #[inline]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    #[inline]
    pub fn polygons(&self) -> &[Polygon] {
        &self.genome.polygons
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.genome.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.genome.height
    }

    pub fn fitness_strategy(&self) -> &Arc<dyn FitnessStrategy> {
        &self.fitness_strategy
    }

    pub fn mutation_strategy(&self) -> &Arc<dyn MutationStrategy> {
        &self.mutation_strategy
    }

    /// mutable genome access; the caches are dropped up front
    pub fn genome_mut(&mut self) -> &mut Genome {
        self.evaluation = Evaluation::Unevaluated;
        &mut self.genome
    }

    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    /// cached fitness, or negative infinity when unknown
    #[inline]
    pub fn fitness(&self) -> f64 {
        match self.evaluation {
            Evaluation::Scored { fitness, .. } => fitness,
            _ => f64::NEG_INFINITY,
        }
    }

    #[inline]
    pub fn is_evaluated(&self) -> bool {
        matches!(self.evaluation, Evaluation::Scored { .. })
    }

    /// cached render, if any
    pub fn rendered(&self) -> Option<&Arc<Raster>> {
        match &self.evaluation {
            Evaluation::Rendered(img) => Some(img),
            Evaluation::Scored { rendered, .. } => rendered.as_ref(),
            Evaluation::Unevaluated => None,
        }
    }

    /// record an externally computed score, keeping any cached render
    pub fn set_fitness(&mut self, fitness: f64) {
        let rendered = self.rendered().cloned();
        self.evaluation = Evaluation::Scored { fitness, rendered };
    }

    /// render, reusing the cache when allowed; the result is cached either way
    pub fn render(&mut self, use_cache: bool) -> Arc<Raster> {
        if use_cache {
            if let Some(img) = self.rendered() {
                return Arc::clone(img);
            }
        }

        let img = Arc::new(render_genome(&self.genome));
        self.evaluation = match std::mem::take(&mut self.evaluation) {
            Evaluation::Scored { fitness, .. } => {
                Evaluation::Scored { fitness, rendered: Some(Arc::clone(&img)) }
            }
            _ => Evaluation::Rendered(Arc::clone(&img)),
        };
        img
    }

    /// render without touching the cache
    pub fn render_image(&self) -> Raster {
        match self.rendered() {
            Some(img) => (**img).clone(),
            None => render_genome(&self.genome),
        }
    }

    pub fn calculate_fitness(&mut self, reference: &Raster, use_cache: bool) -> f64 {
        profiling::scope!("Individual::calculate_fitness");
        if use_cache {
            if let Evaluation::Scored { fitness, .. } = self.evaluation {
                return fitness;
            }
        }

        let img = self.render(use_cache);
        let fitness = self.fitness_strategy.score(reference, &img);
        self.evaluation = Evaluation::Scored { fitness, rendered: Some(img) };
        fitness
    }

    /// run the configured mutation strategy, then drop render and fitness caches
    pub fn mutate(&mut self, ctx: &MutationContext<'_>, rng: &mut Pcg32) {
        self.mutation_strategy.mutate(&mut self.genome, ctx, rng);
        self.evaluation = Evaluation::Unevaluated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::Mse;
    use crate::mutation::SingleGene;
    use rand::SeedableRng;

    fn individual(rng: &mut Pcg32) -> Individual {
        Individual::random(16, 16, 5, 3, None, Arc::new(Mse), Arc::new(SingleGene), rng)
    }

    #[test]
    fn test_fitness_starts_unknown() {
        let mut rng = Pcg32::seed_from_u64(1);
        let ind = individual(&mut rng);
        assert_eq!(ind.fitness(), f64::NEG_INFINITY);
        assert!(!ind.is_evaluated());
        assert!(ind.rendered().is_none());
    }

    #[test]
    fn test_mutate_invalidates_caches() {
        let mut rng = Pcg32::seed_from_u64(2);
        let reference = Raster::filled(16, 16, &[0, 0, 0]);
        let mut ind = individual(&mut rng);
        let before = ind.calculate_fitness(&reference, true);
        assert!(ind.is_evaluated());
        assert!(ind.rendered().is_some());

        // rate 1 guarantees a genome edit is attempted
        ind.mutate(&MutationContext::new(1.0, &reference), &mut rng);
        assert!(ind.rendered().is_none());
        assert!(!ind.is_evaluated());

        let after = ind.calculate_fitness(&reference, true);
        let fresh = Mse.score(&reference, &render_genome(ind.genome()));
        assert_eq!(after, fresh);
        let _ = before;
    }

    #[test]
    fn test_cached_fitness_is_reused() {
        let mut rng = Pcg32::seed_from_u64(3);
        let reference = Raster::filled(16, 16, &[0, 0, 0]);
        let mut ind = individual(&mut rng);
        ind.set_fitness(42.0);
        assert_eq!(ind.calculate_fitness(&reference, true), 42.0);
        assert_ne!(ind.calculate_fitness(&reference, false), 42.0);
    }

    #[test]
    fn test_clone_drops_caches_and_deep_copies() {
        let mut rng = Pcg32::seed_from_u64(4);
        let reference = Raster::filled(16, 16, &[0, 0, 0]);
        let mut ind = individual(&mut rng);
        ind.calculate_fitness(&reference, true);

        let mut copy = ind.clone();
        assert!(!copy.is_evaluated());
        copy.genome_mut().polygons[0].color = [1, 2, 3, 4];
        assert_ne!(copy.genome().polygons[0], ind.genome().polygons[0]);
        assert!(ind.is_evaluated());
    }

    #[test]
    fn test_render_caches() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut ind = individual(&mut rng);
        let a = ind.render(true);
        let b = ind.render(true);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*a, ind.render_image());
    }
}
