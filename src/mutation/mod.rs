// Mutation strategies
// Each strategy edits a genome in place. The owning Individual drops its
// render/fitness caches after every call, so strategies never touch them.

pub mod doomsday;
pub mod focused;
pub mod gene;
pub mod multi_gene;
pub mod non_uniform;
pub mod seed_guided;
pub mod single_gene;
pub mod uniform;

use std::fmt;
use std::sync::Arc;

use rand_pcg::Pcg32;

use crate::dna::Genome;
use crate::error::{Error, Result};
use crate::preprocessing::SeedStore;
use crate::raster::Raster;

pub use doomsday::Doomsday;
pub use gene::GeneWeights;
pub use focused::Focused;
pub use multi_gene::MultiGene;
pub use non_uniform::NonUniform;
pub use seed_guided::SeedGuided;
pub use single_gene::SingleGene;
pub use uniform::Uniform;

/// per-call inputs shared by every mutation strategy
#[derive(Clone, Copy, Debug)]
pub struct MutationContext<'a> {
    pub rate: f64,
    pub reference: &'a Raster,
    pub generation: u64,
    pub max_generations: u64,
}

impl<'a> MutationContext<'a> {
    pub fn new(rate: f64, reference: &'a Raster) -> Self {
        Self { rate, reference, generation: 0, max_generations: 0 }
    }

    /// run progress in [0, 1]; 0 when no horizon is known
    #[inline]
    pub fn progress(&self) -> f64 {
        if self.max_generations == 0 {
            0.0
        } else {
            (self.generation as f64 / self.max_generations as f64).clamp(0.0, 1.0)
        }
    }
}

pub trait MutationStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// mutate in place. genomes without polygons are left untouched.
    fn mutate(&self, genome: &mut Genome, ctx: &MutationContext<'_>, rng: &mut Pcg32);
}

/// knobs for strategies that need more than the per-call context
#[derive(Clone, Debug)]
pub struct MutationParams {
    pub decay_factor: f64,
    /// edit lottery of `multi_gene`
    pub gene_weights: GeneWeights,
    pub adopt_probability: f64,
    /// strategy wrapped by `seed_guided`
    pub seed_base: String,
    pub seeds: Option<Arc<SeedStore>>,
}

impl Default for MutationParams {
    fn default() -> Self {
        Self {
            decay_factor: 2.0,
            gene_weights: GeneWeights::default(),
            adopt_probability: 0.5,
            seed_base: "multi_gene".to_string(),
            seeds: None,
        }
    }
}

/// resolve a mutation strategy by its configuration name
pub fn by_name(name: &str, params: &MutationParams) -> Result<Arc<dyn MutationStrategy>> {
    let strategy: Arc<dyn MutationStrategy> = match name {
        "single_gene" => Arc::new(SingleGene),
        "multi_gene" => Arc::new(MultiGene::with_weights(params.gene_weights)),
        "non_uniform_multigen" | "non_uniform" => {
            Arc::new(NonUniform { decay_factor: params.decay_factor })
        }
        "doomsday" => Arc::new(Doomsday),
        "focused" => Arc::new(Focused),
        "uniform" => Arc::new(Uniform),
        "seed_guided" => {
            let Some(seeds) = params.seeds.clone() else {
                return Err(Error::MissingInput(
                    "seed_guided mutation needs a tile seed store (set seed_tile_size)".to_string(),
                ));
            };
            if params.seed_base == "seed_guided" {
                return Err(Error::InvalidConfig(
                    "seed_guided cannot wrap itself".to_string(),
                ));
            }
            let base = by_name(&params.seed_base, params)?;
            Arc::new(SeedGuided::new(base, seeds, params.adopt_probability))
        }
        other => {
            return Err(Error::UnknownStrategy { role: "mutation", name: other.to_string() });
        }
    };
    Ok(strategy)
}
