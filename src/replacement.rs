//! Replacement strategies: merge the old generation with its offspring into
//! the next generation of fixed size.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::individual::Individual;
use crate::selection::by_fitness_desc;

pub trait ReplacementStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// next generation, at most `population_size` long
    fn replace(
        &self,
        old: Vec<Individual>,
        offspring: Vec<Individual>,
        population_size: usize,
    ) -> Vec<Individual>;
}

pub fn by_name(name: &str) -> Result<Arc<dyn ReplacementStrategy>> {
    let strategy: Arc<dyn ReplacementStrategy> = match name {
        "traditional" => Arc::new(Traditional),
        "young_bias" => Arc::new(YoungBias),
        other => {
            return Err(Error::UnknownStrategy { role: "replacement", name: other.to_string() });
        }
    };
    Ok(strategy)
}

fn best_first(mut individuals: Vec<Individual>, keep: usize) -> Vec<Individual> {
    individuals.sort_by(by_fitness_desc);
    individuals.truncate(keep);
    individuals
}

/// old and offspring compete on equal terms; the best `population_size` survive
#[derive(Clone, Copy, Debug, Default)]
pub struct Traditional;

impl ReplacementStrategy for Traditional {
    fn name(&self) -> &'static str {
        "traditional"
    }

    fn replace(&self, mut old: Vec<Individual>, offspring: Vec<Individual>, population_size: usize) -> Vec<Individual> {
        profiling::scope!("Traditional::replace");
        old.extend(offspring);
        best_first(old, population_size)
    }
}

/// offspring first; the old generation only fills the gap
#[derive(Clone, Copy, Debug, Default)]
pub struct YoungBias;

impl ReplacementStrategy for YoungBias {
    fn name(&self) -> &'static str {
        "young_bias"
    }

    fn replace(&self, old: Vec<Individual>, offspring: Vec<Individual>, population_size: usize) -> Vec<Individual> {
        if offspring.len() >= population_size {
            return best_first(offspring, population_size);
        }
        let missing = population_size - offspring.len();
        let mut next = offspring;
        next.extend(best_first(old, missing));
        next
    }
}
