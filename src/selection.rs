//! Parent selection strategies.
//!
//! Every strategy reads `Individual::fitness` (higher is better) and returns
//! references into the population, repetition allowed. Probabilistic
//! strategies treat NaN and infinite fitness as 0 and fall back to uniform
//! sampling when the weights carry no mass. An empty population or a zero
//! count yields an empty selection.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use rand_pcg::Pcg32;

use crate::error::{Error, Result};
use crate::individual::Individual;

pub trait SelectionStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn select<'a>(
        &self,
        population: &'a [Individual],
        count: usize,
        rng: &mut Pcg32,
    ) -> Vec<&'a Individual>;
}

#[derive(Clone, Copy, Debug)]
pub struct SelectionParams {
    pub tournament_size: usize,
    pub tournament_replacement: bool,
    pub temperature: f64,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self { tournament_size: 3, tournament_replacement: false, temperature: 1.0 }
    }
}

/// resolve a selection strategy by its configuration name
pub fn by_name(name: &str, params: &SelectionParams) -> Result<Arc<dyn SelectionStrategy>> {
    let strategy: Arc<dyn SelectionStrategy> = match name {
        "elite" => Arc::new(Elite),
        "tournament" => Arc::new(Tournament {
            size: params.tournament_size,
            with_replacement: params.tournament_replacement,
        }),
        "roulette" => Arc::new(Roulette),
        "universal" => Arc::new(Universal),
        "ranking" => Arc::new(Ranking),
        "boltzmann" => Arc::new(Boltzmann { temperature: params.temperature }),
        other => {
            return Err(Error::UnknownStrategy { role: "selection", name: other.to_string() });
        }
    };
    Ok(strategy)
}

/// NaN and +/-inf become 0
#[inline]
fn sanitized(fitness: f64) -> f64 {
    if fitness.is_finite() { fitness } else { 0.0 }
}

/// descending order with NaN treated as the worst value
pub(crate) fn by_fitness_desc(a: &Individual, b: &Individual) -> Ordering {
    let key = |f: f64| if f.is_nan() { f64::NEG_INFINITY } else { f };
    key(b.fitness()).total_cmp(&key(a.fitness()))
}

/// running sums of the weights
fn cumulative(weights: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut sum = 0.0;
    weights
        .map(|w| {
            sum += w;
            sum
        })
        .collect()
}

/// first bucket whose running sum reaches `r` (bisect-left), clamped to the last one
#[inline]
fn bucket(cum: &[f64], r: f64) -> usize {
    cum.partition_point(|&c| c < r).min(cum.len().saturating_sub(1))
}

fn uniform_picks<'a>(
    population: &'a [Individual],
    count: usize,
    rng: &mut Pcg32,
) -> Vec<&'a Individual> {
    (0..count).map(|_| &population[rng.random_range(0..population.len())]).collect()
}

/// independent spins on a wheel with the given non-negative weights
fn spin_wheel<'a>(
    population: &'a [Individual],
    weights: &[f64],
    count: usize,
    rng: &mut Pcg32,
) -> Vec<&'a Individual> {
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return uniform_picks(population, count, rng);
    }
    let cum = cumulative(weights.iter().map(|w| w / total));
    (0..count).map(|_| &population[bucket(&cum, rng.random::<f64>())]).collect()
}

/// fitness shifted so the minimum is zero when any value is negative
fn shifted_weights(population: &[Individual]) -> Vec<f64> {
    let fitness: Vec<f64> = population.iter().map(|i| sanitized(i.fitness())).collect();
    let min = fitness.iter().copied().fold(f64::INFINITY, f64::min);
    if min < 0.0 {
        fitness.iter().map(|f| f - min).collect()
    } else {
        fitness
    }
}

/// the `count` best, best first
#[derive(Clone, Copy, Debug, Default)]
pub struct Elite;

impl SelectionStrategy for Elite {
    fn name(&self) -> &'static str {
        "elite"
    }

    fn select<'a>(&self, population: &'a [Individual], count: usize, _rng: &mut Pcg32) -> Vec<&'a Individual> {
        let mut sorted: Vec<&Individual> = population.iter().collect();
        // stable, so ties keep population order and repeated calls agree
        sorted.sort_by(|a, b| by_fitness_desc(a, b));
        sorted.truncate(count);
        sorted
    }
}

/// best of `size` random contestants, once per pick
#[derive(Clone, Copy, Debug)]
pub struct Tournament {
    pub size: usize,
    pub with_replacement: bool,
}

impl SelectionStrategy for Tournament {
    fn name(&self) -> &'static str {
        "tournament"
    }

    fn select<'a>(&self, population: &'a [Individual], count: usize, rng: &mut Pcg32) -> Vec<&'a Individual> {
        profiling::scope!("Tournament::select");
        let n = population.len();
        if n == 0 || count == 0 {
            return Vec::new();
        }
        let k = self.size.max(2).min(n);

        (0..count)
            .map(|_| {
                let contestants: Vec<usize> = if self.with_replacement {
                    (0..k).map(|_| rng.random_range(0..n)).collect()
                } else {
                    rand::seq::index::sample(rng, n, k).into_vec()
                };
                let winner = contestants
                    .into_iter()
                    .max_by(|&a, &b| by_fitness_desc(&population[b], &population[a]))
                    .unwrap_or(0);
                &population[winner]
            })
            .collect()
    }
}

/// fitness-proportionate, independent spins
#[derive(Clone, Copy, Debug, Default)]
pub struct Roulette;

impl SelectionStrategy for Roulette {
    fn name(&self) -> &'static str {
        "roulette"
    }

    fn select<'a>(&self, population: &'a [Individual], count: usize, rng: &mut Pcg32) -> Vec<&'a Individual> {
        if population.is_empty() || count == 0 {
            return Vec::new();
        }
        spin_wheel(population, &shifted_weights(population), count, rng)
    }
}

/// stochastic universal sampling: one random offset, `count` evenly spaced pointers
#[derive(Clone, Copy, Debug, Default)]
pub struct Universal;

impl SelectionStrategy for Universal {
    fn name(&self) -> &'static str {
        "universal"
    }

    fn select<'a>(&self, population: &'a [Individual], count: usize, rng: &mut Pcg32) -> Vec<&'a Individual> {
        if population.is_empty() || count == 0 {
            return Vec::new();
        }
        let weights = shifted_weights(population);
        let total: f64 = weights.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return uniform_picks(population, count, rng);
        }

        let cum = cumulative(weights.iter().map(|w| w / total));
        let step = 1.0 / count as f64;
        let start = rng.random::<f64>() * step;
        (0..count)
            .map(|i| {
                let pointer = (start + i as f64 * step) % 1.0;
                &population[bucket(&cum, pointer)]
            })
            .collect()
    }
}

/// linear ranks 1..N (N = best) used as wheel weights
#[derive(Clone, Copy, Debug, Default)]
pub struct Ranking;

impl SelectionStrategy for Ranking {
    fn name(&self) -> &'static str {
        "ranking"
    }

    fn select<'a>(&self, population: &'a [Individual], count: usize, rng: &mut Pcg32) -> Vec<&'a Individual> {
        if population.is_empty() || count == 0 {
            return Vec::new();
        }
        let mut ascending: Vec<&Individual> = population.iter().collect();
        ascending.sort_by(|a, b| by_fitness_desc(b, a));

        let n = ascending.len() as f64;
        let total = n * (n + 1.0) / 2.0;
        let cum = cumulative((1..=ascending.len()).map(|rank| rank as f64 / total));
        (0..count).map(|_| ascending[bucket(&cum, rng.random::<f64>())]).collect()
    }
}

/// softmax over fitness / temperature, computed with the max subtracted
#[derive(Clone, Copy, Debug)]
pub struct Boltzmann {
    pub temperature: f64,
}

impl Default for Boltzmann {
    fn default() -> Self {
        Self { temperature: 1.0 }
    }
}

impl SelectionStrategy for Boltzmann {
    fn name(&self) -> &'static str {
        "boltzmann"
    }

    fn select<'a>(&self, population: &'a [Individual], count: usize, rng: &mut Pcg32) -> Vec<&'a Individual> {
        if population.is_empty() || count == 0 {
            return Vec::new();
        }
        let t = if self.temperature > 0.0 { self.temperature } else { 1e-6 };
        let scaled: Vec<f64> = population.iter().map(|i| sanitized(i.fitness()) / t).collect();
        let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = scaled.iter().map(|s| (s - max).exp()).collect();
        spin_wheel(population, &weights, count, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna::Genome;
    use crate::fitness::Mse;
    use crate::mutation::SingleGene;
    use rand::SeedableRng;

    fn population(fitness: &[f64]) -> Vec<Individual> {
        fitness
            .iter()
            .map(|&f| {
                let mut ind = Individual::new(Genome::new_blank(4, 4), Arc::new(Mse), Arc::new(SingleGene));
                ind.set_fitness(f);
                ind
            })
            .collect()
    }

    fn all_strategies() -> Vec<Arc<dyn SelectionStrategy>> {
        let params = SelectionParams::default();
        ["tournament", "roulette", "universal", "ranking", "boltzmann"]
            .iter()
            .map(|n| by_name(n, &params).unwrap())
            .collect()
    }

    fn is_member(pop: &[Individual], ind: &Individual) -> bool {
        pop.iter().any(|p| std::ptr::eq(p, ind))
    }

    #[test]
    fn test_lengths_and_membership() {
        let mut rng = Pcg32::seed_from_u64(1);
        let pop = population(&[0.1, 0.5, 0.2, 0.9, 0.3]);
        for s in all_strategies() {
            for n in [1, 3, 5, 12] {
                let picked = s.select(&pop, n, &mut rng);
                assert_eq!(picked.len(), n, "{} returned wrong count", s.name());
                assert!(picked.iter().all(|p| is_member(&pop, p)));
            }
        }
    }

    #[test]
    fn test_empty_inputs() {
        let mut rng = Pcg32::seed_from_u64(2);
        let pop = population(&[0.4, 0.6]);
        for s in all_strategies() {
            assert!(s.select(&[], 3, &mut rng).is_empty());
            assert!(s.select(&pop, 0, &mut rng).is_empty());
        }
    }

    #[test]
    fn test_degenerate_fitness_does_not_panic() {
        let mut rng = Pcg32::seed_from_u64(3);
        let pops = [
            population(&[f64::NAN, f64::INFINITY, f64::NEG_INFINITY]),
            population(&[0.0, 0.0, 0.0]),
            population(&[-5.0, -2.0, -9.0]),
        ];
        for pop in &pops {
            for s in all_strategies() {
                assert_eq!(s.select(pop, 7, &mut rng).len(), 7);
            }
        }
    }

    #[test]
    fn test_elite_top_k_descending_and_idempotent() {
        let mut rng = Pcg32::seed_from_u64(4);
        let pop = population(&[0.3, 0.9, 0.1, 0.7, 0.5]);
        let first: Vec<f64> = Elite.select(&pop, 3, &mut rng).iter().map(|i| i.fitness()).collect();
        assert_eq!(first, vec![0.9, 0.7, 0.5]);
        let second: Vec<f64> = Elite.select(&pop, 3, &mut rng).iter().map(|i| i.fitness()).collect();
        assert_eq!(first, second);
        assert_eq!(Elite.select(&pop, 10, &mut rng).len(), 5);
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let mut rng = Pcg32::seed_from_u64(5);
        let pop = population(&[0.0, 0.0, 0.0, 0.0, 1.0]);
        let t = Tournament { size: 5, with_replacement: false };
        // every contestant set is the whole population
        assert!(t.select(&pop, 20, &mut rng).iter().all(|i| i.fitness() == 1.0));

        let single = population(&[0.5]);
        assert_eq!(t.select(&single, 4, &mut rng).len(), 4);
    }

    #[test]
    fn test_roulette_zero_weight_never_chosen() {
        let mut rng = Pcg32::seed_from_u64(6);
        let pop = population(&[0.0, 1.0, 0.0]);
        assert!(Roulette.select(&pop, 50, &mut rng).iter().all(|i| i.fitness() == 1.0));
    }

    #[test]
    fn test_universal_is_proportional() {
        let mut rng = Pcg32::seed_from_u64(7);
        let pop = population(&[1.0, 3.0]);
        let picked = Universal.select(&pop, 8, &mut rng);
        let strong = picked.iter().filter(|i| i.fitness() == 3.0).count();
        // evenly spaced pointers land on the 75% bucket exactly 6 times
        assert_eq!(strong, 6);
    }

    #[test]
    fn test_cold_boltzmann_is_greedy() {
        let mut rng = Pcg32::seed_from_u64(8);
        let pop = population(&[0.2, 0.8, 0.5]);
        let cold = Boltzmann { temperature: 0.0 };
        assert!(cold.select(&pop, 30, &mut rng).iter().all(|i| i.fitness() == 0.8));
    }

    fn counts(picked: &[&Individual], values: &[f64]) -> Vec<usize> {
        values.iter().map(|v| picked.iter().filter(|i| i.fitness() == *v).count()).collect()
    }

    #[test]
    fn test_ranking_uses_rank_weights() {
        let mut rng = Pcg32::seed_from_u64(9);
        // ranks: 0.1 -> 1, 0.3 -> 2, 0.5 -> 3, 0.9 -> 4, out of 10
        let pop = population(&[0.9, 0.1, 0.5, 0.3]);
        let picked = Ranking.select(&pop, 20_000, &mut rng);
        let c = counts(&picked, &[0.1, 0.3, 0.5, 0.9]);
        assert!((1_800..2_200).contains(&c[0]), "worst {}", c[0]);
        assert!((3_700..4_300).contains(&c[1]), "second {}", c[1]);
        assert!((5_600..6_400).contains(&c[2]), "third {}", c[2]);
        assert!((7_700..8_300).contains(&c[3]), "best {}", c[3]);

        // only the order matters, not the scale
        let stretched = population(&[900.0, 0.1, 0.5, 0.3]);
        let best = Ranking.select(&stretched, 20_000, &mut rng).iter().filter(|i| i.fitness() == 900.0).count();
        assert!((7_700..8_300).contains(&best), "best {best}");
    }

    #[test]
    fn test_roulette_shifts_negative_fitness() {
        let mut rng = Pcg32::seed_from_u64(10);
        // shifted weights 4, 7, 0
        let pop = population(&[-5.0, -2.0, -9.0]);
        let picked = Roulette.select(&pop, 11_000, &mut rng);
        let c = counts(&picked, &[-5.0, -2.0, -9.0]);
        assert_eq!(c[2], 0);
        assert!((3_750..4_250).contains(&c[0]), "-5 picked {}", c[0]);
        assert!((6_750..7_250).contains(&c[1]), "-2 picked {}", c[1]);
    }

    #[test]
    fn test_hot_boltzmann_approaches_uniform() {
        let mut rng = Pcg32::seed_from_u64(11);
        let pop = population(&[0.0, 1.0, 0.5]);

        let hot = Boltzmann { temperature: 1_000.0 };
        let c = counts(&hot.select(&pop, 30_000, &mut rng), &[0.0, 1.0, 0.5]);
        for n in c {
            assert!((9_600..10_400).contains(&n), "hot pick count {n}");
        }

        let warm = Boltzmann { temperature: 0.1 };
        let best = warm.select(&pop, 1_000, &mut rng).iter().filter(|i| i.fitness() == 1.0).count();
        assert!(best > 950, "best picked {best} of 1000");
    }

    #[test]
    fn test_unknown_name() {
        assert!(by_name("lottery", &SelectionParams::default()).is_err());
    }
}
