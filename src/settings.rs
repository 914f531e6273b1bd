//! run configuration for polyevo, read from a JSON file.
//! every key is optional; missing keys take the defaults below and unknown keys are ignored.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mutation::GeneWeights;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    // inputs and outputs
    pub image_path: Option<PathBuf>,
    /// best render, written as PNG at the end of the run
    pub output_image: Option<PathBuf>,
    /// best genome as JSON
    pub genome_output: Option<PathBuf>,
    /// one JSON object per generation
    pub metrics_path: Option<PathBuf>,

    // population shape
    pub population_size: usize,
    pub n_polygons: usize,
    pub n_vertices: usize,

    // operators by name
    pub fitness: String,
    pub selection: String,
    pub crossover: String,
    pub mutation: String,
    pub replacement: String,

    // rates
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub elite_size: usize,

    // stop conditions
    pub max_generations: u64,
    pub stop_fitness: f64,

    // anti-stagnation
    /// stalled generations before the mutation rate is raised (0 = never)
    pub stagnation_threshold: u32,
    /// rate used while stalled; 4x mutation_rate when absent
    pub increased_mutation_rate: Option<f64>,

    // operator parameters
    pub tournament_size: usize,
    pub tournament_replacement: bool,
    pub boltzmann_temperature: f64,
    /// exponent of the non-uniform mutation schedule
    pub decay_factor: f64,
    /// edit lottery of multi_gene: vertex, color, alpha, swap
    pub multi_gene_weights: GeneWeights,

    // tile seeds
    /// tile edge for the shared seed store; None = no seeds
    pub seed_tile_size: Option<u32>,
    /// share of the initial population coloured from seeds
    pub seed_fraction: f64,
    /// strategy wrapped by seed_guided
    pub seed_base_mutation: String,
    pub adopt_probability: f64,

    // tiled mode
    /// tile edge for tiled mode; None = one population for the whole image
    pub tile_size: Option<u32>,

    // execution
    pub parallel_evaluation: bool,
    pub polygon_antialiasing: bool,
    pub rng_seed: u64,
    /// log a progress line every N generations
    pub log_every: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            image_path: None,
            output_image: None,
            genome_output: None,
            metrics_path: None,

            population_size: 100,
            n_polygons: 100,
            n_vertices: 3,

            fitness: "mse".to_string(),
            selection: "tournament".to_string(),
            crossover: "two_point".to_string(),
            mutation: "multi_gene".to_string(),
            replacement: "traditional".to_string(),

            mutation_rate: 0.1,
            crossover_rate: 0.7,
            elite_size: 7,

            max_generations: 10_000,
            stop_fitness: 0.9,

            stagnation_threshold: 20,
            increased_mutation_rate: None,

            tournament_size: 3,
            tournament_replacement: false,
            boltzmann_temperature: 1.0,
            decay_factor: 2.0,
            multi_gene_weights: GeneWeights::default(),

            seed_tile_size: None,
            seed_fraction: 0.0,
            seed_base_mutation: "multi_gene".to_string(),
            adopt_probability: 0.5,

            tile_size: None,

            parallel_evaluation: true,
            polygon_antialiasing: false,
            rng_seed: 0xDEADBEEF,
            log_every: 1,
        }
    }
}

impl RunSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| Error::Io { path: path.to_path_buf(), source })
    }

    /// rate used once stagnation is detected, capped at 1
    pub fn escalated_mutation_rate(&self) -> f64 {
        self.increased_mutation_rate
            .unwrap_or(self.mutation_rate * 4.0)
            .clamp(0.0, 1.0)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg)) };
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
        if !self.multi_gene_weights.is_valid() {
            return invalid(format!(
                "multi_gene_weights need a positive weight and no negative ones, got {:?}",
                self.multi_gene_weights
            ));
        }
        if self.tile_size == Some(0) || self.seed_tile_size == Some(0) {
            return invalid("tile sizes must be positive".into());
        }
        let mut rates = vec![
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
            ("seed_fraction", self.seed_fraction),
            ("adopt_probability", self.adopt_probability),
        ];
        if let Some(rate) = self.increased_mutation_rate {
            rates.push(("increased_mutation_rate", rate));
        }
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} must lie in [0, 1], got {value}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_take_defaults() {
        let s: RunSettings =
            serde_json::from_str(r#"{"population_size": 12, "mutation": "doomsday", "plot": true}"#).unwrap();
        assert_eq!(s.population_size, 12);
        assert_eq!(s.mutation, "doomsday");
        assert_eq!(s.selection, "tournament");
        assert_eq!(s.elite_size, 7);
        assert_eq!(s.multi_gene_weights, GeneWeights { vertex: 0.6, color: 0.2, alpha: 0.1, swap: 0.1 });
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_gene_weights() {
        let s: RunSettings =
            serde_json::from_str(r#"{"multi_gene_weights": {"vertex": 0.3, "swap": 0.0}}"#).unwrap();
        assert_eq!(s.multi_gene_weights, GeneWeights { vertex: 0.3, color: 0.2, alpha: 0.1, swap: 0.0 });
    }

    #[test]
    fn test_escalated_rate_defaults_to_four_times() {
        let s = RunSettings { mutation_rate: 0.1, ..RunSettings::default() };
        assert!((s.escalated_mutation_rate() - 0.4).abs() < 1e-12);
        let s = RunSettings { mutation_rate: 0.5, ..RunSettings::default() };
        assert_eq!(s.escalated_mutation_rate(), 1.0);
        let s = RunSettings { increased_mutation_rate: Some(0.3), ..RunSettings::default() };
        assert_eq!(s.escalated_mutation_rate(), 0.3);
    }

    #[test]
    fn test_validate_rejects() {
        let bad = [
            RunSettings { population_size: 0, ..RunSettings::default() },
            RunSettings { n_vertices: 2, ..RunSettings::default() },
            RunSettings { elite_size: 200, ..RunSettings::default() },
            RunSettings { crossover_rate: 1.2, ..RunSettings::default() },
            RunSettings { tile_size: Some(0), ..RunSettings::default() },
            RunSettings {
                multi_gene_weights: GeneWeights { vertex: 0.0, color: 0.0, alpha: 0.0, swap: 0.0 },
                ..RunSettings::default()
            },
        ];
        for s in bad {
            assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("polyevo-settings-{}.json", std::process::id()));
        let s = RunSettings { n_polygons: 42, tile_size: Some(32), ..RunSettings::default() };
        s.save(&path).unwrap();
        let back = RunSettings::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(back, s);
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(RunSettings::load("/nonexistent/polyevo.json"), Err(Error::Io { .. })));
        let path = std::env::temp_dir().join(format!("polyevo-bad-{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();
        let result = RunSettings::load(&path);
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(Error::Json(_))));
    }
}
