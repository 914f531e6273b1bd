//! polyevo: approximate an image with a population of semi-transparent
//! polygons evolved by a genetic algorithm with pluggable operators.

pub mod crossover;
pub mod dna;
pub mod engine;
pub mod error;
pub mod fitness;
pub mod geom;
pub mod individual;
pub mod mutation;
pub mod population;
pub mod preprocessing;
pub mod raster;
pub mod render;
pub mod replacement;
pub mod selection;
pub mod settings;
pub mod stagnation;

pub use error::{Error, Result};
