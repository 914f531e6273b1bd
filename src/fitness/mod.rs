// Fitness strategies
// Every strategy maps (reference, candidate) to a score where larger is better.

pub mod delta_e;
pub mod mixed;
pub mod mse;
pub mod ssim;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::raster::Raster;

pub use delta_e::{mean_delta_e, DeltaE};
pub use mixed::{Mixed, MixedMseSsim};
pub use mse::{mean_squared_error, Mse};
pub use ssim::{ssim_index, Ssim};

pub trait FitnessStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// score a candidate render against the reference. never fails: rasters of
    /// different sizes are compared over their overlapping region.
    fn score(&self, reference: &Raster, candidate: &Raster) -> f64;
}

/// resolve a fitness strategy by its configuration name
pub fn by_name(name: &str) -> Result<Arc<dyn FitnessStrategy>> {
    let strategy: Arc<dyn FitnessStrategy> = match name {
        "mse" => Arc::new(Mse),
        "ssim" => Arc::new(Ssim),
        "deltaE" | "delta_e" => Arc::new(DeltaE),
        "mixed" => Arc::new(Mixed::default()),
        "mixed_mse_ssim" | "mixed_mse_ssim_deltae" => Arc::new(MixedMseSsim::default()),
        other => {
            return Err(Error::UnknownStrategy { role: "fitness", name: other.to_string() });
        }
    };
    Ok(strategy)
}

/// crop both rasters to their common extent and bring them to a shared channel layout
pub(crate) fn aligned<'a>(a: &'a Raster, b: &'a Raster) -> (Cow<'a, Raster>, Cow<'a, Raster>) {
    if a.same_size(b) {
        return Raster::common_format(a, b);
    }
    let w = a.width().min(b.width());
    let h = a.height().min(b.height());
    let a = a.crop(0, 0, w, h);
    let b = b.crop(0, 0, w, h);
    let (a, b) = Raster::common_format(&a, &b);
    (Cow::Owned(a.into_owned()), Cow::Owned(b.into_owned()))
}
