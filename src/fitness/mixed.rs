use crate::raster::Raster;

use super::delta_e::DeltaE;
use super::mse::{mean_squared_error, Mse};
use super::ssim::ssim_index;
use super::{aligned, FitnessStrategy};

/// `alpha * mse + (1 - alpha) * ssim`, with ssim taken on grey-scale copies
#[derive(Clone, Copy, Debug)]
pub struct Mixed {
    pub alpha: f64,
}

impl Default for Mixed {
    fn default() -> Self {
        Self { alpha: 0.6 }
    }
}

impl FitnessStrategy for Mixed {
    fn name(&self) -> &'static str {
        "mixed"
    }

    fn score(&self, reference: &Raster, candidate: &Raster) -> f64 {
        profiling::scope!("Mixed::score");
        let mse = 1.0 / (1.0 + mean_squared_error(reference, candidate));
        let (a, b) = aligned(reference, candidate);
        let ssim = ssim_index(&a.to_gray(), &b.to_gray());
        self.alpha * mse + (1.0 - self.alpha) * ssim
    }
}

/// weighted blend of mse, ssim mapped to [0, 1] and the delta-E term
#[derive(Clone, Copy, Debug)]
pub struct MixedMseSsim {
    pub weight_mse: f64,
    pub weight_ssim: f64,
    pub weight_delta_e: f64,
}

impl Default for MixedMseSsim {
    fn default() -> Self {
        Self { weight_mse: 0.66, weight_ssim: 0.15, weight_delta_e: 0.19 }
    }
}

impl FitnessStrategy for MixedMseSsim {
    fn name(&self) -> &'static str {
        "mixed_mse_ssim"
    }

    fn score(&self, reference: &Raster, candidate: &Raster) -> f64 {
        profiling::scope!("MixedMseSsim::score");
        let mse = Mse.score(reference, candidate);
        let ssim = (ssim_index(reference, candidate) + 1.0) / 2.0;
        let delta_e = DeltaE.score(reference, candidate);
        self.weight_mse * mse + self.weight_ssim * ssim + self.weight_delta_e * delta_e
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let m = MixedMseSsim::default();
        assert!((m.weight_mse + m.weight_ssim + m.weight_delta_e - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mixed_alpha_extremes() {
        let a = Raster::filled(8, 8, &[0, 0, 0]);
        let b = Raster::filled(8, 8, &[4, 4, 4]);
        let pure_mse = Mixed { alpha: 1.0 }.score(&a, &b);
        assert!((pure_mse - Mse.score(&a, &b)).abs() < 1e-12);
    }
}
