use crate::raster::Raster;

use super::{aligned, FitnessStrategy};

/// `1 / (1 + mse)`, in (0, 1]
#[derive(Clone, Copy, Debug, Default)]
pub struct Mse;

impl FitnessStrategy for Mse {
    fn name(&self) -> &'static str {
        "mse"
    }

    fn score(&self, reference: &Raster, candidate: &Raster) -> f64 {
        profiling::scope!("Mse::score");
        1.0 / (1.0 + mean_squared_error(reference, candidate))
    }
}

/// mean squared difference over every channel sample
pub fn mean_squared_error(a: &Raster, b: &Raster) -> f64 {
    let (a, b) = aligned(a, b);
    let n = a.data().len();
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = a
        .data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| {
            let d = x as i64 - y as i64;
            (d * d) as u64
        })
        .sum();
    sum as f64 / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_error() {
        let a = Raster::filled(2, 2, &[0, 0, 0]);
        let b = Raster::filled(2, 2, &[3, 3, 3]);
        assert_eq!(mean_squared_error(&a, &b), 9.0);
        assert!((Mse.score(&a, &b) - 0.1).abs() < 1e-12);
    }
}
