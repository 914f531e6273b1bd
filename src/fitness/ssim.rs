use crate::raster::Raster;

use super::{aligned, FitnessStrategy};

const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 255.0;
const MAX_WINDOW: u32 = 7;

/// mean structural similarity over channels, roughly in [-1, 1]
#[derive(Clone, Copy, Debug, Default)]
pub struct Ssim;

impl FitnessStrategy for Ssim {
    fn name(&self) -> &'static str {
        "ssim"
    }

    fn score(&self, reference: &Raster, candidate: &Raster) -> f64 {
        profiling::scope!("Ssim::score");
        ssim_index(reference, candidate)
    }
}

/// largest odd window <= 7 that fits the smaller image side
#[inline]
pub fn window_size(width: u32, height: u32) -> u32 {
    let min_dim = width.min(height);
    let odd = if min_dim % 2 == 1 { min_dim } else { min_dim.saturating_sub(1) };
    odd.min(MAX_WINDOW).max(1)
}

/// SSIM with a uniform square window, sample covariances and a fixed 8-bit data range.
/// only windows lying fully inside the image contribute to the mean.
pub fn ssim_index(a: &Raster, b: &Raster) -> f64 {
    let (a, b) = aligned(a, b);
    let (w, h) = (a.width(), a.height());
    if w == 0 || h == 0 {
        return 0.0;
    }

    let channels = a.channels() as usize;
    let win = window_size(w, h);
    let total: f64 = (0..channels).map(|c| channel_ssim(&a, &b, c, win)).sum();
    total / channels as f64
}

// summed-area tables for x, y, x^2, y^2 and xy over one channel
struct Moments {
    stride: usize,
    sx: Vec<f64>,
    sy: Vec<f64>,
    sxx: Vec<f64>,
    syy: Vec<f64>,
    sxy: Vec<f64>,
}

impl Moments {
    fn build(a: &Raster, b: &Raster, channel: usize) -> Self {
        let (w, h) = (a.width() as usize, a.height() as usize);
        let c = a.channels() as usize;
        let stride = w + 1;
        let len = stride * (h + 1);
        let mut m = Moments {
            stride,
            sx: vec![0.0; len],
            sy: vec![0.0; len],
            sxx: vec![0.0; len],
            syy: vec![0.0; len],
            sxy: vec![0.0; len],
        };

        for y in 0..h {
            let mut row = [0.0f64; 5];
            for x in 0..w {
                let i = (y * w + x) * c + channel;
                let (vx, vy) = (a.data()[i] as f64, b.data()[i] as f64);
                row[0] += vx;
                row[1] += vy;
                row[2] += vx * vx;
                row[3] += vy * vy;
                row[4] += vx * vy;

                let cur = (y + 1) * stride + x + 1;
                let up = y * stride + x + 1;
                m.sx[cur] = m.sx[up] + row[0];
                m.sy[cur] = m.sy[up] + row[1];
                m.sxx[cur] = m.sxx[up] + row[2];
                m.syy[cur] = m.syy[up] + row[3];
                m.sxy[cur] = m.sxy[up] + row[4];
            }
        }
        m
    }

    #[inline]
    fn window_sum(&self, table: &[f64], x0: usize, y0: usize, size: usize) -> f64 {
        let (x1, y1) = (x0 + size, y0 + size);
        table[y1 * self.stride + x1] - table[y0 * self.stride + x1] - table[y1 * self.stride + x0]
            + table[y0 * self.stride + x0]
    }
}

fn channel_ssim(a: &Raster, b: &Raster, channel: usize, win: u32) -> f64 {
    let m = Moments::build(a, b, channel);
    let size = win as usize;
    let n = (size * size) as f64;
    let cov_norm = if n > 1.0 { n / (n - 1.0) } else { 1.0 };
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    let (w, h) = (a.width() as usize, a.height() as usize);
    let mut sum = 0.0;
    let mut count = 0usize;
    for y0 in 0..=(h - size) {
        for x0 in 0..=(w - size) {
            let ux = m.window_sum(&m.sx, x0, y0, size) / n;
            let uy = m.window_sum(&m.sy, x0, y0, size) / n;
            let vx = (m.window_sum(&m.sxx, x0, y0, size) / n - ux * ux) * cov_norm;
            let vy = (m.window_sum(&m.syy, x0, y0, size) / n - uy * uy) * cov_norm;
            let vxy = (m.window_sum(&m.sxy, x0, y0, size) / n - ux * uy) * cov_norm;

            let num = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let den = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            sum += num / den;
            count += 1;
        }
    }
    sum / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_size_clamps() {
        assert_eq!(window_size(64, 64), 7);
        assert_eq!(window_size(6, 20), 5);
        assert_eq!(window_size(5, 5), 5);
        assert_eq!(window_size(2, 9), 1);
        assert_eq!(window_size(1, 1), 1);
    }

    #[test]
    fn test_tiny_tiles_do_not_fail() {
        let a = Raster::filled(2, 3, &[10, 20, 30]);
        let b = Raster::filled(2, 3, &[12, 20, 30]);
        let s = ssim_index(&a, &b);
        assert!(s.is_finite());
        assert!(s < 1.0);
    }

    #[test]
    fn test_inverted_image_scores_low() {
        let mut data = Vec::new();
        for y in 0..10u32 {
            for x in 0..10u32 {
                data.push(((x * 25 + y * 3) % 256) as u8);
            }
        }
        let a = Raster::new(10, 10, 1, data.clone()).unwrap();
        let b = Raster::new(10, 10, 1, data.iter().map(|v| 255 - v).collect()).unwrap();
        assert!(ssim_index(&a, &b) < 0.0);
    }
}
