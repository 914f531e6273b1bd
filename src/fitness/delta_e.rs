use std::f64::consts::PI;

use lab::Lab;

use crate::raster::Raster;

use super::{aligned, FitnessStrategy};

/// mean distances at or above this count as a total mismatch
pub const DELTA_E_CEILING: f64 = 100.0;

/// `1 - min(mean CIEDE2000, 100) / 100`, in [0, 1]
#[derive(Clone, Copy, Debug, Default)]
pub struct DeltaE;

impl FitnessStrategy for DeltaE {
    fn name(&self) -> &'static str {
        "deltaE"
    }

    fn score(&self, reference: &Raster, candidate: &Raster) -> f64 {
        profiling::scope!("DeltaE::score");
        1.0 - mean_delta_e(reference, candidate).min(DELTA_E_CEILING) / DELTA_E_CEILING
    }
}

/// raw per-pixel CIEDE2000 distance averaged over the image (lower is better)
pub fn mean_delta_e(a: &Raster, b: &Raster) -> f64 {
    let (a, b) = aligned(a, b);
    let (a, b) = (a.to_rgb(), b.to_rgb());
    let n = a.pixel_count();
    if n == 0 {
        return 0.0;
    }

    let total: f64 = a
        .data()
        .chunks_exact(3)
        .zip(b.data().chunks_exact(3))
        .map(|(p, q)| {
            if p == q {
                0.0
            } else {
                ciede2000(srgb_to_lab([p[0], p[1], p[2]]), srgb_to_lab([q[0], q[1], q[2]]))
            }
        })
        .sum();
    total / n as f64
}

/// sRGB -> CIE L*a*b* under D65
pub fn srgb_to_lab(rgb: [u8; 3]) -> [f64; 3] {
    let lab = Lab::from_rgb(&rgb);
    [f64::from(lab.l), f64::from(lab.a), f64::from(lab.b)]
}

/// CIEDE2000 colour difference with unit weighting factors
pub fn ciede2000(lab1: [f64; 3], lab2: [f64; 3]) -> f64 {
    let [l1, a1, b1] = lab1;
    let [l2, a2, b2] = lab2;

    let c1 = a1.hypot(b1);
    let c2 = a2.hypot(b2);
    let c_bar = (c1 + c2) / 2.0;
    let c_bar7 = c_bar.powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + 25f64.powi(7))).sqrt());

    let a1p = (1.0 + g) * a1;
    let a2p = (1.0 + g) * a2;
    let c1p = a1p.hypot(b1);
    let c2p = a2p.hypot(b2);

    let hue = |b: f64, a: f64| {
        if a == 0.0 && b == 0.0 {
            0.0
        } else {
            let h = b.atan2(a).to_degrees();
            if h < 0.0 { h + 360.0 } else { h }
        }
    };
    let h1p = hue(b1, a1p);
    let h2p = hue(b2, a2p);

    let dl = l2 - l1;
    let dc = c2p - c1p;
    let dh = if c1p * c2p == 0.0 {
        0.0
    } else {
        let d = h2p - h1p;
        if d > 180.0 {
            d - 360.0
        } else if d < -180.0 {
            d + 360.0
        } else {
            d
        }
    };
    let dh_big = 2.0 * (c1p * c2p).sqrt() * (dh.to_radians() / 2.0).sin();

    let l_bar = (l1 + l2) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;
    let h_bar_p = if c1p * c2p == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= 180.0 {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 360.0 {
        (h1p + h2p + 360.0) / 2.0
    } else {
        (h1p + h2p - 360.0) / 2.0
    };

    let t = 1.0 - 0.17 * (h_bar_p - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_bar_p).to_radians().cos()
        + 0.32 * (3.0 * h_bar_p + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_bar_p - 63.0).to_radians().cos();

    let d_theta = 30.0 * (-((h_bar_p - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let r_c = 2.0 * (c_bar_p7 / (c_bar_p7 + 25f64.powi(7))).sqrt();
    let l_term = (l_bar - 50.0).powi(2);
    let s_l = 1.0 + 0.015 * l_term / (20.0 + l_term).sqrt();
    let s_c = 1.0 + 0.045 * c_bar_p;
    let s_h = 1.0 + 0.015 * c_bar_p * t;
    let r_t = -(2.0 * d_theta * PI / 180.0).sin() * r_c;

    let tl = dl / s_l;
    let tc = dc / s_c;
    let th = dh_big / s_h;
    (tl * tl + tc * tc + th * th + r_t * tc * th).max(0.0).sqrt()
}
