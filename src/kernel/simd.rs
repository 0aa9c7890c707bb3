//! SIMD-accelerated time-domain kernel using the `wide` crate.
//!
//! The inner template loop is vectorized four samples at a time in `f64x4`,
//! keeping the same double-precision accumulation as the scalar kernel.

use crate::kernel::{direct_score, Kernel};
use crate::template::TemplatePlan;
use wide::f64x4;

const LANES: usize = 4;

/// Load 4 f32 values and widen to f64x4.
#[inline]
fn load_f32x4_as_f64x4(slice: &[f32]) -> f64x4 {
    f64x4::from([
        slice[0] as f64,
        slice[1] as f64,
        slice[2] as f64,
        slice[3] as f64,
    ])
}

/// Load 4 f64 values into f64x4.
#[inline]
fn load_f64x4(slice: &[f64]) -> f64x4 {
    f64x4::from([slice[0], slice[1], slice[2], slice[3]])
}

/// Horizontal sum of f64x4.
#[inline]
fn hsum(v: f64x4) -> f64 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3]
}

/// SIMD-accelerated direct correlation kernel.
pub struct DirectSimd;

impl Kernel for DirectSimd {
    fn correlate(tpl: &TemplatePlan, image: &[f32], min_var: f64, out: &mut [f32]) {
        let len = tpl.len();
        let n = len as f64;
        let t_prime = tpl.zero_mean();
        let energy = tpl.energy();
        let simd_end = len / LANES * LANES;
        debug_assert_eq!(out.len(), image.len() - len + 1);

        let mut mean = image[..len].iter().map(|&v| v as f64).sum::<f64>() / n;
        for (offset, slot) in out.iter_mut().enumerate() {
            if offset > 0 {
                mean += (image[offset + len - 1] as f64 - image[offset - 1] as f64) / n;
            }
            let window = &image[offset..offset + len];
            let mean_vec = f64x4::splat(mean);

            let mut num_vec = f64x4::ZERO;
            let mut energy_vec = f64x4::ZERO;
            let mut p = 0;
            while p < simd_end {
                let d = load_f32x4_as_f64x4(&window[p..]) - mean_vec;
                num_vec += load_f64x4(&t_prime[p..]) * d;
                energy_vec += d * d;
                p += LANES;
            }

            // Scalar remainder
            let mut numerator = hsum(num_vec);
            let mut window_energy = hsum(energy_vec);
            while p < len {
                let d = window[p] as f64 - mean;
                numerator += t_prime[p] * d;
                window_energy += d * d;
                p += 1;
            }

            *slot = direct_score(numerator, energy, window_energy, n, min_var);
        }
    }
}
