//! Scalar time-domain reference kernel.

use crate::kernel::{direct_score, Kernel};
use crate::template::TemplatePlan;

/// Brute-force normalized correlation, O(L) work per offset.
pub struct DirectScalar;

impl Kernel for DirectScalar {
    fn correlate(tpl: &TemplatePlan, image: &[f32], min_var: f64, out: &mut [f32]) {
        let len = tpl.len();
        let n = len as f64;
        let t_prime = tpl.zero_mean();
        let energy = tpl.energy();
        debug_assert_eq!(out.len(), image.len() - len + 1);

        let mut mean = image[..len].iter().map(|&v| v as f64).sum::<f64>() / n;
        for (offset, slot) in out.iter_mut().enumerate() {
            if offset > 0 {
                mean += (image[offset + len - 1] as f64 - image[offset - 1] as f64) / n;
            }

            let mut numerator = 0.0f64;
            let mut window_energy = 0.0f64;
            for (&t, &x) in t_prime.iter().zip(&image[offset..offset + len]) {
                let d = x as f64 - mean;
                numerator += t * d;
                window_energy += d * d;
            }
            *slot = direct_score(numerator, energy, window_energy, n, min_var);
        }
    }
}
