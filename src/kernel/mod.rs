//! Correlation kernel implementations.
//!
//! The frequency-domain path lives in [`fft`] and [`normalize`]; the
//! time-domain kernels implement [`Kernel`] and serve as the reference for
//! short windows and for verification.

use crate::template::{TemplateBank, TemplatePlan};
use crate::trace::{trace_event, trace_span};
use crate::util::{CorrelationError, CorrelationResult};

pub mod fft;
pub mod normalize;
pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

/// Variance at or below which an image window is treated as flat.
pub const DEFAULT_MIN_VAR: f64 = 1e-7;

/// Time-domain kernel trait.
pub trait Kernel {
    /// Writes one coefficient per offset of `image` into `out`.
    ///
    /// Callers guarantee `image.len() >= tpl.len()` and
    /// `out.len() == image.len() - tpl.len() + 1`.
    fn correlate(tpl: &TemplatePlan, image: &[f32], min_var: f64, out: &mut [f32]);
}

#[cfg(feature = "simd")]
type DirectKernel = simd::DirectSimd;

#[cfg(not(feature = "simd"))]
type DirectKernel = scalar::DirectScalar;

/// Shared epilogue of the direct kernels.
#[inline]
pub(crate) fn direct_score(
    numerator: f64,
    template_energy: f64,
    window_energy: f64,
    len: f64,
    min_var: f64,
) -> f32 {
    if template_energy <= 0.0 || window_energy / len <= min_var {
        return 0.0;
    }
    (numerator / (template_energy * window_energy).sqrt()) as f32
}

/// Time-domain normalized correlation of one template against one image.
///
/// `out` must hold `image.len() - template.len() + 1` coefficients. Flat
/// image windows and flat templates score 0.
pub fn correlate_direct(template: &[f32], image: &[f32], out: &mut [f32]) -> CorrelationResult<()> {
    let tpl = TemplatePlan::from_slice(template)?;
    check_direct_shape(tpl.len(), 1, image, out)?;
    DirectKernel::correlate(&tpl, image, DEFAULT_MIN_VAR, out);
    Ok(())
}

/// Runs the time-domain kernel for every template of a bank.
///
/// `out` is row-major, one row of `image.len() - template_len + 1`
/// coefficients per template.
pub fn correlate_direct_batch(
    bank: &TemplateBank,
    image: &[f32],
    out: &mut [f32],
) -> CorrelationResult<()> {
    let _span = trace_span!("correlate_direct_batch", templates = bank.len()).entered();
    let steps = check_direct_shape(bank.template_len(), bank.len(), image, out)?;
    for (t, row) in out.chunks_exact_mut(steps).enumerate() {
        let template = bank
            .template(t)
            .ok_or(CorrelationError::InvalidInput("template index out of range"))?;
        let tpl = TemplatePlan::from_slice(template)?;
        DirectKernel::correlate(&tpl, image, DEFAULT_MIN_VAR, row);
    }
    trace_event!("direct_batch_done", templates = bank.len(), steps = steps);
    Ok(())
}

fn check_direct_shape(
    template_len: usize,
    n_templates: usize,
    image: &[f32],
    out: &[f32],
) -> CorrelationResult<usize> {
    if image.len() < template_len {
        return Err(CorrelationError::TemplateTooLong {
            template_len,
            image_len: image.len(),
        });
    }
    let steps = image.len() - template_len + 1;
    let needed = steps
        .checked_mul(n_templates)
        .ok_or(CorrelationError::InvalidInput("output size overflows usize"))?;
    if out.len() != needed {
        return Err(CorrelationError::BufferSize {
            needed,
            got: out.len(),
        });
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::{correlate_direct, correlate_direct_batch};
    use crate::template::TemplateBank;
    use crate::util::CorrelationError;

    #[test]
    fn direct_finds_shape_matches() {
        let template = [1.0f32, 2.0, 1.0];
        let image = [0.0f32, 1.0, 2.0, 1.0, 0.0, 1.0, 2.0, 1.0, 0.0];
        let mut out = [0.0f32; 7];
        correlate_direct(&template, &image, &mut out).unwrap();
        assert!((out[1] - 1.0).abs() < 1e-6);
        assert!((out[5] - 1.0).abs() < 1e-6);
        assert!(out.iter().all(|v| v.is_finite() && v.abs() <= 1.0 + 1e-6));
    }

    #[test]
    fn direct_rejects_bad_shapes() {
        let mut out = [0.0f32; 2];
        assert_eq!(
            correlate_direct(&[1.0; 4], &[1.0; 3], &mut out).unwrap_err(),
            CorrelationError::TemplateTooLong {
                template_len: 4,
                image_len: 3
            }
        );
        assert_eq!(
            correlate_direct(&[1.0, 2.0], &[1.0, 2.0, 3.0, 4.0], &mut out).unwrap_err(),
            CorrelationError::BufferSize { needed: 3, got: 2 }
        );
    }

    #[test]
    fn batch_rows_match_single_calls() {
        let raw = vec![1.0f32, 2.0, 1.0, -1.0, 0.0, 3.0];
        let bank = TemplateBank::new(raw.clone(), 3).unwrap();
        let image = [0.5f32, 1.0, -2.0, 1.0, 0.0, 4.0, 2.0, 1.0];
        let mut batch = [0.0f32; 12];
        correlate_direct_batch(&bank, &image, &mut batch).unwrap();

        for t in 0..2 {
            let mut single = [0.0f32; 6];
            correlate_direct(&raw[t * 3..t * 3 + 3], &image, &mut single).unwrap();
            for (a, b) in single.iter().zip(&batch[t * 6..t * 6 + 6]) {
                assert!((a - b).abs() < 1e-5);
            }
        }
    }
}
