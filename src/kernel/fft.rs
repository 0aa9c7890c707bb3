//! Frequency-domain batched correlation.
//!
//! Correlation runs in two phases. [`CorrelationPlan::new`] builds the FFT
//! plans once from a [`CorrelationShape`]; planning needs `&mut` access to the
//! planners and therefore happens on one thread. The finished plan is
//! immutable and `Sync`, so any number of threads may call
//! [`CorrelationPlan::execute`] concurrently, each with its own [`Workspace`].
//!
//! The template batch is treated as one `T x F` real array and transformed in
//! two dimensions: a real FFT of length `F` along each template, then a complex
//! FFT of length `T` across the templates. The product with the image spectrum
//! is inverted the same way, which leaves a gain of `F * T` on the raw
//! correlation that the normalization sweep divides out.

use crate::kernel::normalize::Normalizer;
use crate::kernel::DEFAULT_MIN_VAR;
use crate::template::TemplateBank;
use crate::trace::{trace_event, trace_span};
use crate::util::math::try_filled;
use crate::util::{CorrelationError, CorrelationResult};
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Array shapes shared by a plan and its workspaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorrelationShape {
    template_len: usize,
    n_templates: usize,
    image_len: usize,
    fft_len: usize,
}

impl CorrelationShape {
    /// Validates a correlation shape.
    ///
    /// `fft_len` must be at least `image_len`; shorter transforms let the
    /// circular wraparound reach the valid offsets. Use
    /// [`fft_len_for`](crate::util::math::fft_len_for) for a fast length that
    /// holds the full linear correlation.
    pub fn new(
        template_len: usize,
        n_templates: usize,
        image_len: usize,
        fft_len: usize,
    ) -> CorrelationResult<Self> {
        if template_len == 0 || n_templates == 0 {
            return Err(CorrelationError::InvalidInput(
                "need at least one template with at least one sample",
            ));
        }
        if image_len < template_len {
            return Err(CorrelationError::TemplateTooLong {
                template_len,
                image_len,
            });
        }
        if fft_len < image_len {
            return Err(CorrelationError::TransformTooShort {
                fft_len,
                needed: image_len,
            });
        }

        let shape = Self {
            template_len,
            n_templates,
            image_len,
            fft_len,
        };
        let overflow = CorrelationError::InvalidInput("correlation shape overflows usize");
        fft_len.checked_mul(n_templates).ok_or(overflow.clone())?;
        shape
            .spectrum_len()
            .checked_mul(n_templates)
            .ok_or(overflow.clone())?;
        shape.steps().checked_mul(n_templates).ok_or(overflow)?;
        Ok(shape)
    }

    /// Returns the number of samples per template.
    pub fn template_len(&self) -> usize {
        self.template_len
    }

    /// Returns the number of templates in the batch.
    pub fn n_templates(&self) -> usize {
        self.n_templates
    }

    /// Returns the number of samples per image.
    pub fn image_len(&self) -> usize {
        self.image_len
    }

    /// Returns the transform length.
    pub fn fft_len(&self) -> usize {
        self.fft_len
    }

    /// Returns the number of valid alignment offsets.
    pub fn steps(&self) -> usize {
        self.image_len - self.template_len + 1
    }

    /// Returns the number of coefficients written per image.
    pub fn output_len(&self) -> usize {
        self.steps() * self.n_templates
    }

    /// Returns the number of bins in a real spectrum of `fft_len` samples.
    pub fn spectrum_len(&self) -> usize {
        self.fft_len / 2 + 1
    }

    /// Returns the scale the transform pair leaves on raw correlations.
    pub fn gain(&self) -> f64 {
        self.fft_len as f64 * self.n_templates as f64
    }
}

/// Immutable FFT plans for one correlation shape.
pub struct CorrelationPlan {
    shape: CorrelationShape,
    row_forward: Arc<dyn RealToComplex<f64>>,
    row_inverse: Arc<dyn ComplexToReal<f64>>,
    column_forward: Arc<dyn Fft<f64>>,
    column_inverse: Arc<dyn Fft<f64>>,
    normalizer: Normalizer,
}

impl CorrelationPlan {
    /// Builds the plans for `shape`.
    pub fn new(shape: CorrelationShape) -> Self {
        let _span = trace_span!(
            "plan",
            fft_len = shape.fft_len(),
            templates = shape.n_templates()
        )
        .entered();

        let mut real_planner = RealFftPlanner::<f64>::new();
        let row_forward = real_planner.plan_fft_forward(shape.fft_len());
        let row_inverse = real_planner.plan_fft_inverse(shape.fft_len());

        let mut planner = FftPlanner::<f64>::new();
        let column_forward = planner.plan_fft_forward(shape.n_templates());
        let column_inverse = planner.plan_fft_inverse(shape.n_templates());

        let normalizer = Normalizer::new(
            shape.template_len(),
            shape.fft_len(),
            shape.gain(),
            DEFAULT_MIN_VAR,
        );

        Self {
            shape,
            row_forward,
            row_inverse,
            column_forward,
            column_inverse,
            normalizer,
        }
    }

    /// Sets the variance at or below which an image window scores 0.
    pub fn with_min_var(mut self, min_var: f64) -> Self {
        self.normalizer = self.normalizer.with_min_var(min_var);
        self
    }

    /// Returns the shape this plan was built for.
    pub fn shape(&self) -> CorrelationShape {
        self.shape
    }

    /// Allocates a zeroed workspace matching this plan.
    pub fn workspace(&self) -> CorrelationResult<Workspace> {
        let shape = self.shape;
        let zero = Complex::new(0.0, 0.0);
        let batch_len = shape.fft_len() * shape.n_templates();
        let spectra_len = shape.spectrum_len() * shape.n_templates();

        Ok(Workspace {
            shape,
            template_ext: try_filled(batch_len, 0.0)?,
            image_ext: try_filled(shape.fft_len(), 0.0)?,
            template_spec: try_filled(spectra_len, zero)?,
            image_spec: try_filled(shape.spectrum_len(), zero)?,
            batch_spec: try_filled(spectra_len, zero)?,
            product: try_filled(spectra_len, zero)?,
            ccc: try_filled(batch_len, 0.0)?,
            forward_scratch: try_filled(self.row_forward.get_scratch_len(), zero)?,
            inverse_scratch: try_filled(self.row_inverse.get_scratch_len(), zero)?,
            column_scratch: try_filled(
                self.column_forward
                    .get_inplace_scratch_len()
                    .max(self.column_inverse.get_inplace_scratch_len()),
                zero,
            )?,
        })
    }

    /// Correlates every template of `bank` against `image`.
    ///
    /// `out` receives one row of [`CorrelationShape::steps`] coefficients per
    /// template and is fully overwritten.
    pub fn execute(
        &self,
        ws: &mut Workspace,
        bank: &TemplateBank,
        image: &[f32],
        out: &mut [f32],
    ) -> CorrelationResult<()> {
        let shape = self.shape;
        if ws.shape != shape {
            return Err(CorrelationError::InvalidInput(
                "workspace was built for a different shape",
            ));
        }
        if bank.template_len() != shape.template_len() || bank.len() != shape.n_templates() {
            return Err(CorrelationError::InvalidInput(
                "template bank does not match the plan shape",
            ));
        }
        if image.len() != shape.image_len() {
            return Err(CorrelationError::BufferSize {
                needed: shape.image_len(),
                got: image.len(),
            });
        }
        if out.len() != shape.output_len() {
            return Err(CorrelationError::BufferSize {
                needed: shape.output_len(),
                got: out.len(),
            });
        }

        self.raw_correlation(ws, bank, image)?;
        self.normalizer
            .normalize(&ws.ccc, bank.norm_sums(), image, out);
        Ok(())
    }

    /// Fills `ws.ccc` with the raw circular correlation of every template.
    fn raw_correlation(
        &self,
        ws: &mut Workspace,
        bank: &TemplateBank,
        image: &[f32],
    ) -> CorrelationResult<()> {
        let fft_len = self.shape.fft_len();
        let bins = self.shape.spectrum_len();
        let n_templates = self.shape.n_templates();
        let template_len = self.shape.template_len();

        // Zero padding, templates time-reversed. The real FFT also uses its
        // input as scratch, so the buffers are rewritten on every call.
        ws.template_ext.fill(0.0);
        for (dst, src) in ws
            .template_ext
            .chunks_exact_mut(fft_len)
            .zip(bank.as_slice().chunks_exact(template_len))
        {
            for (d, &s) in dst.iter_mut().zip(src.iter().rev()) {
                *d = s as f64;
            }
        }
        ws.image_ext.fill(0.0);
        for (d, &s) in ws.image_ext.iter_mut().zip(image) {
            *d = s as f64;
        }

        for (row, spec) in ws
            .template_ext
            .chunks_exact_mut(fft_len)
            .zip(ws.template_spec.chunks_exact_mut(bins))
        {
            self.row_forward
                .process_with_scratch(row, spec, &mut ws.forward_scratch)?;
        }
        self.row_forward.process_with_scratch(
            &mut ws.image_ext,
            &mut ws.image_spec,
            &mut ws.forward_scratch,
        )?;

        // Column-major copy so each bin's templates are contiguous for the
        // transform across the batch axis.
        for t in 0..n_templates {
            for k in 0..bins {
                ws.batch_spec[k * n_templates + t] = ws.template_spec[t * bins + k];
            }
        }
        self.column_forward
            .process_with_scratch(&mut ws.batch_spec, &mut ws.column_scratch);

        for (column, &b) in ws
            .batch_spec
            .chunks_exact_mut(n_templates)
            .zip(&ws.image_spec)
        {
            for a in column.iter_mut() {
                *a = Complex::new(a.re * b.re - a.im * b.im, a.re * b.im + a.im * b.re);
            }
        }

        self.column_inverse
            .process_with_scratch(&mut ws.batch_spec, &mut ws.column_scratch);
        for t in 0..n_templates {
            for k in 0..bins {
                ws.product[t * bins + k] = ws.batch_spec[k * n_templates + t];
            }
        }

        for (spec, row) in ws
            .product
            .chunks_exact_mut(bins)
            .zip(ws.ccc.chunks_exact_mut(fft_len))
        {
            // DC and Nyquist are real in exact arithmetic; the inverse real
            // FFT rejects rounding residue left there by the batch transform.
            spec[0].im = 0.0;
            if fft_len % 2 == 0 {
                spec[bins - 1].im = 0.0;
            }
            self.row_inverse
                .process_with_scratch(spec, row, &mut ws.inverse_scratch)?;
        }

        trace_event!("raw_correlation", templates = n_templates, fft_len = fft_len);
        Ok(())
    }
}

/// Per-thread transform buffers for one [`CorrelationPlan`].
///
/// Buffers are allocated once and reused across calls; nothing is shared
/// between workspaces.
pub struct Workspace {
    shape: CorrelationShape,
    template_ext: Vec<f64>,
    image_ext: Vec<f64>,
    template_spec: Vec<Complex<f64>>,
    image_spec: Vec<Complex<f64>>,
    batch_spec: Vec<Complex<f64>>,
    product: Vec<Complex<f64>>,
    ccc: Vec<f64>,
    forward_scratch: Vec<Complex<f64>>,
    inverse_scratch: Vec<Complex<f64>>,
    column_scratch: Vec<Complex<f64>>,
}

impl Workspace {
    /// Returns the shape this workspace was sized for.
    pub fn shape(&self) -> CorrelationShape {
        self.shape
    }

    /// Returns the raw circular correlation rows from the last execution.
    ///
    /// Row `t` starts at `t * fft_len`; values still carry the plan gain.
    pub fn raw(&self) -> &[f64] {
        &self.ccc
    }
}

/// Frequency-domain normalized correlation of a template batch against one image.
///
/// `out` receives `bank.len()` rows of `image.len() - template_len + 1`
/// coefficients. `fft_len` must be at least `image.len()`.
pub fn correlate(
    bank: &TemplateBank,
    image: &[f32],
    fft_len: usize,
    out: &mut [f32],
) -> CorrelationResult<()> {
    let _span = trace_span!(
        "correlate",
        templates = bank.len(),
        image_len = image.len(),
        fft_len = fft_len
    )
    .entered();
    let shape = CorrelationShape::new(bank.template_len(), bank.len(), image.len(), fft_len)?;
    let plan = CorrelationPlan::new(shape);
    let mut ws = plan.workspace()?;
    plan.execute(&mut ws, bank, image, out)
}
