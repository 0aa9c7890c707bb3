//! Template batches and their precomputed statistics.

use crate::util::{CorrelationError, CorrelationResult};

mod plan;

pub use plan::TemplatePlan;

/// A batch of equal-length templates, flattened row-major (template major).
///
/// The frequency-domain path produces coefficients in `[-1, 1]` only when each
/// template is zero-mean and scaled by `1 / (std * len)`. [`TemplateBank::new`]
/// applies that scaling; [`TemplateBank::prenormalized`] stores the data as given.
#[derive(Clone, Debug)]
pub struct TemplateBank {
    data: Vec<f32>,
    template_len: usize,
    count: usize,
    norm_sums: Vec<f64>,
}

impl TemplateBank {
    /// Builds a bank from raw templates, normalizing each one.
    ///
    /// A flat template (zero standard deviation) becomes an all-zero row and
    /// scores 0 at every offset.
    pub fn new(mut data: Vec<f32>, template_len: usize) -> CorrelationResult<Self> {
        let count = batch_count(&data, template_len)?;
        for row in data.chunks_exact_mut(template_len) {
            normalize_row(row);
        }
        Ok(Self::from_parts(data, template_len, count))
    }

    /// Builds a bank from templates the caller has already normalized.
    pub fn prenormalized(data: Vec<f32>, template_len: usize) -> CorrelationResult<Self> {
        let count = batch_count(&data, template_len)?;
        Ok(Self::from_parts(data, template_len, count))
    }

    fn from_parts(data: Vec<f32>, template_len: usize, count: usize) -> Self {
        let norm_sums = data
            .chunks_exact(template_len)
            .map(|row| row.iter().map(|&v| v as f64).sum())
            .collect();
        Self {
            data,
            template_len,
            count,
            norm_sums,
        }
    }

    /// Returns the number of templates.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Always false; banks hold at least one template.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the number of samples per template.
    pub fn template_len(&self) -> usize {
        self.template_len
    }

    /// Returns the flattened template batch.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns template `t`.
    pub fn template(&self, t: usize) -> Option<&[f32]> {
        let start = t.checked_mul(self.template_len)?;
        let end = start.checked_add(self.template_len)?;
        self.data.get(start..end)
    }

    /// Returns the per-template sample sums used by the normalization sweep.
    pub fn norm_sums(&self) -> &[f64] {
        &self.norm_sums
    }
}

fn batch_count(data: &[f32], template_len: usize) -> CorrelationResult<usize> {
    if template_len == 0 {
        return Err(CorrelationError::InvalidInput(
            "template length must be non-zero",
        ));
    }
    if data.is_empty() || data.len() % template_len != 0 {
        return Err(CorrelationError::InvalidInput(
            "template buffer is not a whole number of templates",
        ));
    }
    Ok(data.len() / template_len)
}

fn normalize_row(row: &mut [f32]) {
    let n = row.len() as f64;
    let mean = row.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = row
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let scale = var.sqrt() * n;
    if !scale.is_finite() || scale <= 0.0 {
        row.fill(0.0);
        return;
    }
    for v in row.iter_mut() {
        *v = ((*v as f64 - mean) / scale) as f32;
    }
}
