//! Template plan precomputation for the time-domain kernels.

use crate::util::{CorrelationError, CorrelationResult};

/// Zero-mean template and its energy, prepared once per direct correlation.
pub struct TemplatePlan {
    mean: f64,
    energy: f64,
    zero_mean: Vec<f64>,
}

impl TemplatePlan {
    /// Builds a plan from template samples.
    pub fn from_slice(template: &[f32]) -> CorrelationResult<Self> {
        if template.is_empty() {
            return Err(CorrelationError::InvalidInput(
                "template length must be non-zero",
            ));
        }

        let n = template.len() as f64;
        let mean = template.iter().map(|&v| v as f64).sum::<f64>() / n;
        let zero_mean: Vec<f64> = template.iter().map(|&v| v as f64 - mean).collect();
        let energy = zero_mean.iter().map(|v| v * v).sum();

        Ok(Self {
            mean,
            energy,
            zero_mean,
        })
    }

    /// Returns the number of samples in the template.
    pub fn len(&self) -> usize {
        self.zero_mean.len()
    }

    /// Always false; plans hold at least one sample.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the mean of the original samples.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Returns the sum of squared zero-mean samples.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Returns the zero-mean template.
    pub fn zero_mean(&self) -> &[f64] {
        &self.zero_mean
    }
}
